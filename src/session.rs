//! Stream session runtime
//!
//! Owns the connection for one turn and threads the stream state through the
//! pure interpreter. The connection is released exactly once, whichever way
//! the session ends: terminal envelope, transport failure, abandonment, or
//! the session simply being dropped.

use crate::conversation::MessageId;
use crate::stream::{self, Effect, Envelope, SessionPhase, StreamState};
use crate::transport::{Connection, Transport, TransportError};
use reqwest::Url;

/// What one read from the connection produced
#[derive(Debug)]
pub enum SessionStep {
    /// Effects for the owner to apply, in order
    Effects(Vec<Effect>),
    /// The payload did not decode and was dropped
    Dropped,
    /// The transport failed; the session is now closed
    Failed {
        error: TransportError,
        received_content: bool,
    },
    /// The session was already closed
    Closed,
}

pub struct StreamSession {
    state: StreamState,
    connection: Option<Box<dyn Connection>>,
}

impl StreamSession {
    pub fn open(
        transport: &dyn Transport,
        url: &Url,
        target: MessageId,
    ) -> Result<Self, TransportError> {
        let connection = transport.open(url)?;
        tracing::debug!(message_id = %target, "Stream session opened");
        Ok(Self {
            state: StreamState::new(target),
            connection: Some(connection),
        })
    }

    #[cfg(test)]
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Read and interpret the next payload
    pub async fn next_step(&mut self) -> SessionStep {
        if self.state.is_closed() {
            return SessionStep::Closed;
        }
        let Some(connection) = self.connection.as_mut() else {
            return SessionStep::Closed;
        };

        let next = connection.next_event().await;
        let raw = match next {
            Some(Ok(raw)) => raw,
            Some(Err(error)) => return self.fail(error),
            None => return self.fail(TransportError::UnexpectedEof),
        };

        let envelope = match stream::decode(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    message_id = %self.state.target,
                    error = %e,
                    "Dropping malformed envelope"
                );
                return SessionStep::Dropped;
            }
        };
        self.log_envelope(&envelope);

        let transition = stream::interpret(&self.state, envelope);
        let closes = transition.closes();
        self.state = transition.new_state;

        let mut effects = transition.effects;
        if closes {
            effects.retain(|e| !matches!(e, Effect::CloseConnection));
            tracing::info!(
                message_id = %self.state.target,
                length = self.state.running_text.len(),
                "Response stream finished"
            );
            self.release();
        }
        SessionStep::Effects(effects)
    }

    /// Stop the session without waiting for the producer
    pub fn abandon(&mut self) {
        if self.state.is_closed() {
            return;
        }
        tracing::info!(message_id = %self.state.target, "Abandoning response stream");
        self.state = self.state.clone().closed();
        self.release();
    }

    fn fail(&mut self, error: TransportError) -> SessionStep {
        self.state = self.state.clone().closed();
        self.release();
        SessionStep::Failed {
            error,
            received_content: self.state.received_content,
        }
    }

    fn log_envelope(&self, envelope: &Envelope) {
        let target = self.state.target;
        if self.state.phase == SessionPhase::Opening {
            tracing::debug!(
                message_id = %target,
                kind = envelope.kind(),
                "First envelope received"
            );
        }
        if let Envelope::Unrecognized { kind, payload } = envelope {
            if kind == "error" {
                let detail = payload.get("error").and_then(|v| v.as_str()).unwrap_or_default();
                tracing::warn!(message_id = %target, error = detail, "Server reported an error");
            } else {
                tracing::debug!(
                    message_id = %target,
                    kind = %kind,
                    "Ignoring unrecognized envelope"
                );
            }
        }
    }

    /// Close the connection if still held. Returns whether this call closed it.
    fn release(&mut self) -> bool {
        match self.connection.take() {
            Some(mut connection) => {
                connection.close();
                tracing::debug!(message_id = %self.state.target, "Connection released");
                true
            }
            None => false,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.release();
    }
}
