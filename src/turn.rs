//! Turn controller
//!
//! Runs one user turn end to end: records the user message and an assistant
//! placeholder, opens a stream session for the placeholder, applies the
//! session's effects to the store until it closes, and settles the
//! placeholder when the stream fails.
//!
//! `submit_turn` takes `&mut self`, so a controller never has more than one
//! session open.

use crate::conversation::{ConversationStore, Message, MessageId, StoreError, StorePatch};
use crate::render::Renderer;
use crate::session::{SessionStep, StreamSession};
use crate::stream::Effect;
use crate::transport::{self, Transport, TransportError};
use reqwest::Url;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Shown in place of a response that failed before any text arrived
pub const RESPONSE_FAILED_TEXT: &str = "Sorry, there was an error processing your request.";

/// Shown when the stream could not be set up at all
pub const CONNECT_FAILED_TEXT: &str = "Sorry, there was an error connecting to the server.";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream reached its end event
    Completed,
    /// The transport failed before any content; the placeholder shows the failure text
    FailedBeforeContent,
    /// The transport failed mid-answer; the partial answer stands
    FailedAfterContent,
    /// The stream could not be opened; a failure message was appended
    OpenFailed,
    /// Cancelled by the caller
    Abandoned,
}

pub struct TurnController<T: Transport, R: Renderer> {
    server: Url,
    transport: T,
    store: ConversationStore,
    renderer: R,
}

impl<T: Transport, R: Renderer> TurnController<T, R> {
    pub fn new(server: Url, transport: T, store: ConversationStore, renderer: R) -> Self {
        Self {
            server,
            transport,
            store,
            renderer,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Hand the current transcript to the renderer
    pub fn render(&mut self) {
        self.renderer.render(self.store.messages());
    }

    #[cfg(test)]
    pub async fn submit_turn(&mut self, user_text: &str) -> Result<TurnOutcome, TurnError> {
        self.submit_turn_with_cancel(user_text, CancellationToken::new())
            .await
    }

    /// Run one turn. Cancelling `cancel` abandons the stream; the placeholder
    /// keeps whatever it received.
    pub async fn submit_turn_with_cancel(
        &mut self,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        if user_text.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let user_id = self.store.next_id();
        let reply_id = user_id.next();
        self.store.insert(Message::user(user_id, user_text))?;
        self.store.insert(Message::placeholder(reply_id))?;
        self.render();

        let outcome = self.stream_reply(user_text, reply_id, cancel).await;
        self.renderer.finish(reply_id);
        outcome
    }

    async fn stream_reply(
        &mut self,
        user_text: &str,
        reply_id: MessageId,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let mut session = match self.open_session(user_text, reply_id) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(
                    message_id = %reply_id,
                    error = %e,
                    "Failed to open response stream"
                );
                self.report_open_failure(reply_id)?;
                return Ok(TurnOutcome::OpenFailed);
            }
        };

        loop {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                step = session.next_step() => Some(step),
            };

            match step {
                None => {
                    session.abandon();
                    self.apply(StorePatch::settle(reply_id))?;
                    return Ok(TurnOutcome::Abandoned);
                }
                Some(SessionStep::Effects(effects)) => {
                    for effect in effects {
                        self.apply_effect(effect)?;
                    }
                    if session.is_closed() {
                        return Ok(TurnOutcome::Completed);
                    }
                }
                Some(SessionStep::Dropped) => {}
                Some(SessionStep::Failed {
                    error,
                    received_content,
                }) => return self.handle_failure(reply_id, &error, received_content),
                Some(SessionStep::Closed) => return Ok(TurnOutcome::Completed),
            }
        }
    }

    fn open_session(
        &self,
        user_text: &str,
        target: MessageId,
    ) -> Result<StreamSession, TransportError> {
        let checkpoint = self.store.continuity().get();
        let url = transport::stream_url(&self.server, user_text, checkpoint)?;
        tracing::info!(
            message_id = %target,
            resumed = checkpoint.is_some(),
            "Opening response stream"
        );
        StreamSession::open(&self.transport, &url, target)
    }

    fn apply_effect(&mut self, effect: Effect) -> Result<(), TurnError> {
        match effect {
            Effect::ApplyPatch(patch) => self.apply(patch)?,
            Effect::SetContinuityToken(token) => {
                if self.store.continuity_mut().set_once(token.clone()) {
                    tracing::info!(checkpoint_id = %token, "Continuity token set");
                } else {
                    tracing::debug!(
                        checkpoint_id = %token,
                        "Continuity token already set, ignoring"
                    );
                }
            }
            // The session has already released its connection
            Effect::CloseConnection => {}
        }
        Ok(())
    }

    fn apply(&mut self, patch: StorePatch) -> Result<(), TurnError> {
        self.store.apply(patch)?;
        self.render();
        Ok(())
    }

    fn handle_failure(
        &mut self,
        reply_id: MessageId,
        error: &TransportError,
        received_content: bool,
    ) -> Result<TurnOutcome, TurnError> {
        if received_content {
            tracing::warn!(
                message_id = %reply_id,
                error = %error,
                "Response stream failed, keeping partial answer"
            );
            return Ok(TurnOutcome::FailedAfterContent);
        }
        tracing::warn!(
            message_id = %reply_id,
            error = %error,
            "Response stream failed before any content"
        );
        self.apply(StorePatch::settle(reply_id).with_text(RESPONSE_FAILED_TEXT))?;
        Ok(TurnOutcome::FailedBeforeContent)
    }

    fn report_open_failure(&mut self, reply_id: MessageId) -> Result<(), TurnError> {
        // Nothing will ever stream into the placeholder
        self.store.apply(StorePatch::settle(reply_id))?;
        let failure_id = self.store.next_id();
        self.store
            .insert(Message::assistant(failure_id, CONNECT_FAILED_TEXT))?;
        self.render();
        Ok(())
    }
}
