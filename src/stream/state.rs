//! Stream session accumulators

use crate::conversation::{Activity, MessageId};

/// Lifecycle of one stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Connection requested, nothing decoded yet
    #[default]
    Opening,
    /// At least one envelope decoded
    Streaming,
    /// Terminal envelope, transport error, or abandonment. Final.
    Closed,
}

/// Everything a session accumulates while its response streams in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    pub target: MessageId,
    /// Concatenation of every content fragment received so far
    pub running_text: String,
    pub activity: Option<Activity>,
    pub phase: SessionPhase,
    /// Whether any content fragment arrived, even an empty one
    pub received_content: bool,
}

impl StreamState {
    pub fn new(target: MessageId) -> Self {
        Self {
            target,
            running_text: String::new(),
            activity: None,
            phase: SessionPhase::Opening,
            received_content: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    #[must_use]
    pub fn closed(mut self) -> Self {
        self.phase = SessionPhase::Closed;
        self
    }
}
