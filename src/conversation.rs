//! Conversation store
//!
//! Ordered transcript plus the continuity token that lets later turns resume
//! server-side context. The store has no behavior beyond insert and
//! update-by-id; everything that decides *what* to write lives in the stream
//! interpreter and the turn controller.

mod message;

pub use message::{Activity, Author, Message, MessageId, Phase};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Message already exists: {0}")]
    DuplicateId(MessageId),
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// How a patch treats the target message's activity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActivityUpdate {
    #[default]
    Unchanged,
    Replace(Activity),
    /// The stream finished without any search activity
    Clear,
}

/// Partial update of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePatch {
    pub target: MessageId,
    pub text: Option<String>,
    pub activity: ActivityUpdate,
    pub pending: bool,
}

impl StorePatch {
    /// Patch that only settles the loading indicator
    pub fn settle(target: MessageId) -> Self {
        Self {
            target,
            text: None,
            activity: ActivityUpdate::Unchanged,
            pending: false,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_activity(mut self, activity: ActivityUpdate) -> Self {
        self.activity = activity;
        self
    }
}

/// Opaque server checkpoint shared by every turn of a conversation.
///
/// Set by the first event that supplies one and never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinuityToken(Option<String>);

impl ContinuityToken {
    pub fn get(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Record `token` unless one is already held. Returns whether it was stored.
    pub fn set_once(&mut self, token: impl Into<String>) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(token.into());
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    continuity: ContinuityToken,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with an assistant greeting as message 1
    pub fn with_greeting(greeting: &str) -> Self {
        let mut store = Self::new();
        if !greeting.is_empty() {
            store
                .messages
                .push(Message::assistant(MessageId(1), greeting));
        }
        store
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Highest id in use, or 0 for an empty conversation
    pub fn max_id(&self) -> MessageId {
        self.messages
            .iter()
            .map(|m| m.id)
            .max()
            .unwrap_or(MessageId(0))
    }

    pub fn next_id(&self) -> MessageId {
        self.max_id().next()
    }

    pub fn insert(&mut self, message: Message) -> StoreResult<()> {
        if self.get(message.id).is_some() {
            return Err(StoreError::DuplicateId(message.id));
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn apply(&mut self, patch: StorePatch) -> StoreResult<()> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == patch.target)
            .ok_or(StoreError::MessageNotFound(patch.target))?;

        if let Some(text) = patch.text {
            message.text = text;
        }
        match patch.activity {
            ActivityUpdate::Unchanged => {}
            ActivityUpdate::Replace(activity) => message.activity = Some(activity),
            ActivityUpdate::Clear => message.activity = None,
        }
        message.pending = patch.pending;
        Ok(())
    }

    pub fn continuity(&self) -> &ContinuityToken {
        &self.continuity
    }

    pub fn continuity_mut(&mut self) -> &mut ContinuityToken {
        &mut self.continuity
    }
}
