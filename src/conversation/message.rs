//! Message records and the search-activity sub-state

use std::fmt;

/// Identifier of a message within one conversation.
///
/// Ids are assigned monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl MessageId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

/// A named stage in the activity trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Searching,
    Reading,
    Writing,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Searching => "searching",
            Phase::Reading => "reading",
            Phase::Writing => "writing",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search activity attached to an assistant message.
///
/// `phases` only ever grows while a stream session is open. Once
/// [`Phase::Error`] is recorded the only phase that may follow is
/// [`Phase::Writing`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    pub phases: Vec<Phase>,
    pub query: String,
    pub sources: Vec<String>,
    pub failure: Option<String>,
}

impl Activity {
    pub fn searching(query: impl Into<String>) -> Self {
        Self {
            phases: vec![Phase::Searching],
            query: query.into(),
            sources: Vec::new(),
            failure: None,
        }
    }

    pub fn has_failed(&self) -> bool {
        self.phases.contains(&Phase::Error)
    }
}

/// One entry of the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub text: String,
    pub pending: bool,
    pub activity: Option<Activity>,
}

impl Message {
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            author: Author::User,
            text: text.into(),
            pending: false,
            activity: None,
        }
    }

    pub fn assistant(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            author: Author::Assistant,
            text: text.into(),
            pending: false,
            activity: None,
        }
    }

    /// Empty assistant message shown while a response streams in
    pub fn placeholder(id: MessageId) -> Self {
        Self {
            id,
            author: Author::Assistant,
            text: String::new(),
            pending: true,
            activity: Some(Activity::default()),
        }
    }
}
