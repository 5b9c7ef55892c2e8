//! Effects produced by interpreting an envelope

use crate::conversation::{ActivityUpdate, StorePatch};
use crate::stream::state::StreamState;

/// Effects to be executed after an interpreter step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the accumulated state into the target message
    ApplyPatch(StorePatch),

    /// Record the conversation's continuity token
    SetContinuityToken(String),

    /// Release the connection; the session is finished
    CloseConnection,
}

impl Effect {
    /// Patch carrying the running text, leaving activity alone
    pub fn text_patch(state: &StreamState) -> Self {
        Effect::ApplyPatch(StorePatch::settle(state.target).with_text(state.running_text.clone()))
    }

    /// Patch carrying the running text and the current activity
    pub fn activity_patch(state: &StreamState) -> Self {
        let activity = match &state.activity {
            Some(activity) => ActivityUpdate::Replace(activity.clone()),
            None => ActivityUpdate::Clear,
        };
        Effect::ApplyPatch(
            StorePatch::settle(state.target)
                .with_text(state.running_text.clone())
                .with_activity(activity),
        )
    }
}
