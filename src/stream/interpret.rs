//! Pure envelope interpreter
//!
//! Given the same state and envelope this always produces the same next
//! state and effects, with no I/O. The session runtime applies the effects.

use super::{Effect, Envelope, SessionPhase, StreamState};
use crate::conversation::{Activity, Phase};

/// Result of interpreting one envelope
#[derive(Debug)]
pub struct Transition {
    pub new_state: StreamState,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn new(state: StreamState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Whether this step finished the session
    pub fn closes(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, Effect::CloseConnection))
    }
}

pub fn interpret(state: &StreamState, envelope: Envelope) -> Transition {
    // Nothing is processed after the session closed, including repeated `end`
    if state.is_closed() {
        return Transition::new(state.clone());
    }

    let mut next = state.clone();
    next.phase = SessionPhase::Streaming;

    match envelope {
        Envelope::Continuity { checkpoint_id } => {
            Transition::new(next).with_effect(Effect::SetContinuityToken(checkpoint_id))
        }

        Envelope::ContentDelta { text } => {
            next.running_text.push_str(&text);
            next.received_content = true;
            let effect = Effect::text_patch(&next);
            Transition::new(next).with_effect(effect)
        }

        // A failed search stays failed: later search phases are ignored
        Envelope::SearchBegin { .. }
        | Envelope::SearchResults { .. }
        | Envelope::SearchFailure { .. }
            if next.activity.as_ref().is_some_and(Activity::has_failed) =>
        {
            Transition::new(next)
        }

        Envelope::SearchBegin { query } => {
            match next.activity.as_mut() {
                // Another search in the same turn continues the trail
                Some(activity) => {
                    activity.phases.push(Phase::Searching);
                    activity.query = query;
                    activity.sources.clear();
                }
                None => next.activity = Some(Activity::searching(query)),
            }
            activity_step(next)
        }

        Envelope::SearchResults { urls } => {
            let activity = next.activity.get_or_insert_with(Activity::default);
            activity.phases.push(Phase::Reading);
            activity.sources = urls;
            activity_step(next)
        }

        Envelope::SearchFailure { error } => {
            let activity = next.activity.get_or_insert_with(Activity::default);
            activity.phases.push(Phase::Error);
            activity.sources.clear();
            activity.failure = Some(error);
            activity_step(next)
        }

        Envelope::Terminal => {
            if let Some(activity) = next.activity.as_mut() {
                activity.phases.push(Phase::Writing);
            }
            let effect = Effect::activity_patch(&next);
            Transition::new(next.closed())
                .with_effect(effect)
                .with_effect(Effect::CloseConnection)
        }

        Envelope::Unrecognized { .. } => Transition::new(next),
    }
}

fn activity_step(next: StreamState) -> Transition {
    let effect = Effect::activity_patch(&next);
    Transition::new(next).with_effect(effect)
}
