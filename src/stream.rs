//! Stream assembly state machine
//!
//! Folds the envelopes of one in-flight response into message state. The
//! interpreter is a pure function of (state, envelope); effects are carried
//! out by the session runtime.

mod effect;
pub mod envelope;
mod interpret;
mod state;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use envelope::{decode, Envelope, EnvelopeError};
pub use interpret::{interpret, Transition};
pub use state::{SessionPhase, StreamState};
