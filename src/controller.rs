//! The playback state machine and the worker thread that owns it.
//!
//! Every producer (engine, focus arbiter, interruption monitor, MPRIS,
//! console) sends [`Inbound`] events down one queue. A single worker applies
//! them in order, so the controller is the only writer of playback state.

mod event;
mod machine;
mod state;
mod worker;

pub use event::{Command, EventSender, Inbound, channel};
pub use machine::{ControllerOptions, Outcome, PlaybackController};
pub use state::{InterruptionState, PauseFlags, PlaybackState, ResumeCursor};
pub use worker::ControllerHandle;

#[cfg(test)]
mod tests;
