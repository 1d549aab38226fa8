//! Exclusive audio resource ("focus") arbitration.
//!
//! The controller acquires focus synchronously through [`FocusArbiter`] and
//! hears about later changes as [`FocusEvent`]s on its inbound queue. No
//! other path produces a focus state.

mod local;

pub use local::{Claim, FocusPort, LocalFocus, local_focus};

use crate::error::Result;

/// The controller's view of the exclusive audio resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusState {
    #[default]
    None,
    Granted,
    TransientLoss,
    DuckRequested,
    Lost,
}

impl FocusState {
    /// Whether audio may be audible right now (ducked still counts).
    pub fn is_held(self) -> bool {
        matches!(self, Self::Granted | Self::DuckRequested)
    }
}

/// Asynchronous focus change raised outside of a `request` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    Granted,
    TransientLoss,
    DuckRequested,
    Lost,
}

impl From<FocusEvent> for FocusState {
    fn from(event: FocusEvent) -> Self {
        match event {
            FocusEvent::Granted => Self::Granted,
            FocusEvent::TransientLoss => Self::TransientLoss,
            FocusEvent::DuckRequested => Self::DuckRequested,
            FocusEvent::Lost => Self::Lost,
        }
    }
}

pub trait FocusArbiter: Send {
    /// Best-effort synchronous acquire. `Err(FocusDenied)` when refused.
    fn request(&mut self) -> Result<FocusState>;
    fn release(&mut self);
}
