//! Error types for the playback controller and its adapters.

use thiserror::Error;

use crate::controller::PlaybackState;

/// Errors surfaced by controller operations.
///
/// Engine and focus failures are turned into state transitions inside the
/// controller; these values only reach callers as rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// Load or navigation with an index outside the playlist.
    #[error("index {index} is out of range for a playlist of {len} tracks")]
    InvalidIndex { index: usize, len: usize },

    /// Decode or output failure reported by the engine.
    #[error("engine failure: {0}")]
    EngineFailure(String),

    /// The exclusive audio resource could not be acquired.
    #[error("audio focus denied")]
    FocusDenied,

    /// Event not valid for the current playback state.
    #[error("{event} is not valid while {state}")]
    InvalidState {
        event: &'static str,
        state: PlaybackState,
    },

    /// Playlist storage could not be read or written.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

/// Errors raised by session publishers. Never propagated into the controller.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("session state lock poisoned")]
    Poisoned,

    #[error("session bus unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ControlError>;
