use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Preparing,
    Playing,
    Paused,
    Stopped,
    /// Terminal for the current track until the next load.
    Failed(String),
}

impl PlaybackState {
    /// A track is loaded into the engine (or on its way there).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Preparing | Self::Playing | Self::Paused)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Preparing => f.write_str("preparing"),
            Self::Playing => f.write_str("playing"),
            Self::Paused => f.write_str("paused"),
            Self::Stopped => f.write_str("stopped"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Why playback is paused, for the reasons that resume on their own.
///
/// A user pause or a noisy-route pause sets neither flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseFlags {
    pub focus: bool,
    pub call: bool,
}

impl PauseFlags {
    pub fn any(self) -> bool {
        self.focus || self.call
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Offset to resume from without an audible restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeCursor {
    pub position_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptionState {
    pub call_active: bool,
}
