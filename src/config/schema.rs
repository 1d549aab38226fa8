use std::path::PathBuf;

use serde::Deserialize;

use crate::playlist::DEFAULT_RESTART_THRESHOLD_MS;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/podplay/config.toml` or `~/.config/podplay/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `PODPLAY__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub audio: AudioSettings,
    pub library: LibrarySettings,
    pub session: SessionSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// "Previous" restarts the current track when less than this much of it
    /// has played (milliseconds).
    pub restart_threshold_ms: u64,
    /// Whether natural completion of the last track wraps to the first.
    pub repeat_playlist: bool,
    /// Volume applied while another source asks us to duck (0.0 - 1.0).
    pub duck_volume: f32,
    /// Whether a restored session starts playing on launch.
    pub resume_on_start: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            restart_threshold_ms: DEFAULT_RESTART_THRESHOLD_MS,
            repeat_playlist: false,
            duck_volume: 0.1,
            resume_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            quit_fade_out_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Publish now-playing state and accept transport commands over MPRIS.
    pub mpris: bool,
    /// Identity shown to MPRIS clients; also the bus name suffix.
    pub identity: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mpris: true,
            identity: "podplay".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Where the playlist and current index are kept between runs.
    /// Falls back to the XDG state directory when unset.
    pub state_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing-subscriber` filter used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "podplay=info".to_string(),
        }
    }
}
