//! Playlist and current-index storage across sessions.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ControlError, Result};
use crate::library::Track;
use crate::playlist::Playlist;

pub const SCHEMA_VERSION: u32 = 1;

pub trait PlaylistStore: Send {
    /// `Ok(None)` when nothing was ever saved.
    fn load(&self) -> Result<Option<(Playlist, Option<usize>)>>;
    fn save(&mut self, playlist: &Playlist, index: Option<usize>) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_index: Option<usize>,
    // Arrays of tables must come after plain keys.
    #[serde(default)]
    tracks: Vec<Track>,
}

/// Versioned TOML file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct TomlStore {
    path: PathBuf,
}

impl TomlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn unavailable(context: &str, path: &Path, e: impl std::fmt::Display) -> ControlError {
    ControlError::PersistenceUnavailable(format!("{context} {}: {e}", path.display()))
}

impl PlaylistStore for TomlStore {
    fn load(&self) -> Result<Option<(Playlist, Option<usize>)>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable("cannot read", &self.path, e)),
        };

        let saved: SavedSession =
            toml::from_str(&text).map_err(|e| unavailable("cannot parse", &self.path, e))?;
        if saved.version != SCHEMA_VERSION {
            return Err(unavailable(
                "unsupported version in",
                &self.path,
                format!("{} (expected {SCHEMA_VERSION})", saved.version),
            ));
        }

        let playlist = Playlist::new(saved.tracks);
        if let Some(index) = saved.current_index {
            if !playlist.is_valid(index) {
                return Err(ControlError::PersistenceUnavailable(
                    ControlError::InvalidIndex {
                        index,
                        len: playlist.len(),
                    }
                    .to_string(),
                ));
            }
        }
        debug!(path = %self.path.display(), tracks = playlist.len(), "session restored");
        Ok(Some((playlist, saved.current_index)))
    }

    fn save(&mut self, playlist: &Playlist, index: Option<usize>) -> Result<()> {
        let saved = SavedSession {
            version: SCHEMA_VERSION,
            current_index: index,
            tracks: playlist.tracks().to_vec(),
        };
        let text =
            toml::to_string(&saved).map_err(|e| unavailable("cannot encode", &self.path, e))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| unavailable("cannot create", dir, e))?;
        }

        let tmp = self.path.with_extension("toml.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            unavailable("cannot write", &self.path, e)
        })?;

        debug!(path = %self.path.display(), ?index, "session saved");
        Ok(())
    }
}

/// Store for when no state path could be determined.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl PlaylistStore for NullStore {
    fn load(&self) -> Result<Option<(Playlist, Option<usize>)>> {
        Ok(None)
    }

    fn save(&mut self, _playlist: &Playlist, index: Option<usize>) -> Result<()> {
        debug!(?index, "no state path, session not saved");
        Ok(())
    }
}
