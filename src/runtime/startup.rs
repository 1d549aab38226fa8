use std::path::Path;

use tracing::{info, warn};

use crate::config::Settings;
use crate::controller::{Inbound, PlaybackController};
use crate::library::scan;
use crate::playlist::Playlist;

/// The `Load` to send once the worker is running, if any.
///
/// A directory on the command line always wins and starts a fresh playlist
/// at its first track. Otherwise the saved session is resumed when enabled.
pub fn initial_load(
    cli_dir: Option<&Path>,
    controller: &PlaybackController,
    settings: &Settings,
) -> Option<Inbound> {
    if let Some(dir) = cli_dir {
        return fresh_playlist(dir, settings).map(|playlist| Inbound::Load { playlist, index: 0 });
    }
    if !settings.playback.resume_on_start {
        info!("resume on start disabled, waiting for a load");
        return None;
    }
    controller
        .restore()
        .map(|(playlist, index)| Inbound::Load { playlist, index })
}

/// Scan `dir` into a playlist. `None` when it holds no playable files.
pub fn fresh_playlist(dir: &Path, settings: &Settings) -> Option<Playlist> {
    let playlist = Playlist::new(scan(dir, &settings.library));
    if playlist.is_empty() {
        warn!(dir = %dir.display(), "no playable files found");
        return None;
    }
    info!(dir = %dir.display(), tracks = playlist.len(), "scanned library");
    Some(playlist)
}
