//! Immutable track sequence and circular navigation.
//!
//! A `Playlist` never changes after construction. The active index lives in
//! the controller; everything here is a pure function of the sequence length.

use std::sync::Arc;

use crate::library::Track;

/// Below this elapsed position, "previous" restarts the current track.
pub const DEFAULT_RESTART_THRESHOLD_MS: u64 = 3000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    tracks: Arc<[Track]>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks: tracks.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn is_valid(&self, index: usize) -> bool {
        index < self.tracks.len()
    }

    pub fn at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Index after `current`, wrapping from the last track to the first.
    pub fn advance(&self, current: usize) -> Option<usize> {
        if !self.is_valid(current) {
            return None;
        }
        Some((current + 1) % self.len())
    }

    /// "Previous" with the default restart threshold.
    pub fn retreat(&self, current: usize, elapsed_ms: u64) -> Option<usize> {
        self.retreat_with(current, elapsed_ms, DEFAULT_RESTART_THRESHOLD_MS)
    }

    /// Restart in place while `elapsed_ms < threshold_ms`, otherwise step back,
    /// wrapping from the first track to the last.
    pub fn retreat_with(&self, current: usize, elapsed_ms: u64, threshold_ms: u64) -> Option<usize> {
        if !self.is_valid(current) {
            return None;
        }
        if elapsed_ms < threshold_ms {
            return Some(current);
        }
        Some(current.checked_sub(1).unwrap_or(self.len() - 1))
    }
}

impl FromIterator<Track> for Playlist {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
