//! Outbound now-playing status.
//!
//! The controller builds a data-only [`StatusUpdate`] after every applied
//! transition and hands it to a [`SessionPublisher`]. Rendering (a log line,
//! an MPRIS property set) is the publisher's business; failures never reach
//! the state machine.

mod mpris;

pub use mpris::{MprisPublisher, mpris_status, spawn_mpris};

use tracing::info;

use crate::controller::PlaybackState;
use crate::error::PublishError;
use crate::library::Track;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub locator: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub album_art: Option<String>,
    pub state: PlaybackState,
}

impl SessionMetadata {
    pub fn project(track: &Track, state: &PlaybackState) -> Self {
        Self {
            locator: track.locator.clone(),
            title: track.title.clone(),
            album: track.album.clone(),
            artist: track.artist.clone(),
            album_art: track.album_art.clone(),
            state: state.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub state: PlaybackState,
    pub metadata: Option<SessionMetadata>,
    pub index: Option<usize>,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
}

pub trait SessionPublisher: Send {
    fn publish(&mut self, update: &StatusUpdate) -> Result<(), PublishError>;
}

/// Stand-in for a system notification: one log line per track or state change.
#[derive(Debug, Default)]
pub struct LogPublisher {
    last: Option<(Option<String>, PlaybackState)>,
}

impl SessionPublisher for LogPublisher {
    fn publish(&mut self, update: &StatusUpdate) -> Result<(), PublishError> {
        let locator = update.metadata.as_ref().map(|m| m.locator.clone());
        let key = (locator, update.state.clone());
        if self.last.as_ref() == Some(&key) {
            return Ok(());
        }
        match &update.metadata {
            Some(m) => info!(
                state = %update.state,
                index = ?update.index,
                artist = %m.artist,
                title = %m.title,
                album = %m.album,
                "now playing"
            ),
            None => info!(state = %update.state, "nothing playing"),
        }
        self.last = Some(key);
        Ok(())
    }
}

/// Publishes to every inner publisher; the first failure is reported after
/// all of them have been tried.
#[derive(Default)]
pub struct Fanout(pub Vec<Box<dyn SessionPublisher>>);

impl Fanout {
    pub fn push(&mut self, publisher: Box<dyn SessionPublisher>) {
        self.0.push(publisher);
    }
}

impl SessionPublisher for Fanout {
    fn publish(&mut self, update: &StatusUpdate) -> Result<(), PublishError> {
        let mut first = None;
        for p in &mut self.0 {
            if let Err(e) = p.publish(update) {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}
