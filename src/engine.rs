//! Playback engine adapter.
//!
//! The controller drives an engine through [`PlaybackEngine`] and learns
//! about asynchronous outcomes (prepared, completed, failed) from
//! [`EngineEvent`]s posted onto its inbound queue.

mod rodio_engine;
mod sink;

pub use rodio_engine::RodioEngine;

use crate::error::Result;
use crate::library::Track;

/// Tag attached to every prepare request. The controller bumps it on each
/// load or navigation and discards events carrying an older value.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The track is decoded far enough to start.
    Prepared {
        generation: Generation,
        duration_ms: Option<u64>,
    },
    /// Playback reached the natural end of the track.
    Completed { generation: Generation },
    /// Decode or output failure.
    Error {
        generation: Generation,
        reason: String,
    },
}

impl EngineEvent {
    pub fn generation(&self) -> Generation {
        match self {
            Self::Prepared { generation, .. }
            | Self::Completed { generation }
            | Self::Error { generation, .. } => *generation,
        }
    }
}

/// Opaque decode/output primitive.
///
/// `prepare` must not block on I/O; its result arrives later as an
/// [`EngineEvent`] tagged with the same generation.
pub trait PlaybackEngine: Send {
    fn prepare(&mut self, track: &Track, generation: Generation) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn seek(&mut self, position_ms: u64) -> Result<()>;
    fn stop(&mut self);
    /// Stop and drop everything held for the current track.
    fn release(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn position_ms(&self) -> u64;
    fn duration_ms(&self) -> Option<u64>;
    /// Tear the engine down for good. Called once, on controller shutdown.
    fn shutdown(&mut self) {}
}
