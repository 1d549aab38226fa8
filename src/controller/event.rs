use std::sync::mpsc::{self, Receiver, Sender};

use crate::engine::EngineEvent;
use crate::focus::FocusEvent;
use crate::interruption::Interruption;
use crate::playlist::Playlist;

/// Transport commands from the user or a remote-control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    /// Play when paused, pause when playing (MPRIS `PlayPause`).
    Toggle,
    Next,
    Previous,
    Stop,
    Seek(u64),
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Toggle => "toggle",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Stop => "stop",
            Self::Seek(_) => "seek",
        }
    }
}

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Inbound {
    Load { playlist: Playlist, index: usize },
    Command(Command),
    Engine(EngineEvent),
    Focus(FocusEvent),
    Interruption(Interruption),
    Shutdown,
}

impl Inbound {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Command(c) => c.name(),
            Self::Engine(EngineEvent::Prepared { .. }) => "engine-prepared",
            Self::Engine(EngineEvent::Completed { .. }) => "engine-completed",
            Self::Engine(EngineEvent::Error { .. }) => "engine-error",
            Self::Focus(_) => "focus",
            Self::Interruption(_) => "interruption",
            Self::Shutdown => "shutdown",
        }
    }
}

pub type EventSender = Sender<Inbound>;

pub fn channel() -> (EventSender, Receiver<Inbound>) {
    mpsc::channel()
}
