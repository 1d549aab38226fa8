use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_io::{Timer, block_on};
use tracing::{info, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::controller::{Command, EventSender, Inbound, PlaybackState};
use crate::error::PublishError;

use super::{SessionPublisher, StatusUpdate};

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

#[derive(Debug, Default)]
pub(super) struct SharedState {
    pub(super) status: &'static str,
    pub(super) title: Option<String>,
    pub(super) artist: Vec<String>,
    pub(super) album: Option<String>,
    pub(super) url: Option<String>,
    pub(super) art_url: Option<String>,
    pub(super) length_us: Option<i64>,
    pub(super) track_id: Option<String>,
    pub(super) position_us: i64,
    /// Set while playing so `Position` can run ahead of the last update.
    pub(super) position_at: Option<Instant>,
}

impl SharedState {
    pub(super) fn position(&self) -> i64 {
        let ahead = self
            .position_at
            .map_or(0, |at| at.elapsed().as_micros() as i64);
        let pos = self.position_us + ahead;
        self.length_us.map_or(pos, |len| pos.min(len))
    }
}

/// MPRIS `PlaybackStatus` for a controller state.
pub fn mpris_status(state: &PlaybackState) -> &'static str {
    match state {
        PlaybackState::Preparing | PlaybackState::Playing => "Playing",
        PlaybackState::Paused => "Paused",
        PlaybackState::Idle | PlaybackState::Stopped | PlaybackState::Failed(_) => "Stopped",
    }
}

/// Mirrors status updates into the properties served on the session bus.
pub struct MprisPublisher {
    pub(super) state: Arc<Mutex<SharedState>>,
}

impl SessionPublisher for MprisPublisher {
    fn publish(&mut self, update: &StatusUpdate) -> Result<(), PublishError> {
        let mut s = self.state.lock().map_err(|_| PublishError::Poisoned)?;
        s.status = mpris_status(&update.state);
        s.position_us = update.position_ms as i64 * 1000;
        s.position_at = matches!(update.state, PlaybackState::Playing).then(Instant::now);
        s.length_us = update.duration_ms.map(|ms| ms as i64 * 1000);

        match (&update.metadata, update.index) {
            (Some(m), Some(index)) => {
                s.title = Some(m.title.clone());
                s.artist = vec![m.artist.clone()];
                s.album = Some(m.album.clone());
                s.url = Some(file_url(&m.locator));
                s.art_url = m
                    .album_art
                    .as_deref()
                    .filter(|key| !key.starts_with("embedded:"))
                    .map(file_url);
                s.track_id = Some(format!("{OBJECT_PATH}/track/{index}"));
            }
            _ => {
                s.title = None;
                s.artist.clear();
                s.album = None;
                s.url = None;
                s.art_url = None;
                s.track_id = None;
            }
        }
        Ok(())
    }
}

fn file_url(locator: &str) -> String {
    if locator.contains("://") {
        locator.to_string()
    } else {
        format!("file://{locator}")
    }
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

struct RootIface {
    events: EventSender,
    identity: String,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // Headless.
    }

    fn quit(&self) {
        let _ = self.events.send(Inbound::Shutdown);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        &self.identity
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

pub(super) struct PlayerIface {
    pub(super) events: EventSender,
    pub(super) state: Arc<Mutex<SharedState>>,
}

impl PlayerIface {
    pub(super) fn command(&self, command: Command) {
        let _ = self.events.send(Inbound::Command(command));
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        self.command(Command::Next);
    }

    fn previous(&self) {
        self.command(Command::Previous);
    }

    fn play(&self) {
        self.command(Command::Play);
    }

    fn pause(&self) {
        self.command(Command::Pause);
    }

    fn play_pause(&self) {
        self.command(Command::Toggle);
    }

    fn stop(&self) {
        self.command(Command::Stop);
    }

    /// Relative seek, offset in microseconds.
    fn seek(&self, offset: i64) {
        let Ok(s) = self.state.lock() else {
            return;
        };
        let target = (s.position() + offset).max(0);
        drop(s);
        self.command(Command::Seek(target as u64 / 1000));
    }

    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        let current = self.state.lock().ok().and_then(|s| s.track_id.clone());
        if position < 0 || current.as_deref() != Some(track_id.as_str()) {
            return;
        }
        self.command(Command::Seek(position as u64 / 1000));
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        self.state
            .lock()
            .ok()
            .map(|s| s.status)
            .filter(|s| !s.is_empty())
            .unwrap_or("Stopped")
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position()).unwrap_or(0)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let mut put = |key: &str, value: Option<OwnedValue>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        };

        if let Some(path) = s
            .track_id
            .as_deref()
            .and_then(|p| ObjectPath::try_from(p).ok())
        {
            put("mpris:trackid", owned(Value::from(path)));
        }
        put("mpris:length", s.length_us.and_then(|l| owned(Value::from(l))));
        put("mpris:artUrl", s.art_url.clone().and_then(|u| owned(Value::from(u))));
        put("xesam:title", owned(Value::from(s.title.clone().unwrap_or_default())));
        put("xesam:album", s.album.clone().and_then(|a| owned(Value::from(a))));
        if !s.artist.is_empty() {
            put("xesam:artist", owned(Value::from(s.artist.clone())));
        }
        put("xesam:url", s.url.clone().and_then(|u| owned(Value::from(u))));
        map
    }
}

/// Serve MPRIS on the session bus from a background thread.
///
/// Bus failures are logged; the returned publisher keeps working either way.
pub fn spawn_mpris(identity: &str, events: EventSender) -> MprisPublisher {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let identity = identity.to_string();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        block_on(async move {
            let connection = match Connection::session().await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "mpris: failed to connect to session bus");
                    return;
                }
            };

            let name = format!("org.mpris.MediaPlayer2.{identity}");
            if let Err(e) = connection.request_name(name.as_str()).await {
                warn!(error = %e, %name, "mpris: failed to acquire name");
                return;
            }

            let object_server = connection.object_server();
            let root = RootIface {
                events: events.clone(),
                identity,
            };
            if let Err(e) = object_server.at(OBJECT_PATH, root).await {
                warn!(error = %e, "mpris: failed to register root iface");
                return;
            }

            let player = PlayerIface {
                events,
                state: state_for_thread,
            };
            if let Err(e) = object_server.at(OBJECT_PATH, player).await {
                warn!(error = %e, "mpris: failed to register player iface");
                return;
            }
            info!(%name, "mpris service registered");

            loop {
                Timer::after(Duration::from_secs(3600)).await;
            }
        });
    });

    MprisPublisher { state }
}
