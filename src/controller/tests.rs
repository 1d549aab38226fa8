use std::sync::{Arc, Mutex};

use super::*;
use crate::engine::{EngineEvent, Generation, PlaybackEngine};
use crate::error::{ControlError, PublishError, Result};
use crate::focus::{FocusArbiter, FocusEvent, FocusState};
use crate::interruption::{Cause, Interruption};
use crate::library::Track;
use crate::persistence::PlaylistStore;
use crate::playlist::Playlist;
use crate::session::{SessionMetadata, SessionPublisher, StatusUpdate};

#[derive(Debug, Default)]
struct EngineLog {
    calls: Vec<String>,
    position_ms: u64,
    fail_start: bool,
}

struct FakeEngine(Arc<Mutex<EngineLog>>);

impl FakeEngine {
    fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().calls.push(call.into());
    }
}

impl PlaybackEngine for FakeEngine {
    fn prepare(&mut self, track: &Track, generation: Generation) -> Result<()> {
        self.record(format!("prepare:{}:{generation}", track.locator));
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.record("start");
        if self.0.lock().unwrap().fail_start {
            return Err(ControlError::EngineFailure("device gone".into()));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record("pause");
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.record(format!("seek:{position_ms}"));
        self.0.lock().unwrap().position_ms = position_ms;
        Ok(())
    }

    fn stop(&mut self) {
        self.record("stop");
    }

    fn release(&mut self) {
        self.record("release");
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(format!("volume:{volume}"));
    }

    fn position_ms(&self) -> u64 {
        self.0.lock().unwrap().position_ms
    }

    fn duration_ms(&self) -> Option<u64> {
        None
    }

    fn shutdown(&mut self) {
        self.record("shutdown");
    }
}

#[derive(Debug, Default)]
struct FocusLog {
    deny: bool,
    requests: usize,
    releases: usize,
}

struct FakeFocus(Arc<Mutex<FocusLog>>);

impl FocusArbiter for FakeFocus {
    fn request(&mut self) -> Result<FocusState> {
        let mut log = self.0.lock().unwrap();
        log.requests += 1;
        if log.deny {
            Err(ControlError::FocusDenied)
        } else {
            Ok(FocusState::Granted)
        }
    }

    fn release(&mut self) {
        self.0.lock().unwrap().releases += 1;
    }
}

#[derive(Default)]
struct PublishLog {
    updates: Vec<StatusUpdate>,
    fail: bool,
}

struct RecordingPublisher(Arc<Mutex<PublishLog>>);

impl SessionPublisher for RecordingPublisher {
    fn publish(&mut self, update: &StatusUpdate) -> std::result::Result<(), PublishError> {
        let mut log = self.0.lock().unwrap();
        log.updates.push(update.clone());
        if log.fail {
            return Err(PublishError::Unavailable("no bus".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct StoreLog {
    saved: Option<(Playlist, Option<usize>)>,
    saves: usize,
    fail: bool,
}

struct MemoryStore(Arc<Mutex<StoreLog>>);

impl PlaylistStore for MemoryStore {
    fn load(&self) -> Result<Option<(Playlist, Option<usize>)>> {
        let log = self.0.lock().unwrap();
        if log.fail {
            return Err(ControlError::PersistenceUnavailable("disk".into()));
        }
        Ok(log.saved.clone())
    }

    fn save(&mut self, playlist: &Playlist, index: Option<usize>) -> Result<()> {
        let mut log = self.0.lock().unwrap();
        log.saves += 1;
        if log.fail {
            return Err(ControlError::PersistenceUnavailable("disk".into()));
        }
        log.saved = Some((playlist.clone(), index));
        Ok(())
    }
}

struct Harness {
    controller: PlaybackController,
    engine: Arc<Mutex<EngineLog>>,
    focus: Arc<Mutex<FocusLog>>,
    published: Arc<Mutex<PublishLog>>,
    store: Arc<Mutex<StoreLog>>,
}

impl Harness {
    fn new() -> Self {
        Self::with_options(ControllerOptions::default())
    }

    fn with_options(options: ControllerOptions) -> Self {
        let engine = Arc::new(Mutex::new(EngineLog::default()));
        let focus = Arc::new(Mutex::new(FocusLog::default()));
        let published = Arc::new(Mutex::new(PublishLog::default()));
        let store = Arc::new(Mutex::new(StoreLog::default()));
        let controller = PlaybackController::new(
            Box::new(FakeEngine(engine.clone())),
            Box::new(FakeFocus(focus.clone())),
            Box::new(RecordingPublisher(published.clone())),
            Box::new(MemoryStore(store.clone())),
            options,
        );
        Self {
            controller,
            engine,
            focus,
            published,
            store,
        }
    }

    fn send(&mut self, event: Inbound) -> Result<Outcome> {
        self.controller.handle(event)
    }

    fn command(&mut self, command: Command) -> Result<Outcome> {
        self.send(Inbound::Command(command))
    }

    fn prepared(&mut self) -> Result<Outcome> {
        let generation = self.controller.generation();
        self.send(Inbound::Engine(EngineEvent::Prepared {
            generation,
            duration_ms: Some(180_000),
        }))
    }

    fn focus_event(&mut self, event: FocusEvent) -> Result<Outcome> {
        self.send(Inbound::Focus(event))
    }

    fn edge(&mut self, edge: Interruption) -> Result<Outcome> {
        self.send(Inbound::Interruption(edge))
    }

    /// Load `index` of `playlist` and let the engine report it prepared.
    fn playing(&mut self, playlist: Playlist, index: usize) {
        self.send(Inbound::Load { playlist, index }).unwrap();
        self.prepared().unwrap();
        assert_eq!(self.state(), PlaybackState::Playing);
    }

    fn state(&self) -> PlaybackState {
        self.controller.state().clone()
    }

    fn set_position(&self, ms: u64) {
        self.engine.lock().unwrap().position_ms = ms;
    }

    fn calls(&self) -> Vec<String> {
        self.engine.lock().unwrap().calls.clone()
    }

    fn clear_calls(&self) {
        self.engine.lock().unwrap().calls.clear();
    }

    fn last_published(&self) -> StatusUpdate {
        self.published
            .lock()
            .unwrap()
            .updates
            .last()
            .cloned()
            .unwrap()
    }
}

fn tracks(n: usize) -> Playlist {
    (0..n)
        .map(|i| Track::new(format!("/music/{i}.mp3"), format!("Song {i}"), "Album", "Artist"))
        .collect()
}

#[test]
fn load_then_prepared_plays_the_requested_track() {
    let playlist = tracks(3);
    for index in 0..playlist.len() {
        let mut h = Harness::new();
        assert_eq!(
            h.send(Inbound::Load {
                playlist: playlist.clone(),
                index
            }),
            Ok(Outcome::Applied)
        );
        assert_eq!(h.state(), PlaybackState::Preparing);
        assert_eq!(h.prepared(), Ok(Outcome::Applied));

        assert_eq!(h.state(), PlaybackState::Playing);
        assert_eq!(h.controller.current_index(), Some(index));
        let expected = SessionMetadata::project(&playlist.at(index).unwrap().clone(), &PlaybackState::Playing);
        assert_eq!(h.last_published().metadata, Some(expected));
        assert_eq!(h.last_published().duration_ms, Some(180_000));
        assert_eq!(h.focus.lock().unwrap().requests, 1);
    }
}

#[test]
fn load_with_invalid_index_is_rejected() {
    let mut h = Harness::new();

    assert_eq!(
        h.send(Inbound::Load {
            playlist: tracks(2),
            index: 2
        }),
        Err(ControlError::InvalidIndex { index: 2, len: 2 })
    );
    assert_eq!(
        h.send(Inbound::Load {
            playlist: Playlist::default(),
            index: 0
        }),
        Err(ControlError::InvalidIndex { index: 0, len: 0 })
    );
    assert_eq!(h.state(), PlaybackState::Idle);
    assert_eq!(h.controller.current_index(), None);
    assert!(h.calls().is_empty());
}

#[test]
fn load_while_playing_requires_a_stop() {
    let mut h = Harness::new();
    h.playing(tracks(2), 0);

    let err = h
        .send(Inbound::Load {
            playlist: tracks(1),
            index: 0,
        })
        .unwrap_err();
    assert_eq!(
        err,
        ControlError::InvalidState {
            event: "load",
            state: PlaybackState::Playing
        }
    );

    h.command(Command::Stop).unwrap();
    h.send(Inbound::Load {
        playlist: tracks(1),
        index: 0,
    })
    .unwrap();
    assert_eq!(h.state(), PlaybackState::Preparing);
}

#[test]
fn load_while_preparing_cancels_the_old_prepare() {
    let mut h = Harness::new();
    h.send(Inbound::Load {
        playlist: tracks(3),
        index: 0,
    })
    .unwrap();
    let old = h.controller.generation();

    h.send(Inbound::Load {
        playlist: tracks(3),
        index: 2,
    })
    .unwrap();
    assert!(h.controller.generation() > old);

    let late = h.send(Inbound::Engine(EngineEvent::Prepared {
        generation: old,
        duration_ms: None,
    }));
    assert_eq!(late, Ok(Outcome::Stale));
    assert_eq!(h.state(), PlaybackState::Preparing);

    h.prepared().unwrap();
    assert_eq!(h.controller.current_index(), Some(2));
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn denied_focus_keeps_playback_from_starting() {
    let mut h = Harness::new();
    h.focus.lock().unwrap().deny = true;

    let result = h.send(Inbound::Load {
        playlist: tracks(2),
        index: 1,
    });
    assert_eq!(result, Err(ControlError::FocusDenied));
    assert_eq!(h.state(), PlaybackState::Idle);
    assert!(!h.calls().iter().any(|c| c.starts_with("prepare")));
}

#[test]
fn pause_twice_captures_the_cursor_once() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);

    h.set_position(1_200);
    assert_eq!(h.command(Command::Pause), Ok(Outcome::Applied));
    h.set_position(9_000);
    assert_eq!(h.command(Command::Pause), Ok(Outcome::Unchanged));

    assert_eq!(h.state(), PlaybackState::Paused);
    assert_eq!(
        h.controller.resume_cursor(),
        Some(ResumeCursor { position_ms: 1_200 })
    );
    assert_eq!(h.calls().iter().filter(|c| *c == "pause").count(), 1);
}

#[test]
fn play_resumes_from_the_cursor() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);
    h.set_position(4_321);
    h.command(Command::Pause).unwrap();
    h.clear_calls();

    assert_eq!(h.command(Command::Play), Ok(Outcome::Applied));
    assert_eq!(h.state(), PlaybackState::Playing);
    assert_eq!(h.calls(), vec!["seek:4321", "start"]);
    assert_eq!(h.controller.resume_cursor(), None);
    assert_eq!(h.command(Command::Play), Ok(Outcome::Unchanged));
}

#[test]
fn toggle_flips_between_playing_and_paused() {
    let mut h = Harness::new();
    assert!(matches!(
        h.command(Command::Toggle),
        Err(ControlError::InvalidState { event: "toggle", .. })
    ));

    h.playing(tracks(1), 0);
    h.command(Command::Toggle).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);
    h.command(Command::Toggle).unwrap();
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn transient_focus_loss_resumes_only_on_granted() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);
    h.set_position(2_000);

    h.focus_event(FocusEvent::TransientLoss).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);
    assert!(h.controller.pause_flags().focus);
    assert_eq!(h.controller.resume_cursor(), None);

    h.edge(Interruption::End(Cause::NoisyRoute)).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);

    h.clear_calls();
    h.focus_event(FocusEvent::Granted).unwrap();
    assert_eq!(h.state(), PlaybackState::Playing);
    assert_eq!(h.calls(), vec!["start"]);
}

#[test]
fn play_after_focus_pause_requests_focus_again() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);
    h.focus_event(FocusEvent::TransientLoss).unwrap();

    h.focus.lock().unwrap().deny = true;
    assert_eq!(h.command(Command::Play), Err(ControlError::FocusDenied));
    assert_eq!(h.state(), PlaybackState::Paused);
    assert!(h.controller.pause_flags().focus);

    h.focus.lock().unwrap().deny = false;
    assert_eq!(h.command(Command::Play), Ok(Outcome::Applied));
    assert_eq!(h.state(), PlaybackState::Playing);
    assert_eq!(h.controller.focus_state(), FocusState::Granted);
    assert_eq!(h.focus.lock().unwrap().requests, 3);
}

#[test]
fn permanent_focus_loss_is_terminal_until_load() {
    let mut h = Harness::new();
    h.playing(tracks(2), 0);

    h.focus_event(FocusEvent::Lost).unwrap();
    assert_eq!(h.state(), PlaybackState::Stopped);
    assert!(h.controller.stopped_by_focus_loss());
    assert_eq!(h.controller.focus_state(), FocusState::Lost);
    assert!(h.calls().ends_with(&["stop".to_string(), "release".to_string()]));
    assert_eq!(h.focus.lock().unwrap().releases, 1);

    assert_eq!(
        h.command(Command::Play),
        Err(ControlError::InvalidState {
            event: "play",
            state: PlaybackState::Stopped
        })
    );
    assert_eq!(h.state(), PlaybackState::Stopped);

    h.send(Inbound::Load {
        playlist: tracks(2),
        index: 1,
    })
    .unwrap();
    assert!(!h.controller.stopped_by_focus_loss());
    h.prepared().unwrap();
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn focus_loss_while_preparing_stops() {
    let mut h = Harness::new();
    h.send(Inbound::Load {
        playlist: tracks(1),
        index: 0,
    })
    .unwrap();
    h.focus_event(FocusEvent::Lost).unwrap();
    assert_eq!(h.state(), PlaybackState::Stopped);
    assert_eq!(h.prepared(), Ok(Outcome::Stale));
}

#[test]
fn ducking_lowers_and_restores_volume() {
    let mut h = Harness::with_options(ControllerOptions {
        duck_volume: 0.25,
        ..ControllerOptions::default()
    });
    h.playing(tracks(1), 0);
    h.clear_calls();

    h.focus_event(FocusEvent::DuckRequested).unwrap();
    assert_eq!(h.state(), PlaybackState::Playing);
    h.focus_event(FocusEvent::Granted).unwrap();
    assert_eq!(h.calls(), vec!["volume:0.25", "volume:1"]);
}

#[test]
fn full_circular_traversal_returns_to_start() {
    let mut h = Harness::new();
    h.playing(tracks(3), 0);

    for _ in 0..3 {
        assert_eq!(h.command(Command::Next), Ok(Outcome::Applied));
    }
    assert_eq!(h.controller.current_index(), Some(0));
    assert_eq!(h.state(), PlaybackState::Preparing);
}

#[test]
fn previous_restarts_then_steps_back() {
    let mut h = Harness::new();
    h.playing(tracks(3), 0);

    h.set_position(1_000);
    h.command(Command::Previous).unwrap();
    assert_eq!(h.controller.current_index(), Some(0));
    assert!(h.calls().contains(&format!("prepare:/music/0.mp3:{}", h.controller.generation())));

    h.prepared().unwrap();
    h.set_position(3_000);
    h.command(Command::Previous).unwrap();
    assert_eq!(h.controller.current_index(), Some(2));
}

#[test]
fn previous_while_paused_uses_the_cursor() {
    let mut h = Harness::with_options(ControllerOptions {
        restart_threshold_ms: 500,
        ..ControllerOptions::default()
    });
    h.playing(tracks(3), 1);
    h.set_position(800);
    h.command(Command::Pause).unwrap();
    h.set_position(0);

    h.command(Command::Previous).unwrap();
    assert_eq!(h.controller.current_index(), Some(0));
    assert_eq!(h.state(), PlaybackState::Preparing);
}

#[test]
fn navigation_needs_active_playback() {
    let mut h = Harness::new();
    for command in [Command::Next, Command::Previous, Command::Stop, Command::Seek(10)] {
        assert!(matches!(
            h.command(command),
            Err(ControlError::InvalidState {
                state: PlaybackState::Idle,
                ..
            })
        ));
    }
    assert_eq!(h.state(), PlaybackState::Idle);
}

#[test]
fn navigation_persists_the_new_index() {
    let mut h = Harness::new();
    h.playing(tracks(3), 0);
    h.command(Command::Next).unwrap();

    let store = h.store.lock().unwrap();
    assert_eq!(store.saved, Some((tracks(3), Some(1))));
}

#[test]
fn call_and_focus_flags_must_both_clear() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);

    h.focus_event(FocusEvent::TransientLoss).unwrap();
    h.edge(Interruption::Begin(Cause::Call)).unwrap();
    assert_eq!(
        h.controller.pause_flags(),
        PauseFlags {
            focus: true,
            call: true
        }
    );

    h.focus_event(FocusEvent::Granted).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);

    h.edge(Interruption::End(Cause::Call)).unwrap();
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn call_pause_captures_and_resumes_from_cursor() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);
    h.set_position(7_500);

    h.edge(Interruption::Begin(Cause::Call)).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);
    assert!(h.controller.interruption().call_active);
    assert_eq!(
        h.controller.resume_cursor(),
        Some(ResumeCursor { position_ms: 7_500 })
    );

    h.clear_calls();
    h.edge(Interruption::End(Cause::Call)).unwrap();
    assert_eq!(h.calls(), vec!["seek:7500", "start"]);
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn call_during_prepare_holds_playback() {
    let mut h = Harness::new();
    h.send(Inbound::Load {
        playlist: tracks(1),
        index: 0,
    })
    .unwrap();
    h.edge(Interruption::Begin(Cause::Call)).unwrap();
    h.prepared().unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);
    assert!(h.controller.pause_flags().call);

    h.edge(Interruption::End(Cause::Call)).unwrap();
    assert_eq!(h.state(), PlaybackState::Playing);
}

#[test]
fn user_pause_is_not_resumed_by_call_end() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);
    h.command(Command::Pause).unwrap();

    h.edge(Interruption::Begin(Cause::Call)).unwrap();
    h.edge(Interruption::End(Cause::Call)).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);
}

#[test]
fn noisy_route_pauses_without_auto_resume() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);
    h.set_position(300);

    h.edge(Interruption::Begin(Cause::NoisyRoute)).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);
    assert_eq!(h.controller.pause_flags(), PauseFlags::default());
    assert_eq!(
        h.controller.resume_cursor(),
        Some(ResumeCursor { position_ms: 300 })
    );

    h.edge(Interruption::End(Cause::NoisyRoute)).unwrap();
    h.focus_event(FocusEvent::Granted).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);
}

#[test]
fn noisy_route_cancels_pending_auto_resume() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);
    h.focus_event(FocusEvent::TransientLoss).unwrap();

    h.edge(Interruption::Begin(Cause::NoisyRoute)).unwrap();
    assert!(!h.controller.pause_flags().any());

    h.focus_event(FocusEvent::Granted).unwrap();
    assert_eq!(h.state(), PlaybackState::Paused);
}

#[test]
fn completion_advances_until_the_last_track() {
    let mut h = Harness::new();
    h.playing(tracks(2), 0);

    let generation = h.controller.generation();
    h.send(Inbound::Engine(EngineEvent::Completed { generation }))
        .unwrap();
    assert_eq!(h.controller.current_index(), Some(1));
    assert_eq!(h.state(), PlaybackState::Preparing);

    h.prepared().unwrap();
    let generation = h.controller.generation();
    h.send(Inbound::Engine(EngineEvent::Completed { generation }))
        .unwrap();
    assert_eq!(h.state(), PlaybackState::Stopped);
    assert_eq!(h.controller.current_index(), Some(1));
    assert_eq!(h.focus.lock().unwrap().releases, 1);
}

#[test]
fn completion_during_focus_pause_moves_on_after_granted() {
    let mut h = Harness::new();
    h.playing(tracks(3), 0);
    h.focus_event(FocusEvent::TransientLoss).unwrap();

    let generation = h.controller.generation();
    let ended = h.send(Inbound::Engine(EngineEvent::Completed { generation }));
    assert_eq!(ended, Ok(Outcome::Unchanged));
    assert_eq!(h.state(), PlaybackState::Paused);

    h.focus_event(FocusEvent::Granted).unwrap();
    assert_eq!(h.state(), PlaybackState::Preparing);
    assert_eq!(h.controller.current_index(), Some(1));
}

#[test]
fn completion_during_focus_pause_on_last_track_stops() {
    let mut h = Harness::new();
    h.playing(tracks(2), 1);
    h.focus_event(FocusEvent::TransientLoss).unwrap();

    let generation = h.controller.generation();
    h.send(Inbound::Engine(EngineEvent::Completed { generation }))
        .unwrap();
    h.focus_event(FocusEvent::Granted).unwrap();

    assert_eq!(h.state(), PlaybackState::Stopped);
    assert_eq!(h.controller.current_index(), Some(1));
}

#[test]
fn seeking_after_a_paused_completion_replays_the_track() {
    let mut h = Harness::new();
    h.playing(tracks(3), 0);
    h.command(Command::Pause).unwrap();

    let generation = h.controller.generation();
    h.send(Inbound::Engine(EngineEvent::Completed { generation }))
        .unwrap();
    h.command(Command::Seek(1_000)).unwrap();
    h.command(Command::Play).unwrap();

    assert_eq!(h.state(), PlaybackState::Playing);
    assert_eq!(h.controller.current_index(), Some(0));
}

#[test]
fn completion_wraps_when_repeating() {
    let mut h = Harness::with_options(ControllerOptions {
        repeat_playlist: true,
        ..ControllerOptions::default()
    });
    h.playing(tracks(2), 1);

    let generation = h.controller.generation();
    h.send(Inbound::Engine(EngineEvent::Completed { generation }))
        .unwrap();
    assert_eq!(h.controller.current_index(), Some(0));
    assert_eq!(h.state(), PlaybackState::Preparing);
}

#[test]
fn engine_error_fails_the_track() {
    let mut h = Harness::new();
    h.send(Inbound::Load {
        playlist: tracks(2),
        index: 0,
    })
    .unwrap();
    let generation = h.controller.generation();

    h.send(Inbound::Engine(EngineEvent::Error {
        generation,
        reason: "bad header".into(),
    }))
    .unwrap();
    assert_eq!(h.state(), PlaybackState::Failed("bad header".into()));
    assert_eq!(h.controller.focus_state(), FocusState::None);
    assert!(matches!(
        h.command(Command::Next),
        Err(ControlError::InvalidState { .. })
    ));

    // No retry: a stale repeat of the error changes nothing.
    let again = h.send(Inbound::Engine(EngineEvent::Error {
        generation,
        reason: "bad header".into(),
    }));
    assert_eq!(again, Ok(Outcome::Stale));

    h.send(Inbound::Load {
        playlist: tracks(2),
        index: 1,
    })
    .unwrap();
    assert_eq!(h.state(), PlaybackState::Preparing);
}

#[test]
fn engine_start_failure_becomes_failed() {
    let mut h = Harness::new();
    h.engine.lock().unwrap().fail_start = true;
    h.send(Inbound::Load {
        playlist: tracks(1),
        index: 0,
    })
    .unwrap();
    assert_eq!(h.prepared(), Ok(Outcome::Applied));
    assert_eq!(
        h.state(),
        PlaybackState::Failed(ControlError::EngineFailure("device gone".into()).to_string())
    );
}

#[test]
fn seek_clamps_to_duration_and_moves_the_cursor() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);
    h.command(Command::Pause).unwrap();

    h.command(Command::Seek(500_000)).unwrap();
    assert_eq!(
        h.controller.resume_cursor(),
        Some(ResumeCursor {
            position_ms: 180_000
        })
    );
    assert!(h.calls().contains(&"seek:180000".to_string()));
}

#[test]
fn stop_releases_focus() {
    let mut h = Harness::new();
    h.playing(tracks(1), 0);

    assert_eq!(h.command(Command::Stop), Ok(Outcome::Applied));
    assert_eq!(h.state(), PlaybackState::Stopped);
    assert_eq!(h.controller.focus_state(), FocusState::None);
    assert_eq!(h.focus.lock().unwrap().releases, 1);
    assert!(h.command(Command::Stop).is_err());
}

#[test]
fn persistence_failure_is_absorbed() {
    let mut h = Harness::new();
    h.store.lock().unwrap().fail = true;

    assert_eq!(h.controller.restore(), None);
    h.playing(tracks(2), 0);
    h.command(Command::Next).unwrap();
    assert!(h.store.lock().unwrap().saves >= 2);
}

#[test]
fn publish_failure_is_absorbed() {
    let mut h = Harness::new();
    h.published.lock().unwrap().fail = true;
    h.playing(tracks(1), 0);
    assert!(!h.published.lock().unwrap().updates.is_empty());
}

#[test]
fn restore_reads_the_saved_session() {
    let h = Harness::new();
    assert_eq!(h.controller.restore(), None);

    h.store.lock().unwrap().saved = Some((tracks(3), Some(2)));
    assert_eq!(h.controller.restore(), Some((tracks(3), 2)));

    h.store.lock().unwrap().saved = Some((tracks(3), None));
    assert_eq!(h.controller.restore(), Some((tracks(3), 0)));

    h.store.lock().unwrap().saved = Some((Playlist::default(), None));
    assert_eq!(h.controller.restore(), None);
}

#[test]
fn shutdown_saves_and_tears_down() {
    let mut h = Harness::new();
    h.playing(tracks(2), 1);

    assert_eq!(h.send(Inbound::Shutdown), Ok(Outcome::Applied));
    assert_eq!(h.state(), PlaybackState::Stopped);
    assert!(h.calls().ends_with(&["stop".to_string(), "shutdown".to_string()]));
    assert_eq!(h.store.lock().unwrap().saved, Some((tracks(2), Some(1))));
    assert_eq!(h.focus.lock().unwrap().releases, 1);
}

#[test]
fn worker_applies_events_in_order() {
    let h = Harness::new();
    let published = h.published.clone();
    let engine = h.engine.clone();

    let (tx, rx) = channel();
    let handle = ControllerHandle::spawn(h.controller, tx, rx);
    handle
        .send(Inbound::Load {
            playlist: tracks(2),
            index: 0,
        })
        .unwrap();
    handle
        .send(Inbound::Engine(EngineEvent::Prepared {
            generation: 1,
            duration_ms: None,
        }))
        .unwrap();
    handle.send(Inbound::Command(Command::Pause)).unwrap();
    handle.shutdown();

    let states: Vec<_> = published
        .lock()
        .unwrap()
        .updates
        .iter()
        .map(|u| u.state.clone())
        .collect();
    assert_eq!(
        states,
        vec![
            PlaybackState::Preparing,
            PlaybackState::Playing,
            PlaybackState::Paused,
            PlaybackState::Stopped,
        ]
    );
    assert_eq!(engine.lock().unwrap().calls.last().map(String::as_str), Some("shutdown"));
}

#[test]
fn dropping_the_handle_shuts_the_worker_down() {
    let h = Harness::new();
    let engine = h.engine.clone();
    let (tx, rx) = channel();
    drop(ControllerHandle::spawn(h.controller, tx, rx));
    assert!(engine.lock().unwrap().calls.contains(&"shutdown".to_string()));
}
