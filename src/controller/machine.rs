use tracing::{debug, error, info, warn};

use crate::config::PlaybackSettings;
use crate::engine::{EngineEvent, Generation, PlaybackEngine};
use crate::error::{ControlError, Result};
use crate::focus::{FocusArbiter, FocusEvent, FocusState};
use crate::interruption::{Cause, Interruption};
use crate::library::Track;
use crate::persistence::PlaylistStore;
use crate::playlist::{DEFAULT_RESTART_THRESHOLD_MS, Playlist};
use crate::session::{SessionMetadata, SessionPublisher, StatusUpdate};

use super::event::{Command, Inbound};
use super::state::{InterruptionState, PauseFlags, PlaybackState, ResumeCursor};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerOptions {
    pub restart_threshold_ms: u64,
    pub repeat_playlist: bool,
    pub duck_volume: f32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            restart_threshold_ms: DEFAULT_RESTART_THRESHOLD_MS,
            repeat_playlist: false,
            duck_volume: 0.1,
        }
    }
}

impl From<&PlaybackSettings> for ControllerOptions {
    fn from(s: &PlaybackSettings) -> Self {
        Self {
            restart_threshold_ms: s.restart_threshold_ms,
            repeat_playlist: s.repeat_playlist,
            duck_volume: s.duck_volume,
        }
    }
}

/// What `handle` did with an accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State, track or position changed; status was published.
    Applied,
    /// Valid, but nothing to do.
    Unchanged,
    /// Late engine event from a cancelled generation.
    Stale,
}

/// Single owner of playback state.
///
/// Collaborators are reached only through their traits, so the whole state
/// machine runs against fakes in tests.
pub struct PlaybackController {
    engine: Box<dyn PlaybackEngine>,
    focus: Box<dyn FocusArbiter>,
    publisher: Box<dyn SessionPublisher>,
    store: Box<dyn PlaylistStore>,
    options: ControllerOptions,

    state: PlaybackState,
    focus_state: FocusState,
    interruption: InterruptionState,
    playlist: Option<Playlist>,
    current: Option<usize>,
    cursor: Option<ResumeCursor>,
    flags: PauseFlags,
    stopped_by_focus_loss: bool,
    /// The engine reported end of track while we were paused.
    ended: bool,
    ducked: bool,
    generation: Generation,
    duration_ms: Option<u64>,
}

impl PlaybackController {
    pub fn new(
        engine: Box<dyn PlaybackEngine>,
        focus: Box<dyn FocusArbiter>,
        publisher: Box<dyn SessionPublisher>,
        store: Box<dyn PlaylistStore>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            engine,
            focus,
            publisher,
            store,
            options,
            state: PlaybackState::Idle,
            focus_state: FocusState::None,
            interruption: InterruptionState::default(),
            playlist: None,
            current: None,
            cursor: None,
            flags: PauseFlags::default(),
            stopped_by_focus_loss: false,
            ended: false,
            ducked: false,
            generation: 0,
            duration_ms: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus_state
    }

    pub fn interruption(&self) -> InterruptionState {
        self.interruption
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn pause_flags(&self) -> PauseFlags {
        self.flags
    }

    pub fn resume_cursor(&self) -> Option<ResumeCursor> {
        self.cursor
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether the last stop came from a permanent focus loss. Diagnostic
    /// only: it is logged with rejections and cleared by the next load.
    pub fn stopped_by_focus_loss(&self) -> bool {
        self.stopped_by_focus_loss
    }

    /// Saved playlist and index, if the store has a usable one.
    ///
    /// Storage failures are logged and read as "no playlist".
    pub fn restore(&self) -> Option<(Playlist, usize)> {
        match self.store.load() {
            Ok(Some((playlist, index))) if !playlist.is_empty() => {
                let index = index.unwrap_or(0);
                info!(tracks = playlist.len(), index, "restored saved session");
                Some((playlist, index))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "saved session unavailable, starting idle");
                None
            }
        }
    }

    pub fn handle(&mut self, event: Inbound) -> Result<Outcome> {
        let name = event.name();
        let before = (self.state.clone(), self.current);

        let result = match event {
            Inbound::Load { playlist, index } => self.load(playlist, index),
            Inbound::Command(command) => self.command(command),
            Inbound::Engine(event) => self.engine_event(event),
            Inbound::Focus(event) => self.focus_event(event),
            Inbound::Interruption(edge) => self.interruption_edge(edge),
            Inbound::Shutdown => {
                self.shutdown();
                Ok(Outcome::Applied)
            }
        };

        match &result {
            Ok(Outcome::Applied) => {
                info!(event = name, state = %self.state, index = ?self.current, "transition")
            }
            Ok(Outcome::Unchanged) => debug!(event = name, state = %self.state, "no-op"),
            Ok(Outcome::Stale) => debug!(event = name, generation = self.generation, "stale event discarded"),
            Err(e) => warn!(
                event = name,
                state = %self.state,
                stopped_by_focus_loss = self.stopped_by_focus_loss,
                error = %e,
                "rejected"
            ),
        }

        let changed = before != (self.state.clone(), self.current);
        if changed || matches!(result, Ok(Outcome::Applied)) {
            self.publish();
        }
        result
    }

    pub fn status(&self) -> StatusUpdate {
        StatusUpdate {
            state: self.state.clone(),
            metadata: self
                .current_track()
                .map(|t| SessionMetadata::project(t, &self.state)),
            index: self.current,
            position_ms: self.elapsed_ms(),
            duration_ms: self.duration_ms,
        }
    }

    /// Final persistence write and teardown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.persist();
        if self.state.is_active() {
            self.engine.stop();
            self.clear_playback();
            self.state = PlaybackState::Stopped;
        }
        self.engine.shutdown();
        self.release_focus();
    }

    fn load(&mut self, playlist: Playlist, index: usize) -> Result<Outcome> {
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            return Err(self.invalid("load"));
        }
        if !playlist.is_valid(index) {
            return Err(ControlError::InvalidIndex {
                index,
                len: playlist.len(),
            });
        }

        let cancelled = self.state == PlaybackState::Preparing;
        if cancelled {
            self.engine.stop();
            self.generation += 1;
        }

        self.playlist = Some(playlist);
        self.current = Some(index);
        self.stopped_by_focus_loss = false;
        self.persist();

        if let Err(e) = self.acquire_focus() {
            if cancelled {
                self.clear_playback();
                self.state = PlaybackState::Stopped;
            }
            return Err(e);
        }
        self.prepare_current()
    }

    fn command(&mut self, command: Command) -> Result<Outcome> {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Toggle => match self.state {
                PlaybackState::Playing => self.pause(),
                PlaybackState::Paused => self.play(),
                _ => Err(self.invalid("toggle")),
            },
            Command::Next | Command::Previous => self.navigate(command),
            Command::Stop => self.stop(),
            Command::Seek(position_ms) => self.seek(position_ms),
        }
    }

    fn play(&mut self) -> Result<Outcome> {
        match self.state {
            PlaybackState::Playing => Ok(Outcome::Unchanged),
            PlaybackState::Paused => {
                if self.flags.focus || !self.focus_state.is_held() {
                    self.acquire_focus()?;
                }
                self.flags.clear();
                Ok(self.resume())
            }
            _ => Err(self.invalid("play")),
        }
    }

    fn pause(&mut self) -> Result<Outcome> {
        match self.state {
            PlaybackState::Playing => {
                self.pause_engine(true);
                Ok(Outcome::Applied)
            }
            PlaybackState::Paused => {
                // user intent wins over any pending auto-resume
                self.flags.clear();
                Ok(Outcome::Unchanged)
            }
            _ => Err(self.invalid("pause")),
        }
    }

    fn navigate(&mut self, command: Command) -> Result<Outcome> {
        let event = command.name();
        if !self.state.is_active() {
            return Err(self.invalid(event));
        }
        let (Some(playlist), Some(current)) = (self.playlist.as_ref(), self.current) else {
            return Err(self.invalid(event));
        };

        let target = match command {
            Command::Next => playlist.advance(current),
            _ => playlist.retreat_with(current, self.elapsed_ms(), self.options.restart_threshold_ms),
        };
        let Some(target) = target else {
            return Err(ControlError::InvalidIndex {
                index: current,
                len: playlist.len(),
            });
        };

        self.engine.stop();
        self.current = Some(target);
        if target != current {
            self.persist();
        }
        self.prepare_current()
    }

    fn stop(&mut self) -> Result<Outcome> {
        if !self.state.is_active() {
            return Err(self.invalid("stop"));
        }
        self.engine.stop();
        self.release_focus();
        self.clear_playback();
        self.state = PlaybackState::Stopped;
        Ok(Outcome::Applied)
    }

    fn seek(&mut self, position_ms: u64) -> Result<Outcome> {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            return Err(self.invalid("seek"));
        }
        let target = self.duration_ms.map_or(position_ms, |d| position_ms.min(d));
        if let Err(e) = self.engine.seek(target) {
            self.fail(e.to_string());
            return Ok(Outcome::Applied);
        }
        if self.state == PlaybackState::Paused {
            self.cursor = Some(ResumeCursor {
                position_ms: target,
            });
        }
        self.ended = false;
        Ok(Outcome::Applied)
    }

    fn engine_event(&mut self, event: EngineEvent) -> Result<Outcome> {
        if event.generation() != self.generation || !self.state.is_active() {
            return Ok(Outcome::Stale);
        }
        match event {
            EngineEvent::Prepared { duration_ms, .. } => self.prepared(duration_ms),
            EngineEvent::Completed { .. } => self.completed(),
            EngineEvent::Error { reason, .. } => {
                self.fail(reason);
                Ok(Outcome::Applied)
            }
        }
    }

    fn prepared(&mut self, duration_ms: Option<u64>) -> Result<Outcome> {
        if self.state != PlaybackState::Preparing {
            return Ok(Outcome::Stale);
        }
        self.duration_ms = duration_ms.or_else(|| self.engine.duration_ms());

        // Anything that paused us while preparing still holds now.
        self.flags = PauseFlags {
            focus: self.focus_state == FocusState::TransientLoss,
            call: self.interruption.call_active,
        };
        if self.flags.any() {
            self.state = PlaybackState::Paused;
            return Ok(Outcome::Applied);
        }

        if let Err(e) = self.acquire_focus() {
            self.engine.stop();
            self.clear_playback();
            self.state = PlaybackState::Stopped;
            return Err(e);
        }
        Ok(self.start_playback())
    }

    fn completed(&mut self) -> Result<Outcome> {
        match self.state {
            PlaybackState::Playing => self.finish_track(),
            // Paused right as the track ran out; move on once resumed.
            PlaybackState::Paused => {
                self.ended = true;
                Ok(Outcome::Unchanged)
            }
            _ => Ok(Outcome::Stale),
        }
    }

    /// Next track, or stop after the last one unless repeating.
    fn finish_track(&mut self) -> Result<Outcome> {
        let at_end = match (self.playlist.as_ref(), self.current) {
            (Some(p), Some(i)) => i + 1 >= p.len(),
            _ => true,
        };
        if at_end && !self.options.repeat_playlist {
            self.engine.stop();
            self.release_focus();
            self.clear_playback();
            self.state = PlaybackState::Stopped;
            return Ok(Outcome::Applied);
        }
        self.navigate(Command::Next)
    }

    fn focus_event(&mut self, event: FocusEvent) -> Result<Outcome> {
        if event != FocusEvent::Lost
            && matches!(self.focus_state, FocusState::None | FocusState::Lost)
        {
            // Not holding focus; a late event from before our release.
            return Ok(Outcome::Unchanged);
        }

        match event {
            FocusEvent::Lost => {
                self.focus_state = FocusState::Lost;
                if !self.state.is_active() {
                    return Ok(Outcome::Unchanged);
                }
                self.engine.stop();
                self.engine.release();
                self.focus.release();
                self.ducked = false;
                self.clear_playback();
                self.stopped_by_focus_loss = true;
                self.state = PlaybackState::Stopped;
                Ok(Outcome::Applied)
            }
            FocusEvent::TransientLoss => {
                self.focus_state = FocusState::TransientLoss;
                match self.state {
                    PlaybackState::Playing => {
                        if self.pause_engine(false) {
                            self.flags.focus = true;
                        }
                        Ok(Outcome::Applied)
                    }
                    PlaybackState::Paused if self.flags.any() => {
                        self.flags.focus = true;
                        Ok(Outcome::Applied)
                    }
                    _ => Ok(Outcome::Unchanged),
                }
            }
            FocusEvent::DuckRequested => {
                self.focus_state = FocusState::DuckRequested;
                if self.state == PlaybackState::Playing {
                    self.apply_volume();
                    return Ok(Outcome::Applied);
                }
                Ok(Outcome::Unchanged)
            }
            FocusEvent::Granted => {
                self.focus_state = FocusState::Granted;
                let restored = self.apply_volume();
                if self.state == PlaybackState::Paused && self.flags.focus {
                    self.flags.focus = false;
                    if !self.flags.any() {
                        return Ok(self.resume());
                    }
                    return Ok(Outcome::Applied);
                }
                Ok(if restored {
                    Outcome::Applied
                } else {
                    Outcome::Unchanged
                })
            }
        }
    }

    fn interruption_edge(&mut self, edge: Interruption) -> Result<Outcome> {
        match edge {
            Interruption::Begin(Cause::Call) => {
                self.interruption.call_active = true;
                match self.state {
                    PlaybackState::Playing => {
                        if self.pause_engine(true) {
                            self.flags.call = true;
                        }
                        Ok(Outcome::Applied)
                    }
                    PlaybackState::Paused if self.flags.any() => {
                        self.flags.call = true;
                        Ok(Outcome::Applied)
                    }
                    _ => Ok(Outcome::Unchanged),
                }
            }
            Interruption::End(Cause::Call) => {
                self.interruption.call_active = false;
                if self.state == PlaybackState::Paused && self.flags.call {
                    self.flags.call = false;
                    if !self.flags.any() {
                        return Ok(self.resume());
                    }
                    return Ok(Outcome::Applied);
                }
                Ok(Outcome::Unchanged)
            }
            // Becoming noisy never resumes by itself.
            Interruption::Begin(Cause::NoisyRoute) => match self.state {
                PlaybackState::Playing => {
                    self.pause_engine(true);
                    Ok(Outcome::Applied)
                }
                PlaybackState::Paused if self.flags.any() => {
                    self.flags.clear();
                    Ok(Outcome::Applied)
                }
                _ => Ok(Outcome::Unchanged),
            },
            Interruption::End(Cause::NoisyRoute) => Ok(Outcome::Unchanged),
        }
    }

    fn current_track(&self) -> Option<&Track> {
        self.playlist.as_ref()?.at(self.current?)
    }

    fn elapsed_ms(&self) -> u64 {
        match self.state {
            PlaybackState::Playing => self.engine.position_ms(),
            PlaybackState::Paused => self
                .cursor
                .map_or_else(|| self.engine.position_ms(), |c| c.position_ms),
            _ => 0,
        }
    }

    fn invalid(&self, event: &'static str) -> ControlError {
        ControlError::InvalidState {
            event,
            state: self.state.clone(),
        }
    }

    fn acquire_focus(&mut self) -> Result<()> {
        if self.focus_state.is_held() {
            return Ok(());
        }
        self.focus_state = self.focus.request()?;
        Ok(())
    }

    fn release_focus(&mut self) {
        if matches!(
            self.focus_state,
            FocusState::Granted | FocusState::DuckRequested | FocusState::TransientLoss
        ) {
            self.focus.release();
            self.focus_state = FocusState::None;
        }
        if self.ducked {
            self.engine.set_volume(1.0);
            self.ducked = false;
        }
    }

    /// Match output volume to the focus state. Returns whether it changed.
    fn apply_volume(&mut self) -> bool {
        let duck = self.focus_state == FocusState::DuckRequested;
        if duck == self.ducked {
            return false;
        }
        let volume = if duck { self.options.duck_volume } else { 1.0 };
        self.engine.set_volume(volume);
        self.ducked = duck;
        true
    }

    fn prepare_current(&mut self) -> Result<Outcome> {
        let Some(track) = self.current_track().cloned() else {
            let len = self.playlist.as_ref().map_or(0, Playlist::len);
            return Err(ControlError::InvalidIndex {
                index: self.current.unwrap_or(0),
                len,
            });
        };

        self.generation += 1;
        self.flags.clear();
        self.cursor = None;
        self.duration_ms = None;
        self.ended = false;
        self.state = PlaybackState::Preparing;
        if let Err(e) = self.engine.prepare(&track, self.generation) {
            self.fail(e.to_string());
        }
        Ok(Outcome::Applied)
    }

    fn start_playback(&mut self) -> Outcome {
        if let Err(e) = self.engine.start() {
            self.fail(e.to_string());
            return Outcome::Applied;
        }
        self.apply_volume();
        self.state = PlaybackState::Playing;
        Outcome::Applied
    }

    /// Seek back to the captured cursor, if any, and start.
    fn resume(&mut self) -> Outcome {
        if std::mem::take(&mut self.ended) {
            return self.finish_track().unwrap_or_else(|e| {
                warn!(error = %e, "could not move past the finished track");
                Outcome::Applied
            });
        }
        if let Some(cursor) = self.cursor.take() {
            if let Err(e) = self.engine.seek(cursor.position_ms) {
                self.fail(e.to_string());
                return Outcome::Applied;
            }
        }
        self.start_playback()
    }

    /// Returns false when the engine failed and the controller moved to `Failed`.
    fn pause_engine(&mut self, capture_cursor: bool) -> bool {
        if let Err(e) = self.engine.pause() {
            self.fail(e.to_string());
            return false;
        }
        if capture_cursor {
            self.cursor = Some(ResumeCursor {
                position_ms: self.engine.position_ms(),
            });
        }
        self.state = PlaybackState::Paused;
        true
    }

    fn fail(&mut self, reason: String) {
        error!(%reason, index = ?self.current, "playback failed");
        self.engine.stop();
        self.engine.release();
        self.release_focus();
        self.clear_playback();
        self.state = PlaybackState::Failed(reason);
    }

    /// Invalidate in-flight engine work and forget pause bookkeeping.
    fn clear_playback(&mut self) {
        self.generation += 1;
        self.ended = false;
        self.flags.clear();
        self.cursor = None;
        self.duration_ms = None;
    }

    fn persist(&mut self) {
        let Some(playlist) = self.playlist.as_ref() else {
            return;
        };
        if let Err(e) = self.store.save(playlist, self.current) {
            warn!(error = %e, "could not save session");
        }
    }

    fn publish(&mut self) {
        let update = self.status();
        if let Err(e) = self.publisher.publish(&update) {
            warn!(error = %e, "could not publish status");
        }
    }
}
