use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, error, warn};

use crate::config::AudioSettings;
use crate::controller::{EventSender, Inbound};
use crate::error::{ControlError, Result};
use crate::library::Track;

use super::sink::{create_sink_at, fade_out_sink};
use super::{EngineEvent, Generation, PlaybackEngine};

/// How often the audio thread checks for end-of-track.
const COMPLETION_POLL: Duration = Duration::from_millis(200);

#[derive(Debug)]
enum EngineCmd {
    Prepare {
        locator: String,
        generation: Generation,
    },
    Start,
    Pause,
    Seek(Duration),
    Stop,
    Release,
    SetVolume(f32),
    Quit { fade_out_ms: u64 },
}

/// Playback position bookkeeping shared between the handle and the audio thread.
///
/// The handle updates it synchronously on start/pause/seek so that a position
/// read right after a pause is exact; the audio thread only fills in durations.
#[derive(Debug, Default)]
pub(super) struct Clock {
    pub(super) generation: Generation,
    pub(super) started_at: Option<Instant>,
    pub(super) accumulated: Duration,
    pub(super) duration: Option<Duration>,
}

impl Clock {
    pub(super) fn elapsed(&self) -> Duration {
        self.accumulated + self.started_at.map_or(Duration::ZERO, |st| st.elapsed())
    }

    pub(super) fn run(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    pub(super) fn hold(&mut self) {
        if let Some(st) = self.started_at.take() {
            self.accumulated += st.elapsed();
        }
    }

    pub(super) fn jump(&mut self, to: Duration) {
        self.accumulated = to;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    pub(super) fn reset(&mut self, generation: Generation) {
        *self = Self {
            generation,
            ..Self::default()
        };
    }
}

type ClockHandle = Arc<Mutex<Clock>>;

/// `PlaybackEngine` backed by a dedicated rodio audio thread.
///
/// The output stream lives on that thread; this handle only sends commands.
pub struct RodioEngine {
    tx: Sender<EngineCmd>,
    clock: ClockHandle,
    join: Option<JoinHandle<()>>,
    quit_fade_out_ms: u64,
}

impl RodioEngine {
    pub fn spawn(events: EventSender, settings: &AudioSettings) -> Self {
        let (tx, rx) = mpsc::channel::<EngineCmd>();
        let clock: ClockHandle = Arc::new(Mutex::new(Clock::default()));
        let join = spawn_audio_thread(rx, events, clock.clone());

        Self {
            tx,
            clock,
            join: Some(join),
            quit_fade_out_ms: settings.quit_fade_out_ms,
        }
    }

    fn send(&self, cmd: EngineCmd) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| ControlError::EngineFailure("audio thread has exited".to_string()))
    }

    fn with_clock(&self, f: impl FnOnce(&mut Clock)) {
        if let Ok(mut clock) = self.clock.lock() {
            f(&mut clock);
        }
    }
}

impl PlaybackEngine for RodioEngine {
    fn prepare(&mut self, track: &Track, generation: Generation) -> Result<()> {
        self.with_clock(|c| c.reset(generation));
        self.send(EngineCmd::Prepare {
            locator: track.locator.clone(),
            generation,
        })
    }

    fn start(&mut self) -> Result<()> {
        self.send(EngineCmd::Start)?;
        self.with_clock(Clock::run);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.send(EngineCmd::Pause)?;
        self.with_clock(Clock::hold);
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        let to = Duration::from_millis(position_ms);
        self.send(EngineCmd::Seek(to))?;
        self.with_clock(|c| c.jump(to));
        Ok(())
    }

    fn stop(&mut self) {
        let _ = self.send(EngineCmd::Stop);
        self.with_clock(|c| {
            let generation = c.generation;
            c.reset(generation);
        });
    }

    fn release(&mut self) {
        let _ = self.send(EngineCmd::Release);
        self.with_clock(|c| c.reset(0));
    }

    fn set_volume(&mut self, volume: f32) {
        let _ = self.send(EngineCmd::SetVolume(volume.clamp(0.0, 1.0)));
    }

    fn position_ms(&self) -> u64 {
        self.clock
            .lock()
            .map(|c| c.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn duration_ms(&self) -> Option<u64> {
        self.clock
            .lock()
            .ok()
            .and_then(|c| c.duration)
            .map(|d| d.as_millis() as u64)
    }

    fn shutdown(&mut self) {
        let _ = self.send(EngineCmd::Quit {
            fade_out_ms: self.quit_fade_out_ms,
        });
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

/// What the audio thread holds for the prepared track.
struct Loaded {
    sink: Sink,
    locator: String,
    generation: Generation,
    playing: bool,
    completion_sent: bool,
}

fn spawn_audio_thread(
    rx: Receiver<EngineCmd>,
    events: EventSender,
    clock: ClockHandle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when OutputStream is dropped.
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(e) => {
                error!(error = %e, "no audio output device");
                None
            }
        };

        let emit = |event: EngineEvent| {
            let _ = events.send(Inbound::Engine(event));
        };

        let mut loaded: Option<Loaded> = None;
        let mut volume: f32 = 1.0;

        loop {
            match rx.recv_timeout(COMPLETION_POLL) {
                Ok(cmd) => match cmd {
                    EngineCmd::Prepare {
                        locator,
                        generation,
                    } => {
                        if let Some(old) = loaded.take() {
                            old.sink.stop();
                        }
                        match open(stream.as_ref(), &locator, Duration::ZERO) {
                            Ok((sink, duration)) => {
                                sink.set_volume(volume);
                                if let Ok(mut c) = clock.lock() {
                                    if c.generation == generation {
                                        c.duration = duration;
                                    }
                                }
                                debug!(%locator, generation, "prepared");
                                loaded = Some(Loaded {
                                    sink,
                                    locator,
                                    generation,
                                    playing: false,
                                    completion_sent: false,
                                });
                                emit(EngineEvent::Prepared {
                                    generation,
                                    duration_ms: duration.map(|d| d.as_millis() as u64),
                                });
                            }
                            Err(reason) => {
                                warn!(%locator, generation, %reason, "prepare failed");
                                emit(EngineEvent::Error { generation, reason });
                            }
                        }
                    }

                    EngineCmd::Start => {
                        if let Some(l) = loaded.as_mut() {
                            l.sink.play();
                            l.playing = true;
                            // An already drained sink reports completion again.
                            l.completion_sent = false;
                        }
                    }

                    EngineCmd::Pause => {
                        if let Some(l) = loaded.as_mut() {
                            l.sink.pause();
                            l.playing = false;
                        }
                    }

                    EngineCmd::Seek(to) => {
                        // Rebuild the sink and skip into the file.
                        let Some(l) = loaded.as_mut() else {
                            continue;
                        };
                        l.sink.stop();
                        match open(stream.as_ref(), &l.locator, to) {
                            Ok((sink, _)) => {
                                sink.set_volume(volume);
                                if l.playing {
                                    sink.play();
                                }
                                l.sink = sink;
                                l.completion_sent = false;
                            }
                            Err(reason) => {
                                let generation = l.generation;
                                loaded = None;
                                emit(EngineEvent::Error { generation, reason });
                            }
                        }
                    }

                    EngineCmd::Stop => {
                        if let Some(l) = loaded.take() {
                            l.sink.stop();
                        }
                    }

                    EngineCmd::Release => {
                        if let Some(l) = loaded.take() {
                            l.sink.stop();
                        }
                        volume = 1.0;
                    }

                    EngineCmd::SetVolume(v) => {
                        volume = v;
                        if let Some(l) = loaded.as_ref() {
                            l.sink.set_volume(v);
                        }
                    }

                    EngineCmd::Quit { fade_out_ms } => {
                        if let Some(l) = loaded.take() {
                            if l.playing {
                                fade_out_sink(&l.sink, fade_out_ms);
                            }
                            l.sink.stop();
                        }
                        break;
                    }
                },
                Err(RecvTimeoutError::Timeout) => {
                    // periodic check for end of track
                    if let Some(l) = loaded.as_mut() {
                        if l.playing && !l.completion_sent && l.sink.empty() {
                            l.completion_sent = true;
                            l.playing = false;
                            emit(EngineEvent::Completed {
                                generation: l.generation,
                            });
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

pub(super) fn open(
    stream: Option<&OutputStream>,
    locator: &str,
    start_at: Duration,
) -> std::result::Result<(Sink, Option<Duration>), String> {
    let stream = stream.ok_or_else(|| "no audio output device".to_string())?;
    create_sink_at(stream, locator, start_at)
}
