//! Utilities for creating `rodio` sinks from track locators.
//!
//! The helper here encapsulates opening/decoding a file and preparing a
//! paused `Sink` at the requested start position.

use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

/// Create a paused `Sink` for `locator` that starts playback at `start_at`.
///
/// Returns the sink together with the decoder's total duration, when known.
pub(super) fn create_sink_at(
    stream: &OutputStream,
    locator: &str,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), String> {
    let file = File::open(locator).map_err(|e| format!("failed to open {locator}: {e}"))?;

    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| format!("failed to decode {locator}: {e}"))?;
    let total = source.total_duration();

    let sink = Sink::connect_new(stream.mixer());
    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    sink.append(source.skip_duration(start_at));
    sink.pause();
    Ok((sink, total))
}

/// Ramp `sink` down to silence over roughly `fade_out_ms`.
pub(super) fn fade_out_sink(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    let start = sink.volume();
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(start * (1.0 - t));
        std::thread::sleep(Duration::from_millis(step_ms));
    }
    sink.set_volume(0.0);
}
