use serde::Serialize;

/// Single progress update for a running encode. Percent is clamped to 0..=100
/// and the emitting tracker never repeats a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub percent: u8,
}

/// Scan an ffmpeg diagnostic line for a `time=HH:MM:SS.ff` marker and return
/// the elapsed seconds.
///
/// The stream interleaves these markers with free-form log text, so this is a
/// substring scan, not structured parsing. Lines without a marker (or with a
/// malformed one, e.g. `time=N/A`) yield `None`.
pub fn parse_time_marker(line: &str) -> Option<f64> {
    let start = line.find("time=")? + "time=".len();
    let rest = &line[start..];
    let end = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    parse_clock(&rest[..end])
}

/// Parse an `HH:MM:SS.ff` clock string into seconds.
pub fn parse_clock(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Converts observed elapsed times into de-duplicated percentage events.
///
/// The emitted sequence is monotonic non-decreasing and contains no
/// consecutive duplicates; downstream message edits must not be spammed with
/// repeated identical values.
pub struct ProgressTracker {
    total_seconds: f64,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total_seconds: f64) -> Self {
        Self {
            total_seconds,
            last_percent: None,
        }
    }

    /// Feed an elapsed time; returns an event only when the percentage moved.
    pub fn observe(&mut self, elapsed_seconds: f64) -> Option<ProgressEvent> {
        let percent = percent_of(elapsed_seconds, self.total_seconds);
        if self.last_percent == Some(percent) {
            return None;
        }
        // Encoder timestamps only move forward; never step the percent back.
        if let Some(last) = self.last_percent {
            if percent < last {
                return None;
            }
        }
        self.last_percent = Some(percent);
        Some(ProgressEvent { percent })
    }

    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }
}

/// `min(100, floor(100 * elapsed / total))`. Clamped even when encoder
/// rounding pushes the elapsed time past the probed duration.
pub fn percent_of(elapsed: f64, total: f64) -> u8 {
    if total <= 0.0 {
        return 0;
    }
    let pct = (elapsed / total * 100.0).floor();
    pct.clamp(0.0, 100.0) as u8
}
