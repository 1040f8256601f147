//! `FFmpeg` progress handler
//!
//! Turns the ffmpeg-sidecar event stream of one encode into progress-bar
//! updates, periodic log lines and a buffer of error output used to explain a
//! failed encode.

use crate::error::CoreResult;
use crate::utils::{format_duration, parse_ffmpeg_time};
use ffmpeg_sidecar::event::{FfmpegEvent, FfmpegProgress, LogLevel as FfmpegLogLevel};
use std::time::{Duration, Instant};

/// Keep at most this many error lines for the failure message.
const MAX_ERROR_LINES: usize = 20;

/// Handler for `FFmpeg` progress events
pub struct FfmpegProgressHandler {
    duration: Option<f64>,
    last_progress_percent: f64,
    last_log_time: Instant,
    last_logged_percent_threshold: i32,
    error_lines: Vec<String>,
}

impl FfmpegProgressHandler {
    /// Creates a handler for an encode of `duration` seconds of input.
    #[must_use]
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            last_progress_percent: -3.0,
            last_log_time: Instant::now(),
            last_logged_percent_threshold: -1,
            error_lines: Vec::new(),
        }
    }

    /// Handles an `FFmpeg` event
    pub fn handle_event(&mut self, event: FfmpegEvent) -> CoreResult<()> {
        match event {
            FfmpegEvent::Progress(progress) => self.handle_progress(&progress),
            FfmpegEvent::Log(level, message) => self.handle_log(&level, &message),
            FfmpegEvent::Error(error) => self.push_error(&error),
            _ => {}
        }
        Ok(())
    }

    /// Error output collected so far, most relevant line last.
    #[must_use]
    pub fn error_summary(&self) -> Option<String> {
        if self.error_lines.is_empty() {
            None
        } else {
            Some(self.error_lines.join("\n"))
        }
    }

    /// The last error line, which usually names the actual cause.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.error_lines.last().map(String::as_str)
    }

    fn handle_progress(&mut self, progress: &FfmpegProgress) {
        let current_secs = parse_ffmpeg_time(&progress.time).unwrap_or(0.0);
        let percent = self
            .duration
            .filter(|&d| d > 0.0)
            .map_or(0.0, |d| (current_secs / d * 100.0).min(100.0));

        if percent >= self.last_progress_percent + 3.0
            || (percent >= 100.0 && self.last_progress_percent < 100.0)
        {
            crate::progress_reporting::progress(
                percent as f32,
                current_secs,
                self.duration.unwrap_or(0.0),
            );
            self.log_progress_if_needed(percent, current_secs, progress.speed);
            self.last_progress_percent = percent;
        }
    }

    fn handle_log(&mut self, level: &FfmpegLogLevel, message: &str) {
        match level {
            FfmpegLogLevel::Fatal | FfmpegLogLevel::Error => {
                log::debug!(target: "ffmpeg_log", "{message}");
                self.push_error(message);
            }
            FfmpegLogLevel::Warning => log::debug!(target: "ffmpeg_log", "{message}"),
            _ => log::trace!(target: "ffmpeg_log", "{message}"),
        }
    }

    fn push_error(&mut self, error: &str) {
        let line = error.trim();
        if line.is_empty() || is_non_critical_ffmpeg_error(line) {
            log::debug!("ffmpeg non-critical message: {line}");
            return;
        }
        if self.error_lines.len() == MAX_ERROR_LINES {
            self.error_lines.remove(0);
        }
        self.error_lines.push(line.to_string());
    }

    fn log_progress_if_needed(&mut self, percent: f64, current_secs: f64, speed: f32) {
        let current_threshold = (percent as i32 / 25) * 25;
        let should_log = current_threshold > self.last_logged_percent_threshold
            || self.last_log_time.elapsed() >= Duration::from_secs(300);

        if should_log {
            log::info!(
                target: "hevcshrink::progress",
                "Encoding progress: {:.1}% | Time: {} / {} | Speed: {:.2}x",
                percent,
                format_duration(current_secs),
                format_duration(self.duration.unwrap_or(0.0)),
                speed,
            );
            self.last_log_time = Instant::now();
            self.last_logged_percent_threshold = current_threshold;
        }
    }
}

/// Messages ffmpeg prints on stderr that do not indicate a failed encode.
fn is_non_critical_ffmpeg_error(error: &str) -> bool {
    error.contains("deprecated pixel format")
        || error.contains("No accelerated colorspace conversion")
        || error.contains("automatically inserted filter")
        || error.contains("Timestamps are unset")
        || error.contains("first frame is no keyframe")
}
