//! FFprobe integration for media inspection.
//!
//! The [`FfprobeExecutor`] trait returns a [`MediaProbe`], a reduced view of
//! the ffprobe report that holds only what the inspector needs. The production
//! implementation is backed by the `ffprobe` crate.

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::external::{check_dependency, run_captured};
use crate::utils::{parse_ffmpeg_time, parse_frame_rate, parse_positive_f64, parse_positive_u64};
use ffprobe::{FfProbe, FfProbeError, ffprobe};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Properties of the first video stream of a container.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VideoStreamProbe {
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Stream bitrate in bits/s, if reported and positive
    pub bit_rate_bps: Option<u64>,
    /// Stream duration in seconds, if reported and positive
    pub duration_secs: Option<f64>,
    /// The stream's `DURATION` tag (HH:MM:SS.fff), as written by Matroska muxers
    pub tag_duration_secs: Option<f64>,
    /// `nb_frames`, if reported
    pub frame_count: Option<u64>,
    /// `r_frame_rate` as frames per second
    pub frame_rate: Option<f64>,
}

/// Container-level probe result.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaProbe {
    /// First video stream, `None` for audio-only or data files
    pub video: Option<VideoStreamProbe>,
    pub format_duration_secs: Option<f64>,
    pub format_bit_rate_bps: Option<u64>,
}

impl MediaProbe {
    /// Best available duration: stream duration, then the stream's duration
    /// tag, then container duration, then frame count divided by frame rate.
    pub fn duration_secs(&self) -> Option<f64> {
        let stream = self.video.as_ref();
        stream
            .and_then(|v| v.duration_secs.or(v.tag_duration_secs))
            .or(self.format_duration_secs)
            .or_else(|| {
                let v = stream?;
                let frames = v.frame_count.filter(|f| *f > 0)?;
                let rate = v.frame_rate?;
                Some(frames as f64 / rate)
            })
    }

    fn from_ffprobe(metadata: &FfProbe) -> Self {
        let video = metadata
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .map(|s| VideoStreamProbe {
                codec_name: s.codec_name.clone(),
                width: s.width.and_then(|w| u32::try_from(w).ok()),
                height: s.height.and_then(|h| u32::try_from(h).ok()),
                bit_rate_bps: s.bit_rate.as_deref().and_then(parse_positive_u64),
                duration_secs: s.duration.as_deref().and_then(parse_positive_f64),
                tag_duration_secs: None,
                frame_count: s.nb_frames.as_deref().and_then(parse_positive_u64),
                frame_rate: parse_frame_rate(&s.r_frame_rate),
            });

        Self {
            video,
            format_duration_secs: metadata.format.duration.as_deref().and_then(parse_positive_f64),
            format_bit_rate_bps: metadata.format.bit_rate.as_deref().and_then(parse_positive_u64),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TagReport {
    #[serde(default)]
    streams: Vec<TaggedStream>,
}

#[derive(Debug, Default, Deserialize)]
struct TaggedStream {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Reads the first video stream's `DURATION` tag from
/// `ffprobe -show_entries stream_tags=DURATION -of json` output.
fn parse_duration_tag(json: &str) -> Option<f64> {
    let report: TagReport = serde_json::from_str(json).ok()?;
    let stream = report.streams.into_iter().next()?;
    let value = stream
        .tags
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("duration"))
        .map(|(_, value)| value.as_str())?;
    parse_ffmpeg_time(value.trim()).filter(|d| d.is_finite() && *d > 0.0)
}

/// The `ffprobe` crate drops stream tags it does not model, so the duration
/// tag is read with a separate, narrow query.
fn probe_duration_tag(input_path: &Path) -> Option<f64> {
    let path = input_path.to_string_lossy();
    let args = [
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream_tags=DURATION",
        "-of",
        "json",
        &*path,
    ];
    match run_captured("ffprobe", &args) {
        Ok(json) => parse_duration_tag(&json),
        Err(e) => {
            log::debug!("No duration tag for {}: {}", input_path.display(), e);
            None
        }
    }
}

/// Trait for probing media containers.
pub trait FfprobeExecutor {
    /// Probes `input_path`. Any failure to read the file as media is a
    /// [`CoreError::Probe`] naming the file.
    fn probe(&self, input_path: &Path) -> CoreResult<MediaProbe>;

    /// Verifies the executor can run at all. Called once before the first file.
    fn check_available(&self) -> CoreResult<()> {
        Ok(())
    }
}

/// Production executor backed by the `ffprobe` crate.
#[derive(Debug, Clone, Default)]
pub struct CrateFfprobeExecutor;

impl CrateFfprobeExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl FfprobeExecutor for CrateFfprobeExecutor {
    fn probe(&self, input_path: &Path) -> CoreResult<MediaProbe> {
        log::debug!("Running ffprobe on: {}", input_path.display());
        match ffprobe(input_path) {
            Ok(metadata) => {
                let mut probe = MediaProbe::from_ffprobe(&metadata);
                if let Some(video) = probe.video.as_mut().filter(|v| v.duration_secs.is_none()) {
                    video.tag_duration_secs = probe_duration_tag(input_path);
                }
                Ok(probe)
            }
            Err(err) => {
                log::debug!("ffprobe failed on {}: {:?}", input_path.display(), err);
                Err(map_ffprobe_error(err, input_path))
            }
        }
    }

    fn check_available(&self) -> CoreResult<()> {
        check_dependency("ffprobe")
    }
}

fn map_ffprobe_error(err: FfProbeError, input_path: &Path) -> CoreError {
    match err {
        // ffprobe binary missing or not startable is an encoder-side failure,
        // not a property of the file
        FfProbeError::Io(io_err) => command_start_error("ffprobe", io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("ffprobe exited unsuccessfully")
                .trim()
                .to_string();
            log::debug!(
                "{}",
                command_failed_error("ffprobe", output.status, stderr.into_owned())
            );
            CoreError::probe(input_path, message)
        }
        FfProbeError::Deserialize(err) => {
            CoreError::probe(input_path, format!("unreadable ffprobe output: {err}"))
        }
        _ => CoreError::probe(input_path, format!("unknown ffprobe error: {err:?}")),
    }
}
