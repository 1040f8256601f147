// ============================================================================
// hevcshrink-core/src/processing/inspector.rs
// ============================================================================
//
// MEDIA INSPECTOR: Size and Bitrate of a Candidate File
//
// Combines a filesystem stat with an ffprobe report. The video stream bitrate
// is preferred, then the container's overall bitrate. When neither is reported
// the bitrate is estimated from file size and duration, with duration falling
// back from stream to duration tag to container to frame count / frame rate.

use crate::error::{CoreError, CoreResult};
use crate::external::{FfprobeExecutor, FileMetadataProvider};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Where a [`FileRecord`]'s bitrate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BitrateSource {
    /// Reported by the video stream
    Stream,
    /// The container's overall bitrate; includes audio
    Container,
    /// `size_bits / duration`; includes audio and container overhead
    Estimated,
}

/// What the inspector learned about one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Video bitrate in bits/s, `None` when neither metadata nor an estimate is available
    pub bitrate_bps: Option<u64>,
    pub bitrate_source: Option<BitrateSource>,
    pub duration_secs: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec_name: Option<String>,
}

/// Estimates a bitrate from size and duration. Zero or unusable inputs give `None`.
#[must_use]
pub fn estimate_bitrate(size_bytes: u64, duration_secs: f64) -> Option<u64> {
    if size_bytes == 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
        return None;
    }
    let bps = (size_bytes as f64 * 8.0 / duration_secs).round() as u64;
    (bps > 0).then_some(bps)
}

/// Inspects `path`.
///
/// # Errors
///
/// * [`CoreError::Probe`] if the file cannot be stat'ed, cannot be read as a
///   media container or has no video stream.
/// * Command errors from the probe executor if ffprobe itself cannot run.
pub fn inspect<P: FfprobeExecutor, M: FileMetadataProvider>(
    ffprobe_executor: &P,
    metadata_provider: &M,
    path: &Path,
) -> CoreResult<FileRecord> {
    let size_bytes = metadata_provider
        .get_size(path)
        .map_err(|e| CoreError::probe(path, format!("cannot read file size: {e}")))?;

    let probe = ffprobe_executor.probe(path)?;
    let video = probe
        .video
        .as_ref()
        .ok_or_else(|| CoreError::probe(path, "no video stream found"))?;
    let duration_secs = probe.duration_secs();

    let (bitrate_bps, bitrate_source) = match (video.bit_rate_bps, probe.format_bit_rate_bps) {
        (Some(bps), _) => (Some(bps), Some(BitrateSource::Stream)),
        (None, Some(bps)) => {
            log::debug!("No stream bitrate for {}, using container bitrate", path.display());
            (Some(bps), Some(BitrateSource::Container))
        }
        (None, None) => {
            let estimate = duration_secs.and_then(|d| estimate_bitrate(size_bytes, d));
            if estimate.is_some() {
                log::debug!(
                    "No stream bitrate for {}, estimated from size and duration",
                    path.display()
                );
            }
            (estimate, estimate.map(|_| BitrateSource::Estimated))
        }
    };

    Ok(FileRecord {
        path: path.to_path_buf(),
        size_bytes,
        bitrate_bps,
        bitrate_source,
        duration_secs,
        width: video.width,
        height: video.height,
        codec_name: video.codec_name.clone(),
    })
}
