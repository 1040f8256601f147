// ============================================================================
// hevcshrink-core/src/processing/transcode.rs
// ============================================================================
//
// TRANSCODER: HEVC Encode of One File at a Target Bitrate
//
// KEY COMPONENTS:
// - Transcoder: the seam the orchestrator encodes through
// - FfmpegTranscoder: ffmpeg implementation over an FfmpegSpawner
// - output_path_for / build_encode_args: pure helpers
//
// The output is written next to the source as <stem><marker>.<ext>. The path
// is claimed with create_new before ffmpeg starts, so a file that already
// exists is never overwritten or removed. A failed or empty encode leaves no
// output behind.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegProcess, FfmpegSpawner, check_dependency};
use crate::hardware::{EncoderSelection, HevcEncoder, detect_encoders, select_encoder};
use crate::processing::inspector::FileRecord;
use crate::progress_reporting::{self, ffmpeg_handler::FfmpegProgressHandler};
use crate::utils::format_bitrate;

use std::cell::OnceCell;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Encodes a source file to HEVC at a target bitrate.
pub trait Transcoder {
    /// Encodes `source` at `target_bitrate_bps` and returns the output path.
    ///
    /// On error the source is untouched and no output file remains.
    fn encode(&self, source: &Path, target_bitrate_bps: u64) -> CoreResult<PathBuf>;

    /// Encodes an inspected file. Implementations that can use the probed
    /// duration for progress reporting override this.
    fn encode_file(&self, record: &FileRecord, target_bitrate_bps: u64) -> CoreResult<PathBuf> {
        self.encode(&record.path, target_bitrate_bps)
    }

    /// One-time setup before the first encode of a batch. An error here fails
    /// every file that reaches the encode step.
    fn prepare(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Name of the encoder in use, for results and summaries.
    fn encoder_name(&self) -> Option<String> {
        None
    }
}

/// Returns `<dir>/<stem><marker>.<ext>` for `source`.
pub fn output_path_for(source: &Path, marker: &str) -> CoreResult<PathBuf> {
    let stem = source
        .file_stem()
        .ok_or_else(|| CoreError::PathError(format!("No file stem in {}", source.display())))?
        .to_string_lossy();
    let file_name = match source.extension() {
        Some(ext) => format!("{stem}{marker}.{}", ext.to_string_lossy()),
        None => format!("{stem}{marker}"),
    };
    Ok(source.with_file_name(file_name))
}

fn is_mp4_family(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ["mp4", "mov", "m4v"].iter().any(|k| e.eq_ignore_ascii_case(k)))
}

/// Builds the full ffmpeg argument list (without the program name).
///
/// ffmpeg is told to overwrite `output`: the path holds the empty file
/// created by [`claim_output`].
pub fn build_encode_args(
    encoder: HevcEncoder,
    preset: &str,
    source: &Path,
    output: &Path,
    target_bitrate_bps: u64,
) -> Vec<String> {
    let mut args = vec!["-hide_banner".to_string(), "-y".to_string()];
    args.extend(encoder.input_args());
    args.extend(["-i".to_string(), source.to_string_lossy().into_owned()]);
    args.extend(
        ["-map", "0:v:0", "-map", "0:a?", "-map_metadata", "0"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.extend(encoder.video_args(preset, target_bitrate_bps));
    if is_mp4_family(output) {
        args.extend(["-tag:v".to_string(), "hvc1".to_string()]);
    }
    args.extend(["-c:a".to_string(), "copy".to_string()]);
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Creates `output` as an empty file, failing if anything is already there.
fn claim_output(source: &Path, output: &Path) -> CoreResult<()> {
    match OpenOptions::new().write(true).create_new(true).open(output) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(CoreError::encode(
            source,
            format!("output {} already exists", output.display()),
        )),
        Err(e) => Err(CoreError::encode(
            source,
            format!("cannot create output {}: {e}", output.display()),
        )),
    }
}

/// Only called for a path this run claimed.
fn remove_partial_output(output: &Path) {
    if output.exists() {
        match std::fs::remove_file(output) {
            Ok(()) => log::debug!("Removed incomplete output {}", output.display()),
            Err(e) => log::warn!("Could not remove incomplete output {}: {}", output.display(), e),
        }
    }
}

/// ffmpeg-backed [`Transcoder`].
///
/// The encoder is resolved on [`prepare`](Transcoder::prepare) (or the first
/// encode) by asking ffmpeg which HEVC encoders it provides. If none is
/// usable every encode fails with [`CoreError::HardwareUnavailable`].
pub struct FfmpegTranscoder<S: FfmpegSpawner> {
    spawner: S,
    selection: EncoderSelection,
    allow_software: bool,
    preset: String,
    marker: String,
    encoder: OnceCell<Option<HevcEncoder>>,
}

impl<S: FfmpegSpawner> FfmpegTranscoder<S> {
    /// Creates a transcoder that detects its encoder lazily.
    pub fn new(spawner: S, config: &CoreConfig) -> Self {
        Self {
            spawner,
            selection: config.encoder,
            allow_software: config.allow_software,
            preset: config.encoder_preset.clone(),
            marker: config.processed_marker.clone(),
            encoder: OnceCell::new(),
        }
    }

    /// Creates a transcoder with a fixed encoder, skipping detection.
    pub fn with_encoder(spawner: S, config: &CoreConfig, encoder: HevcEncoder) -> Self {
        let transcoder = Self::new(spawner, config);
        let _ = transcoder.encoder.set(Some(encoder));
        transcoder
    }

    fn resolve_encoder(&self) -> Option<HevcEncoder> {
        *self.encoder.get_or_init(|| {
            let available = match detect_encoders() {
                Ok(found) => found,
                Err(e) => {
                    log::warn!("Encoder detection failed: {}", e);
                    Vec::new()
                }
            };
            match select_encoder(self.selection, &available, self.allow_software) {
                Ok(encoder) => {
                    log::info!("Using encoder {} ({})", encoder, encoder.description());
                    Some(encoder)
                }
                Err(e) => {
                    log::warn!("{}", e);
                    progress_reporting::warning(
                        "No usable HEVC hardware encoder found; files will not be encoded",
                    );
                    None
                }
            }
        })
    }

    fn run(
        &self,
        source: &Path,
        target_bitrate_bps: u64,
        duration_secs: Option<f64>,
    ) -> CoreResult<PathBuf> {
        if target_bitrate_bps == 0 {
            return Err(CoreError::encode(source, "target bitrate must be positive"));
        }
        let encoder = self.resolve_encoder().ok_or(CoreError::HardwareUnavailable)?;

        let output = output_path_for(source, &self.marker)?;
        claim_output(source, &output)?;

        let args = build_encode_args(encoder, &self.preset, source, &output, target_bitrate_bps);
        log::debug!("ffmpeg {}", args.join(" "));
        progress_reporting::status("Encoder", encoder.as_ffmpeg_codec(), false);
        progress_reporting::status("Target bitrate", &format_bitrate(target_bitrate_bps), false);

        let mut handler = FfmpegProgressHandler::new(duration_secs);
        let result = self.spawner.spawn(&args).and_then(|mut process| {
            process.handle_events(|event| handler.handle_event(event))?;
            process.wait()
        });
        progress_reporting::clear_progress();

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                remove_partial_output(&output);
                return Err(CoreError::encode(source, e.to_string()));
            }
        };

        if !status.success() {
            remove_partial_output(&output);
            let reason = handler
                .last_error()
                .map(str::to_string)
                .unwrap_or_else(|| format!("ffmpeg exited with {status}"));
            if let Some(details) = handler.error_summary() {
                log::debug!("ffmpeg error output for {}:\n{}", source.display(), details);
            }
            return Err(CoreError::encode(source, reason));
        }

        match std::fs::metadata(&output) {
            Ok(meta) if meta.len() > 0 => Ok(output),
            Ok(_) => {
                remove_partial_output(&output);
                Err(CoreError::encode(source, "encoder produced an empty file"))
            }
            Err(_) => Err(CoreError::encode(source, "encoder produced no output file")),
        }
    }
}

impl<S: FfmpegSpawner> Transcoder for FfmpegTranscoder<S> {
    fn encode(&self, source: &Path, target_bitrate_bps: u64) -> CoreResult<PathBuf> {
        self.run(source, target_bitrate_bps, None)
    }

    fn encode_file(&self, record: &FileRecord, target_bitrate_bps: u64) -> CoreResult<PathBuf> {
        self.run(&record.path, target_bitrate_bps, record.duration_secs)
    }

    fn prepare(&self) -> CoreResult<()> {
        if self.encoder.get().is_none() {
            check_dependency("ffmpeg")?;
        }
        self.resolve_encoder();
        Ok(())
    }

    fn encoder_name(&self) -> Option<String> {
        self.encoder
            .get()
            .copied()
            .flatten()
            .map(|e| e.as_ffmpeg_codec().to_string())
    }
}
