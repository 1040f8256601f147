// ============================================================================
// hevcshrink-core/src/hardware.rs
// ============================================================================
//
// HARDWARE ENCODERS: Detection and Selection of HEVC Encoders
//
// Parses `ffmpeg -hide_banner -encoders` to find which HEVC encoders the local
// ffmpeg build provides, picks one in priority order, and supplies the
// encoder-specific ffmpeg arguments.
//
// Priority: NVENC > AMF > QuickSync > VAAPI > VideoToolbox. libx265 is only
// chosen when software encoding is explicitly allowed.

use crate::error::{CoreError, CoreResult};
use crate::external::run_captured;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// HEVC encoders hevcshrink knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HevcEncoder {
    Nvenc,
    Amf,
    Qsv,
    Vaapi,
    VideoToolbox,
    X265,
}

/// Hardware encoders in selection priority order.
pub const HARDWARE_PRIORITY: [HevcEncoder; 5] = [
    HevcEncoder::Nvenc,
    HevcEncoder::Amf,
    HevcEncoder::Qsv,
    HevcEncoder::Vaapi,
    HevcEncoder::VideoToolbox,
];

const VAAPI_DEVICE: &str = "/dev/dri/renderD128";

impl HevcEncoder {
    /// Every known encoder, hardware first.
    pub const ALL: [HevcEncoder; 6] = [
        HevcEncoder::Nvenc,
        HevcEncoder::Amf,
        HevcEncoder::Qsv,
        HevcEncoder::Vaapi,
        HevcEncoder::VideoToolbox,
        HevcEncoder::X265,
    ];

    /// The ffmpeg encoder name passed to `-c:v`.
    pub fn as_ffmpeg_codec(self) -> &'static str {
        match self {
            HevcEncoder::Nvenc => "hevc_nvenc",
            HevcEncoder::Amf => "hevc_amf",
            HevcEncoder::Qsv => "hevc_qsv",
            HevcEncoder::Vaapi => "hevc_vaapi",
            HevcEncoder::VideoToolbox => "hevc_videotoolbox",
            HevcEncoder::X265 => "libx265",
        }
    }

    /// Human readable vendor name.
    pub fn description(self) -> &'static str {
        match self {
            HevcEncoder::Nvenc => "NVIDIA NVENC",
            HevcEncoder::Amf => "AMD AMF",
            HevcEncoder::Qsv => "Intel QuickSync",
            HevcEncoder::Vaapi => "VAAPI",
            HevcEncoder::VideoToolbox => "Apple VideoToolbox",
            HevcEncoder::X265 => "libx265 (software)",
        }
    }

    pub fn is_hardware(self) -> bool {
        self != HevcEncoder::X265
    }

    /// Whether the encoder accepts `-preset`.
    pub fn supports_preset(self) -> bool {
        matches!(self, HevcEncoder::Nvenc | HevcEncoder::X265)
    }

    /// Arguments placed before `-i`.
    pub fn input_args(self) -> Vec<String> {
        let args: &[&str] = match self {
            HevcEncoder::Nvenc => &["-hwaccel", "cuda"],
            HevcEncoder::Qsv => &["-hwaccel", "qsv"],
            HevcEncoder::Vaapi => &["-vaapi_device", VAAPI_DEVICE],
            HevcEncoder::VideoToolbox => &["-hwaccel", "videotoolbox"],
            HevcEncoder::Amf | HevcEncoder::X265 => &[],
        };
        args.iter().map(|s| s.to_string()).collect()
    }

    /// Video codec arguments placed after the stream mapping, including
    /// `-b:v <target_bitrate_bps>`.
    pub fn video_args(self, preset: &str, target_bitrate_bps: u64) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.as_ffmpeg_codec().to_string()];
        if self.supports_preset() {
            args.extend(["-preset".to_string(), preset.to_string()]);
        }

        let specific: &[&str] = match self {
            HevcEncoder::Nvenc => &[
                "-rc", "vbr", "-profile:v", "main", "-b_ref_mode", "middle",
                "-spatial_aq", "1", "-temporal_aq", "1",
            ],
            HevcEncoder::Amf => &["-rc", "vbr_peak", "-quality", "balanced", "-profile:v", "main"],
            HevcEncoder::Qsv => &["-look_ahead", "1", "-look_ahead_depth", "40", "-profile:v", "main"],
            HevcEncoder::Vaapi => &["-vf", "format=nv12,hwupload"],
            HevcEncoder::VideoToolbox => &["-profile:v", "main"],
            HevcEncoder::X265 => &["-x265-params", "aq-mode=3:aq-strength=0.8"],
        };
        args.extend(specific.iter().map(|s| s.to_string()));
        args.extend(["-b:v".to_string(), target_bitrate_bps.to_string()]);
        args
    }
}

impl fmt::Display for HevcEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ffmpeg_codec())
    }
}

impl FromStr for HevcEncoder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nvenc" | "hevc_nvenc" => Ok(HevcEncoder::Nvenc),
            "amf" | "hevc_amf" => Ok(HevcEncoder::Amf),
            "qsv" | "hevc_qsv" => Ok(HevcEncoder::Qsv),
            "vaapi" | "hevc_vaapi" => Ok(HevcEncoder::Vaapi),
            "videotoolbox" | "hevc_videotoolbox" => Ok(HevcEncoder::VideoToolbox),
            "x265" | "libx265" => Ok(HevcEncoder::X265),
            other => Err(CoreError::InvalidInput(format!("Unknown encoder '{other}'"))),
        }
    }
}

/// How the encoder for a run is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderSelection {
    /// Best detected hardware encoder
    #[default]
    Auto,
    /// A specific encoder; it must still be present in the ffmpeg build
    Forced(HevcEncoder),
}

impl FromStr for EncoderSelection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(EncoderSelection::Auto)
        } else {
            s.parse().map(EncoderSelection::Forced)
        }
    }
}

/// Extracts the known HEVC encoders from `ffmpeg -encoders` output.
///
/// Lines look like ` V....D hevc_nvenc           NVIDIA NVENC hevc encoder`;
/// the second column is the encoder name. The result follows [`HevcEncoder::ALL`] order.
pub fn parse_available_encoders(listing: &str) -> Vec<HevcEncoder> {
    let names: Vec<&str> = listing
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let flags = cols.next()?;
            let name = cols.next()?;
            flags.starts_with('V').then_some(name)
        })
        .collect();

    HevcEncoder::ALL
        .into_iter()
        .filter(|enc| names.contains(&enc.as_ffmpeg_codec()))
        .collect()
}

/// Asks the local ffmpeg which HEVC encoders it was built with.
///
/// A listed hardware encoder may still fail at encode time if the device or
/// driver is missing; that surfaces as a per-file encode error.
pub fn detect_encoders() -> CoreResult<Vec<HevcEncoder>> {
    let listing = run_captured("ffmpeg", &["-hide_banner", "-encoders"])?;
    let encoders = parse_available_encoders(&listing);
    log::debug!(
        "Detected HEVC encoders: {}",
        encoders
            .iter()
            .map(|e| e.as_ffmpeg_codec())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(encoders)
}

/// Chooses the encoder for a run from the detected set.
///
/// * `Auto` picks the first hardware encoder in [`HARDWARE_PRIORITY`], then
///   libx265 if `allow_software` is set.
/// * `Forced` requires the encoder to be available.
///
/// Returns [`CoreError::HardwareUnavailable`] when nothing suitable exists.
pub fn select_encoder(
    selection: EncoderSelection,
    available: &[HevcEncoder],
    allow_software: bool,
) -> CoreResult<HevcEncoder> {
    match selection {
        EncoderSelection::Forced(encoder) => {
            if available.contains(&encoder) {
                Ok(encoder)
            } else {
                log::warn!(
                    "Requested encoder {} is not provided by this ffmpeg build",
                    encoder.as_ffmpeg_codec()
                );
                Err(CoreError::HardwareUnavailable)
            }
        }
        EncoderSelection::Auto => HARDWARE_PRIORITY
            .into_iter()
            .find(|enc| available.contains(enc))
            .or_else(|| {
                (allow_software && available.contains(&HevcEncoder::X265))
                    .then_some(HevcEncoder::X265)
            })
            .ok_or(CoreError::HardwareUnavailable),
    }
}
