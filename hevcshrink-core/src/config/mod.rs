//! Configuration structures and constants for the hevcshrink-core library.
//!
//! This module provides the configuration for a batch run: the directory to
//! scan, the bitrate multiplier, which encoder to use and what to do with
//! originals once their encode has been compared.

mod builder;

use crate::error::{CoreError, CoreResult};
use crate::hardware::EncoderSelection;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use builder::CoreConfigBuilder;

// Default constants

/// Multiplier applied when the operator does not choose one.
pub const DEFAULT_BITRATE_MULTIPLIER: f64 = 0.75;

/// Smallest accepted bitrate multiplier.
pub const MIN_BITRATE_MULTIPLIER: f64 = 0.1;

/// Largest accepted bitrate multiplier.
pub const MAX_BITRATE_MULTIPLIER: f64 = 10.0;

/// Named multipliers, from highest to lowest quality. `medium` is the default.
pub const MULTIPLIER_PRESETS: &[(&str, f64)] = &[
    ("highest", 1.2),
    ("high", 1.0),
    ("medium", 0.75),
    ("low", 0.5),
    ("lowest", 0.25),
];

/// Filename marker carried by encoder output. Files containing it are never
/// picked up again by the scanner.
pub const DEFAULT_PROCESSED_MARKER: &str = "_modified";

/// Container extensions (lowercase, without dot) the scanner recognizes.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v"];

/// Encoder preset passed to encoders that understand `-preset`.
pub const DEFAULT_ENCODER_PRESET: &str = "medium";

/// A bitrate multiplier that has been checked against
/// [`MIN_BITRATE_MULTIPLIER`]..=[`MAX_BITRATE_MULTIPLIER`].
///
/// Out-of-range values are rejected rather than clamped so that a typo never
/// silently turns into a different encode.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct BitrateMultiplier(f64);

impl BitrateMultiplier {
    /// Validates `value` and wraps it.
    pub fn new(value: f64) -> CoreResult<Self> {
        if !value.is_finite() || !(MIN_BITRATE_MULTIPLIER..=MAX_BITRATE_MULTIPLIER).contains(&value)
        {
            return Err(CoreError::InvalidInput(format!(
                "Multiplier must be between {MIN_BITRATE_MULTIPLIER} and {MAX_BITRATE_MULTIPLIER}, got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// The raw multiplier.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Looks up a named preset, ignoring case.
    pub fn from_preset(name: &str) -> Option<Self> {
        MULTIPLIER_PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
            .map(|&(_, value)| Self(value))
    }

    /// Target bitrate for a source bitrate, rounded to the nearest bit/s.
    #[must_use]
    pub fn target_bitrate(self, source_bitrate_bps: u64) -> u64 {
        (source_bitrate_bps as f64 * self.0).round() as u64
    }
}

impl Default for BitrateMultiplier {
    fn default() -> Self {
        Self(DEFAULT_BITRATE_MULTIPLIER)
    }
}

impl fmt::Display for BitrateMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

impl FromStr for BitrateMultiplier {
    type Err = CoreError;

    /// Parses operator input: a preset name or a number. Empty input yields
    /// the default multiplier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        if let Some(preset) = Self::from_preset(trimmed) {
            return Ok(preset);
        }
        let value = trimmed.parse::<f64>().map_err(|_| {
            CoreError::InvalidInput(format!(
                "'{trimmed}' is neither a number nor a preset (highest, high, medium, low, lowest)"
            ))
        })?;
        Self::new(value)
    }
}

/// What happens to an original after its encode succeeded and was compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionPolicy {
    /// Originals are always kept.
    #[default]
    Never,
    /// A [`DeletionConfirmer`](crate::processing::cleanup::DeletionConfirmer)
    /// is asked for every file.
    Ask,
    /// Confirmation was given once for the whole batch.
    Always,
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeletionPolicy::Never => "never",
            DeletionPolicy::Ask => "ask",
            DeletionPolicy::Always => "always",
        };
        f.write_str(name)
    }
}

impl FromStr for DeletionPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" | "keep" => Ok(DeletionPolicy::Never),
            "ask" | "prompt" => Ok(DeletionPolicy::Ask),
            "always" | "delete" => Ok(DeletionPolicy::Always),
            other => Err(CoreError::InvalidInput(format!(
                "Unknown deletion policy '{other}' (expected never, ask or always)"
            ))),
        }
    }
}

/// Main configuration structure for the hevcshrink-core library.
///
/// Built by the CLI (or a test) and handed to the batch orchestrator, which
/// never prompts on its own.
///
/// # Examples
///
/// ```rust
/// use hevcshrink_core::config::{CoreConfigBuilder, DeletionPolicy};
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .input_dir(PathBuf::from("/path/to/videos"))
///     .multiplier(0.5)
///     .deletion_policy(DeletionPolicy::Ask)
///     .build()
///     .unwrap();
/// assert_eq!(config.multiplier.value(), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Root directory that is scanned for videos
    pub input_dir: PathBuf,

    /// Multiplier applied to each source bitrate
    pub multiplier: BitrateMultiplier,

    /// Descend into subdirectories while scanning
    pub recursive: bool,

    /// Marker appended to output stems and used to skip processed files
    pub processed_marker: String,

    /// What to do with originals after a successful encode
    pub deletion_policy: DeletionPolicy,

    /// Which HEVC encoder to use
    pub encoder: EncoderSelection,

    /// Fall back to libx265 when no hardware encoder is found
    pub allow_software: bool,

    /// Preset for encoders that accept one (nvenc, libx265)
    pub encoder_preset: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            multiplier: BitrateMultiplier::default(),
            recursive: true,
            processed_marker: DEFAULT_PROCESSED_MARKER.to_string(),
            deletion_policy: DeletionPolicy::default(),
            encoder: EncoderSelection::Auto,
            allow_software: false,
            encoder_preset: DEFAULT_ENCODER_PRESET.to_string(),
        }
    }
}

impl CoreConfig {
    /// Creates a configuration for `input_dir` with every other field at its default.
    pub fn new(input_dir: PathBuf) -> Self {
        Self {
            input_dir,
            ..Self::default()
        }
    }

    /// Checks the fields that are not already guaranteed by their types.
    ///
    /// The input directory itself is checked by the orchestrator when it
    /// leaves the input-collection state, so that a missing directory is
    /// reported as [`CoreError::NotFound`].
    pub fn validate(&self) -> CoreResult<()> {
        if self.processed_marker.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Processed marker must not be empty".to_string(),
            ));
        }
        if self
            .processed_marker
            .contains(|c| std::path::is_separator(c) || c == '.')
        {
            return Err(CoreError::InvalidInput(format!(
                "Processed marker '{}' must not contain path separators or dots",
                self.processed_marker
            )));
        }
        if self.encoder_preset.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Encoder preset must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_range() {
        assert!(BitrateMultiplier::new(0.1).is_ok());
        assert!(BitrateMultiplier::new(10.0).is_ok());
        assert!(BitrateMultiplier::new(0.75).is_ok());
        assert!(BitrateMultiplier::new(0.09).is_err());
        assert!(BitrateMultiplier::new(10.01).is_err());
        assert!(BitrateMultiplier::new(-1.0).is_err());
        assert!(BitrateMultiplier::new(f64::NAN).is_err());
        assert!(BitrateMultiplier::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_multiplier_parse_defaults_on_empty_input() {
        let m: BitrateMultiplier = "".parse().unwrap();
        assert_eq!(m.value(), 0.75);
        let m: BitrateMultiplier = "   ".parse().unwrap();
        assert_eq!(m.value(), DEFAULT_BITRATE_MULTIPLIER);
    }

    #[test]
    fn test_multiplier_parse_rejects_garbage_and_range() {
        assert!("abc".parse::<BitrateMultiplier>().is_err());
        assert!("0".parse::<BitrateMultiplier>().is_err());
        assert!("11".parse::<BitrateMultiplier>().is_err());
        assert_eq!(" 2.5 ".parse::<BitrateMultiplier>().unwrap().value(), 2.5);
    }

    #[test]
    fn test_multiplier_presets() {
        let parse = |s: &str| s.parse::<BitrateMultiplier>().unwrap().value();
        assert_eq!(parse("highest"), 1.2);
        assert_eq!(parse("High"), 1.0);
        assert_eq!(parse(" medium "), 0.75);
        assert_eq!(parse("LOW"), 0.5);
        assert_eq!(parse("lowest"), 0.25);
        assert!(BitrateMultiplier::from_preset("ultra").is_none());
        assert!("ultra".parse::<BitrateMultiplier>().is_err());

        for (_, value) in MULTIPLIER_PRESETS {
            assert!(BitrateMultiplier::new(*value).is_ok());
        }
        assert_eq!(
            BitrateMultiplier::from_preset("medium"),
            Some(BitrateMultiplier::default())
        );
    }

    #[test]
    fn test_target_bitrate_is_product() {
        for (bitrate, multiplier) in [(5_000_000u64, 0.75), (1_234_567, 0.1), (800_000, 10.0), (3, 0.5)] {
            let m = BitrateMultiplier::new(multiplier).unwrap();
            let expected = bitrate as f64 * multiplier;
            assert!((m.target_bitrate(bitrate) as f64 - expected).abs() <= 0.5);
        }
        assert_eq!(BitrateMultiplier::default().target_bitrate(5_000_000), 3_750_000);
    }

    #[test]
    fn test_deletion_policy_parse() {
        assert_eq!("never".parse::<DeletionPolicy>().unwrap(), DeletionPolicy::Never);
        assert_eq!("ASK".parse::<DeletionPolicy>().unwrap(), DeletionPolicy::Ask);
        assert_eq!("always".parse::<DeletionPolicy>().unwrap(), DeletionPolicy::Always);
        assert!("sometimes".parse::<DeletionPolicy>().is_err());
        assert_eq!(DeletionPolicy::default(), DeletionPolicy::Never);
    }

    #[test]
    fn test_validate_marker() {
        let mut config = CoreConfig::default();
        assert!(config.validate().is_ok());
        config.processed_marker = String::new();
        assert!(config.validate().is_err());
        config.processed_marker = "_done.x".to_string();
        assert!(config.validate().is_err());
        config.processed_marker = "_hevc".to_string();
        assert!(config.validate().is_ok());
    }
}
