// ============================================================================
// hevcshrink-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig. Unlike struct-literal construction, the
// builder validates the multiplier and the remaining fields in `build`.

use std::path::PathBuf;

use super::{BitrateMultiplier, CoreConfig, DeletionPolicy};
use crate::error::{CoreError, CoreResult};
use crate::hardware::EncoderSelection;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use hevcshrink_core::config::CoreConfigBuilder;
/// use hevcshrink_core::hardware::{EncoderSelection, HevcEncoder};
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .input_dir(PathBuf::from("/path/to/videos"))
///     .multiplier(0.6)
///     .recursive(false)
///     .encoder(EncoderSelection::Forced(HevcEncoder::Nvenc))
///     .encoder_preset("p5")
///     .build()
///     .unwrap();
/// assert!(!config.recursive);
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfigBuilder {
    input_dir: Option<PathBuf>,
    multiplier: f64,
    recursive: bool,
    processed_marker: String,
    deletion_policy: DeletionPolicy,
    encoder: EncoderSelection,
    allow_software: bool,
    encoder_preset: String,
}

impl Default for CoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreConfigBuilder {
    /// Creates a builder holding the library defaults.
    pub fn new() -> Self {
        let defaults = CoreConfig::default();
        Self {
            input_dir: None,
            multiplier: defaults.multiplier.value(),
            recursive: defaults.recursive,
            processed_marker: defaults.processed_marker,
            deletion_policy: defaults.deletion_policy,
            encoder: defaults.encoder,
            allow_software: defaults.allow_software,
            encoder_preset: defaults.encoder_preset,
        }
    }

    /// Sets the directory to scan. Required.
    pub fn input_dir(mut self, input_dir: PathBuf) -> Self {
        self.input_dir = Some(input_dir);
        self
    }

    /// Sets the bitrate multiplier; checked in [`build`](Self::build).
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets whether subdirectories are scanned.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Sets the processed-file marker.
    pub fn processed_marker(mut self, marker: &str) -> Self {
        self.processed_marker = marker.to_string();
        self
    }

    /// Sets the deletion policy for originals.
    pub fn deletion_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = policy;
        self
    }

    /// Sets the encoder selection.
    pub fn encoder(mut self, encoder: EncoderSelection) -> Self {
        self.encoder = encoder;
        self
    }

    /// Allows libx265 when no hardware encoder is detected.
    pub fn allow_software(mut self, allow: bool) -> Self {
        self.allow_software = allow;
        self
    }

    /// Sets the encoder preset.
    pub fn encoder_preset(mut self, preset: &str) -> Self {
        self.encoder_preset = preset.to_string();
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> CoreResult<CoreConfig> {
        let input_dir = self
            .input_dir
            .ok_or_else(|| CoreError::InvalidInput("input_dir is required".to_string()))?;

        let config = CoreConfig {
            input_dir,
            multiplier: BitrateMultiplier::new(self.multiplier)?,
            recursive: self.recursive,
            processed_marker: self.processed_marker,
            deletion_policy: self.deletion_policy,
            encoder: self.encoder,
            allow_software: self.allow_software,
            encoder_preset: self.encoder_preset,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = CoreConfigBuilder::new()
            .input_dir(PathBuf::from("/videos"))
            .build()
            .unwrap();
        assert_eq!(config.multiplier.value(), 0.75);
        assert!(config.recursive);
        assert_eq!(config.processed_marker, "_modified");
        assert_eq!(config.deletion_policy, DeletionPolicy::Never);
        assert_eq!(config.encoder, EncoderSelection::Auto);
        assert!(!config.allow_software);
    }

    #[test]
    fn test_builder_requires_input_dir() {
        assert!(matches!(
            CoreConfigBuilder::new().build(),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_builder_rejects_out_of_range_multiplier() {
        let result = CoreConfigBuilder::new()
            .input_dir(PathBuf::from("/videos"))
            .multiplier(12.0)
            .build();
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }
}
