//! Command implementations for the CLI.

/// Batch re-encoding of a directory.
pub mod encode;
/// Listing of available HEVC encoders.
pub mod encoders;
