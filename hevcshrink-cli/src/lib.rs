//! hevcshrink CLI library.
//!
//! Argument definitions, prompts, logging setup and terminal rendering for
//! the `hevcshrink` binary. Exposed as a library so tests can reach them.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod terminal;

pub use cli::{Cli, Commands, EncodeArgs};
pub use commands::encode::{RunOptions, run_encode};
pub use commands::encoders::run_encoders;
pub use error::{CliErrorContext, CliResult};
