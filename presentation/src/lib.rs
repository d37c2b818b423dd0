//! Presentation layer for concord
//!
//! This crate contains CLI definitions, output formatters and progress
//! reporters.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat, SubmitArgs};
pub use output::{ConsoleFormatter, OutputFormatter};
pub use progress::{ProgressReporter, SimpleProgress};
