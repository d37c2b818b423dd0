//! Shared configuration value objects.

mod output_format;

pub use output_format::OutputFormat;
