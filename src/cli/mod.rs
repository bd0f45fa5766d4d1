//! Command line and environment configuration

pub mod args;
pub mod error;

pub use args::{Cli, OutputFormat, RunConfig};
pub use error::CliError;
