//! CLI error type.

use std::fmt;

use tileview::config::ConfigError;
use tileview::coord::CoordError;
use tileview::format::FormatError;
use tileview::provider::FetchError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad configuration or arguments.
    Config(String),
    /// A view argument could not be parsed.
    InvalidView(String),
    /// The tiled format failed.
    Format(FormatError),
    /// A fetcher could not be created.
    Fetch(FetchError),
    /// The async runtime could not be started.
    Runtime(String),
    /// Interrupted by Ctrl+C.
    Interrupted,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidView(msg) => write!(f, "Invalid view: {}", msg),
            CliError::Format(e) => write!(f, "{}", e),
            CliError::Fetch(e) => write!(f, "Fetcher error: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::InvalidView(e.to_string())
    }
}

impl From<FormatError> for CliError {
    fn from(e: FormatError) -> Self {
        CliError::Format(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}
