//! Fetcher selection by name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::empty::EmptyFetcher;
use super::http::HttpFetcher;
use super::types::{FetchError, TileContentFetcher};

/// The available fetcher implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetcherKind {
    /// Simulated dataset with no content.
    #[default]
    Empty,
    /// Dataset served over HTTP.
    Http,
}

impl FetcherKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Http => "http",
        }
    }

    /// Build a fetcher of this kind with default settings.
    pub fn create(&self) -> Result<Arc<dyn TileContentFetcher>, FetchError> {
        Ok(match self {
            Self::Empty => Arc::new(EmptyFetcher::default()),
            Self::Http => Arc::new(HttpFetcher::new()?),
        })
    }
}

impl fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FetcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "empty" => Ok(Self::Empty),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown fetcher '{}' (expected empty or http)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetcher_kind() {
        assert_eq!("empty".parse(), Ok(FetcherKind::Empty));
        assert_eq!(" HTTP ".parse(), Ok(FetcherKind::Http));
        assert!("ftp".parse::<FetcherKind>().is_err());
    }

    #[test]
    fn test_create_reports_name() {
        let fetcher = FetcherKind::Empty.create().unwrap();
        assert_eq!(fetcher.name(), "empty");
        let fetcher = FetcherKind::Http.create().unwrap();
        assert_eq!(fetcher.name(), "http");
    }
}
