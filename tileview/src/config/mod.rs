//! Configuration for a tiled format.
//!
//! [`FormatConfig`] carries every knob of a [`TiledFormat`](crate::format::TiledFormat)
//! with `DEFAULT_*` constants behind its `Default` impl. [`ConfigFile`]
//! persists it as INI:
//!
//! ```ini
//! [source]
//! url = http://localhost:8080/tiles
//! fetcher = empty
//!
//! [grid]
//! tiles_per_screen = 4
//! max_level = 24
//! level_rule = area
//!
//! [loader]
//! header_timeout_ms = 5000
//! content_timeout_ms = 30000
//!
//! [events]
//! channel_capacity = 1024
//! ```
//!
//! Missing keys fall back to their defaults; a missing `[loader]` timeout
//! means no deadline.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::grid::{GridResolver, LevelRule, DEFAULT_MAX_LEVEL, MAX_SUPPORTED_LEVEL};
use crate::loader::LoaderConfig;
use crate::provider::FetcherKind;

/// Default dataset location.
pub const DEFAULT_SOURCE: &str = "http://localhost:8080/tiles";

/// Default number of tiles a view should be split into.
pub const DEFAULT_TILES_PER_SCREEN: u32 = 4;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Configuration file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Errors from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Settings of one tiled format instance.
#[derive(Clone, Debug, PartialEq)]
pub struct FormatConfig {
    /// Dataset URL; tile URLs are `{source}/{tile-id}`.
    pub source: String,

    /// Which fetcher loads the dataset.
    pub fetcher: FetcherKind,

    /// Approximate number of tiles a view is split into.
    pub tiles_per_screen: u32,

    /// How the grid level is chosen.
    pub level_rule: LevelRule,

    /// Finest grid level ever used.
    pub max_level: u8,

    /// Per-phase fetch deadlines.
    pub loader: LoaderConfig,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            fetcher: FetcherKind::default(),
            tiles_per_screen: DEFAULT_TILES_PER_SCREEN,
            level_rule: LevelRule::default(),
            max_level: DEFAULT_MAX_LEVEL,
            loader: LoaderConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl FormatConfig {
    /// Default configuration for the dataset at `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_fetcher(mut self, fetcher: FetcherKind) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_tiles_per_screen(mut self, tiles_per_screen: u32) -> Self {
        self.tiles_per_screen = tiles_per_screen.max(1);
        self
    }

    pub fn with_level_rule(mut self, level_rule: LevelRule) -> Self {
        self.level_rule = level_rule;
        self
    }

    pub fn with_max_level(mut self, max_level: u8) -> Self {
        self.max_level = max_level.min(MAX_SUPPORTED_LEVEL);
        self
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// The grid resolver these settings describe.
    pub fn resolver(&self) -> GridResolver {
        GridResolver::new(self.level_rule, self.max_level)
    }

    /// Parse INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    /// Render as INI text.
    pub fn to_ini_string(&self) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.to_ini().write_to(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = get(ini, "source", "url") {
            config.source = url.to_string();
        }
        if let Some(fetcher) = parse::<FetcherKind>(ini, "source", "fetcher")? {
            config.fetcher = fetcher;
        }
        if let Some(tiles) = parse::<u32>(ini, "grid", "tiles_per_screen")? {
            if tiles == 0 {
                return Err(invalid("grid", "tiles_per_screen", "0", "must be at least 1"));
            }
            config.tiles_per_screen = tiles;
        }
        if let Some(level) = parse::<u8>(ini, "grid", "max_level")? {
            if level > MAX_SUPPORTED_LEVEL {
                return Err(invalid(
                    "grid",
                    "max_level",
                    &level.to_string(),
                    &format!("must be at most {}", MAX_SUPPORTED_LEVEL),
                ));
            }
            config.max_level = level;
        }
        if let Some(rule) = parse::<LevelRule>(ini, "grid", "level_rule")? {
            config.level_rule = rule;
        }
        config.loader.header_timeout =
            parse::<u64>(ini, "loader", "header_timeout_ms")?.map(Duration::from_millis);
        config.loader.content_timeout =
            parse::<u64>(ini, "loader", "content_timeout_ms")?.map(Duration::from_millis);
        if let Some(capacity) = parse::<usize>(ini, "events", "channel_capacity")? {
            config.event_capacity = capacity.max(1);
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("source"))
            .set("url", self.source.as_str())
            .set("fetcher", self.fetcher.name());
        ini.with_section(Some("grid"))
            .set("tiles_per_screen", self.tiles_per_screen.to_string())
            .set("max_level", self.max_level.to_string())
            .set("level_rule", self.level_rule.name());
        if let Some(timeout) = self.loader.header_timeout {
            ini.with_section(Some("loader"))
                .set("header_timeout_ms", timeout.as_millis().to_string());
        }
        if let Some(timeout) = self.loader.content_timeout {
            ini.with_section(Some("loader"))
                .set("content_timeout_ms", timeout.as_millis().to_string());
        }
        ini.with_section(Some("events"))
            .set("channel_capacity", self.event_capacity.to_string());
        ini
    }
}

fn get<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section))
        .and_then(|s| s.get(key))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse<T>(ini: &Ini, section: &str, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(ini, section, key)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|e| invalid(section, key, value, &e.to_string()))
        })
        .transpose()
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Default config file location, `<config dir>/tileview/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tileview")
        .join(CONFIG_FILE_NAME)
}

/// An INI file holding a [`FormatConfig`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::at(config_file_path())
    }
}

impl ConfigFile {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the file.
    pub fn load(&self) -> Result<FormatConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "Loaded config file");
        FormatConfig::from_ini_str(&text)
    }

    /// Read the file, or return defaults when it does not exist.
    pub fn load_or_default(&self) -> Result<FormatConfig, ConfigError> {
        if self.exists() {
            self.load()
        } else {
            Ok(FormatConfig::default())
        }
    }

    /// Write `config`, creating parent directories as needed.
    pub fn save(&self, config: &FormatConfig) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(&self.path, config.to_ini_string()).map_err(io_error)?;
        debug!(path = %self.path.display(), "Saved config file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = FormatConfig::default();
        assert_eq!(config.source, DEFAULT_SOURCE);
        assert_eq!(config.fetcher, FetcherKind::Empty);
        assert_eq!(config.tiles_per_screen, DEFAULT_TILES_PER_SCREEN);
        assert_eq!(config.level_rule, LevelRule::Area);
        assert_eq!(config.max_level, DEFAULT_MAX_LEVEL);
        assert_eq!(config.loader, LoaderConfig::default());
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = FormatConfig::from_ini_str(
            "[source]\nurl = http://example.com/ds\n\n[grid]\ntiles_per_screen = 8\n",
        )
        .unwrap();
        assert_eq!(config.source, "http://example.com/ds");
        assert_eq!(config.tiles_per_screen, 8);
        assert_eq!(config.max_level, DEFAULT_MAX_LEVEL);
        assert_eq!(config.loader.header_timeout, None);
    }

    #[test]
    fn test_parse_all_sections() {
        let config = FormatConfig::from_ini_str(
            "[source]\nurl = http://example.com/ds\nfetcher = http\n\
             [grid]\nmax_level = 12\nlevel_rule = longer_axis\n\
             [loader]\nheader_timeout_ms = 250\ncontent_timeout_ms = 1000\n\
             [events]\nchannel_capacity = 16\n",
        )
        .unwrap();
        assert_eq!(config.fetcher, FetcherKind::Http);
        assert_eq!(config.max_level, 12);
        assert_eq!(config.level_rule, LevelRule::LongerAxis);
        assert_eq!(config.loader.header_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.loader.content_timeout, Some(Duration::from_secs(1)));
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = FormatConfig::from_ini_str("[grid]\ntiles_per_screen = many\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "tiles_per_screen"));

        let err = FormatConfig::from_ini_str("[grid]\ntiles_per_screen = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = FormatConfig::from_ini_str("[grid]\nmax_level = 99\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "max_level"));

        let err = FormatConfig::from_ini_str("[source]\nfetcher = ftp\n").unwrap_err();
        assert!(err.to_string().contains("fetcher"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::at(dir.path().join("nested").join(CONFIG_FILE_NAME));
        assert!(!file.exists());
        assert_eq!(file.load_or_default().unwrap(), FormatConfig::default());

        let config = FormatConfig::new("http://example.com/ds")
            .with_fetcher(FetcherKind::Http)
            .with_tiles_per_screen(9)
            .with_level_rule(LevelRule::LongerAxis)
            .with_loader(LoaderConfig {
                header_timeout: Some(Duration::from_millis(500)),
                content_timeout: None,
            });
        file.save(&config).unwrap();

        assert!(file.exists());
        assert_eq!(file.load().unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = ConfigFile::at(dir.path().join("absent.ini")).load().unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_config_file_path_ends_with_file_name() {
        let path = config_file_path();
        assert!(path.ends_with(Path::new("tileview").join(CONFIG_FILE_NAME)));
    }
}
