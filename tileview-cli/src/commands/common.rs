//! Arguments shared across CLI commands.

use clap::Args;
use tileview::config::FormatConfig;
use tileview::grid::LevelRule;

/// Grid and dataset overrides. Unset values come from the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct GridArgs {
    /// Dataset URL (tile URLs are `{source}/{tile-id}`)
    #[arg(long)]
    pub source: Option<String>,

    /// Approximate number of tiles a view is split into
    #[arg(long, short = 't')]
    pub tiles_per_screen: Option<u32>,

    /// Level selection rule: area or longer_axis
    #[arg(long)]
    pub level_rule: Option<LevelRule>,

    /// Finest grid level
    #[arg(long)]
    pub max_level: Option<u8>,
}

impl GridArgs {
    /// Apply the overrides to `config`. CLI takes precedence, then config.
    pub fn apply(&self, mut config: FormatConfig) -> FormatConfig {
        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if let Some(tiles) = self.tiles_per_screen {
            config = config.with_tiles_per_screen(tiles);
        }
        if let Some(rule) = self.level_rule {
            config = config.with_level_rule(rule);
        }
        if let Some(level) = self.max_level {
            config = config.with_max_level(level);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_precedence() {
        let args = GridArgs {
            source: Some("http://example.com/ds".to_string()),
            tiles_per_screen: Some(9),
            level_rule: Some(LevelRule::LongerAxis),
            max_level: None,
        };
        let config = args.apply(FormatConfig::default());
        assert_eq!(config.source, "http://example.com/ds");
        assert_eq!(config.tiles_per_screen, 9);
        assert_eq!(config.level_rule, LevelRule::LongerAxis);
        assert_eq!(config.max_level, FormatConfig::default().max_level);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let config = FormatConfig::new("http://example.com/ds").with_tiles_per_screen(2);
        assert_eq!(GridArgs::default().apply(config.clone()), config);
    }
}
