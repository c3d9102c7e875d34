//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init` for inspecting
//! and creating the configuration file.

use clap::Subcommand;
use tileview::config::{ConfigFile, FormatConfig};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration (file values over defaults)
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, file: &ConfigFile) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(file),
        ConfigCommands::Show => run_show(file),
        ConfigCommands::Init { force } => run_init(file, force),
    }
}

/// Show the configuration file path.
fn run_path(file: &ConfigFile) -> Result<(), CliError> {
    println!("{}", file.path().display());
    Ok(())
}

/// Show the effective configuration.
fn run_show(file: &ConfigFile) -> Result<(), CliError> {
    if !file.exists() {
        println!("# {} does not exist, showing defaults", file.path().display());
    }
    let config = file.load_or_default()?;
    print!("{}", config.to_ini_string());
    Ok(())
}

/// Write the default configuration.
fn run_init(file: &ConfigFile, force: bool) -> Result<(), CliError> {
    if file.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            file.path().display()
        )));
    }
    file.save(&FormatConfig::default())?;
    println!("Wrote {}", file.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::at(dir.path().join("config.ini"));

        run_init(&file, false).unwrap();
        assert!(file.exists());
        assert!(matches!(run_init(&file, false), Err(CliError::Config(_))));
        assert!(run_init(&file, true).is_ok());
        assert_eq!(file.load().unwrap(), FormatConfig::default());
    }

    #[test]
    fn test_show_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::at(dir.path().join("missing.ini"));
        assert!(run_show(&file).is_ok());
    }
}
