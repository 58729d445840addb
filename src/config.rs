//! Configuration module for the UTI stub.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// What to do when input runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EofPolicy {
    /// Any end of input is a fatal error
    #[default]
    Fail,
    /// End of input between turns ends the session cleanly
    Shutdown,
}

/// Command-line arguments for the stub
#[derive(Parser, Debug)]
#[command(name = "uti-stub")]
#[command(author = "uti-stub authors")]
#[command(version)]
#[command(about = "A canned-reply UTI engine for testing protocol harnesses", long_about = None)]
pub struct CliArgs {
    /// Input files read in order (`-` for stdin; stdin when none given)
    #[arg(value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Simulated thinking time per search in milliseconds (0 disables it)
    #[arg(short = 't', long)]
    pub think_time_ms: Option<u64>,

    /// Behavior when input runs out
    #[arg(long, value_enum)]
    pub eof: Option<EofPolicy>,

    /// Do not write `client: SENT ...` lines to stderr
    #[arg(long)]
    pub no_diagnostics: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub stub: StubConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stub behavior configuration
#[derive(Debug, Deserialize)]
pub struct StubConfig {
    /// Simulated thinking time in milliseconds
    #[serde(default = "default_think_time_ms")]
    pub think_time_ms: u64,
    /// Behavior when input runs out
    #[serde(default)]
    pub eof: EofPolicy,
    /// Whether to emit diagnostic lines
    #[serde(default = "default_diagnostics")]
    pub diagnostics: bool,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            think_time_ms: default_think_time_ms(),
            eof: EofPolicy::default(),
            diagnostics: default_diagnostics(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_think_time_ms() -> u64 {
    3000 // 3 seconds
}

fn default_diagnostics() -> bool {
    true
}

// stderr also carries the diagnostic lines
fn default_log_level() -> String {
    "warn".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub think_time: Duration,
    pub eof: EofPolicy,
    pub diagnostics: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            inputs: cli.inputs,
            think_time: Duration::from_millis(
                cli.think_time_ms
                    .unwrap_or(toml_config.stub.think_time_ms),
            ),
            eof: cli.eof.unwrap_or(toml_config.stub.eof),
            diagnostics: !cli.no_diagnostics && toml_config.stub.diagnostics,
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.stub.think_time_ms, 3000);
        assert_eq!(config.stub.eof, EofPolicy::Fail);
        assert!(config.stub.diagnostics);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [stub]
            think_time_ms = 0
            eof = "shutdown"
            diagnostics = false

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stub.think_time_ms, 0);
        assert_eq!(config.stub.eof, EofPolicy::Shutdown);
        assert!(!config.stub.diagnostics);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_toml_partial_section() {
        let config: TomlConfig = toml::from_str("[stub]\neof = \"fail\"\n").unwrap();
        assert_eq!(config.stub.think_time_ms, 3000);
        assert!(config.stub.diagnostics);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_toml_rejects_unknown_policy() {
        let result: Result<TomlConfig, _> = toml::from_str("[stub]\neof = \"retry\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_without_args() {
        let cli = CliArgs::try_parse_from(["uti-stub"]).unwrap();
        let config = Config::merge(cli, TomlConfig::default());

        assert!(config.inputs.is_empty());
        assert_eq!(config.think_time, Duration::from_secs(3));
        assert_eq!(config.eof, EofPolicy::Fail);
        assert!(config.diagnostics);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let cli = CliArgs::try_parse_from([
            "uti-stub",
            "-t",
            "250",
            "--eof",
            "shutdown",
            "--log-level",
            "trace",
            "moves.txt",
            "-",
        ])
        .unwrap();
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [stub]
            think_time_ms = 10
            eof = "fail"

            [logging]
            level = "info"
        "#,
        )
        .unwrap();

        let config = Config::merge(cli, toml_config);
        assert_eq!(config.think_time, Duration::from_millis(250));
        assert_eq!(config.eof, EofPolicy::Shutdown);
        assert_eq!(config.log_level, "trace");
        assert_eq!(
            config.inputs,
            vec![PathBuf::from("moves.txt"), PathBuf::from("-")]
        );
    }

    #[test]
    fn test_toml_fills_unset_cli() {
        let cli = CliArgs::try_parse_from(["uti-stub"]).unwrap();
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [stub]
            think_time_ms = 0
            diagnostics = false
        "#,
        )
        .unwrap();

        let config = Config::merge(cli, toml_config);
        assert_eq!(config.think_time, Duration::ZERO);
        assert!(!config.diagnostics);
    }

    #[test]
    fn test_version_tracks_package() {
        use clap::CommandFactory;

        let command = CliArgs::command();
        assert_eq!(command.get_version(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_no_diagnostics_flag() {
        let cli = CliArgs::try_parse_from(["uti-stub", "--no-diagnostics"]).unwrap();
        let config = Config::merge(cli, TomlConfig::default());
        assert!(!config.diagnostics);
    }
}
