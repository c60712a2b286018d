//! Configuration file loading with precedence handling.

use crate::coordinator::CoordinatorTimings;
use crate::engine::{
    EndTimings, DEFAULT_END_BANNER_MS, DEFAULT_HOLD_FINAL_LINE_MS, DEFAULT_TICK_INTERVAL_MS,
};
use crate::session::{
    LoopTimings, DEFAULT_END_REFRESH_MS, DEFAULT_REPLAY_DELAY_MS, DEFAULT_STARTUP_DELAY_MS,
};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TELESCROLL_CONFIG";
/// Environment variable overriding the log file path.
pub const LOG_ENV_VAR: &str = "TELESCROLL_LOG";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/telescroll/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Tick interval for viewers whose settings carry none.
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,

    /// Delay before the first tick of a new session.
    #[serde(default)]
    pub startup_delay_ms: Option<u64>,

    /// Delay between the end banner and a replay.
    #[serde(default)]
    pub replay_delay_ms: Option<u64>,

    /// How long the final lines stay up before the banner.
    #[serde(default)]
    pub hold_final_line_ms: Option<u64>,

    /// How long the end banner stays up.
    #[serde(default)]
    pub end_banner_ms: Option<u64>,

    /// Re-render cadence while the banner is up.
    #[serde(default)]
    pub end_refresh_ms: Option<u64>,

    /// Per-viewer settings file.
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Tick interval for viewers whose settings leave it unset.
    pub tick_interval_ms: u64,
    /// Delay before a new session's first tick.
    pub startup_delay_ms: u64,
    /// Delay between the end banner and a replay.
    pub replay_delay_ms: u64,
    /// How long the final line stays before the banner.
    pub hold_final_line_ms: u64,
    /// How long the end banner stays.
    pub end_banner_ms: u64,
    /// Banner redraw period while the text is finished.
    pub end_refresh_ms: u64,
    /// No settings file means every viewer gets the built-in defaults.
    pub settings_path: Option<PathBuf>,
    /// Where the tracing subscriber writes.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            replay_delay_ms: DEFAULT_REPLAY_DELAY_MS,
            hold_final_line_ms: DEFAULT_HOLD_FINAL_LINE_MS,
            end_banner_ms: DEFAULT_END_BANNER_MS,
            end_refresh_ms: DEFAULT_END_REFRESH_MS,
            settings_path: None,
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Durations for the coordinator.
    pub fn timings(&self) -> CoordinatorTimings {
        CoordinatorTimings {
            end: EndTimings::from_millis(self.hold_final_line_ms, self.end_banner_ms),
            scroll_loop: LoopTimings::from_millis(
                self.startup_delay_ms,
                self.replay_delay_ms,
                self.end_refresh_ms,
            ),
            default_tick_interval_ms: self.tick_interval_ms,
        }
    }
}

/// Flags given on the command line. `None` leaves the value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--tick`
    pub tick_interval_ms: Option<u64>,
    /// `--settings`
    pub settings_path: Option<PathBuf>,
    /// `--log-file`
    pub log_file_path: Option<PathBuf>,
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/telescroll/telescroll.log` on Linux, or the
/// platform equivalent. Falls back to the current directory if no state
/// directory is known.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("telescroll").join("telescroll.log")
    } else {
        PathBuf::from("telescroll.log")
    }
}

/// Resolve default config file path.
///
/// Returns `~/.config/telescroll/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("telescroll").join("config.toml"))
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    // Missing file is not an error - use defaults
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `TELESCROLL_CONFIG` environment variable
/// 3. Default path `~/.config/telescroll/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Merge config file into defaults to create resolved config.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        tick_interval_ms: config.tick_interval_ms.unwrap_or(defaults.tick_interval_ms),
        startup_delay_ms: config.startup_delay_ms.unwrap_or(defaults.startup_delay_ms),
        replay_delay_ms: config.replay_delay_ms.unwrap_or(defaults.replay_delay_ms),
        hold_final_line_ms: config
            .hold_final_line_ms
            .unwrap_or(defaults.hold_final_line_ms),
        end_banner_ms: config.end_banner_ms.unwrap_or(defaults.end_banner_ms),
        end_refresh_ms: config.end_refresh_ms.unwrap_or(defaults.end_refresh_ms),
        settings_path: config.settings_path.or(defaults.settings_path),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `TELESCROLL_LOG`: Override log file path
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Some(path) = std::env::var_os(LOG_ENV_VAR).filter(|p| !p.is_empty()) {
        config.log_file_path = PathBuf::from(path);
    }

    config
}

/// Apply CLI argument overrides to resolved config.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, cli: CliOverrides) -> ResolvedConfig {
    if let Some(ms) = cli.tick_interval_ms {
        config.tick_interval_ms = ms;
    }

    if let Some(path) = cli.settings_path {
        config.settings_path = Some(path);
    }

    if let Some(path) = cli.log_file_path {
        config.log_file_path = path;
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
