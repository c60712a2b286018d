//! telescroll - Entry Point

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use telescroll::config::{self, CliOverrides};
use telescroll::coordinator::Teleprompter;
use telescroll::model::{AppError, LineWidth, SettingChange, ViewerId};
use telescroll::runner::{self, Simulation};
use telescroll::session::SystemClock;
use telescroll::settings::{SettingsSource, StaticSettings, TomlSettingsSource};
use telescroll::transport::{JsonLinesTransport, TerminalTransport};
use tracing::info;

/// Where frames are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Output {
    /// One panel per session in the terminal
    Terminal,
    /// One JSON object per frame on stdout
    Jsonl,
}

/// telescroll - timer-driven teleprompter
#[derive(Parser, Debug)]
#[command(name = "telescroll")]
#[command(version)]
#[command(about = "Scroll a text at reading pace across one or more viewer sessions")]
pub struct Args {
    /// Text file to present (uses the viewer's stored text if not provided)
    pub file: Option<PathBuf>,

    /// Viewer identity whose settings apply
    #[arg(long, default_value = "local")]
    pub viewer: String,

    /// Number of concurrent sessions for the viewer
    #[arg(short = 'n', long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..=8))]
    pub sessions: u16,

    /// Output surface
    #[arg(short, long, value_enum, default_value_t = Output::Terminal)]
    pub output: Output,

    /// Reading pace in words per minute
    #[arg(short, long)]
    pub wpm: Option<f64>,

    /// Line width: narrow, medium, wide or a column count
    #[arg(long)]
    pub width: Option<LineWidth>,

    /// Number of visible lines
    #[arg(short, long)]
    pub lines: Option<usize>,

    /// Restart from the top after the end banner
    #[arg(short, long)]
    pub replay: bool,

    /// Tick interval in milliseconds
    #[arg(long)]
    pub tick: Option<u64>,

    /// Per-viewer settings file (TOML)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Viewer setting overrides given on the command line.
    fn setting_changes(&self, text: Option<String>) -> Vec<SettingChange> {
        let mut changes = Vec::new();
        if let Some(width) = self.width {
            changes.push(SettingChange::LineWidth(width));
        }
        if let Some(lines) = self.lines {
            changes.push(SettingChange::NumberOfLines(lines));
        }
        if let Some(wpm) = self.wpm {
            changes.push(SettingChange::ScrollSpeed(wpm));
        }
        if self.replay {
            changes.push(SettingChange::AutoReplay(true));
        }
        if let Some(text) = text {
            changes.push(SettingChange::CustomText(Some(text)));
        }
        changes
    }
}

fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Defaults → Config File → Env Vars → CLI Args
    let config = config::resolve(
        args.config.clone(),
        CliOverrides {
            tick_interval_ms: args.tick,
            settings_path: args.settings.clone(),
            log_file_path: args.log_file.clone(),
        },
    )?;

    telescroll::logging::init(&config.log_file_path)?;
    info!(config = ?config, "Configuration loaded and resolved");

    let text = args
        .file
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path).map_err(|source| AppError::TextRead {
                path: path.clone(),
                source,
            })
        })
        .transpose()?;

    let viewer =
        ViewerId::new(args.viewer.clone()).map_err(|e| AppError::Identifier(e.to_string()))?;
    let mut simulation = Simulation::new(viewer, usize::from(args.sessions))
        .map_err(|e| AppError::Identifier(e.to_string()))?;
    for change in args.setting_changes(text) {
        simulation = simulation.with_change(change);
    }

    let settings: Box<dyn SettingsSource> = match &config.settings_path {
        Some(path) => Box::new(TomlSettingsSource::new(path)),
        None => Box::new(StaticSettings::default()),
    };
    let timings = config.timings();

    match args.output {
        Output::Terminal => {
            let terminal = runner::setup_terminal()?;
            let mut teleprompter = Teleprompter::new(
                TerminalTransport::new(terminal),
                settings,
                SystemClock::new(),
                timings,
            );
            simulation.install(&mut teleprompter);
            let result = runner::run_terminal(&mut teleprompter);
            simulation.teardown(&mut teleprompter);
            runner::restore_terminal()?;
            result?;
        }
        Output::Jsonl => {
            let mut teleprompter = Teleprompter::new(
                JsonLinesTransport::new(std::io::stdout()),
                settings,
                SystemClock::new(),
                timings,
            );
            simulation.install(&mut teleprompter);
            runner::run_until_idle(&mut teleprompter, std::thread::sleep);
            simulation.teardown(&mut teleprompter);
        }
    }

    info!("Exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use telescroll::model::LineWidthPreset;

    #[test]
    fn test_help_does_not_error() {
        let result = Args::try_parse_from(["telescroll", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_does_not_error() {
        let result = Args::try_parse_from(["telescroll", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_no_args_defaults() {
        let args = Args::parse_from(["telescroll"]);
        assert_eq!(args.file, None);
        assert_eq!(args.viewer, "local");
        assert_eq!(args.sessions, 1);
        assert_eq!(args.output, Output::Terminal);
        assert_eq!(args.wpm, None);
        assert_eq!(args.width, None);
        assert_eq!(args.lines, None);
        assert!(!args.replay);
        assert_eq!(args.tick, None);
        assert_eq!(args.settings, None);
        assert_eq!(args.config, None);
        assert!(args.setting_changes(None).is_empty());
    }

    #[test]
    fn test_file_path_populates_file_field() {
        let args = Args::parse_from(["telescroll", "speech.txt"]);
        assert_eq!(args.file, Some(PathBuf::from("speech.txt")));
    }

    #[test]
    fn test_output_jsonl() {
        let args = Args::parse_from(["telescroll", "-o", "jsonl"]);
        assert_eq!(args.output, Output::Jsonl);
    }

    #[test]
    fn test_output_rejects_unknown() {
        let result = Args::try_parse_from(["telescroll", "--output", "html"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_sessions_range() {
        assert_eq!(Args::parse_from(["telescroll", "-n", "3"]).sessions, 3);
        let err = Args::try_parse_from(["telescroll", "-n", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(Args::try_parse_from(["telescroll", "-n", "9"]).is_err());
    }

    #[test]
    fn test_width_accepts_presets_and_columns() {
        let args = Args::parse_from(["telescroll", "--width", "wide"]);
        assert_eq!(args.width, Some(LineWidth::Preset(LineWidthPreset::Wide)));
        let args = Args::parse_from(["telescroll", "--width", "52"]);
        assert_eq!(args.width, Some(LineWidth::Columns(52)));
        assert!(Args::try_parse_from(["telescroll", "--width", "huge"]).is_err());
    }

    #[test]
    fn test_flags_become_setting_changes() {
        let args = Args::parse_from([
            "telescroll", "--wpm", "180", "-l", "6", "--width", "narrow", "--replay",
        ]);
        let changes = args.setting_changes(Some("hello".to_string()));
        assert_eq!(
            changes,
            vec![
                SettingChange::LineWidth(LineWidth::Preset(LineWidthPreset::Narrow)),
                SettingChange::NumberOfLines(6),
                SettingChange::ScrollSpeed(180.0),
                SettingChange::AutoReplay(true),
                SettingChange::CustomText(Some("hello".to_string())),
            ]
        );
    }

    #[test]
    fn test_config_flag() {
        let args = Args::parse_from(["telescroll", "--config", "/etc/telescroll.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/etc/telescroll.toml")));
    }
}
