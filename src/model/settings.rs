//! Per-viewer presentation settings.
//!
//! Settings arrive either as a whole (pulled from a [`SettingsSource`] on
//! session start) or as single key/value pushes, parsed into a typed
//! [`SettingChange`].
//!
//! [`SettingsSource`]: crate::settings::SettingsSource

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Named width presets offered to viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineWidthPreset {
    /// 30 columns.
    Narrow,
    /// 38 columns.
    Medium,
    /// 46 columns.
    Wide,
}

impl LineWidthPreset {
    /// Wrap width in columns for this preset.
    pub fn columns(self) -> usize {
        match self {
            LineWidthPreset::Narrow => 30,
            LineWidthPreset::Medium => 38,
            LineWidthPreset::Wide => 46,
        }
    }
}

/// Wrap width: either a preset or an explicit column count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LineWidth {
    /// A named preset.
    Preset(LineWidthPreset),
    /// Explicit column count; 0 is treated as 1.
    Columns(usize),
}

impl LineWidth {
    /// Resolve to a column count. May be 0 for a bad override; the engine
    /// clamps it.
    pub fn columns(self) -> usize {
        match self {
            LineWidth::Preset(preset) => preset.columns(),
            LineWidth::Columns(columns) => columns,
        }
    }
}

impl Default for LineWidth {
    fn default() -> Self {
        LineWidth::Preset(LineWidthPreset::Medium)
    }
}

impl FromStr for LineWidth {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "narrow" => Ok(LineWidth::Preset(LineWidthPreset::Narrow)),
            "medium" => Ok(LineWidth::Preset(LineWidthPreset::Medium)),
            "wide" => Ok(LineWidth::Preset(LineWidthPreset::Wide)),
            other => other
                .parse::<usize>()
                .map(LineWidth::Columns)
                .map_err(|_| InvalidSetting::invalid_value("line_width", s)),
        }
    }
}

impl fmt::Display for LineWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineWidth::Preset(LineWidthPreset::Narrow) => f.write_str("narrow"),
            LineWidth::Preset(LineWidthPreset::Medium) => f.write_str("medium"),
            LineWidth::Preset(LineWidthPreset::Wide) => f.write_str("wide"),
            LineWidth::Columns(columns) => write!(f, "{columns}"),
        }
    }
}

/// Full settings for one viewer.
///
/// Every field has a default, so a partial TOML table is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerSettings {
    /// Wrap width preset or column override.
    pub line_width: LineWidth,
    /// Number of lines visible at once.
    pub number_of_lines: usize,
    /// Pacing in words per minute.
    pub scroll_speed: f64,
    /// Text to present. `None` or empty selects the built-in default text.
    pub custom_text: Option<String>,
    /// Restart from the top after the end banner.
    pub auto_replay: bool,
    /// Per-viewer tick cadence; `None` keeps the configured default.
    pub tick_interval_ms: Option<u64>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            line_width: LineWidth::default(),
            number_of_lines: 4,
            scroll_speed: 120.0,
            custom_text: None,
            auto_replay: false,
            tick_interval_ms: None,
        }
    }
}

impl ViewerSettings {
    /// Apply a single pushed change.
    pub fn apply(&mut self, change: &SettingChange) {
        match change {
            SettingChange::LineWidth(width) => self.line_width = *width,
            SettingChange::NumberOfLines(n) => self.number_of_lines = *n,
            SettingChange::ScrollSpeed(wpm) => self.scroll_speed = *wpm,
            SettingChange::CustomText(text) => self.custom_text = text.clone(),
            SettingChange::AutoReplay(enabled) => self.auto_replay = *enabled,
            SettingChange::TickInterval(ms) => self.tick_interval_ms = Some(*ms),
        }
    }
}

/// One pushed settings update, typed.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    /// `line_width`
    LineWidth(LineWidth),
    /// `number_of_lines`
    NumberOfLines(usize),
    /// `scroll_speed` in words per minute.
    ScrollSpeed(f64),
    /// `custom_text`; `None` restores the default text.
    CustomText(Option<String>),
    /// `auto_replay`
    AutoReplay(bool),
    /// `tick_interval_ms`
    TickInterval(u64),
}

impl SettingChange {
    /// Parse a key/value pair as delivered by a settings push.
    ///
    /// Recognised keys: `line_width`, `number_of_lines`, `scroll_speed`,
    /// `custom_text`, `auto_replay`, `tick_interval_ms`.
    pub fn parse(key: &str, value: &str) -> Result<Self, InvalidSetting> {
        let bad = || InvalidSetting::invalid_value(key, value);
        match key {
            "line_width" => value.parse().map(SettingChange::LineWidth),
            "number_of_lines" => value
                .trim()
                .parse()
                .map(SettingChange::NumberOfLines)
                .map_err(|_| bad()),
            "scroll_speed" => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|wpm| wpm.is_finite())
                .map(SettingChange::ScrollSpeed)
                .ok_or_else(bad),
            "custom_text" => Ok(SettingChange::CustomText(
                Some(value.to_string()).filter(|text| !text.trim().is_empty()),
            )),
            "auto_replay" => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(SettingChange::AutoReplay(true)),
                "false" | "0" | "no" | "off" => Ok(SettingChange::AutoReplay(false)),
                _ => Err(bad()),
            },
            "tick_interval_ms" => value
                .trim()
                .parse()
                .map(SettingChange::TickInterval)
                .map_err(|_| bad()),
            _ => Err(InvalidSetting::UnknownKey(key.to_string())),
        }
    }

    /// Whether applying this change requires restarting the tick loop.
    ///
    /// Text replaces the whole presentation and the interval changes the
    /// cadence of the primary timer; everything else applies in place.
    pub fn restarts_loop(&self) -> bool {
        matches!(
            self,
            SettingChange::CustomText(_) | SettingChange::TickInterval(_)
        )
    }
}

/// Rejected settings push.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSetting {
    /// The key names no setting.
    #[error("Unknown setting key '{0}'")]
    UnknownKey(String),

    /// The key is known but the value does not parse.
    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidValue {
        /// Setting key.
        key: String,
        /// Rejected raw value.
        value: String,
    },
}

impl InvalidSetting {
    fn invalid_value(key: &str, value: &str) -> Self {
        InvalidSetting::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}
