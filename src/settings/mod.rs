//! Per-viewer settings sources.
//!
//! The coordinator pulls a viewer's settings once, when that viewer's first
//! session starts. Later changes arrive as pushes
//! ([`SettingChange`](crate::model::SettingChange)) and never go through a
//! source.

use crate::model::{SettingsError, ViewerId, ViewerSettings};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where per-viewer settings come from.
pub trait SettingsSource {
    /// Settings for `viewer`. Unknown viewers get the source's defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read. Callers fall
    /// back to [`ViewerSettings::default`].
    fn fetch(&self, viewer: &ViewerId) -> Result<ViewerSettings, SettingsError>;
}

impl<S: SettingsSource + ?Sized> SettingsSource for Box<S> {
    fn fetch(&self, viewer: &ViewerId) -> Result<ViewerSettings, SettingsError> {
        (**self).fetch(viewer)
    }
}

/// In-memory settings: one default plus optional per-viewer entries.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    default: ViewerSettings,
    viewers: HashMap<ViewerId, ViewerSettings>,
}

impl StaticSettings {
    /// Every viewer gets `default`.
    pub fn new(default: ViewerSettings) -> Self {
        Self {
            default,
            viewers: HashMap::new(),
        }
    }

    /// Builder form of [`Self::insert`].
    pub fn with_viewer(mut self, viewer: ViewerId, settings: ViewerSettings) -> Self {
        self.insert(viewer, settings);
        self
    }

    /// Settings for one viewer, replacing any earlier entry.
    pub fn insert(&mut self, viewer: ViewerId, settings: ViewerSettings) {
        self.viewers.insert(viewer, settings);
    }
}

impl SettingsSource for StaticSettings {
    fn fetch(&self, viewer: &ViewerId) -> Result<ViewerSettings, SettingsError> {
        Ok(self
            .viewers
            .get(viewer)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}

/// Settings read from a TOML file on every fetch.
///
/// ```toml
/// [default]
/// scroll_speed = 150
///
/// [viewers.alice]
/// line_width = "wide"
/// auto_replay = true
/// ```
///
/// A viewer table is layered over `[default]`, which is layered over the
/// built-in defaults. A missing file yields the built-in defaults.
#[derive(Debug, Clone)]
pub struct TomlSettingsSource {
    path: PathBuf,
}

impl TomlSettingsSource {
    /// Source reading `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File read on every fetch.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_error(&self, reason: impl ToString) -> SettingsError {
        SettingsError::Parse {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn table<'a>(
        &self,
        root: &'a toml::Table,
        key: &str,
    ) -> Result<Option<&'a toml::Table>, SettingsError> {
        match root.get(key) {
            None => Ok(None),
            Some(toml::Value::Table(table)) => Ok(Some(table)),
            Some(_) => Err(self.parse_error(format!("'{key}' must be a table"))),
        }
    }
}

impl SettingsSource for TomlSettingsSource {
    fn fetch(&self, viewer: &ViewerId) -> Result<ViewerSettings, SettingsError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No settings file; using defaults");
            return Ok(ViewerSettings::default());
        }

        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| SettingsError::Read {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        let root: toml::Table = toml::from_str(&contents).map_err(|e| self.parse_error(e))?;

        if let Some(unknown) = root.keys().find(|k| *k != "default" && *k != "viewers") {
            return Err(self.parse_error(format!("unknown section '{unknown}'")));
        }

        let mut merged = self.table(&root, "default")?.cloned().unwrap_or_default();
        if let Some(viewers) = self.table(&root, "viewers")? {
            match viewers.get(viewer.as_str()) {
                Some(toml::Value::Table(overrides)) => {
                    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                Some(_) => {
                    return Err(self.parse_error(format!("viewer '{viewer}' must be a table")))
                }
                None => {}
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| self.parse_error(e))
    }
}
