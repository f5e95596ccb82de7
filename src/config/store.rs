//! Persisted project configuration store (`tool/project_config.json`)

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::layers::{BaseConfig, ConfigOrigin, ConfigSource};
use super::merge::{deep_merge, dropped_keys};
use super::path::{get_path, set_path};
use super::schema::ProjectConfig;
use super::{ConfigError, LoadDiagnostic};

/// Project-relative location of the persisted document
pub const CONFIG_FILE: &str = "tool/project_config.json";

/// Whether a persisted document existed when the store was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No persisted document: detection populates the document
    FirstRun,
    /// A persisted document exists (even a malformed one)
    Established,
}

/// Owner of the project configuration document.
///
/// The document is loaded once at construction and written only by `save()`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    state: StoreState,
    config: ProjectConfig,
    sources: Vec<ConfigSource>,
    diagnostics: Vec<LoadDiagnostic>,
}

impl ConfigStore {
    /// Open the store for a project root with the built-in schema default
    pub fn open(project_root: &Path) -> Self {
        Self::open_with_base(project_root, &BaseConfig::builtin())
    }

    /// Open the store for a project root on top of a prepared base
    pub fn open_with_base(project_root: &Path, base: &BaseConfig) -> Self {
        Self::at_path(project_root.join(CONFIG_FILE), base)
    }

    /// Open a store backed by an explicit document path
    pub fn at_path(path: PathBuf, base: &BaseConfig) -> Self {
        let mut sources = base.sources().to_vec();
        let mut diagnostics = base.diagnostics().to_vec();

        let state = if path.exists() {
            StoreState::Established
        } else {
            StoreState::FirstRun
        };

        let config = match state {
            StoreState::FirstRun => {
                debug!(path = %path.display(), "no persisted configuration");
                Self::from_base(base)
            }
            StoreState::Established => match Self::load(&path, base) {
                Ok((config, dropped)) => {
                    sources.push(ConfigSource {
                        origin: ConfigOrigin::Project,
                        path: Some(path.clone()),
                    });
                    for key in dropped {
                        warn!(path = %path.display(), key = %key, "ignoring unknown configuration key");
                        diagnostics.push(LoadDiagnostic::UnknownKey {
                            path: path.clone(),
                            key,
                        });
                    }
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "configuration unreadable, using defaults");
                    diagnostics.push(LoadDiagnostic::Malformed {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    Self::from_base(base)
                }
            },
        };

        Self {
            path,
            state,
            config,
            sources,
            diagnostics,
        }
    }

    fn from_base(base: &BaseConfig) -> ProjectConfig {
        // BaseConfig only admits layers that deserialize
        serde_json::from_value(base.value().clone()).unwrap_or_default()
    }

    /// Parse the persisted document and merge it onto the base.
    ///
    /// Returns the typed document and the dotted keys the schema dropped.
    fn load(path: &Path, base: &BaseConfig) -> Result<(ProjectConfig, Vec<String>), ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded: Value = serde_json::from_str(&contents)?;
        if !loaded.is_object() {
            return Err(ConfigError::NotAMapping(String::new()));
        }

        let merged = deep_merge(base.value().clone(), loaded);
        let config: ProjectConfig = serde_json::from_value(merged.clone())?;
        let dropped = dropped_keys(&merged, &config.to_value());
        Ok((config, dropped))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn is_first_run(&self) -> bool {
        self.state == StoreState::FirstRun
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        &mut self.config
    }

    /// Contributing layers in precedence order
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Non-fatal problems found while opening the store
    pub fn diagnostics(&self) -> &[LoadDiagnostic] {
        &self.diagnostics
    }

    /// Get a config value by dotted path
    pub fn get(&self, path: &str) -> Option<Value> {
        get_path(&self.config.to_value(), path).cloned()
    }

    /// Get a config value by dotted path, or `fallback` when absent
    pub fn get_or(&self, path: &str, fallback: Value) -> Value {
        self.get(path).unwrap_or(fallback)
    }

    /// Get a config value as string
    pub fn get_str(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Set a config value by dotted path.
    ///
    /// A mapping merges into the mapping already at `path`. The update is
    /// applied only if the result still fits the schema and no key is lost
    /// in the typed round-trip.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), ConfigError> {
        let mut document = self.config.to_value();
        let value = match (get_path(&document, path), value) {
            (Some(existing @ Value::Object(_)), value @ Value::Object(_)) => deep_merge(existing.clone(), value),
            (_, value) => value,
        };
        set_path(&mut document, path, value)?;

        let updated: ProjectConfig =
            serde_json::from_value(document.clone()).map_err(|e| ConfigError::InvalidValue {
                key: path.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(key) = dropped_keys(&document, &updated.to_value()).into_iter().next() {
            return Err(ConfigError::UnknownKey(key));
        }

        debug!(key = %path, "configuration value set");
        self.config = updated;
        Ok(())
    }

    /// Set a value given as command-line text.
    ///
    /// The text is parsed as JSON. When that value does not fit the field
    /// the raw text is tried as a string, so `1000` sets a string field.
    pub fn set_from_str(&mut self, path: &str, raw: &str) -> Result<(), ConfigError> {
        let text = || Value::String(raw.to_string());
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::String(_)) => self.set(path, value),
            Ok(value) => match self.set(path, value) {
                Err(e @ ConfigError::InvalidValue { .. }) => self.set(path, text()).map_err(|_| e),
                result => result,
            },
            Err(_) => self.set(path, text()),
        }
    }

    /// Whether the persisted document existed but could not be loaded
    pub fn is_malformed(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, LoadDiagnostic::Malformed { .. }))
    }

    /// Write the whole document to its persistent location.
    ///
    /// Writes a temporary sibling file and renames it over the target.
    /// A document that failed to load is never overwritten.
    pub fn save(&self) -> Result<(), ConfigError> {
        if self.is_malformed() {
            return Err(ConfigError::Unloaded(self.path.clone()));
        }

        let io_err = |source: std::io::Error| ConfigError::Io {
            path: self.path.clone(),
            source,
        };

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(io_err)?;

        let mut json = serde_json::to_string_pretty(&self.config)?;
        json.push('\n');

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project_config.json".to_string());
        let temp_path = parent.join(format!(".{}.tmp", file_name));

        fs::write(&temp_path, json).map_err(io_err)?;
        fs::rename(&temp_path, &self.path).map_err(io_err)?;

        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}
