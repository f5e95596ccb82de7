//! Merge base for the project document
//!
//! The project document is merged onto a base built from:
//! 1. Built-in schema default
//! 2. Operator defaults (~/.config/mcu-scaffold/defaults.toml), optional

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::merge::deep_merge;
use super::schema::ProjectConfig;
use super::{ConfigError, LoadDiagnostic};

/// Origin of a configuration layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Operator,
    Project,
}

/// A contributing config layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Schema default plus operator overrides, ready to merge a project document onto
#[derive(Debug, Clone)]
pub struct BaseConfig {
    value: Value,
    sources: Vec<ConfigSource>,
    diagnostics: Vec<LoadDiagnostic>,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BaseConfig {
    /// Built-in schema default only
    pub fn builtin() -> Self {
        Self {
            value: ProjectConfig::default().to_value(),
            sources: vec![ConfigSource {
                origin: ConfigOrigin::Builtin,
                path: None,
            }],
            diagnostics: Vec::new(),
        }
    }

    /// Default operator defaults location, if `HOME` is set
    pub fn default_operator_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config/mcu-scaffold/defaults.toml"))
    }

    /// Overlay an operator defaults file.
    ///
    /// A missing file is not an error. A file that does not parse, or whose
    /// values do not fit the schema, is skipped with a diagnostic.
    pub fn with_operator_defaults(mut self, path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no operator defaults file");
            return self;
        }

        match Self::load_operator_layer(path, &self.value) {
            Ok(merged) => {
                debug!(path = %path.display(), "applied operator defaults");
                self.value = merged;
                self.sources.push(ConfigSource {
                    origin: ConfigOrigin::Operator,
                    path: Some(path.to_path_buf()),
                });
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring operator defaults");
                self.diagnostics.push(LoadDiagnostic::OperatorDefaultsSkipped {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    fn load_operator_layer(path: &Path, base: &Value) -> Result<Value, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // TOML tables land as JSON objects so the layer merges like any other
        let layer: Value = toml::from_str(&contents)?;
        let merged = deep_merge(base.clone(), layer);

        // Reject layers that would make every project document unloadable
        serde_json::from_value::<ProjectConfig>(merged.clone())?;
        Ok(merged)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn diagnostics(&self) -> &[LoadDiagnostic] {
        &self.diagnostics
    }
}
