//! Project configuration
//!
//! The persisted document is merged onto a base built from:
//! 1. Built-in schema default
//! 2. Operator defaults (~/.config/mcu-scaffold/defaults.toml)
//! 3. Project document (tool/project_config.json)

mod layers;
mod merge;
mod path;
mod schema;
mod store;

use std::fmt;
use std::io;
use std::path::PathBuf;

pub use layers::{BaseConfig, ConfigOrigin, ConfigSource};
pub use merge::{deep_merge, dropped_keys, merge_layers};
pub use path::{get_path, set_path};
pub use schema::{
    BspSection, BuildSection, DeviceConfig, DownloadSection, FilesSection, LinkerSection, ProjectConfig,
    ProjectSection, ToolchainSection,
};
pub use store::{ConfigStore, StoreState, CONFIG_FILE};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("empty key segment in '{0}'")]
    EmptyKey(String),

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("'{0}' is not a mapping")]
    NotAMapping(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("{} could not be loaded; fix or remove it before saving", .0.display())]
    Unloaded(PathBuf),
}

/// Non-fatal problem found while loading configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDiagnostic {
    /// Persisted document unreadable; defaults used instead
    Malformed { path: PathBuf, reason: String },

    /// Key not in the schema; dropped on load
    UnknownKey { path: PathBuf, key: String },

    /// Operator defaults file skipped
    OperatorDefaultsSkipped { path: PathBuf, reason: String },
}

impl fmt::Display for LoadDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadDiagnostic::Malformed { path, reason } => {
                write!(f, "{}: malformed, using defaults ({})", path.display(), reason)
            }
            LoadDiagnostic::UnknownKey { path, key } => {
                write!(f, "{}: unknown key '{}' ignored", path.display(), key)
            }
            LoadDiagnostic::OperatorDefaultsSkipped { path, reason } => {
                write!(f, "{}: operator defaults skipped ({})", path.display(), reason)
            }
        }
    }
}
