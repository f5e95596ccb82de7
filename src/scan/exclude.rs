//! Exclusion rules for project scanning
//!
//! Patterns match project-relative directory paths, one component per `*`.

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::path::Path;

use super::ScanError;

/// Directory names never scanned, at any depth
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/build",
    "**/MDK",
    "**/.git",
    "**/.vscode",
    "**/__pycache__",
    "**/Debug",
    "**/Release",
    "**/.*",
];

/// Top-level trees that own a generated build descriptor
const GENERATED_TREES: &[&str] = &["BSP", "bsp", "Device", "device"];

/// Inside CMSIS only the core include directory is an include path
const CMSIS_CORE_INCLUDE: &str = "**/cmsis/**/core/include";

fn component_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Exclusion rules for filtering directories
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    glob_set: GlobSet,
    cmsis_core_include: GlobMatcher,
}

impl ExcludeRules {
    /// Create new exclusion rules with defaults
    pub fn new() -> Result<Self, ScanError> {
        Self::with_patterns(&[])
    }

    /// Defaults plus the top-level BSP/Device trees
    pub fn application() -> Result<Self, ScanError> {
        Self::with_patterns(GENERATED_TREES)
    }

    /// Defaults plus additional patterns
    pub fn with_patterns(patterns: &[&str]) -> Result<Self, ScanError> {
        let mut builder = GlobSetBuilder::new();

        for pattern in DEFAULT_EXCLUDES.iter().chain(patterns) {
            if !pattern.is_empty() {
                builder.add(component_glob(pattern)?);
            }
        }

        let cmsis_core_include = GlobBuilder::new(CMSIS_CORE_INCLUDE)
            .literal_separator(true)
            .case_insensitive(true)
            .build()?
            .compile_matcher();

        Ok(Self {
            glob_set: builder.build()?,
            cmsis_core_include,
        })
    }

    /// Check if a project-relative directory should be skipped
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.glob_set.is_match(path_str.as_ref())
    }

    /// Check if a project-relative directory is `CMSIS/**/Core/Include` or below it
    pub fn is_cmsis_core_include(&self, path: &Path) -> bool {
        path.ancestors()
            .any(|ancestor| self.cmsis_core_include.is_match(ancestor))
    }
}
