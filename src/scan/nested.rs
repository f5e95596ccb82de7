//! Nested build descriptor analysis

use std::fs;
use std::path::Path;

use regex_lite::Regex;
use tracing::warn;

/// Libraries a nested `CMakeLists.txt` declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NestedBuildAnalysis {
    /// Library target names, in declaration order
    pub static_libraries: Vec<String>,

    pub has_libraries: bool,
}

impl NestedBuildAnalysis {
    /// Libraries to link for the directory holding the descriptor.
    ///
    /// A directory that declares none links under its own name.
    pub fn link_names(&self, dir_name: &str) -> Vec<String> {
        if self.has_libraries {
            self.static_libraries.clone()
        } else {
            vec![dir_name.to_string()]
        }
    }
}

/// Analyze the `add_library(...)` calls of a nested build descriptor.
///
/// `get_filename_component(VAR ${CMAKE_CURRENT_SOURCE_DIR} NAME)` followed by
/// `add_library(${VAR} ...)` resolves to the directory name. An unreadable
/// descriptor yields an empty analysis.
pub fn analyze_nested_build_descriptor(path: &Path) -> NestedBuildAnalysis {
    match fs::read(path) {
        Ok(bytes) => {
            let dir_name = path
                .parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            analyze_descriptor_text(&String::from_utf8_lossy(&bytes), &dir_name)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read nested build descriptor");
            NestedBuildAnalysis::default()
        }
    }
}

fn analyze_descriptor_text(content: &str, dir_name: &str) -> NestedBuildAnalysis {
    let mut libraries: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !name.is_empty() && !libraries.contains(&name) {
            libraries.push(name);
        }
    };

    let dir_name_var = Regex::new(r"(?i)get_filename_component\s*\(\s*(\w+)\s+\$\{CMAKE_CURRENT_SOURCE_DIR\}\s+NAME\s*\)")
        .ok()
        .and_then(|re| re.captures(content).map(|caps| caps[1].to_string()));

    if let Some(var) = &dir_name_var {
        let pattern = format!(r"(?i)add_library\s*\(\s*\$\{{\s*{}\s*\}}", regex_lite::escape(var));
        if Regex::new(&pattern).is_ok_and(|re| re.is_match(content)) {
            push(dir_name.to_string());
        }
    }

    if let Ok(re) = Regex::new(r"(?i)add_library\s*\(\s*([^\s\$\)]+)") {
        for caps in re.captures_iter(content) {
            let name = &caps[1];
            if dir_name_var.as_deref() != Some(name) {
                push(name.to_string());
            }
        }
    }

    NestedBuildAnalysis {
        has_libraries: !libraries.is_empty(),
        static_libraries: libraries,
    }
}
