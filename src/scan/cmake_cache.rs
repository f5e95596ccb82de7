//! Toolchain hints from an existing CMake cache

use std::fs;
use std::path::Path;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Cache file name inside a build directory
pub const CACHE_FILE: &str = "CMakeCache.txt";

/// Compiler locations a previous configure step resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainHint {
    /// C compiler path
    pub c_compiler: Option<String>,

    /// C++ compiler path
    pub cxx_compiler: Option<String>,

    /// Directory holding the compilers
    pub toolchain_dir: Option<String>,
}

impl ToolchainHint {
    pub fn is_empty(&self) -> bool {
        self.c_compiler.is_none() && self.cxx_compiler.is_none()
    }
}

/// Read `<build_dir>/CMakeCache.txt`.
///
/// A missing or unreadable cache yields an empty hint.
pub fn read_cmake_cache(build_dir: &Path) -> ToolchainHint {
    let cache = build_dir.join(CACHE_FILE);
    if !cache.is_file() {
        debug!(path = %cache.display(), "no CMake cache");
        return ToolchainHint::default();
    }

    match fs::read(&cache) {
        Ok(bytes) => parse_cmake_cache(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            warn!(path = %cache.display(), error = %e, "failed to read CMake cache");
            ToolchainHint::default()
        }
    }
}

/// Extract compiler entries from cache text
pub fn parse_cmake_cache(content: &str) -> ToolchainHint {
    let cache_entry = |name: &str| -> Option<String> {
        let pattern = format!(r"(?m)^{}(?::[A-Z]+)?=(.+)$", regex_lite::escape(name));
        let re = Regex::new(&pattern).ok()?;
        re.captures(content)
            .map(|caps| caps[1].trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let cxx_compiler = cache_entry("CMAKE_CXX_COMPILER");
    let c_compiler = cache_entry("CMAKE_C_COMPILER").or_else(|| {
        cxx_compiler
            .as_deref()
            .filter(|cxx| cxx.contains("g++") || cxx.contains("c++"))
            .map(|cxx| cxx.replace("g++", "gcc").replace("c++", "gcc"))
    });

    let toolchain_dir = c_compiler.as_deref().and_then(|compiler| {
        Path::new(compiler)
            .parent()
            .map(|dir| dir.to_string_lossy().replace('\\', "/"))
            .filter(|dir| !dir.is_empty())
    });

    ToolchainHint {
        c_compiler,
        cxx_compiler,
        toolchain_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_filepath_entries() {
        let content = "\
# This is the CMakeCache file.
CMAKE_C_COMPILER:FILEPATH=/opt/arm/bin/arm-none-eabi-gcc
CMAKE_CXX_COMPILER:FILEPATH=/opt/arm/bin/arm-none-eabi-g++
";
        let hint = parse_cmake_cache(content);

        assert_eq!(hint.c_compiler.as_deref(), Some("/opt/arm/bin/arm-none-eabi-gcc"));
        assert_eq!(hint.cxx_compiler.as_deref(), Some("/opt/arm/bin/arm-none-eabi-g++"));
        assert_eq!(hint.toolchain_dir.as_deref(), Some("/opt/arm/bin"));
    }

    #[test]
    fn test_c_compiler_derived_from_cxx() {
        let hint = parse_cmake_cache("CMAKE_CXX_COMPILER:STRING=/usr/bin/arm-none-eabi-g++\n");

        assert_eq!(hint.c_compiler.as_deref(), Some("/usr/bin/arm-none-eabi-gcc"));
        assert_eq!(hint.toolchain_dir.as_deref(), Some("/usr/bin"));
    }

    #[test]
    fn test_unrelated_entries_ignored() {
        let hint = parse_cmake_cache("CMAKE_C_COMPILER_AR:FILEPATH=/usr/bin/arm-none-eabi-gcc-ar\n");
        assert!(hint.is_empty());
    }

    #[test]
    fn test_missing_cache_is_empty() {
        let dir = TempDir::new().unwrap();
        let hint = read_cmake_cache(&dir.path().join("build"));
        assert!(hint.is_empty());
        assert!(hint.toolchain_dir.is_none());
    }

    #[test]
    fn test_read_cache_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CACHE_FILE),
            "CMAKE_C_COMPILER:FILEPATH=C:\\arm\\bin\\arm-none-eabi-gcc.exe\n",
        )
        .unwrap();

        let hint = read_cmake_cache(dir.path());
        assert_eq!(hint.c_compiler.as_deref(), Some("C:\\arm\\bin\\arm-none-eabi-gcc.exe"));
    }
}
