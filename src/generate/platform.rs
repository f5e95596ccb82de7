//! Host platform profiles

use serde::{Deserialize, Serialize};

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
    Other,
}

impl Platform {
    /// Platform of the running host
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            _ => Platform::Other,
        }
    }

    pub fn is_windows(&self) -> bool {
        *self == Platform::Windows
    }

    pub fn profile(&self) -> &'static PlatformProfile {
        match self {
            Platform::Windows => &WINDOWS,
            Platform::Linux => &LINUX,
            Platform::MacOs => &MACOS,
            Platform::Other => &OTHER,
        }
    }
}

/// Paths and commands that differ between hosts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: Platform,

    /// Executable suffix (".exe" or "")
    pub exe_suffix: &'static str,

    /// ARM toolchain bin directory when no CMake cache exists
    pub toolchain_bin_dir: &'static str,

    /// Include globs of the default toolchain install, for the editor
    pub toolchain_include_globs: &'static [&'static str],

    pub openocd_binary: &'static str,
    pub openocd_scripts_dir: &'static str,

    /// Debugger when no toolchain directory is known
    pub gdb_path: &'static str,

    pub cmake_generator: &'static str,
    pub shell: &'static str,
    pub python_command: &'static str,
}

const WINDOWS_TOOLCHAIN: &str = "C:/Program Files (x86)/Arm GNU Toolchain arm-none-eabi/13.2 Rel1/bin";

static WINDOWS: PlatformProfile = PlatformProfile {
    platform: Platform::Windows,
    exe_suffix: ".exe",
    toolchain_bin_dir: WINDOWS_TOOLCHAIN,
    toolchain_include_globs: &[
        "C:/Program Files (x86)/Arm GNU Toolchain arm-none-eabi/*/arm-none-eabi/include/**",
        "C:/Program Files (x86)/Arm GNU Toolchain arm-none-eabi/*/lib/gcc/arm-none-eabi/*/include/**",
    ],
    openocd_binary: "C:/openocd/bin/openocd.exe",
    openocd_scripts_dir: "C:/openocd/share/openocd/scripts/",
    gdb_path: "C:/Program Files (x86)/Arm GNU Toolchain arm-none-eabi/13.2 Rel1/bin/arm-none-eabi-gdb.exe",
    cmake_generator: "Ninja",
    shell: "cmd.exe",
    python_command: "python",
};

static LINUX: PlatformProfile = PlatformProfile {
    platform: Platform::Linux,
    exe_suffix: "",
    toolchain_bin_dir: "/usr/bin",
    toolchain_include_globs: &["/usr/lib/arm-none-eabi/include/**"],
    openocd_binary: "/usr/bin/openocd",
    openocd_scripts_dir: "/usr/local/share/openocd/scripts/",
    gdb_path: "gdb-multiarch",
    cmake_generator: "Unix Makefiles",
    shell: "/bin/bash",
    python_command: "python3",
};

static MACOS: PlatformProfile = PlatformProfile {
    platform: Platform::MacOs,
    exe_suffix: "",
    toolchain_bin_dir: "/usr/bin",
    toolchain_include_globs: &["/usr/local/arm-none-eabi/include/**"],
    openocd_binary: "/usr/bin/openocd",
    openocd_scripts_dir: "/usr/local/share/openocd/scripts/",
    gdb_path: "gdb-multiarch",
    cmake_generator: "Unix Makefiles",
    shell: "/bin/bash",
    python_command: "python3",
};

static OTHER: PlatformProfile = PlatformProfile {
    platform: Platform::Other,
    exe_suffix: "",
    toolchain_bin_dir: "/usr/bin",
    toolchain_include_globs: &[],
    openocd_binary: "/usr/bin/openocd",
    openocd_scripts_dir: "/usr/local/share/openocd/scripts/",
    gdb_path: "gdb-multiarch",
    cmake_generator: "Ninja",
    shell: "/bin/bash",
    python_command: "python3",
};

impl PlatformProfile {
    /// Default location of a toolchain executable
    pub fn default_tool_path(&self, tool: &str) -> String {
        format!("{}/{}{}", self.toolchain_bin_dir, tool, self.exe_suffix)
    }

    /// Debugger inside a known toolchain directory
    pub fn gdb_in(&self, toolchain_dir: &str) -> String {
        if self.platform.is_windows() {
            format!("{}/arm-none-eabi-gdb.exe", toolchain_dir.trim_end_matches(['/', '\\']))
        } else {
            self.gdb_path.to_string()
        }
    }
}
