//! Typed project configuration schema
//!
//! `ProjectConfig::default()` is the schema default: the complete document
//! shape every persisted document is merged onto.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Project identity and chip-derived fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Project name (empty = derived from the directory name)
    pub name: String,

    /// Part number (e.g., "STM32F407VGT6")
    pub chip: String,

    /// Board name
    pub board: String,

    /// Core architecture (e.g., "cortex-m4")
    pub architecture: String,

    /// Instruction set passed as `-m<instruction_set>`
    pub instruction_set: String,

    /// Floating-point description
    pub float_type: String,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            chip: String::new(),
            board: String::new(),
            architecture: String::new(),
            instruction_set: "thumb".to_string(),
            float_type: String::new(),
        }
    }
}

/// Cross toolchain executables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSection {
    pub c_compiler: String,
    pub cxx_compiler: String,
    pub asm_compiler: String,
    pub ar: String,
    pub objcopy: String,
    pub size: String,
}

impl Default for ToolchainSection {
    fn default() -> Self {
        Self {
            c_compiler: "arm-none-eabi-gcc".to_string(),
            cxx_compiler: "arm-none-eabi-g++".to_string(),
            asm_compiler: "arm-none-eabi-gcc".to_string(),
            ar: "arm-none-eabi-ar".to_string(),
            objcopy: "arm-none-eabi-objcopy".to_string(),
            size: "arm-none-eabi-size".to_string(),
        }
    }
}

/// Compiler flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Optimization level without the dash (e.g., "O0", "Os")
    pub optimization: String,

    /// Debug info level without the dash (e.g., "g3")
    pub debug_info: String,

    /// Master switch for `wall` and `werror`
    pub warnings: bool,
    pub wall: bool,
    pub werror: bool,

    /// Emit `-fstack-usage`
    pub stack_usage: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            optimization: "O0".to_string(),
            debug_info: "g3".to_string(),
            warnings: true,
            wall: true,
            werror: false,
            stack_usage: true,
        }
    }
}

/// Linker options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerSection {
    /// `-specs=` entries
    pub specs: Vec<String>,

    /// Main linker script, project-relative
    pub script: String,

    /// Extra `-T` scripts, project-relative
    pub additional_scripts: Vec<String>,

    pub gc_sections: bool,
    pub map_file: bool,

    /// Link `_printf_float`
    pub printf_float: bool,

    /// Link `_scanf_float`
    pub scanf_float: bool,
}

impl Default for LinkerSection {
    fn default() -> Self {
        Self {
            specs: vec!["nosys.specs".to_string(), "nano.specs".to_string()],
            script: String::new(),
            additional_scripts: Vec::new(),
            gc_sections: true,
            map_file: true,
            printf_float: true,
            scanf_float: true,
        }
    }
}

/// Download / debug probe parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSection {
    /// Probe interface ("stlink", "jlink", "cmsis-dap", ...)
    pub interface: String,

    /// OpenOCD target (e.g., "stm32f4x")
    pub target: String,

    /// Adapter speed in kHz
    pub speed: String,
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            interface: "stlink".to_string(),
            target: "stm32f1x".to_string(),
            speed: "4000".to_string(),
        }
    }
}

/// Discovered application files, project-relative
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesSection {
    pub sources: Vec<String>,
    pub headers: Vec<String>,
    pub include_dirs: Vec<String>,

    /// Directories owning their own CMakeLists.txt
    pub subdirs: Vec<String>,

    /// Libraries linked into the executable
    pub static_libraries: Vec<String>,
}

/// Board-support tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BspSection {
    /// Series directory under `BSP/` (e.g., "stm32f4")
    pub chip_dir: String,

    /// Model sub-tier (e.g., "f407"), empty when the tree has none
    pub chip_model_dir: String,

    /// Package sub-tier (e.g., "vgt6"), empty when the tree has none
    pub chip_package: String,

    /// Sources, relative to `BSP/`
    pub sources: Vec<String>,

    /// Include directories, project-relative
    pub include_dirs: Vec<String>,
}

/// One external device driver under `Device/<name>/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub enabled: bool,

    /// Sources, relative to `Device/`
    pub sources: Vec<String>,

    /// Include directories, project-relative
    pub include_dirs: Vec<String>,

    /// Bus the device sits on ("i2c", "spi", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Default bus address (e.g., "0x3C")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_addr: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Extra `<NAME>_<KEY>` macros for the device header
    pub config: BTreeMap<String, Value>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sources: Vec::new(),
            include_dirs: Vec::new(),
            protocol: None,
            default_addr: None,
            description: None,
            config: BTreeMap::new(),
        }
    }
}

/// The persisted project configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    pub toolchain: ToolchainSection,
    pub build: BuildSection,
    pub linker: LinkerSection,

    /// Macro definitions passed as `-D<define>`
    pub defines: Vec<String>,

    pub download: DownloadSection,
    pub files: FilesSection,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bsp: Option<BspSection>,

    pub devices: BTreeMap<String, DeviceConfig>,
}

impl ProjectConfig {
    /// Convert to JSON Value for merging and dotted-path access
    pub fn to_value(&self) -> Value {
        // Every map in the schema is keyed by String, so serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Names of enabled devices, sorted
    pub fn enabled_devices(&self) -> impl Iterator<Item = (&String, &DeviceConfig)> {
        self.devices.iter().filter(|(_, device)| device.enabled)
    }
}
