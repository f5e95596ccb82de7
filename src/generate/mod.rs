//! Artifact generation
//!
//! Every generator is a pure function of [`GeneratorInputs`]. Writing happens
//! in one place, [`write_artifacts`], which handles each artifact
//! independently.

pub mod cmake;
pub mod header;
pub mod ide;
pub mod openocd;
pub mod platform;

use std::fs;
use std::path::{Path, PathBuf};

use mcu_chips::ChipInfo;
use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::scan::ToolchainHint;

pub use platform::{Platform, PlatformProfile};

/// How an artifact treats an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Regenerated every run
    Overwrite,

    /// Written only when absent, unless forced
    CreateOnly,
}

/// A generated file, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Project-relative path
    pub path: PathBuf,
    pub contents: String,
    pub policy: WritePolicy,
}

impl Artifact {
    pub fn overwrite(path: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
            policy: WritePolicy::Overwrite,
        }
    }

    pub fn create_only(path: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
            policy: WritePolicy::CreateOnly,
        }
    }
}

/// Resolved inputs shared by all generators
#[derive(Debug, Clone, Copy)]
pub struct GeneratorInputs<'a> {
    pub config: &'a ProjectConfig,

    /// Effective project name (never empty)
    pub project_name: &'a str,

    /// Registry entry for `project.chip`
    pub chip: &'a ChipInfo,

    pub platform: &'a PlatformProfile,
    pub toolchain: &'a ToolchainHint,

    /// Shared sources directly under `Device/`
    pub device_core_files: &'a [String],
}

impl GeneratorInputs<'_> {
    /// Architecture from the document, or the registry when unset
    pub fn architecture(&self) -> &str {
        let arch = self.config.project.architecture.trim();
        if arch.is_empty() {
            &self.chip.architecture
        } else {
            arch
        }
    }

    /// Series directory from the document's BSP entry, or the registry
    pub fn bsp_dir(&self) -> &str {
        match &self.config.bsp {
            Some(bsp) if !bsp.chip_dir.is_empty() => &bsp.chip_dir,
            _ => self.chip.bsp_dir.as_deref().unwrap_or(""),
        }
    }

    pub fn package(&self) -> &str {
        self.chip.package.as_deref().unwrap_or("")
    }

    /// Macro definitions, empty entries dropped
    pub fn defines(&self) -> impl Iterator<Item = &str> {
        self.config
            .defines
            .iter()
            .map(|define| define.trim())
            .filter(|define| !define.is_empty())
    }

    /// Project-relative include directories of enabled devices, sorted
    pub fn device_include_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = self
            .config
            .enabled_devices()
            .flat_map(|(_, device)| device.include_dirs.iter().cloned())
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }
}

/// `USE_DEVICE_<STEM>` / `<STEM>_SOURCES` stem for a device name
pub fn device_macro_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Build every artifact, in write order
pub fn generate_all(inputs: &GeneratorInputs<'_>) -> Vec<Artifact> {
    let mut artifacts = vec![Artifact::overwrite("CMakeLists.txt", cmake::root_descriptor(inputs))];

    match cmake::bsp_descriptor(inputs) {
        Some(contents) => artifacts.push(Artifact::overwrite("BSP/CMakeLists.txt", contents)),
        None => warn!("no BSP sources configured, skipping BSP/CMakeLists.txt"),
    }
    match cmake::device_descriptor(inputs) {
        Some(contents) => artifacts.push(Artifact::overwrite("Device/CMakeLists.txt", contents)),
        None => warn!("no enabled devices, skipping Device/CMakeLists.txt"),
    }

    artifacts.push(Artifact::overwrite("Device/config.h", header::device_config_header(inputs)));
    artifacts.push(Artifact::overwrite("tool/idea.cfg", openocd::idea_cfg(inputs)));
    artifacts.push(Artifact::create_only(".gitignore", openocd::gitignore()));

    artifacts.push(Artifact::overwrite(".vscode/c_cpp_properties.json", ide::c_cpp_properties(inputs)));
    artifacts.push(Artifact::overwrite(".vscode/launch.json", ide::launch_json(inputs)));
    artifacts.push(Artifact::overwrite(".vscode/tasks.json", ide::tasks_json(inputs)));
    artifacts.push(Artifact::overwrite(".vscode/settings.json", ide::settings_json(inputs)));
    artifacts.push(Artifact::overwrite(".vscode/extensions.json", ide::extensions_json()));
    artifacts.push(Artifact::overwrite(".clangd", ide::clangd(inputs)));
    artifacts.push(Artifact::overwrite("compile_flags.txt", ide::compile_flags(inputs)));

    artifacts
}

/// A failed artifact write
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    pub fn path(&self) -> &Path {
        match self {
            WriteError::Io { path, .. } => path,
        }
    }
}

/// Outcome of a best-effort write
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,

    /// Create-only artifacts left alone
    pub skipped: Vec<PathBuf>,

    pub failures: Vec<WriteError>,
}

impl WriteReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write artifacts under `root`.
///
/// Each write is independent: a failure is recorded and the remaining
/// artifacts are still written. `force` overwrites create-only artifacts.
pub fn write_artifacts(root: &Path, artifacts: &[Artifact], force: bool) -> WriteReport {
    let mut report = WriteReport::default();

    for artifact in artifacts {
        let target = root.join(&artifact.path);

        if artifact.policy == WritePolicy::CreateOnly && !force && target.exists() {
            debug!(path = %artifact.path.display(), "exists, not overwriting");
            report.skipped.push(artifact.path.clone());
            continue;
        }

        match atomic_write(&target, artifact.contents.as_bytes()) {
            Ok(()) => {
                info!(path = %artifact.path.display(), "generated");
                report.written.push(artifact.path.clone());
            }
            Err(source) => {
                warn!(path = %artifact.path.display(), error = %source, "write failed");
                report.failures.push(WriteError::Io {
                    path: artifact.path.clone(),
                    source,
                });
            }
        }
    }

    report
}

/// Write a temporary sibling, then rename it over `path`
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = dir.join(format!(".{}.tmp", file_name));

    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::config::{BspSection, DeviceConfig};

    /// A document as left by a first run on an STM32F407VGT6 tree
    pub fn f407_config() -> ProjectConfig {
        let mut config = ProjectConfig::default();
        config.project.name = "blinky".into();
        config.project.chip = "STM32F407VGT6".into();
        config.project.board = "discovery".into();
        config.project.architecture = "cortex-m4".into();
        config.project.float_type = "hardware floating point (FPU: fpv4-sp-d16)".into();
        config.linker.script = "BSP/stm32f4/f407/vgt6/stm32f407vgt6.ld".into();
        config.defines = vec!["USE_HAL_DRIVER".into(), "".into(), "STM32F407xx".into()];
        config.download.target = "stm32f4x".into();
        config.files.sources = vec!["app/main.c".into(), "app/tasks/led.c".into(), "main.c".into()];
        config.files.include_dirs = vec!["app/tasks/inc".into(), "inc".into(), "app".into()];
        config.files.subdirs = vec!["Middleware/fatfs".into()];
        config.files.static_libraries = vec!["fatfs".into(), "fatfs".into(), "cmsis_dsp".into()];
        config.bsp = Some(BspSection {
            chip_dir: "stm32f4".into(),
            chip_model_dir: "f407".into(),
            chip_package: "vgt6".into(),
            sources: vec!["stm32f4/Core/startup.s".into(), "stm32f4/Driver/gpio.c".into()],
            include_dirs: vec!["BSP/stm32f4/Driver".into(), "BSP/CMSIS/Include".into()],
        });

        let mut oled = DeviceConfig {
            sources: vec!["ssd1306/ssd1306.c".into()],
            include_dirs: vec!["Device/ssd1306".into()],
            default_addr: Some("0x3C".into()),
            ..DeviceConfig::default()
        };
        oled.config.insert("width".into(), serde_json::json!(128));
        config.devices.insert("ssd1306".into(), oled);
        config.devices.insert(
            "w25q64".into(),
            DeviceConfig {
                enabled: false,
                sources: vec!["w25q64/w25q64.c".into()],
                include_dirs: vec!["Device/w25q64".into()],
                protocol: Some("spi".into()),
                ..DeviceConfig::default()
            },
        );
        config
    }
}
