//! Scaffold orchestration
//!
//! One run decides between three states:
//! - FirstRun: no persisted document. Detect, fold into the document,
//!   generate, persist.
//! - Established: the persisted document is the only source of truth.
//!   Generate from it; nothing is detected and nothing is persisted.
//! - Rescan: an established project whose operator asked for detection
//!   again. Detection-owned fields are replaced, operator fields kept,
//!   and the document is persisted.

use std::collections::BTreeMap;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use mcu_chips::chip_info;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{
    BaseConfig, BspSection, ConfigError, ConfigStore, DeviceConfig, LoadDiagnostic, ProjectConfig, StoreState,
    CONFIG_FILE,
};
use crate::generate::{generate_all, write_artifacts, GeneratorInputs, Platform, WriteError};
use crate::scan::{detect, read_cmake_cache, DetectionResult, ScanError, DEVICE_CORE_FILES, DEVICE_DIR};

/// Name used when the project directory yields none
pub const FALLBACK_PROJECT_NAME: &str = "STM32_Project";

/// A persisted chip shorter than this is a series, not a part number
const MIN_PART_NUMBER_LEN: usize = 7;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Options for one scaffold run
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root
    pub project_root: PathBuf,

    /// Chip override, honoured on first run and rescan
    pub chip: Option<String>,

    /// Board name, honoured on first run and rescan
    pub board: Option<String>,

    /// Overwrite create-only artifacts
    pub force: bool,

    /// Offer a rescan on established projects
    pub interactive: bool,

    /// Rescan without asking
    pub rescan: bool,

    /// Operator defaults file; `None` uses the default location
    pub defaults_path: Option<PathBuf>,

    /// Host platform the IDE files target
    pub platform: Platform,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            chip: None,
            board: None,
            force: false,
            interactive: true,
            rescan: false,
            defaults_path: None,
            platform: Platform::current(),
        }
    }
}

/// Asks the operator whether an established project should be rescanned
pub trait RescanPrompt {
    fn confirm_rescan(&mut self) -> bool;
}

/// Prompt on stderr, answer on stdin. Never asks without a terminal.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl RescanPrompt for StdinPrompt {
    fn confirm_rescan(&mut self) -> bool {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return false;
        }

        let mut stderr = io::stderr();
        let _ = write!(stderr, "Rescan project files? (y/N): ");
        let _ = stderr.flush();

        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Always declines
#[derive(Debug, Default)]
pub struct NoPrompt;

impl RescanPrompt for NoPrompt {
    fn confirm_rescan(&mut self) -> bool {
        false
    }
}

/// State a run executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    FirstRun,
    Established,
    Rescan,
}

impl RunState {
    /// Whether this run persists the document
    pub fn persists(&self) -> bool {
        matches!(self, RunState::FirstRun | RunState::Rescan)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::FirstRun => write!(f, "first run"),
            RunState::Established => write!(f, "established"),
            RunState::Rescan => write!(f, "rescan"),
        }
    }
}

/// Outcome of a run
#[derive(Debug)]
pub struct BuildReport {
    pub state: RunState,
    pub project_name: String,
    pub chip: String,
    pub architecture: String,

    /// Project-relative paths written
    pub written: Vec<PathBuf>,

    /// Create-only artifacts left in place
    pub skipped: Vec<PathBuf>,

    pub write_failures: Vec<WriteError>,

    /// Linker script name assumed because none was found on disk
    pub guessed_linker_script: Option<String>,

    /// Whether the document was persisted
    pub saved: bool,
    pub save_error: Option<ConfigError>,

    /// Non-fatal problems found while loading configuration
    pub diagnostics: Vec<LoadDiagnostic>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.write_failures.is_empty() && self.save_error.is_none()
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Pipeline execution context
pub struct Pipeline {
    options: BuildOptions,
    store: ConfigStore,
}

impl Pipeline {
    /// Open the project's configuration store.
    ///
    /// The persisted document is loaded here, once.
    pub fn new(options: BuildOptions) -> Self {
        let base = base_config(options.defaults_path.as_deref());
        let store = ConfigStore::open_with_base(&options.project_root, &base);
        Self { options, store }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Decide the run state, detect when needed, generate, persist when needed
    pub fn run(&mut self, prompt: &mut dyn RescanPrompt) -> PipelineResult<BuildReport> {
        let state = self.decide_state(prompt);
        info!(state = %state, root = %self.options.project_root.display(), "starting scaffold run");

        let mut guessed_linker_script = None;
        match state {
            RunState::FirstRun | RunState::Rescan => {
                let chip = self.detection_chip(state);
                let detection = detect(&self.options.project_root, chip.as_deref())?;
                if detection.linker_script.is_guessed() {
                    guessed_linker_script = Some(detection.linker_script.path().to_string());
                }
                apply_detection(
                    self.store.config_mut(),
                    detection,
                    self.options.board.as_deref(),
                    &self.options.project_root,
                );
            }
            RunState::Established => {
                if self.options.chip.is_some() || self.options.board.is_some() {
                    warn!(
                        "--chip/--board are ignored for an established project; pass --rescan or edit {}",
                        CONFIG_FILE
                    );
                }
                let files = &self.store.config().files;
                info!(
                    sources = files.sources.len(),
                    include_dirs = files.include_dirs.len(),
                    static_libraries = files.static_libraries.len(),
                    "using persisted configuration"
                );
            }
        }

        log_devices(self.store.config());

        let config = self.store.config();
        let project_name = effective_project_name(config, &self.options.project_root);
        let chip = chip_info(&config.project.chip);
        let toolchain = read_cmake_cache(&self.options.project_root.join("build"));
        if toolchain.is_empty() {
            debug!("no compiler in CMake cache, using toolchain defaults");
        }
        let device_core_files = present_device_core_files(&self.options.project_root);

        let inputs = GeneratorInputs {
            config,
            project_name: &project_name,
            chip: &chip,
            platform: self.options.platform.profile(),
            toolchain: &toolchain,
            device_core_files: &device_core_files,
        };
        let architecture = inputs.architecture().to_string();
        let artifacts = generate_all(&inputs);
        let write_report = write_artifacts(&self.options.project_root, &artifacts, self.options.force);

        let mut saved = false;
        let mut save_error = None;
        if state.persists() {
            match self.store.save() {
                Ok(()) => saved = true,
                Err(e) => {
                    warn!(path = %self.store.path().display(), error = %e, "failed to save configuration");
                    save_error = Some(e);
                }
            }
        } else {
            debug!("established project, configuration not persisted");
        }

        Ok(BuildReport {
            state,
            project_name,
            chip: self.store.config().project.chip.clone(),
            architecture,
            written: write_report.written,
            skipped: write_report.skipped,
            write_failures: write_report.failures,
            guessed_linker_script,
            saved,
            save_error,
            diagnostics: self.store.diagnostics().to_vec(),
        })
    }

    fn decide_state(&self, prompt: &mut dyn RescanPrompt) -> RunState {
        match self.store.state() {
            StoreState::FirstRun => RunState::FirstRun,
            StoreState::Established if self.options.rescan => RunState::Rescan,
            StoreState::Established if self.options.interactive && prompt.confirm_rescan() => RunState::Rescan,
            StoreState::Established => RunState::Established,
        }
    }

    /// Chip passed to detection: the override, or on rescan the persisted
    /// part number
    fn detection_chip(&self, state: RunState) -> Option<String> {
        if let Some(chip) = self.options.chip.as_ref().filter(|chip| !chip.trim().is_empty()) {
            return Some(chip.clone());
        }
        if state != RunState::Rescan {
            return None;
        }

        let existing = self.store.config().project.chip.trim();
        if existing.len() >= MIN_PART_NUMBER_LEN {
            info!(chip = %existing, "reusing configured chip");
            Some(existing.to_string())
        } else {
            None
        }
    }
}

/// Built-in defaults overlaid with the operator defaults file
fn base_config(defaults_path: Option<&Path>) -> BaseConfig {
    let base = BaseConfig::builtin();
    match defaults_path
        .map(Path::to_path_buf)
        .or_else(BaseConfig::default_operator_path)
    {
        Some(path) => base.with_operator_defaults(&path),
        None => base,
    }
}

/// Fold a detection pass into the document.
///
/// Detection-owned fields are replaced. Operator fields of devices that are
/// still present carry over; only their sources and include directories are
/// refreshed.
pub fn apply_detection(
    config: &mut ProjectConfig,
    detection: DetectionResult,
    board: Option<&str>,
    project_root: &Path,
) {
    let DetectionResult {
        chip,
        linker_script,
        sources,
        headers,
        include_dirs,
        subdirs,
        static_libraries,
        bsp,
        devices,
    } = detection;

    config.project.chip = chip.chip;
    config.project.architecture = chip.architecture;
    config.project.float_type = chip.float_description;
    config.download.target = chip.download_target;
    if let Some(board) = board.map(str::trim).filter(|board| !board.is_empty()) {
        config.project.board = board.to_string();
    }
    if config.project.name.trim().is_empty() {
        config.project.name = derive_project_name(project_root);
    }

    config.linker.script = linker_script.path().to_string();

    config.files.sources = sources;
    config.files.headers = headers;
    config.files.include_dirs = include_dirs;
    config.files.subdirs = subdirs;
    config.files.static_libraries = static_libraries;

    config.bsp = bsp.map(|(layout, scan)| BspSection {
        chip_dir: layout.series,
        chip_model_dir: layout.model.unwrap_or_default(),
        chip_package: layout.package.unwrap_or_default(),
        sources: scan.sources,
        include_dirs: scan.include_dirs,
    });

    let mut previous = std::mem::take(&mut config.devices);
    config.devices = devices
        .groups
        .into_iter()
        .map(|(name, group)| {
            let device = match previous.remove(&name) {
                Some(existing) => DeviceConfig {
                    sources: group.sources,
                    include_dirs: group.include_dirs,
                    ..existing
                },
                None => DeviceConfig {
                    sources: group.sources,
                    include_dirs: group.include_dirs,
                    ..DeviceConfig::default()
                },
            };
            (name, device)
        })
        .collect::<BTreeMap<_, _>>();

    for name in previous.keys() {
        info!(device = %name, "device no longer present, dropped");
    }
}

/// Project name from the directory name, non-alphanumerics replaced by `_`
pub fn derive_project_name(project_root: &Path) -> String {
    let dir_name = project_root
        .canonicalize()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .or_else(|| project_root.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let name: String = dir_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if name.chars().all(|c| c == '_') {
        FALLBACK_PROJECT_NAME.to_string()
    } else {
        name
    }
}

/// `project.name`, or the derived name when it is empty
pub fn effective_project_name(config: &ProjectConfig, project_root: &Path) -> String {
    let name = config.project.name.trim();
    if name.is_empty() {
        derive_project_name(project_root)
    } else {
        name.to_string()
    }
}

fn present_device_core_files(project_root: &Path) -> Vec<String> {
    let device_root = project_root.join(DEVICE_DIR);
    DEVICE_CORE_FILES
        .iter()
        .filter(|name| device_root.join(name).is_file())
        .map(|name| name.to_string())
        .collect()
}

fn log_devices(config: &ProjectConfig) {
    let (enabled, disabled): (Vec<&String>, Vec<&String>) =
        config.devices.iter().fold((Vec::new(), Vec::new()), |(mut on, mut off), (name, device)| {
            if device.enabled {
                on.push(name);
            } else {
                off.push(name);
            }
            (on, off)
        });
    if enabled.is_empty() && disabled.is_empty() {
        return;
    }
    info!(enabled = ?enabled, disabled = ?disabled, "device drivers");
}
