//! Project tree scanning
//!
//! Walks the project tree and classifies what it finds: application sources,
//! header directories, linker scripts, nested build directories, and the
//! board-support and device-driver trees. All reported paths are
//! project-relative, `/`-separated and sorted.

mod chip;
mod cmake_cache;
mod detect;
mod exclude;
mod nested;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use mcu_chips::{core_variant, series_from_dir, ChipInfo, PartNumber};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

pub use cmake_cache::{parse_cmake_cache, read_cmake_cache, ToolchainHint, CACHE_FILE};
pub use detect::{detect, DetectionResult};
pub use exclude::ExcludeRules;
pub use nested::{analyze_nested_build_descriptor, NestedBuildAnalysis};

/// Source file extensions (case-sensitive: `.s` and `.S` are both assembly)
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "s", "S", "asm"];

/// Header file extensions
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hpp"];

/// Linker script extensions (matched case-insensitively)
const LINKER_EXTENSIONS: &[&str] = &["ld", "lds"];

/// Build descriptor marking a nested build directory
pub const NESTED_DESCRIPTOR: &str = "CMakeLists.txt";

/// Board-support tree, relative to the project root
pub const BSP_DIR: &str = "BSP";

/// Device-driver tree, relative to the project root
pub const DEVICE_DIR: &str = "Device";

/// Shared device sources living directly under `Device/`
pub const DEVICE_CORE_FILES: &[&str] = &["device_hal.c", "device_init.c"];

/// Per-core directories inside vendor packs
const CORE_VARIANT_DIRS: &[&str] = &[
    "ca5", "ca7", "ca9", "cm0", "cm3", "cm4", "cm7", "cm23", "cm33", "cm55", "cm85",
];

/// Device subdirectories that never contribute sources
const DEVICE_SKIP_DIRS: &[&str] = &["examples", "example", "tests", "test"];

/// Errors raised while preparing a scan
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),
}

/// Board-support tree layout: `BSP/<series>[/<model>[/<package>]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BspLayout {
    /// Series directory (e.g., "stm32f4")
    pub series: String,

    /// Model sub-tier (e.g., "f407")
    pub model: Option<String>,

    /// Package sub-tier (e.g., "vgt6"), only below a model
    pub package: Option<String>,
}

impl BspLayout {
    /// Layout with no sub-tiers
    pub fn flat(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            model: None,
            package: None,
        }
    }

    /// Resolve a chip's layout against the tree on disk.
    ///
    /// A sub-tier is kept only when its directory exists.
    pub fn resolve(project_root: &Path, chip: &ChipInfo) -> Option<Self> {
        let series = chip.bsp_dir.clone()?;
        let series_root = project_root.join(BSP_DIR).join(&series);

        let model = chip
            .model_dir
            .clone()
            .filter(|model| series_root.join(model).is_dir());
        let package = match &model {
            Some(model) => chip
                .package
                .clone()
                .filter(|package| series_root.join(model).join(package).is_dir()),
            None => None,
        };

        Some(Self {
            series,
            model,
            package,
        })
    }

    /// Project-relative series directory
    pub fn series_path(&self) -> String {
        format!("{}/{}", BSP_DIR, self.series)
    }
}

/// Linker script selected for a chip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkerScript {
    /// Found on disk, project-relative
    Found(String),

    /// Nothing on disk; conventional file name
    Guessed(String),
}

impl LinkerScript {
    pub fn path(&self) -> &str {
        match self {
            LinkerScript::Found(path) | LinkerScript::Guessed(path) => path,
        }
    }

    pub fn is_guessed(&self) -> bool {
        matches!(self, LinkerScript::Guessed(_))
    }
}

/// Application sources outside the generated trees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceScan {
    pub sources: Vec<String>,
    pub headers: Vec<String>,

    /// Directories owning their own build descriptor
    pub nested_dirs: Vec<String>,
}

/// Board-support sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BspScan {
    /// Relative to `BSP/`
    pub sources: Vec<String>,

    /// Project-relative
    pub include_dirs: Vec<String>,
}

/// Sources of one device driver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceGroup {
    /// Relative to `Device/`
    pub sources: Vec<String>,

    /// Project-relative
    pub include_dirs: Vec<String>,
}

/// Device-driver tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceScan {
    pub groups: BTreeMap<String, DeviceGroup>,

    /// Present entries of `DEVICE_CORE_FILES`
    pub core_files: Vec<String>,
}

enum Visit {
    Descend,
    Skip,
}

/// Filesystem scanner rooted at a project directory
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    rules: ExcludeRules,
    app_rules: ExcludeRules,

    /// Series directory of the configured chip
    series: Option<String>,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ScanError> {
        Ok(Self {
            root: root.into(),
            rules: ExcludeRules::new()?,
            app_rules: ExcludeRules::application()?,
            series: None,
        })
    }

    /// Restrict `BSP` traversal to the chip's series directory
    pub fn with_chip(mut self, chip: &str) -> Self {
        self.series = PartNumber::parse(chip).series;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Application sources and nested build directories.
    ///
    /// CMSIS sources and sources under another core's variant directory
    /// are dropped.
    pub fn scan_sources(&self, arch: &str) -> SourceScan {
        let variant = core_variant(arch);
        let mut scan = SourceScan::default();

        self.walk(&self.root, &self.app_rules, |entry, rel| {
            let file_type = entry.file_type();
            if file_type.is_dir() {
                if entry.depth() > 0 && entry.path().join(NESTED_DESCRIPTOR).is_file() {
                    debug!(dir = %to_slash(rel), "nested build directory");
                    scan.nested_dirs.push(to_slash(rel));
                    return Visit::Skip;
                }
                return Visit::Descend;
            }

            if !file_type.is_file() || under_cmsis(parent_of(rel)) || foreign_core_variant(parent_of(rel), variant) {
                return Visit::Descend;
            }
            if has_extension(rel, SOURCE_EXTENSIONS) {
                scan.sources.push(to_slash(rel));
            } else if has_extension(rel, HEADER_EXTENSIONS) {
                scan.headers.push(to_slash(rel));
            }
            Visit::Descend
        });

        scan.sources.sort();
        scan.headers.sort();
        scan.nested_dirs.sort();
        scan
    }

    /// Directories holding headers, outside the generated trees.
    ///
    /// Inside CMSIS only `Core/Include` counts. Descent stops below any other
    /// header directory whose name contains `include`.
    pub fn scan_include_dirs(&self) -> Vec<String> {
        let mut dirs = BTreeSet::new();

        self.walk(&self.root, &self.app_rules, |entry, rel| {
            if !entry.file_type().is_dir() || !has_headers(entry.path()) {
                return Visit::Descend;
            }

            if under_cmsis(rel) {
                if self.rules.is_cmsis_core_include(rel) {
                    dirs.insert(to_slash(rel));
                }
                return Visit::Descend;
            }

            dirs.insert(to_slash(rel));
            if is_include_dir(rel) {
                Visit::Skip
            } else {
                Visit::Descend
            }
        });

        dirs.into_iter().collect()
    }

    /// Each nested build directory plus its header-bearing subdirectories
    pub fn scan_subdir_includes(&self, nested_dirs: &[String]) -> Vec<String> {
        let mut dirs = BTreeSet::new();

        for nested in nested_dirs {
            dirs.insert(nested.clone());

            self.walk(&self.root.join(nested), &self.rules, |entry, rel| {
                if !entry.file_type().is_dir() || !has_headers(entry.path()) {
                    return Visit::Descend;
                }
                dirs.insert(to_slash(rel));
                if is_include_dir(rel) {
                    Visit::Skip
                } else {
                    Visit::Descend
                }
            });
        }

        dirs.into_iter().collect()
    }

    /// Locate the linker script for a chip.
    ///
    /// Search order: package directory, model directory, series `Core`,
    /// then the whole tree preferring names that carry the part number.
    pub fn find_linker_script(&self, chip: &str) -> LinkerScript {
        let part = PartNumber::parse(chip);

        let mut tiers = Vec::new();
        if let Some(series) = &part.series {
            let series_root = self.root.join(BSP_DIR).join(series);
            if let Some(model) = &part.model {
                if let Some(package) = &part.package {
                    tiers.push(series_root.join(model).join(package));
                }
                tiers.push(series_root.join(model));
            }
            tiers.push(series_root.join("Core"));
        }

        for tier in &tiers {
            if let Some(script) = first_file_with_extension(tier, &["ld"]) {
                let rel = self.relative(&script);
                info!(script = %rel, "found linker script");
                return LinkerScript::Found(rel);
            }
        }

        let mut scripts = Vec::new();
        self.walk(&self.root, &self.rules, |entry, rel| {
            if entry.file_type().is_file() && has_extension_ignore_case(rel, LINKER_EXTENSIONS) {
                scripts.push(to_slash(rel));
            }
            Visit::Descend
        });
        scripts.sort();

        let chip_upper = chip.trim().to_ascii_uppercase();
        let model_upper = part.model.as_ref().map(|model| format!("STM32{}", model.to_ascii_uppercase()));
        let preferred = scripts
            .iter()
            .find(|script| !chip_upper.is_empty() && file_name_upper(script).contains(&chip_upper))
            .or_else(|| {
                model_upper
                    .as_ref()
                    .and_then(|model| scripts.iter().find(|script| file_name_upper(script).contains(model.as_str())))
            })
            .or_else(|| scripts.first());

        match preferred {
            Some(script) => {
                info!(script = %script, "found linker script");
                LinkerScript::Found(script.clone())
            }
            None => {
                let guess = format!("{}Tx_FLASH.ld", chip.trim());
                warn!(chip = %chip, script = %guess, "no linker script found, using conventional name");
                LinkerScript::Guessed(guess)
            }
        }
    }

    /// Board-support sources for a layout.
    ///
    /// `Core/` is scanned recursively, `Driver/` and the model directory
    /// non-recursively; the package directory contributes an include
    /// directory only; `BSP/CMSIS` contributes every header directory.
    pub fn scan_bsp_sources(&self, layout: &BspLayout) -> BspScan {
        let bsp_root = self.root.join(BSP_DIR);
        let series_root = bsp_root.join(&layout.series);
        let mut sources = BTreeSet::new();
        let mut include_dirs = BTreeSet::new();

        if !series_root.is_dir() {
            warn!(dir = %layout.series_path(), "BSP series directory missing");
            return BspScan::default();
        }

        let core = series_root.join("Core");
        if core.is_dir() {
            self.walk(&core, &self.rules, |entry, rel| {
                if entry.file_type().is_file() {
                    if has_extension(rel, SOURCE_EXTENSIONS) {
                        sources.insert(relative_to(entry.path(), &bsp_root));
                    } else if has_extension(rel, HEADER_EXTENSIONS) {
                        include_dirs.insert(to_slash(parent_of(rel)));
                    }
                }
                Visit::Descend
            });
        }

        let mut flat_dirs = vec![series_root.join("Driver")];
        if let Some(model) = &layout.model {
            flat_dirs.push(series_root.join(model));
        }
        for dir in flat_dirs.iter().filter(|dir| dir.is_dir()) {
            for file in list_files(dir) {
                if has_extension(&file, SOURCE_EXTENSIONS) {
                    sources.insert(relative_to(&file, &bsp_root));
                } else if has_extension(&file, HEADER_EXTENSIONS) {
                    include_dirs.insert(self.relative(dir));
                }
            }
        }

        if let (Some(model), Some(package)) = (&layout.model, &layout.package) {
            let package_dir = series_root.join(model).join(package);
            if package_dir.is_dir() {
                include_dirs.insert(self.relative(&package_dir));
            }
        }

        let cmsis = bsp_root.join("CMSIS");
        if cmsis.is_dir() {
            self.walk(&cmsis, &self.rules, |entry, rel| {
                if entry.file_type().is_dir() && has_headers(entry.path()) {
                    include_dirs.insert(to_slash(rel));
                }
                Visit::Descend
            });
        }

        BspScan {
            sources: sources.into_iter().collect(),
            include_dirs: include_dirs.into_iter().collect(),
        }
    }

    /// One source group per `Device/<name>/` directory with at least one source
    pub fn scan_device_sources(&self) -> DeviceScan {
        let device_root = self.root.join(DEVICE_DIR);
        if !device_root.is_dir() {
            return DeviceScan::default();
        }

        let core_files = DEVICE_CORE_FILES
            .iter()
            .filter(|name| device_root.join(name).is_file())
            .map(|name| name.to_string())
            .collect();

        let mut groups = BTreeMap::new();
        for dir in list_dirs(&device_root) {
            let rel = self.relative(&dir);
            if self.rules.is_excluded(Path::new(&rel)) {
                continue;
            }
            let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            let mut group_sources = BTreeSet::new();
            let mut group_includes = BTreeSet::new();
            self.walk(&dir, &self.rules, |entry, rel| {
                let file_type = entry.file_type();
                if file_type.is_dir() {
                    let skip = entry.depth() > 0 && {
                        let dir_name = entry.file_name().to_string_lossy().to_ascii_lowercase();
                        DEVICE_SKIP_DIRS.contains(&dir_name.as_str())
                    };
                    return if skip { Visit::Skip } else { Visit::Descend };
                }
                if file_type.is_file() {
                    if has_extension(rel, SOURCE_EXTENSIONS) {
                        group_sources.insert(relative_to(entry.path(), &device_root));
                    } else if has_extension(rel, HEADER_EXTENSIONS) {
                        group_includes.insert(to_slash(parent_of(rel)));
                    }
                }
                Visit::Descend
            });

            if group_sources.is_empty() {
                debug!(device = %name, "device directory has no sources");
                continue;
            }
            groups.insert(
                name,
                DeviceGroup {
                    sources: group_sources.into_iter().collect(),
                    include_dirs: group_includes.into_iter().collect(),
                },
            );
        }

        DeviceScan { groups, core_files }
    }

    /// Walk `start` in file-name order, skipping excluded directories
    /// and foreign BSP series.
    fn walk(&self, start: &Path, rules: &ExcludeRules, mut visit: impl FnMut(&DirEntry, &Path) -> Visit) {
        let mut entries = WalkDir::new(start)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter();

        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %ScanError::from(e), "skipping unreadable entry");
                    continue;
                }
            };
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let is_dir = entry.file_type().is_dir();

            if is_dir && entry.depth() > 0 && (rules.is_excluded(&rel) || self.is_foreign_series(&rel)) {
                entries.skip_current_dir();
                continue;
            }

            if let Visit::Skip = visit(&entry, &rel) {
                if is_dir {
                    entries.skip_current_dir();
                }
            }
        }
    }

    /// A chip-series directory directly under a `BSP` directory that is
    /// not the configured chip's.
    fn is_foreign_series(&self, rel: &Path) -> bool {
        let Some(target) = &self.series else {
            return false;
        };
        let parent_is_bsp = rel
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|parent| parent.to_string_lossy().eq_ignore_ascii_case(BSP_DIR));
        if !parent_is_bsp {
            return false;
        }

        let name = rel
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        series_from_dir(&name).is_some() && name != *target
    }

    fn relative(&self, path: &Path) -> String {
        relative_to(path, &self.root)
    }
}

/// `path` relative to `base`, `/`-separated; `.` for `base` itself
fn relative_to(path: &Path, base: &Path) -> String {
    to_slash(path.strip_prefix(base).unwrap_or(path))
}

fn to_slash(path: &Path) -> String {
    let joined = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn file_name_upper(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_ascii_uppercase()
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

fn has_extension_ignore_case(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

fn under_cmsis(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str().to_string_lossy().eq_ignore_ascii_case("cmsis"))
}

fn foreign_core_variant(path: &Path, variant: Option<&str>) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy().to_ascii_lowercase();
        CORE_VARIANT_DIRS.contains(&name.as_str()) && Some(name.as_str()) != variant
    })
}

fn is_include_dir(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().to_ascii_lowercase().contains("include"))
}

fn has_headers(dir: &Path) -> bool {
    list_files(dir)
        .iter()
        .any(|file| has_extension(file, HEADER_EXTENSIONS))
}

/// Regular files directly inside `dir`, sorted
fn list_files(dir: &Path) -> Vec<PathBuf> {
    list_entries(dir, |file_type| file_type.is_file())
}

/// Non-hidden subdirectories directly inside `dir`, sorted
fn list_dirs(dir: &Path) -> Vec<PathBuf> {
    list_entries(dir, |file_type| file_type.is_dir())
        .into_iter()
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| !name.to_string_lossy().starts_with('.'))
        })
        .collect()
}

fn list_entries(dir: &Path, keep: impl Fn(&fs::FileType) -> bool) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = read_dir
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| keep(&t)))
        .map(|entry| entry.path())
        .collect();
    paths.sort();
    paths
}

fn first_file_with_extension(dir: &Path, extensions: &[&str]) -> Option<PathBuf> {
    list_files(dir)
        .into_iter()
        .find(|file| has_extension_ignore_case(file, extensions))
}
