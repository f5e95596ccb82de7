//! Full detection pass over a project tree

use std::collections::BTreeSet;
use std::path::Path;

use mcu_chips::{chip_info, ChipInfo};
use tracing::{info, warn};

use super::{
    analyze_nested_build_descriptor, BspLayout, BspScan, DeviceScan, LinkerScript, ScanError, Scanner,
    NESTED_DESCRIPTOR,
};

/// Everything detection contributes to the project document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionResult {
    pub chip: ChipInfo,
    pub linker_script: LinkerScript,
    pub sources: Vec<String>,
    pub headers: Vec<String>,

    /// Application plus nested-directory include paths
    pub include_dirs: Vec<String>,

    pub subdirs: Vec<String>,

    /// Deduplicated, sorted
    pub static_libraries: Vec<String>,

    /// `None` when the part number has no series
    pub bsp: Option<(BspLayout, BspScan)>,

    pub devices: DeviceScan,
}

/// Scan a project tree.
///
/// `chip` overrides detection when non-empty.
pub fn detect(project_root: &Path, chip: Option<&str>) -> Result<DetectionResult, ScanError> {
    let scanner = Scanner::new(project_root)?;
    let chip = match chip.map(str::trim) {
        Some(chip) if !chip.is_empty() => chip.to_string(),
        _ => scanner.detect_chip(),
    };
    let info = chip_info(&chip);
    let scanner = scanner.with_chip(&chip);

    let source_scan = scanner.scan_sources(&info.architecture);

    let include_dirs: BTreeSet<String> = scanner
        .scan_include_dirs()
        .into_iter()
        .chain(scanner.scan_subdir_includes(&source_scan.nested_dirs))
        .collect();

    let static_libraries: BTreeSet<String> = source_scan
        .nested_dirs
        .iter()
        .flat_map(|subdir| {
            let dir = project_root.join(subdir);
            let dir_name = subdir.rsplit('/').next().unwrap_or(subdir);
            analyze_nested_build_descriptor(&dir.join(NESTED_DESCRIPTOR)).link_names(dir_name)
        })
        .collect();

    let linker_script = scanner.find_linker_script(&chip);

    let bsp = match BspLayout::resolve(project_root, &info) {
        Some(layout) => {
            let scan = scanner.scan_bsp_sources(&layout);
            Some((layout, scan))
        }
        None => {
            warn!(chip = %chip, "no BSP series for chip");
            None
        }
    };

    let devices = scanner.scan_device_sources();

    info!(
        chip = %info.chip,
        architecture = %info.architecture,
        sources = source_scan.sources.len(),
        include_dirs = include_dirs.len(),
        static_libraries = static_libraries.len(),
        devices = devices.groups.len(),
        "detection complete"
    );

    Ok(DetectionResult {
        chip: info,
        linker_script,
        sources: source_scan.sources,
        headers: source_scan.headers,
        include_dirs: include_dirs.into_iter().collect(),
        subdirs: source_scan.nested_dirs,
        static_libraries: static_libraries.into_iter().collect(),
        bsp,
        devices,
    })
}
