//! Static chip tables for STM32 / Cortex-M parts.
//!
//! Maps a part number to its core architecture, floating-point unit,
//! debug-server target and board-support directory tiers. Every lookup is
//! total: an unrecognized part resolves to the default entry.

mod fpu;
mod part;

pub use fpu::{arch_defines, core_variant, fpu_flags, fpu_for_arch, FloatAbi, FpuConfig, FpuKind};
pub use part::{series_from_dir, PartNumber};

use serde::{Deserialize, Serialize};

/// Architecture used when no prefix matches.
pub const DEFAULT_ARCHITECTURE: &str = "cortex-m3";

/// OpenOCD target used when no prefix matches.
pub const DEFAULT_DOWNLOAD_TARGET: &str = "stm32f1x";

/// Part assumed when detection finds nothing.
pub const DEFAULT_CHIP: &str = "STM32F407VE";

/// Series prefix to core architecture.
const ARCHITECTURES: &[(&str, &str)] = &[
    ("STM32F0", "cortex-m0"),
    ("STM32F1", "cortex-m3"),
    ("STM32F103", "cortex-m3"),
    ("STM32F2", "cortex-m3"),
    ("STM32F3", "cortex-m4"),
    ("STM32F4", "cortex-m4"),
    ("STM32F7", "cortex-m7"),
    ("STM32G0", "cortex-m0plus"),
    ("STM32G4", "cortex-m4"),
    ("STM32H7", "cortex-m7"),
    ("STM32L0", "cortex-m0plus"),
    ("STM32L1", "cortex-m3"),
    ("STM32L4", "cortex-m4"),
    ("STM32L5", "cortex-m33"),
    ("STM32U5", "cortex-m33"),
    ("STM32WB", "cortex-m4"),
    ("STM32WL", "cortex-m4"),
];

/// Series prefix to OpenOCD target script name.
const DOWNLOAD_TARGETS: &[(&str, &str)] = &[
    ("STM32F0", "stm32f0x"),
    ("STM32F1", "stm32f1x"),
    ("STM32F2", "stm32f2x"),
    ("STM32F3", "stm32f3x"),
    ("STM32F4", "stm32f4x"),
    ("STM32F7", "stm32f7x"),
    ("STM32G0", "stm32g0x"),
    ("STM32G4", "stm32g4x"),
    ("STM32H7", "stm32h7x"),
    ("STM32L0", "stm32l0x"),
    ("STM32L1", "stm32l1x"),
    ("STM32L4", "stm32l4x"),
    ("STM32L5", "stm32l5x"),
    ("STM32U5", "stm32u5x"),
    ("STM32WB", "stm32wbx"),
    ("STM32WL", "stm32wlx"),
];

/// Everything the generators need to know about a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipInfo {
    /// Part number as given (e.g., "STM32F407VGT6")
    pub chip: String,

    /// Core architecture passed to `-mcpu` (e.g., "cortex-m4")
    pub architecture: String,

    /// Floating-point unit
    pub fpu: FpuKind,

    /// Floating-point ABI
    pub float_abi: FloatAbi,

    /// Human-readable floating-point description
    pub float_description: String,

    /// OpenOCD target (e.g., "stm32f4x")
    pub download_target: String,

    /// BSP series directory (e.g., "stm32f4")
    pub bsp_dir: Option<String>,

    /// BSP model sub-directory (e.g., "f407")
    pub model_dir: Option<String>,

    /// BSP package sub-directory (e.g., "vgt6")
    pub package: Option<String>,
}

/// Look up a part number.
///
/// Matching is case-insensitive and picks the longest known prefix.
pub fn chip_info(chip: &str) -> ChipInfo {
    let architecture = longest_prefix(ARCHITECTURES, chip).unwrap_or(DEFAULT_ARCHITECTURE);
    let download_target = longest_prefix(DOWNLOAD_TARGETS, chip).unwrap_or(DEFAULT_DOWNLOAD_TARGET);
    let fpu = fpu_for_arch(architecture);
    let part = PartNumber::parse(chip);

    ChipInfo {
        chip: chip.to_string(),
        architecture: architecture.to_string(),
        fpu: fpu.fpu,
        float_abi: fpu.float_abi,
        float_description: fpu.description(),
        download_target: download_target.to_string(),
        bsp_dir: part.series,
        model_dir: part.model,
        package: part.package,
    }
}

fn longest_prefix(table: &'static [(&'static str, &'static str)], chip: &str) -> Option<&'static str> {
    let upper = chip.trim().to_ascii_uppercase();
    table
        .iter()
        .filter(|(prefix, _)| upper.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f4_lookup() {
        let info = chip_info("STM32F407VGT6");
        assert_eq!(info.architecture, "cortex-m4");
        assert_eq!(info.fpu, FpuKind::Fpv4SpD16);
        assert_eq!(info.float_abi, FloatAbi::Hard);
        assert_eq!(info.download_target, "stm32f4x");
        assert_eq!(info.bsp_dir.as_deref(), Some("stm32f4"));
        assert_eq!(info.model_dir.as_deref(), Some("f407"));
        assert_eq!(info.package.as_deref(), Some("vgt6"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(chip_info("stm32h743zi").architecture, "cortex-m7");
        assert_eq!(chip_info("stm32h743zi").download_target, "stm32h7x");
    }

    #[test]
    fn test_unknown_chip_falls_back() {
        let info = chip_info("UNKNOWNPART123");
        assert_eq!(info.chip, "UNKNOWNPART123");
        assert_eq!(info.architecture, DEFAULT_ARCHITECTURE);
        assert_eq!(info.fpu, FpuKind::Soft);
        assert_eq!(info.download_target, DEFAULT_DOWNLOAD_TARGET);
        assert_eq!(info.bsp_dir, None);
    }

    #[test]
    fn test_empty_chip_falls_back() {
        let info = chip_info("");
        assert_eq!(info.architecture, DEFAULT_ARCHITECTURE);
        assert_eq!(info.download_target, DEFAULT_DOWNLOAD_TARGET);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table: &'static [(&str, &str)] = &[("STM32F", "short"), ("STM32F10", "long")];
        assert_eq!(longest_prefix(table, "STM32F103C8"), Some("long"));
        assert_eq!(longest_prefix(table, "STM32F407"), Some("short"));
    }

    #[test]
    fn test_m33_series() {
        let info = chip_info("STM32U575ZI");
        assert_eq!(info.architecture, "cortex-m33");
        assert_eq!(info.fpu, FpuKind::Fpv5SpD16);
        assert_eq!(info.download_target, "stm32u5x");
    }

    #[test]
    fn test_serializes_kebab_case_fpu() {
        let info = chip_info("STM32F746NG");
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["fpu"], "fpv5-d16");
        assert_eq!(value["float_abi"], "hard");
    }
}
