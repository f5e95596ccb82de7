//! Chip detection from the project tree

use std::collections::BTreeSet;
use std::fs;

use mcu_chips::{series_from_dir, DEFAULT_CHIP};
use regex_lite::Regex;
use tracing::{debug, info};

use super::{list_dirs, Scanner, BSP_DIR};

/// Series tried first when several BSP series are present
const SERIES_PRIORITY: &[&str] = &["stm32f4", "stm32f1", "stm32f7", "stm32h7", "stm32l4"];

/// Files searched for part numbers, project-relative
const PART_NUMBER_FILES: &[&str] = &["app/main.c", "app/main.h", "Device/config.h"];

/// Part-number patterns, most specific first
const PART_NUMBER_PATTERNS: &[&str] = &[
    r"(?i)STM32F\d{3}[A-Z]{2}",
    r"(?i)STM32[FGLHUW][0-9][0-9A-Z]{2,4}",
];

impl Scanner {
    /// Detect the chip when no override is given.
    ///
    /// Tries the `BSP/<series>` directories, then part numbers mentioned in
    /// well-known sources, then falls back to the default part.
    pub fn detect_chip(&self) -> String {
        if let Some(chip) = self.chip_from_bsp() {
            info!(chip = %chip, "detected chip from BSP tree");
            return chip;
        }
        if let Some(chip) = self.chip_from_sources() {
            info!(chip = %chip, "detected chip from sources");
            return chip;
        }

        info!(chip = DEFAULT_CHIP, "no chip detected, using default");
        DEFAULT_CHIP.to_string()
    }

    fn chip_from_bsp(&self) -> Option<String> {
        let series: BTreeSet<String> = [BSP_DIR, "bsp"]
            .iter()
            .map(|name| self.root.join(name))
            .find(|dir| dir.is_dir())
            .map(|dir| list_dirs(&dir))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|dir| dir.file_name().map(|n| n.to_string_lossy().to_ascii_lowercase()))
            .filter(|name| series_from_dir(name).is_some())
            .collect();

        SERIES_PRIORITY
            .iter()
            .find(|preferred| series.contains(**preferred))
            .map(|preferred| preferred.to_string())
            .or_else(|| series.into_iter().next())
            .and_then(|dir| series_from_dir(&dir))
    }

    fn chip_from_sources(&self) -> Option<String> {
        let patterns: Vec<Regex> = PART_NUMBER_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        for rel in PART_NUMBER_FILES {
            let path = self.root.join(rel);
            let Ok(bytes) = fs::read(&path) else {
                continue;
            };
            let content = String::from_utf8_lossy(&bytes);
            debug!(path = %rel, "searching for part number");

            for re in &patterns {
                if let Some(found) = re.find(&content) {
                    return Some(found.as_str().to_ascii_uppercase());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn mkdir(root: &Path, rel: &str) {
        fs::create_dir_all(root.join(rel)).unwrap();
    }

    #[test]
    fn test_priority_series_wins() {
        let dir = TempDir::new().unwrap();
        mkdir(dir.path(), "BSP/CMSIS");
        mkdir(dir.path(), "BSP/stm32f1");
        mkdir(dir.path(), "BSP/stm32f4");
        mkdir(dir.path(), "BSP/stm32g0");

        let scanner = Scanner::new(dir.path()).unwrap();
        assert_eq!(scanner.detect_chip(), "STM32F4");
    }

    #[test]
    fn test_first_sorted_series() {
        let dir = TempDir::new().unwrap();
        mkdir(dir.path(), "BSP/stm32u5");
        mkdir(dir.path(), "BSP/stm32g4");
        mkdir(dir.path(), "BSP/common");

        let scanner = Scanner::new(dir.path()).unwrap();
        assert_eq!(scanner.detect_chip(), "STM32G4");
    }

    #[test]
    fn test_part_number_from_sources() {
        let dir = TempDir::new().unwrap();
        mkdir(dir.path(), "app");
        fs::write(dir.path().join("app/main.c"), "/* target: stm32f103c8 */\nint main(void) {}\n").unwrap();

        let scanner = Scanner::new(dir.path()).unwrap();
        assert_eq!(scanner.detect_chip(), "STM32F103C8");
    }

    #[test]
    fn test_default_chip() {
        let dir = TempDir::new().unwrap();
        let scanner = Scanner::new(dir.path()).unwrap();
        assert_eq!(scanner.detect_chip(), DEFAULT_CHIP);
    }
}
