//! Part-number decomposition
//!
//! An STM32 part number such as `STM32F407VGT6` splits into the tiers the
//! board-support tree is laid out by:
//! - series directory: `stm32f4`
//! - model directory: `f407`
//! - package directory: `vgt6`

use serde::{Deserialize, Serialize};

const VENDOR_PREFIX: &str = "stm32";

/// Directory tiers derived from a part number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartNumber {
    /// Series directory (e.g., "stm32f4")
    pub series: Option<String>,

    /// Model directory (e.g., "f407")
    pub model: Option<String>,

    /// Package directory (e.g., "vgt6")
    pub package: Option<String>,
}

impl PartNumber {
    /// Decompose a part number. Tiers that cannot be derived are `None`.
    pub fn parse(chip: &str) -> Self {
        let lower = chip.trim().to_ascii_lowercase();
        let Some(rest) = lower.strip_prefix(VENDOR_PREFIX) else {
            return Self::default();
        };

        let bytes = rest.as_bytes();
        let series = match bytes {
            [family, digit, ..] if family.is_ascii_lowercase() && digit.is_ascii_digit() => {
                Some(format!("{VENDOR_PREFIX}{}", &rest[..2]))
            }
            _ => None,
        };

        let model = match bytes {
            [family, a, b, c, ..]
                if family.is_ascii_lowercase()
                    && a.is_ascii_digit()
                    && b.is_ascii_digit()
                    && c.is_ascii_digit() =>
            {
                Some(rest[..4].to_string())
            }
            _ => None,
        };

        let package = model
            .as_ref()
            .and_then(|m| package_suffix(&rest[m.len()..]));

        Self {
            series,
            model,
            package,
        }
    }
}

/// Package code: one letter, then digits, letters, digits (`vgt6`, `ve`, `c8t6`).
fn package_suffix(tail: &str) -> Option<String> {
    let mut chars = tail.chars().peekable();
    let mut out = String::new();

    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => out.push(c),
        _ => return None,
    }
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        out.push(c);
    }
    while let Some(c) = chars.next_if(char::is_ascii_lowercase) {
        out.push(c);
    }
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        out.push(c);
    }

    Some(out)
}

/// Convert a series directory name (`stm32f4`) back into a series identifier (`STM32F4`).
pub fn series_from_dir(dir: &str) -> Option<String> {
    let lower = dir.to_ascii_lowercase();
    let rest = lower.strip_prefix(VENDOR_PREFIX)?;
    match rest.as_bytes() {
        [family, digit] if family.is_ascii_lowercase() && digit.is_ascii_digit() => {
            Some(format!("STM32{}", rest.to_ascii_uppercase()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_part_number() {
        let part = PartNumber::parse("STM32F407VGT6");
        assert_eq!(part.series.as_deref(), Some("stm32f4"));
        assert_eq!(part.model.as_deref(), Some("f407"));
        assert_eq!(part.package.as_deref(), Some("vgt6"));
    }

    #[test]
    fn test_short_package() {
        let part = PartNumber::parse("STM32F407VE");
        assert_eq!(part.model.as_deref(), Some("f407"));
        assert_eq!(part.package.as_deref(), Some("ve"));

        let part = PartNumber::parse("stm32f103c8t6");
        assert_eq!(part.series.as_deref(), Some("stm32f1"));
        assert_eq!(part.package.as_deref(), Some("c8t6"));
    }

    #[test]
    fn test_series_only() {
        let part = PartNumber::parse("STM32F4");
        assert_eq!(part.series.as_deref(), Some("stm32f4"));
        assert_eq!(part.model, None);
        assert_eq!(part.package, None);
    }

    #[test]
    fn test_foreign_part() {
        assert_eq!(PartNumber::parse("UNKNOWNPART123"), PartNumber::default());
        assert_eq!(PartNumber::parse(""), PartNumber::default());
    }

    #[test]
    fn test_series_from_dir() {
        assert_eq!(series_from_dir("stm32f4").as_deref(), Some("STM32F4"));
        assert_eq!(series_from_dir("STM32H7").as_deref(), Some("STM32H7"));
        assert_eq!(series_from_dir("cmsis"), None);
        assert_eq!(series_from_dir("stm32f407"), None);
    }
}
