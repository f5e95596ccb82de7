//! Floating-point configuration per core architecture

use serde::{Deserialize, Serialize};

/// Floating-point unit selected with `-mfpu`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FpuKind {
    Soft,
    Fpv4SpD16,
    Fpv5D16,
    Fpv5SpD16,
}

impl FpuKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FpuKind::Soft => "soft",
            FpuKind::Fpv4SpD16 => "fpv4-sp-d16",
            FpuKind::Fpv5D16 => "fpv5-d16",
            FpuKind::Fpv5SpD16 => "fpv5-sp-d16",
        }
    }
}

/// Floating-point ABI selected with `-mfloat-abi`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatAbi {
    Soft,
    Hard,
}

impl FloatAbi {
    pub fn as_str(&self) -> &'static str {
        match self {
            FloatAbi::Soft => "soft",
            FloatAbi::Hard => "hard",
        }
    }
}

/// FPU and ABI pair for one architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpuConfig {
    pub fpu: FpuKind,
    pub float_abi: FloatAbi,
}

impl FpuConfig {
    const SOFT: FpuConfig = FpuConfig {
        fpu: FpuKind::Soft,
        float_abi: FloatAbi::Soft,
    };

    const fn hard(fpu: FpuKind) -> Self {
        Self {
            fpu,
            float_abi: FloatAbi::Hard,
        }
    }

    pub fn description(&self) -> String {
        match self.fpu {
            FpuKind::Soft => "software floating point".to_string(),
            fpu => format!("hardware floating point (FPU: {})", fpu.as_str()),
        }
    }

    /// Compiler flags for this configuration
    pub fn flags(&self) -> String {
        match self.fpu {
            FpuKind::Soft => "-mfloat-abi=soft".to_string(),
            fpu => format!("-mfpu={} -mfloat-abi={}", fpu.as_str(), self.float_abi.as_str()),
        }
    }
}

/// Architecture to FPU. Unknown architectures use the `cortex-m3` entry.
const FPU_TABLE: &[(&str, FpuConfig)] = &[
    ("cortex-m0", FpuConfig::SOFT),
    ("cortex-m0plus", FpuConfig::SOFT),
    ("cortex-m3", FpuConfig::SOFT),
    ("cortex-m4", FpuConfig::hard(FpuKind::Fpv4SpD16)),
    ("cortex-m7", FpuConfig::hard(FpuKind::Fpv5D16)),
    ("cortex-m33", FpuConfig::hard(FpuKind::Fpv5SpD16)),
    ("cortex-m55", FpuConfig::hard(FpuKind::Fpv5D16)),
    ("cortex-m85", FpuConfig::hard(FpuKind::Fpv5D16)),
];

/// Architecture to CMSIS core-variant directory name.
const CORE_VARIANTS: &[(&str, &str)] = &[
    ("cortex-m0", "cm0"),
    ("cortex-m0plus", "cm0"),
    ("cortex-m3", "cm3"),
    ("cortex-m4", "cm4"),
    ("cortex-m7", "cm7"),
    ("cortex-m23", "cm23"),
    ("cortex-m33", "cm33"),
    ("cortex-m55", "cm55"),
    ("cortex-m85", "cm85"),
];

pub fn fpu_for_arch(arch: &str) -> FpuConfig {
    FPU_TABLE
        .iter()
        .find(|(name, _)| *name == arch)
        .map(|(_, config)| *config)
        .unwrap_or(FpuConfig::SOFT)
}

/// `-mfpu`/`-mfloat-abi` flags for an architecture
pub fn fpu_flags(arch: &str) -> String {
    fpu_for_arch(arch).flags()
}

/// Core-variant directory name (`cm4`) for an architecture, if it has one.
pub fn core_variant(arch: &str) -> Option<&'static str> {
    CORE_VARIANTS
        .iter()
        .find(|(name, _)| *name == arch)
        .map(|(_, variant)| *variant)
}

/// Preprocessor defines an editor needs to resolve CMSIS headers.
pub fn arch_defines(arch: &str) -> Vec<String> {
    let (core, math) = match arch {
        "cortex-m0" | "cortex-m0plus" => ("0", "ARM_MATH_CM0"),
        "cortex-m3" => ("3", "ARM_MATH_CM3"),
        "cortex-m4" => ("4", "ARM_MATH_CM4"),
        "cortex-m7" => ("7", "ARM_MATH_CM7"),
        "cortex-m33" => ("33", "ARM_MATH_ARMV8MML"),
        _ => return Vec::new(),
    };
    vec![format!("__CORTEX_M={core}"), math.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_flags() {
        assert_eq!(fpu_flags("cortex-m3"), "-mfloat-abi=soft");
        assert_eq!(fpu_flags("cortex-m0plus"), "-mfloat-abi=soft");
    }

    #[test]
    fn test_hard_flags() {
        assert_eq!(fpu_flags("cortex-m4"), "-mfpu=fpv4-sp-d16 -mfloat-abi=hard");
        assert_eq!(fpu_flags("cortex-m7"), "-mfpu=fpv5-d16 -mfloat-abi=hard");
    }

    #[test]
    fn test_unknown_arch_is_soft() {
        assert_eq!(fpu_for_arch("riscv32"), FpuConfig::SOFT);
        assert_eq!(fpu_flags(""), "-mfloat-abi=soft");
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(fpu_for_arch("cortex-m3").description(), "software floating point");
        assert_eq!(
            fpu_for_arch("cortex-m4").description(),
            "hardware floating point (FPU: fpv4-sp-d16)"
        );
    }

    #[test]
    fn test_core_variant() {
        assert_eq!(core_variant("cortex-m4"), Some("cm4"));
        assert_eq!(core_variant("cortex-m0plus"), Some("cm0"));
        assert_eq!(core_variant("unknown"), None);
    }

    #[test]
    fn test_arch_defines() {
        assert_eq!(arch_defines("cortex-m4"), vec!["__CORTEX_M=4", "ARM_MATH_CM4"]);
        assert_eq!(arch_defines("cortex-m33"), vec!["__CORTEX_M=33", "ARM_MATH_ARMV8MML"]);
        assert!(arch_defines("cortex-m85").is_empty());
    }
}
