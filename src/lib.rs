//! mcu-scaffold - build-system scaffolding for STM32 firmware projects
//!
//! Scans a firmware source tree, records what it finds in a persisted
//! project configuration (`tool/project_config.json`), and regenerates
//! CMake, device-header, OpenOCD and editor files from that configuration
//! on every run.

pub mod config;
pub mod generate;
pub mod pipeline;
pub mod scan;

pub use config::{ConfigError, ConfigStore, ProjectConfig};
pub use generate::{generate_all, write_artifacts, Artifact, GeneratorInputs, Platform};
pub use pipeline::{BuildOptions, BuildReport, Pipeline, PipelineError, RunState};
pub use scan::{detect, DetectionResult, ScanError, Scanner};
