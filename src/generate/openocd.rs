//! OpenOCD server script and repository hygiene files

use super::GeneratorInputs;
use crate::config::CONFIG_FILE;

/// `tool/idea.cfg`
pub fn idea_cfg(inputs: &GeneratorInputs<'_>) -> String {
    let download = &inputs.config.download;
    format!(
        "source [find interface/{}.cfg]\nsource [find target/{}.cfg]\nadapter speed {}\n",
        download.interface, download.target, download.speed
    )
}

/// Seed `.gitignore` listing build output and every generated file
pub fn gitignore() -> String {
    let generated = [
        "CMakeLists.txt",
        "BSP/CMakeLists.txt",
        "Device/CMakeLists.txt",
        "Device/config.h",
        CONFIG_FILE,
        "tool/idea.cfg",
        ".clangd",
        "compile_flags.txt",
    ];

    let mut lines = vec![
        "# Build output".to_string(),
        "build/".to_string(),
        String::new(),
        "# Caches".to_string(),
        ".cache/".to_string(),
        String::new(),
        "# Generated by mcu-scaffold".to_string(),
    ];
    lines.extend(generated.iter().map(|path| path.to_string()));
    lines.extend(
        [
            "",
            "# Editor",
            ".vscode/",
            "",
            "# Python caches",
            "__pycache__/",
            "*.pyc",
            "*.pyo",
            "",
            "# Keil MDK output",
            "MDK/Objects/",
            "MDK/Listings/",
            "MDK/JLinkLog.txt",
            "",
            "# Temporary files",
            "*.bak",
            "*.tmp",
            "*.log",
        ]
        .iter()
        .map(|line| line.to_string()),
    );

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
