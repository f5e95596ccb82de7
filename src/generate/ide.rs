//! Editor integration: VS Code and clangd

use mcu_chips::{arch_defines, fpu_flags};
use serde_json::{json, Map, Value};

use super::GeneratorInputs;

/// Defines every editor entry point resolves CMSIS headers with
const EDITOR_DEFINES: &[&str] = &["__GNUC__", "__ARM_ARCH", "ARM_MATH_MATRIX_CHECK", "ARM_MATH_ROUNDING"];

const RECOMMENDED_EXTENSIONS: &[&str] = &[
    "ms-vscode.cpptools",
    "marus25.cortex-debug",
    "ms-vscode.cmake-tools",
    "twxs.cmake",
    "ms-python.python",
    "dan-c-underwood.arm",
    "zixuanwang.linkerscript",
];

fn pretty(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text
}

/// Document defines, then architecture defines, then [`EDITOR_DEFINES`]
fn editor_defines(inputs: &GeneratorInputs<'_>) -> Vec<String> {
    inputs
        .defines()
        .map(str::to_string)
        .chain(arch_defines(inputs.architecture()))
        .chain(EDITOR_DEFINES.iter().map(|define| define.to_string()))
        .collect()
}

/// Project-relative include directories: application, BSP, devices, then
/// `Device` for `config.h`
fn include_dirs(inputs: &GeneratorInputs<'_>) -> Vec<String> {
    let bsp_dirs = inputs.config.bsp.iter().flat_map(|bsp| bsp.include_dirs.iter().cloned());
    let mut dirs: Vec<String> = inputs
        .config
        .files
        .include_dirs
        .iter()
        .cloned()
        .chain(bsp_dirs)
        .chain(inputs.device_include_dirs())
        .collect();
    dirs.push("Device".to_string());

    let mut seen = std::collections::BTreeSet::new();
    dirs.retain(|dir| seen.insert(dir.clone()));
    dirs
}

/// Compiler for the editor: the configured one a previous CMake run resolved,
/// else the platform's default install
fn compiler_path(inputs: &GeneratorInputs<'_>) -> String {
    inputs
        .toolchain
        .c_compiler
        .clone()
        .unwrap_or_else(|| inputs.platform.default_tool_path(&inputs.config.toolchain.c_compiler))
}

/// Toolchain bin directory from the cache, else the platform default
fn toolchain_dir(inputs: &GeneratorInputs<'_>) -> String {
    inputs
        .toolchain
        .toolchain_dir
        .clone()
        .unwrap_or_else(|| inputs.platform.toolchain_bin_dir.to_string())
}

fn gdb_path(inputs: &GeneratorInputs<'_>) -> String {
    match &inputs.toolchain.toolchain_dir {
        Some(dir) => inputs.platform.gdb_in(dir),
        None => inputs.platform.gdb_path.to_string(),
    }
}

/// Target flags split into single arguments
fn target_args(inputs: &GeneratorInputs<'_>) -> Vec<String> {
    let arch = inputs.architecture();
    let mut args = vec![
        format!("-mcpu={}", arch),
        format!("-m{}", inputs.config.project.instruction_set),
    ];
    args.extend(fpu_flags(arch).split_whitespace().map(str::to_string));
    args.push("-fdata-sections".to_string());
    args.push("-ffunction-sections".to_string());
    args
}

/// Flags clangd parses sources with
fn clang_args(inputs: &GeneratorInputs<'_>) -> Vec<String> {
    let build = &inputs.config.build;
    let mut args = target_args(inputs);
    args.push("-Wall".to_string());
    args.push(format!("-{}", build.optimization));
    args.push(format!("-{}", build.debug_info));
    args.push("--target=arm-none-eabi".to_string());
    args.push("-nostdlib".to_string());
    args.push("-ffreestanding".to_string());
    args.extend(editor_defines(inputs).into_iter().map(|define| format!("-D{}", define)));
    args.extend(include_dirs(inputs).into_iter().map(|dir| format!("-I{}", dir)));
    args
}

/// `.vscode/c_cpp_properties.json`
pub fn c_cpp_properties(inputs: &GeneratorInputs<'_>) -> String {
    let include_path: Vec<String> = include_dirs(inputs)
        .into_iter()
        .map(|dir| format!("${{workspaceFolder}}/{}", dir))
        .chain(std::iter::once("${workspaceFolder}/**".to_string()))
        .chain(inputs.platform.toolchain_include_globs.iter().map(|glob| glob.to_string()))
        .collect();

    pretty(&json!({
        "configurations": [{
            "name": "STM32",
            "includePath": include_path,
            "defines": editor_defines(inputs),
            "compilerPath": compiler_path(inputs),
            "cStandard": "c11",
            "cppStandard": "c++17",
            "intelliSenseMode": "gcc-arm",
            "compilerArgs": target_args(inputs),
        }],
        "version": 4,
    }))
}

/// `.vscode/launch.json`: J-Link when the probe interface is `jlink`,
/// OpenOCD otherwise
pub fn launch_json(inputs: &GeneratorInputs<'_>) -> String {
    let download = &inputs.config.download;
    let jlink = download.interface.eq_ignore_ascii_case("jlink");

    let mut launch = Map::new();
    launch.insert("name".into(), json!("Debug STM32"));
    launch.insert("cwd".into(), json!("${workspaceFolder}"));
    launch.insert("executable".into(), json!(format!("./build/{}.elf", inputs.project_name)));
    launch.insert("request".into(), json!("launch"));
    launch.insert("type".into(), json!("cortex-debug"));
    launch.insert("runToEntryPoint".into(), json!("main"));
    launch.insert("showDevDebugOutput".into(), json!("raw"));
    launch.insert("servertype".into(), json!(if jlink { "jlink" } else { "openocd" }));

    if !inputs.platform.platform.is_windows() {
        launch.insert("gdbPath".into(), json!(gdb_path(inputs)));
    }

    if jlink {
        launch.insert("device".into(), json!(inputs.config.project.chip));
        launch.insert("interface".into(), json!("swd"));
    } else {
        launch.insert(
            "configFiles".into(),
            json!([
                format!("interface/{}.cfg", download.interface),
                format!("target/{}.cfg", download.target),
            ]),
        );
        launch.insert(
            "searchDir".into(),
            json!(["${workspaceFolder}", inputs.platform.openocd_scripts_dir]),
        );
        launch.insert(
            "openOCDLaunchCommands".into(),
            json!([format!("adapter speed {}", download.speed)]),
        );
    }

    pretty(&json!({
        "version": "0.2.0",
        "configurations": [Value::Object(launch)],
    }))
}

/// `.vscode/tasks.json`: configure, build, clean, flash
pub fn tasks_json(inputs: &GeneratorInputs<'_>) -> String {
    let platform = inputs.platform;
    let elf = format!("build/{}.elf", inputs.project_name);

    pretty(&json!({
        "version": "2.0.0",
        "tasks": [
            {
                "label": "Configure",
                "type": "shell",
                "command": "cmake",
                "args": ["-S", ".", "-B", "build", "-G", platform.cmake_generator],
                "problemMatcher": [],
            },
            {
                "label": "Build",
                "type": "shell",
                "command": "cmake",
                "args": ["--build", "build"],
                "dependsOn": "Configure",
                "problemMatcher": ["$gcc"],
                "group": {"kind": "build", "isDefault": true},
            },
            {
                "label": "Clean",
                "type": "shell",
                "command": "cmake",
                "args": ["--build", "build", "--target", "clean"],
                "problemMatcher": [],
            },
            {
                "label": "Flash",
                "type": "shell",
                "command": platform.openocd_binary,
                "args": ["-f", "tool/idea.cfg", "-c", format!("program {} verify reset exit", elf)],
                "dependsOn": "Build",
                "problemMatcher": [],
                "group": {"kind": "build", "isDefault": false},
            },
        ],
    }))
}

/// `.vscode/settings.json`
pub fn settings_json(inputs: &GeneratorInputs<'_>) -> String {
    let platform = inputs.platform;

    let mut settings = json!({
        "files.associations": {
            "*.h": "c",
            "*.c": "c",
            "*.hpp": "cpp",
            "*.cpp": "cpp",
            "*.ld": "text",
            "*.lds": "text",
        },
        "cortex-debug.openocdPath": platform.openocd_binary,
        "cortex-debug.armToolchainPath": toolchain_dir(inputs),
        "cortex-debug.gdbPath": gdb_path(inputs),
        "cmake.configureOnOpen": true,
        "cmake.buildDirectory": "${workspaceFolder}/build",
        "cmake.generator": platform.cmake_generator,
        "C_Cpp.default.configurationProvider": "ms-vscode.cmake-tools",
        "editor.formatOnSave": true,
        "editor.insertSpaces": true,
        "editor.tabSize": 4,
        "files.trimTrailingWhitespace": true,
        "files.encoding": "utf8",
    });

    if platform.platform.is_windows() {
        if let Some(map) = settings.as_object_mut() {
            map.insert("terminal.integrated.shell.windows".into(), json!(platform.shell));
        }
    }

    pretty(&settings)
}

/// `.vscode/extensions.json`
pub fn extensions_json() -> String {
    pretty(&json!({ "recommendations": RECOMMENDED_EXTENSIONS }))
}

/// `.clangd`. JSON is a YAML subset, so clangd reads it as-is.
pub fn clangd(inputs: &GeneratorInputs<'_>) -> String {
    pretty(&json!({
        "CompileFlags": {
            "Add": clang_args(inputs),
            "Compiler": compiler_path(inputs),
            "CompilationDatabase": "build",
        },
        "Index": {"Background": "Build", "StandardLibrary": false},
        "Diagnostics": {
            "Suppress": ["pp_file_not_found", "unknown_warning_option"],
        },
    }))
}

/// `compile_flags.txt`: one flag per line
pub fn compile_flags(inputs: &GeneratorInputs<'_>) -> String {
    let mut text = clang_args(inputs).join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::generate::fixtures::f407_config;
    use crate::generate::Platform;
    use crate::scan::ToolchainHint;

    fn render(
        config: &ProjectConfig,
        platform: Platform,
        toolchain: &ToolchainHint,
        f: impl Fn(&GeneratorInputs<'_>) -> String,
    ) -> Value {
        let chip = mcu_chips::chip_info(&config.project.chip);
        let inputs = GeneratorInputs {
            config,
            project_name: "blinky",
            chip: &chip,
            platform: platform.profile(),
            toolchain,
            device_core_files: &[],
        };
        serde_json::from_str(&f(&inputs)).unwrap()
    }

    #[test]
    fn test_launch_openocd_variant() {
        let launch = render(&f407_config(), Platform::Linux, &ToolchainHint::default(), launch_json);
        let debug = &launch["configurations"][0];

        assert_eq!(debug["servertype"], "openocd");
        assert_eq!(debug["executable"], "./build/blinky.elf");
        assert_eq!(debug["configFiles"], json!(["interface/stlink.cfg", "target/stm32f4x.cfg"]));
        assert_eq!(debug["openOCDLaunchCommands"], json!(["adapter speed 4000"]));
        assert_eq!(debug["gdbPath"], "gdb-multiarch");
        assert!(debug.get("device").is_none());
    }

    #[test]
    fn test_launch_jlink_variant() {
        let mut config = f407_config();
        config.download.interface = "jlink".into();

        let launch = render(&config, Platform::Windows, &ToolchainHint::default(), launch_json);
        let debug = &launch["configurations"][0];

        assert_eq!(debug["servertype"], "jlink");
        assert_eq!(debug["device"], "STM32F407VGT6");
        assert_eq!(debug["interface"], "swd");
        assert!(debug.get("configFiles").is_none());
        assert!(debug.get("gdbPath").is_none());
    }

    #[test]
    fn test_c_cpp_properties() {
        let props = render(&f407_config(), Platform::Linux, &ToolchainHint::default(), c_cpp_properties);
        let config = &props["configurations"][0];

        assert_eq!(config["compilerPath"], "/usr/bin/arm-none-eabi-gcc");
        assert_eq!(config["cStandard"], "c11");
        assert_eq!(config["cppStandard"], "c++17");
        assert_eq!(props["version"], 4);

        let defines: Vec<&str> = config["defines"].as_array().unwrap().iter().map(|d| d.as_str().unwrap()).collect();
        assert_eq!(
            defines,
            vec![
                "USE_HAL_DRIVER",
                "STM32F407xx",
                "__CORTEX_M=4",
                "ARM_MATH_CM4",
                "__GNUC__",
                "__ARM_ARCH",
                "ARM_MATH_MATRIX_CHECK",
                "ARM_MATH_ROUNDING",
            ]
        );

        let includes = config["includePath"].as_array().unwrap();
        assert_eq!(includes[0], "${workspaceFolder}/app/tasks/inc");
        assert!(includes.contains(&json!("${workspaceFolder}/BSP/CMSIS/Include")));
        assert!(includes.contains(&json!("${workspaceFolder}/Device/ssd1306")));
        assert!(!includes.contains(&json!("${workspaceFolder}/Device/w25q64")));
        assert!(includes.contains(&json!("${workspaceFolder}/Device")));
        assert!(includes.contains(&json!("${workspaceFolder}/**")));
    }

    #[test]
    fn test_compiler_path_from_cache() {
        let hint = ToolchainHint {
            c_compiler: Some("/opt/arm/bin/arm-none-eabi-gcc".into()),
            cxx_compiler: None,
            toolchain_dir: Some("/opt/arm/bin".into()),
        };
        let props = render(&f407_config(), Platform::Linux, &hint, c_cpp_properties);
        assert_eq!(props["configurations"][0]["compilerPath"], "/opt/arm/bin/arm-none-eabi-gcc");

        let settings = render(&f407_config(), Platform::Windows, &hint, settings_json);
        assert_eq!(settings["cortex-debug.armToolchainPath"], "/opt/arm/bin");
        assert_eq!(settings["cortex-debug.gdbPath"], "/opt/arm/bin/arm-none-eabi-gdb.exe");
    }

    #[test]
    fn test_settings_platform_specific() {
        let hint = ToolchainHint::default();
        let windows = render(&f407_config(), Platform::Windows, &hint, settings_json);
        assert_eq!(windows["cmake.generator"], "Ninja");
        assert_eq!(windows["terminal.integrated.shell.windows"], "cmd.exe");

        let linux = render(&f407_config(), Platform::Linux, &hint, settings_json);
        assert_eq!(linux["cmake.generator"], "Unix Makefiles");
        assert_eq!(linux["cortex-debug.armToolchainPath"], "/usr/bin");
        assert!(linux.get("terminal.integrated.shell.windows").is_none());
    }

    #[test]
    fn test_tasks_flash_uses_openocd_script() {
        let tasks = render(&f407_config(), Platform::Linux, &ToolchainHint::default(), tasks_json);
        let flash = tasks["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .find(|task| task["label"] == "Flash")
            .unwrap();

        assert_eq!(flash["command"], "/usr/bin/openocd");
        assert_eq!(flash["args"][1], "tool/idea.cfg");
        assert_eq!(flash["args"][3], "program build/blinky.elf verify reset exit");
    }

    #[test]
    fn test_extensions() {
        let extensions: Value = serde_json::from_str(&extensions_json()).unwrap();
        assert_eq!(extensions["recommendations"][1], "marus25.cortex-debug");
    }

    #[test]
    fn test_compile_flags_lines() {
        let config = f407_config();
        let chip = mcu_chips::chip_info(&config.project.chip);
        let toolchain = ToolchainHint::default();
        let inputs = GeneratorInputs {
            config: &config,
            project_name: "blinky",
            chip: &chip,
            platform: Platform::Linux.profile(),
            toolchain: &toolchain,
            device_core_files: &[],
        };

        let text = compile_flags(&inputs);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(&lines[..4], &["-mcpu=cortex-m4", "-mthumb", "-mfpu=fpv4-sp-d16", "-mfloat-abi=hard"]);
        assert!(lines.contains(&"--target=arm-none-eabi"));
        assert!(lines.contains(&"-DSTM32F407xx"));
        assert!(lines.contains(&"-Iinc"));
        assert!(!lines.contains(&"-D"));

        let clangd: Value = serde_json::from_str(&clangd(&inputs)).unwrap();
        assert_eq!(clangd["CompileFlags"]["Add"].as_array().unwrap().len(), lines.len());
    }
}
