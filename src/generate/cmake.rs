//! CMake build descriptors: project root, `BSP/` and `Device/`

use std::collections::{BTreeMap, BTreeSet};

use mcu_chips::fpu_flags;

use super::{device_macro_stem, GeneratorInputs};
use crate::config::CONFIG_FILE;

fn generated_banner() -> String {
    format!("# Generated by mcu-scaffold. Edit {} and re-run instead of editing this file.", CONFIG_FILE)
}

/// Join non-empty flag groups with single spaces
fn join_flags<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flags shared by the compile and link lines
pub fn target_flags(inputs: &GeneratorInputs<'_>) -> String {
    let arch = inputs.architecture();
    let instruction_set = format!("-m{}", inputs.config.project.instruction_set);
    join_flags([format!("-mcpu={}", arch).as_str(), instruction_set.as_str(), fpu_flags(arch).as_str()])
}

/// `CMAKE_<LANG>_FLAGS` value
pub fn compile_flags(inputs: &GeneratorInputs<'_>) -> String {
    let build = &inputs.config.build;

    let mut warnings = Vec::new();
    if build.warnings {
        if build.wall {
            warnings.push("-Wall");
        }
        if build.werror {
            warnings.push("-Werror");
        }
    }
    if build.stack_usage {
        warnings.push("-fstack-usage");
    }

    let optimization = format!("-{}", build.optimization);
    let debug_info = format!("-{}", build.debug_info);
    let warnings = warnings.join(" ");
    let target = target_flags(inputs);

    join_flags([
        target.as_str(),
        "-fdata-sections -ffunction-sections",
        warnings.as_str(),
        optimization.as_str(),
        debug_info.as_str(),
    ])
}

/// `CMAKE_EXE_LINKER_FLAGS` value
pub fn linker_flags(inputs: &GeneratorInputs<'_>) -> String {
    let linker = &inputs.config.linker;

    let specs = linker
        .specs
        .iter()
        .map(|spec| format!("-specs={}", spec))
        .collect::<Vec<_>>()
        .join(" ");
    let scripts = std::iter::once(&linker.script)
        .chain(&linker.additional_scripts)
        .filter(|script| !script.is_empty())
        .map(|script| format!("-T${{CMAKE_SOURCE_DIR}}/{}", script))
        .collect::<Vec<_>>()
        .join(" ");

    let mut options = Vec::new();
    if linker.gc_sections {
        options.push("-Wl,--gc-sections");
    }
    if linker.map_file {
        options.push("-Wl,-Map=${PROJECT_NAME}.map,--cref");
    }
    if linker.printf_float {
        options.push("-u _printf_float");
    }
    if linker.scanf_float {
        options.push("-u _scanf_float");
    }
    options.push("-Wl,--print-memory-usage");
    let options = options.join(" ");
    let target = target_flags(inputs);

    join_flags([target.as_str(), specs.as_str(), scripts.as_str(), options.as_str()])
}

/// Depth of a project-relative path (`.` is 0)
fn depth(path: &str) -> usize {
    if path == "." {
        0
    } else {
        path.split('/').count()
    }
}

/// Source group name: the parent directory name, `root` at the top level
fn group_name(source: &str) -> String {
    let mut parts: Vec<&str> = source.split('/').collect();
    parts.pop();
    parts.last().map(|dir| dir.to_string()).unwrap_or_else(|| "root".to_string())
}

/// Root `CMakeLists.txt`
pub fn root_descriptor(inputs: &GeneratorInputs<'_>) -> String {
    let config = inputs.config;
    let toolchain = &config.toolchain;
    let arch = inputs.architecture();
    let package = inputs.package();
    let mut out = Vec::new();

    out.push(generated_banner());
    out.push("cmake_minimum_required(VERSION 3.16)".to_string());
    out.push(String::new());

    out.push("# Target".to_string());
    out.push("set(CMAKE_SYSTEM_NAME Generic)".to_string());
    out.push(format!("set(CMAKE_SYSTEM_PROCESSOR {})", arch));
    out.push(format!("set(TARGET_CHIP {})", config.project.chip));
    out.push(format!("set(TARGET_BOARD {})", config.project.board));
    out.push(format!("set(CHIP_PACKAGE \"{}\")", package));
    out.push(String::new());

    out.push("# Board-support package".to_string());
    out.push(format!("set(BSP_CHIP_DIR \"{}\")", inputs.bsp_dir()));
    out.push(format!("set(BSP_PACKAGE_DIR \"{}\")", package));
    out.push(String::new());

    out.push("# Toolchain".to_string());
    out.push(format!("set(CMAKE_C_COMPILER {})", toolchain.c_compiler));
    out.push(format!("set(CMAKE_CXX_COMPILER {})", toolchain.cxx_compiler));
    out.push(format!("set(CMAKE_ASM_COMPILER {})", toolchain.asm_compiler));
    out.push(format!("set(CMAKE_AR {})", toolchain.ar));
    out.push(format!("set(CMAKE_OBJCOPY {})", toolchain.objcopy));
    out.push(format!("set(SIZE {})", toolchain.size));
    out.push("set(CMAKE_TRY_COMPILE_TARGET_TYPE STATIC_LIBRARY)".to_string());
    out.push(String::new());

    out.push(format!("project({} C CXX ASM)", inputs.project_name));
    out.push(String::new());

    let compile = compile_flags(inputs);
    out.push(format!("# Compile flags ({})", config.project.float_type));
    for lang in ["C", "CXX", "ASM"] {
        out.push(format!("set(CMAKE_{}_FLAGS \"{}\")", lang, compile));
    }
    out.push(String::new());

    out.push("# Linker flags".to_string());
    out.push(format!("set(CMAKE_EXE_LINKER_FLAGS \"{}\")", linker_flags(inputs)));
    out.push(String::new());

    out.push("# Definitions".to_string());
    for define in inputs.defines() {
        out.push(format!("add_definitions(-D{})", define));
    }
    if !package.is_empty() {
        out.push(format!("add_definitions(-DCHIP_PACKAGE_{})", package.to_ascii_uppercase()));
        out.push(format!("add_definitions(-DCHIP_PACKAGE=\"{}\")", package));
    }
    for (name, _) in config.enabled_devices() {
        out.push(format!("add_definitions(-DUSE_DEVICE_{})  # {}", device_macro_stem(name), name));
    }
    out.push(String::new());

    out.push("# Board-support and device layers".to_string());
    out.push("add_subdirectory(BSP)".to_string());
    out.push("add_subdirectory(Device)".to_string());
    out.push(String::new());

    let mut include_dirs: Vec<&String> = config.files.include_dirs.iter().collect();
    include_dirs.sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));
    include_dirs.dedup();
    if !include_dirs.is_empty() {
        out.push("# Application include directories".to_string());
        out.push("include_directories(".to_string());
        for dir in include_dirs {
            out.push(format!("    {}", dir));
        }
        out.push(")".to_string());
    }
    out.push("# Device root holds config.h; layer include directories come from the subdirectories".to_string());
    out.push("include_directories(Device)".to_string());
    out.push("include_directories(${BSP_INCLUDE_DIRS})".to_string());
    out.push("include_directories(${DEVICE_INCLUDE_DIRS})".to_string());
    out.push(String::new());

    let mut groups: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for source in &config.files.sources {
        groups.entry(group_name(source)).or_default().insert(source);
    }
    let group_vars: Vec<String> = groups
        .keys()
        .map(|group| format!("{}_SOURCES", device_macro_stem(group)))
        .collect();
    if groups.is_empty() {
        out.push("set(SOURCE_FILES)".to_string());
    } else {
        out.push("# Source groups".to_string());
        for ((_, sources), var) in groups.iter().zip(&group_vars) {
            out.push(format!("set({}", var));
            for source in sources {
                out.push(format!("    {}", source));
            }
            out.push(")".to_string());
        }
        out.push(String::new());
        out.push("set(SOURCE_FILES".to_string());
        for var in &group_vars {
            out.push(format!("    ${{{}}}", var));
        }
        out.push(")".to_string());
    }
    out.push(String::new());

    let subdirs: BTreeSet<&String> = config.files.subdirs.iter().collect();
    if !subdirs.is_empty() {
        out.push("# Nested build directories".to_string());
        for subdir in subdirs {
            out.push(format!("add_subdirectory({})", subdir));
        }
        out.push(String::new());
    }

    out.push("add_executable(${PROJECT_NAME}.elf".to_string());
    out.push("    ${SOURCE_FILES}".to_string());
    out.push("    ${BSP_SOURCES}".to_string());
    out.push("    ${DEVICE_SOURCES}".to_string());
    out.push(")".to_string());
    out.push(String::new());

    let libraries: BTreeSet<&String> = config.files.static_libraries.iter().filter(|l| !l.is_empty()).collect();
    if !libraries.is_empty() {
        out.push("target_link_libraries(${PROJECT_NAME}.elf".to_string());
        for library in libraries {
            out.push(format!("    {}", library));
        }
        out.push(")".to_string());
        out.push(String::new());
    }

    out.push("add_custom_command(TARGET ${PROJECT_NAME}.elf POST_BUILD".to_string());
    out.push("    COMMAND ${CMAKE_OBJCOPY} -O ihex $<TARGET_FILE:${PROJECT_NAME}.elf> ${PROJECT_NAME}.hex".to_string());
    out.push("    COMMAND ${CMAKE_OBJCOPY} -O binary $<TARGET_FILE:${PROJECT_NAME}.elf> ${PROJECT_NAME}.bin".to_string());
    out.push("    COMMAND ${SIZE} --format=berkeley $<TARGET_FILE:${PROJECT_NAME}.elf>".to_string());
    out.push("    COMMENT \"Building output files\"".to_string());
    out.push(")".to_string());

    finish(out)
}

/// `BSP/CMakeLists.txt`, or `None` when the document holds no BSP sources
pub fn bsp_descriptor(inputs: &GeneratorInputs<'_>) -> Option<String> {
    let bsp = inputs.config.bsp.as_ref().filter(|bsp| !bsp.sources.is_empty())?;
    let mut out = Vec::new();

    out.push(generated_banner());
    out.push("# Board-support package sources for the configured chip".to_string());
    out.push(String::new());
    out.push(format!("set(BSP_CHIP_DIR \"{}\")", bsp.chip_dir));
    out.push("message(STATUS \"bsp chip directory: ${BSP_CHIP_DIR}\")".to_string());
    if !bsp.chip_model_dir.is_empty() {
        out.push(format!("set(BSP_MODEL_DIR \"{}\")", bsp.chip_model_dir));
    }
    if !bsp.chip_package.is_empty() {
        out.push(format!("set(CHIP_PACKAGE \"{}\")", bsp.chip_package));
        out.push(format!("set(BSP_PACKAGE_DIR \"{}\")", bsp.chip_package));
        out.push("message(STATUS \"chip package: ${CHIP_PACKAGE}\")".to_string());
    }
    out.push(String::new());

    let sources: BTreeSet<&String> = bsp.sources.iter().collect();
    out.push("set(BSP_SOURCES".to_string());
    for source in sources {
        out.push(format!("    {}", source));
    }
    out.push(")".to_string());
    out.push("list(LENGTH BSP_SOURCES BSP_SOURCE_COUNT)".to_string());
    out.push("message(STATUS \"bsp source files: ${BSP_SOURCE_COUNT}\")".to_string());
    out.push(String::new());

    let include_dirs: BTreeSet<&String> = bsp.include_dirs.iter().collect();
    out.push("set(BSP_INCLUDE_DIRS".to_string());
    for dir in include_dirs {
        out.push(format!("    ${{CMAKE_SOURCE_DIR}}/{}", dir));
    }
    out.push(")".to_string());
    out.push(String::new());

    out.push("set(BSP_SOURCES_ABS \"\")".to_string());
    out.push("foreach(src ${BSP_SOURCES})".to_string());
    out.push("    list(APPEND BSP_SOURCES_ABS ${CMAKE_CURRENT_SOURCE_DIR}/${src})".to_string());
    out.push("endforeach()".to_string());
    out.push(String::new());
    out.push("set(BSP_SOURCES ${BSP_SOURCES_ABS} PARENT_SCOPE)".to_string());
    out.push("set(BSP_INCLUDE_DIRS ${BSP_INCLUDE_DIRS} PARENT_SCOPE)".to_string());
    out.push(String::new());

    out.push("if(BUILD_BSP_ONLY)".to_string());
    out.push("    add_library(bsp STATIC ${BSP_SOURCES_ABS})".to_string());
    out.push("    target_include_directories(bsp PUBLIC ${BSP_INCLUDE_DIRS})".to_string());
    out.push("    target_compile_options(bsp PRIVATE -Wall -fdata-sections -ffunction-sections)".to_string());
    out.push("endif()".to_string());

    Some(finish(out))
}

/// `Device/CMakeLists.txt`, or `None` when no device is enabled
pub fn device_descriptor(inputs: &GeneratorInputs<'_>) -> Option<String> {
    let devices: Vec<_> = inputs.config.enabled_devices().collect();
    if devices.is_empty() {
        return None;
    }
    let mut out = Vec::new();

    out.push(generated_banner());
    out.push("# External device drivers. Each enabled device defines USE_DEVICE_<NAME>;".to_string());
    out.push("# toggle devices with devices.<name>.enabled in the project configuration.".to_string());
    out.push(String::new());

    let core_files: BTreeSet<&String> = inputs.device_core_files.iter().collect();
    if !core_files.is_empty() {
        out.push("set(DEVICE_CORE_SOURCES".to_string());
        for file in &core_files {
            out.push(format!("    {}", file));
        }
        out.push(")".to_string());
        out.push(String::new());
    }

    let mut source_vars = Vec::new();
    let mut include_dirs = BTreeSet::new();
    for (name, device) in &devices {
        let stem = device_macro_stem(name);
        out.push(format!("# {} (USE_DEVICE_{})", name, stem));
        out.push(format!("set({}_SOURCES", stem));
        let sources: BTreeSet<&String> = device.sources.iter().collect();
        for source in sources {
            out.push(format!("    {}", source));
        }
        out.push(")".to_string());
        out.push(String::new());

        source_vars.push(format!("{}_SOURCES", stem));
        include_dirs.extend(device.include_dirs.iter());
    }

    out.push("set(DEVICE_SOURCES".to_string());
    if !core_files.is_empty() {
        out.push("    ${DEVICE_CORE_SOURCES}".to_string());
    }
    for var in &source_vars {
        out.push(format!("    ${{{}}}", var));
    }
    out.push(")".to_string());
    out.push(String::new());

    out.push("set(DEVICE_INCLUDE_DIRS".to_string());
    for dir in include_dirs {
        out.push(format!("    ${{CMAKE_SOURCE_DIR}}/{}", dir));
    }
    out.push(")".to_string());
    out.push("list(LENGTH DEVICE_SOURCES DEVICE_SOURCE_COUNT)".to_string());
    out.push("message(STATUS \"device source files: ${DEVICE_SOURCE_COUNT}\")".to_string());
    out.push(String::new());

    out.push("set(DEVICE_SOURCES_ABS \"\")".to_string());
    out.push("foreach(src ${DEVICE_SOURCES})".to_string());
    out.push("    list(APPEND DEVICE_SOURCES_ABS ${CMAKE_CURRENT_SOURCE_DIR}/${src})".to_string());
    out.push("endforeach()".to_string());
    out.push(String::new());
    out.push("set(DEVICE_SOURCES ${DEVICE_SOURCES_ABS} PARENT_SCOPE)".to_string());
    out.push("set(DEVICE_INCLUDE_DIRS ${DEVICE_INCLUDE_DIRS} PARENT_SCOPE)".to_string());
    out.push(String::new());

    out.push("if(BUILD_DEVICE_ONLY)".to_string());
    out.push("    add_library(device_all STATIC ${DEVICE_SOURCES_ABS})".to_string());
    out.push("    target_include_directories(device_all PUBLIC ${DEVICE_INCLUDE_DIRS})".to_string());
    out.push("    target_compile_options(device_all PRIVATE -Wall -fdata-sections -ffunction-sections)".to_string());
    out.push("endif()".to_string());

    Some(finish(out))
}

fn finish(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
