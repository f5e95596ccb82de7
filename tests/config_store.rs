//! Configuration store tests
//!
//! Merge, lookup and persistence properties of the project document,
//! including the operator defaults layer.

use std::fs;
use std::path::Path;

use mcu_scaffold::config::{
    deep_merge, BaseConfig, ConfigError, ConfigOrigin, ConfigStore, LoadDiagnostic, ProjectConfig, StoreState,
    CONFIG_FILE,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn write_document(root: &Path, document: &Value) {
    let path = root.join(CONFIG_FILE);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(document).unwrap()).unwrap();
}

/// Dotted paths of every scalar or list leaf
fn leaf_paths(value: &Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                leaf_paths(child, &path, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

// =============================================================================
// Merge properties
// =============================================================================

#[test]
fn test_default_completeness() {
    let dir = TempDir::new().unwrap();
    write_document(dir.path(), &json!({}));

    let store = ConfigStore::open(dir.path());
    assert_eq!(store.state(), StoreState::Established);

    let mut paths = Vec::new();
    leaf_paths(&ProjectConfig::default().to_value(), "", &mut paths);
    assert!(paths.contains(&"build.optimization".to_string()));
    for path in paths {
        assert!(store.get(&path).is_some(), "missing {}", path);
    }
}

#[test]
fn test_override_precedence() {
    let dir = TempDir::new().unwrap();
    write_document(dir.path(), &json!({"build": {"optimization": "O2"}}));

    let store = ConfigStore::open(dir.path());

    assert_eq!(store.get_str("build.optimization").as_deref(), Some("O2"));
    // siblings of an overridden key keep their defaults
    assert_eq!(store.get_str("build.debug_info").as_deref(), Some("g3"));
    assert_eq!(store.get("build.wall"), Some(json!(true)));
}

#[test]
fn test_list_replacement() {
    let merged = deep_merge(json!({"defines": ["A"]}), json!({"defines": ["B", "C"]}));
    assert_eq!(merged["defines"], json!(["B", "C"]));

    let dir = TempDir::new().unwrap();
    write_document(dir.path(), &json!({"linker": {"specs": ["nano.specs"]}}));
    let store = ConfigStore::open(dir.path());
    assert_eq!(store.config().linker.specs, vec!["nano.specs"]);
}

#[test]
fn test_save_reload_fixed_point() {
    let dir = TempDir::new().unwrap();
    write_document(
        dir.path(),
        &json!({
            "project": {"chip": "STM32F407VGT6", "name": "blinky"},
            "defines": ["USE_HAL_DRIVER"],
            "devices": {"ssd1306": {"default_addr": "0x3C", "config": {"width": 128}}},
        }),
    );

    let store = ConfigStore::open(dir.path());
    store.save().unwrap();
    let saved = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();

    let reloaded = ConfigStore::open(dir.path());
    assert_eq!(reloaded.config(), store.config());
    reloaded.save().unwrap();
    assert_eq!(fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(), saved);
    assert!(saved.ends_with("}\n"));
    assert!(!dir.path().join("tool/.project_config.json.tmp").exists());
}

// =============================================================================
// Unknown keys and type errors
// =============================================================================

#[test]
fn test_unknown_key_dropped_on_load() {
    let dir = TempDir::new().unwrap();
    write_document(
        dir.path(),
        &json!({
            "build": {"optimisation": "O3"},
            "devices": {"bmp280": {"config": {"oversampling": 16}}},
        }),
    );

    let store = ConfigStore::open(dir.path());

    assert!(store.diagnostics().iter().any(|d| matches!(
        d,
        LoadDiagnostic::UnknownKey { key, .. } if key == "build.optimisation"
    )));
    assert_eq!(store.get("build.optimisation"), None);
    // device config maps are free-form
    assert_eq!(store.get("devices.bmp280.config.oversampling"), Some(json!(16)));
}

#[test]
fn test_set_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    let mut store = ConfigStore::open(dir.path());
    let before = store.config().clone();

    let err = store.set("build.optimisation", json!("O3")).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKey(ref key) if key == "build.optimisation"));
    assert_eq!(store.config(), &before);
}

#[test]
fn test_set_rejects_wrong_type() {
    let dir = TempDir::new().unwrap();
    let mut store = ConfigStore::open(dir.path());
    let before = store.config().clone();

    let err = store.set("defines", json!("USE_HAL_DRIVER")).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "defines"));
    assert_eq!(store.config(), &before);
}

#[test]
fn test_set_creates_device_entries() {
    let dir = TempDir::new().unwrap();
    let mut store = ConfigStore::open(dir.path());

    store.set("devices.w25q64.config.page_size", json!(256)).unwrap();

    assert_eq!(store.get("devices.w25q64.enabled"), Some(json!(true)));
    assert_eq!(store.config().devices["w25q64"].config["page_size"], json!(256));
}

#[test]
fn test_get_fallback() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::open(dir.path());

    assert_eq!(store.get_or("build.optimization.level", json!("none")), json!("none"));
    assert_eq!(store.get_or("nothing.here", json!(0)), json!(0));
}

#[test]
fn test_malformed_document() {
    let dir = TempDir::new().unwrap();
    write_document(dir.path(), &json!({"defines": "not-a-list"}));

    let store = ConfigStore::open(dir.path());

    assert_eq!(store.state(), StoreState::Established);
    assert_eq!(store.config(), &ProjectConfig::default());
    assert!(matches!(store.diagnostics(), [LoadDiagnostic::Malformed { .. }]));
}

#[test]
fn test_malformed_document_survives_set_and_save() {
    let dir = TempDir::new().unwrap();
    let broken = "{\"project\": {\"chip\": \"STM32F407VGT6\"},, \"files\": {\"sources\": [\"main.c\"]}}";
    let path = dir.path().join(CONFIG_FILE);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, broken).unwrap();

    let mut store = ConfigStore::open(dir.path());
    assert!(store.is_malformed());
    store.set_from_str("build.wall", "false").unwrap();

    let err = store.save().unwrap_err();
    assert!(matches!(err, ConfigError::Unloaded(ref p) if *p == path));
    assert_eq!(fs::read_to_string(&path).unwrap(), broken);
}

#[test]
fn test_set_numeric_text_on_string_fields() {
    let dir = TempDir::new().unwrap();
    let mut store = ConfigStore::open(dir.path());

    store.set_from_str("download.speed", "1000").unwrap();
    store.set_from_str("project.board", "1234").unwrap();
    // quoted JSON strings keep their parsed value
    store.set_from_str("build.optimization", "\"O2\"").unwrap();

    assert_eq!(store.config().download.speed, "1000");
    assert_eq!(store.config().project.board, "1234");
    assert_eq!(store.config().build.optimization, "O2");

    // a bool field still rejects text, with the original reason
    let err = store.set_from_str("build.wall", "1").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "build.wall"));
    assert!(store.config().build.wall);
}

#[test]
fn test_set_whole_section() {
    let dir = TempDir::new().unwrap();
    let mut store = ConfigStore::open(dir.path());

    store.set_from_str("download", r#"{"interface": "jlink"}"#).unwrap();
    store.set("devices.w25q64", json!({"protocol": "spi"})).unwrap();

    assert_eq!(store.get_str("download.interface").as_deref(), Some("jlink"));
    assert_eq!(store.get_str("download.speed").as_deref(), Some("4000"));
    assert_eq!(store.get("devices.w25q64.enabled"), Some(json!(true)));

    let err = store.set("download", json!({"interfase": "jlink"})).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKey(ref key) if key == "download.interfase"));
}

// =============================================================================
// Operator defaults
// =============================================================================

#[test]
fn test_operator_defaults_layer() {
    let dir = TempDir::new().unwrap();
    let defaults = dir.path().join("defaults.toml");
    fs::write(
        &defaults,
        "[build]\noptimization = \"Os\"\nwerror = true\n\n[download]\ninterface = \"jlink\"\n",
    )
    .unwrap();
    write_document(dir.path(), &json!({"build": {"optimization": "O2"}}));

    let base = BaseConfig::builtin().with_operator_defaults(&defaults);
    let store = ConfigStore::open_with_base(dir.path(), &base);

    assert_eq!(store.get_str("build.optimization").as_deref(), Some("O2"));
    assert_eq!(store.get("build.werror"), Some(json!(true)));
    assert_eq!(store.get_str("download.interface").as_deref(), Some("jlink"));
    assert_eq!(store.get_str("build.debug_info").as_deref(), Some("g3"));

    let origins: Vec<ConfigOrigin> = store.sources().iter().map(|s| s.origin).collect();
    assert_eq!(origins, vec![ConfigOrigin::Builtin, ConfigOrigin::Operator, ConfigOrigin::Project]);
}

#[test]
fn test_broken_operator_defaults_skipped() {
    let dir = TempDir::new().unwrap();
    let defaults = dir.path().join("defaults.toml");
    fs::write(&defaults, "[build\noptimization = ").unwrap();

    let base = BaseConfig::builtin().with_operator_defaults(&defaults);
    let store = ConfigStore::open_with_base(dir.path(), &base);

    assert_eq!(store.state(), StoreState::FirstRun);
    assert_eq!(store.get_str("build.optimization").as_deref(), Some("O0"));
    assert!(matches!(
        store.diagnostics(),
        [LoadDiagnostic::OperatorDefaultsSkipped { .. }]
    ));
}
