//! Configuration merge logic
//!
//! Merges the persisted document onto the schema default with:
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge two JSON values.
///
/// Merge semantics:
/// - Objects: deep-merge by key (recursive)
/// - Arrays: REPLACE (second wins entirely)
/// - Scalars: override (second wins)
/// - Null: override (null can override any value)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }

        // Lists are owned wholesale by whoever wrote them
        (Value::Array(_), overlay @ Value::Array(_)) => overlay,

        (_, overlay) => overlay,
    }
}

/// Merge multiple config layers in order (first is base, last has highest precedence)
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

/// Dotted paths present in `merged` but absent from `kept`.
///
/// Used after a typed round-trip to report keys the schema dropped.
/// Null leaves are ignored since optional fields serialize as absent.
pub fn dropped_keys(merged: &Value, kept: &Value) -> Vec<String> {
    let mut dropped = Vec::new();
    collect_dropped(merged, kept, String::new(), &mut dropped);
    dropped
}

fn collect_dropped(merged: &Value, kept: &Value, path: String, dropped: &mut Vec<String>) {
    let Value::Object(merged_map) = merged else {
        return;
    };

    for (key, value) in merged_map {
        let current_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };

        match kept.get(key) {
            Some(kept_value) => collect_dropped(value, kept_value, current_path, dropped),
            None if value.is_null() => {}
            None => dropped.push(current_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let base = json!({"build": {"optimization": "O0"}});
        let overlay = json!({"build": {"optimization": "O2"}});
        let result = deep_merge(base, overlay);
        assert_eq!(result["build"]["optimization"], "O2");
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({
            "download": {
                "interface": "stlink",
                "target": "stm32f1x",
                "speed": "4000"
            }
        });
        let overlay = json!({
            "download": {
                "interface": "jlink"
            }
        });
        let result = deep_merge(base, overlay);

        assert_eq!(result["download"]["interface"], "jlink");
        // Sibling keys survive a partial mapping
        assert_eq!(result["download"]["target"], "stm32f1x");
        assert_eq!(result["download"]["speed"], "4000");
    }

    #[test]
    fn test_array_replace() {
        let base = json!({"defines": ["A"]});
        let overlay = json!({"defines": ["B", "C"]});
        let result = deep_merge(base, overlay);

        assert_eq!(result["defines"], json!(["B", "C"]));
    }

    #[test]
    fn test_empty_array_replaces() {
        let base = json!({"linker": {"specs": ["nosys.specs", "nano.specs"]}});
        let overlay = json!({"linker": {"specs": []}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["linker"]["specs"], json!([]));
    }

    #[test]
    fn test_add_new_key() {
        let base = json!({"devices": {}});
        let overlay = json!({"devices": {"oled": {"enabled": true}}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["devices"]["oled"]["enabled"], true);
    }

    #[test]
    fn test_null_override() {
        let base = json!({"bsp": {"chip_dir": "stm32f4"}});
        let overlay = json!({"bsp": null});
        let result = deep_merge(base, overlay);

        assert!(result["bsp"].is_null());
    }

    #[test]
    fn test_empty_overlay_is_identity() {
        let base = json!({"build": {"optimization": "O0", "wall": true}});
        let result = deep_merge(base.clone(), json!({}));
        assert_eq!(result, base);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = json!({"build": {"optimization": "O0", "wall": true}, "defines": ["A"]});
        let overlay = json!({"build": {"optimization": "Os"}, "defines": ["B"]});

        let once = deep_merge(base.clone(), overlay);
        let twice = deep_merge(base, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_layers() {
        let builtin = json!({
            "toolchain": {"c_compiler": "arm-none-eabi-gcc"},
            "download": {"interface": "stlink"}
        });
        let operator = json!({
            "toolchain": {"c_compiler": "/opt/arm/bin/arm-none-eabi-gcc"}
        });
        let project = json!({
            "download": {"interface": "jlink"}
        });

        let result = merge_layers(vec![builtin, operator, project]);

        assert_eq!(result["toolchain"]["c_compiler"], "/opt/arm/bin/arm-none-eabi-gcc");
        assert_eq!(result["download"]["interface"], "jlink");
    }

    #[test]
    fn test_dropped_keys() {
        let merged = json!({
            "build": {"optimization": "O2", "optimisation": "O3"},
            "extra": {"x": 1},
            "bsp": null
        });
        let kept = json!({"build": {"optimization": "O2"}});

        let dropped = dropped_keys(&merged, &kept);
        assert_eq!(dropped, vec!["build.optimisation".to_string(), "extra".to_string()]);
    }
}
