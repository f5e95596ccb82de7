//! Dotted-path access over a JSON value (`section.field`)

use serde_json::{Map, Value};

use super::ConfigError;

/// Get a value by dotted path.
///
/// Returns `None` as soon as a segment is absent or the current value is not
/// a mapping.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set a value by dotted path, creating intermediate mappings as needed.
pub fn set_path(value: &mut Value, path: &str, new_value: Value) -> Result<(), ConfigError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ConfigError::EmptyKey(path.to_string()));
    }
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(ConfigError::EmptyKey(path.to_string()));
    };

    let mut current = value;
    let mut walked = String::new();
    for segment in parents {
        let map = current
            .as_object_mut()
            .ok_or_else(|| ConfigError::NotAMapping(walked.clone()))?;
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);
    }

    current
        .as_object_mut()
        .ok_or(ConfigError::NotAMapping(walked))?
        .insert((*leaf).to_string(), new_value);
    Ok(())
}
