//! Configuration loading
//!
//! A run is described by one YAML document. When a data folder is given,
//! `<data_folder>/binary/global_config.yaml` (written by the preprocessing
//! step) is merged over it so dataset-derived keys win.

use super::schema::TrainSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the dataset-level config written next to the binarized data
pub const GLOBAL_CONFIG_FILE: &str = "global_config.yaml";

/// Parse a YAML config file into a `TrainSpec` without validating it
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TrainSpec> {
    let document = read_yaml(path.as_ref())?;
    Ok(serde_yaml::from_value(document)?)
}

/// Load a config, merge the data folder's global config over it, validate
pub fn load_run_config<P: AsRef<Path>>(path: P, data_folder: Option<&Path>) -> Result<TrainSpec> {
    let mut document = read_yaml(path.as_ref())?;

    if let Some(global) = data_folder.map(global_config_path) {
        if global.exists() {
            tracing::info!(path = %global.display(), "merging global config");
            let overlay = read_yaml(&global)?;
            merge_yaml(&mut document, overlay);
        } else {
            tracing::debug!(path = %global.display(), "no global config found");
        }
    }

    let spec: TrainSpec = serde_yaml::from_value(document)?;
    validate_config(&spec)?;
    Ok(spec)
}

/// Path of the global config for a data folder
pub fn global_config_path(data_folder: &Path) -> PathBuf {
    data_folder.join("binary").join(GLOBAL_CONFIG_FILE)
}

/// Recursively merge `overlay` into `base`
///
/// Mappings merge key by key; any other overlay value replaces the base.
pub fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    let value: Value = serde_yaml::from_str(&content)?;
    match value {
        Value::Mapping(_) => Ok(value),
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        _ => Err(Error::Config(format!(
            "Config file {} must contain a mapping at the top level",
            path.display()
        ))),
    }
}
