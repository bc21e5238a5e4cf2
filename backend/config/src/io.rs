//! Config file location and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the dripforge config directory.
/// Priority: `DRIPFORGE_CONFIG_DIR` env > `~/.dripforge/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DRIPFORGE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".dripforge"),
        None => PathBuf::from(".dripforge"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped value, before env substitution.
///
/// A missing or empty file yields an empty mapping, so every setting takes
/// its default.
pub async fn load_raw(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value = parse_yaml(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}

pub(crate) fn parse_yaml(raw: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(raw)?;
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_empty_mapping() {
        assert_eq!(parse_yaml("").unwrap(), Value::Object(Default::default()));
    }

    #[test]
    fn config_file_lives_in_dir() {
        let path = config_file_path(Path::new("/tmp/df"));
        assert_eq!(path, PathBuf::from("/tmp/df/config.yaml"));
    }

    #[tokio::test]
    async fn missing_file_loads_as_defaults() {
        let value = load_raw(Path::new("/definitely/not/here/config.yaml")).await.unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }
}
