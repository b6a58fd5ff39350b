use directories::ProjectDirs;
use layergraph::{NodeRegistry, Value};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GraphSettings {
    pub live_update: bool,
    pub time: f64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            live_update: false,
            time: 0.0,
        }
    }
}

/// Settings read from `settings.toml`.
///
/// `[defaults.<NodeType>]` tables hold site defaults for node parameters,
/// e.g. `[defaults.Root] upAxis = "Z"`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub graph: GraphSettings,
    pub defaults: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl Settings {
    /// Registers every configured default with `registry`.
    pub fn apply_defaults(&self, registry: &mut NodeRegistry) {
        for (type_name, params) in &self.defaults {
            if !registry.is_registered(type_name) {
                warn!("Ignoring defaults for unknown node type '{}'", type_name);
                continue;
            }
            for (param, value) in params {
                match to_value(value) {
                    Some(value) => registry.set_default(type_name, param, value),
                    None => warn!("Ignoring table default {}.{}", type_name, param),
                }
            }
        }
    }
}

fn to_value(value: &toml::Value) -> Option<Value> {
    Some(match value {
        toml::Value::Boolean(b) => Value::from(*b),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Value::from(*f),
        toml::Value::String(s) => Value::from(s.as_str()),
        toml::Value::Datetime(d) => Value::from(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(to_value).collect::<Option<_>>()?),
        toml::Value::Table(_) => return None,
    })
}

fn get_config_path() -> Option<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("me", "layergraph", "layergraph") {
        let config_dir = proj_dirs.config_dir();
        if !config_dir.exists() {
            if let Err(e) = fs::create_dir_all(config_dir) {
                error!("Failed to create config directory: {}", e);
                return None;
            }
        }
        return Some(config_dir.join("settings.toml"));
    }
    None
}

pub fn save_settings(settings: &Settings) {
    if let Some(path) = get_config_path() {
        match toml::to_string_pretty(settings) {
            Ok(toml_str) => {
                if let Err(e) = fs::write(&path, toml_str) {
                    error!("Failed to write config file: {}", e);
                } else {
                    info!("Settings saved to {}", path.display());
                }
            }
            Err(e) => {
                error!("Failed to serialize settings: {}", e);
            }
        }
    }
}

/// Loads `explicit` when given, otherwise the per-user settings file.
///
/// Anything missing or unreadable falls back to defaults.
pub fn load_settings(explicit: Option<&Path>) -> Settings {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => get_config_path(),
    };
    if let Some(path) = path {
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(toml_str) => match parse_settings(&toml_str) {
                    Ok(settings) => return settings,
                    Err(e) => {
                        warn!("Failed to parse config file, using defaults: {}", e);
                    }
                },
                Err(e) => {
                    warn!("Failed to read config file, using defaults: {}", e);
                }
            }
        } else if explicit.is_some() {
            warn!("Config file {} not found, using defaults", path.display());
        }
    }
    Settings::default()
}

pub fn parse_settings(toml_str: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(toml_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_graph_and_defaults() {
        let settings = parse_settings(
            r#"
            [graph]
            live_update = true
            time = 24.0

            [defaults.Root]
            upAxis = "Z"

            [defaults.Reference]
            layerScale = 2
            "#,
        )
        .unwrap();
        assert!(settings.graph.live_update);
        assert_eq!(settings.graph.time, 24.0);

        let mut registry = NodeRegistry::with_builtins();
        settings.apply_defaults(&mut registry);
        assert_eq!(registry.default_for("Root", "upAxis"), Some(&Value::from("Z")));
        assert_eq!(registry.default_for("Reference", "layerScale"), Some(&Value::from(2_i64)));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let settings = parse_settings("[defaults.Teapot]\nspout = 1").unwrap();
        let mut registry = NodeRegistry::with_builtins();
        settings.apply_defaults(&mut registry);
        assert_eq!(registry.default_for("Teapot", "spout"), None);
    }

    #[test]
    fn test_missing_explicit_file_falls_back() {
        let settings = load_settings(Some(Path::new("/nonexistent/layergraph.toml")));
        assert_eq!(settings, Settings::default());
    }
}
