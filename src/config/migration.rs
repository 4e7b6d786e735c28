//! Migration of older configuration files
//!
//! Version 1 files kept the link and storage settings at the top level.
//! They are moved into their sections before deserializing.

use log::info;
use serde_json::{Map, Value};

use super::defaults::CONFIG_VERSION;

const LINK_KEYS: [&str; 4] = [
    "baud_rate",
    "bonjour",
    "handshake_timeout_ms",
    "read_timeout_ms",
];
const STORAGE_KEYS: [&str; 2] = ["data_dir", "enabled"];

/// Bring a raw config document up to the current version
pub fn migrate(raw: Value) -> Value {
    let Value::Object(mut root) = raw else {
        return raw;
    };

    let version = root.get("version").and_then(Value::as_u64).unwrap_or(1);
    if version >= u64::from(CONFIG_VERSION) {
        return Value::Object(root);
    }

    info!("Migrating configuration from version {version} to {CONFIG_VERSION}");
    move_into_section(&mut root, "link", &LINK_KEYS);
    move_into_section(&mut root, "storage", &STORAGE_KEYS);
    root.insert("version".to_string(), Value::from(CONFIG_VERSION));
    Value::Object(root)
}

fn move_into_section(root: &mut Map<String, Value>, section: &str, keys: &[&str]) {
    let mut moved = Map::new();
    for key in keys {
        if let Some(value) = root.remove(*key) {
            moved.insert(key.to_string(), value);
        }
    }
    if moved.is_empty() {
        return;
    }
    match root
        .entry(section)
        .or_insert_with(|| Value::Object(Map::new()))
    {
        // Values already in the section win over flat ones
        Value::Object(existing) => {
            for (key, value) in moved {
                existing.entry(key).or_insert(value);
            }
        }
        other => *other = Value::Object(moved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    #[test]
    fn test_flat_v1_settings_move_into_sections() {
        let raw = json!({
            "baud_rate": 9600,
            "bonjour": "ROCKET",
            "data_dir": "/var/telemetry",
            "layout": "sigmundr"
        });
        let config: AppConfig = serde_json::from_value(migrate(raw)).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.link.baud_rate, 9600);
        assert_eq!(config.link.bonjour, "ROCKET");
        assert_eq!(config.storage.data_dir.to_str(), Some("/var/telemetry"));
    }

    #[test]
    fn test_current_version_is_untouched() {
        let raw = json!({"version": CONFIG_VERSION, "baud_rate": 9600});
        assert_eq!(migrate(raw.clone()), raw);
    }

    #[test]
    fn test_section_values_win() {
        let raw = json!({"version": 1, "baud_rate": 9600, "link": {"baud_rate": 230400}});
        let migrated = migrate(raw);
        assert_eq!(migrated["link"]["baud_rate"], 230400);
        assert!(migrated.get("baud_rate").is_none());
    }
}
