use serde::{Deserialize, Serialize};
use std::path::Path;
use tabula_tables::{CacheStrategy, HeaderStrategy};

pub const DEFAULT_CONFIG_NAME: &str = "tabula.config.json";

/// Tabula configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// How table maps are memoized
    #[serde(default)]
    pub map_cache: CacheStrategy,

    /// Strategy used by `toggle_header` commands that do not name one
    #[serde(default)]
    pub header_strategy: HeaderStrategy,

    /// Log filter used when `RUST_LOG` is unset (e.g. "warn", "tabula_tables=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map_cache: CacheStrategy::default(),
            header_strategy: HeaderStrategy::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "mapCache": { "strategy": "ring", "capacity": 16 },
            "headerStrategy": "legacy",
            "logLevel": "debug"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.map_cache, CacheStrategy::Ring { capacity: 16 });
        assert_eq!(config.header_strategy, HeaderStrategy::Legacy);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{ "mapCache": { "strategy": "weak" } }"#).unwrap();
        assert_eq!(config.map_cache, CacheStrategy::Weak);
        assert_eq!(config.header_strategy, HeaderStrategy::Current);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_load_without_file() {
        let dir = std::env::temp_dir().join("tabula-config-missing");
        let config = Config::load(&dir).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_level, "warn");
    }
}
