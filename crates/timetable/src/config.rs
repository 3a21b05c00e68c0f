/// Runtime configuration for the timetable client
use crate::api::HttpTimetableConfig;
use crate::schedule::{LayoutConfig, SlotRange, Weekday};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_CONFIG_PATH: &str = "TIMETABLE_CONFIG";
pub const ENV_BASE_URL: &str = "TIMETABLE_BASE_URL";
pub const ENV_DEBOUNCE_MS: &str = "TIMETABLE_DEBOUNCE_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Client settings. Every key is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimetableConfig {
    /// Base URL of the REST API, e.g. `http://localhost:5000/api`
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Page size of the lecturer directory and of per-row lookups
    pub lecturer_page_size: u32,
    /// Quiet period before a lecturer lookup is sent
    pub debounce_ms: u64,
    pub screen_slots: SlotRange,
    pub print_slots: SlotRange,
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            lecturer_page_size: 5,
            debounce_ms: 350,
            screen_slots: SlotRange::default(),
            print_slots: SlotRange::default(),
        }
    }
}

impl TimetableConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Loads the file named by `TIMETABLE_CONFIG` (or defaults), then applies
    /// environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(ENV_CONFIG_PATH) {
            Some(path) => Self::load_from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies `TIMETABLE_BASE_URL` and `TIMETABLE_DEBOUNCE_MS` as returned by `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_DEBOUNCE_MS) {
            self.debounce_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_DEBOUNCE_MS.to_string(),
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    pub fn http(&self) -> HttpTimetableConfig {
        HttpTimetableConfig {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..HttpTimetableConfig::default()
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Sunday to Thursday columns with the configured slot ranges.
    pub fn layout(&self) -> LayoutConfig {
        LayoutConfig::new(Weekday::ALL.to_vec(), &self.screen_slots, &self.print_slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = TimetableConfig::from_json(
            r#"{
                "base_url": "https://timetable.example.edu/api",
                "print_slots": {"start": "08:00", "end": "14:00", "interval_minutes": 30}
            }"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://timetable.example.edu/api");
        assert_eq!(config.lecturer_page_size, 5);
        assert_eq!(config.debounce(), Duration::from_millis(350));
        assert_eq!(config.screen_slots, SlotRange::default());

        let layout = config.layout();
        assert_eq!(layout.screen_slots.len(), 13);
        assert_eq!(layout.print_slots.len(), 13);
        assert_eq!(layout.print_slots[1].label(), "08:30");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BASE_URL, "http://10.0.0.5:5000/api"),
            (ENV_DEBOUNCE_MS, "200"),
        ]);
        let mut config = TimetableConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:5000/api");
        assert_eq!(config.debounce_ms, 200);
        assert_eq!(config.http().base_url, "http://10.0.0.5:5000/api");
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let mut config = TimetableConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_DEBOUNCE_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(config.debounce_ms, 350);
    }

    #[test]
    fn test_load_from_file() {
        let path =
            std::env::temp_dir().join(format!("timetable-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"lecturer_page_size": 10}"#).unwrap();
        let config = TimetableConfig::load_from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.lecturer_page_size, 10);

        assert!(matches!(
            TimetableConfig::load_from_file(&path),
            Err(ConfigError::Io { .. })
        ));
    }
}
