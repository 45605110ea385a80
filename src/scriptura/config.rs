use crate::catalog::{self, DEFAULT_TRANSLATION};
use crate::error::{Result, ScripturaError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_API_BASE_URL: &str = "https://bible-api.com";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Keys accepted by [`AppConfig::get`] and [`AppConfig::set`].
pub const CONFIG_KEYS: [&str; 5] = [
    "api-url",
    "translation",
    "timeout",
    "backend-url",
    "backend-key",
];

/// Connection details for the hosted user store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

/// Configuration for scriptura, stored in `<data dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the verse-text provider
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Translation used when neither the command line nor preferences pick one
    #[serde(default = "default_translation")]
    pub default_translation: String,

    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_translation() -> String {
    DEFAULT_TRANSLATION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            default_translation: default_translation(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            backend: None,
        }
    }
}

impl AppConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(ScripturaError::Io)?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(ScripturaError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(ScripturaError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(ScripturaError::Serialization)?;
        fs::write(config_path, content).map_err(ScripturaError::Io)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "api-url" => Some(self.api_base_url.clone()),
            "translation" => Some(self.default_translation.clone()),
            "timeout" => Some(self.request_timeout_secs.to_string()),
            "backend-url" => Some(
                self.backend
                    .as_ref()
                    .map(|b| b.url.clone())
                    .unwrap_or_default(),
            ),
            "backend-key" => Some(
                self.backend
                    .as_ref()
                    .map(|b| b.api_key.clone())
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "api-url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(format!("api-url must be an http(s) URL: {}", value));
                }
                self.api_base_url = value.trim_end_matches('/').to_string();
            }
            "translation" => {
                let id = value.to_lowercase();
                if catalog::translation_info(&id).is_none() {
                    return Err(format!("Unknown translation: {}", value));
                }
                self.default_translation = id;
            }
            "timeout" => {
                self.request_timeout_secs = value
                    .parse()
                    .map_err(|_| format!("timeout must be a number of seconds: {}", value))?;
            }
            "backend-url" => {
                if value.is_empty() {
                    self.backend = None;
                } else {
                    self.backend.get_or_insert_with(BackendConfig::default).url =
                        value.trim_end_matches('/').to_string();
                }
            }
            "backend-key" => {
                self.backend.get_or_insert_with(BackendConfig::default).api_key =
                    value.to_string();
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }
}
