use std::path::PathBuf;
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineSettings;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub default_format: Option<String>,
    pub default_style: Option<String>,
    pub timedtext_endpoint: Option<String>,
    pub fallback_languages: Option<Vec<String>>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub state_wait_ms: Option<u64>,
    pub player_wait_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub fail_fast_without_captions: Option<bool>,
}

impl Config {
    /// Load config from ~/.config/ytbrief/config.toml if it exists
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Pipeline tuning, with built-in defaults for anything unset
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let defaults = PipelineSettings::default();
        let ms = |v: Option<u64>, d: Duration| v.map(Duration::from_millis).unwrap_or(d);
        PipelineSettings {
            poll_interval: ms(self.poll_interval_ms, defaults.poll_interval),
            state_wait: ms(self.state_wait_ms, defaults.state_wait),
            player_wait: ms(self.player_wait_ms, defaults.player_wait),
            settle_delay: ms(self.settle_delay_ms, defaults.settle_delay),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff: ms(self.retry_backoff_ms, defaults.retry_backoff),
            fallback_languages: self
                .fallback_languages
                .clone()
                .filter(|l| !l.is_empty())
                .unwrap_or(defaults.fallback_languages),
            fail_fast_without_captions: self
                .fail_fast_without_captions
                .unwrap_or(defaults.fail_fast_without_captions),
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytbrief")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
api_url = "https://summaries.example.com/api"
default_format = "json"
default_style = "bullets"
fallback_languages = ["fr", "en"]
max_retries = 4
retry_backoff_ms = 250
fail_fast_without_captions = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_url(), "https://summaries.example.com/api");
        assert_eq!(config.default_format.as_deref(), Some("json"));

        let settings = config.pipeline_settings();
        assert_eq!(settings.fallback_languages, vec!["fr", "en"]);
        assert_eq!(settings.max_retries, 4);
        assert_eq!(settings.retry_backoff, Duration::from_millis(250));
        assert!(!settings.fail_fast_without_captions);
        assert_eq!(settings.state_wait, Duration::from_millis(3000));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api_url(), DEFAULT_API_URL);

        let settings = config.pipeline_settings();
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.retry_backoff, Duration::from_millis(1000));
        assert_eq!(settings.poll_interval, Duration::from_millis(100));
        assert_eq!(settings.player_wait, Duration::from_millis(5000));
        assert_eq!(settings.settle_delay, Duration::from_millis(1500));
        assert_eq!(settings.fallback_languages.len(), 15);
        assert!(settings.fail_fast_without_captions);
    }

    #[test]
    fn test_empty_language_list_falls_back() {
        let config: Config = toml::from_str("fallback_languages = []").unwrap();
        assert_eq!(config.pipeline_settings().fallback_languages[0], "en");
    }
}
