use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ai::openai::DEFAULT_BASE_URL;
use crate::throttle::Throttle;
use crate::translate::ErrorRowPolicy;

pub const CONFIG_FILE: &str = "blogsmith.toml";

/// Settings read once at launch from `blogsmith.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub throttle: ThrottleConfig,
    pub translate: TranslateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub basic_model: String,
    pub enhanced_model: String,
    pub edit_model: String,
    pub translate_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub delay_ms: u64,
    pub rate_limit_delay_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Pick up rows marked `[ERROR]` again on the next run.
    pub retry_error_rows: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: "data/blogsmith.db".into(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
            basic_model: "gpt-3.5-turbo".into(),
            enhanced_model: "gpt-4.1-mini".into(),
            edit_model: "gpt-4o-mini".into(),
            translate_model: "gpt-4o-mini".into(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        ThrottleConfig {
            delay_ms: 500,
            rate_limit_delay_ms: 5000,
        }
    }
}

impl AppConfig {
    /// Parse a config document. Missing keys take their defaults.
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Read `path`, falling back to defaults when it is absent or invalid.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(_) => {
                log::warn!("[boot] {} not found, using default configuration", path.display());
                return Self::default();
            }
        };
        match Self::parse(&text) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("[boot] Invalid {}: {}. Using default configuration", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn throttle(&self) -> Throttle {
        Throttle::new(self.throttle.delay_ms, self.throttle.rate_limit_delay_ms)
    }

    pub fn error_row_policy(&self) -> ErrorRowPolicy {
        ErrorRowPolicy::from_retry_flag(self.translate.retry_error_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.database.path, "data/blogsmith.db");
        assert_eq!(config.ai.timeout_secs, 120);
        assert_eq!(config.ai.enhanced_model, "gpt-4.1-mini");
        assert_eq!(config.throttle.delay_ms, 500);
        assert_eq!(config.error_row_policy(), ErrorRowPolicy::Skip);
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::parse(
            "[ai]\nbasic_model = \"gpt-4o\"\n\n[translate]\nretry_error_rows = true\n",
        )
        .unwrap();
        assert_eq!(config.ai.basic_model, "gpt-4o");
        assert_eq!(config.ai.edit_model, "gpt-4o-mini");
        assert_eq!(config.error_row_policy(), ErrorRowPolicy::Retry);
    }

    #[test]
    fn test_invalid_document_is_an_error() {
        assert!(AppConfig::parse("[ai\nbase_url = 3").is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = AppConfig::load(Path::new("/nonexistent/blogsmith.toml"));
        assert_eq!(config.throttle.rate_limit_delay_ms, 5000);
    }
}
