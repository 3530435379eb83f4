pub mod openai;
pub mod prompts;

use serde::{Deserialize, Serialize};

pub use openai::OpenAiClient;

// ── Types ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Model override; the client's default model is used when unset.
    #[serde(default)]
    pub model: Option<String>,
}

impl AiRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        AiRequest {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            model: None,
        }
    }

    pub fn with_budget(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = Some(max_tokens);
        self.temperature = Some(temperature);
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        if !model.trim().is_empty() {
            self.model = Some(model.trim().to_string());
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiError(pub String);

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for AiError {}

impl AiError {
    /// Quota and rate-limit failures get a longer pause in batch loops.
    pub fn is_rate_limit(&self) -> bool {
        let msg = self.0.to_lowercase();
        msg.contains("rate_limit") || msg.contains("rate limit") || msg.contains("quota")
    }
}

// ── Completer ─────────────────────────────────────────

/// A language model that turns a system instruction and a prompt into text.
pub trait Completer: Send + Sync {
    fn complete(&self, req: &AiRequest) -> Result<AiResponse, AiError>;
}

impl<C: Completer + ?Sized> Completer for std::sync::Arc<C> {
    fn complete(&self, req: &AiRequest) -> Result<AiResponse, AiError> {
        (**self).complete(req)
    }
}

// ── API keys ──────────────────────────────────────────

/// Prefix every OpenAI secret key starts with.
pub const API_KEY_PREFIX: &str = "sk-";

/// Pick the key for a call: the profile's own key wins over the global one.
pub fn resolve_api_key(profile_key: Option<&str>, global_key: Option<&str>) -> Result<String, String> {
    let pick = |k: Option<&str>| k.map(str::trim).filter(|k| !k.is_empty()).map(String::from);
    pick(profile_key)
        .or_else(|| pick(global_key))
        .ok_or_else(|| "OpenAI API key not configured".to_string())
}

/// Check a key before it is stored as the global key.
pub fn validate_api_key(key: &str) -> Result<String, String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API key is required".into());
    }
    if !key.starts_with(API_KEY_PREFIX) {
        return Err("Invalid API key format".into());
    }
    Ok(key.to_string())
}

/// Log-safe form of a secret: its first ten characters.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(10).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_key_wins() {
        assert_eq!(
            resolve_api_key(Some("sk-profile"), Some("sk-global")).unwrap(),
            "sk-profile"
        );
        assert_eq!(
            resolve_api_key(Some("  "), Some("sk-global")).unwrap(),
            "sk-global"
        );
        assert!(resolve_api_key(None, None).is_err());
    }

    #[test]
    fn test_validate_api_key() {
        assert_eq!(validate_api_key(" sk-abc ").unwrap(), "sk-abc");
        assert!(validate_api_key("abc").is_err());
        assert!(validate_api_key("").is_err());
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(AiError("Error code: 429 rate_limit_exceeded".into()).is_rate_limit());
        assert!(AiError("You exceeded your current quota".into()).is_rate_limit());
        assert!(!AiError("OpenAI returned 500".into()).is_rate_limit());
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("sk-1234567890abcdef"), "sk-1234567...");
    }
}
