use serde_json::{json, Value};
use std::time::Duration;

use super::{AiError, AiRequest, AiResponse, Completer};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions client for the OpenAI API (or any compatible endpoint).
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    default_model: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &super::redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str, default_model: &str, timeout_secs: u64) -> Self {
        let base_url = if base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url.trim().trim_end_matches('/').to_string()
        };
        OpenAiClient {
            api_key: api_key.trim().to_string(),
            base_url,
            default_model: default_model.to_string(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn body(&self, req: &AiRequest) -> (String, Value) {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        // A bare prompt goes out as a single user message.
        let mut messages = Vec::with_capacity(2);
        if !req.system.trim().is_empty() {
            messages.push(json!({"role": "system", "content": req.system}));
        }
        messages.push(json!({"role": "user", "content": req.prompt}));
        let body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": req.max_tokens.unwrap_or(1024),
            "temperature": req.temperature.unwrap_or(0.7)
        });
        (model, body)
    }
}

impl Completer for OpenAiClient {
    fn complete(&self, req: &AiRequest) -> Result<AiResponse, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError("OpenAI API key not configured".into()));
        }

        let (model, body) = self.body(req);
        log::debug!(
            "[ai] {} request: prompt {} chars, max_tokens {:?}",
            model,
            req.prompt.len(),
            req.max_tokens
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AiError(format!("HTTP client error: {}", e)))?;

        let resp = client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| AiError(format!("OpenAI request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(AiError(format!("OpenAI returned {}: {}", status, text)));
        }

        let json: Value = resp
            .json()
            .map_err(|e| AiError(format!("OpenAI JSON parse error: {}", e)))?;

        Ok(AiResponse {
            text: extract_content(&json),
            provider: "openai".into(),
            model,
        })
    }
}

/// Text of the first choice in a chat-completions response.
fn extract_content(json: &Value) -> String {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalises_base_url() {
        let c = OpenAiClient::new("sk-x", "https://proxy.local/v1/", "gpt-4o-mini", 30);
        assert_eq!(c.endpoint(), "https://proxy.local/v1/chat/completions");
        let c = OpenAiClient::new("sk-x", "", "gpt-4o-mini", 30);
        assert_eq!(c.endpoint(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_body_uses_request_model_and_budget() {
        let c = OpenAiClient::new("sk-x", "", "gpt-3.5-turbo", 30);
        let req = AiRequest::new("sys", "hej")
            .with_budget(1500, 0.3)
            .with_model("gpt-4o-mini");
        let (model, body) = c.body(&req);
        assert_eq!(model, "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hej");

        let (model, _) = c.body(&AiRequest::new("s", "p"));
        assert_eq!(model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_body_without_system_message() {
        let c = OpenAiClient::new("sk-x", "", "gpt-3.5-turbo", 30);
        let (_, body) = c.body(&AiRequest::new("", "Skriv et digt"));
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }

    #[test]
    fn test_extract_content() {
        let v = json!({"choices": [{"message": {"content": "# Titel"}}]});
        assert_eq!(extract_content(&v), "# Titel");
        assert_eq!(extract_content(&json!({})), "");
    }

    #[test]
    fn test_missing_key_fails_without_network() {
        let c = OpenAiClient::new("", "", "gpt-4o-mini", 30);
        let err = c.complete(&AiRequest::new("s", "p")).unwrap_err();
        assert!(err.0.contains("not configured"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let c = OpenAiClient::new("sk-supersecretvalue", "", "m", 30);
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("supersecretvalue"));
    }
}
