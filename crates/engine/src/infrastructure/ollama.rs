//! Ollama client for the `/api/generate` endpoint with structured output.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infrastructure::ports::{GenerateRequest, LlmError, LlmPort};

/// Default Ollama base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model.
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen3:latest";

/// Generation can take minutes on local hardware with large prompts.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 480;

/// Client for Ollama's native generate API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_timeout(base_url, model, DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Create client with an explicit request timeout.
    pub fn with_timeout(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs,
        }
    }

    /// Create client from `OLLAMA_URL`/`OLLAMA_BASE_URL` and `OLLAMA_MODEL`,
    /// falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_env_with_timeout(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Like [`from_env`](Self::from_env), with the request timeout supplied by
    /// the caller instead of the default.
    pub fn from_env_with_timeout(timeout_secs: u64) -> Self {
        let base_url = std::env::var("OLLAMA_URL")
            .or_else(|_| std::env::var("OLLAMA_BASE_URL"))
            .unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string());
        Self::with_timeout(&base_url, &model, timeout_secs)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL, DEFAULT_OLLAMA_MODEL)
    }
}

#[async_trait]
impl LlmPort for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> Result<serde_json::Value, LlmError> {
        let structured = request.format.is_some();
        let api_request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: request.prompt,
            format: request.format,
            stream: false,
            options: SamplingOptions::default(),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&api_request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotFound(format!(
                "model '{}' is not available on the backend",
                self.model
            )));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Backend(format!("HTTP {status}: {body}")));
        }

        let api_response: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("unreadable response body: {e}")))?;

        if structured {
            serde_json::from_str(&api_response.response)
                .map_err(|e| LlmError::Parse(format!("structured output is not valid JSON: {e}")))
        } else {
            Ok(serde_json::Value::String(api_response.response))
        }
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(e.to_string())
    } else if e.is_connect() {
        LlmError::Connection(e.to_string())
    } else {
        LlmError::Backend(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.9,
            top_k: 40,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", "m");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn configured_timeout_reaches_the_client() {
        let client = OllamaClient::with_timeout("http://localhost:11434", "m", 25);
        assert_eq!(client.timeout_secs(), 25);

        let from_env = OllamaClient::from_env_with_timeout(25);
        assert_eq!(from_env.timeout_secs(), 25);

        assert_eq!(
            OllamaClient::new("http://localhost:11434", "m").timeout_secs(),
            DEFAULT_REQUEST_TIMEOUT_SECS
        );
    }

    #[test]
    fn sampling_defaults_match_configuration() {
        let opts = SamplingOptions::default();
        assert_eq!(opts.temperature, 0.8);
        assert_eq!(opts.top_p, 0.9);
        assert_eq!(opts.top_k, 40);
    }

    #[test]
    fn request_serializes_without_format_when_free_text() {
        let req = OllamaGenerateRequest {
            model: "m".into(),
            prompt: "hello".into(),
            format: None,
            stream: false,
            options: SamplingOptions::default(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("format").is_none());
        assert_eq!(json["stream"], serde_json::json!(false));
    }
}
