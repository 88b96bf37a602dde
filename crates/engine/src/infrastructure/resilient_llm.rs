//! Retry wrapper around any LLM backend.
//!
//! Transient failures (connection, timeout, parse, backend) are retried with
//! exponential backoff. A missing model is a deployment problem and is
//! surfaced immediately.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::infrastructure::ports::{GenerateRequest, LlmError, LlmPort};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry.
    pub initial_delay_ms: u64,
    /// Cap on the exponential growth.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Wrapper that adds retry logic to any LLM client.
pub struct ResilientLlmClient {
    inner: Arc<dyn LlmPort>,
    config: RetryConfig,
}

impl ResilientLlmClient {
    pub fn new(inner: Arc<dyn LlmPort>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Delay before retry number `retry` (1-based): `initial * 2^(retry-1)`,
    /// capped at `max_delay_ms`.
    fn delay_for(&self, retry: u32) -> u64 {
        self.config
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(retry.saturating_sub(1)))
            .min(self.config.max_delay_ms)
    }
}

#[async_trait]
impl LlmPort for ResilientLlmClient {
    async fn generate(&self, request: GenerateRequest) -> Result<serde_json::Value, LlmError> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts.max(1) {
            match self.inner.generate(request.clone()).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "model request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    tracing::error!(error = %e, "model request failed with non-retryable error");
                    return Err(e);
                }
                Err(e) => {
                    if attempt < self.config.max_attempts {
                        let delay = self.delay_for(attempt);
                        tracing::warn!(
                            attempt,
                            max_attempts = self.config.max_attempts,
                            delay_ms = delay,
                            error = %e,
                            "model request failed, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        let error =
            last_error.unwrap_or_else(|| LlmError::Backend("no attempts were made".to_string()));
        tracing::error!(
            attempts = self.config.max_attempts,
            error = %error,
            "model request failed after all retry attempts"
        );
        Err(error)
    }
}
