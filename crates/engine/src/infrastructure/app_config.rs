//! Engine tunables, loadable from the environment.

use crate::infrastructure::resilient_llm::RetryConfig;

/// Runtime configuration for the conversation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many recent messages the orchestrator and reply prompts see.
    pub recent_message_window: usize,
    /// How many recent messages the background assessments see.
    pub assessment_message_window: usize,
    /// Hard cap on materialized exchange lines per turn.
    pub max_exchange_messages: usize,
    /// Stored-message count past which context compression runs.
    pub compression_threshold: usize,
    /// Ollama request timeout.
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recent_message_window: 10,
            assessment_message_window: 5,
            max_exchange_messages: 3,
            compression_threshold: 30,
            request_timeout_secs: 480,
            retry: RetryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load config from environment variables, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            recent_message_window: env_or("SALON_RECENT_WINDOW", defaults.recent_message_window),
            assessment_message_window: env_or(
                "SALON_ASSESSMENT_WINDOW",
                defaults.assessment_message_window,
            ),
            max_exchange_messages: env_or("SALON_MAX_EXCHANGE", defaults.max_exchange_messages),
            compression_threshold: env_or(
                "SALON_COMPRESSION_THRESHOLD",
                defaults.compression_threshold,
            ),
            request_timeout_secs: env_or("SALON_REQUEST_TIMEOUT", defaults.request_timeout_secs),
            retry: RetryConfig {
                max_attempts: env_or("SALON_RETRY_ATTEMPTS", defaults.retry.max_attempts),
                initial_delay_ms: env_or("SALON_RETRY_DELAY_MS", defaults.retry.initial_delay_ms),
                max_delay_ms: env_or("SALON_RETRY_MAX_DELAY_MS", defaults.retry.max_delay_ms),
            },
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.recent_message_window, 10);
        assert_eq!(cfg.max_exchange_messages, 3);
        assert_eq!(cfg.compression_threshold, 30);
        assert_eq!(cfg.request_timeout_secs, 480);
        assert_eq!(cfg.retry.max_attempts, 3);
    }
}
