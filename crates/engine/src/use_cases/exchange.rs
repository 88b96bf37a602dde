//! Persona-to-persona exchanges after the user's turn.

use std::sync::Arc;

use salon_domain::{ExchangeResponse, Room};

use crate::infrastructure::ports::{GenerateRequest, LlmError, LlmPort};
use crate::prompts::{build_exchange_prompt, Locale};
use crate::schemas::exchange_schema;

pub struct GenerateExchange {
    llm: Arc<dyn LlmPort>,
}

impl GenerateExchange {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    /// Failure here is non-fatal for the turn; the caller decides whether to
    /// swallow the error.
    pub async fn execute(
        &self,
        room: &Room,
        expected_dynamic: &str,
        locale: Locale,
    ) -> Result<ExchangeResponse, LlmError> {
        let prompt = build_exchange_prompt(room, expected_dynamic, locale);
        let request = GenerateRequest::structured(prompt, exchange_schema());

        let value = self.llm.generate(request).await?;
        let exchange: ExchangeResponse = serde_json::from_value(value)
            .map_err(|e| LlmError::Parse(format!("exchange response malformed: {e}")))?;

        tracing::debug!(lines = exchange.exchanges.len(), "exchange generated");
        Ok(exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use salon_domain::Participant;

    struct StaticLlm(Result<serde_json::Value, LlmError>);

    #[async_trait]
    impl LlmPort for StaticLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<serde_json::Value, LlmError> {
            self.0.clone()
        }
    }

    fn sample_room() -> Room {
        Room::new(
            vec![
                Participant::new("Einstein", "physicist", "playful", "animated"),
                Participant::new("Bohr", "physicist", "stubborn", "defensive"),
            ],
            None,
            "charged debate",
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn exchange_lines_parse() {
        let exchange = GenerateExchange::new(Arc::new(StaticLlm(Ok(serde_json::json!({
            "exchanges": [
                { "speaker": "Einstein", "text": "God does not play dice.", "manner": "firm", "effect": "tension rises" },
                { "speaker": "Bohr", "text": "Stop telling God what to do.", "manner": "sharp", "effect": "laughter" }
            ],
            "roomShift": "electric",
            "naturalPause": true
        })))));

        let result = exchange
            .execute(&sample_room(), "a physics debate", Locale::En)
            .await
            .unwrap();

        assert_eq!(result.exchanges.len(), 2);
        assert_eq!(result.exchanges[1].speaker, "Bohr");
        assert!(result.natural_pause);
    }

    #[tokio::test]
    async fn backend_failure_surfaces_error() {
        let exchange = GenerateExchange::new(Arc::new(StaticLlm(Err(LlmError::Connection(
            "refused".into(),
        )))));

        let err = exchange
            .execute(&sample_room(), "a debate", Locale::En)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Connection(_)));
    }
}
