//! Context compression for long conversations.

use std::sync::Arc;

use salon_domain::{CompressionSummary, Room};

use crate::infrastructure::ports::{GenerateRequest, LlmError, LlmPort};
use crate::prompts::{build_compression_prompt, Locale};
use crate::schemas::compression_schema;

pub struct CompressContext {
    llm: Arc<dyn LlmPort>,
}

impl CompressContext {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self { llm }
    }

    pub async fn execute(&self, room: &Room, locale: Locale) -> Result<CompressionSummary, LlmError> {
        let prompt = build_compression_prompt(room, locale);
        let request = GenerateRequest::structured(prompt, compression_schema());

        let value = self.llm.generate(request).await?;
        let summary: CompressionSummary = serde_json::from_value(value)
            .map_err(|e| LlmError::Parse(format!("compression response malformed: {e}")))?;

        tracing::debug!(
            room_id = %room.id,
            key_moments = summary.key_moments.len(),
            "context compressed"
        );
        Ok(summary)
    }
}
