//! The `dummy` provider: a deterministic, zero-dependency
//! stand-in used whenever no real provider is configured or reachable. It
//! never calls out to the network and never fails.

use async_trait::async_trait;
use exception_platform_application::ports::{GatewayError, GenerateRaw, GenerateResult, LlmGateway};
use exception_platform_domain::DynValue;

pub struct DummyProvider {
    model: String,
}

impl DummyProvider {
    pub fn new() -> Self {
        Self { model: "dummy-model".to_string() }
    }
}

impl Default for DummyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmGateway for DummyProvider {
    async fn generate(&self, prompt: &str, _context: &DynValue, schema_name: &str) -> Result<GenerateResult, GatewayError> {
        let text = format!(
            "{{\"confidence\":0.5,\"summary\":\"dummy provider response for schema {schema_name}\",\"prompt_len\":{}}}",
            prompt.len()
        );
        Ok(GenerateResult {
            text,
            raw: GenerateRaw {
                provider: self.provider_name().to_string(),
                model: self.model.clone(),
                prompt_len: prompt.len(),
                schema_name: Some(schema_name.to_string()),
                error_kind: None,
                error_message: None,
            },
        })
    }

    fn provider_name(&self) -> &str {
        "dummy"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_fails_and_always_reports_its_own_name() {
        let provider = DummyProvider::new();
        let result = provider.generate("hello", &DynValue::object(), "triage").await.unwrap();
        assert_eq!(result.raw.provider, "dummy");
        assert!(result.text.contains("confidence"));
    }
}
