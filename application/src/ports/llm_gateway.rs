//! LLM gateway port — the client contract every provider adapter implements
//!: `generate(prompt, context) -> {text, raw}`.

use async_trait::async_trait;
use exception_platform_domain::DynValue;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("provider timed out")]
    Timeout,
    #[error("provider error: {0}")]
    ProviderError(String),
    #[error("output validation failed: {0}")]
    ValidationFailed(String),
}

/// The `raw` bag on a [`GenerateResult`]: provider, model, prompt length,
/// intent/context hints, and — on failure — an error kind and message. It
/// never echoes the API key or the full response body beyond a truncated
/// diagnostic.
#[derive(Debug, Clone, Default)]
pub struct GenerateRaw {
    pub provider: String,
    pub model: String,
    pub prompt_len: usize,
    pub schema_name: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub text: String,
    pub raw: GenerateRaw,
}

/// A single outbound call to an LLM provider. Implementations live in
/// `infrastructure::llm`; this trait is the seam the application layer
/// programs against.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        context: &DynValue,
        schema_name: &str,
    ) -> Result<GenerateResult, GatewayError>;

    /// The provider kind this gateway instance was constructed for, used
    /// for metrics and fallback-chain bookkeeping.
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}
