//! The `openai` provider: an HTTP client against OpenAI's
//! chat completions API. Mirrors [`super::openrouter::OpenRouterProvider`]
//! closely since both speak the same chat-completion shape; kept as a
//! separate adapter because the two diverge on base URL, auth header
//! placement, and which environment variable overrides the shared key.

use async_trait::async_trait;
use exception_platform_application::ports::{GatewayError, GenerateRaw, GenerateResult, LlmGateway};
use exception_platform_domain::{mask_secret, DynValue};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl LlmGateway for OpenAiProvider {
    async fn generate(&self, prompt: &str, context: &DynValue, schema_name: &str) -> Result<GenerateResult, GatewayError> {
        let full_prompt = format!("{prompt}\n\ncontext: {}", serde_json::Value::from(context.clone()));

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &full_prompt }],
        };

        let mut raw = GenerateRaw {
            provider: self.provider_name().to_string(),
            model: self.model.clone(),
            prompt_len: prompt.len(),
            schema_name: Some(schema_name.to_string()),
            error_kind: None,
            error_message: None,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                raw.error_kind = Some("network".to_string());
                raw.error_message = Some(format!("request to openai failed: {err} (key={})", mask_secret(&self.api_key)));
                GatewayError::ProviderError(raw.error_message.clone().unwrap())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::ProviderError(format!(
                "openai returned {status}: {}",
                body.chars().take(300).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::ProviderError(format!("failed to parse openai response: {err}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GatewayError::ProviderError("openai response had no choices".to_string()))?;

        Ok(GenerateResult { text, raw })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_never_echoed_unmasked_in_diagnostics() {
        let provider = OpenAiProvider::new("sk_live_supersecretkey", None);
        assert_eq!(mask_secret(&provider.api_key), "sk_live_***");
    }
}
