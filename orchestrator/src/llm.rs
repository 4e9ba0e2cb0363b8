use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;

use common::config::AppConfig;
use common::error::AppError;

/// OpenAI-compatible chat-completions client. Endpoint selection is sticky:
/// if the Nvidia LLM fields are fully populated they win at construction,
/// otherwise the OpenAI fields (which carry usable defaults) are used for
/// the process lifetime — no per-call re-selection.
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmClient {
    pub fn from_config(config: &AppConfig) -> Self {
        let (base_url, api_key, model) = match (
            &config.nvidia_llm_base_url,
            &config.nvidia_llm_api_key,
            &config.nvidia_llm_model,
        ) {
            (Some(base_url), Some(api_key), Some(model)) => {
                (base_url.clone(), api_key.clone(), model.clone())
            }
            _ => (
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                config.openai_model.clone(),
            ),
        };

        let openai_config = OpenAIConfig::new().with_api_base(base_url).with_api_key(api_key);

        Self {
            client: Client::with_config(openai_config),
            model,
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }

    /// Runs one chat-completion call with the configured timeout. Any
    /// failure (transport, timeout, empty choice) surfaces as
    /// `AppError::ResponseGeneration`, which C7 treats as a degraded-mode
    /// generation failure rather than propagating.
    pub async fn chat(&self, system_prompt: &str, user_message: &str) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .messages([
                ChatCompletionRequestSystemMessage::from(system_prompt).into(),
                ChatCompletionRequestUserMessage::from(user_message).into(),
            ])
            .build()
            .map_err(|err| AppError::ResponseGeneration(err.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AppError::ResponseGeneration("llm call timed out".into()))?
            .map_err(|err| AppError::ResponseGeneration(err.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::ResponseGeneration("llm response carried no content".into()))
    }
}
