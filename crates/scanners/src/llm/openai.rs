use crate::llm::{prompts, LlmClient, LlmError, PromptKind, RawModelOutput, TokenUsage};
use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        ChatCompletionResponseFormat, ChatCompletionResponseFormatType,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

/// OpenAI-backed collaborator. One request per call; retry and timeout
/// policy live in the pipeline, not here.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Reads `OPENAI_API_KEY` from the environment.
    pub fn new(model: Option<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;
        Ok(Self::with_api_key(
            api_key,
            model.unwrap_or_else(|| "gpt-4o".to_string()),
        ))
    }

    pub fn with_api_key(api_key: String, model: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model,
            // Low temperature keeps pass output close to reproducible.
            temperature: 0.2,
            max_tokens: 4000,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn classify_error(message: String) -> LlmError {
        let lower = message.to_lowercase();
        if lower.contains("rate") && lower.contains("limit") {
            LlmError::RateLimited
        } else if lower.contains("connection") || lower.contains("network") || lower.contains("dns")
        {
            LlmError::Network(message)
        } else {
            LlmError::Api(message)
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn run_pass(
        &self,
        kind: PromptKind,
        content: &str,
        context: &str,
    ) -> Result<RawModelOutput, LlmError> {
        debug!(model = %self.model, kind = kind.as_str(), "sending pass request");

        let system = ChatCompletionRequestSystemMessage {
            content: prompts::system_prompt(kind).to_string(),
            ..Default::default()
        };
        let user = ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompts::user_prompt(
                kind, content, context,
            )),
            ..Default::default()
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens as u16)
            .response_format(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            })
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| Self::classify_error(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::InvalidResponse("no content in response".to_string()))?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        debug!(total_tokens = usage.total_tokens, "pass response received");

        Ok(RawModelOutput {
            content,
            model: response.model,
            usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
