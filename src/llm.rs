//! Model client adapter over an OpenAI-compatible chat-completion endpoint.
//!
//! The adapter keeps a bounded in-memory window of the conversation (see
//! [`crate::window`]) and forwards it on every request. Failures always
//! surface as `Err(LlmError)`; error text is never folded into the reply.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::error::LlmError;
use crate::history::{ChatMessage, Role};
use crate::settings::{ModelSettings, Settings};
use crate::window::{trim_to_window, HISTORY_WINDOW};

/// Seam between the adapter and the completion endpoint. The production
/// implementation is [`OpenAiBackend`]; tests script this trait instead.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    params: ModelSettings,
}

impl OpenAiBackend {
    pub fn new(settings: &Settings) -> Self {
        // Local inference servers ignore the key but the client requires one.
        let config = OpenAIConfig::new()
            .with_api_base(settings.api_url.clone())
            .with_api_key("local");
        Self {
            client: Client::with_config(config),
            params: settings.model_settings.clone(),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let mut request_messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(messages.len());
        for msg in messages {
            let request_message = match msg.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.as_str())
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content.as_str())
                    .build()?
                    .into(),
            };
            request_messages.push(request_message);
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.params.model.clone())
            .messages(request_messages)
            .temperature(self.params.temperature)
            .top_p(self.params.top_p)
            .frequency_penalty(self.params.frequency_penalty)
            .presence_penalty(self.params.presence_penalty)
            .max_tokens(self.params.max_tokens)
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Two states only: ready, and synchronously reinitializing inside
/// [`LlmClient::update_settings`]. No retry, no backoff, no timeout.
pub struct LlmClient {
    backend: Box<dyn ChatBackend>,
    history: Vec<ChatMessage>,
}

impl LlmClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_backend(Box::new(OpenAiBackend::new(settings)))
    }

    pub fn with_backend(backend: Box<dyn ChatBackend>) -> Self {
        Self {
            backend,
            history: Vec::new(),
        }
    }

    /// Appends the user entry, trims the window to the most recent
    /// [`HISTORY_WINDOW`] entries, forwards the window, and appends the reply.
    /// The window invariant holds again once the call returns.
    #[instrument(skip(self, user_input))]
    pub async fn generate(&mut self, user_input: &str) -> Result<String, LlmError> {
        self.history.push(ChatMessage::new(Role::User, user_input));
        trim_to_window(&mut self.history, HISTORY_WINDOW);

        let reply = self.backend.complete(&self.history).await?;

        self.history
            .push(ChatMessage::new(Role::Assistant, reply.clone()));
        trim_to_window(&mut self.history, HISTORY_WINDOW);
        Ok(reply)
    }

    /// Rebuilds the underlying client with new parameters. History is kept.
    pub fn update_settings(&mut self, settings: &Settings) {
        self.backend = Box::new(OpenAiBackend::new(settings));
        info!("model client reinitialized");
    }

    /// Empties the in-memory window only; persisted chats are untouched.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
