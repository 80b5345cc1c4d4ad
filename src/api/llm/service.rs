//! Structured extraction client.
//!
//! Responsibilities:
//! - one multimodal request per question: all page images + one instruction
//! - parse the reply, repairing a code fence once
//! - reconcile option correctness before handing the record back
//!
//! Does not: retry, touch the cache, or know about page location. The
//! endpoint configuration is threaded in at construction; an unconfigured
//! client degrades every call to `ServiceUnavailable` instead of crashing.

use std::sync::Arc;

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, FinishReason,
        ImageDetail, ImageUrl, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::llm::parse::{parse_reply, ReplyParse};
use crate::api::llm::prompt::{system_message, user_instruction};
use crate::app::record::BilingualRecord;
use crate::config::AppConfig;
use crate::error::AppError;

/// Seam to the chat-completion transport, substitutable in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one system message and one user message carrying `user_text`
    /// plus `image_urls`, returns the model's text reply.
    async fn complete(
        &self,
        system: &str,
        user_text: &str,
        image_urls: &[String],
    ) -> Result<String>;
}

/// OpenAI-compatible chat backend (any endpoint speaking that API).
pub struct OpenAiBackend {
    pub(crate) client: Client<OpenAIConfig>,
    pub(crate) model_name: String,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, api_base: &str, model_name: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(openai_config),
            model_name: model_name.to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(
        &self,
        system: &str,
        user_text: &str,
        image_urls: &[String],
    ) -> Result<String> {
        debug!("calling model {}, {} images", self.model_name, image_urls.len());

        let mut messages = Vec::new();

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()?;
        messages.push(ChatCompletionRequestMessage::System(system_msg));

        let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = Vec::new();
        content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
            ChatCompletionRequestMessageContentPartText {
                text: user_text.to_string(),
            },
        ));
        for url in image_urls {
            content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: url.clone(),
                        detail: Some(ImageDetail::High),
                    },
                },
            ));
        }
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.2)
            .response_format(ResponseFormat::JsonObject)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("model API transport error: {}", e);
            anyhow::anyhow!("model API call failed: {}", e)
        })?;

        if let Some(choice) = response.choices.first() {
            debug!("finish reason: {:?}", choice.finish_reason);
            if let Some(reason) = &choice.finish_reason {
                if matches!(reason, FinishReason::ContentFilter) {
                    anyhow::bail!("request blocked by the provider's content filter");
                }
            }
        }

        let raw_content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if raw_content.trim().is_empty() {
            warn!("model returned an empty reply, raw length {}", raw_content.len());
            anyhow::bail!("model returned an empty reply");
        }

        Ok(raw_content.trim().to_string())
    }
}

/// Bilingual structured extraction over a [`ChatBackend`].
pub struct ExtractionService {
    backend: Option<Arc<dyn ChatBackend>>,
}

impl ExtractionService {
    /// Builds the service from process configuration. Missing endpoint
    /// configuration yields a service that answers `ServiceUnavailable`.
    pub fn from_config(config: &AppConfig) -> Self {
        let backend = config
            .llm_endpoint()
            .map(|(key, base, model)| {
                Arc::new(OpenAiBackend::new(key, base, model)) as Arc<dyn ChatBackend>
            });
        if backend.is_none() {
            warn!("llm endpoint not configured, extraction disabled");
        }
        Self { backend }
    }

    pub fn with_backend(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Extracts the bilingual record for `question_id` from the rendered
    /// page images. One call, one reply, at most one repair; retries are
    /// the caller's policy.
    pub async fn extract(
        &self,
        question_id: u32,
        page_images: &[String],
    ) -> std::result::Result<BilingualRecord, AppError> {
        let backend = self.backend.as_ref().ok_or(AppError::ServiceUnavailable)?;
        if page_images.is_empty() {
            return Err(AppError::ExtractionFailed("no page images to extract from".into()));
        }

        let raw = backend
            .complete(system_message(), &user_instruction(question_id), page_images)
            .await
            .map_err(|e| AppError::ExtractionFailed(e.to_string()))?;

        let mut record = match parse_reply(&raw) {
            ReplyParse::Direct(record) => record,
            ReplyParse::Repaired(record) => {
                warn!("question #{question_id}: reply needed code-fence repair");
                record
            }
            ReplyParse::Failed { error } => {
                warn!("question #{question_id}: unparseable reply: {error}");
                return Err(AppError::ExtractionFailed(error));
            }
        };

        record
            .validate()
            .map_err(|e| AppError::ExtractionFailed(format!("invalid record: {e}")))?;

        if record.en.id != question_id || record.es.id != question_id {
            warn!(
                "model answered with id {}/{} for question #{question_id}, correcting",
                record.en.id, record.es.id
            );
            record.en.id = question_id;
            record.es.id = question_id;
        }

        record.reconcile();
        Ok(record)
    }
}
