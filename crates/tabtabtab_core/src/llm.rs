//! LLM-processor capability consumed by extensions.
//!
//! The core never calls a model itself; hosts inject an implementation and
//! extensions decide when to await it.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use thiserror::Error;

/// Known model identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LlmModel {
    #[serde(rename = "claude-3-5-sonnet-latest")]
    AnthropicSonnet,
    #[serde(rename = "claude-3-7-sonnet-latest")]
    AnthropicClaudeSonnet37,
    #[serde(rename = "claude-3-5-haiku-latest")]
    AnthropicHaiku,
    #[serde(rename = "gemini-2.0-flash")]
    GeminiFlash2,
    #[serde(rename = "gemini-1.5-flash")]
    GeminiFlash,
    #[serde(rename = "gemini-1.5-pro")]
    GeminiPro,
    #[serde(rename = "gemini-2.0-pro-exp")]
    GeminiPro2,
    #[serde(rename = "gemini-2.5-pro-exp-03-25")]
    GeminiPro25,
    #[serde(rename = "gemini-2.0-flash-exp")]
    GeminiFlash2Exp,
    #[serde(rename = "gemini-2.0-flash-exp-image-generation")]
    GeminiFlash2ImageGen,
    #[serde(rename = "gpt-4o-mini")]
    OpenAiMini,
    #[serde(rename = "gpt-4o")]
    OpenAiFull,
}

impl LlmModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnthropicSonnet => "claude-3-5-sonnet-latest",
            Self::AnthropicClaudeSonnet37 => "claude-3-7-sonnet-latest",
            Self::AnthropicHaiku => "claude-3-5-haiku-latest",
            Self::GeminiFlash2 => "gemini-2.0-flash",
            Self::GeminiFlash => "gemini-1.5-flash",
            Self::GeminiPro => "gemini-1.5-pro",
            Self::GeminiPro2 => "gemini-2.0-pro-exp",
            Self::GeminiPro25 => "gemini-2.5-pro-exp-03-25",
            Self::GeminiFlash2Exp => "gemini-2.0-flash-exp",
            Self::GeminiFlash2ImageGen => "gemini-2.0-flash-exp-image-generation",
            Self::OpenAiMini => "gpt-4o-mini",
            Self::OpenAiFull => "gpt-4o",
        }
    }

    /// Provider family derived from the model id prefix.
    pub fn provider(self) -> &'static str {
        let id = self.as_str();
        if id.starts_with("gemini") {
            "gemini"
        } else if id.starts_with("gpt") {
            "openai"
        } else if id.starts_with("claude") {
            "anthropic"
        } else {
            "unknown"
        }
    }

    pub fn top_shelf_models() -> &'static [LlmModel] {
        &[
            Self::AnthropicSonnet,
            Self::AnthropicClaudeSonnet37,
            Self::GeminiFlash2,
        ]
    }
}

/// Image generation mode requested alongside a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageGenerationMode {
    None,
    New,
    Crop,
    MultiModal,
}

/// Text or image context attached to a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmContext {
    pub image: Option<Vec<u8>>,
    pub text: Option<String>,
}

impl LlmContext {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            image: None,
            text: Some(text.into()),
        }
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            image: Some(bytes),
            text: None,
        }
    }
}

/// One processing request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system_prompt: Option<String>,
    pub message: String,
    pub contexts: Vec<LlmContext>,
    pub model: LlmModel,
    pub stream: bool,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl LlmRequest {
    pub fn new(model: LlmModel, message: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            message: message.into(),
            contexts: Vec::new(),
            model,
            stream: false,
            max_output_tokens: None,
            temperature: None,
            top_p: None,
            top_k: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_context(mut self, context: LlmContext) -> Self {
        self.contexts.push(context);
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Processor result: complete text, or chunks when `stream` was requested.
pub enum LlmOutput {
    Text(String),
    Stream(BoxStream<'static, Result<String, LlmError>>),
}

impl Debug for LlmOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl LlmOutput {
    /// Collects the full text, draining a stream when needed.
    pub async fn into_text(self) -> Result<String, LlmError> {
        use futures_util::StreamExt;

        match self {
            Self::Text(text) => Ok(text),
            Self::Stream(mut chunks) => {
                let mut text = String::new();
                while let Some(chunk) = chunks.next().await {
                    text.push_str(&chunk?);
                }
                Ok(text)
            }
        }
    }
}

/// Scored prediction metadata some processors return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub text: String,
    pub confidence: f64,
    pub model_used: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

/// Processor failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("llm processor is unavailable: {0}")]
    Unavailable(String),
    #[error("llm request is invalid: {0}")]
    InvalidRequest(String),
    #[error("llm backend failed: provider={provider} message={message}")]
    Backend { provider: String, message: String },
}

/// Host-injected language model backend.
#[async_trait]
pub trait LlmProcessor: Send + Sync {
    async fn process(&self, request: LlmRequest) -> Result<LlmOutput, LlmError>;
}

/// Processor for hosts running without a model backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLlmProcessor;

#[async_trait]
impl LlmProcessor for UnavailableLlmProcessor {
    async fn process(&self, request: LlmRequest) -> Result<LlmOutput, LlmError> {
        Err(LlmError::Unavailable(format!(
            "no backend configured for model {}",
            request.model.as_str()
        )))
    }
}
