//! Backend-agnostic types for upstream inference calls

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UpstreamError;
use crate::registry::Provider;
use crate::request::FileInput;

/// Message in chat-completion wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// A chat completion routed through a named provider
#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub provider: Provider,
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Sampling parameters for plain text generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextGenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    /// `false` asks for the completion only, without the prompt echoed back
    pub return_full_text: bool,
}

/// Tasks that take a raw file body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryTask {
    ObjectDetection,
    ImageClassification,
    SpeechRecognition,
}

impl BinaryTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectDetection => "object-detection",
            Self::ImageClassification => "image-classification",
            Self::SpeechRecognition => "automatic-speech-recognition",
        }
    }

    /// MIME type sent when the file declares none
    pub fn default_mime(&self) -> &'static str {
        match self {
            Self::ObjectDetection | Self::ImageClassification => "application/octet-stream",
            Self::SpeechRecognition => crate::request::DEFAULT_AUDIO_MIME,
        }
    }
}

impl std::fmt::Display for BinaryTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport to the inference service.
///
/// One method per upstream call shape. Implementations do a single
/// request/response exchange and never retry; shaping results for display is
/// the router's job.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Chat completion; returns the first choice's content, if any
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<Option<String>, UpstreamError>;

    /// Plain text generation; returns the generated text
    async fn text_generation(
        &self,
        model: &str,
        inputs: &str,
        params: &TextGenerationParams,
    ) -> Result<String, UpstreamError>;

    /// File-in, JSON-out task; the JSON is returned untouched
    async fn binary_task(
        &self,
        task: BinaryTask,
        model: &str,
        file: &FileInput,
    ) -> Result<Value, UpstreamError>;

    /// Direct image-generation endpoint; returns the raw `{data:[{b64_json}]}` body
    async fn image_generation(&self, model: &str, prompt: &str) -> Result<Value, UpstreamError>;

    /// Dedicated speech-to-text endpoint; returns the raw JSON body
    async fn dedicated_transcription(
        &self,
        model: &str,
        file: &FileInput,
    ) -> Result<Value, UpstreamError>;
}

// ── Chat completion wire types ──

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    pub content: Option<String>,
}
