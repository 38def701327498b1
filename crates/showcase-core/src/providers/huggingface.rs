//! Hugging Face inference router client

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::UpstreamError;
use crate::request::FileInput;

use super::types::{
    BinaryTask, ChatCompletionRequest, ChatCompletionResponse, InferenceBackend,
    TextGenerationParams,
};

pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co";

const IMAGE_GENERATION_PATH: &str = "nebius/v1/images/generations";
const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";
const TASK_PATH_PREFIX: &str = "hf-inference/models";

/// HTTP backend for the Hugging Face inference router.
///
/// An empty token is allowed: requests then go out without an
/// `Authorization` header and fail upstream with an auth error.
#[derive(Clone)]
pub struct HfClient {
    client: Client,
    token: String,
    base_url: Url,
}

impl std::fmt::Debug for HfClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_token", &!self.token.is_empty())
            .finish()
    }
}

impl HfClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(base_url)?;
        // a trailing slash makes Url::join append instead of replacing the last segment
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.base_url
            .join(path)
            .map_err(|e| UpstreamError::Transport(format!("Invalid endpoint URL '{}': {}", path, e)))
    }

    fn task_endpoint(&self, model: &str) -> Result<Url, UpstreamError> {
        self.endpoint(&format!("{}/{}", TASK_PATH_PREFIX, model))
    }

    fn post(&self, url: Url) -> RequestBuilder {
        let req = self.client.post(url);
        if self.token.is_empty() {
            req
        } else {
            req.bearer_auth(&self.token)
        }
    }

    /// Send a provider-abstracted call and parse its JSON body.
    ///
    /// Upstream errors come back as `{"error": "..."}`; only the message is kept.
    async fn send_api(&self, req: RequestBuilder) -> Result<Value, UpstreamError> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(&body).unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }
        parse_json(response).await
    }

    /// Send a direct call; non-2xx keeps the full body text
    async fn send_direct(
        &self,
        context: &'static str,
        req: RequestBuilder,
    ) -> Result<Value, UpstreamError> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Http {
                context,
                status: status.as_u16(),
                body,
            });
        }
        parse_json(response).await
    }
}

#[async_trait]
impl InferenceBackend for HfClient {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<Option<String>, UpstreamError> {
        let url = self.endpoint(CHAT_COMPLETIONS_PATH)?;
        let body = serde_json::json!({
            "model": format!("{}:{}", request.model, request.provider),
            "messages": request.messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": false,
        });

        debug!(
            "Chat completion: model={}, provider={}, messages={}",
            request.model,
            request.provider,
            request.messages.len()
        );

        let value = self.send_api(self.post(url).json(&body)).await?;
        let parsed: ChatCompletionResponse = serde_json::from_value(value)
            .map_err(|e| UpstreamError::InvalidResponse(format!("Invalid chat completion response: {}", e)))?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            UpstreamError::InvalidResponse("Chat completion response had no choices".to_string())
        })?;
        Ok(choice.message.content)
    }

    async fn text_generation(
        &self,
        model: &str,
        inputs: &str,
        params: &TextGenerationParams,
    ) -> Result<String, UpstreamError> {
        let url = self.task_endpoint(model)?;
        let body = serde_json::json!({
            "inputs": inputs,
            "parameters": params,
        });

        debug!("Text generation: model={}, input_chars={}", model, inputs.len());

        let value = self.send_api(self.post(url).json(&body)).await?;
        generated_text(&value).ok_or_else(|| {
            UpstreamError::InvalidResponse("Text generation response had no generated_text".to_string())
        })
    }

    async fn binary_task(
        &self,
        task: BinaryTask,
        model: &str,
        file: &FileInput,
    ) -> Result<Value, UpstreamError> {
        let url = self.task_endpoint(model)?;
        let content_type = file.mime_or(task.default_mime());

        debug!(
            "{}: model={}, bytes={}, content_type={}",
            task,
            model,
            file.bytes.len(),
            content_type
        );

        let req = self
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(file.bytes.clone());
        self.send_api(req).await
    }

    async fn image_generation(&self, model: &str, prompt: &str) -> Result<Value, UpstreamError> {
        let url = self.endpoint(IMAGE_GENERATION_PATH)?;
        let body = serde_json::json!({
            "response_format": "b64_json",
            "prompt": prompt,
            "model": model,
        });

        debug!("Image generation: model={}, prompt_chars={}", model, prompt.len());

        self.send_direct("Image generation", self.post(url).json(&body))
            .await
    }

    async fn dedicated_transcription(
        &self,
        model: &str,
        file: &FileInput,
    ) -> Result<Value, UpstreamError> {
        let url = self.task_endpoint(model)?;
        let content_type = file.mime_or(crate::request::DEFAULT_AUDIO_MIME);

        debug!(
            "Dedicated transcription: model={}, bytes={}, content_type={}",
            model,
            file.bytes.len(),
            content_type
        );

        let req = self
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(file.bytes.clone());
        self.send_direct("Whisper API", req).await
    }
}

async fn parse_json(response: Response) -> Result<Value, UpstreamError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| UpstreamError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

/// `{"error": "msg"}` or `{"error": {"message": "msg"}}`
fn api_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    let message = match error {
        Value::String(s) => s.clone(),
        other => other.get("message")?.as_str()?.to_string(),
    };
    Some(message)
}

/// Text generation returns `[{generated_text}]`; some providers return the bare object
fn generated_text(value: &Value) -> Option<String> {
    let item = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    item.get("generated_text")?.as_str().map(str::to_string)
}
