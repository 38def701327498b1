//! Request router: picks the upstream call shape for a model and input
//!
//! [`plan`] is the pure decision table; [`InferenceRouter`] issues the chosen
//! call through an [`InferenceBackend`], wraps the result so every call shape
//! looks the same downstream, and sends failures through the classifier.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chat::ChatEntry;
use crate::classifier::{ErrorClassifier, SubstringClassifier};
use crate::error::{Result, ShowcaseError, UpstreamError};
use crate::image::decode_generation_response;
use crate::normalizer::normalize;
use crate::providers::types::{
    BinaryTask, ChatCompletionRequest, InferenceBackend, TextGenerationParams, WireMessage,
};
use crate::registry::{InputType, ModelCategory, ModelDescriptor, ModelRegistry, Provider};
use crate::render::{ImageRef, ImageResult, RenderIntent};
use crate::request::{FileInput, InferenceRequest, Payload};

pub const CHAT_MAX_TOKENS: u32 = 500;
pub const TEMPERATURE: f32 = 0.7;
pub const TEXT_MAX_NEW_TOKENS: u32 = 100;
/// Model served by the dedicated speech endpoint instead of the task API
pub const DEDICATED_SPEECH_MODEL: &str = "openai/whisper-large-v3";
/// Image models whose id contains this run object detection
pub const DETECTION_MARKER: &str = "detr";

/// Prompt and length of the availability check
const STATUS_CHECK_INPUT: &str = "test";
const STATUS_CHECK_MAX_NEW_TOKENS: u32 = 1;

const NO_RESPONSE: &str = "No response received";
const NO_TRANSCRIPTION: &str = "No transcription available";

/// Upstream call shape chosen for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// Chat completion with the prompt as the only user turn
    SingleTurnChat { provider: Provider },
    /// Chat completion carrying the prior transcript plus the new turn
    Conversation { provider: Provider },
    ImageGeneration,
    DedicatedTranscription,
    ObjectDetection,
    ImageClassification,
    SpeechRecognition,
    TextGeneration,
}

/// Decide the call shape for `model` given the kind of input submitted.
///
/// Rows are checked in order and the first match wins.
pub fn plan(model: &ModelDescriptor, input: InputType) -> Result<CallShape> {
    use InputType::{File, Text};

    let shape = match (model.category, model.provider, input) {
        (ModelCategory::Text, Some(p @ Provider::HfInference), Text) => {
            CallShape::SingleTurnChat { provider: p }
        }
        (ModelCategory::Chat, Some(p @ Provider::FireworksAi), Text) => {
            CallShape::Conversation { provider: p }
        }
        (ModelCategory::Image, Some(Provider::Router), Text) => CallShape::ImageGeneration,
        (_, _, File) if model.id == DEDICATED_SPEECH_MODEL => CallShape::DedicatedTranscription,
        (ModelCategory::Image, _, File) if model.id.contains(DETECTION_MARKER) => {
            CallShape::ObjectDetection
        }
        (ModelCategory::Image, _, File) => CallShape::ImageClassification,
        (ModelCategory::Audio, _, File) => CallShape::SpeechRecognition,
        (_, _, Text) => CallShape::TextGeneration,
        (_, _, File) => {
            return Err(ShowcaseError::UnsupportedInput(
                "Unsupported file type for this model".to_string(),
            ));
        }
    };
    Ok(shape)
}

/// Prior context for a chat call
#[derive(Debug, Clone, Copy, Default)]
pub struct Conversation<'a> {
    pub system: Option<&'a str>,
    pub history: &'a [ChatEntry],
}

impl Conversation<'_> {
    /// Wire messages for the upstream call, ending with the new user turn.
    /// Error entries stay local to the transcript.
    fn to_wire(&self, text: &str) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = self.system {
            messages.push(WireMessage::new("system", system));
        }
        messages.extend(
            self.history
                .iter()
                .filter(|e| !e.is_error)
                .map(|e| WireMessage::new(e.role.as_str(), e.content.clone())),
        );
        messages.push(WireMessage::user(text));
        messages
    }
}

/// Routes requests to the inference backend.
///
/// Holds no mutable state, so one router can serve concurrent callers.
#[derive(Clone)]
pub struct InferenceRouter {
    registry: Arc<ModelRegistry>,
    backend: Arc<dyn InferenceBackend>,
    classifier: Arc<dyn ErrorClassifier>,
}

impl InferenceRouter {
    pub fn new(registry: Arc<ModelRegistry>, backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            registry,
            backend,
            classifier: Arc::new(SubstringClassifier),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn resolve(&self, model_id: &str) -> Result<&ModelDescriptor> {
        self.registry
            .lookup(model_id)
            .ok_or_else(|| ShowcaseError::unknown_model(model_id))
    }

    fn classify(&self, model_id: &str, err: UpstreamError) -> ShowcaseError {
        let classified = self.classifier.classify(&err);
        warn!(
            "Request to {} failed ({}): {}",
            model_id,
            classified.category(),
            err
        );
        classified
    }

    pub async fn query_text(&self, model_id: &str, text: &str) -> Result<RenderIntent> {
        let model = self.resolve(model_id)?;
        let request = InferenceRequest::new(model, Payload::Text(text.to_string()))?;
        self.submit(&request, Conversation::default()).await
    }

    pub async fn query_file(&self, model_id: &str, file: FileInput) -> Result<RenderIntent> {
        let model = self.resolve(model_id)?;
        let request = InferenceRequest::new(model, Payload::Binary(file))?;
        self.submit(&request, Conversation::default()).await
    }

    /// One chat turn on top of `conversation`
    pub async fn chat(
        &self,
        model_id: &str,
        conversation: Conversation<'_>,
        text: &str,
    ) -> Result<RenderIntent> {
        let model = self.resolve(model_id)?;
        let request = InferenceRequest::new(model, Payload::Text(text.to_string()))?;
        self.submit(&request, conversation).await
    }

    /// Generate an image from `prompt`.
    ///
    /// Goes straight to the image endpoint; `model_id` need not be in the
    /// registry.
    pub async fn generate_image(&self, model_id: &str, prompt: &str) -> Result<ImageResult> {
        debug!("Generating image with {}", model_id);
        let blob = self
            .backend
            .image_generation(model_id, prompt)
            .await
            .and_then(|body| decode_generation_response(&body))
            .map_err(|e| self.classify(model_id, e))?;
        info!("Generated image with {} ({} bytes)", model_id, blob.len());
        Ok(ImageResult {
            image: ImageRef::Inline(blob),
            prompt: prompt.to_string(),
            model: model_id.to_string(),
        })
    }

    /// Whether `model_id` answers a one-token text generation.
    ///
    /// Any failure reads as unavailable; the model need not be in the registry.
    pub async fn check_model_status(&self, model_id: &str) -> bool {
        let params = TextGenerationParams {
            max_new_tokens: STATUS_CHECK_MAX_NEW_TOKENS,
            temperature: TEMPERATURE,
            return_full_text: false,
        };
        match self
            .backend
            .text_generation(model_id, STATUS_CHECK_INPUT, &params)
            .await
        {
            Ok(_) => {
                debug!("Model {} is available", model_id);
                true
            }
            Err(e) => {
                debug!("Model {} is unavailable: {}", model_id, e);
                false
            }
        }
    }

    /// Issue a prepared request and normalize the result
    pub async fn submit(
        &self,
        request: &InferenceRequest,
        conversation: Conversation<'_>,
    ) -> Result<RenderIntent> {
        let model = self.resolve(&request.model_id)?;
        let shape = plan(model, request.payload.input_type())?;
        let model_id = request.model_id.as_str();

        debug!("Routing {} as {:?}", model_id, shape);

        let payload = match (&request.payload, shape) {
            (Payload::Text(text), CallShape::ImageGeneration) => {
                let image = self.generate_image(model_id, text).await?;
                return Ok(RenderIntent::Image(image));
            }
            (Payload::Text(text), _) => self.text_call(model_id, shape, conversation, text).await,
            (Payload::Binary(file), _) => self.file_call(model_id, shape, file).await,
        }
        .map_err(|e| self.classify(model_id, e))?;

        let intent = normalize(&payload);
        info!("Request to {} completed: {}", model_id, intent.title());
        Ok(intent)
    }

    async fn text_call(
        &self,
        model_id: &str,
        shape: CallShape,
        conversation: Conversation<'_>,
        text: &str,
    ) -> std::result::Result<Value, UpstreamError> {
        match shape {
            CallShape::SingleTurnChat { provider } => {
                let content = self
                    .backend
                    .chat_completion(&chat_request(provider, model_id, vec![WireMessage::user(text)]))
                    .await?;
                Ok(json!([{
                    "generated_text": content,
                    "model": model_id,
                    "type": "text_generation",
                }]))
            }
            CallShape::Conversation { provider } => {
                let messages = conversation.to_wire(text);
                let content = self
                    .backend
                    .chat_completion(&chat_request(provider, model_id, messages))
                    .await?
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| NO_RESPONSE.to_string());
                Ok(json!({
                    "type": "chat",
                    "generated_text": content,
                    "model": model_id,
                }))
            }
            _ => {
                let params = TextGenerationParams {
                    max_new_tokens: TEXT_MAX_NEW_TOKENS,
                    temperature: TEMPERATURE,
                    return_full_text: false,
                };
                let generated = self.backend.text_generation(model_id, text, &params).await?;
                Ok(json!([{
                    "generated_text": generated,
                    "model": model_id,
                    "type": "text_generation",
                }]))
            }
        }
    }

    async fn file_call(
        &self,
        model_id: &str,
        shape: CallShape,
        file: &FileInput,
    ) -> std::result::Result<Value, UpstreamError> {
        let task = match shape {
            CallShape::DedicatedTranscription => {
                let body = self.backend.dedicated_transcription(model_id, file).await?;
                let text = ["text", "transcription"]
                    .iter()
                    .filter_map(|k| body.get(*k).and_then(Value::as_str))
                    .find(|s| !s.is_empty())
                    .unwrap_or(NO_TRANSCRIPTION);
                return Ok(json!({
                    "text": text,
                    "model": model_id,
                    "type": "speech_recognition",
                }));
            }
            CallShape::ObjectDetection => BinaryTask::ObjectDetection,
            CallShape::ImageClassification => BinaryTask::ImageClassification,
            _ => BinaryTask::SpeechRecognition,
        };
        self.backend.binary_task(task, model_id, file).await
    }
}

fn chat_request(provider: Provider, model: &str, messages: Vec<WireMessage>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        provider,
        model: model.to_string(),
        messages,
        max_tokens: CHAT_MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const TINY_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    /// Records every call and answers with canned payloads
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<String>>,
        chat_messages: Mutex<Vec<WireMessage>>,
        chat_reply: Option<String>,
    }

    impl RecordingBackend {
        fn replying(reply: Option<&str>) -> Self {
            Self {
                chat_reply: reply.map(str::to_string),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl InferenceBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        async fn chat_completion(
            &self,
            request: &ChatCompletionRequest,
        ) -> std::result::Result<Option<String>, UpstreamError> {
            self.record(format!(
                "chat {}:{} max_tokens={}",
                request.model, request.provider, request.max_tokens
            ));
            *self.chat_messages.lock().unwrap() = request.messages.clone();
            Ok(self.chat_reply.clone())
        }

        async fn text_generation(
            &self,
            model: &str,
            inputs: &str,
            params: &TextGenerationParams,
        ) -> std::result::Result<String, UpstreamError> {
            self.record(format!("text_generation {} max_new_tokens={}", model, params.max_new_tokens));
            Ok(format!("{} ...", inputs))
        }

        async fn binary_task(
            &self,
            task: BinaryTask,
            model: &str,
            _file: &FileInput,
        ) -> std::result::Result<Value, UpstreamError> {
            self.record(format!("{} {}", task, model));
            Ok(match task {
                BinaryTask::ObjectDetection => json!([
                    {"box": {"xmin": 1, "ymin": 2, "xmax": 3, "ymax": 4}, "label": "dog", "score": 0.5}
                ]),
                BinaryTask::ImageClassification => json!([{"label": "cat", "score": 0.9}]),
                BinaryTask::SpeechRecognition => json!({"text": "hello"}),
            })
        }

        async fn image_generation(
            &self,
            model: &str,
            _prompt: &str,
        ) -> std::result::Result<Value, UpstreamError> {
            self.record(format!("image_generation {}", model));
            Ok(json!({"data": [{"b64_json": TINY_PNG_B64}]}))
        }

        async fn dedicated_transcription(
            &self,
            model: &str,
            _file: &FileInput,
        ) -> std::result::Result<Value, UpstreamError> {
            self.record(format!("dedicated_transcription {}", model));
            Ok(json!({"transcription": "from dedicated"}))
        }
    }

    /// Fails every call with the given upstream error
    struct FailBackend {
        make: fn() -> UpstreamError,
    }

    #[async_trait]
    impl InferenceBackend for FailBackend {
        fn name(&self) -> &str {
            "fail"
        }
        async fn chat_completion(
            &self,
            _request: &ChatCompletionRequest,
        ) -> std::result::Result<Option<String>, UpstreamError> {
            Err((self.make)())
        }
        async fn text_generation(
            &self,
            _model: &str,
            _inputs: &str,
            _params: &TextGenerationParams,
        ) -> std::result::Result<String, UpstreamError> {
            Err((self.make)())
        }
        async fn binary_task(
            &self,
            _task: BinaryTask,
            _model: &str,
            _file: &FileInput,
        ) -> std::result::Result<Value, UpstreamError> {
            Err((self.make)())
        }
        async fn image_generation(
            &self,
            _model: &str,
            _prompt: &str,
        ) -> std::result::Result<Value, UpstreamError> {
            Err((self.make)())
        }
        async fn dedicated_transcription(
            &self,
            _model: &str,
            _file: &FileInput,
        ) -> std::result::Result<Value, UpstreamError> {
            Err((self.make)())
        }
    }

    fn router_with(backend: Arc<dyn InferenceBackend>) -> InferenceRouter {
        InferenceRouter::new(Arc::new(ModelRegistry::builtin()), backend)
    }

    fn audio() -> FileInput {
        FileInput::new(vec![0; 16], Some("audio/wav".into()))
    }

    #[tokio::test]
    async fn test_check_model_status() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router_with(backend.clone());
        assert!(router.check_model_status("gpt2").await);
        assert_eq!(backend.calls(), vec!["text_generation gpt2 max_new_tokens=1"]);

        let router = router_with(Arc::new(FailBackend {
            make: || UpstreamError::Api {
                status: 404,
                message: "Model not found".into(),
            },
        }));
        assert!(!router.check_model_status("HuggingFaceTB/SmolLM3-3B").await);
    }

    #[test]
    fn test_plan_is_total() {
        let categories = [
            ModelCategory::Text,
            ModelCategory::Image,
            ModelCategory::Audio,
            ModelCategory::Chat,
        ];
        let providers = [
            None,
            Some(Provider::HfInference),
            Some(Provider::FireworksAi),
            Some(Provider::Router),
        ];
        for category in categories {
            for provider in providers {
                for input in [InputType::Text, InputType::File] {
                    let mut model = ModelDescriptor::new("x/y", "XY", category, input);
                    model.provider = provider;
                    match plan(&model, input) {
                        Ok(_) => {}
                        Err(e) => {
                            // only files for text/chat models are unroutable
                            assert_eq!(input, InputType::File);
                            assert!(matches!(category, ModelCategory::Text | ModelCategory::Chat));
                            assert_eq!(e.category(), ErrorCategory::UnsupportedInput);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_plan_builtin_rows() {
        let registry = ModelRegistry::builtin();
        let shape = |id: &str, input| plan(registry.lookup(id).unwrap(), input).unwrap();
        assert_eq!(
            shape("HuggingFaceTB/SmolLM3-3B", InputType::Text),
            CallShape::SingleTurnChat {
                provider: Provider::HfInference
            }
        );
        assert_eq!(
            shape("deepseek-ai/DeepSeek-R1-0528", InputType::Text),
            CallShape::Conversation {
                provider: Provider::FireworksAi
            }
        );
        assert_eq!(shape("black-forest-labs/flux-dev", InputType::Text), CallShape::ImageGeneration);
        assert_eq!(shape("openai/whisper-large-v3", InputType::File), CallShape::DedicatedTranscription);
        assert_eq!(shape("facebook/detr-resnet-50", InputType::File), CallShape::ObjectDetection);
        assert_eq!(shape("google/vit-base-patch16-224", InputType::File), CallShape::ImageClassification);
        assert_eq!(shape("openai/whisper-tiny", InputType::File), CallShape::SpeechRecognition);
    }

    #[test]
    fn test_plan_provider_needs_matching_category() {
        // a provider on the wrong category does not change the call shape
        let model = ModelDescriptor::new("a/b", "AB", ModelCategory::Chat, InputType::Text)
            .with_provider(Provider::HfInference);
        assert_eq!(plan(&model, InputType::Text).unwrap(), CallShape::TextGeneration);
    }

    #[tokio::test]
    async fn test_single_turn_chat_wrapped_as_text() {
        let backend = Arc::new(RecordingBackend::replying(Some("a poem")));
        let router = router_with(backend.clone());
        let intent = router
            .query_text("HuggingFaceTB/SmolLM3-3B", "write a poem")
            .await
            .unwrap();
        assert_eq!(intent, RenderIntent::Text { text: "a poem".into() });
        assert_eq!(
            backend.calls(),
            vec!["chat HuggingFaceTB/SmolLM3-3B:hf-inference max_tokens=500"]
        );
        assert_eq!(backend.chat_messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_carries_history_without_errors() {
        let backend = Arc::new(RecordingBackend::replying(Some("sure")));
        let router = router_with(backend.clone());
        let history = vec![
            ChatEntry::user("first"),
            ChatEntry::assistant("reply"),
            ChatEntry::error(&ShowcaseError::Unknown),
        ];
        let conversation = Conversation {
            system: Some("be brief"),
            history: &history,
        };
        let intent = router
            .chat("deepseek-ai/DeepSeek-R1-0528", conversation, "second")
            .await
            .unwrap();
        assert_eq!(
            intent,
            RenderIntent::Chat {
                text: "sure".into(),
                model: "deepseek-ai/DeepSeek-R1-0528".into()
            }
        );
        let roles: Vec<String> = backend
            .chat_messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| format!("{}:{}", m.role, m.content))
            .collect();
        assert_eq!(
            roles,
            vec!["system:be brief", "user:first", "assistant:reply", "user:second"]
        );
    }

    #[tokio::test]
    async fn test_empty_chat_reply_falls_back() {
        let router = router_with(Arc::new(RecordingBackend::replying(None)));
        let intent = router
            .chat("deepseek-ai/DeepSeek-R1-0528", Conversation::default(), "hi")
            .await
            .unwrap();
        assert_eq!(intent.primary_text(), Some("No response received"));
    }

    #[tokio::test]
    async fn test_image_row_returns_inline_blob() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router_with(backend.clone());
        let intent = router
            .query_text("black-forest-labs/flux-dev", "a cat")
            .await
            .unwrap();
        let RenderIntent::Image(image) = intent else {
            panic!("expected image");
        };
        assert_eq!(image.prompt, "a cat");
        assert!(matches!(image.image, ImageRef::Inline(ref blob) if blob.len() == 70));
    }

    #[tokio::test]
    async fn test_generate_image_skips_registry() {
        let router = router_with(Arc::new(RecordingBackend::default()));
        let image = router.generate_image("someone/unlisted", "x").await.unwrap();
        assert_eq!(image.model, "someone/unlisted");
    }

    #[tokio::test]
    async fn test_dedicated_transcription_reads_fallback_field() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router_with(backend.clone());
        let intent = router
            .query_file("openai/whisper-large-v3", audio())
            .await
            .unwrap();
        assert_eq!(
            intent,
            RenderIntent::Transcription {
                text: "from dedicated".into()
            }
        );
        assert_eq!(backend.calls(), vec!["dedicated_transcription openai/whisper-large-v3"]);
    }

    #[tokio::test]
    async fn test_file_tasks_untouched() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router_with(backend.clone());
        let image = FileInput::new(vec![1, 2, 3], Some("image/jpeg".into()));

        let detection = router
            .query_file("facebook/detr-resnet-50", image.clone())
            .await
            .unwrap();
        assert!(matches!(detection, RenderIntent::Detection { .. }));

        let classification = router
            .query_file("google/vit-base-patch16-224", image)
            .await
            .unwrap();
        assert!(matches!(classification, RenderIntent::Classification { .. }));

        let speech = router.query_file("openai/whisper-tiny", audio()).await.unwrap();
        assert_eq!(speech, RenderIntent::Transcription { text: "hello".into() });

        assert_eq!(
            backend.calls(),
            vec![
                "object-detection facebook/detr-resnet-50",
                "image-classification google/vit-base-patch16-224",
                "automatic-speech-recognition openai/whisper-tiny",
            ]
        );
    }

    #[tokio::test]
    async fn test_text_generation_fallback_row() {
        let extra = ModelDescriptor::new("gpt2", "GPT-2", ModelCategory::Text, InputType::Text);
        let backend = Arc::new(RecordingBackend::default());
        let router = InferenceRouter::new(
            Arc::new(ModelRegistry::builtin_with(vec![extra]).unwrap()),
            backend.clone(),
        );
        let intent = router.query_text("gpt2", "once").await.unwrap();
        assert_eq!(intent, RenderIntent::Text { text: "once ...".into() });
        assert_eq!(backend.calls(), vec!["text_generation gpt2 max_new_tokens=100"]);
    }

    #[tokio::test]
    async fn test_unknown_model_and_wrong_input() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router_with(backend.clone());

        let err = router.query_text("nobody/nothing", "hi").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnsupportedInput);
        assert!(err.to_string().contains("nobody/nothing"));

        let err = router
            .query_file("HuggingFaceTB/SmolLM3-3B", audio())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnsupportedInput);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_classified() {
        let router = router_with(Arc::new(FailBackend {
            make: || UpstreamError::Api {
                status: 404,
                message: "Model not found: xyz".into(),
            },
        }));
        let err = router
            .query_text("HuggingFaceTB/SmolLM3-3B", "hi")
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ModelNotFound);
        assert!(err.guidance().is_some());

        let router = router_with(Arc::new(FailBackend {
            make: || UpstreamError::Http {
                context: "Whisper API",
                status: 503,
                body: "Model is loading".into(),
            },
        }));
        let err = router
            .query_file("openai/whisper-large-v3", audio())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ModelLoading);

        let router = router_with(Arc::new(FailBackend {
            make: || UpstreamError::Empty,
        }));
        let err = router.generate_image("m", "p").await.unwrap_err();
        assert_eq!(err, ShowcaseError::Unknown);
    }

    #[tokio::test]
    async fn test_missing_image_data_is_generic() {
        struct EmptyImage;

        #[async_trait]
        impl InferenceBackend for EmptyImage {
            fn name(&self) -> &str {
                "empty"
            }
            async fn chat_completion(
                &self,
                _r: &ChatCompletionRequest,
            ) -> std::result::Result<Option<String>, UpstreamError> {
                Ok(None)
            }
            async fn text_generation(
                &self,
                _m: &str,
                _i: &str,
                _p: &TextGenerationParams,
            ) -> std::result::Result<String, UpstreamError> {
                Ok(String::new())
            }
            async fn binary_task(
                &self,
                _t: BinaryTask,
                _m: &str,
                _f: &FileInput,
            ) -> std::result::Result<Value, UpstreamError> {
                Ok(Value::Null)
            }
            async fn image_generation(
                &self,
                _m: &str,
                _p: &str,
            ) -> std::result::Result<Value, UpstreamError> {
                Ok(json!({"data": []}))
            }
            async fn dedicated_transcription(
                &self,
                _m: &str,
                _f: &FileInput,
            ) -> std::result::Result<Value, UpstreamError> {
                Ok(json!({}))
            }
        }

        let router = router_with(Arc::new(EmptyImage));
        let err = router
            .query_text("black-forest-labs/flux-dev", "x")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ShowcaseError::Generic("Invalid response format from image generation API".into())
        );

        let intent = router
            .query_file("openai/whisper-large-v3", audio())
            .await
            .unwrap();
        assert_eq!(intent.primary_text(), Some("No transcription available"));
    }

    #[tokio::test]
    async fn test_chat_session_records_turns() {
        use crate::chat::{ChatRole, ChatSession};

        let router = router_with(Arc::new(RecordingBackend::replying(Some("pong"))));
        let mut session = ChatSession::new("deepseek-ai/DeepSeek-R1-0528").with_welcome("hello");
        session.send(&router, "ping").await.unwrap();
        let entries = session.transcript().entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].role, ChatRole::User);
        assert_eq!(entries[2].content, "pong");

        let failing = router_with(Arc::new(FailBackend {
            make: || UpstreamError::Api {
                status: 429,
                message: "Rate limit reached".into(),
            },
        }));
        let err = session.send(&failing, "again").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::RateLimited);
        let last = session.transcript().last().unwrap();
        assert!(last.is_error);
        assert!(last.content.starts_with("Error: Rate limit exceeded"));
        assert_eq!(session.transcript().len(), 5);
    }
}
