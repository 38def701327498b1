//! Per-submission request values

use crate::error::{Result, ShowcaseError};
use crate::registry::{InputType, ModelCategory, ModelDescriptor};

/// Audio MIME type used when a file declares none
pub const DEFAULT_AUDIO_MIME: &str = "audio/flac";

/// A user-supplied file
#[derive(Clone, PartialEq, Eq)]
pub struct FileInput {
    pub bytes: Vec<u8>,
    /// Declared MIME type, if the source knew it
    pub mime_type: Option<String>,
}

impl std::fmt::Debug for FileInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileInput")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl FileInput {
    pub fn new(bytes: Vec<u8>, mime_type: Option<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.filter(|m| !m.trim().is_empty()),
        }
    }

    /// Declared MIME type, or `fallback` when none was given
    pub fn mime_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.mime_type.as_deref().unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(FileInput),
}

impl Payload {
    pub fn input_type(&self) -> InputType {
        match self {
            Self::Text(_) => InputType::Text,
            Self::Binary(_) => InputType::File,
        }
    }
}

/// One submission against one selected model; consumed by the router
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model_id: String,
    pub category: ModelCategory,
    pub input_type: InputType,
    pub payload: Payload,
}

impl InferenceRequest {
    /// Fails with `UnsupportedInput` when the payload kind does not match the
    /// model's declared input type
    pub fn new(model: &ModelDescriptor, payload: Payload) -> Result<Self> {
        if payload.input_type() != model.input_type {
            return Err(ShowcaseError::UnsupportedInput(format!(
                "{} expects {} input, got {}",
                model.id,
                model.input_type,
                payload.input_type()
            )));
        }
        Ok(Self {
            model_id: model.id.clone(),
            category: model.category,
            input_type: model.input_type,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_matching_payload_accepted() {
        let model = ModelDescriptor::new("m", "M", ModelCategory::Audio, InputType::File);
        let req = InferenceRequest::new(
            &model,
            Payload::Binary(FileInput::new(vec![1, 2, 3], Some("audio/wav".into()))),
        )
        .unwrap();
        assert_eq!(req.model_id, "m");
        assert_eq!(req.input_type, InputType::File);
    }

    #[test]
    fn test_mismatched_payload_rejected() {
        let model = ModelDescriptor::new("m", "M", ModelCategory::Text, InputType::Text);
        let err = InferenceRequest::new(&model, Payload::Binary(FileInput::new(vec![], None)))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::UnsupportedInput);
    }

    #[test]
    fn test_blank_mime_treated_as_missing() {
        let file = FileInput::new(vec![0], Some("".into()));
        assert_eq!(file.mime_or(DEFAULT_AUDIO_MIME), "audio/flac");
        let file = FileInput::new(vec![0], Some("audio/wav".into()));
        assert_eq!(file.mime_or(DEFAULT_AUDIO_MIME), "audio/wav");
    }

    #[test]
    fn test_debug_omits_bytes() {
        let file = FileInput::new(vec![7; 1024], None);
        assert!(format!("{:?}", file).contains("len: 1024"));
    }
}
