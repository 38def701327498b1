//! Static catalog of callable models

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// What kind of result a model produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCategory {
    Text,
    Image,
    Audio,
    Chat,
}

impl ModelCategory {
    /// Display order used when listing the catalog
    pub const LISTING_ORDER: [ModelCategory; 4] = [Self::Text, Self::Chat, Self::Image, Self::Audio];
}

impl std::fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
            Self::Chat => write!(f, "chat"),
        }
    }
}

/// Which input widget/path a model takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    File,
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::File => write!(f, "file"),
        }
    }
}

/// Named upstream backend that overrides the category's default call shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Hugging Face's own hosted inference
    HfInference,
    FireworksAi,
    /// Direct image-generation endpoint on the router
    Router,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HfInference => "hf-inference",
            Self::FireworksAi => "fireworks-ai",
            Self::Router => "router",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata record for one callable model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub category: ModelCategory,
    #[serde(default)]
    pub description: String,
    pub input_type: InputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: ModelCategory,
        input_type: InputType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            input_type,
            provider: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate model id in registry: {0}")]
    DuplicateId(String),

    #[error("Model id must not be empty")]
    EmptyId,
}

/// Immutable model catalog, built once at startup
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    /// Build a registry, rejecting empty or duplicate ids
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for model in &models {
            if model.id.trim().is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if !seen.insert(model.id.as_str()) {
                return Err(RegistryError::DuplicateId(model.id.clone()));
            }
        }
        Ok(Self { models })
    }

    /// The built-in catalog
    pub fn builtin() -> Self {
        Self {
            models: builtin_models(),
        }
    }

    /// The built-in catalog followed by `extra` entries
    pub fn builtin_with(extra: Vec<ModelDescriptor>) -> Result<Self, RegistryError> {
        let mut models = builtin_models();
        models.extend(extra);
        Self::new(models)
    }

    pub fn lookup(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// All models grouped by category (text, chat, image, audio), insertion
    /// order preserved within each group
    pub fn list(&self) -> Vec<&ModelDescriptor> {
        ModelCategory::LISTING_ORDER
            .iter()
            .flat_map(|c| self.by_category(*c))
            .collect()
    }

    pub fn by_category(&self, category: ModelCategory) -> Vec<&ModelDescriptor> {
        self.models.iter().filter(|m| m.category == category).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new(
            "HuggingFaceTB/SmolLM3-3B",
            "SmolLM3-3B",
            ModelCategory::Text,
            InputType::Text,
        )
        .with_description("Compact 3B parameter language model for text generation")
        .with_provider(Provider::HfInference),
        ModelDescriptor::new(
            "deepseek-ai/DeepSeek-R1-0528",
            "DeepSeek-R1",
            ModelCategory::Chat,
            InputType::Text,
        )
        .with_description("Advanced reasoning model powered by Fireworks AI")
        .with_provider(Provider::FireworksAi),
        ModelDescriptor::new(
            "black-forest-labs/flux-dev",
            "FLUX.1 Dev",
            ModelCategory::Image,
            InputType::Text,
        )
        .with_description("Advanced image generation model")
        .with_provider(Provider::Router),
        ModelDescriptor::new(
            "google/vit-base-patch16-224",
            "Vision Transformer",
            ModelCategory::Image,
            InputType::File,
        )
        .with_description("Image classification using Vision Transformers"),
        ModelDescriptor::new(
            "facebook/detr-resnet-50",
            "DETR Object Detection",
            ModelCategory::Image,
            InputType::File,
        )
        .with_description("Object detection and localization in images"),
        ModelDescriptor::new(
            "openai/whisper-tiny",
            "Whisper Tiny",
            ModelCategory::Audio,
            InputType::File,
        )
        .with_description("Lightweight speech recognition model"),
        ModelDescriptor::new(
            "openai/whisper-large-v3",
            "Whisper Large V3",
            ModelCategory::Audio,
            InputType::File,
        )
        .with_description("Advanced speech recognition and transcription"),
    ]
}
