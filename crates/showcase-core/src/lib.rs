//! showcase-core - routing, normalization and error handling for hosted models
//!
//! This crate provides:
//! - A static registry of callable models
//! - A request router that picks the upstream call shape per model and input
//! - A response normalizer that turns arbitrary JSON into typed render-intents
//! - An error classifier over upstream failure messages
//! - Chat sessions and per-caller playground state

pub mod chat;
pub mod classifier;
pub mod error;
pub mod image;
pub mod normalizer;
pub mod providers;
pub mod registry;
pub mod render;
pub mod request;
pub mod router;
pub mod state;

// Re-export main types for convenience
pub use chat::{ChatEntry, ChatRole, ChatSession, ChatTranscript};
pub use classifier::{ErrorClassifier, SubstringClassifier};
pub use error::{ErrorCategory, ShowcaseError, UpstreamError};
pub use image::ImageBlob;
pub use normalizer::normalize;
pub use providers::{HfClient, InferenceBackend};
pub use registry::{InputType, ModelCategory, ModelDescriptor, ModelRegistry, Provider, RegistryError};
pub use render::{ImageRef, ImageResult, RenderIntent};
pub use request::{FileInput, InferenceRequest, Payload};
pub use router::{CallShape, Conversation, InferenceRouter, plan};
pub use state::{Outcome, PlaygroundError, PlaygroundState};
