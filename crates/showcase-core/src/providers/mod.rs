//! Upstream inference backends
//!
//! Backends implement the [`InferenceBackend`] trait, one method per call
//! shape. [`HfClient`] talks to the Hugging Face inference router; tests swap
//! in mocks.

pub mod huggingface;
pub mod types;

pub use huggingface::{DEFAULT_BASE_URL, HfClient};
pub use types::{
    BinaryTask, ChatCompletionRequest, InferenceBackend, TextGenerationParams, WireMessage,
};
