//! Error types for showcase-core
//!
//! Two layers:
//! - [`UpstreamError`]: what came back from the network, before classification
//! - [`ShowcaseError`]: the classified, user-facing failure returned to callers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed set of user-facing failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UnsupportedInput,
    ModelNotFound,
    RateLimited,
    ModelLoading,
    InvalidToken,
    ProviderMisconfigured,
    AuthFailed,
    Generic,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UnsupportedInput => "unsupported_input",
            Self::ModelNotFound => "model_not_found",
            Self::RateLimited => "rate_limited",
            Self::ModelLoading => "model_loading",
            Self::InvalidToken => "invalid_token",
            Self::ProviderMisconfigured => "provider_misconfigured",
            Self::AuthFailed => "auth_failed",
            Self::Generic => "generic",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Raw failure from an upstream call, not yet mapped to a category
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Non-2xx from one of the direct HTTP endpoints; `body` is the full response text
    #[error("{context} failed: {status} {body}")]
    Http {
        context: &'static str,
        status: u16,
        body: String,
    },

    /// Error message reported by the provider-abstracted API
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    InvalidResponse(String),

    /// Failure with no message attached
    #[error("")]
    Empty,
}

impl UpstreamError {
    /// The raw message the classifier matches against, if any
    pub fn message(&self) -> Option<String> {
        let text = self.to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// HTTP status attached to the failure, when there was a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Classified failure returned by every core operation.
///
/// `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShowcaseError {
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Model not found. The model may not exist or is not publicly available.")]
    ModelNotFound { raw: String },

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { raw: String },

    #[error("Model is currently loading. Please try again in a few moments.")]
    ModelLoading { raw: String },

    #[error("Invalid API token. Please check your Hugging Face token.")]
    InvalidToken { raw: String },

    #[error(
        "This model requires a specific provider configuration. Please try a different model or check your API access."
    )]
    ProviderMisconfigured { raw: String },

    #[error(
        "Authentication failed. Please check your Hugging Face API token and ensure it has the necessary permissions."
    )]
    AuthFailed { raw: String },

    #[error("API Error: {0}")]
    Generic(String),

    #[error("An unexpected error occurred. Please try again.")]
    Unknown,
}

impl ShowcaseError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedInput(_) => ErrorCategory::UnsupportedInput,
            Self::ModelNotFound { .. } => ErrorCategory::ModelNotFound,
            Self::RateLimited { .. } => ErrorCategory::RateLimited,
            Self::ModelLoading { .. } => ErrorCategory::ModelLoading,
            Self::InvalidToken { .. } => ErrorCategory::InvalidToken,
            Self::ProviderMisconfigured { .. } => ErrorCategory::ProviderMisconfigured,
            Self::AuthFailed { .. } => ErrorCategory::AuthFailed,
            Self::Generic(_) => ErrorCategory::Generic,
            Self::Unknown => ErrorCategory::Unknown,
        }
    }

    /// The upstream text this error was classified from
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::ModelNotFound { raw }
            | Self::RateLimited { raw }
            | Self::ModelLoading { raw }
            | Self::InvalidToken { raw }
            | Self::ProviderMisconfigured { raw }
            | Self::AuthFailed { raw } => Some(raw),
            Self::Generic(raw) | Self::UnsupportedInput(raw) => Some(raw),
            Self::Unknown => None,
        }
    }

    /// Extra static help shown under the message for some categories
    pub fn guidance(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::ModelNotFound { .. } => Some(&[
                "The model may be private or require special access",
                "Try a different model from the list",
                "Some models may be temporarily unavailable",
            ]),
            Self::ModelLoading { .. } => Some(&[
                "The model is currently loading. This usually takes 1-2 minutes for the first request.",
                "Please try again in a moment.",
            ]),
            _ => None,
        }
    }

    pub fn unknown_model(id: &str) -> Self {
        Self::UnsupportedInput(format!("model '{}' is not in the registry", id))
    }
}

pub type Result<T> = std::result::Result<T, ShowcaseError>;
