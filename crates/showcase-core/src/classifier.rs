//! Upstream error classification
//!
//! The provider does not return structured error codes, so the default
//! classifier matches substrings of the free-text message. This is a
//! best-effort heuristic: upstream wording may change between provider
//! versions. Callers depend only on [`ErrorClassifier`], so a structured
//! implementation can replace [`SubstringClassifier`] without touching them.

use crate::error::{ShowcaseError, UpstreamError};

pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, err: &UpstreamError) -> ShowcaseError;
}

/// Ordered substring rules; first match wins
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringClassifier;

type Rule = (&'static str, fn(String) -> ShowcaseError);

const RULES: &[Rule] = &[
    ("Model not found", |raw: String| ShowcaseError::ModelNotFound { raw }),
    ("Rate limit", |raw: String| ShowcaseError::RateLimited { raw }),
    ("loading", |raw: String| ShowcaseError::ModelLoading { raw }),
    ("token", |raw: String| ShowcaseError::InvalidToken { raw }),
    ("No Inference Provider", |raw: String| {
        ShowcaseError::ProviderMisconfigured { raw }
    }),
    ("Invalid username or password", |raw: String| {
        ShowcaseError::AuthFailed { raw }
    }),
];

impl SubstringClassifier {
    /// Classify a bare message; `None` means no message was available
    pub fn classify_message(&self, message: Option<&str>) -> ShowcaseError {
        let Some(raw) = message.filter(|m| !m.is_empty()) else {
            return ShowcaseError::Unknown;
        };
        for (needle, build) in RULES {
            if raw.contains(needle) {
                return build(raw.to_string());
            }
        }
        ShowcaseError::Generic(raw.to_string())
    }
}

impl ErrorClassifier for SubstringClassifier {
    fn classify(&self, err: &UpstreamError) -> ShowcaseError {
        self.classify_message(err.message().as_deref())
    }
}
