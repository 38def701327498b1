//! Playground state: one selected model, one request at a time

use serde::Serialize;
use thiserror::Error;

use crate::error::ShowcaseError;
use crate::registry::ModelDescriptor;
use crate::render::RenderIntent;

/// Result of the most recent request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(RenderIntent),
    Failure(ShowcaseError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<RenderIntent, ShowcaseError>> for Outcome {
    fn from(result: Result<RenderIntent, ShowcaseError>) -> Self {
        match result {
            Ok(intent) => Self::Success(intent),
            Err(e) => Self::Failure(e),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaygroundError {
    #[error("No model selected")]
    NoModelSelected,

    #[error("A request is already in flight")]
    RequestInFlight,
}

/// Caller-owned state of one playground.
///
/// Selecting a model clears the previous outcome; a new request can only
/// start once the previous one has finished.
#[derive(Debug, Clone, Default)]
pub struct PlaygroundState {
    selected: Option<ModelDescriptor>,
    in_flight: bool,
    last: Option<Outcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaygroundSnapshot {
    pub selected: Option<String>,
    pub in_flight: bool,
    pub has_result: bool,
}

impl PlaygroundState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a model; returns the outcome it replaces, if any
    pub fn select(&mut self, model: ModelDescriptor) -> Result<Option<Outcome>, PlaygroundError> {
        if self.in_flight {
            return Err(PlaygroundError::RequestInFlight);
        }
        self.selected = Some(model);
        Ok(self.last.take())
    }

    pub fn selected(&self) -> Option<&ModelDescriptor> {
        self.selected.as_ref()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last(&self) -> Option<&Outcome> {
        self.last.as_ref()
    }

    /// Mark a request as started and return the model it targets
    pub fn begin(&mut self) -> Result<ModelDescriptor, PlaygroundError> {
        if self.in_flight {
            return Err(PlaygroundError::RequestInFlight);
        }
        let model = self
            .selected
            .clone()
            .ok_or(PlaygroundError::NoModelSelected)?;
        self.in_flight = true;
        Ok(model)
    }

    /// Mark a request as started that names its own model, such as direct
    /// image generation
    pub fn begin_direct(&mut self) -> Result<(), PlaygroundError> {
        if self.in_flight {
            return Err(PlaygroundError::RequestInFlight);
        }
        self.in_flight = true;
        Ok(())
    }

    /// Record the outcome of the in-flight request; returns the one it supersedes
    pub fn finish(&mut self, outcome: Outcome) -> Option<Outcome> {
        self.in_flight = false;
        self.last.replace(outcome)
    }

    /// Drop the in-flight request without an outcome; the last result stays
    pub fn abandon(&mut self) {
        self.in_flight = false;
    }

    pub fn snapshot(&self) -> PlaygroundSnapshot {
        PlaygroundSnapshot {
            selected: self.selected.as_ref().map(|m| m.id.clone()),
            in_flight: self.in_flight,
            has_result: self.last.is_some(),
        }
    }
}
