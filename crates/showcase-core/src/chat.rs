//! Chat transcripts and sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ShowcaseError};
use crate::render::RenderIntent;
use crate::router::{Conversation, InferenceRouter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Failed turn shown to the user; never sent back upstream
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content.into(), false)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content.into(), false)
    }

    pub fn error(err: &ShowcaseError) -> Self {
        Self::new(ChatRole::Assistant, format!("Error: {}", err), true)
    }

    fn new(role: ChatRole, content: String, is_error: bool) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
            is_error,
        }
    }
}

/// Append-only message log for one conversation
#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    entries: Vec<ChatEntry>,
    welcome: Option<String>,
}

impl ChatTranscript {
    /// Empty transcript, or one seeded with a welcome entry
    pub fn new(welcome: Option<String>) -> Self {
        let mut transcript = Self {
            entries: Vec::new(),
            welcome: welcome.filter(|w| !w.trim().is_empty()),
        };
        transcript.reset();
        transcript
    }

    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear back to empty, or to the welcome entry if one was configured
    pub fn reset(&mut self) {
        self.entries.clear();
        if let Some(welcome) = &self.welcome {
            self.entries.push(ChatEntry::assistant(welcome.clone()));
        }
    }
}

/// One conversation with one chat model
#[derive(Debug, Clone)]
pub struct ChatSession {
    model_id: String,
    system_prompt: Option<String>,
    transcript: ChatTranscript,
}

impl ChatSession {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            system_prompt: None,
            transcript: ChatTranscript::default(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    /// Seed the transcript with a welcome entry; also restored on reset
    pub fn with_welcome(mut self, welcome: impl Into<String>) -> Self {
        self.transcript = ChatTranscript::new(Some(welcome.into()));
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    /// Switch models; the conversation starts over
    pub fn set_model(&mut self, model_id: impl Into<String>) {
        self.model_id = model_id.into();
        self.transcript.reset();
    }

    pub fn reset(&mut self) {
        self.transcript.reset();
    }

    /// Send one user turn.
    ///
    /// The user entry is appended first. On success the reply is appended; on
    /// failure an `Error: ...` entry is appended and the error returned.
    pub async fn send(&mut self, router: &InferenceRouter, text: &str) -> Result<RenderIntent> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ShowcaseError::UnsupportedInput(
                "message must not be empty".to_string(),
            ));
        }

        let conversation = Conversation {
            system: self.system_prompt.as_deref(),
            history: self.transcript.entries(),
        };
        let outcome = router.chat(&self.model_id, conversation, text).await;

        self.transcript.push(ChatEntry::user(text));
        match outcome {
            Ok(intent) => {
                let reply = intent.primary_text().unwrap_or_default().to_string();
                debug!("Chat reply: {} chars, transcript={}", reply.len(), self.transcript.len() + 1);
                self.transcript.push(ChatEntry::assistant(reply));
                Ok(intent)
            }
            Err(e) => {
                self.transcript.push(ChatEntry::error(&e));
                Err(e)
            }
        }
    }
}
