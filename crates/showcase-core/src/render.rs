//! Render-intents: typed descriptions of how a result should be displayed

use serde::Serialize;
use serde_json::Value;

use crate::image::ImageBlob;

/// How many classification entries are shown
pub const CLASSIFICATION_DISPLAY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderIntent {
    Image(ImageResult),
    Chat { text: String, model: String },
    Text { text: String },
    /// Entries in the order received; truncation happens at render time
    Classification { entries: Vec<Classification> },
    Detection { entries: Vec<Detection> },
    Transcription { text: String },
    String { text: String },
    List { items: Vec<ListItem> },
    Struct { raw: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageResult {
    pub image: ImageRef,
    pub prompt: String,
    pub model: String,
}

/// Where the image to display lives
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRef {
    /// An already-resolvable display handle
    Url(String),
    /// Freshly decoded bytes; the caller turns these into a handle
    Inline(ImageBlob),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub score: f64,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListItem {
    Fields(Vec<(String, String)>),
    Literal(String),
}

impl RenderIntent {
    /// Short heading for the result block
    pub fn title(&self) -> &'static str {
        match self {
            Self::Image(_) => "Generated Image",
            Self::Chat { .. } => "Chat Response",
            Self::Text { .. } => "Generated Text",
            Self::Classification { .. } => "Classification Results",
            Self::Detection { .. } => "Detected Objects",
            Self::Transcription { .. } => "Transcription",
            Self::String { .. } => "Result",
            Self::List { .. } => "Results",
            Self::Struct { .. } => "Raw Result",
        }
    }

    /// The copyable text of text-like intents
    pub fn primary_text(&self) -> Option<&str> {
        match self {
            Self::Chat { text, .. }
            | Self::Text { text }
            | Self::Transcription { text }
            | Self::String { text } => Some(text),
            _ => None,
        }
    }

    /// Plain-text rendering, one display line per entry
    pub fn to_lines(&self) -> Vec<String> {
        match self {
            Self::Image(img) => {
                let location = match &img.image {
                    ImageRef::Url(url) => url.clone(),
                    ImageRef::Inline(blob) => {
                        format!("<{} bytes, {}>", blob.len(), blob.mime_type())
                    }
                };
                vec![
                    format!("Image: {}", location),
                    format!("Prompt: {}", img.prompt),
                    format!("Model: {}", img.model),
                ]
            }
            Self::Chat { text, .. }
            | Self::Text { text }
            | Self::Transcription { text }
            | Self::String { text } => text.lines().map(str::to_string).collect(),
            Self::Classification { entries } => entries
                .iter()
                .take(CLASSIFICATION_DISPLAY_LIMIT)
                .map(|c| format!("{:<32} {}", c.label, percent(c.score)))
                .collect(),
            Self::Detection { entries } => entries
                .iter()
                .map(|d| {
                    format!(
                        "{:<20} {}  position: ({}, {}) to ({}, {})",
                        d.label,
                        percent(d.score),
                        d.bbox.xmin,
                        d.bbox.ymin,
                        d.bbox.xmax,
                        d.bbox.ymax
                    )
                })
                .collect(),
            Self::List { items } => items
                .iter()
                .enumerate()
                .flat_map(|(i, item)| {
                    let mut lines = vec![format!("[{}]", i + 1)];
                    match item {
                        ListItem::Fields(fields) => {
                            lines.extend(fields.iter().map(|(k, v)| format!("  {}: {}", k, v)))
                        }
                        ListItem::Literal(s) => lines.push(format!("  {}", s)),
                    }
                    lines
                })
                .collect(),
            Self::Struct { raw } => serde_json::to_string_pretty(raw)
                .unwrap_or_else(|_| raw.to_string())
                .lines()
                .map(str::to_string)
                .collect(),
        }
    }
}

fn percent(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}
