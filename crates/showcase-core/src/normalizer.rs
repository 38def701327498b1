//! Response normalizer: structural classification of upstream payloads
//!
//! The upstream API does not say what shape it returned, so the payload is
//! matched field by field. Rules run in a fixed order and the first match
//! wins. Payloads can satisfy several rules at once (a chat object that also
//! has a `text` field, an array item with both `label` and `box`), so the
//! order decides the outcome and must not be rearranged.

use serde_json::{Map, Value};

use crate::render::{
    BoundingBox, Classification, Detection, ImageRef, ImageResult, ListItem, RenderIntent,
};

/// Classify a successful payload into exactly one render-intent
pub fn normalize(payload: &Value) -> RenderIntent {
    if let Some(obj) = payload.as_object() {
        if tag_is(obj, "image_generation") && field_truthy(obj, "imageUrl") {
            return RenderIntent::Image(ImageResult {
                image: ImageRef::Url(text_of(&obj["imageUrl"])),
                prompt: string_field(obj, "prompt"),
                model: string_field(obj, "model"),
            });
        }
        if tag_is(obj, "chat") && field_truthy(obj, "generated_text") {
            return RenderIntent::Chat {
                text: text_of(&obj["generated_text"]),
                model: string_field(obj, "model"),
            };
        }
    }

    if let Some(items) = payload.as_array() {
        if let Some(first) = items.first().and_then(Value::as_object) {
            if field_truthy(first, "generated_text") {
                return RenderIntent::Text {
                    text: text_of(&first["generated_text"]),
                };
            }
            // detection items carry a label too; a box marks them as detections
            if field_truthy(first, "label") && !field_truthy(first, "box") {
                return RenderIntent::Classification {
                    entries: items.iter().map(classification).collect(),
                };
            }
            if field_truthy(first, "box") {
                return RenderIntent::Detection {
                    entries: items.iter().map(detection).collect(),
                };
            }
        }
    }

    if let Some(obj) = payload.as_object() {
        if field_truthy(obj, "text") {
            return RenderIntent::Transcription {
                text: text_of(&obj["text"]),
            };
        }
    }

    match payload {
        Value::String(s) => RenderIntent::String { text: s.clone() },
        Value::Array(items) => RenderIntent::List {
            items: items.iter().map(list_item).collect(),
        },
        Value::Object(_) => RenderIntent::Struct {
            raw: payload.clone(),
        },
        other => RenderIntent::String {
            text: other.to_string(),
        },
    }
}

/// Truthiness as the upstream JSON consumers see it: `null`, `false`, `0`,
/// `NaN` and `""` are falsy; arrays and objects are always truthy
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn field_truthy(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(truthy)
}

fn tag_is(obj: &Map<String, Value>, tag: &str) -> bool {
    obj.get("type").and_then(Value::as_str) == Some(tag)
}

/// String content, or the JSON text for anything else
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).map(text_of).unwrap_or_default()
}

fn number_field(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn label_of(value: &Value) -> String {
    value.get("label").map(text_of).unwrap_or_default()
}

fn classification(item: &Value) -> Classification {
    Classification {
        label: label_of(item),
        score: number_field(item, "score"),
    }
}

fn detection(item: &Value) -> Detection {
    let bbox = item.get("box").cloned().unwrap_or(Value::Null);
    Detection {
        label: label_of(item),
        score: number_field(item, "score"),
        bbox: BoundingBox {
            xmin: number_field(&bbox, "xmin"),
            ymin: number_field(&bbox, "ymin"),
            xmax: number_field(&bbox, "xmax"),
            ymax: number_field(&bbox, "ymax"),
        },
    }
}

fn list_item(item: &Value) -> ListItem {
    match item {
        Value::Object(fields) => ListItem::Fields(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), field_display(v)))
                .collect(),
        ),
        other => ListItem::Literal(text_of(other)),
    }
}

/// Numbers get four decimals in key/value listings
fn field_display(value: &Value) -> String {
    match value.as_f64() {
        Some(n) if value.is_number() => format!("{:.4}", n),
        _ => text_of(value),
    }
}
