//! Decoded image payloads
//!
//! Blobs are produced by the core and owned by the caller. The core keeps no
//! reference to them; creating and releasing display handles is up to the
//! caller.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::UpstreamError;

pub const PNG_MIME: &str = "image/png";

/// Raw image bytes tagged with a MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    bytes: Vec<u8>,
    mime_type: String,
}

impl std::fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBlob")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl ImageBlob {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Decode standard base64 into an `image/png` blob
    pub fn from_base64_png(data: &str) -> Result<Self, UpstreamError> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| UpstreamError::InvalidResponse(format!("Invalid base64 image data: {}", e)))?;
        Ok(Self::new(bytes, PNG_MIME))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Self-contained `data:` URL for the blob
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

impl Serialize for ImageBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ImageBlob", 2)?;
        s.serialize_field("mime_type", &self.mime_type)?;
        s.serialize_field("data_url", &self.to_data_url())?;
        s.end()
    }
}

/// Pull `data[0].b64_json` out of an image-generation response and decode it
pub fn decode_generation_response(body: &Value) -> Result<ImageBlob, UpstreamError> {
    let b64 = body
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|first| first.get("b64_json"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            UpstreamError::InvalidResponse(
                "Invalid response format from image generation API".to_string(),
            )
        })?;
    ImageBlob::from_base64_png(b64)
}
