//! Blob store: generated images held for display until released

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use showcase_core::ImageBlob;

/// URL prefix under which stored blobs are served
pub const BLOB_ROUTE_PREFIX: &str = "/api/blobs/";

pub struct BlobStore {
    blobs: Arc<RwLock<HashMap<String, ImageBlob>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a blob; returns its id
    pub async fn insert(&self, blob: ImageBlob) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        debug!("Stored blob {} ({} bytes)", id, blob.len());
        self.blobs.write().await.insert(id.clone(), blob);
        id
    }

    pub async fn get(&self, id: &str) -> Option<ImageBlob> {
        self.blobs.read().await.get(id).cloned()
    }

    /// Drop a blob; returns whether it existed
    pub async fn release(&self, id: &str) -> bool {
        let removed = self.blobs.write().await.remove(id).is_some();
        if removed {
            debug!("Released blob {}", id);
        }
        removed
    }

    pub async fn count(&self) -> usize {
        self.blobs.read().await.len()
    }
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Display URL for a stored blob
pub fn blob_url(id: &str) -> String {
    format!("{}{}", BLOB_ROUTE_PREFIX, id)
}

/// Blob id from a display URL, if it points into the store
pub fn blob_id(url: &str) -> Option<&str> {
    url.strip_prefix(BLOB_ROUTE_PREFIX).filter(|id| !id.is_empty())
}
