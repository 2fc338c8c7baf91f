//! Media object storage for uploaded videos, thumbnails and profile images.

use std::path::Path;

pub mod local;
pub mod upload;

pub use local::LocalMediaStorage;
pub use upload::{StagedFile, UploadForm};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid media key: {0}")]
    InvalidKey(String),
}

/// A stored object: `key` addresses it in the store, `url` is what clients get.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub key: String,
    pub url: String,
    /// Playback length in seconds, when the backend can tell.
    pub duration: Option<f64>,
}

pub trait MediaStorage: Send + Sync {
    fn store(&self, source: &Path, extension: Option<&str>) -> Result<StoredMedia, MediaError>;
    /// Removing a missing object is not an error.
    fn remove(&self, key: &str) -> Result<(), MediaError>;
}

/// Cleanup whose failure must not change the request outcome.
pub fn remove_best_effort(storage: &dyn MediaStorage, key: &str) {
    if let Err(err) = storage.remove(key) {
        tracing::warn!(key, error = %err, "Failed to remove media object");
    }
}
