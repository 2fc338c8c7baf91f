use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{MediaError, MediaStorage, StoredMedia};

/// Files under a local directory, served by the router at `/media`.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Result<Self, MediaError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, MediaError> {
        let flat = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\'])
            && !key.contains("..");
        if !flat {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/media/{}", self.public_base_url, key)
    }
}

fn clean_extension(extension: &str) -> Option<String> {
    let extension = extension.trim_start_matches('.');
    let valid = !extension.is_empty()
        && extension.len() <= 10
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| extension.to_ascii_lowercase())
}

impl MediaStorage for LocalMediaStorage {
    fn store(&self, source: &Path, extension: Option<&str>) -> Result<StoredMedia, MediaError> {
        let id = Uuid::new_v4().simple().to_string();
        let key = match extension.and_then(clean_extension) {
            Some(extension) => format!("{id}.{extension}"),
            None => id,
        };

        fs::copy(source, self.path_for(&key)?)?;
        tracing::debug!(key, "Stored media object");

        Ok(StoredMedia {
            url: self.url_for(&key),
            key,
            duration: None,
        })
    }

    fn remove(&self, key: &str) -> Result<(), MediaError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn source(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn store_copies_under_random_key() {
        let dir = TempDir::new().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "http://localhost:3000/").unwrap();
        let file = source(b"frames");

        let stored = storage.store(file.path(), Some("MP4")).unwrap();

        assert!(stored.key.ends_with(".mp4"));
        assert_eq!(stored.url, format!("http://localhost:3000/media/{}", stored.key));
        assert!(stored.duration.is_none());
        assert_eq!(fs::read(dir.path().join(&stored.key)).unwrap(), b"frames");
    }

    #[test]
    fn hostile_extension_is_dropped() {
        let dir = TempDir::new().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "http://cdn").unwrap();
        let file = source(b"x");

        let stored = storage.store(file.path(), Some("../../etc")).unwrap();
        assert!(!stored.key.contains('.'));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "http://cdn").unwrap();
        let stored = storage.store(source(b"x").path(), None).unwrap();

        storage.remove(&stored.key).unwrap();
        storage.remove(&stored.key).unwrap();
        assert!(!dir.path().join(&stored.key).exists());
    }

    #[test]
    fn keys_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "http://cdn").unwrap();

        for key in ["../secret", "a/b", "..", "", "a\\b"] {
            assert!(matches!(storage.remove(key), Err(MediaError::InvalidKey(_))), "{key}");
        }
    }
}
