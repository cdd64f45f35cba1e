use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Key-addressed binary object storage.
///
/// Keys are flat names (`<uuid>.<ext>` for uploads); see [`validate_key`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Retrieve all bytes of an object.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError> {
        let data = self.get(key).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// Reject keys that are empty, nested, or traverse upwards.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.len() > 255 {
        return Err(StorageError::InvalidKey("key must be 1-255 bytes".into()));
    }
    if key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        return Err(StorageError::InvalidKey(format!("'{key}' is not a flat name")));
    }
    if key.chars().any(|c| c.is_control()) {
        return Err(StorageError::InvalidKey("key contains control characters".into()));
    }
    Ok(())
}
