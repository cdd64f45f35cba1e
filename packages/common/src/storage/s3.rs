use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::StorageError;
use super::traits::{ObjectStore, validate_key};
use crate::config::StorageAppConfig;

/// S3-compatible object store (AWS, MinIO).
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    max_size: u64,
}

impl S3ObjectStore {
    pub fn new(config: &StorageAppConfig) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(e.to_string()))?;
        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(backend)?
            .with_path_style();

        Ok(Self {
            bucket,
            max_size: config.max_upload_size,
        })
    }
}

fn backend(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_not_found(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

fn check_status(key: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for '{key}'"
        ))),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let actual = data.len() as u64;
        if actual > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual,
                limit: self.max_size,
            });
        }

        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(backend)?;
        check_status(key, response.status_code())?;

        debug!(key, bytes = actual, bucket = %self.bucket.name(), "Stored object in bucket");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        match self.bucket.get_object(key).await {
            Ok(response) => {
                check_status(key, response.status_code())?;
                Ok(response.bytes().to_vec())
            }
            Err(e) if is_not_found(&e) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(backend(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        match self.bucket.head_object(key).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) => check_status(key, status).map(|()| true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        if !self.exists(key).await? {
            return Ok(false);
        }
        let response = self.bucket.delete_object(key).await.map_err(backend)?;
        check_status(key, response.status_code())?;
        Ok(true)
    }
}
