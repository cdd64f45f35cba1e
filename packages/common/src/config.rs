use std::path::PathBuf;

use serde::Deserialize;

/// Which object store implementation backs uploads.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    S3,
}

/// App-level object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Backend selection. Default: filesystem.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./data/uploads".
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// S3/MinIO endpoint URL, e.g. "http://localhost:9000".
    #[serde(default)]
    pub endpoint: String,
    /// Region name sent to the S3 endpoint. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket holding uploaded objects. Default: "uploads".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// Largest accepted upload in bytes. Default: 10 MB.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Filesystem
}
fn default_path() -> PathBuf {
    PathBuf::from("./data/uploads")
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_bucket() -> String {
    "uploads".into()
}
fn default_max_upload_size() -> u64 {
    10_000_000
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_path(),
            endpoint: String::new(),
            region: default_region(),
            bucket: default_bucket(),
            access_key: String::new(),
            secret_key: String::new(),
            max_upload_size: default_max_upload_size(),
        }
    }
}
