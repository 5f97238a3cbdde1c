use std::fmt::Display;
use std::path::{Path, PathBuf};

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use log::info;

use crate::error::{LeadLensError, Result};

/// Persists a local file under `bucket/key`.
pub trait BlobStore {
    async fn upload(&self, path: &Path, bucket: &str, key: &str) -> Result<()>;
}

/// Amazon S3, or an S3-compatible service when an endpoint is given.
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Builds a client from the default AWS credential and region chain
    /// (environment, shared config files, instance metadata).
    ///
    /// `endpoint` points the client at an S3-compatible service and switches
    /// to path-style bucket addressing.
    pub async fn from_env(region: Option<&str>, endpoint: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_owned()));
        }
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(endpoint.is_some())
            .build();

        Self::with_client(Client::from_conf(config))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl BlobStore for S3Store {
    async fn upload(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| upload_error(bucket, key, e))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type(path))
            .body(body)
            .send()
            .await
            .map_err(|e| upload_error(bucket, key, DisplayErrorContext(e)))?;

        info!("Uploaded {} to s3://{bucket}/{key}", path.display());

        Ok(())
    }
}

/// Bucket emulated as a directory below `root`.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for LocalDirStore {
    async fn upload(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        let destination = self.root.join(bucket).join(key);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(path, &destination).await?;

        info!("Copied {} to {}", path.display(), destination.display());

        Ok(())
    }
}

/// Store selected at startup.
pub enum StorageBackend {
    S3(S3Store),
    Local(LocalDirStore),
}

impl BlobStore for StorageBackend {
    async fn upload(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        match self {
            Self::S3(store) => store.upload(path, bucket, key).await,
            Self::Local(store) => store.upload(path, bucket, key).await,
        }
    }
}

fn upload_error(bucket: &str, key: &str, reason: impl Display) -> LeadLensError {
    LeadLensError::Upload {
        bucket: bucket.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
