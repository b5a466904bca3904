use async_trait::async_trait;
use log::{error, info, warn};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{MediaBackend, Settings};

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("duplicate")]
    Duplicate,
    #[error("not_found")]
    NotFound,
    #[error("invalid key")]
    InvalidKey,
    #[error("other: {0}")]
    Other(String),
}

/// Blob storage for post images. Keys are relative paths such as
/// `posts/<sha256>.png`; saving an existing key reports `Duplicate`.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(&self, key: &str, mime: &str, bytes: &[u8]) -> Result<(), ImageStoreError>;
    async fn load(&self, key: &str) -> Result<(Vec<u8>, String), ImageStoreError>;
}

fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".into())
}

/// Rejects absolute keys and any `..` segment.
pub fn validate_key(key: &str) -> Result<&Path, ImageStoreError> {
    let path = Path::new(key);
    if key.is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(ImageStoreError::InvalidKey);
    }
    Ok(path)
}

// ---------------- Filesystem implementation (MEDIA_ROOT) ----------------
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ImageStoreError> {
        Ok(self.root.join(validate_key(key)?))
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, key: &str, _mime: &str, bytes: &[u8]) -> Result<(), ImageStoreError> {
        let path = self.path_for(key)?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ImageStoreError::Duplicate);
        }
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ImageStoreError::Other(e.to_string()))?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            error!("write failed key={key} path={}: {e}", path.display());
            ImageStoreError::Other(e.to_string())
        })
    }

    async fn load(&self, key: &str) -> Result<(Vec<u8>, String), ImageStoreError> {
        let path = self.path_for(key)?;
        let bytes = tokio::fs::read(&path).await.map_err(|_| ImageStoreError::NotFound)?;
        let mime = sniff_mime(&bytes);
        Ok((bytes, mime))
    }
}

// ---------------- S3 implementation (MinIO compatible) ----------------
pub struct S3ImageStore {
    bucket: String,
    client: aws_sdk_s3::Client,
    prefix: String,
}

impl S3ImageStore {
    pub async fn new() -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "yatube-media".into());
        let endpoint = std::env::var("S3_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("S3_ENDPOINT must be set when MEDIA_BACKEND=s3"))?;
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let access = std::env::var("S3_ACCESS_KEY").unwrap_or_default();
        let secret = std::env::var("S3_SECRET_KEY").unwrap_or_default();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region))
            .endpoint_url(endpoint);
        if !access.is_empty() && !secret.is_empty() {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // path-style addressing: MinIO and local endpoints have no wildcard DNS
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!("initialised S3 media client for bucket '{bucket}'");

        if let Err(e) = client.head_bucket().bucket(&bucket).send().await {
            warn!("head_bucket failed for '{bucket}', creating it: {e:?}");
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                match client.create_bucket().bucket(&bucket).send().await {
                    Ok(_) => {
                        info!("created bucket '{bucket}' (attempt {attempt})");
                        break;
                    }
                    Err(e2) if attempt >= 5 => {
                        error!("create_bucket failed for '{bucket}' after {attempt} attempts: {e2:?}");
                        return Err(anyhow::anyhow!("failed to ensure bucket '{bucket}': {e2}"));
                    }
                    Err(e2) => {
                        let backoff_ms = 200 * u64::from(attempt).pow(2);
                        warn!("create_bucket attempt {attempt} failed: {e2:?} (retrying in {backoff_ms}ms)");
                        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Ok(Self::from_client(client, bucket))
    }

    /// Wraps an already configured client; objects land under `media/`.
    pub fn from_client(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self { bucket: bucket.into(), client, prefix: "media".into() }
    }

    fn object_key(&self, key: &str) -> Result<String, ImageStoreError> {
        validate_key(key)?;
        Ok(format!("{}/{}", self.prefix, key))
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn save(&self, key: &str, mime: &str, bytes: &[u8]) -> Result<(), ImageStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let object = self.object_key(key)?;
        if self.client.head_object().bucket(&self.bucket).key(&object).send().await.is_ok() {
            return Err(ImageStoreError::Duplicate);
        }
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object)
            .content_type(mime)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|e| {
                error!("put_object failed key={object} bucket={}: {e:?}", self.bucket);
                ImageStoreError::Other(e.to_string())
            })?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<(Vec<u8>, String), ImageStoreError> {
        let object = self.object_key(key)?;
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object)
            .send()
            .await
            .map_err(|_| ImageStoreError::NotFound)?;
        let data = obj
            .body
            .collect()
            .await
            .map_err(|e| ImageStoreError::Other(e.to_string()))?;
        let bytes = data.into_bytes().to_vec();
        let mime = sniff_mime(&bytes);
        Ok((bytes, mime))
    }
}

pub async fn build_image_store(settings: &Settings) -> anyhow::Result<Arc<dyn ImageStore>> {
    match settings.media_backend {
        MediaBackend::Fs => {
            info!("serving media from '{}'", settings.media_root.display());
            Ok(Arc::new(FsImageStore::new(settings.media_root.clone())))
        }
        MediaBackend::S3 => Ok(Arc::new(S3ImageStore::new().await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_cannot_escape_the_media_root() {
        assert!(validate_key("posts/abc.png").is_ok());
        assert!(matches!(validate_key("../etc/passwd"), Err(ImageStoreError::InvalidKey)));
        assert!(matches!(validate_key("/etc/passwd"), Err(ImageStoreError::InvalidKey)));
        assert!(matches!(validate_key("posts/../../x"), Err(ImageStoreError::InvalidKey)));
        assert!(matches!(validate_key(""), Err(ImageStoreError::InvalidKey)));
    }

    #[tokio::test]
    async fn fs_store_round_trips_and_reports_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        store.save("posts/a.gif", "image/gif", gif).await.unwrap();
        assert!(matches!(
            store.save("posts/a.gif", "image/gif", gif).await,
            Err(ImageStoreError::Duplicate)
        ));
        let (bytes, mime) = store.load("posts/a.gif").await.unwrap();
        assert_eq!(bytes, gif);
        assert_eq!(mime, "image/gif");
        assert!(matches!(store.load("posts/b.gif").await, Err(ImageStoreError::NotFound)));
    }

    fn offline_s3() -> S3ImageStore {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:9")
            .force_path_style(true)
            .build();
        S3ImageStore::from_client(aws_sdk_s3::Client::from_conf(conf), "yatube-test")
    }

    #[test]
    fn s3_objects_live_under_the_media_prefix() {
        let store = offline_s3();
        assert_eq!(store.object_key("posts/abc.png").unwrap(), "media/posts/abc.png");
        assert!(matches!(store.object_key("../secrets"), Err(ImageStoreError::InvalidKey)));
    }

    #[tokio::test]
    async fn s3_store_rejects_bad_keys_before_any_request() {
        let store = offline_s3();
        assert!(matches!(
            store.save("/abs.png", "image/png", b"x").await,
            Err(ImageStoreError::InvalidKey)
        ));
        assert!(matches!(store.load("posts/../../x").await, Err(ImageStoreError::InvalidKey)));
    }
}
