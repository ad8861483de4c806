//! Photo storage
//!
//! Originals and thumbnails go either to a local directory (served under
//! `/media`) or to a Cloudflare R2 bucket behind a public domain.

use aws_sdk_s3::Client as S3Client;
use rand::RngCore;
use std::path::{Path, PathBuf};

use crate::config::{R2Config, StorageBackend, StorageConfig};
use crate::error::AppError;

enum Backend {
    Local { root: PathBuf },
    R2 { client: S3Client, bucket: String },
}

/// Where a stored photo and its thumbnail ended up
#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub key: String,
    pub url: String,
    pub thumbnail_key: String,
    pub thumbnail_url: String,
}

/// Media storage service
pub struct MediaStorage {
    backend: Backend,
    /// Public URL base, e.g. "/media" or "https://media.example.com"
    public_url: String,
}

impl MediaStorage {
    /// Create storage for the configured backend
    ///
    /// # Errors
    /// Returns error if the local directory cannot be created or R2
    /// credentials are missing
    pub async fn new(config: &StorageConfig) -> Result<Self, AppError> {
        let backend = match config.backend {
            StorageBackend::Local => {
                tokio::fs::create_dir_all(&config.local_dir)
                    .await
                    .map_err(|e| {
                        AppError::Storage(format!(
                            "cannot create {}: {}",
                            config.local_dir.display(),
                            e
                        ))
                    })?;
                Backend::Local {
                    root: config.local_dir.clone(),
                }
            }
            StorageBackend::R2 => {
                let r2 = config.r2.as_ref().ok_or_else(|| {
                    AppError::Config("storage.r2 must be set when storage.backend is r2".into())
                })?;
                Backend::R2 {
                    client: build_r2_client(r2),
                    bucket: r2.bucket.clone(),
                }
            }
        };

        Ok(Self {
            backend,
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }

    /// Store an original upload and its JPEG thumbnail under a fresh random stem
    pub async fn store_photo(
        &self,
        extension: &str,
        data: Vec<u8>,
        content_type: &str,
        thumbnail: Vec<u8>,
    ) -> Result<StoredPhoto, AppError> {
        let stem = random_stem();
        let key = format!("photos/{}.{}", stem, extension);
        let thumbnail_key = format!("thumbnails/{}.jpg", stem);

        let url = self.upload(&key, data, content_type).await?;
        let thumbnail_url = match self.upload(&thumbnail_key, thumbnail, "image/jpeg").await {
            Ok(url) => url,
            Err(error) => {
                if let Err(cleanup) = self.delete(&key).await {
                    tracing::warn!(
                        key = %key,
                        error = %cleanup,
                        "Failed to remove orphaned upload"
                    );
                }
                return Err(error);
            }
        };

        Ok(StoredPhoto {
            key,
            url,
            thumbnail_key,
            thumbnail_url,
        })
    }

    /// Upload a file and return its public URL
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        match &self.backend {
            Backend::Local { root } => {
                let path = local_path(root, key)?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| AppError::Storage(format!("local upload failed: {}", e)))?;
                }
                tokio::fs::write(&path, data)
                    .await
                    .map_err(|e| AppError::Storage(format!("local upload failed: {}", e)))?;
            }
            Backend::R2 { client, bucket } => {
                use aws_sdk_s3::primitives::ByteStream;

                client
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .body(ByteStream::from(data))
                    .content_type(content_type)
                    .cache_control("public, max-age=31536000")
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;
            }
        }

        Ok(self.get_public_url(key))
    }

    /// Delete a stored file; a missing local file is not an error
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Local { root } => {
                let path = local_path(root, key)?;
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(AppError::Storage(format!("local delete failed: {}", e))),
                }
            }
            Backend::R2 { client, bucket } => {
                client
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;
                Ok(())
            }
        }
    }

    pub fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    /// Directory served under `/media`, for the local backend
    pub fn local_root(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Local { root } => Some(root.as_path()),
            Backend::R2 { .. } => None,
        }
    }
}

fn build_r2_client(r2: &R2Config) -> S3Client {
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    let endpoint = format!("https://{}.r2.cloudflarestorage.com", r2.account_id);
    let credentials = Credentials::new(
        &r2.access_key_id,
        &r2.secret_access_key,
        None,
        None,
        "campusphoto-r2",
    );

    let s3_config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .http_client(super::build_r2_http_client())
        .region(Region::new("auto"))
        .endpoint_url(&endpoint)
        .credentials_provider(credentials)
        .build();

    S3Client::from_conf(s3_config)
}

/// Resolve a storage key below `root`, refusing path traversal
fn local_path(root: &Path, key: &str) -> Result<PathBuf, AppError> {
    let relative = Path::new(key);
    let safe = relative
        .components()
        .all(|component| matches!(component, std::path::Component::Normal(_)));
    if !safe || key.is_empty() {
        return Err(AppError::Storage(format!("invalid storage key: {}", key)));
    }
    Ok(root.join(relative))
}

fn random_stem() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
