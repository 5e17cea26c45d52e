use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching a model artifact
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Denied(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),

    #[error("Invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the same fetch could succeed if attempted again later
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::NotFound(_)
            | StoreError::Denied(_)
            | StoreError::InvalidKey(_)
            | StoreError::Config(_) => false,
            StoreError::Unavailable(_) | StoreError::Transport(_) => true,
            StoreError::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
        }
    }
}

/// Read-only access to serialized model artifacts
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetch the raw bytes stored under `key` in `store`
    async fn fetch(&self, store: &str, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Object store reached over HTTP with path-style addressing
///
/// `GET {endpoint}/{bucket}/{key}`, with each key segment percent-encoded.
pub struct HttpArtifactStore {
    endpoint: String,
    auth_token: Option<String>,
    client: Client,
}

impl HttpArtifactStore {
    /// Create a new HTTP artifact store
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            auth_token,
            client,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(bucket),
            encoded_key
        )
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.object_url(bucket, key);
        tracing::debug!("Fetching artifact from: {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        match status {
            s if s.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(format!("{}/{}", bucket, key))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Denied(format!(
                "{}/{} ({})",
                bucket, key, status
            ))),
            _ => Err(StoreError::Unavailable(format!(
                "GET {} returned {}",
                url, status
            ))),
        }
    }
}

/// Artifacts laid out on a local filesystem as `{root}/{bucket}/{key}`
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an artifact path, refusing anything that escapes the root
    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(bucket).join(key);

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if bucket.is_empty() || key.is_empty() || escapes {
            return Err(StoreError::InvalidKey(format!("{}/{}", bucket, key)));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(bucket, key)?;
        tracing::debug!("Reading artifact from: {}", path.display());

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                StoreError::Denied(path.display().to_string())
            }
            _ => StoreError::Io(e),
        })
    }
}
