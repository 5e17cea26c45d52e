use crate::core::classifier::{decode_artifact, ArtifactError, SharedModel};
use crate::models::ArtifactKey;
use crate::services::store::{ArtifactStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while acquiring a model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0}")]
    Unavailable(#[from] StoreError),

    #[error("{0}")]
    Corrupt(#[from] ArtifactError),
}

/// Process-wide cache of loaded models
///
/// Holds one decoded model per `(store, key)` for the lifetime of the
/// process. Entries are never evicted; artifacts are assumed immutable
/// under their key. Concurrent first use of a key is coalesced so the
/// store is read at most once, and failed loads are not cached.
pub struct ModelCache {
    store: Arc<dyn ArtifactStore>,
    models: moka::future::Cache<ArtifactKey, SharedModel>,
}

impl ModelCache {
    /// Create an empty cache backed by `store`
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        // No capacity bound and no TTL: entries live until the process exits
        let models = moka::future::Cache::builder().build();

        Self { store, models }
    }

    /// Return the model for `(store, key)`, loading it on first use
    pub async fn acquire(&self, store: &str, key: &str) -> Result<SharedModel, Arc<ModelError>> {
        let cache_key = ArtifactKey::new(store, key);

        if let Some(model) = self.models.get(&cache_key).await {
            tracing::debug!("Model loaded from cache: {}", cache_key);
            return Ok(model);
        }

        self.models
            .try_get_with(cache_key.clone(), self.load(&cache_key))
            .await
    }

    async fn load(&self, cache_key: &ArtifactKey) -> Result<SharedModel, ModelError> {
        tracing::info!("Loading model from store: {}", cache_key);

        let bytes = self.store.fetch(&cache_key.store, &cache_key.key).await.map_err(|e| {
            if e.is_retryable() {
                tracing::warn!("Model {} temporarily unavailable: {}", cache_key, e);
            } else {
                tracing::error!("Failed to fetch model {}: {}", cache_key, e);
            }
            ModelError::Unavailable(e)
        })?;

        let model = decode_artifact(&bytes).map_err(|e| {
            tracing::error!("Failed to decode model {}: {}", cache_key, e);
            ModelError::Corrupt(e)
        })?;

        tracing::info!(
            "Model {} loaded ({} bytes, {} classes)",
            cache_key,
            bytes.len(),
            model.classes().len()
        );

        Ok(model)
    }

    /// Number of models currently held
    pub async fn cached_models(&self) -> u64 {
        // entry_count lags until pending housekeeping has run
        self.models.run_pending_tasks().await;
        self.models.entry_count()
    }
}
