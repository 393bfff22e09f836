//! The embedding index: one named collection in a [`VectorStore`], filled
//! and queried through one [`EmbeddingProvider`].
//!
//! Building embeds everything first and only then replaces the collection,
//! so an embedding failure never touches the live index. When the store
//! cannot replace a collection atomically, the swap is serialized against
//! searches with a read-preferring lock: searches share read guards, and the
//! swap takes the write guard once no search holds one, only for as long as
//! the store is being rewritten.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::swap::SwapLock;
use crate::vectorstore::VectorStore;

/// Embedding requests kept in flight at once while building.
const MAX_CONCURRENT_BATCHES: usize = 4;

/// A searchable collection of embedded chunks.
pub struct EmbeddingIndex {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
    timeout: Duration,
    built: AtomicBool,
    swap_lock: SwapLock,
}

impl EmbeddingIndex {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: &RagConfig,
    ) -> Self {
        Self {
            provider,
            store,
            collection: config.collection.clone(),
            batch_size: config.embed_batch_size.max(1),
            timeout: config.embed_timeout,
            built: AtomicBool::new(false),
            swap_lock: SwapLock::new(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Whether a build has completed (in this process or a previous one).
    pub fn is_built(&self) -> bool {
        self.built.load(Ordering::Acquire)
    }

    /// Adopt a collection persisted by an earlier run.
    ///
    /// Returns `true` if the collection exists and the index is searchable.
    pub async fn open(&self) -> Result<bool> {
        let exists = self.store.collection_exists(&self.collection).await?;
        if exists {
            self.built.store(true, Ordering::Release);
            let chunk_count = self.store.count(&self.collection).await?;
            info!(collection = %self.collection, chunk_count, "opened persisted index");
        } else {
            debug!(collection = %self.collection, "no persisted index found");
        }
        Ok(exists)
    }

    /// Embed `chunks` and replace the collection with them.
    ///
    /// Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Returns the embedding, timeout, or store error that stopped the build.
    /// The previous collection stays in place on embedding failures, and on
    /// store failures when the store replaces atomically.
    pub async fn build(&self, mut chunks: Vec<Chunk>) -> Result<usize> {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let requests: Vec<_> =
            texts.chunks(self.batch_size).map(|batch| self.embed_batch(batch)).collect();
        let batches: Vec<Vec<Vec<f32>>> = futures::stream::iter(requests)
            .buffered(MAX_CONCURRENT_BATCHES)
            .try_collect()
            .await?;
        let embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();

        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: self.provider.name().to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let dimensions = embeddings.first().map_or(self.provider.dimensions(), Vec::len);
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let replaced = if self.store.supports_atomic_replace() {
            self.store.replace_collection(&self.collection, dimensions, &chunks).await
        } else {
            let _swap = self.swap_lock.write().await;
            self.store.replace_collection(&self.collection, dimensions, &chunks).await
        };
        if let Err(e) = replaced {
            error!(collection = %self.collection, error = %e, "failed to replace collection");
            return Err(e);
        }

        self.built.store(true, Ordering::Release);
        let chunk_count = chunks.len();
        info!(collection = %self.collection, chunk_count, dimensions, "index built");
        Ok(chunk_count)
    }

    /// Return the `k` chunks nearest to `query`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotBuilt`] before the first successful build
    /// or [`open`](Self::open) of a persisted collection, [`RagError::Timeout`]
    /// if embedding the query exceeds the deadline, and store errors as-is.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if !self.is_built() {
            return Err(RagError::IndexNotBuilt { collection: self.collection.clone() });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.with_timeout(self.provider.embed(query)).await?;
        let results = if self.store.supports_atomic_replace() {
            self.store.search(&self.collection, &embedding, k).await?
        } else {
            let _read = self.swap_lock.read().await;
            self.store.search(&self.collection, &embedding, k).await?
        };

        debug!(
            collection = %self.collection,
            k,
            result_count = results.len(),
            "search completed"
        );
        Ok(results)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.with_timeout(self.provider.embed_batch(texts)).await
    }

    async fn with_timeout<T>(
        &self,
        call: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, call).await.map_err(|_| {
            error!(
                provider = self.provider.name(),
                timeout = ?self.timeout,
                "embedding call timed out"
            );
            RagError::Timeout {
                operation: format!("{} embed", self.provider.name()),
                after: self.timeout,
            }
        })?
    }
}
