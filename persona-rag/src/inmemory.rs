//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for tests
//! and for runs where the index need not survive a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, cosine_similarity, rank_results};

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    /// Insertion order is kept so equal scores rank deterministically.
    chunks: Vec<Chunk>,
}

impl Collection {
    fn upsert(&mut self, chunk: &Chunk) {
        match self.chunks.iter_mut().find(|c| c.id == chunk.id) {
            Some(existing) => *existing = chunk.clone(),
            None => self.chunks.push(chunk.clone()),
        }
    }
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored in a map of collection name → ordered chunks.
/// [`replace_collection`](VectorStore::replace_collection) swaps the whole
/// collection under a single write guard, so it is atomic.
///
/// # Example
///
/// ```rust,ignore
/// use persona_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("personal_data", 1024).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

fn check_dimensions(collection: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!(
                "collection '{collection}' holds {expected}-dimensional vectors, got {actual}"
            ),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection { dimensions, chunks: Vec::new() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(store.chunks.len())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        for chunk in chunks {
            check_dimensions(collection, store.dimensions, chunk.embedding.len())?;
        }
        for chunk in chunks {
            store.upsert(chunk);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        store.chunks.retain(|chunk| !ids.contains(&chunk.id.as_str()));
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        check_dimensions(collection, store.dimensions, embedding.len())?;

        let scored: Vec<SearchResult> = store
            .chunks
            .iter()
            .map(|chunk| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(&chunk.embedding, embedding),
                rank: 0,
            })
            .collect();

        Ok(rank_results(scored, top_k))
    }

    async fn replace_collection(
        &self,
        name: &str,
        dimensions: usize,
        chunks: &[Chunk],
    ) -> Result<()> {
        let mut fresh = Collection { dimensions, chunks: Vec::with_capacity(chunks.len()) };
        for chunk in chunks {
            check_dimensions(name, dimensions, chunk.embedding.len())?;
            fresh.upsert(chunk);
        }
        self.collections.write().await.insert(name.to_string(), fresh);
        Ok(())
    }

    fn supports_atomic_replace(&self) -> bool {
        true
    }
}
