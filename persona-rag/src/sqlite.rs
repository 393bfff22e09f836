//! SQLite vector store backend.
//!
//! Provides [`SqliteVectorStore`], a durable [`VectorStore`] built on
//! [sqlx](https://docs.rs/sqlx). Collections survive process restarts and
//! [`replace_collection`](VectorStore::replace_collection) runs in a single
//! transaction, so readers see either the old or the new collection.
//!
//! Vectors are stored as little-endian `f32` blobs and scored in process with
//! cosine similarity, which is plenty for one person's record.
//!
//! # Example
//!
//! ```rust,ignore
//! use persona_rag::SqliteVectorStore;
//!
//! let store = SqliteVectorStore::open("persona_index.db").await?;
//! store.replace_collection("personal_data", 1536, &chunks).await?;
//! let results = store.search("personal_data", &query_embedding, 3).await?;
//! ```

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use crate::document::{Chunk, Metadata, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, cosine_similarity, rank_results};

const BACKEND: &str = "sqlite";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS rag_collections (\
        name TEXT PRIMARY KEY, \
        dimensions INTEGER NOT NULL, \
        updated_at TEXT NOT NULL\
    )",
    "CREATE TABLE IF NOT EXISTS rag_chunks (\
        collection TEXT NOT NULL, \
        id TEXT NOT NULL, \
        position INTEGER NOT NULL, \
        document_id TEXT NOT NULL, \
        text TEXT NOT NULL, \
        metadata TEXT NOT NULL, \
        embedding BLOB NOT NULL, \
        PRIMARY KEY (collection, id)\
    )",
];

const UPSERT_CHUNK: &str = "INSERT INTO rag_chunks \
        (collection, id, position, document_id, text, metadata, embedding) \
     VALUES (?, ?, ?, ?, ?, ?, ?) \
     ON CONFLICT (collection, id) DO UPDATE SET \
        document_id = excluded.document_id, \
        text = excluded.text, \
        metadata = excluded.metadata, \
        embedding = excluded.embedding";

/// A [`VectorStore`] persisted in a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(map_err)?;
        debug!(path = %path.as_ref().display(), "opened sqlite vector store");
        Self::from_pool(pool).await
    }

    /// A private in-memory database, mainly for tests.
    pub async fn in_memory() -> Result<Self> {
        // Every connection to `:memory:` is a separate database, so pin one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await
            .map_err(map_err)?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(map_err)?;
        }
        Ok(Self { pool })
    }

    /// Close the underlying pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn dimensions(&self, collection: &str) -> Result<Option<usize>> {
        let row = sqlx::query("SELECT dimensions FROM rag_collections WHERE name = ?")
            .bind(collection)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.map(|row| row.try_get::<i64, _>("dimensions").map(|d| d as usize))
            .transpose()
            .map_err(map_err)
    }

    async fn require_dimensions(&self, collection: &str) -> Result<usize> {
        self.dimensions(collection).await?.ok_or_else(|| missing(collection))
    }
}

fn map_err(e: sqlx::Error) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
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

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

async fn insert_chunks(
    tx: &mut Transaction<'_, Sqlite>,
    collection: &str,
    first_position: i64,
    chunks: &[Chunk],
) -> Result<()> {
    for (offset, chunk) in chunks.iter().enumerate() {
        let metadata = serde_json::to_string(&chunk.metadata).map_err(|e| {
            RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
        })?;
        sqlx::query(UPSERT_CHUNK)
            .bind(collection)
            .bind(&chunk.id)
            .bind(first_position + offset as i64)
            .bind(&chunk.document_id)
            .bind(&chunk.text)
            .bind(metadata)
            .bind(encode_embedding(&chunk.embedding))
            .execute(&mut **tx)
            .await
            .map_err(map_err)?;
    }
    Ok(())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        sqlx::query(
            "INSERT INTO rag_collections (name, dimensions, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(dimensions as i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        debug!(collection = name, dimensions, "created sqlite collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        sqlx::query("DELETE FROM rag_chunks WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        sqlx::query("DELETE FROM rag_collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        tx.commit().await.map_err(map_err)?;
        debug!(collection = name, "deleted sqlite collection");
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.dimensions(name).await?.is_some())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.require_dimensions(collection).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(count as usize)
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let dimensions = self.require_dimensions(collection).await?;
        for chunk in chunks {
            check_dimensions(collection, dimensions, chunk.embedding.len())?;
        }

        let mut tx = self.pool.begin().await.map_err(map_err)?;
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM rag_chunks WHERE collection = ?",
        )
        .bind(collection)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_err)?;
        insert_chunks(&mut tx, collection, next, chunks).await?;
        tx.commit().await.map_err(map_err)?;

        debug!(collection, count = chunks.len(), "upserted chunks to sqlite");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        for id in ids {
            sqlx::query("DELETE FROM rag_chunks WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(*id)
                .execute(&mut *tx)
                .await
                .map_err(map_err)?;
        }
        tx.commit().await.map_err(map_err)?;
        debug!(collection, count = ids.len(), "deleted chunks from sqlite");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let dimensions = self.require_dimensions(collection).await?;
        check_dimensions(collection, dimensions, embedding.len())?;

        let rows = sqlx::query(
            "SELECT id, document_id, text, metadata, embedding FROM rag_chunks \
             WHERE collection = ? ORDER BY position",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata: String = row.try_get("metadata").map_err(map_err)?;
            let metadata: Metadata = serde_json::from_str(&metadata).map_err(|e| {
                RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!("corrupt chunk metadata: {e}"),
                }
            })?;
            let blob: Vec<u8> = row.try_get("embedding").map_err(map_err)?;
            let chunk_embedding = decode_embedding(&blob);
            let score = cosine_similarity(&chunk_embedding, embedding);

            scored.push(SearchResult {
                chunk: Chunk {
                    id: row.try_get("id").map_err(map_err)?,
                    text: row.try_get("text").map_err(map_err)?,
                    embedding: chunk_embedding,
                    metadata,
                    document_id: row.try_get("document_id").map_err(map_err)?,
                },
                score,
                rank: 0,
            });
        }

        Ok(rank_results(scored, top_k))
    }

    async fn replace_collection(
        &self,
        name: &str,
        dimensions: usize,
        chunks: &[Chunk],
    ) -> Result<()> {
        for chunk in chunks {
            check_dimensions(name, dimensions, chunk.embedding.len())?;
        }

        let mut tx = self.pool.begin().await.map_err(map_err)?;
        sqlx::query("DELETE FROM rag_chunks WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        sqlx::query(
            "INSERT INTO rag_collections (name, dimensions, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT (name) DO UPDATE SET \
                dimensions = excluded.dimensions, \
                updated_at = excluded.updated_at",
        )
        .bind(name)
        .bind(dimensions as i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;
        insert_chunks(&mut tx, name, 0, chunks).await?;
        tx.commit().await.map_err(map_err)?;

        debug!(collection = name, count = chunks.len(), "replaced sqlite collection");
        Ok(())
    }

    fn supports_atomic_replace(&self) -> bool {
        true
    }
}
