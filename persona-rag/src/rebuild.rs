//! Rebuilding the index from the current personal record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::builder::build_documents;
use crate::chunking::{Chunker, split_documents};
use crate::error::{RagError, Result};
use crate::index::EmbeddingIndex;
use crate::loader::{RecordSource, load_in_background};

/// What a completed rebuild produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    pub documents: usize,
    pub chunks: usize,
    pub elapsed: Duration,
}

/// Runs load → build documents → chunk → embed → replace, one at a time.
///
/// A second rebuild requested while one is running is rejected with
/// [`RagError::RebuildInProgress`] rather than queued.
pub struct RebuildController {
    source: Arc<dyn RecordSource>,
    chunker: Arc<dyn Chunker>,
    index: Arc<EmbeddingIndex>,
    running: Mutex<()>,
}

impl RebuildController {
    pub fn new(
        source: Arc<dyn RecordSource>,
        chunker: Arc<dyn Chunker>,
        index: Arc<EmbeddingIndex>,
    ) -> Self {
        Self { source, chunker, index, running: Mutex::new(()) }
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Rebuild the index from a fresh read of the record.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RebuildInProgress`] if another rebuild holds the
    /// controller, or [`RagError::RebuildFailed`] wrapping the cause. After a
    /// failure the previous index keeps serving searches.
    pub async fn rebuild(&self) -> Result<RebuildReport> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!(collection = self.index.collection(), "rebuild rejected, one is already running");
            return Err(RagError::RebuildInProgress);
        };

        let started = Instant::now();
        let record = match load_in_background(self.source.clone()).await {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "rebuild failed, previous index retained");
                return Err(RagError::RebuildFailed(Box::new(e)));
            }
        };
        let documents = build_documents(&record);
        let chunks = split_documents(self.chunker.as_ref(), &documents);
        let document_count = documents.len();

        match self.index.build(chunks).await {
            Ok(chunk_count) => {
                let report = RebuildReport {
                    documents: document_count,
                    chunks: chunk_count,
                    elapsed: started.elapsed(),
                };
                info!(
                    collection = self.index.collection(),
                    document_count = report.documents,
                    chunk_count = report.chunks,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "rebuild completed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "rebuild failed, previous index retained");
                Err(RagError::RebuildFailed(Box::new(e)))
            }
        }
    }
}
