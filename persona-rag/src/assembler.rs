//! Turning search results into prompt context.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::SearchResult;
use crate::index::EmbeddingIndex;

/// Rendered in place of context when nothing could be retrieved.
pub const NO_CONTEXT_SENTINEL: &str = "Unable to retrieve relevant information";

/// The outcome of assembling context for a query.
///
/// Retrieval problems are not errors here: the chat flow continues with
/// [`NO_CONTEXT_SENTINEL`] and the reason is kept for logging.
#[derive(Debug, Clone, PartialEq)]
pub enum AssembledContext {
    /// At least one chunk was retrieved.
    Retrieved {
        /// Numbered blocks separated by blank lines.
        text: String,
        /// Number of chunks in `text`.
        hits: usize,
    },
    /// Nothing usable came back from the index.
    Unavailable {
        /// Why retrieval produced nothing.
        reason: String,
    },
}

impl AssembledContext {
    /// The string to place into a prompt.
    pub fn as_text(&self) -> &str {
        match self {
            AssembledContext::Retrieved { text, .. } => text,
            AssembledContext::Unavailable { .. } => NO_CONTEXT_SENTINEL,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            AssembledContext::Retrieved { text, .. } => text,
            AssembledContext::Unavailable { .. } => NO_CONTEXT_SENTINEL.to_string(),
        }
    }

    pub fn is_retrieved(&self) -> bool {
        matches!(self, AssembledContext::Retrieved { .. })
    }
}

impl fmt::Display for AssembledContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

/// Render results as `Relevant Information <n>:` blocks in rank order.
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| format!("Relevant Information {}:\n{}", i + 1, result.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Retrieves the top-k chunks for a query and formats them as context.
pub struct ContextAssembler {
    index: Arc<EmbeddingIndex>,
}

impl ContextAssembler {
    pub fn new(index: Arc<EmbeddingIndex>) -> Self {
        Self { index }
    }

    /// Search the index and render the results.
    ///
    /// Never fails; search errors and empty results become
    /// [`AssembledContext::Unavailable`].
    pub async fn assemble(&self, query: &str, k: usize) -> AssembledContext {
        match self.index.search(query, k).await {
            Ok(results) if results.is_empty() => {
                warn!(collection = self.index.collection(), "search returned no chunks");
                AssembledContext::Unavailable { reason: "no matching chunks".to_string() }
            }
            Ok(results) => {
                debug!(hits = results.len(), "assembled context");
                AssembledContext::Retrieved { text: format_context(&results), hits: results.len() }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "retrieval failed, continuing without context"
                );
                AssembledContext::Unavailable { reason: e.to_string() }
            }
        }
    }
}
