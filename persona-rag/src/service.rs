//! The service facade wiring loader, index, assembler and rebuild together.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::assembler::{AssembledContext, ContextAssembler};
use crate::assistant::{Assistant, ChatCompletion};
use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::EmbeddingIndex;
use crate::loader::{RecordSource, load_in_background};
use crate::rebuild::{RebuildController, RebuildReport};
use crate::record::{Identity, PersonalRecord};
use crate::vectorstore::VectorStore;

/// Retrieval over one person's record.
///
/// Construct one with [`PersonaService::builder`], call [`open`](Self::open),
/// and share it behind an `Arc`.
///
/// ```rust,ignore
/// let service = PersonaService::builder()
///     .record_source(Arc::new(JsonRecordLoader::new("personal_data.json")))
///     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
///     .vector_store(Arc::new(InMemoryVectorStore::new()))
///     .build()?;
/// service.open().await?;
/// let context = service.search("Which languages appear in the skills?", 3).await?;
/// ```
pub struct PersonaService {
    config: RagConfig,
    source: Arc<dyn RecordSource>,
    index: Arc<EmbeddingIndex>,
    assembler: ContextAssembler,
    rebuilder: RebuildController,
    completion: Option<Arc<dyn ChatCompletion>>,
    closed: AtomicBool,
}

impl PersonaService {
    pub fn builder() -> PersonaServiceBuilder {
        PersonaServiceBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) { Err(RagError::Closed) } else { Ok(()) }
    }

    /// Open the index, building it first if nothing is persisted and
    /// `build_on_open` is set.
    ///
    /// Returns the report of the build, if one ran.
    pub async fn open(&self) -> Result<Option<RebuildReport>> {
        self.ensure_open()?;
        if self.index.open().await? {
            return Ok(None);
        }
        if !self.config.build_on_open {
            info!(collection = self.index.collection(), "index not built, waiting for rebuild");
            return Ok(None);
        }
        self.rebuilder.rebuild().await.map(Some)
    }

    /// Mark the service closed. Later calls fail with [`RagError::Closed`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(collection = self.index.collection(), "service closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Rebuild the index from the current record.
    pub async fn rebuild(&self) -> Result<RebuildReport> {
        self.ensure_open()?;
        self.rebuilder.rebuild().await
    }

    /// Retrieve and format context for `query`.
    pub async fn assemble(&self, query: &str, k: usize) -> Result<AssembledContext> {
        self.ensure_open()?;
        Ok(self.assembler.assemble(query, k).await)
    }

    /// Return the assembled context text for `query`.
    ///
    /// Retrieval problems yield the no-context sentinel rather than an error.
    pub async fn search(&self, query: &str, k: usize) -> Result<String> {
        Ok(self.assemble(query, k).await?.into_text())
    }

    /// The record owner's name and title, read straight from the record.
    ///
    /// Works whatever the index state, including after [`close`](Self::close).
    pub async fn summary_identity(&self) -> Identity {
        match load_in_background(self.source.clone()).await {
            Ok(record) => record.identity(),
            Err(e) => {
                warn!(error = %e, "record load failed, using placeholder identity");
                PersonalRecord::default().identity()
            }
        }
    }

    /// An [`Assistant`] using the configured completion service.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no completion service was set.
    pub fn assistant(self: &Arc<Self>) -> Result<Assistant> {
        let completion = self.completion.clone().ok_or_else(|| {
            RagError::ConfigError("no chat completion service configured".to_string())
        })?;
        Ok(Assistant::new(self.clone(), completion))
    }
}

/// Builder for constructing a [`PersonaService`].
///
/// The record source, embedding provider and vector store are required. The
/// config defaults to [`RagConfig::default`] and the chunker to a
/// [`RecursiveChunker`] sized from the config.
#[derive(Default)]
pub struct PersonaServiceBuilder {
    config: Option<RagConfig>,
    source: Option<Arc<dyn RecordSource>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    completion: Option<Arc<dyn ChatCompletion>>,
}

impl PersonaServiceBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn record_source(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    pub fn completion(mut self, completion: Arc<dyn ChatCompletion>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Build the [`PersonaService`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required component is missing.
    pub fn build(self) -> Result<PersonaService> {
        let config = self.config.unwrap_or_default();
        let source = self
            .source
            .ok_or_else(|| RagError::ConfigError("record_source is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::try_new(config.chunk_size, config.chunk_overlap)?),
        };

        let index = Arc::new(EmbeddingIndex::new(embedding_provider, vector_store, &config));
        Ok(PersonaService {
            assembler: ContextAssembler::new(index.clone()),
            rebuilder: RebuildController::new(source.clone(), chunker, index.clone()),
            config,
            source,
            index,
            completion: self.completion,
            closed: AtomicBool::new(false),
        })
    }
}
