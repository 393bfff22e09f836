//! Retrieval-augmented generation over a single structured personal record.
//!
//! The record (identity, skills, work history, projects, education, goals) is
//! rendered into documents, split into overlapping chunks, embedded, and kept
//! in a vector store. Questions are answered by retrieving the nearest chunks
//! and grounding a chat completion on them.
//!
//! # Architecture
//!
//! - [`JsonRecordLoader`] reads the record, falling back to placeholders
//! - [`build_documents`] renders one document per logical unit
//! - [`RecursiveChunker`] splits documents on paragraph and sentence boundaries
//! - [`EmbeddingIndex`] embeds chunks and searches one collection of a
//!   [`VectorStore`]
//! - [`ContextAssembler`] formats the top-k chunks, or a sentinel when none
//! - [`RebuildController`] reruns the whole pipeline, one rebuild at a time
//! - [`PersonaService`] ties these together behind `open` / `search` /
//!   `rebuild` / `close`
//! - [`Assistant`] answers questions through a [`ChatCompletion`] service
//!
//! # Feature Flags
//!
//! | Feature | Components |
//! |---------|------------|
//! | `openai` (default) | [`OpenAIEmbeddingProvider`], [`OpenAIChatClient`] |

pub mod assembler;
pub mod assistant;
pub mod builder;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inmemory;
pub mod loader;
pub mod rebuild;
pub mod record;
pub mod service;
pub mod sqlite;
mod swap;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

pub use assembler::{AssembledContext, ContextAssembler, NO_CONTEXT_SENTINEL};
pub use assistant::{Answer, Assistant, ChatCompletion, build_system_prompt};
pub use builder::build_documents;
pub use chunking::{Chunker, RecursiveChunker, split_documents};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Category, Chunk, Document, Metadata, SearchResult};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use index::EmbeddingIndex;
pub use inmemory::InMemoryVectorStore;
pub use loader::{DEFAULT_RECORD_FILE, JsonRecordLoader, RecordSource, load_in_background};
pub use rebuild::{RebuildController, RebuildReport};
pub use record::{BasicInfo, Education, Experience, Identity, PersonalRecord, Project, Skills};
pub use service::{PersonaService, PersonaServiceBuilder};
pub use sqlite::SqliteVectorStore;
pub use vectorstore::VectorStore;

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatClient, OpenAIEmbeddingProvider};
