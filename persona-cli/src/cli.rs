//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use persona_rag::DEFAULT_RECORD_FILE;

/// Ask questions about one person's career, grounded in their own record.
#[derive(Parser, Debug)]
#[command(name = "persona", version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON personal record
    #[arg(long, env = "PERSONA_DATA", default_value = DEFAULT_RECORD_FILE)]
    pub data: PathBuf,

    /// SQLite database holding the index
    #[arg(long, env = "PERSONA_DB", default_value = "persona_index.db")]
    pub db: PathBuf,

    /// Collection name inside the database
    #[arg(long, default_value = persona_rag::config::DEFAULT_COLLECTION)]
    pub collection: String,

    /// Embedding backend
    #[arg(long, value_enum, default_value_t = EmbedderKind::Openai)]
    pub embedder: EmbedderKind,

    /// Number of chunks used as context
    #[arg(short = 'k', long, default_value_t = 3)]
    pub top_k: usize,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Re-read the record and rebuild the index
    Rebuild,
    /// Print the context retrieved for a query
    Search {
        query: String,
        /// Override the number of chunks
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Print the record owner's name and title
    Identity,
    /// Report the embedder, API key, record file and index state
    Status,
    /// Answer a question with the chat model
    Ask {
        message: String,
        /// Also print a preview of the retrieved context
        #[arg(long)]
        show_context: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// OpenAI embeddings API (needs OPENAI_API_KEY)
    Openai,
    /// Local feature hashing, no network
    Hashing,
}

impl EmbedderKind {
    pub fn name(self) -> &'static str {
        match self {
            EmbedderKind::Openai => "openai",
            EmbedderKind::Hashing => "hashing",
        }
    }
}
