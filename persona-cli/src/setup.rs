//! Turning arguments and environment into a running service.

use std::sync::Arc;

use anyhow::{Context, Result};
use persona_rag::{
    ChatCompletion, EmbeddingProvider, HashingEmbeddingProvider, Identity, JsonRecordLoader,
    OpenAIChatClient, OpenAIEmbeddingProvider, PersonaService, RagConfig, SqliteVectorStore,
    VectorStore, load_in_background,
};
use tracing::debug;

use crate::cli::{Cli, EmbedderKind};

/// Chat model used when `PERSONA_CHAT_MODEL` is unset.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

pub struct Runtime {
    pub service: Arc<PersonaService>,
    pub store: Arc<SqliteVectorStore>,
}

impl Runtime {
    pub async fn shutdown(self) {
        self.service.close();
        self.store.close().await;
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn embedder(kind: EmbedderKind) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match kind {
        EmbedderKind::Hashing => Arc::new(HashingEmbeddingProvider::default()),
        EmbedderKind::Openai => {
            let mut provider =
                OpenAIEmbeddingProvider::from_env().context("the openai embedder needs a key")?;
            if let Some(base_url) = optional_env("OPENAI_BASE_URL") {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
    })
}

/// The chat client configured from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and
/// `PERSONA_CHAT_MODEL`.
pub fn chat_client() -> Result<Arc<dyn ChatCompletion>> {
    let mut client = OpenAIChatClient::from_env()
        .context("answering questions needs OPENAI_API_KEY")?
        .with_model(
            optional_env("PERSONA_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
        );
    if let Some(base_url) = optional_env("OPENAI_BASE_URL") {
        client = client.with_base_url(base_url);
    }
    Ok(Arc::new(client))
}

pub fn config(cli: &Cli, build_on_open: bool) -> Result<RagConfig> {
    RagConfig::builder()
        .collection(cli.collection.clone())
        .top_k(cli.top_k)
        .build_on_open(build_on_open)
        .build()
        .context("invalid settings")
}

/// Open the store and assemble the service; the index is not opened yet.
pub async fn runtime(
    cli: &Cli,
    config: RagConfig,
    completion: Option<Arc<dyn ChatCompletion>>,
) -> Result<Runtime> {
    let store = Arc::new(
        SqliteVectorStore::open(&cli.db)
            .await
            .with_context(|| format!("opening index database {}", cli.db.display()))?,
    );
    debug!(db = %cli.db.display(), data = %cli.data.display(), "store opened");

    let mut builder = PersonaService::builder()
        .config(config)
        .record_source(Arc::new(JsonRecordLoader::new(&cli.data)))
        .embedding_provider(embedder(cli.embedder)?)
        .vector_store(store.clone());
    if let Some(completion) = completion {
        builder = builder.completion(completion);
    }

    Ok(Runtime { service: Arc::new(builder.build()?), store })
}

/// The record owner's name and title. Needs no key and leaves the index alone.
pub async fn identity(cli: &Cli) -> Result<Identity> {
    let record = load_in_background(Arc::new(JsonRecordLoader::new(&cli.data))).await?;
    Ok(record.identity())
}

/// Readiness of the local setup, as printed by `persona status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub embedder: EmbedderKind,
    pub api_key_configured: bool,
    pub record_present: bool,
    pub index_built: bool,
    pub chunk_count: usize,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "embedder:     {}", self.embedder.name())?;
        writeln!(f, "api key:      {}", if self.api_key_configured { "set" } else { "missing" })?;
        writeln!(f, "record file:  {}", if self.record_present { "found" } else { "missing" })?;
        if self.index_built {
            write!(f, "index:        built ({} chunks)", self.chunk_count)
        } else {
            write!(f, "index:        not built")
        }
    }
}

/// Inspect the setup without building anything. The database is only opened
/// if it already exists.
pub async fn status(cli: &Cli) -> Result<Status> {
    let (index_built, chunk_count) = if cli.db.exists() {
        let store = SqliteVectorStore::open(&cli.db)
            .await
            .with_context(|| format!("opening index database {}", cli.db.display()))?;
        let built = store.collection_exists(&cli.collection).await?;
        let chunk_count = if built { store.count(&cli.collection).await? } else { 0 };
        store.close().await;
        (built, chunk_count)
    } else {
        (false, 0)
    };
    debug!(db = %cli.db.display(), index_built, "status collected");

    Ok(Status {
        embedder: cli.embedder,
        api_key_configured: optional_env("OPENAI_API_KEY").is_some(),
        record_present: cli.data.exists(),
        index_built,
        chunk_count,
    })
}
