//! End-to-end tests of the service: load, build, search, rebuild, answer.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use persona_rag::{
    ChatCompletion, Chunk, EmbeddingProvider, HashingEmbeddingProvider, InMemoryVectorStore,
    JsonRecordLoader, NO_CONTEXT_SENTINEL, PersonaService, RagConfig, RagError, Result,
    SearchResult, SqliteVectorStore, VectorStore,
};
use tempfile::TempDir;

const ADA_AT_ACME: &str = r#"{
    "basic": { "name": "Ada" },
    "experience": [{
        "title": "Engineer",
        "company": "Acme",
        "duration": "2020-2022",
        "responsibilities": ["Built X"],
        "achievements": ["Shipped Y"]
    }]
}"#;

const ADA_AT_INITECH: &str = r#"{
    "basic": { "name": "Ada" },
    "experience": [{
        "title": "Engineer",
        "company": "Initech",
        "duration": "2018-2020",
        "responsibilities": ["Wrote TPS reports"],
        "achievements": ["Shipped Y"]
    }]
}"#;

const FULL_RECORD: &str = r#"{
    "basic": {
        "name": "Grace Hopper",
        "title": "Compiler Engineer",
        "email": "grace@example.com",
        "location": "Arlington",
        "summary": "Builds languages and the tools around them."
    },
    "skills": {
        "programmingLanguages": ["COBOL", "Rust"],
        "mlFrameworks": ["PyTorch"],
        "cloudPlatforms": ["AWS"],
        "tools": ["Git"],
        "specialties": ["Compilers"]
    },
    "experience": [{
        "title": "Rear Admiral",
        "company": "US Navy",
        "duration": "1943-1986",
        "responsibilities": ["Programmed the Mark I"],
        "achievements": ["Popularized the term debugging"]
    }],
    "projects": [{
        "name": "FLOW-MATIC",
        "role": "Lead",
        "duration": "1955-1959",
        "description": "English-like data processing language",
        "technologies": ["UNIVAC"],
        "impact": "Direct ancestor of COBOL"
    }],
    "education": [{
        "degree": "PhD Mathematics",
        "school": "Yale",
        "year": "1934",
        "focus": "Algebra",
        "gpa": "4.0",
        "relevantCourses": ["Abstract algebra"]
    }],
    "certifications": ["Naval Reserve commission"],
    "interests": ["Teaching", "Nanosecond wires"],
    "careerGoals": "Make programming accessible to everyone"
}"#;

fn write_record(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("personal_data.json");
    std::fs::write(&path, json).unwrap();
    path
}

fn service_over(path: &Path, store: Arc<dyn VectorStore>) -> PersonaService {
    PersonaService::builder()
        .record_source(Arc::new(JsonRecordLoader::new(path)))
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .vector_store(store)
        .build()
        .unwrap()
}

#[tokio::test]
async fn ada_at_acme_is_found_by_question() {
    let dir = TempDir::new().unwrap();
    let path = write_record(dir.path(), ADA_AT_ACME);
    let service = service_over(&path, Arc::new(InMemoryVectorStore::new()));

    let report = service.open().await.unwrap().unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(report.chunks, 3);

    let results = service.index().search("What did Ada do at Acme?", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.document_id, "experience_0");
    assert!(results[0].chunk.text.contains("Engineer"));
    assert!(results[0].chunk.text.contains("Acme"));

    let context = service.search("What did Ada do at Acme?", 1).await.unwrap();
    assert_eq!(context, format!("Relevant Information 1:\n{}", results[0].chunk.text));
}

#[tokio::test]
async fn every_chunk_is_recalled_by_its_own_text() {
    let dir = TempDir::new().unwrap();
    let path = write_record(dir.path(), FULL_RECORD);
    let service = service_over(&path, Arc::new(InMemoryVectorStore::new()));
    service.open().await.unwrap();

    let all = service.index().search("Grace", 100).await.unwrap();
    assert_eq!(all.len(), 8);
    for hit in &all {
        let top = service.index().search(&hit.chunk.text, 1).await.unwrap();
        assert_eq!(top[0].chunk.text, hit.chunk.text);
        assert!(top[0].score > 0.999);
    }
}

#[tokio::test]
async fn rebuild_forgets_data_removed_from_the_record() {
    let dir = TempDir::new().unwrap();
    let path = write_record(dir.path(), ADA_AT_INITECH);
    let service = service_over(&path, Arc::new(InMemoryVectorStore::new()));
    service.open().await.unwrap();

    let before = service.search("TPS reports at Initech", 1).await.unwrap();
    assert!(before.contains("Initech"));

    write_record(dir.path(), ADA_AT_ACME);
    service.rebuild().await.unwrap();

    let after = service.index().search("TPS reports at Initech", 10).await.unwrap();
    assert_eq!(after.len(), 3);
    assert!(after.iter().all(|r| !r.chunk.text.contains("Initech")));
    assert!(after.iter().any(|r| r.chunk.text.contains("Acme")));
}

#[tokio::test]
async fn identity_is_available_before_any_build() {
    let dir = TempDir::new().unwrap();
    let path = write_record(dir.path(), FULL_RECORD);
    let service = service_over(&path, Arc::new(InMemoryVectorStore::new()));

    let identity = service.summary_identity().await;
    assert_eq!(identity.name, "Grace Hopper");
    assert_eq!(identity.title, "Compiler Engineer");
    assert_eq!(service.search("Grace", 3).await.unwrap(), NO_CONTEXT_SENTINEL);
}

#[tokio::test]
async fn missing_record_file_builds_placeholder_index() {
    let dir = TempDir::new().unwrap();
    let service =
        service_over(&dir.path().join("absent.json"), Arc::new(InMemoryVectorStore::new()));

    let report = service.open().await.unwrap().unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(service.summary_identity().await.name, "Your Name");
}

#[tokio::test]
async fn sqlite_index_survives_service_restart() {
    let dir = TempDir::new().unwrap();
    let record = write_record(dir.path(), ADA_AT_ACME);
    let db = dir.path().join("persona_index.db");

    {
        let store = Arc::new(SqliteVectorStore::open(&db).await.unwrap());
        let service = service_over(&record, store.clone());
        assert!(service.open().await.unwrap().is_some());
        service.close();
        store.close().await;
    }

    let store = Arc::new(SqliteVectorStore::open(&db).await.unwrap());
    let service = service_over(&record, store);
    // persisted collection is adopted, no rebuild
    assert!(service.open().await.unwrap().is_none());
    let context = service.search("What did Ada do at Acme?", 1).await.unwrap();
    assert!(context.contains("Company: Acme"));
}

struct SlowEmbedder;

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(vec![1.0; 4])
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn embedding_timeout_is_retryable() {
    let config = RagConfig::builder().embed_timeout(Duration::from_millis(50)).build().unwrap();
    let service = PersonaService::builder()
        .config(config)
        .record_source(Arc::new(persona_rag::PersonalRecord::default()))
        .embedding_provider(Arc::new(SlowEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();

    let err = service.open().await.unwrap_err();
    assert!(err.is_retryable());
    match err {
        RagError::RebuildFailed(inner) => {
            assert!(matches!(
                *inner,
                RagError::Timeout { after, .. } if after == Duration::from_millis(50)
            ));
        }
        other => panic!("expected RebuildFailed, got {other:?}"),
    }
    assert!(!service.index().is_built());
}

/// Records the prompts it receives and replies with a canned answer.
#[derive(Default)]
struct RecordingCompletion {
    prompts: Mutex<Vec<(String, String)>>,
    fail: bool,
}

#[async_trait]
impl ChatCompletion for RecordingCompletion {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        self.prompts.lock().unwrap().push((system_prompt.to_string(), user_message.to_string()));
        if self.fail {
            return Err(RagError::InvalidInput("model rejected request".to_string()));
        }
        Ok("Ada was an engineer at Acme.".to_string())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

async fn assistant_service(completion: Arc<RecordingCompletion>) -> (TempDir, Arc<PersonaService>) {
    let dir = TempDir::new().unwrap();
    let path = write_record(dir.path(), ADA_AT_ACME);
    let service = PersonaService::builder()
        .record_source(Arc::new(JsonRecordLoader::new(&path)))
        .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .completion(completion)
        .build()
        .unwrap();
    service.open().await.unwrap();
    (dir, Arc::new(service))
}

#[tokio::test]
async fn assistant_grounds_reply_on_retrieved_context() {
    let completion = Arc::new(RecordingCompletion::default());
    let (_dir, service) = assistant_service(completion.clone()).await;
    let assistant = service.assistant().unwrap();

    let answer = assistant.answer("  What did Ada do at Acme?  ").await.unwrap();
    assert_eq!(answer.reply, "Ada was an engineer at Acme.");
    assert!(answer.grounded);
    assert!(answer.context_preview.starts_with("Relevant Information 1:\n"));
    assert!(answer.context_preview.ends_with("..."));

    let prompts = completion.prompts.lock().unwrap();
    let (system, user) = &prompts[0];
    assert_eq!(user, "What did Ada do at Acme?");
    assert!(system.starts_with("You are Ada's AI assistant."));
    assert!(system.contains("Company: Acme"));
}

#[tokio::test]
async fn assistant_rejects_blank_messages() {
    let completion = Arc::new(RecordingCompletion::default());
    let (_dir, service) = assistant_service(completion.clone()).await;

    let err = service.assistant().unwrap().answer("   ").await.unwrap_err();
    assert!(matches!(err, RagError::InvalidInput(_)));
    assert!(completion.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn completion_failures_surface_as_completion_errors() {
    let completion = Arc::new(RecordingCompletion { fail: true, ..Default::default() });
    let (_dir, service) = assistant_service(completion).await;

    let err = service.assistant().unwrap().answer("Where did Ada work?").await.unwrap_err();
    assert!(matches!(err, RagError::Completion { ref provider, .. } if provider == "recording"));
}

/// Hashing embeddings that take a little while, so a rebuild overlaps searches.
struct UnhurriedEmbedder(HashingEmbeddingProvider);

#[async_trait]
impl EmbeddingProvider for UnhurriedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.0.dimensions()
    }

    fn name(&self) -> &str {
        "unhurried"
    }
}

/// An in-memory store that replaces collections step by step, with a pause
/// between emptying the collection and refilling it.
#[derive(Default)]
struct SteppingStore(InMemoryVectorStore);

#[async_trait]
impl VectorStore for SteppingStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.0.create_collection(name, dimensions).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.0.delete_collection(name).await
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        self.0.collection_exists(name).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.0.count(collection).await
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.0.upsert(collection, chunks).await
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        self.0.delete(collection, ids).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.0.search(collection, embedding, top_k).await
    }
}

async fn snapshot(service: &PersonaService) -> Vec<String> {
    let mut texts: Vec<String> = service
        .index()
        .search("What did Ada do?", 10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.chunk.text)
        .collect();
    texts.sort();
    texts
}

async fn searches_see_whole_collections(store: Arc<dyn VectorStore>) {
    let dir = TempDir::new().unwrap();
    let path = write_record(dir.path(), ADA_AT_INITECH);
    let service = Arc::new(
        PersonaService::builder()
            .record_source(Arc::new(JsonRecordLoader::new(&path)))
            .embedding_provider(Arc::new(UnhurriedEmbedder(HashingEmbeddingProvider::default())))
            .vector_store(store)
            .build()
            .unwrap(),
    );
    service.open().await.unwrap();
    let old = snapshot(&service).await;
    assert_eq!(old.len(), 3);

    write_record(dir.path(), ADA_AT_ACME);
    let rebuild = tokio::spawn({
        let service = service.clone();
        async move { service.rebuild().await }
    });

    let mut seen = Vec::new();
    while !rebuild.is_finished() {
        seen.push(snapshot(&service).await);
    }
    rebuild.await.unwrap().unwrap();
    let new = snapshot(&service).await;
    assert_eq!(new.len(), 3);
    assert_ne!(old, new);

    assert!(!seen.is_empty());
    for texts in &seen {
        assert!(*texts == old || *texts == new, "mixed or partial collection: {texts:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn searches_during_rebuild_see_old_or_new_collection() {
    searches_see_whole_collections(Arc::new(InMemoryVectorStore::new())).await;

    let dir = TempDir::new().unwrap();
    let sqlite = SqliteVectorStore::open(dir.path().join("race.db")).await.unwrap();
    searches_see_whole_collections(Arc::new(sqlite)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stepwise_store_swaps_are_hidden_from_searches() {
    let store = Arc::new(SteppingStore::default());
    assert!(!store.supports_atomic_replace());
    searches_see_whole_collections(store).await;
}
