//! Test doubles and fixtures.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::search::SearchFilter;
use crate::tools::ToolManager;
use crate::types::{Course, CourseChunk, SearchResult};
use crate::vector_store::{SqliteVectorStore, VectorStore};
use async_trait::async_trait;
use ragchat_core::{AppError, AppResult};
use ragchat_llm::{ChatRequest, ChatResponse, ContentBlock, LlmClient, LlmUsage, StopReason};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub const COURSE_TITLE: &str = "Advanced Retrieval for AI with Chroma";

/// A course file with two lessons on distinct topics.
pub const COURSE_DOCUMENT: &str = "Course Title: Advanced Retrieval for AI with Chroma
Course Link: https://example.com/chroma
Course Instructor: Anton Troynikov

Lesson 1: Overview of embeddings-based retrieval
Lesson Link: https://example.com/chroma/lesson1
Embeddings-based retrieval finds passages whose vectors are close to the query vector.
Chunking splits documents before embedding.

Lesson 2: Pitfalls of retrieval
Lesson Link: https://example.com/chroma/lesson2
Distractors are irrelevant passages that look similar to the query.
Query expansion rewrites the question to improve recall.
";

pub const SECOND_DOCUMENT: &str = "Course Title: Prompt Compression and Query Optimization
Course Link: https://example.com/compression
Course Instructor: Richmond Alake

Lesson 1: Vector search with MongoDB
Vector search runs approximate nearest neighbour queries.
";

pub fn text_response(text: &str) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        model: "scripted".to_string(),
        usage: LlmUsage::new(10, 5),
    }
}

pub fn tool_response(id: &str, name: &str, input: serde_json::Value) -> ChatResponse {
    ChatResponse {
        content: vec![
            ContentBlock::text("Let me look that up."),
            ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            },
        ],
        stop_reason: StopReason::ToolUse,
        model: "scripted".to_string(),
        usage: LlmUsage::new(10, 5),
    }
}

/// LLM double that replays canned responses and records every request.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<AppResult<ChatResponse>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<AppResult<ChatResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("No more scripted responses")));
        // Suspend like a real network call so concurrent queries interleave
        tokio::task::yield_now().await;
        response
    }
}

/// Store whose every operation fails as if the database were gone.
pub struct UnavailableStore;

fn unavailable<T>() -> AppResult<T> {
    Err(AppError::BackendUnavailable("database is offline".to_string()))
}

#[async_trait]
impl VectorStore for UnavailableStore {
    async fn search(
        &self,
        _query: &str,
        _filter: &SearchFilter,
        _limit: Option<usize>,
    ) -> AppResult<Vec<SearchResult>> {
        unavailable()
    }

    async fn resolve_course_name(&self, _name: &str) -> AppResult<Option<String>> {
        unavailable()
    }

    async fn add_course_metadata(&self, _course: &Course) -> AppResult<()> {
        unavailable()
    }

    async fn add_course_content(&self, _chunks: &[CourseChunk]) -> AppResult<()> {
        unavailable()
    }

    async fn add_course(&self, _course: &Course, _chunks: &[CourseChunk]) -> AppResult<()> {
        unavailable()
    }

    async fn clear_all_data(&self) -> AppResult<()> {
        unavailable()
    }

    async fn existing_course_titles(&self) -> AppResult<Vec<String>> {
        unavailable()
    }

    async fn course_count(&self) -> AppResult<usize> {
        unavailable()
    }

    async fn all_courses_metadata(&self) -> AppResult<Vec<Course>> {
        unavailable()
    }

    async fn course_metadata(&self, _title: &str) -> AppResult<Option<Course>> {
        unavailable()
    }
}

/// Embedder whose first request for chunk text fails, as if the
/// embedding service dropped out mid-ingest.
#[derive(Debug)]
pub struct FlakyEmbedder {
    inner: TrigramProvider,
    fail_next_content: AtomicBool,
}

impl FlakyEmbedder {
    pub fn failing_once() -> Self {
        Self {
            inner: TrigramProvider::new("trigram-v1", 384),
            fail_next_content: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn provider_name(&self) -> &str {
        "flaky"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let is_content = texts.iter().any(|t| t.contains(" content: "));
        if is_content && self.fail_next_content.swap(false, Ordering::SeqCst) {
            return Err(AppError::BackendUnavailable(
                "embedding service went away".to_string(),
            ));
        }
        self.inner.embed_batch(texts).await
    }
}

pub fn memory_store() -> SqliteVectorStore {
    SqliteVectorStore::open_in_memory(Arc::new(TrigramProvider::new("trigram-v1", 384)), 5)
        .unwrap()
}

/// In-memory store holding [`COURSE_DOCUMENT`].
pub async fn seeded_store() -> Arc<dyn VectorStore> {
    let store = memory_store();
    let parsed = crate::parser::parse_course_document("chroma.txt", COURSE_DOCUMENT).unwrap();
    store.add_course_metadata(&parsed.course).await.unwrap();
    store
        .add_course_content(&crate::chunker::chunk_course(&parsed, 800, 100))
        .await
        .unwrap();
    Arc::new(store)
}

pub async fn scripted_manager() -> ToolManager {
    ToolManager::with_course_tools(seeded_store().await)
}
