//! End-to-end behavior of the RAG system with a scripted model.

use super::support::*;
use crate::rag::{AiGenerator, RagSystem, SessionStore};
use crate::search::SearchFilter;
use crate::tools::{OUTLINE_TOOL, SEARCH_TOOL};
use crate::types::Document;
use crate::vector_store::{SqliteVectorStore, VectorStore};
use ragchat_core::config::RagSettings;
use ragchat_core::AppError;
use ragchat_llm::{AnthropicClient, ContentBlock, LlmClient};
use ragchat_prompt::{builtin_prompt, COURSE_ASSISTANT};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn system_with(llm: Arc<dyn LlmClient>, store: Arc<dyn VectorStore>) -> RagSystem {
    let settings = RagSettings::default();
    let prompt = builtin_prompt(COURSE_ASSISTANT).unwrap().unwrap();
    let generator = AiGenerator::new(llm, "test-model", prompt).with_settings(&settings);
    RagSystem::new(
        store,
        generator,
        Arc::new(SessionStore::new(settings.max_history)),
        &settings,
    )
}

async fn ingested_system(llm: Arc<dyn LlmClient>) -> RagSystem {
    let system = system_with(llm, Arc::new(memory_store()));
    system
        .ingest(&[Document::new("chroma.txt", COURSE_DOCUMENT)])
        .await
        .unwrap();
    system
}

fn tool_result_texts(llm: &ScriptedLlm, request: usize) -> Vec<String> {
    llm.requests()[request]
        .messages
        .last()
        .unwrap()
        .content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::ToolResult { content, .. } => Some(content.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_zero_matches_is_message_with_no_sources() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(tool_response(
            "toolu_1",
            SEARCH_TOOL,
            json!({"query": "anything", "course_name": "Chroma", "lesson_number": 9}),
        )),
        Ok(text_response("That lesson does not exist.")),
    ]));
    let system = ingested_system(llm.clone()).await;

    let result = system.query("What is in lesson 9?", None).await.unwrap();

    assert_eq!(result.answer, "That lesson does not exist.");
    assert!(result.sources.is_empty());
    assert_eq!(
        tool_result_texts(&llm, 1),
        vec!["No relevant content found in course 'Chroma' in lesson 9.".to_string()]
    );
}

#[tokio::test]
async fn test_sources_reflect_only_last_tool_execution() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(tool_response(
            "toolu_1",
            SEARCH_TOOL,
            json!({"query": "embeddings", "lesson_number": 1}),
        )),
        Ok(tool_response(
            "toolu_2",
            SEARCH_TOOL,
            json!({"query": "distractors", "lesson_number": 2}),
        )),
        Ok(text_response("Distractors hurt retrieval.")),
    ]));
    let system = ingested_system(llm).await;

    let result = system.query("Compare lessons", None).await.unwrap();

    let expected = format!("{} - Lesson 2", COURSE_TITLE);
    let texts: Vec<&str> = result.sources.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec![expected.as_str()]);
    assert_eq!(
        result.sources[0].url.as_deref(),
        Some("https://example.com/chroma/lesson2")
    );
}

#[tokio::test]
async fn test_sources_do_not_leak_between_requests() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(tool_response(
            "toolu_1",
            OUTLINE_TOOL,
            json!({"course_name": "Chroma"}),
        )),
        Ok(text_response("Here is the outline.")),
        Ok(text_response("Hello!")),
    ]));
    let system = ingested_system(llm).await;

    let first = system.query("Outline please", None).await.unwrap();
    assert_eq!(first.sources.len(), 1);
    assert_eq!(first.sources[0].text, COURSE_TITLE);

    let second = system
        .query("Hi", Some(&first.session_id))
        .await
        .unwrap();
    assert!(second.sources.is_empty());
}

#[tokio::test]
async fn test_history_matches_submission_order() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(text_response("a1")),
        Ok(text_response("a2")),
        Ok(text_response("a3")),
    ]));
    let system = ingested_system(llm.clone()).await;

    let first = system.query("q1", None).await.unwrap();
    let id = first.session_id.clone();
    system.query("q2", Some(&id)).await.unwrap();
    system.query("q2", Some(&id)).await.unwrap();

    // Retention is two exchanges; duplicates are kept
    let turns = system.sessions().turns(&id).await;
    let queries: Vec<&str> = turns.iter().map(|t| t.query.as_str()).collect();
    assert_eq!(queries, vec!["q2", "q2"]);

    let third_system = llm.requests()[2].system.clone().unwrap();
    let q1 = third_system.find("User: q1").unwrap();
    let q2 = third_system.find("User: q2").unwrap();
    assert!(q1 < q2);
}

#[tokio::test]
async fn test_lesson_filter_returns_only_that_lesson() {
    let system = ingested_system(Arc::new(ScriptedLlm::new(vec![]))).await;

    let results = system
        .store()
        .search("retrieval", &SearchFilter::new().with_lesson(2), Some(10))
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.lesson_number == Some(2)));
}

#[tokio::test]
async fn test_missing_api_key_fails_before_any_tool() {
    let client: Arc<dyn LlmClient> = Arc::new(AnthropicClient::new(None));
    let system = system_with(client, Arc::new(UnavailableStore));

    let err = system.query("What is Chroma?", Some("s1")).await.unwrap_err();

    assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    assert!(system.sessions().turns("s1").await.is_empty());
}

#[tokio::test]
async fn test_backend_failure_in_tool_gives_degraded_answer() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(tool_response(
            "toolu_1",
            SEARCH_TOOL,
            json!({"query": "anything", "course_name": "Chroma"}),
        )),
        Ok(text_response("I could not search the course materials.")),
    ]));
    let system = system_with(llm.clone(), Arc::new(UnavailableStore));

    let result = system.query("q", None).await.unwrap();

    assert_eq!(result.answer, "I could not search the course materials.");
    assert!(result.sources.is_empty());
    assert!(tool_result_texts(&llm, 1)[0].starts_with("Tool execution failed: Vector store unavailable"));
}

#[tokio::test]
async fn test_ingest_skips_existing_courses() {
    let system = system_with(
        Arc::new(ScriptedLlm::new(vec![])),
        Arc::new(memory_store()),
    );
    let docs = [
        Document::new("chroma.txt", COURSE_DOCUMENT),
        Document::new("compression.txt", SECOND_DOCUMENT),
        Document::new("empty.txt", ""),
    ];

    let stats = system.ingest(&docs).await.unwrap();
    assert_eq!(stats.courses_added, 2);
    assert!(stats.chunks_added >= 3);
    assert_eq!(stats.failed, 1);

    let again = system.ingest(&docs[..2]).await.unwrap();
    assert_eq!(again.courses_added, 0);
    assert_eq!(again.skipped, 2);

    let analytics = system.course_analytics().await.unwrap();
    assert_eq!(analytics.total_courses, 2);
    assert!(analytics.course_titles.contains(&COURSE_TITLE.to_string()));
}

#[tokio::test]
async fn test_failed_ingest_is_retried_next_time() {
    let store = SqliteVectorStore::open_in_memory(Arc::new(FlakyEmbedder::failing_once()), 5)
        .unwrap();
    let system = system_with(Arc::new(ScriptedLlm::new(vec![])), Arc::new(store));
    let docs = [Document::new("chroma.txt", COURSE_DOCUMENT)];

    let err = system.ingest(&docs).await.unwrap_err();
    assert!(matches!(err, AppError::BackendUnavailable(_)));
    assert_eq!(system.store().course_count().await.unwrap(), 0);

    let stats = system.ingest(&docs).await.unwrap();
    assert_eq!(stats.courses_added, 1);
    assert_eq!(stats.skipped, 0);

    let results = system
        .store()
        .search("distractors", &SearchFilter::new(), None)
        .await
        .unwrap();
    assert!(!results.is_empty());
}

#[tokio::test]
async fn test_add_course_folder() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("course1.txt"), COURSE_DOCUMENT).unwrap();
    std::fs::write(temp.path().join("course2.md"), SECOND_DOCUMENT).unwrap();
    std::fs::write(temp.path().join("slides.pdf"), "binary").unwrap();

    let system = system_with(
        Arc::new(ScriptedLlm::new(vec![])),
        Arc::new(memory_store()),
    );

    let stats = system.add_course_folder(temp.path(), false).await.unwrap();
    assert_eq!(stats.courses_added, 2);
    assert_eq!(stats.failed, 0);

    let again = system.add_course_folder(temp.path(), false).await.unwrap();
    assert_eq!(again.skipped, 2);

    let cleared = system.add_course_folder(temp.path(), true).await.unwrap();
    assert_eq!(cleared.courses_added, 2);
    assert_eq!(system.store().course_count().await.unwrap(), 2);

    let missing = system
        .add_course_folder(&temp.path().join("nope"), false)
        .await
        .unwrap();
    assert_eq!(missing, Default::default());
}

#[tokio::test]
async fn test_add_course_document() {
    let temp = TempDir::new().unwrap();
    let good = temp.path().join("course1.txt");
    std::fs::write(&good, COURSE_DOCUMENT).unwrap();
    let bad = temp.path().join("blank.txt");
    std::fs::write(&bad, "   ").unwrap();

    let system = system_with(
        Arc::new(ScriptedLlm::new(vec![])),
        Arc::new(memory_store()),
    );

    let (course, chunks) = system.add_course_document(&good).await.unwrap();
    let course = course.unwrap();
    assert_eq!(course.title, COURSE_TITLE);
    assert_eq!(course.lesson_count(), 2);
    assert!(chunks >= 2);

    let (none, zero) = system.add_course_document(&bad).await.unwrap();
    assert!(none.is_none());
    assert_eq!(zero, 0);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(text_response("a")),
        Ok(text_response("b")),
    ]));
    let system = ingested_system(llm).await;

    let (a, b) = tokio::join!(
        system.query("first", Some("alpha")),
        system.query("second", Some("beta"))
    );
    assert_eq!(a.unwrap().session_id, "alpha");
    assert_eq!(b.unwrap().session_id, "beta");

    assert_eq!(system.sessions().turns("alpha").await.len(), 1);
    assert_eq!(system.sessions().turns("beta").await.len(), 1);
}

#[tokio::test]
async fn test_same_session_queries_take_turns() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(text_response("first answer")),
        Ok(text_response("second answer")),
    ]));
    let system = ingested_system(llm.clone()).await;

    let (a, b) = tokio::join!(
        system.query("first question", Some("shared")),
        system.query("second question", Some("shared"))
    );
    assert_eq!(a.unwrap().answer, "first answer");
    assert_eq!(b.unwrap().answer, "second answer");

    let turns = system.sessions().turns("shared").await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].query, "first question");
    assert_eq!(turns[0].answer, "first answer");
    assert_eq!(turns[1].query, "second question");
    assert_eq!(turns[1].answer, "second answer");

    // The second request only starts once the first exchange is recorded
    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    let first_system = requests[0].system.clone().unwrap();
    assert!(!first_system.contains("Previous conversation"));
    let second_system = requests[1].system.clone().unwrap();
    assert!(second_system
        .contains("Previous conversation:\nUser: first question\nAssistant: first answer"));
}
