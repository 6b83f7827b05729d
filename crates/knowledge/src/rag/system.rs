//! The RAG system: ingestion plus session-aware question answering.

use crate::chunker::chunk_course;
use crate::embeddings::create_provider;
use crate::parser::{parse_course_document, read_document, ContentType};
use crate::rag::generator::AiGenerator;
use crate::rag::session::SessionStore;
use crate::tools::ToolManager;
use crate::types::{Course, CourseAnalytics, Document, IngestStats, Source};
use crate::vector_store::{SqliteVectorStore, VectorStore};
use ragchat_core::config::RagSettings;
use ragchat_core::{AppConfig, AppError, AppResult};
use ragchat_llm::{create_client, ClientOptions};
use ragchat_prompt::{load_prompt, COURSE_ASSISTANT};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// Answer to one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}

enum IngestOutcome {
    Added { chunks: usize },
    Skipped,
    Failed,
}

/// Orchestrates the vector store, tools, generator and sessions.
pub struct RagSystem {
    store: Arc<dyn VectorStore>,
    generator: AiGenerator,
    tools: ToolManager,
    sessions: Arc<SessionStore>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RagSystem {
    pub fn new(
        store: Arc<dyn VectorStore>,
        generator: AiGenerator,
        sessions: Arc<SessionStore>,
        settings: &RagSettings,
    ) -> Self {
        let tools = ToolManager::with_course_tools(Arc::clone(&store));
        Self {
            store,
            generator,
            tools,
            sessions,
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }

    /// Build the production system from configuration.
    ///
    /// A missing API key does not fail here; queries report it.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let settings = &config.rag;

        let embedder = create_provider(&settings.embedding)?;
        let store = SqliteVectorStore::open(&config.db_path(), embedder, settings.max_results)?
            .with_batch_size(settings.embedding.batch_size);

        let options = ClientOptions {
            endpoint: config.provider_endpoint(&config.provider),
            api_key: config.api_key.clone(),
            api_version: config.provider_api_version(&config.provider),
            timeout_secs: config.provider_timeout(&config.provider),
        };
        let client = create_client(&config.provider, &options).map_err(AppError::Config)?;

        let prompt = load_prompt(&config.workspace, COURSE_ASSISTANT)?;
        let generator = AiGenerator::new(client, &config.model, prompt).with_settings(settings);

        tracing::info!(
            "RAG system ready (provider: {}, model: {}, store: {:?})",
            config.provider,
            config.model,
            config.db_path()
        );

        Ok(Self::new(
            Arc::new(store),
            generator,
            Arc::new(SessionStore::new(settings.max_history)),
            settings,
        ))
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer a query within a session.
    ///
    /// The session is created when `session_id` is absent or unknown, and
    /// stays locked until the exchange is recorded. Sources come from the
    /// last tool the model ran for this query only.
    pub async fn query(&self, text: &str, session_id: Option<&str>) -> AppResult<QueryAnswer> {
        let (session_id, session) = self.sessions.get_or_create(session_id).await;
        let mut session = session.lock().await;
        let history = session.history();

        let mut tools = self.tools.fork();
        let answer = self
            .generator
            .generate(text, history.as_deref(), Some(&mut tools))
            .await?;

        let sources = tools.last_sources().to_vec();
        tools.reset_sources();

        session.add_exchange(text, answer.as_str());
        tracing::info!(
            "Answered query in {} with {} sources",
            session_id,
            sources.len()
        );

        Ok(QueryAnswer {
            answer,
            sources,
            session_id,
        })
    }

    /// Parse and store a single course file.
    ///
    /// Returns `(None, 0)` when the file cannot be read or parsed.
    pub async fn add_course_document(&self, path: &Path) -> AppResult<(Option<Course>, usize)> {
        let parsed = match read_document(path)
            .and_then(|doc| parse_course_document(&doc.name, &doc.content))
        {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                return Ok((None, 0));
            }
        };

        let chunks = chunk_course(&parsed, self.chunk_size, self.chunk_overlap);
        self.store.add_course(&parsed.course, &chunks).await?;

        Ok((Some(parsed.course), chunks.len()))
    }

    /// Ingest in-memory documents, skipping courses already stored.
    pub async fn ingest(&self, documents: &[Document]) -> AppResult<IngestStats> {
        let mut existing: HashSet<String> =
            self.store.existing_course_titles().await?.into_iter().collect();
        let mut stats = IngestStats::default();

        for document in documents {
            let outcome = self.ingest_document(document, &mut existing).await?;
            record(&mut stats, outcome);
        }

        Ok(stats)
    }

    /// Ingest every supported file directly inside `folder`.
    ///
    /// A missing folder yields empty stats. Unreadable or unparsable files
    /// are logged and counted as failed.
    pub async fn add_course_folder(
        &self,
        folder: &Path,
        clear_existing: bool,
    ) -> AppResult<IngestStats> {
        let mut stats = IngestStats::default();
        if !folder.is_dir() {
            tracing::warn!("Course folder {:?} does not exist", folder);
            return Ok(stats);
        }

        if clear_existing {
            tracing::info!("Clearing existing course data");
            self.store.clear_all_data().await?;
        }

        let mut existing: HashSet<String> =
            self.store.existing_course_titles().await?.into_iter().collect();

        let mut paths: Vec<_> = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && ContentType::from_path(p).is_supported())
            .collect();
        paths.sort();

        for path in paths {
            let document = match read_document(&path) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("Failed to read {:?}: {}", path, e);
                    stats.failed += 1;
                    continue;
                }
            };
            let outcome = self.ingest_document(&document, &mut existing).await?;
            record(&mut stats, outcome);
        }

        tracing::info!(
            "Ingested {} courses ({} chunks) from {:?}; {} skipped, {} failed",
            stats.courses_added,
            stats.chunks_added,
            folder,
            stats.skipped,
            stats.failed
        );
        Ok(stats)
    }

    async fn ingest_document(
        &self,
        document: &Document,
        existing: &mut HashSet<String>,
    ) -> AppResult<IngestOutcome> {
        let parsed = match parse_course_document(&document.name, &document.content) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Failed to parse '{}': {}", document.name, e);
                return Ok(IngestOutcome::Failed);
            }
        };

        if existing.contains(&parsed.course.title) {
            tracing::debug!("Course already exists: {}", parsed.course.title);
            return Ok(IngestOutcome::Skipped);
        }

        let chunks = chunk_course(&parsed, self.chunk_size, self.chunk_overlap);
        match self.store.add_course(&parsed.course, &chunks).await {
            Ok(()) => {
                tracing::info!(
                    "Added course '{}' with {} chunks",
                    parsed.course.title,
                    chunks.len()
                );
                existing.insert(parsed.course.title);
                Ok(IngestOutcome::Added {
                    chunks: chunks.len(),
                })
            }
            Err(e) if e.is_unavailable() => Err(e),
            Err(e) => {
                tracing::warn!("Failed to store '{}': {}", document.name, e);
                Ok(IngestOutcome::Failed)
            }
        }
    }

    pub async fn course_analytics(&self) -> AppResult<CourseAnalytics> {
        let course_titles = self.store.existing_course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }
}

fn record(stats: &mut IngestStats, outcome: IngestOutcome) {
    match outcome {
        IngestOutcome::Added { chunks } => {
            stats.courses_added += 1;
            stats.chunks_added += chunks;
        }
        IngestOutcome::Skipped => stats.skipped += 1,
        IngestOutcome::Failed => stats.failed += 1,
    }
}
