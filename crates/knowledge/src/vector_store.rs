//! Vector store over the course catalog and course content.
//!
//! The [`VectorStore`] trait is what the search tools and the RAG system
//! talk to; [`SqliteVectorStore`] is the production implementation.

use crate::embeddings::EmbeddingProvider;
use crate::index;
use crate::search::SearchFilter;
use crate::types::{Course, CourseChunk, SearchResult};
use async_trait::async_trait;
use ragchat_core::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Minimum cosine similarity for a semantic course-name match.
/// Range: -1.0 to 1.0. Suitable for trigram embeddings; neural models
/// usually warrant 0.3-0.5.
pub const MIN_RELEVANCE_SCORE: f32 = 0.20;

const DEFAULT_BATCH_SIZE: usize = 100;

/// Storage and similarity search for courses.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Search course content, best matches first.
    ///
    /// Fails with `NotFound` when the filter names a course that cannot be
    /// resolved or selects no content, and with `BackendUnavailable` when
    /// the database cannot be used. An unfiltered search of an empty store
    /// returns no results.
    async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: Option<usize>,
    ) -> AppResult<Vec<SearchResult>>;

    /// Map a possibly partial course name to a catalog title.
    async fn resolve_course_name(&self, name: &str) -> AppResult<Option<String>>;

    async fn add_course_metadata(&self, course: &Course) -> AppResult<()>;

    async fn add_course_content(&self, chunks: &[CourseChunk]) -> AppResult<()>;

    /// Store a course together with its content.
    ///
    /// Nothing is written unless everything can be: a failure leaves no
    /// catalog entry behind, so the course is retried on the next ingest.
    async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> AppResult<()>;

    async fn clear_all_data(&self) -> AppResult<()>;

    async fn existing_course_titles(&self) -> AppResult<Vec<String>>;

    async fn course_count(&self) -> AppResult<usize>;

    async fn all_courses_metadata(&self) -> AppResult<Vec<Course>>;

    async fn course_metadata(&self, title: &str) -> AppResult<Option<Course>>;

    async fn course_link(&self, title: &str) -> AppResult<Option<String>> {
        Ok(self
            .course_metadata(title)
            .await?
            .and_then(|c| c.course_link))
    }

    /// Lesson link, falling back to the course link.
    async fn lesson_link(&self, title: &str, lesson_number: u32) -> AppResult<Option<String>> {
        Ok(self
            .course_metadata(title)
            .await?
            .and_then(|c| c.link_for(Some(lesson_number))))
    }
}

/// SQLite-backed store with in-process cosine similarity.
///
/// Embedding happens outside the connection lock; the lock is only held
/// for the database round trip.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    max_results: usize,
    batch_size: usize,
}

impl SqliteVectorStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(
        db_path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        max_results: usize,
    ) -> AppResult<Self> {
        let conn = index::init_index(db_path)?;
        Ok(Self::with_connection(conn, embedder, max_results))
    }

    pub fn open_in_memory(
        embedder: Arc<dyn EmbeddingProvider>,
        max_results: usize,
    ) -> AppResult<Self> {
        let conn = index::init_in_memory()?;
        Ok(Self::with_connection(conn, embedder, max_results))
    }

    fn with_connection(
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
        max_results: usize,
    ) -> Self {
        Self {
            conn: Mutex::new(conn),
            embedder,
            max_results: max_results.max(1),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Number of texts per embedding request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::BackendUnavailable("Database connection poisoned".to_string()))
    }

    async fn embed_all(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.embedder.embed_batch(batch).await?);
        }

        if embeddings.len() != texts.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        limit: Option<usize>,
    ) -> AppResult<Vec<SearchResult>> {
        let course_title = match &filter.course_name {
            Some(name) => match self.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => {
                    return Err(AppError::NotFound(format!(
                        "No course found matching '{}'",
                        name
                    )))
                }
            },
            None => None,
        };

        let query_embedding = self.embedder.embed(query).await?;
        let top_k = limit.unwrap_or(self.max_results).max(1);

        let results = {
            let conn = self.lock()?;
            index::query_content(
                &conn,
                &query_embedding,
                course_title.as_deref(),
                filter.lesson_number,
                top_k,
            )?
        };

        if results.is_empty() && filter.has_filters() {
            return Err(AppError::NotFound(format!(
                "No content found{}",
                filter.describe()
            )));
        }

        tracing::debug!(
            "Search for '{}'{} returned {} results",
            query,
            filter.describe(),
            results.len()
        );
        Ok(results)
    }

    async fn resolve_course_name(&self, name: &str) -> AppResult<Option<String>> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(None);
        }

        let catalog = {
            let conn = self.lock()?;
            index::load_catalog(&conn)?
        };

        if let Some((course, _)) = catalog
            .iter()
            .find(|(c, _)| c.title.to_lowercase() == wanted)
        {
            return Ok(Some(course.title.clone()));
        }

        if let Some((course, _)) = catalog
            .iter()
            .find(|(c, _)| c.title.to_lowercase().contains(&wanted))
        {
            return Ok(Some(course.title.clone()));
        }

        if catalog.is_empty() {
            return Ok(None);
        }

        let name_embedding = self.embedder.embed(name).await?;
        let best = catalog
            .iter()
            .map(|(course, embedding)| {
                (course, index::cosine_similarity(&name_embedding, embedding))
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((course, score)) if score >= MIN_RELEVANCE_SCORE => {
                tracing::debug!(
                    "Resolved course name '{}' to '{}' (score {:.2})",
                    name,
                    course.title,
                    score
                );
                Ok(Some(course.title.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn add_course_metadata(&self, course: &Course) -> AppResult<()> {
        let embedding = self.embedder.embed(&course.title).await?;
        let conn = self.lock()?;
        index::upsert_course(&conn, course, &embedding)
    }

    async fn add_course_content(&self, chunks: &[CourseChunk]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embed_all(&texts).await?;

        let rows: Vec<(CourseChunk, Vec<f32>)> =
            chunks.iter().cloned().zip(embeddings).collect();

        let mut conn = self.lock()?;
        index::insert_chunks(&mut conn, &rows)
    }

    async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> AppResult<()> {
        let course_embedding = self.embedder.embed(&course.title).await?;
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embed_all(&texts).await?;

        let rows: Vec<(CourseChunk, Vec<f32>)> =
            chunks.iter().cloned().zip(embeddings).collect();

        let mut conn = self.lock()?;
        index::insert_course_with_chunks(&mut conn, course, &course_embedding, &rows)
    }

    async fn clear_all_data(&self) -> AppResult<()> {
        let conn = self.lock()?;
        index::reset_index(&conn)
    }

    async fn existing_course_titles(&self) -> AppResult<Vec<String>> {
        let conn = self.lock()?;
        index::course_titles(&conn)
    }

    async fn course_count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        index::get_stats(&conn).map(|(courses, _)| courses)
    }

    async fn all_courses_metadata(&self) -> AppResult<Vec<Course>> {
        let conn = self.lock()?;
        Ok(index::load_catalog(&conn)?
            .into_iter()
            .map(|(course, _)| course)
            .collect())
    }

    async fn course_metadata(&self, title: &str) -> AppResult<Option<Course>> {
        let conn = self.lock()?;
        index::course_metadata(&conn, title)
    }
}
