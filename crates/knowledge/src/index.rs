//! SQLite storage for the course catalog and course content embeddings.
//!
//! Two tables: `course_catalog` holds one row per course (with an embedding
//! of its title for name resolution), `course_content` holds the chunks.
//! Similarity is computed in process over all candidate rows.

use crate::types::{Course, CourseChunk, Lesson, SearchResult};
use ragchat_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS course_catalog (
        title TEXT PRIMARY KEY,
        instructor TEXT,
        course_link TEXT,
        lesson_count INTEGER NOT NULL,
        lessons_json TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS course_content (
        id TEXT PRIMARY KEY,
        course_title TEXT NOT NULL,
        lesson_number INTEGER,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_content_course_lesson
        ON course_content(course_title, lesson_number);
"#;

fn backend(context: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::BackendUnavailable(format!("{}: {}", context, e))
}

/// Open (creating if needed) the database file and its tables.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::BackendUnavailable(format!(
                    "Failed to create database directory {:?}: {}",
                    parent, e
                ))
            })?;
        }
    }

    let conn = Connection::open(db_path).map_err(backend("Failed to open SQLite database"))?;
    create_schema(&conn)?;

    tracing::debug!("Initialized SQLite vector store at {:?}", db_path);
    Ok(conn)
}

/// Open a private in-memory database.
pub fn init_in_memory() -> AppResult<Connection> {
    let conn = Connection::open_in_memory().map_err(backend("Failed to open SQLite database"))?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(SCHEMA)
        .map_err(backend("Failed to create tables"))
}

/// Insert or replace a course catalog row.
pub fn upsert_course(conn: &Connection, course: &Course, embedding: &[f32]) -> AppResult<()> {
    let lessons_json = serde_json::to_string(&course.lessons)?;

    conn.execute(
        "INSERT OR REPLACE INTO course_catalog
             (title, instructor, course_link, lesson_count, lessons_json, embedding)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            course.title,
            course.instructor,
            course.course_link,
            course.lesson_count() as i64,
            lessons_json,
            embedding_to_bytes(embedding),
        ],
    )
    .map_err(backend("Failed to insert course"))?;

    Ok(())
}

/// Insert chunks and their embeddings in one transaction.
pub fn insert_chunks(conn: &mut Connection, chunks: &[(CourseChunk, Vec<f32>)]) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(backend("Failed to begin transaction"))?;
    write_chunks(&tx, chunks)?;
    tx.commit().map_err(backend("Failed to commit chunks"))?;

    tracing::debug!("Inserted {} chunks", chunks.len());
    Ok(())
}

/// Store a course and its content atomically: either both land or neither.
pub fn insert_course_with_chunks(
    conn: &mut Connection,
    course: &Course,
    course_embedding: &[f32],
    chunks: &[(CourseChunk, Vec<f32>)],
) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(backend("Failed to begin transaction"))?;
    upsert_course(&tx, course, course_embedding)?;
    write_chunks(&tx, chunks)?;
    tx.commit().map_err(backend("Failed to commit course"))?;

    tracing::debug!("Stored course '{}' with {} chunks", course.title, chunks.len());
    Ok(())
}

fn write_chunks(conn: &Connection, chunks: &[(CourseChunk, Vec<f32>)]) -> AppResult<()> {
    let mut stmt = conn
        .prepare(
            "INSERT OR REPLACE INTO course_content
                 (id, course_title, lesson_number, chunk_index, content, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(backend("Failed to prepare insert"))?;

    for (chunk, embedding) in chunks {
        stmt.execute(params![
            chunk.id(),
            chunk.course_title,
            chunk.lesson_number,
            chunk.chunk_index as i64,
            chunk.content,
            embedding_to_bytes(embedding),
        ])
        .map_err(backend("Failed to insert chunk"))?;
    }
    Ok(())
}

struct CatalogRow {
    title: String,
    instructor: Option<String>,
    course_link: Option<String>,
    lessons_json: String,
    embedding: Vec<u8>,
}

impl CatalogRow {
    fn into_course(self) -> AppResult<(Course, Vec<f32>)> {
        let lessons: Vec<Lesson> = serde_json::from_str(&self.lessons_json)?;
        let embedding = bytes_to_embedding(&self.embedding)?;
        Ok((
            Course {
                title: self.title,
                course_link: self.course_link,
                instructor: self.instructor,
                lessons,
            },
            embedding,
        ))
    }
}

fn read_catalog_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogRow> {
    Ok(CatalogRow {
        title: row.get(0)?,
        instructor: row.get(1)?,
        course_link: row.get(2)?,
        lessons_json: row.get(3)?,
        embedding: row.get(4)?,
    })
}

/// All catalog rows with their title embeddings, ordered by title.
pub fn load_catalog(conn: &Connection) -> AppResult<Vec<(Course, Vec<f32>)>> {
    let mut stmt = conn
        .prepare(
            "SELECT title, instructor, course_link, lessons_json, embedding
             FROM course_catalog ORDER BY title",
        )
        .map_err(backend("Failed to prepare catalog query"))?;

    let rows = stmt
        .query_map([], read_catalog_row)
        .map_err(backend("Failed to query catalog"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(backend("Failed to read catalog row"))?;

    rows.into_iter().map(CatalogRow::into_course).collect()
}

/// Catalog row for an exact course title.
pub fn course_metadata(conn: &Connection, title: &str) -> AppResult<Option<Course>> {
    let row = conn
        .query_row(
            "SELECT title, instructor, course_link, lessons_json, embedding
             FROM course_catalog WHERE title = ?1",
            params![title],
            read_catalog_row,
        )
        .optional()
        .map_err(backend("Failed to query course"))?;

    row.map(|r| r.into_course().map(|(course, _)| course))
        .transpose()
}

pub fn course_titles(conn: &Connection) -> AppResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT title FROM course_catalog ORDER BY title")
        .map_err(backend("Failed to prepare title query"))?;

    let titles = stmt
        .query_map([], |row| row.get(0))
        .map_err(backend("Failed to query titles"))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(backend("Failed to read title"))?;

    Ok(titles)
}

/// Score content rows against a query embedding, optionally filtered by
/// exact course title and lesson number. Best matches first.
pub fn query_content(
    conn: &Connection,
    query_embedding: &[f32],
    course_title: Option<&str>,
    lesson_number: Option<u32>,
    top_k: usize,
) -> AppResult<Vec<SearchResult>> {
    let mut stmt = conn
        .prepare(
            "SELECT course_title, lesson_number, chunk_index, content, embedding
             FROM course_content
             WHERE (?1 IS NULL OR course_title = ?1)
               AND (?2 IS NULL OR lesson_number = ?2)",
        )
        .map_err(backend("Failed to prepare content query"))?;

    let rows = stmt
        .query_map(params![course_title, lesson_number], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<u32>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })
        .map_err(backend("Failed to query content"))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(backend("Failed to read content row"))?;

    let mut results = Vec::with_capacity(rows.len());
    for (course_title, lesson_number, chunk_index, content, bytes) in rows {
        let embedding = bytes_to_embedding(&bytes)?;
        results.push(SearchResult {
            content,
            course_title,
            lesson_number,
            chunk_index: chunk_index as usize,
            score: cosine_similarity(query_embedding, &embedding),
        });
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.chunk_index.cmp(&b.chunk_index))
    });
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} chunks (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Number of (courses, chunks) stored.
pub fn get_stats(conn: &Connection) -> AppResult<(usize, usize)> {
    let count = |sql: &str| -> AppResult<usize> {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0))
            .map(|v| v as usize)
            .map_err(backend("Failed to count rows"))
    };

    Ok((
        count("SELECT COUNT(*) FROM course_catalog")?,
        count("SELECT COUNT(*) FROM course_content")?,
    ))
}

/// Delete every course and chunk.
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch("DELETE FROM course_content; DELETE FROM course_catalog;")
        .map_err(backend("Failed to clear vector store"))?;

    tracing::info!("Cleared course catalog and content");
    Ok(())
}

/// Encode an embedding as little-endian `f32` bytes.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::BackendUnavailable(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Cosine similarity; zero for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
