//! Course knowledge base and retrieval-augmented answering.
//!
//! Course documents are parsed into lessons, chunked, embedded and stored
//! in SQLite. The language model reaches the store through tools; the
//! [`rag::RagSystem`] ties ingestion, tools, generation and sessions
//! together.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod rag;
pub mod search;
pub mod tools;
pub mod types;
pub mod vector_store;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use rag::{AiGenerator, QueryAnswer, RagSystem, Session, SessionStore, Turn};
pub use search::SearchFilter;
pub use tools::{CourseOutlineTool, CourseSearchTool, Tool, ToolManager, OUTLINE_TOOL, SEARCH_TOOL};
pub use types::{
    Course, CourseAnalytics, CourseChunk, Document, IngestStats, Lesson, SearchResult, Source,
};
pub use vector_store::{SqliteVectorStore, VectorStore};
