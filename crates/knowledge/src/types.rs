//! Course catalog and retrieval type definitions.

use serde::{Deserialize, Serialize};

/// A numbered lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_link: Option<String>,
}

/// A course as recorded in the catalog. The title is the course's unique id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            course_link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons
            .iter()
            .find(|l| l.lesson_number == lesson_number)
    }

    /// Link for a lesson, falling back to the course link.
    pub fn link_for(&self, lesson_number: Option<u32>) -> Option<String> {
        lesson_number
            .and_then(|n| self.lesson(n))
            .and_then(|l| l.lesson_link.clone())
            .or_else(|| self.course_link.clone())
    }
}

/// A piece of course text ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    /// Position of the chunk within its course
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Storage id: the course title with spaces replaced, plus the chunk index.
    pub fn id(&self) -> String {
        format!("{}_{}", self.course_title.replace(' ', "_"), self.chunk_index)
    }
}

/// A matched chunk with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
    pub score: f32,
}

impl SearchResult {
    /// Human-readable location, e.g. `Course - Lesson 2`.
    pub fn label(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("{} - Lesson {}", self.course_title, n),
            None => self.course_title.clone(),
        }
    }
}

/// A source shown to the user next to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub text: String,
    pub url: Option<String>,
}

impl Source {
    pub fn new(text: impl Into<String>, url: Option<String>) -> Self {
        Self {
            text: text.into(),
            url,
        }
    }
}

/// Course catalog summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// A course document held in memory, e.g. uploaded rather than read from disk.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name or other label; its stem is the fallback course title
    pub name: String,
    pub content: String,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub courses_added: usize,
    pub chunks_added: usize,
    /// Documents whose course title was already in the catalog
    pub skipped: usize,
    /// Documents that could not be read or parsed
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        Course {
            title: "Building Towards Computer Use".to_string(),
            course_link: Some("https://example.com/course".to_string()),
            instructor: Some("Colt Steele".to_string()),
            lessons: vec![
                Lesson {
                    lesson_number: 0,
                    title: "Introduction".to_string(),
                    lesson_link: Some("https://example.com/lesson0".to_string()),
                },
                Lesson {
                    lesson_number: 1,
                    title: "Overview".to_string(),
                    lesson_link: None,
                },
            ],
        }
    }

    #[test]
    fn test_link_fallback() {
        let course = course();
        assert_eq!(
            course.link_for(Some(0)).as_deref(),
            Some("https://example.com/lesson0")
        );
        assert_eq!(
            course.link_for(Some(1)).as_deref(),
            Some("https://example.com/course")
        );
        assert_eq!(
            course.link_for(None).as_deref(),
            Some("https://example.com/course")
        );
    }

    #[test]
    fn test_chunk_id() {
        let chunk = CourseChunk {
            content: "text".to_string(),
            course_title: "Test Course".to_string(),
            lesson_number: Some(1),
            chunk_index: 0,
        };
        assert_eq!(chunk.id(), "Test_Course_0");
    }

    #[test]
    fn test_search_result_label() {
        let mut result = SearchResult {
            content: "c".to_string(),
            course_title: "Test Course".to_string(),
            lesson_number: Some(2),
            chunk_index: 3,
            score: 0.5,
        };
        assert_eq!(result.label(), "Test Course - Lesson 2");
        result.lesson_number = None;
        assert_eq!(result.label(), "Test Course");
    }
}
