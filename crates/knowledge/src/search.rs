//! Search filters for course content queries.

use serde::{Deserialize, Serialize};

/// Optional restriction of a search to one course and/or lesson.
///
/// `course_name` may be partial or approximate; the vector store resolves
/// it to a catalog title before filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub course_name: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_course(mut self, course_name: impl Into<String>) -> Self {
        self.course_name = Some(course_name.into());
        self
    }

    pub fn with_lesson(mut self, lesson_number: u32) -> Self {
        self.lesson_number = Some(lesson_number);
        self
    }

    /// Treats a blank course name as absent.
    pub fn from_parts(course_name: Option<&str>, lesson_number: Option<u32>) -> Self {
        Self {
            course_name: course_name
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            lesson_number,
        }
    }

    pub fn has_filters(&self) -> bool {
        self.course_name.is_some() || self.lesson_number.is_some()
    }

    /// Suffix describing the filter, e.g. ` in course 'MCP' in lesson 2`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(course) = &self.course_name {
            out.push_str(&format!(" in course '{}'", course));
        }
        if let Some(lesson) = self.lesson_number {
            out.push_str(&format!(" in lesson {}", lesson));
        }
        out
    }
}
