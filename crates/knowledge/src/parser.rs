//! Course document reading and structure extraction.
//!
//! A course document starts with optional header lines (`Course Title:`,
//! `Course Link:`, `Course Instructor:`) followed by lessons introduced by
//! `Lesson <n>: <title>` markers. A `Lesson Link:` line may directly follow
//! a marker.

use crate::types::{Course, Document, Lesson};
use ragchat_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

const TITLE_LABEL: &str = "Course Title:";
const LINK_LABEL: &str = "Course Link:";
const INSTRUCTOR_LABEL: &str = "Course Instructor:";
const LESSON_LINK_LABEL: &str = "Lesson Link:";

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Text belonging to one lesson, or to the preamble when `lesson_number` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonText {
    pub lesson_number: Option<u32>,
    pub text: String,
}

/// A parsed course document.
#[derive(Debug, Clone)]
pub struct ParsedCourse {
    pub course: Course,
    pub sections: Vec<LessonText>,
}

/// Read a course file from disk.
pub fn read_document(path: &Path) -> AppResult<Document> {
    let content_type = ContentType::from_path(path);
    if !content_type.is_supported() {
        return Err(AppError::Knowledge(format!(
            "Unsupported document type: {:?}",
            path
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    // Binary content that happens to be valid UTF-8
    if content.contains('\0') {
        return Err(AppError::Knowledge(format!(
            "Binary file not supported: {:?}",
            path
        )));
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(Document { name, content })
}

/// Extract course metadata and per-lesson text from a document.
///
/// `name_hint` is usually the file name. Its stem becomes the course title
/// when the document has no `Course Title:` line.
pub fn parse_course_document(name_hint: &str, text: &str) -> AppResult<ParsedCourse> {
    if text.trim().is_empty() {
        return Err(AppError::Knowledge(format!(
            "Document '{}' is empty",
            name_hint
        )));
    }

    let mut title: Option<String> = None;
    let mut course_link = None;
    let mut instructor = None;
    let mut lessons: Vec<Lesson> = Vec::new();

    let mut sections: Vec<LessonText> = Vec::new();
    let mut current = LessonText {
        lesson_number: None,
        text: String::new(),
    };
    let mut expect_lesson_link = false;

    for raw_line in text.lines() {
        let line = heading_text(raw_line);

        if line.is_empty() {
            if !current.text.is_empty() {
                current.text.push('\n');
            }
            continue;
        }

        if let Some((number, lesson_title)) = parse_lesson_marker(line) {
            push_section(&mut sections, current);
            current = LessonText {
                lesson_number: Some(number),
                text: String::new(),
            };
            lessons.push(Lesson {
                lesson_number: number,
                title: lesson_title,
                lesson_link: None,
            });
            expect_lesson_link = true;
            continue;
        }

        if expect_lesson_link {
            expect_lesson_link = false;
            if let Some(link) = strip_label(line, LESSON_LINK_LABEL) {
                if let Some(lesson) = lessons.last_mut() {
                    lesson.lesson_link = non_empty(link);
                }
                continue;
            }
        }

        // Header lines only count before the first lesson
        if lessons.is_empty() {
            if let Some(value) = strip_label(line, TITLE_LABEL) {
                title = non_empty(value);
                continue;
            }
            if let Some(value) = strip_label(line, LINK_LABEL) {
                course_link = non_empty(value);
                continue;
            }
            if let Some(value) = strip_label(line, INSTRUCTOR_LABEL) {
                instructor = non_empty(value);
                continue;
            }
        }

        current.text.push_str(line);
        current.text.push('\n');
    }
    push_section(&mut sections, current);

    let title = title.unwrap_or_else(|| title_from_name(name_hint));
    if title.is_empty() {
        return Err(AppError::Knowledge(format!(
            "Could not determine a course title for '{}'",
            name_hint
        )));
    }

    tracing::debug!(
        "Parsed course '{}' with {} lessons and {} text sections",
        title,
        lessons.len(),
        sections.len()
    );

    Ok(ParsedCourse {
        course: Course {
            title,
            course_link,
            instructor,
            lessons,
        },
        sections,
    })
}

fn push_section(sections: &mut Vec<LessonText>, mut section: LessonText) {
    let trimmed = section.text.trim();
    if trimmed.is_empty() {
        return;
    }
    section.text = trimmed.to_string();
    sections.push(section);
}

/// Markdown headings are accepted in place of plain header lines.
fn heading_text(line: &str) -> &str {
    line.trim().trim_start_matches('#').trim()
}

/// Parse `Lesson <n>: <title>`.
fn parse_lesson_marker(line: &str) -> Option<(u32, String)> {
    let rest = strip_label(line, "Lesson")?;
    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }

    let number = rest[..digits_end].parse::<u32>().ok()?;
    let title = rest[digits_end..].trim_start().strip_prefix(':')?;
    Some((number, title.trim().to_string()))
}

/// Case-insensitive label match; returns the trimmed remainder.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let len = label.len();
    if line.len() < len || !line.is_char_boundary(len) {
        return None;
    }
    line[..len]
        .eq_ignore_ascii_case(label)
        .then(|| line[len..].trim())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn title_from_name(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .trim()
        .to_string()
}
