//! Sentence-based text chunking with configurable size and overlap.

use crate::parser::ParsedCourse;
use crate::types::CourseChunk;
use unicode_segmentation::UnicodeSegmentation;

/// Chunk text into overlapping segments of whole sentences.
///
/// `chunk_size` and `overlap` are measured in characters. Trailing sentences
/// of a chunk that fit within `overlap` are repeated at the start of the
/// next one. A sentence longer than `chunk_size` is split on its own.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let sentences = split_sentences(text, chunk_size);
    if sentences.is_empty() {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < sentences.len() {
        let mut current = String::new();
        let mut current_len = 0;
        let mut end = start;

        while end < sentences.len() {
            let sentence_len = char_len(&sentences[end]);
            let added = if current.is_empty() {
                sentence_len
            } else {
                sentence_len + 1
            };
            if !current.is_empty() && current_len + added > chunk_size {
                break;
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentences[end]);
            current_len += added;
            end += 1;
        }

        chunks.push(current);

        if end >= sentences.len() {
            break;
        }

        // Walk back over trailing sentences that fit in the overlap,
        // never past the chunk's first sentence.
        let mut carried = 0;
        let mut carried_len = 0;
        for sentence in sentences[start + 1..end].iter().rev() {
            let len = char_len(sentence) + 1;
            if carried_len + len > overlap {
                break;
            }
            carried_len += len;
            carried += 1;
        }
        start = end - carried;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// Turn a parsed course into chunks ready for embedding.
///
/// Chunk indices run across the whole course. Each chunk carries a context
/// prefix naming the course and lesson.
pub fn chunk_course(parsed: &ParsedCourse, chunk_size: usize, overlap: usize) -> Vec<CourseChunk> {
    let title = &parsed.course.title;
    let mut chunks = Vec::new();

    for section in &parsed.sections {
        let prefix = match section.lesson_number {
            Some(n) => format!("Course {} Lesson {} content: ", title, n),
            None => format!("Course {} content: ", title),
        };

        for text in chunk_text(&section.text, chunk_size, overlap) {
            chunks.push(CourseChunk {
                content: format!("{}{}", prefix, text),
                course_title: title.clone(),
                lesson_number: section.lesson_number,
                chunk_index: chunks.len(),
            });
        }
    }

    chunks
}

/// Split into whitespace-normalized sentences, breaking any that exceed `max_len`.
fn split_sentences(text: &str, max_len: usize) -> Vec<String> {
    let mut sentences = Vec::new();

    for sentence in text.unicode_sentences() {
        let normalized = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            continue;
        }
        if char_len(&normalized) <= max_len {
            sentences.push(normalized);
            continue;
        }

        // Break at char boundaries, preferring the last space in range
        let mut rest = normalized.as_str();
        while !rest.is_empty() {
            let mut end = rest
                .char_indices()
                .nth(max_len)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            if end < rest.len() {
                if let Some(space) = rest[..end].rfind(' ') {
                    if space > 0 {
                        end = space;
                    }
                }
            }
            let piece = rest[..end].trim();
            if !piece.is_empty() {
                sentences.push(piece.to_string());
            }
            rest = rest[end..].trim_start();
        }
    }

    sentences
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
