//! Offline embedding provider built from hashed word trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use ragchat_core::AppResult;
use std::collections::HashMap;

/// Words too common to tell course passages apart.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "how", "about", "course", "lesson", "content",
];

/// Deterministic, content-dependent embeddings with no external service.
///
/// Each distinct word contributes its hashed trigrams and the whole word to
/// a fixed number of buckets; the vector is normalized to unit length.
/// Lexically close texts score high under cosine similarity, which is
/// enough for course-name resolution and offline search.
#[derive(Debug)]
pub struct TrigramProvider {
    model: String,
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();
        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let weight = (*freq as f32).sqrt();
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let idx = bucket(window.iter().copied(), 37, self.dimensions);
                embedding[idx] += weight;
            }

            let idx = bucket(word.chars(), 31, self.dimensions);
            embedding[idx] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

fn bucket(chars: impl Iterator<Item = char>, multiplier: u64, dimensions: usize) -> usize {
    let hash = chars.fold(0u64, |acc, c| {
        acc.wrapping_mul(multiplier).wrapping_add(c as u64)
    });
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
