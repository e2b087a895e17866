//! Near-duplicate question detection over a conversation's own history.
//!
//! Questions are compared as TF-IDF vectors fitted on the incoming question
//! plus every prior question of the same conversation. Tokens are
//! lowercased runs of two or more word characters, idf is smoothed as
//! `ln((1 + n) / (1 + df)) + 1` and rows are L2-normalized, so cosine
//! similarity reduces to a dot product.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::Turn;

/// Similarity a prior question must exceed to be reused.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// A prior turn whose question matched the incoming one.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub question: String,
    pub answer: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct SimilarityCache {
    threshold: f64,
}

impl Default for SimilarityCache {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityCache {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Find the prior turn most similar to `question`.
    ///
    /// Returns `None` for an empty history, when no token survives
    /// tokenization, or when the best score does not exceed the threshold.
    /// Among equal best scores the earliest turn wins.
    pub fn find(&self, question: &str, history: &[Turn]) -> Option<CacheHit> {
        if history.is_empty() {
            return None;
        }

        let mut documents = Vec::with_capacity(history.len() + 1);
        documents.push(question);
        documents.extend(history.iter().map(|turn| turn.question.as_str()));

        let rows = tfidf_rows(&documents)?;
        let (query, priors) = rows.split_first()?;

        let mut best: Option<(usize, f64)> = None;
        for (i, row) in priors.iter().enumerate() {
            let score = dot(query, row);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((i, score));
            }
        }

        let (i, score) = best?;
        debug!("Closest prior question #{i} scored {score:.3}");
        (score > self.threshold).then(|| CacheHit {
            question: history[i].question.clone(),
            answer: history[i].answer.clone(),
            score,
        })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// L2-normalized TF-IDF rows over a shared vocabulary, or `None` when the
/// vocabulary is empty.
fn tfidf_rows(documents: &[&str]) -> Option<Vec<Vec<f64>>> {
    let mut vocabulary: HashMap<String, usize> = HashMap::new();
    let counts: Vec<HashMap<usize, f64>> = documents
        .iter()
        .map(|doc| {
            let mut row = HashMap::new();
            for token in tokenize(doc) {
                let next_id = vocabulary.len();
                let id = *vocabulary.entry(token).or_insert(next_id);
                *row.entry(id).or_insert(0.0) += 1.0;
            }
            row
        })
        .collect();

    if vocabulary.is_empty() {
        return None;
    }

    let mut document_frequency = vec![0usize; vocabulary.len()];
    for row in &counts {
        for id in row.keys() {
            document_frequency[*id] += 1;
        }
    }
    let n = documents.len() as f64;
    let idf: Vec<f64> = document_frequency
        .iter()
        .map(|df| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
        .collect();

    Some(
        counts
            .into_iter()
            .map(|row| {
                let mut dense = vec![0.0; vocabulary.len()];
                for (id, count) in row {
                    dense[id] = count * idf[id];
                }
                let norm = dense.iter().map(|x| x * x).sum::<f64>().sqrt();
                if norm > 0.0 {
                    dense.iter_mut().for_each(|x| *x /= norm);
                }
                dense
            })
            .collect(),
    )
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
