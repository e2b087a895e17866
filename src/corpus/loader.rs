//! Chunk extraction from corpus files.

use std::borrow::Cow;
use std::path::Path;

use tracing::{debug, warn};

use super::{CorpusError, CorpusSnapshot};

/// Default upper bound on chunk length, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 1000;

/// Reads corpus files and splits them into embeddable chunks.
///
/// Paragraphs (blocks separated by blank lines) are whitespace-normalized
/// and packed greedily into chunks of at most `max_chunk_chars` characters.
/// A paragraph longer than the limit is cut on character boundaries.
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    max_chunk_chars: usize,
}

impl Default for CorpusLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_CHARS)
    }
}

impl CorpusLoader {
    pub fn new(max_chunk_chars: usize) -> Self {
        Self {
            max_chunk_chars: max_chunk_chars.max(1),
        }
    }

    /// Load every file named in `snapshot` and return its chunks in
    /// snapshot (path) order.
    ///
    /// A file that disappeared or became unreadable since the snapshot was
    /// taken is skipped; the next snapshot will differ and trigger a rebuild.
    pub fn load_chunks(
        &self,
        directory: &Path,
        snapshot: &CorpusSnapshot,
    ) -> Result<Vec<String>, CorpusError> {
        if !directory.is_dir() {
            return Err(CorpusError::NotADirectory {
                path: directory.to_path_buf(),
            });
        }

        let mut chunks = Vec::new();
        for name in snapshot.paths() {
            let path = directory.join(name);
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&bytes);
            if matches!(text, Cow::Owned(_)) {
                warn!(
                    "{} is not valid UTF-8; invalid bytes were replaced",
                    path.display()
                );
            }
            let file_chunks = self.chunk_text(&text);
            debug!("{} -> {} chunks", path.display(), file_chunks.len());
            chunks.extend(file_chunks);
        }

        Ok(chunks)
    }

    /// Split a single document into chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0;

        for paragraph in paragraphs(text) {
            let para_chars = paragraph.chars().count();

            if para_chars > self.max_chunk_chars {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_chars = 0;
                }
                chunks.extend(split_chars(&paragraph, self.max_chunk_chars));
                continue;
            }

            // +2 for the paragraph separator
            let joined = if current.is_empty() {
                para_chars
            } else {
                current_chars + 2 + para_chars
            };
            if joined > self.max_chunk_chars {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }

            if !current.is_empty() {
                current.push_str("\n\n");
                current_chars += 2;
            }
            current.push_str(&paragraph);
            current_chars += para_chars;
        }

        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

/// Blank-line separated blocks with internal whitespace collapsed.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut words: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !words.is_empty() {
                out.push(words.join(" "));
                words.clear();
            }
        } else {
            words.extend(line.split_whitespace());
        }
    }
    if !words.is_empty() {
        out.push(words.join(" "));
    }
    out
}

fn split_chars(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
