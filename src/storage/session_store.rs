//! Session rows and the stores that accept them.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PersistenceError;

/// One persisted turn of a closed session.
///
/// Every row of a session carries the same `timestamp`, formatted to the
/// minute in the configured timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    pub email: String,
    pub name: Option<String>,
    pub question: String,
    pub answer: String,
    pub timestamp: String,
}

/// What a store reports back for one insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub success: bool,
    pub rows_affected: usize,
}

/// Destination for closed sessions.
pub trait SessionStore: Send + Sync {
    fn insert(&self, rows: &[SessionRow]) -> Result<InsertOutcome, PersistenceError>;
}

/// Appends each row as one JSON object per line.
#[derive(Debug)]
pub struct JsonlSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for JsonlSessionStore {
    fn insert(&self, rows: &[SessionRow]) -> Result<InsertOutcome, PersistenceError> {
        // Encode everything first so a bad row never leaves a partial session
        let mut buffer = Vec::new();
        for row in rows {
            serde_json::to_writer(&mut buffer, row)?;
            buffer.push(b'\n');
        }

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        file.write_all(&buffer).map_err(|e| self.write_error(e))?;
        file.flush().map_err(|e| self.write_error(e))?;

        info!("Saved {} session rows to {}", rows.len(), self.path.display());
        Ok(InsertOutcome {
            success: true,
            rows_affected: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(question: &str, answer: &str) -> SessionRow {
        SessionRow {
            email: "21f1000001@ds.study.iitm.ac.in".to_string(),
            name: Some("Asha".to_string()),
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: "2024-03-01 15:30".to_string(),
        }
    }

    #[test]
    fn test_rows_are_appended_as_json_lines() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlSessionStore::new(temp_dir.path().join("out").join("sessions.jsonl"));

        let first = store.insert(&[row("q1", "a1"), row("q2", "a2")]).unwrap();
        store.insert(&[row("q3", "a3")]).unwrap();

        assert_eq!(
            first,
            InsertOutcome {
                success: true,
                rows_affected: 2
            }
        );
        let content = std::fs::read_to_string(store.path()).unwrap();
        let rows: Vec<SessionRow> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows, vec![row("q1", "a1"), row("q2", "a2"), row("q3", "a3")]);
    }

    #[test]
    fn test_missing_name_is_null() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlSessionStore::new(temp_dir.path().join("sessions.jsonl"));
        let mut anonymous = row("q", "a");
        anonymous.name = None;

        store.insert(&[anonymous]).unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains(r#""name":null"#));
    }

    #[test]
    fn test_unwritable_path_is_a_write_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let store = JsonlSessionStore::new(blocker.join("sessions.jsonl"));

        assert!(matches!(
            store.insert(&[row("q", "a")]),
            Err(PersistenceError::Write { .. })
        ));
    }
}
