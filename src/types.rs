use serde::{Serialize, Deserialize};
use std::path::PathBuf;

/// One (target, source) file pair to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub sequence: usize,
    pub target: PathBuf,
    pub source: PathBuf,
    pub target_name: String,
    pub source_name: String,
}

/// Counted representative of every target line sharing a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRecord {
    pub count: usize,
    pub raw: String,
}

/// A leftover target line judged close to a missing source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosestCandidate {
    pub id: String,
    pub type_code: String,
    pub raw: String,
    pub indices: Vec<usize>,
}

impl ClosestCandidate {
    pub fn joined_indices(&self, delimiter: &str) -> String {
        self.indices
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

/// A source line with no remaining target copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundRecord {
    pub id: String,
    pub type_code: String,
    pub raw: String,
    pub closest: Vec<ClosestCandidate>,
}

impl NotFoundRecord {
    /// Candidate with the fewest differing positions, first one on ties.
    pub fn best_candidate(&self) -> Option<&ClosestCandidate> {
        self.closest
            .iter()
            .reduce(|best, c| if c.indices.len() < best.indices.len() { c } else { best })
    }
}
