//! In-memory model of the post log.
//!
//! The set of entries for the current period is loaded once at the start of a
//! run and is the single source of truth for "already handled" checks.

use serde::{Deserialize, Serialize};

use crate::domain::source::SourceId;

/// Record of one completed post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLogEntry {
    pub source: SourceId,
    pub indicator: String,
    pub posted: bool,
}

/// The loaded log for one period.
#[derive(Debug, Clone, Default)]
pub struct PostLog {
    entries: Vec<PostLogEntry>,
}

impl PostLog {
    pub fn new(entries: Vec<PostLogEntry>) -> Self {
        Self { entries }
    }

    pub fn contains(&self, source: SourceId, indicator: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.source == source && e.indicator == indicator && e.posted)
    }

    /// Append an entry unless an identical one is already present.
    pub fn append(&mut self, source: SourceId, indicator: &str) {
        if self.contains(source, indicator) {
            return;
        }
        self.entries.push(PostLogEntry {
            source,
            indicator: indicator.to_string(),
            posted: true,
        });
    }

    pub fn entries(&self) -> &[PostLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
