//! Append-only feedback history for one run.

use serde::{Deserialize, Serialize};

use crate::core::types::Feedback;

/// Ordered history of attempt feedback.
///
/// The sole mutable state shared across attempts. The only mutation is
/// appending; recorded entries are read-only. Serializes as a plain sequence
/// so external storage layers can persist it however they like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLog {
    entries: Vec<Feedback>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record feedback for one attempt.
    pub fn append(&mut self, feedback: Feedback) {
        self.entries.push(feedback);
    }

    /// Entries in append order.
    pub fn entries(&self) -> &[Feedback] {
        &self.entries
    }

    /// Feedback recorded for a specific attempt, if any.
    pub fn for_attempt(&self, attempt: u32) -> Option<&Feedback> {
        self.entries.iter().find(|entry| entry.attempt == attempt)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
