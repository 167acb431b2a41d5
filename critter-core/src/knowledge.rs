//! Raw state-transition log.
//!
//! One entry per tick: the action taken and the scalars before and after it.

use serde::Serialize;

use crate::clock::Millis;
use crate::config::KnowledgeConfig;
use crate::history::History;
use crate::types::{Action, Vitals};

/// One observed transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KnowledgeRecord {
    /// Action taken.
    pub action: Action,
    /// Scalars before the action.
    pub pre: Vitals,
    /// Scalars after the action.
    pub post: Vitals,
    /// When it happened.
    pub timestamp: Millis,
}

impl KnowledgeRecord {
    /// Per-scalar `(name, post - pre)` deltas.
    pub fn deltas(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.pre
            .named()
            .zip(self.post.named())
            .map(|((name, before), (_, after))| (name, after - before))
    }
}

/// FIFO-bounded transition log.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    records: History<KnowledgeRecord>,
}

impl KnowledgeBase {
    /// Empty log.
    #[must_use]
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self {
            records: History::new(config.capacity),
        }
    }

    /// Append a transition, dropping the oldest when full.
    pub fn record(&mut self, action: Action, pre: Vitals, post: Vitals, timestamp: Millis) {
        self.records.push(KnowledgeRecord {
            action,
            pre,
            post,
            timestamp,
        });
    }

    /// Oldest to newest.
    pub fn records(&self) -> impl Iterator<Item = &KnowledgeRecord> {
        self.records.iter()
    }

    /// Number of stored transitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent transition.
    #[must_use]
    pub fn latest(&self) -> Option<&KnowledgeRecord> {
        self.records.last()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
