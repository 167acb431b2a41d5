//! A single episodic memory.

use serde::Serialize;

use crate::codec;
use crate::embedding::Embedding;
use crate::lifecycle::LifecycleInfo;
use crate::types::{Action, StateDim, Vitals};

/// What happened, how it felt, and how much it mattered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryRecord {
    /// Action taken.
    pub action: Action,
    /// Scalars at the time, keyed by [`StateDim`].
    pub context: Vitals,
    /// Retrieval value in `[0, 1]`; drives eviction.
    pub importance: f32,
    /// Dominant emotion at the time.
    pub emotion: String,
    /// Lifecycle at the time.
    pub lifecycle: LifecycleInfo,
    /// Combined state / emotion / action embedding.
    pub embedding: Embedding,
    /// Wire timestamp.
    pub timestamp: u32,
}

impl MemoryRecord {
    /// Text matched by keyword search: `"action emotion"`.
    #[must_use]
    pub fn search_text(&self) -> String {
        format!("{} {}", self.action, self.emotion)
    }

    /// Context as `(name, value)` pairs.
    pub fn context_named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.context.named()
    }

    pub(crate) fn encoded_len(&self) -> usize {
        codec::str_len(self.action.name())
            + codec::str_len(&self.emotion)
            + 4
            + 4
            + 4 * StateDim::COUNT
            + 4
    }

    /// Smallest possible encoded record: two empty strings.
    pub(crate) const MIN_ENCODED_LEN: usize = 1 + 1 + 4 + 4 + 4 * StateDim::COUNT + 4;
}
