//! Bounded episodic memory with keyword and embedding search.
//!
//! Unlike the FIFO histories elsewhere, the store evicts by importance:
//! when it fills up, the less important half is forgotten in one go.

pub mod record;

pub use record::MemoryRecord;

use ordered_float::OrderedFloat;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::codec::{ByteReader, StagingBuffer};
use crate::config::MemoryConfig;
use crate::embedding::{EMBEDDING_DIM, Embedding, HashEmbedder, TextEmbedder, combined_embedding};
use crate::error::Result;
use crate::lifecycle::LifecycleInfo;
use crate::types::{Action, StateDim, Vitals, unit};

/// Snapshot blob label.
pub const SUBSYSTEM: &str = "MemorySystem";

/// Counters for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySummary {
    /// Records stored.
    pub total: usize,
    /// Maximum records.
    pub capacity: usize,
    /// Searches performed.
    pub retrievals: u32,
    /// Importance evictions performed.
    pub consolidations: u32,
}

/// Importance-evicted memory store.
pub struct MemoryStore {
    records: Vec<MemoryRecord>,
    capacity: usize,
    retrievals: u32,
    consolidations: u32,
    embedder: Arc<dyn TextEmbedder>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.records.len())
            .field("capacity", &self.capacity)
            .field("retrievals", &self.retrievals)
            .field("consolidations", &self.consolidations)
            .field("embedder", &self.embedder.model_name())
            .finish()
    }
}

fn by_importance(record: &MemoryRecord) -> OrderedFloat<f32> {
    OrderedFloat(record.importance)
}

impl MemoryStore {
    /// Empty store using the hash embedder.
    #[must_use]
    pub fn new(config: &MemoryConfig) -> Self {
        Self::with_embedder(config, Arc::new(HashEmbedder))
    }

    /// Empty store using a custom text embedder.
    #[must_use]
    pub fn with_embedder(config: &MemoryConfig, embedder: Arc<dyn TextEmbedder>) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            retrievals: 0,
            consolidations: 0,
            embedder,
        }
    }

    /// Stored records.
    #[must_use]
    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The embedder used for tags.
    #[must_use]
    pub fn embedder(&self) -> &dyn TextEmbedder {
        self.embedder.as_ref()
    }

    /// Store a memory. When full, the less important half is evicted first.
    pub fn store(
        &mut self,
        action: Action,
        context: Vitals,
        importance: f32,
        emotion: &str,
        lifecycle: LifecycleInfo,
        timestamp: u32,
    ) {
        if self.records.len() >= self.capacity {
            self.consolidate();
        }
        let embedding = combined_embedding(self.embedder.as_ref(), &context, emotion, action.name());
        self.records.push(MemoryRecord {
            action,
            context,
            importance: unit(importance),
            emotion: emotion.to_string(),
            lifecycle,
            embedding,
            timestamp,
        });
    }

    /// Keep the top `capacity / 2` records by importance.
    fn consolidate(&mut self) {
        let keep = self.capacity / 2;
        // Stable: among equal importances the older record goes first.
        self.records.sort_by_key(by_importance);
        let evicted = self.records.len().saturating_sub(keep);
        self.records.drain(..evicted);
        self.consolidations = self.consolidations.saturating_add(1);
        debug!(evicted, kept = self.records.len(), "Memories consolidated");
    }

    /// Enforce the capacity bound, keeping the most important records.
    pub fn evict(&mut self) {
        if self.records.len() <= self.capacity {
            return;
        }
        self.records.sort_by_key(|r| std::cmp::Reverse(by_importance(r)));
        self.records.truncate(self.capacity);
    }

    /// Records whose `"action emotion"` text contains `query`.
    /// An empty query matches nothing and is not counted as a retrieval.
    pub fn search_by_keyword(&mut self, query: &str) -> Vec<MemoryRecord> {
        if query.is_empty() {
            return Vec::new();
        }
        self.retrievals = self.retrievals.saturating_add(1);
        self.records
            .iter()
            .filter(|r| r.search_text().contains(query))
            .cloned()
            .collect()
    }

    /// Records with cosine similarity ≥ `threshold`, most similar first.
    pub fn search_by_embedding(&mut self, query: &Embedding, threshold: f32) -> Vec<(MemoryRecord, f32)> {
        self.retrievals = self.retrievals.saturating_add(1);
        let mut hits: Vec<(MemoryRecord, f32)> = self
            .records
            .iter()
            .map(|r| (r, r.embedding.cosine_similarity(query)))
            .filter(|&(_, sim)| sim >= threshold)
            .map(|(r, sim)| (r.clone(), sim))
            .collect();
        hits.sort_by_key(|&(_, sim)| std::cmp::Reverse(OrderedFloat(sim)));
        hits
    }

    /// Counters for display.
    #[must_use]
    pub fn summary(&self) -> MemorySummary {
        MemorySummary {
            total: self.records.len(),
            capacity: self.capacity,
            retrievals: self.retrievals,
            consolidations: self.consolidations,
        }
    }

    /// Forget everything, including counters.
    pub fn clear(&mut self) {
        self.records.clear();
        self.retrievals = 0;
        self.consolidations = 0;
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Exact encoded size of the memory blob.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        4 * 4 + self.records.iter().map(MemoryRecord::encoded_len).sum::<usize>()
    }

    /// Encode counters and records. Embeddings and lifecycle snapshots are
    /// derived data and are rebuilt on decode.
    ///
    /// # Errors
    /// [`crate::CritterError::BufferTooSmall`] if the blob does not fit.
    pub fn encode(&self, out: &mut StagingBuffer) -> Result<usize> {
        let len = self.encoded_len();
        out.reserve(SUBSYSTEM, len)?;
        out.put_u32(self.retrievals);
        out.put_u32(self.consolidations);
        out.put_len(EMBEDDING_DIM);
        out.put_len(self.records.len());
        for record in &self.records {
            out.put_str(record.action.name());
            out.put_str(&record.emotion);
            out.put_f32(record.importance);
            out.put_u32(record.timestamp);
            for value in record.context.to_array() {
                out.put_f32(value);
            }
            out.put_u32(record.lifecycle.age);
        }
        Ok(len)
    }

    /// Decode a memory blob into a fresh store using `embedder`.
    ///
    /// # Errors
    /// [`crate::CritterError::Truncated`] on a short blob,
    /// [`crate::CritterError::Malformed`] on an embedding dimension mismatch
    /// or an unknown action name.
    pub fn decode(
        input: &mut ByteReader<'_>,
        config: &MemoryConfig,
        embedder: Arc<dyn TextEmbedder>,
    ) -> Result<Self> {
        let mut store = Self::with_embedder(config, embedder);
        store.retrievals = input.u32()?;
        store.consolidations = input.u32()?;
        let dim = input.u32()? as usize;
        if dim != EMBEDDING_DIM {
            return Err(input.malformed(format!(
                "embedding dimension {dim}, expected {EMBEDDING_DIM}"
            )));
        }
        let count = input.count(MemoryRecord::MIN_ENCODED_LEN)?;
        for _ in 0..count {
            let name = input.string()?;
            let action = Action::from_name(&name)
                .ok_or_else(|| input.malformed(format!("unknown action {name:?}")))?;
            let emotion = input.string()?;
            let importance = input.f32()?;
            let timestamp = input.u32()?;
            let mut context = [0.0; StateDim::COUNT];
            for slot in &mut context {
                *slot = input.f32()?;
            }
            let age = input.u32()?;
            let context = Vitals::from_array(context).clamped();
            let embedding = combined_embedding(store.embedder.as_ref(), &context, &emotion, action.name());
            store.records.push(MemoryRecord {
                action,
                context,
                importance: unit(importance),
                emotion,
                lifecycle: LifecycleInfo::from_age(age),
                embedding,
                timestamp,
            });
        }
        store.evict();
        Ok(store)
    }
}
