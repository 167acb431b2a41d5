//! Fixed-dimension embedding vectors.
//!
//! State snapshots map onto the vector directly. Text tags (emotion and
//! action names) go through a [`TextEmbedder`]; the default [`HashEmbedder`]
//! slices a deterministic hash into nibbles. That is not a semantic
//! embedding: similarity between two tag vectors reflects hash bits, not
//! meaning. Implement [`TextEmbedder`] to plug in a real model.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

use crate::types::{StateDim, Vitals};

/// Dimension shared by every embedding producer and consumer.
pub const EMBEDDING_DIM: usize = 8;

/// Weight of the emotion tag in a combined embedding.
pub const EMOTION_TAG_WEIGHT: f32 = 0.5;

/// Scale of the action tag in a combined embedding.
pub const ACTION_TAG_SCALE: f32 = 0.3;

// ---------------------------------------------------------------------------
// Vector
// ---------------------------------------------------------------------------

/// A dense vector, freely copied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Embedding(pub [f32; EMBEDDING_DIM]);

impl Embedding {
    /// The zero vector.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0.0; EMBEDDING_DIM])
    }

    /// L2 norm.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Scale to unit length; the zero vector is returned unchanged.
    #[must_use]
    pub fn normalized(self) -> Self {
        let norm = self.norm();
        if norm < f32::EPSILON {
            return self;
        }
        self * (1.0 / norm)
    }

    /// Cosine similarity. Returns 0.0 if either vector has zero magnitude.
    #[must_use]
    pub fn cosine_similarity(&self, other: &Self) -> f32 {
        let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom < f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl Add for Embedding {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut out = self;
        for (o, r) in out.0.iter_mut().zip(rhs.0) {
            *o += r;
        }
        out
    }
}

impl Mul<f32> for Embedding {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self(self.0.map(|x| x * rhs))
    }
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

/// Six scalars followed by two derived averages:
/// (hunger + happiness) / 2 and (health + energy) / 2.
#[must_use]
pub fn states_to_embedding(vitals: &Vitals) -> Embedding {
    let [hunger, happiness, health, energy, social, curiosity] = vitals.to_array();
    Embedding([
        hunger,
        happiness,
        health,
        energy,
        social,
        curiosity,
        (hunger + happiness) / 2.0,
        (health + energy) / 2.0,
    ])
}

/// Inverse of [`states_to_embedding`]: the state components, clamped.
#[must_use]
pub fn embedding_to_states(embedding: &Embedding) -> Vitals {
    let mut values = [0.0; StateDim::COUNT];
    values.copy_from_slice(&embedding.0[..StateDim::COUNT]);
    Vitals::from_array(values.map(|v| v.clamp(0.0, 1.0)))
}

/// Turns a text tag into an embedding.
pub trait TextEmbedder: Send + Sync {
    /// Embed `text`, scaling every component by `intensity`.
    fn embed(&self, text: &str, intensity: f32) -> Embedding;

    /// Human-readable name for logs.
    fn model_name(&self) -> &str;
}

/// Deterministic hash-nibble embedder.
///
/// Component `i` is nibble `i` of the 64-bit FNV-1a hash of the text,
/// mapped to `[0, 1]` and scaled by the intensity.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEmbedder;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(text: &str) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in text.as_bytes() {
        h ^= u64::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

impl TextEmbedder for HashEmbedder {
    fn embed(&self, text: &str, intensity: f32) -> Embedding {
        let hash = fnv1a(text);
        let mut out = [0.0; EMBEDDING_DIM];
        for (i, slot) in out.iter_mut().enumerate() {
            let nibble = (hash >> (4 * i)) & 0xF;
            *slot = nibble as f32 / 15.0 * intensity;
        }
        Embedding(out)
    }

    fn model_name(&self) -> &str {
        "fnv1a-nibble"
    }
}

/// State embedding + emotion tag (weight 0.5) + 0.3 × action tag.
/// Empty tags contribute nothing.
#[must_use]
pub fn combined_embedding(
    embedder: &dyn TextEmbedder,
    vitals: &Vitals,
    emotion: &str,
    action: &str,
) -> Embedding {
    let mut out = states_to_embedding(vitals);
    if !emotion.is_empty() {
        out = out + embedder.embed(emotion, EMOTION_TAG_WEIGHT);
    }
    if !action.is_empty() {
        out = out + embedder.embed(action, 1.0) * ACTION_TAG_SCALE;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(i: usize) -> Embedding {
        let mut v = [0.0; EMBEDDING_DIM];
        v[i] = 1.0;
        Embedding(v)
    }

    #[test]
    fn cosine_of_identical_is_one() {
        let a = unit(0);
        assert!((a.cosine_similarity(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_is_zero() {
        assert!(unit(0).cosine_similarity(&unit(3)).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        assert!(unit(1).cosine_similarity(&Embedding::zero()).abs() < f32::EPSILON);
    }

    #[test]
    fn normalize_and_distance() {
        let v = Embedding([3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!((v.norm() - 5.0).abs() < 1e-6);
        assert!((v.normalized().norm() - 1.0).abs() < 1e-6);
        assert_eq!(Embedding::zero().normalized(), Embedding::zero());
        assert!((v.distance(&Embedding::zero()) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn add_and_scale() {
        let v = (unit(0) + unit(1)) * 2.0;
        assert!((v.0[0] - 2.0).abs() < f32::EPSILON);
        assert!((v.0[1] - 2.0).abs() < f32::EPSILON);
        assert!(v.0[2].abs() < f32::EPSILON);
    }

    #[test]
    fn state_embedding_appends_averages() {
        let vitals = Vitals::from_array([0.2, 0.4, 0.6, 0.8, 0.1, 0.3]);
        let e = states_to_embedding(&vitals);
        assert!((e.0[5] - 0.3).abs() < 1e-6);
        assert!((e.0[6] - 0.3).abs() < 1e-6);
        assert!((e.0[7] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn hash_embedding_is_deterministic_and_bounded() {
        let a = HashEmbedder.embed("joy", 0.5);
        let b = HashEmbedder.embed("joy", 0.5);
        assert_eq!(a, b);
        assert!(a.0.iter().all(|&x| (0.0..=0.5).contains(&x)));
        assert_ne!(HashEmbedder.embed("fear", 1.0), HashEmbedder.embed("joy", 1.0));
    }

    #[test]
    fn states_survive_embedding_and_back() {
        let vitals = Vitals::from_array([0.2, 0.4, 0.6, 0.8, 0.1, 0.3]);
        assert_eq!(embedding_to_states(&states_to_embedding(&vitals)), vitals);
        let wild = Embedding([1.5, -0.2, 0.5, 0.5, 0.5, 0.5, 9.0, 9.0]);
        assert_eq!(embedding_to_states(&wild).to_array(), [1.0, 0.0, 0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn empty_tags_add_nothing() {
        let vitals = Vitals::default();
        let base = states_to_embedding(&vitals);
        assert_eq!(combined_embedding(&HashEmbedder, &vitals, "", ""), base);

        let action_only = combined_embedding(&HashEmbedder, &vitals, "", "feed");
        let expected = base + HashEmbedder.embed("feed", 1.0) * ACTION_TAG_SCALE;
        assert_eq!(action_only, expected);

        let emotion_only = combined_embedding(&HashEmbedder, &vitals, "joy", "");
        assert_eq!(emotion_only, base + HashEmbedder.embed("joy", EMOTION_TAG_WEIGHT));
    }
}
