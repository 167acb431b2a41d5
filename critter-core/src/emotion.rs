//! Emotion engine over a fixed catalog of twelve affects.
//!
//! Intensities decay linearly with time and are re-normalized after every
//! mutation: only the strongest few emotions may be active at once, and no
//! intensity may exceed 1.0.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Millis, TickTracker};
use crate::codec::{self, ByteReader, StagingBuffer};
use crate::config::EmotionConfig;
use crate::error::Result;
use crate::types::unit;

/// Snapshot blob label.
pub const SUBSYSTEM: &str = "EmotionSystem";

/// Catalog entry: name, starting intensity, decision weight, description.
struct CatalogEntry {
    name: &'static str,
    intensity: f32,
    weight: f32,
    description: &'static str,
}

const CATALOG: [CatalogEntry; 12] = [
    CatalogEntry { name: "joy", intensity: 0.5, weight: 1.2, description: "Joyful and happy" },
    CatalogEntry { name: "apathy", intensity: 0.0, weight: 0.8, description: "Apathetic and indifferent" },
    CatalogEntry { name: "discontent", intensity: 0.0, weight: 0.9, description: "Discontent and upset" },
    CatalogEntry { name: "capricious", intensity: 0.0, weight: 1.1, description: "Capricious and unpredictable" },
    CatalogEntry { name: "anger", intensity: 0.0, weight: 1.3, description: "Angry and irritated" },
    CatalogEntry { name: "satisfaction", intensity: 0.0, weight: 1.1, description: "Satisfied and content" },
    CatalogEntry { name: "curiosity", intensity: 0.3, weight: 1.4, description: "Curious and interested" },
    CatalogEntry { name: "fear", intensity: 0.0, weight: 0.7, description: "Fearful and anxious" },
    CatalogEntry { name: "excitement", intensity: 0.0, weight: 1.3, description: "Excited and energetic" },
    CatalogEntry { name: "calm", intensity: 0.2, weight: 1.0, description: "Calm and relaxed" },
    CatalogEntry { name: "loneliness", intensity: 0.0, weight: 0.9, description: "Lonely and sad" },
    CatalogEntry { name: "love", intensity: 0.1, weight: 1.2, description: "Loving and tender" },
];

/// Number of emotions in the catalog.
pub const EMOTION_COUNT: usize = CATALOG.len();

/// One named emotion. Only `intensity` changes at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    /// Catalog name.
    pub name: String,
    /// Current intensity in `[0, 1]`.
    pub intensity: f32,
    /// Weight used when emotions inform decisions.
    pub weight: f32,
}

/// Static description for a catalog emotion.
#[must_use]
pub fn describe(name: &str) -> Option<&'static str> {
    CATALOG.iter().find(|e| e.name == name).map(|e| e.description)
}

/// Owns the emotion catalog.
#[derive(Debug, Clone)]
pub struct EmotionEngine {
    emotions: Vec<Emotion>,
    decay_rate: f32,
    max_active: usize,
    active_threshold: f32,
    tracker: TickTracker,
}

impl EmotionEngine {
    /// Create the catalog at its starting intensities.
    #[must_use]
    pub fn new(config: &EmotionConfig) -> Self {
        let emotions = CATALOG
            .iter()
            .map(|e| Emotion {
                name: e.name.to_string(),
                intensity: e.intensity,
                weight: e.weight,
            })
            .collect();
        Self {
            emotions,
            decay_rate: config.decay_rate,
            max_active: config.max_active,
            active_threshold: config.active_threshold,
            tracker: TickTracker::default(),
        }
    }

    /// All emotions in catalog order.
    #[must_use]
    pub fn emotions(&self) -> &[Emotion] {
        &self.emotions
    }

    /// Decay every intensity by `rate × elapsed`, floored at zero.
    pub fn update(&mut self, now: Millis) {
        let elapsed = self.tracker.advance(now);
        if elapsed == 0 {
            return;
        }
        let step = self.decay_rate * elapsed as f32 / 1000.0;
        for emotion in &mut self.emotions {
            if emotion.intensity > 0.0 {
                emotion.intensity = (emotion.intensity - step).max(0.0);
            }
        }
        self.normalize();
    }

    /// Overwrite a named emotion's intensity (clamped to `[0, 1]`).
    /// Unknown names are ignored; returns whether the name was found.
    pub fn trigger(&mut self, name: &str, intensity: f32) -> bool {
        let intensity = unit(intensity);
        let Some(emotion) = self.emotions.iter_mut().find(|e| e.name == name) else {
            debug!(name, "Ignoring unknown emotion");
            return false;
        };
        emotion.intensity = intensity;
        debug!(name, intensity, "Emotion triggered");
        self.normalize();
        true
    }

    /// The most intense emotion; ties go to the earliest catalog entry.
    #[must_use]
    pub fn current(&self) -> &Emotion {
        let mut best = &self.emotions[0];
        for emotion in &self.emotions[1..] {
            if emotion.intensity > best.intensity {
                best = emotion;
            }
        }
        best
    }

    /// Description of the current emotion with its intensity.
    #[must_use]
    pub fn description(&self) -> String {
        let current = self.current();
        match describe(&current.name) {
            Some(text) => format!("{text} (intensity: {:.2})", current.intensity),
            None => "Unknown emotional state".to_string(),
        }
    }

    /// Decision weight of a named emotion; 1.0 for unknown names.
    #[must_use]
    pub fn weight_of(&self, name: &str) -> f32 {
        self.emotions
            .iter()
            .find(|e| e.name == name)
            .map_or(1.0, |e| e.weight)
    }

    /// Number of emotions above the active threshold.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.emotions
            .iter()
            .filter(|e| e.intensity > self.active_threshold)
            .count()
    }

    fn normalize(&mut self) {
        let mut active: Vec<usize> = (0..self.emotions.len())
            .filter(|&i| self.emotions[i].intensity > self.active_threshold)
            .collect();
        // Stable: equal intensities keep catalog order.
        active.sort_by(|&a, &b| {
            self.emotions[b]
                .intensity
                .total_cmp(&self.emotions[a].intensity)
        });
        for &i in active.iter().skip(self.max_active) {
            self.emotions[i].intensity = 0.0;
        }

        let max = self
            .emotions
            .iter()
            .map(|e| e.intensity)
            .fold(0.0_f32, f32::max);
        if max > 1.0 {
            for emotion in &mut self.emotions {
                emotion.intensity /= max;
            }
        }
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Exact encoded size of the emotion blob.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.emotions.iter().map(|e| codec::str_len(&e.name) + 8).sum()
    }

    /// Encode every emotion as (name, intensity, weight) in catalog order.
    ///
    /// # Errors
    /// [`crate::CritterError::BufferTooSmall`] if the blob does not fit.
    pub fn encode(&self, out: &mut StagingBuffer) -> Result<usize> {
        let len = self.encoded_len();
        out.reserve(SUBSYSTEM, len)?;
        for emotion in &self.emotions {
            out.put_str(&emotion.name);
            out.put_f32(emotion.intensity);
            out.put_f32(emotion.weight);
        }
        Ok(len)
    }

    /// Decode an emotion blob into a fresh engine.
    ///
    /// # Errors
    /// [`crate::CritterError::Truncated`] on a short blob,
    /// [`crate::CritterError::Malformed`] on an unknown or repeated emotion name.
    pub fn decode(input: &mut ByteReader<'_>, config: &EmotionConfig) -> Result<Self> {
        let mut engine = Self::new(config);
        let mut seen = [false; EMOTION_COUNT];
        for _ in 0..EMOTION_COUNT {
            let name = input.string()?;
            let intensity = input.f32()?;
            let weight = input.f32()?;
            let Some(index) = engine.emotions.iter().position(|e| e.name == name) else {
                return Err(input.malformed(format!("unknown emotion {name:?}")));
            };
            if std::mem::replace(&mut seen[index], true) {
                return Err(input.malformed(format!("duplicate emotion {name:?}")));
            }
            let slot = &mut engine.emotions[index];
            slot.intensity = unit(intensity);
            slot.weight = weight;
        }
        Ok(engine)
    }
}
