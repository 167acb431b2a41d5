//! Life stages derived from age.
//!
//! Age is the only stored quantity. Stage, biological age and maturity are
//! pure functions of it, so nothing beyond age needs to be persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::clock::{Millis, TickTracker};

/// Discrete life phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeStage {
    /// Age below 100.
    Newborn,
    /// Age below 300.
    Child,
    /// Age below 600.
    Teenager,
    /// Age below 1000.
    Adult,
    /// Everything older.
    Elder,
}

impl LifeStage {
    /// Stage for an age in seconds.
    #[must_use]
    pub const fn for_age(age: u32) -> Self {
        match age {
            0..100 => Self::Newborn,
            100..300 => Self::Child,
            300..600 => Self::Teenager,
            600..1000 => Self::Adult,
            _ => Self::Elder,
        }
    }

    /// Lowercase stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Newborn => "newborn",
            Self::Child => "child",
            Self::Teenager => "teenager",
            Self::Adult => "adult",
            Self::Elder => "elder",
        }
    }
}

impl fmt::Display for LifeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of the lifecycle, attached to memory records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifecycleInfo {
    /// Current stage.
    pub stage: LifeStage,
    /// Age in seconds.
    pub age: u32,
    /// `age / 10`.
    pub biological_age: f32,
    /// `min(1, age / 1000)`.
    pub maturity: f32,
}

impl LifecycleInfo {
    /// Derive every field from `age`.
    #[must_use]
    pub fn from_age(age: u32) -> Self {
        Self {
            stage: LifeStage::for_age(age),
            age,
            biological_age: age as f32 / 10.0,
            maturity: (age as f32 / 1000.0).min(1.0),
        }
    }
}

/// Accumulates age from elapsed time.
#[derive(Debug, Clone, Default)]
pub struct LifecycleSystem {
    age: u32,
    carry_ms: Millis,
    tracker: TickTracker,
}

impl LifecycleSystem {
    /// A newborn.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume at a known age (used after a restore).
    #[must_use]
    pub fn with_age(age: u32) -> Self {
        Self {
            age,
            ..Self::default()
        }
    }

    /// Age in whole seconds.
    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> LifeStage {
        LifeStage::for_age(self.age)
    }

    /// Add the time elapsed since the previous call.
    pub fn update(&mut self, now: Millis) {
        let before = self.stage();
        self.carry_ms += self.tracker.advance(now);
        let whole = u32::try_from(self.carry_ms / 1000).unwrap_or(u32::MAX);
        self.carry_ms %= 1000;
        self.age = self.age.saturating_add(whole);

        let after = self.stage();
        if after != before {
            info!(from = %before, to = %after, age = self.age, "Life stage changed");
        }
    }

    /// Stage info derived from the current age.
    #[must_use]
    pub fn info(&self) -> LifecycleInfo {
        LifecycleInfo::from_age(self.age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_thresholds() {
        assert_eq!(LifeStage::for_age(0), LifeStage::Newborn);
        assert_eq!(LifeStage::for_age(99), LifeStage::Newborn);
        assert_eq!(LifeStage::for_age(100), LifeStage::Child);
        assert_eq!(LifeStage::for_age(299), LifeStage::Child);
        assert_eq!(LifeStage::for_age(300), LifeStage::Teenager);
        assert_eq!(LifeStage::for_age(600), LifeStage::Adult);
        assert_eq!(LifeStage::for_age(1000), LifeStage::Elder);
    }

    #[test]
    fn derived_fields() {
        let info = LifecycleInfo::from_age(2500);
        assert_eq!(info.stage, LifeStage::Elder);
        assert!((info.biological_age - 250.0).abs() < f32::EPSILON);
        assert!((info.maturity - 1.0).abs() < f32::EPSILON);
        assert!((LifecycleInfo::from_age(500).maturity - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn age_accumulates_with_carry() {
        let mut life = LifecycleSystem::new();
        life.update(10_000);
        assert_eq!(life.age(), 0);
        for step in 1..=6 {
            life.update(10_000 + step * 500);
        }
        assert_eq!(life.age(), 3);
        life.update(10_000 + 103_000);
        assert_eq!(life.stage(), LifeStage::Child);
    }
}
