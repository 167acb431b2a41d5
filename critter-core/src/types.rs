//! Core type definitions shared by every subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The closed set of things the creature can do.
///
/// Tables keyed by action are plain arrays indexed by [`Action::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Eat: lowers hunger.
    Feed,
    /// Play: raises happiness and curiosity at an energy cost.
    Play,
    /// Heal: raises health.
    Heal,
    /// Rest: restores energy.
    Rest,
    /// Socialize: raises social and happiness.
    Socialize,
    /// Explore: raises curiosity at an energy cost.
    Explore,
    /// Idle.
    Wait,
}

impl Action {
    /// Number of known actions.
    pub const COUNT: usize = 7;

    /// Every action in table order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Feed,
        Self::Play,
        Self::Heal,
        Self::Rest,
        Self::Socialize,
        Self::Explore,
        Self::Wait,
    ];

    /// Row index into per-action tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Action at a table index, if in range.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Stable lowercase identifier (also the persisted form).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Play => "play",
            Self::Heal => "heal",
            Self::Rest => "rest",
            Self::Socialize => "socialize",
            Self::Explore => "explore",
            Self::Wait => "wait",
        }
    }

    /// Parse an identifier. Unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// State dimensions
// ---------------------------------------------------------------------------

/// One of the six normalized homeostatic scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateDim {
    /// Rises over time; lowered by feeding.
    Hunger,
    /// General contentment.
    Happiness,
    /// Physical condition.
    Health,
    /// Stamina.
    Energy,
    /// Need for company (high = satisfied).
    Social,
    /// Drive to explore.
    Curiosity,
}

impl StateDim {
    /// Number of scalar dimensions.
    pub const COUNT: usize = 6;

    /// Every dimension in vector order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Hunger,
        Self::Happiness,
        Self::Health,
        Self::Energy,
        Self::Social,
        Self::Curiosity,
    ];

    /// Position in state vectors.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name, used for keyed views of a snapshot.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hunger => "hunger",
            Self::Happiness => "happiness",
            Self::Health => "health",
            Self::Energy => "energy",
            Self::Social => "social",
            Self::Curiosity => "curiosity",
        }
    }
}

/// Clamp a scalar into `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

// ---------------------------------------------------------------------------
// Vitals
// ---------------------------------------------------------------------------

/// The six normalized scalars, copied into every record that needs a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vitals {
    /// Hunger (0 = sated, 1 = starving).
    pub hunger: f32,
    /// Happiness.
    pub happiness: f32,
    /// Health.
    pub health: f32,
    /// Energy.
    pub energy: f32,
    /// Social satisfaction.
    pub social: f32,
    /// Curiosity.
    pub curiosity: f32,
}

impl Vitals {
    /// Read one dimension.
    #[must_use]
    pub const fn get(&self, dim: StateDim) -> f32 {
        match dim {
            StateDim::Hunger => self.hunger,
            StateDim::Happiness => self.happiness,
            StateDim::Health => self.health,
            StateDim::Energy => self.energy,
            StateDim::Social => self.social,
            StateDim::Curiosity => self.curiosity,
        }
    }

    /// Mutable access to one dimension.
    pub fn get_mut(&mut self, dim: StateDim) -> &mut f32 {
        match dim {
            StateDim::Hunger => &mut self.hunger,
            StateDim::Happiness => &mut self.happiness,
            StateDim::Health => &mut self.health,
            StateDim::Energy => &mut self.energy,
            StateDim::Social => &mut self.social,
            StateDim::Curiosity => &mut self.curiosity,
        }
    }

    /// Values in [`StateDim::ALL`] order.
    #[must_use]
    pub fn to_array(&self) -> [f32; StateDim::COUNT] {
        StateDim::ALL.map(|d| self.get(d))
    }

    /// Build from values in [`StateDim::ALL`] order.
    #[must_use]
    pub fn from_array(values: [f32; StateDim::COUNT]) -> Self {
        let mut vitals = Self::default();
        for (dim, value) in StateDim::ALL.into_iter().zip(values) {
            *vitals.get_mut(dim) = value;
        }
        vitals
    }

    /// Clamp every scalar into `[0, 1]`.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        for dim in StateDim::ALL {
            let v = self.get_mut(dim);
            *v = unit(*v);
        }
        self
    }

    /// `(name, value)` pairs, the keyed view of this snapshot.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        StateDim::ALL.into_iter().map(|d| (d.name(), self.get(d)))
    }
}

// ---------------------------------------------------------------------------
// Internal states
// ---------------------------------------------------------------------------

/// The creature's full homeostatic state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InternalStates {
    /// Hunger (0 = sated, 1 = starving).
    pub hunger: f32,
    /// Happiness.
    pub happiness: f32,
    /// Health.
    pub health: f32,
    /// Energy.
    pub energy: f32,
    /// Social satisfaction.
    pub social: f32,
    /// Curiosity.
    pub curiosity: f32,
    /// Level, starting at 1.
    pub level: u32,
    /// Age in seconds.
    pub age: u32,
    /// Time lived in seconds.
    pub time: u32,
}

impl Default for InternalStates {
    fn default() -> Self {
        Self {
            hunger: 0.5,
            happiness: 0.5,
            health: 0.8,
            energy: 0.7,
            social: 0.5,
            curiosity: 0.6,
            level: 1,
            age: 0,
            time: 0,
        }
    }
}

impl InternalStates {
    /// Copy of the six scalars.
    #[must_use]
    pub fn vitals(&self) -> Vitals {
        Vitals {
            hunger: self.hunger,
            happiness: self.happiness,
            health: self.health,
            energy: self.energy,
            social: self.social,
            curiosity: self.curiosity,
        }
    }

    /// Overwrite the six scalars, clamping each.
    pub fn set_vitals(&mut self, vitals: Vitals) {
        let v = vitals.clamped();
        self.hunger = v.hunger;
        self.happiness = v.happiness;
        self.health = v.health;
        self.energy = v.energy;
        self.social = v.social;
        self.curiosity = v.curiosity;
    }

    /// Read one scalar.
    #[must_use]
    pub fn get(&self, dim: StateDim) -> f32 {
        self.vitals().get(dim)
    }

    /// Clamp every scalar into `[0, 1]`.
    pub fn normalize(&mut self) {
        self.set_vitals(self.vitals());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.name()), Some(action));
            assert_eq!(Action::from_index(action.index()), Some(action));
        }
        assert_eq!(Action::from_name("learn"), None);
        assert_eq!(Action::from_index(7), None);
    }

    #[test]
    fn vitals_array_order_matches_dims() {
        let v = Vitals::from_array([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert!((v.health - 0.3).abs() < f32::EPSILON);
        assert!((v.get(StateDim::Curiosity) - 0.6).abs() < f32::EPSILON);
        let names: Vec<_> = v.named().map(|(n, _)| n).collect();
        assert_eq!(names, ["hunger", "happiness", "health", "energy", "social", "curiosity"]);
    }

    #[test]
    fn set_vitals_clamps() {
        let mut s = InternalStates::default();
        s.set_vitals(Vitals::from_array([2.0, -1.0, f32::NAN, 0.5, 1.5, 0.0]));
        assert!((s.hunger - 1.0).abs() < f32::EPSILON);
        assert!(s.happiness.abs() < f32::EPSILON);
        assert!(s.health.abs() < f32::EPSILON);
        assert!((s.social - 1.0).abs() < f32::EPSILON);
    }
}
