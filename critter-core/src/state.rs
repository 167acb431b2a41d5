//! Homeostatic internal-state model.
//!
//! Six normalized scalars drift over time (hunger upward, the rest
//! downward) and are pushed around by actions through a fixed effect table.
//! Decay is debounced: calls closer together than the configured interval
//! accumulate instead of applying tiny increments.

use tracing::{debug, info};

use crate::clock::{Millis, TickTracker};
use crate::codec::{ByteReader, StagingBuffer};
use crate::config::{DecayRates, StateConfig};
use crate::error::Result;
use crate::types::{Action, InternalStates, StateDim, Vitals};

/// Snapshot blob label.
pub const SUBSYSTEM: &str = "InternalState";

/// Encoded size of the internal-state blob: six f32 scalars and three u32 counters.
pub const ENCODED_LEN: usize = StateDim::COUNT * 4 + 3 * 4;

/// Critical-condition flags returned by [`InternalStateModel::critical_states`].
pub mod critical {
    /// Hunger above 0.8.
    pub const HUNGRY: u32 = 1 << 0;
    /// Health below 0.3.
    pub const SICK: u32 = 1 << 1;
    /// Energy below 0.2.
    pub const TIRED: u32 = 1 << 2;
    /// Happiness below 0.2.
    pub const SAD: u32 = 1 << 3;
}

/// Signed per-action deltas over the six scalars.
pub type ActionEffect = Vitals;

/// The fixed action-effect table, indexed by [`Action::index`].
#[must_use]
pub fn action_effect(action: Action) -> ActionEffect {
    let row = match action {
        Action::Feed => [-0.3, 0.1, 0.05, 0.0, 0.0, 0.0],
        Action::Play => [0.0, 0.2, 0.0, -0.1, 0.0, 0.1],
        Action::Heal => [0.0, 0.0, 0.3, 0.1, 0.0, 0.0],
        Action::Rest => [0.0, 0.05, 0.1, 0.4, 0.0, 0.0],
        Action::Socialize => [0.0, 0.15, 0.0, -0.05, 0.2, 0.0],
        Action::Explore => [0.0, 0.1, 0.0, -0.1, 0.0, 0.2],
        Action::Wait => [0.0, 0.0, 0.0, 0.1, 0.0, 0.0],
    };
    Vitals::from_array(row)
}

/// Level-up bonus applied to health, energy and happiness.
const LEVEL_BONUS: f32 = 0.1;

/// Age (seconds) per level required to level up.
const AGE_PER_LEVEL: u32 = 100;

/// Owns the creature's [`InternalStates`].
#[derive(Debug, Clone)]
pub struct InternalStateModel {
    states: InternalStates,
    decay: DecayRates,
    update_interval_ms: Millis,
    tracker: TickTracker,
    /// Milliseconds applied to decay but not yet counted as a whole second of age.
    carry_ms: Millis,
}

impl InternalStateModel {
    /// Create a model with default states.
    #[must_use]
    pub fn new(config: &StateConfig) -> Self {
        Self {
            states: InternalStates::default(),
            decay: config.decay,
            update_interval_ms: config.update_interval_ms,
            tracker: TickTracker::default(),
            carry_ms: 0,
        }
    }

    /// Current states.
    #[must_use]
    pub fn states(&self) -> &InternalStates {
        &self.states
    }

    /// Replace all states, re-clamping the scalars.
    pub fn set_states(&mut self, states: InternalStates) {
        self.states = states;
        self.states.normalize();
        debug!(states = ?self.states, "States set");
    }

    /// Apply time decay if at least the update interval has elapsed since
    /// the last applied step. Returns `true` when a step was applied.
    pub fn update(&mut self, now: Millis) -> bool {
        if !self.tracker.is_anchored() {
            self.tracker.advance(now);
            return false;
        }
        let elapsed = self.tracker.peek(now);
        if elapsed < self.update_interval_ms {
            return false;
        }
        self.tracker.advance(now);

        let seconds = elapsed as f32 / 1000.0;
        let mut vitals = self.states.vitals();
        for dim in StateDim::ALL {
            let rate = self.decay.get(dim) * seconds;
            let v = vitals.get_mut(dim);
            *v = if dim == StateDim::Hunger { *v + rate } else { *v - rate };
        }
        self.states.set_vitals(vitals);

        self.carry_ms += elapsed;
        let whole_secs = u32::try_from(self.carry_ms / 1000).unwrap_or(u32::MAX);
        self.carry_ms %= 1000;
        self.states.time = self.states.time.saturating_add(whole_secs);
        self.states.age = self.states.age.saturating_add(whole_secs);

        self.check_level_up();
        true
    }

    /// Apply one action's effect row, clamping every scalar.
    pub fn perform_action(&mut self, action: Action) {
        let effect = action_effect(action);
        let mut vitals = self.states.vitals();
        for dim in StateDim::ALL {
            *vitals.get_mut(dim) += effect.get(dim);
        }
        self.states.set_vitals(vitals);
        debug!(%action, "Action performed");
    }

    /// Apply an action given by name; unknown names are ignored.
    /// Returns whether the name was recognized.
    pub fn perform_named(&mut self, name: &str) -> bool {
        match Action::from_name(name) {
            Some(action) => {
                self.perform_action(action);
                true
            }
            None => false,
        }
    }

    /// Bitmask of [`critical`] flags currently raised.
    #[must_use]
    pub fn critical_states(&self) -> u32 {
        let s = &self.states;
        let mut flags = 0;
        if s.hunger > 0.8 {
            flags |= critical::HUNGRY;
        }
        if s.health < 0.3 {
            flags |= critical::SICK;
        }
        if s.energy < 0.2 {
            flags |= critical::TIRED;
        }
        if s.happiness < 0.2 {
            flags |= critical::SAD;
        }
        flags
    }

    /// Most urgent action: critical needs first (hunger, health, energy,
    /// happiness), then curiosity and loneliness, otherwise idle.
    #[must_use]
    pub fn priority_action(&self) -> Action {
        let flags = self.critical_states();
        let precedence = [
            (critical::HUNGRY, Action::Feed),
            (critical::SICK, Action::Heal),
            (critical::TIRED, Action::Rest),
            (critical::SAD, Action::Play),
        ];
        if let Some(&(_, action)) = precedence.iter().find(|(flag, _)| flags & flag != 0) {
            return action;
        }
        if self.states.curiosity > 0.7 {
            Action::Explore
        } else if self.states.social < 0.3 {
            Action::Socialize
        } else {
            Action::Wait
        }
    }

    fn check_level_up(&mut self) {
        let required = self.states.level.saturating_mul(AGE_PER_LEVEL);
        if self.states.age >= required {
            self.states.level += 1;
            let mut vitals = self.states.vitals();
            vitals.health += LEVEL_BONUS;
            vitals.energy += LEVEL_BONUS;
            vitals.happiness += LEVEL_BONUS;
            self.states.set_vitals(vitals);
            info!(level = self.states.level, "Level up");
        }
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Encode the states blob.
    ///
    /// # Errors
    /// [`crate::CritterError::BufferTooSmall`] if the blob does not fit.
    pub fn encode(&self, out: &mut StagingBuffer) -> Result<usize> {
        out.reserve(SUBSYSTEM, ENCODED_LEN)?;
        for value in self.states.vitals().to_array() {
            out.put_f32(value);
        }
        out.put_u32(self.states.level);
        out.put_u32(self.states.age);
        out.put_u32(self.states.time);
        Ok(ENCODED_LEN)
    }

    /// Decode a states blob into a fresh model.
    ///
    /// # Errors
    /// [`crate::CritterError::Truncated`] on a short blob.
    pub fn decode(input: &mut ByteReader<'_>, config: &StateConfig) -> Result<Self> {
        let mut scalars = [0.0; StateDim::COUNT];
        for slot in &mut scalars {
            *slot = input.f32()?;
        }
        let mut states = InternalStates {
            level: input.u32()?,
            age: input.u32()?,
            time: input.u32()?,
            ..InternalStates::default()
        };
        states.set_vitals(Vitals::from_array(scalars));

        let mut model = Self::new(config);
        model.states = states;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> InternalStateModel {
        InternalStateModel::new(&StateConfig::default())
    }

    #[test]
    fn feed_lowers_hunger() {
        let mut m = model();
        let mut s = *m.states();
        s.hunger = 0.8;
        m.set_states(s);
        m.perform_action(Action::Feed);
        let after = m.states();
        assert!((after.hunger - 0.5).abs() < 1e-6);
        assert!((after.happiness - 0.6).abs() < 1e-6);
        assert!((after.health - 0.85).abs() < 1e-6);
    }

    #[test]
    fn actions_never_leave_unit_range() {
        let mut m = model();
        for _ in 0..50 {
            for action in Action::ALL {
                m.perform_action(action);
                for (_, v) in m.states().vitals().named() {
                    assert!((0.0..=1.0).contains(&v));
                }
            }
        }
    }

    #[test]
    fn unknown_action_name_is_ignored() {
        let mut m = model();
        let before = *m.states();
        assert!(!m.perform_named("dance"));
        assert_eq!(*m.states(), before);
        assert!(m.perform_named("rest"));
    }

    #[test]
    fn decay_is_debounced() {
        let mut m = model();
        assert!(!m.update(0));
        assert!(!m.update(50));
        assert!((m.states().hunger - 0.5).abs() < f32::EPSILON);
        assert!(m.update(10_000));
        assert!((m.states().hunger - 0.6).abs() < 1e-5);
        assert!((m.states().energy - 0.62).abs() < 1e-5);
        assert_eq!(m.states().age, 10);
    }

    #[test]
    fn age_accumulates_across_sub_second_ticks() {
        let mut m = model();
        m.update(0);
        for t in 1..=20 {
            m.update(t * 250);
        }
        assert_eq!(m.states().age, 5);
        assert_eq!(m.states().time, 5);
    }

    #[test]
    fn level_up_grants_bonus() {
        let mut m = model();
        let mut s = *m.states();
        s.age = 99;
        s.health = 0.5;
        m.set_states(s);
        m.update(0);
        m.update(1_000);
        assert_eq!(m.states().level, 2);
        assert!(m.states().health > 0.59);
    }

    #[test]
    fn priority_follows_precedence() {
        let mut m = model();
        let mut s = *m.states();
        s.hunger = 0.9;
        s.health = 0.1;
        m.set_states(s);
        assert_eq!(m.critical_states(), critical::HUNGRY | critical::SICK);
        assert_eq!(m.priority_action(), Action::Feed);

        s.hunger = 0.2;
        m.set_states(s);
        assert_eq!(m.priority_action(), Action::Heal);

        s.health = 0.9;
        s.curiosity = 0.9;
        m.set_states(s);
        assert_eq!(m.priority_action(), Action::Explore);

        s.curiosity = 0.2;
        s.social = 0.1;
        m.set_states(s);
        assert_eq!(m.priority_action(), Action::Socialize);

        s.social = 0.5;
        m.set_states(s);
        assert_eq!(m.priority_action(), Action::Wait);
    }

    #[test]
    fn blob_round_trip() {
        let mut m = model();
        let mut s = *m.states();
        s.hunger = 0.33;
        s.level = 4;
        s.age = 321;
        s.time = 400;
        m.set_states(s);

        let mut buf = StagingBuffer::with_capacity(64);
        assert_eq!(m.encode(&mut buf).expect("encode"), ENCODED_LEN);
        let mut r = ByteReader::new(buf.as_bytes(), SUBSYSTEM);
        let restored = InternalStateModel::decode(&mut r, &StateConfig::default()).expect("decode");
        assert_eq!(restored.states(), m.states());
        assert_eq!(r.remaining(), 0);
    }
}
