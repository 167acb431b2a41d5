//! Adaptive exploration / exploitation balance.
//!
//! Every action belongs to exactly one [`ActionClass`]. The manager keeps a
//! bounded history of what was done and whether it worked, and periodically
//! nudges the exploration rate toward whichever class has been succeeding.

use serde::Serialize;
use tracing::debug;

use crate::codec::{self, ByteReader, StagingBuffer};
use crate::config::BalanceConfig;
use crate::error::Result;
use crate::history::History;
use crate::types::{Action, StateDim, Vitals, unit};

/// Snapshot blob label.
pub const SUBSYSTEM: &str = "BalanceManager";

/// Minimum history length before adaptation kicks in (exclusive).
const MIN_HISTORY_FOR_ADAPTATION: usize = 5;

/// How many recent records adaptation looks at.
const ADAPTATION_WINDOW: usize = 10;

/// Base priority before state triggers and class scaling.
const BASE_PRIORITY: f32 = 0.5;

/// Order in which state priorities are stored and persisted.
pub const PRIORITY_ORDER: [StateDim; StateDim::COUNT] = [
    StateDim::Hunger,
    StateDim::Health,
    StateDim::Energy,
    StateDim::Happiness,
    StateDim::Social,
    StateDim::Curiosity,
];

const INITIAL_STATE_PRIORITIES: [f32; StateDim::COUNT] = [0.9, 0.8, 0.7, 0.6, 0.5, 0.4];

/// Social priority bounds for [`BalanceManager::adjust_social_priority`].
const SOCIAL_PRIORITY_RANGE: (f32, f32) = (0.1, 0.9);

/// Which side of the balance an action falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionClass {
    /// Novelty-seeking actions.
    Exploration,
    /// Need-satisfying actions.
    Exploitation,
    /// Doing nothing; excluded from adaptation.
    Idle,
}

impl ActionClass {
    /// Class of an action. Exhaustive, so a new action cannot go unclassified.
    #[must_use]
    pub const fn of(action: Action) -> Self {
        match action {
            Action::Explore | Action::Play => Self::Exploration,
            Action::Feed | Action::Heal | Action::Rest | Action::Socialize => Self::Exploitation,
            Action::Wait => Self::Idle,
        }
    }
}

/// One entry of the action history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    /// What was done.
    pub action: Action,
    /// Whether it worked.
    pub success: bool,
    /// Wire timestamp (low 32 bits of the millisecond clock).
    pub timestamp: u32,
}

impl ActionRecord {
    fn encoded_len(&self) -> usize {
        4 + 1 + codec::str_len(self.action.name())
    }
}

/// Exploration / exploitation controller.
#[derive(Debug, Clone)]
pub struct BalanceManager {
    exploration_rate: f32,
    exploitation_rate: f32,
    state_priorities: [f32; StateDim::COUNT],
    history: History<ActionRecord>,
    adaptation_rate: f32,
    max_exploration: f32,
    max_exploitation: f32,
    initial_exploration: f32,
}

impl BalanceManager {
    /// Start at the configured exploration rate with an empty history.
    #[must_use]
    pub fn new(config: &BalanceConfig) -> Self {
        let exploration = unit(config.exploration_rate);
        Self {
            exploration_rate: exploration,
            exploitation_rate: 1.0 - exploration,
            state_priorities: INITIAL_STATE_PRIORITIES,
            history: History::new(config.history_capacity),
            adaptation_rate: config.adaptation_rate,
            max_exploration: config.max_exploration,
            max_exploitation: config.max_exploitation,
            initial_exploration: exploration,
        }
    }

    /// Current exploration rate.
    #[must_use]
    pub fn exploration_rate(&self) -> f32 {
        self.exploration_rate
    }

    /// Current exploitation rate (`1 - exploration`).
    #[must_use]
    pub fn exploitation_rate(&self) -> f32 {
        self.exploitation_rate
    }

    /// Priority weight of one state dimension.
    #[must_use]
    pub fn state_priority(&self, dim: StateDim) -> f32 {
        PRIORITY_ORDER
            .iter()
            .position(|&d| d == dim)
            .map_or(0.0, |i| self.state_priorities[i])
    }

    /// All state priorities in [`PRIORITY_ORDER`].
    #[must_use]
    pub fn state_priorities(&self) -> &[f32; StateDim::COUNT] {
        &self.state_priorities
    }

    /// Action history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ActionRecord> {
        self.history.iter()
    }

    /// Append an action outcome, evicting the oldest when full.
    pub fn record_action(&mut self, action: Action, success: bool, timestamp: u32) {
        self.history.push(ActionRecord {
            action,
            success,
            timestamp,
        });
    }

    /// Nudge the balance toward the class that has been succeeding.
    ///
    /// Needs more than five records and at least one exploration and one
    /// exploitation record among the last ten. Idle records are ignored.
    pub fn update(&mut self) {
        if self.history.len() <= MIN_HISTORY_FOR_ADAPTATION {
            return;
        }
        let (mut explore_n, mut explore_ok) = (0_u32, 0_u32);
        let (mut exploit_n, mut exploit_ok) = (0_u32, 0_u32);
        for record in self.history.recent(ADAPTATION_WINDOW) {
            match ActionClass::of(record.action) {
                ActionClass::Exploration => {
                    explore_n += 1;
                    explore_ok += u32::from(record.success);
                }
                ActionClass::Exploitation => {
                    exploit_n += 1;
                    exploit_ok += u32::from(record.success);
                }
                ActionClass::Idle => {}
            }
        }
        if explore_n == 0 || exploit_n == 0 {
            return;
        }

        let explore_ratio = explore_ok as f32 / explore_n as f32;
        let exploit_ratio = exploit_ok as f32 / exploit_n as f32;
        if explore_ratio > exploit_ratio {
            self.exploration_rate =
                (self.exploration_rate + self.adaptation_rate).min(self.max_exploration);
            self.exploitation_rate = 1.0 - self.exploration_rate;
        } else if exploit_ratio > explore_ratio {
            self.exploitation_rate =
                (self.exploitation_rate + self.adaptation_rate).min(self.max_exploitation);
            self.exploration_rate = 1.0 - self.exploitation_rate;
        }
        debug!(
            exploration = self.exploration_rate,
            exploitation = self.exploitation_rate,
            explore_ratio,
            exploit_ratio,
            "Balance adapted"
        );
    }

    /// Base priority plus a state-triggered bonus, scaled by the action's
    /// class rate and clamped to `[0, 1]`.
    #[must_use]
    pub fn action_priority(&self, action: Action, vitals: &Vitals) -> f32 {
        let bonus = match action {
            Action::Feed if vitals.hunger > 0.7 => 0.3,
            Action::Heal if vitals.health < 0.4 => 0.3,
            Action::Rest if vitals.energy < 0.3 => 0.3,
            Action::Play if vitals.happiness < 0.4 => 0.2,
            Action::Socialize if vitals.social < 0.3 => 0.2,
            Action::Explore if vitals.curiosity > 0.7 => 0.2,
            _ => 0.0,
        };
        let scale = match ActionClass::of(action) {
            ActionClass::Exploration => self.exploration_rate,
            ActionClass::Exploitation | ActionClass::Idle => self.exploitation_rate,
        };
        unit((BASE_PRIORITY + bonus) * scale)
    }

    /// Shift the social priority, clamped to `[0.1, 0.9]`.
    pub fn adjust_social_priority(&mut self, delta: f32) {
        let (lo, hi) = SOCIAL_PRIORITY_RANGE;
        let slot = &mut self.state_priorities[4];
        *slot = (*slot + delta).clamp(lo, hi);
    }

    /// Back to the configured starting point.
    pub fn reset(&mut self) {
        self.exploration_rate = self.initial_exploration;
        self.exploitation_rate = 1.0 - self.initial_exploration;
        self.state_priorities = INITIAL_STATE_PRIORITIES;
        self.history.clear();
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Exact encoded size of the balance blob.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        4 * 2 + 4 * StateDim::COUNT + 4 + self.history.iter().map(ActionRecord::encoded_len).sum::<usize>()
    }

    /// Encode rates, priorities and history.
    ///
    /// # Errors
    /// [`crate::CritterError::BufferTooSmall`] if the blob does not fit.
    pub fn encode(&self, out: &mut StagingBuffer) -> Result<usize> {
        let len = self.encoded_len();
        out.reserve(SUBSYSTEM, len)?;
        out.put_f32(self.exploration_rate);
        out.put_f32(self.exploitation_rate);
        for &p in &self.state_priorities {
            out.put_f32(p);
        }
        out.put_len(self.history.len());
        for record in self.history.iter() {
            out.put_u32(record.timestamp);
            out.put_u8(u8::from(record.success));
            out.put_str(record.action.name());
        }
        Ok(len)
    }

    /// Decode a balance blob into a fresh manager. Histories longer than the
    /// configured capacity keep their newest records.
    ///
    /// # Errors
    /// [`crate::CritterError::Truncated`] on a short blob,
    /// [`crate::CritterError::Malformed`] on an unknown action name.
    pub fn decode(input: &mut ByteReader<'_>, config: &BalanceConfig) -> Result<Self> {
        let mut manager = Self::new(config);
        manager.exploration_rate = unit(input.f32()?);
        manager.exploitation_rate = unit(input.f32()?);
        for slot in &mut manager.state_priorities {
            *slot = unit(input.f32()?);
        }
        let count = input.count(6)?;
        for _ in 0..count {
            let timestamp = input.u32()?;
            let success = input.u8()? != 0;
            let name = input.string()?;
            let action = Action::from_name(&name)
                .ok_or_else(|| input.malformed(format!("unknown action {name:?}")))?;
            manager.record_action(action, success, timestamp);
        }
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> BalanceManager {
        BalanceManager::new(&BalanceConfig::default())
    }

    #[test]
    fn every_action_is_classified() {
        let exploration: Vec<_> = Action::ALL
            .into_iter()
            .filter(|&a| ActionClass::of(a) == ActionClass::Exploration)
            .collect();
        assert_eq!(exploration, vec![Action::Play, Action::Explore]);
        assert_eq!(ActionClass::of(Action::Wait), ActionClass::Idle);
    }

    #[test]
    fn history_is_bounded() {
        let mut m = manager();
        for i in 0..45 {
            m.record_action(Action::Feed, true, i);
        }
        assert_eq!(m.history().count(), 20);
        assert_eq!(m.history().next().map(|r| r.timestamp), Some(25));
    }

    #[test]
    fn successful_exploration_raises_rate() {
        let mut m = manager();
        for i in 0..6 {
            m.record_action(Action::Explore, true, i);
            m.record_action(Action::Feed, false, i);
        }
        m.update();
        assert!((m.exploration_rate() - 0.31).abs() < 1e-6);
        assert!((m.exploration_rate() + m.exploitation_rate() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rates_respect_bounds() {
        let mut m = manager();
        for i in 0..10 {
            m.record_action(Action::Explore, false, i);
            m.record_action(Action::Heal, true, i);
        }
        for _ in 0..100 {
            m.update();
        }
        assert!((m.exploitation_rate() - 0.8).abs() < 1e-5);
        assert!((m.exploration_rate() - 0.2).abs() < 1e-5);
    }

    #[test]
    fn no_adaptation_without_both_classes() {
        let mut m = manager();
        for i in 0..10 {
            m.record_action(Action::Feed, true, i);
            m.record_action(Action::Wait, false, i);
        }
        m.update();
        assert!((m.exploration_rate() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn priority_triggers_and_scaling() {
        let m = manager();
        let mut vitals = Vitals::from_array([0.9, 0.5, 0.5, 0.5, 0.5, 0.5]);
        // (0.5 + 0.3) * 0.7
        assert!((m.action_priority(Action::Feed, &vitals) - 0.56).abs() < 1e-6);
        // 0.5 * 0.3
        assert!((m.action_priority(Action::Explore, &vitals) - 0.15).abs() < 1e-6);
        vitals.curiosity = 0.9;
        assert!((m.action_priority(Action::Explore, &vitals) - 0.21).abs() < 1e-6);
    }

    #[test]
    fn social_priority_clamped() {
        let mut m = manager();
        m.adjust_social_priority(2.0);
        assert!((m.state_priority(StateDim::Social) - 0.9).abs() < f32::EPSILON);
        m.adjust_social_priority(-5.0);
        assert!((m.state_priority(StateDim::Social) - 0.1).abs() < f32::EPSILON);
        assert!((m.state_priority(StateDim::Hunger) - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn blob_round_trip() {
        let mut m = manager();
        m.record_action(Action::Socialize, true, 10);
        m.record_action(Action::Wait, false, 20);
        m.adjust_social_priority(0.2);

        let mut buf = StagingBuffer::with_capacity(256);
        let len = m.encode(&mut buf).expect("encode");
        assert_eq!(len, buf.len());
        let mut r = ByteReader::new(buf.as_bytes(), SUBSYSTEM);
        let restored = BalanceManager::decode(&mut r, &BalanceConfig::default()).expect("decode");
        assert_eq!(restored.history().copied().collect::<Vec<_>>(), m.history().copied().collect::<Vec<_>>());
        assert_eq!(restored.state_priorities(), m.state_priorities());
        assert!((restored.exploration_rate() - m.exploration_rate()).abs() < f32::EPSILON);
    }

    #[test]
    fn oversized_history_keeps_newest() {
        let mut big = BalanceManager::new(&BalanceConfig {
            history_capacity: 30,
            ..BalanceConfig::default()
        });
        for i in 0..30 {
            big.record_action(Action::Play, true, i);
        }
        let mut buf = StagingBuffer::with_capacity(1024);
        big.encode(&mut buf).expect("encode");
        let mut r = ByteReader::new(buf.as_bytes(), SUBSYSTEM);
        let small = BalanceManager::decode(&mut r, &BalanceConfig::default()).expect("decode");
        assert_eq!(small.history().count(), 20);
        assert_eq!(small.history().next().map(|r| r.timestamp), Some(10));
    }
}
