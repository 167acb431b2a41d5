//! Skills, experience and success analysis.
//!
//! Every action trains exactly two of eight skills. Success is judged from
//! the state change the action produced, not from what the caller claims.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::clock::{Millis, TickTracker};
use crate::codec::{self, ByteReader, StagingBuffer};
use crate::config::LearningConfig;
use crate::error::Result;
use crate::history::History;
use crate::types::{Action, StateDim, Vitals};

/// Snapshot blob label.
pub const SUBSYSTEM: &str = "LearningSystem";

/// Number of tracked skills.
pub const SKILL_COUNT: usize = 8;

/// Skill names, in vector order.
pub const SKILL_NAMES: [&str; SKILL_COUNT] = [
    "problem_solving",
    "social_interaction",
    "emotional_intelligence",
    "creativity",
    "adaptability",
    "memory",
    "attention",
    "patience",
];

const INITIAL_SKILL: f32 = 0.5;
const SKILL_FLOOR: f32 = 0.1;
const SKILL_GAIN_SUCCESS: f32 = 0.01;
const SKILL_GAIN_FAILURE: f32 = 0.005;
const LEVEL_SKILL_BONUS: f32 = 0.05;
const EXPERIENCE_PER_LEVEL: u32 = 100;

/// Minimum state change that counts as movement in success analysis.
const CHANGE_THRESHOLD: f32 = 0.05;

/// Bounds for [`LearningSystem::adjust_learning_rate`].
const LEARNING_RATE_RANGE: (f32, f32) = (0.001, 0.05);

/// Bounds applied by [`LearningSystem::optimize`].
const OPTIMIZE_CEILING: f32 = 0.02;
const OPTIMIZE_FLOOR: f32 = 0.005;

/// The two skills an action trains.
#[must_use]
pub const fn trained_skills(action: Action) -> [usize; 2] {
    match action {
        Action::Play => [3, 6],
        Action::Explore => [4, 0],
        Action::Socialize => [1, 2],
        Action::Rest => [7, 2],
        Action::Wait => [7, 6],
        Action::Feed => [7, 5],
        Action::Heal => [2, 4],
    }
}

/// Per-action experience multiplier.
#[must_use]
pub const fn experience_multiplier(action: Action) -> f32 {
    match action {
        Action::Play => 1.2,
        Action::Explore => 1.3,
        Action::Socialize => 1.1,
        Action::Rest => 0.8,
        Action::Wait => 0.5,
        Action::Feed | Action::Heal => 1.0,
    }
}

/// Whether `action` produced the state change it is meant to.
///
/// Need-specific actions check their own scalar; anything else succeeds
/// when at least as many scalars improved as worsened. Hunger improves by
/// falling, every other scalar by rising.
#[must_use]
pub fn analyze_success(action: Action, pre: &Vitals, post: &Vitals) -> bool {
    let rose = |dim: StateDim| post.get(dim) > pre.get(dim) + CHANGE_THRESHOLD;
    match action {
        Action::Feed => post.hunger < pre.hunger - CHANGE_THRESHOLD,
        Action::Heal => rose(StateDim::Health),
        Action::Rest => rose(StateDim::Energy),
        Action::Play => rose(StateDim::Happiness),
        Action::Socialize => rose(StateDim::Social),
        Action::Explore => rose(StateDim::Curiosity),
        Action::Wait => {
            let (mut improved, mut worsened) = (0, 0);
            for dim in StateDim::ALL {
                let mut change = post.get(dim) - pre.get(dim);
                if dim == StateDim::Hunger {
                    change = -change;
                }
                if change > CHANGE_THRESHOLD {
                    improved += 1;
                } else if change < -CHANGE_THRESHOLD {
                    worsened += 1;
                }
            }
            improved >= worsened
        }
    }
}

/// One entry of the success history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessRecord {
    /// What was done.
    pub action: Action,
    /// Whether it worked.
    pub success: bool,
    /// Wire timestamp.
    pub timestamp: u32,
    /// Experience credited for it.
    pub experience_gain: f32,
}

impl SuccessRecord {
    fn encoded_len(&self) -> usize {
        4 + 1 + codec::str_len(self.action.name()) + 4
    }
}

/// Result of [`LearningSystem::learn_from_experience`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LearningOutcome {
    /// Success after analysis.
    pub success: bool,
    /// Experience gained.
    pub experience_gain: f32,
    /// Whether the learning level went up.
    pub leveled_up: bool,
}

/// Actions that have been going well or badly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearningInsights {
    /// Success rate above 0.7.
    pub best_actions: Vec<(Action, f32)>,
    /// Success rate below 0.3.
    pub worst_actions: Vec<(Action, f32)>,
}

/// Summary for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningStatus {
    /// Learning level.
    pub level: u32,
    /// Experience points.
    pub experience: u32,
    /// Skill values in [`SKILL_NAMES`] order.
    pub skills: [f32; SKILL_COUNT],
    /// Actions learned from.
    pub total_actions: u32,
    /// Of which succeeded.
    pub successful_actions: u32,
    /// `successful / total`, 0 when nothing was learned yet.
    pub success_rate: f32,
    /// Current experience learning rate.
    pub learning_rate: f32,
}

/// Skill and experience tracker.
#[derive(Debug, Clone)]
pub struct LearningSystem {
    skills: [f32; SKILL_COUNT],
    experience: u32,
    experience_carry: f32,
    level: u32,
    total_actions: u32,
    successful_actions: u32,
    history: History<SuccessRecord>,
    learning_rate: f32,
    initial_learning_rate: f32,
    skill_decay_rate: f32,
    tracker: TickTracker,
}

impl LearningSystem {
    /// Level 1, every skill at 0.5.
    #[must_use]
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            skills: [INITIAL_SKILL; SKILL_COUNT],
            experience: 0,
            experience_carry: 0.0,
            level: 1,
            total_actions: 0,
            successful_actions: 0,
            history: History::new(config.history_capacity),
            learning_rate: config.learning_rate,
            initial_learning_rate: config.learning_rate,
            skill_decay_rate: config.skill_decay_rate,
            tracker: TickTracker::default(),
        }
    }

    /// Skill values.
    #[must_use]
    pub fn skills(&self) -> &[f32; SKILL_COUNT] {
        &self.skills
    }

    /// Skill by name.
    #[must_use]
    pub fn skill(&self, name: &str) -> Option<f32> {
        SKILL_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.skills[i])
    }

    /// Experience points.
    #[must_use]
    pub fn experience(&self) -> u32 {
        self.experience
    }

    /// Learning level.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Current experience learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Success history, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &SuccessRecord> {
        self.history.iter()
    }

    /// Decay skills above the floor toward it.
    pub fn update(&mut self, now: Millis) {
        let elapsed = self.tracker.advance(now);
        if elapsed == 0 {
            return;
        }
        let step = self.skill_decay_rate * elapsed as f32 / 1000.0;
        for skill in &mut self.skills {
            if *skill > SKILL_FLOOR {
                *skill = (*skill - step).max(SKILL_FLOOR);
            }
        }
    }

    /// Credit one action.
    ///
    /// With both snapshots present, success is recomputed by
    /// [`analyze_success`] and `claimed_success` is ignored.
    pub fn learn_from_experience(
        &mut self,
        action: Action,
        claimed_success: bool,
        snapshots: Option<(&Vitals, &Vitals)>,
        timestamp: u32,
    ) -> LearningOutcome {
        let success = match snapshots {
            Some((pre, post)) => analyze_success(action, pre, post),
            None => claimed_success,
        };
        self.total_actions = self.total_actions.saturating_add(1);
        if success {
            self.successful_actions = self.successful_actions.saturating_add(1);
        }

        let gain = self.experience_gain(action, success, snapshots.map(|(pre, _)| pre));
        self.credit_experience(gain);
        self.train_skills(action, success);
        let leveled_up = self.check_level_up();

        self.history.push(SuccessRecord {
            action,
            success,
            timestamp,
            experience_gain: gain,
        });
        debug!(%action, success, gain, experience = self.experience, "Learned from experience");
        LearningOutcome {
            success,
            experience_gain: gain,
            leveled_up,
        }
    }

    fn experience_gain(&self, action: Action, success: bool, pre: Option<&Vitals>) -> f32 {
        let mut gain = experience_multiplier(action);
        if success {
            gain *= 1.5;
        }
        if pre.is_some_and(|p| p.hunger < 0.5) {
            gain *= 1.2;
        }
        gain * self.learning_rate
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn credit_experience(&mut self, gain: f32) {
        self.experience_carry += gain.max(0.0);
        let whole = self.experience_carry.floor();
        if whole >= 1.0 {
            self.experience = self.experience.saturating_add(whole as u32);
            self.experience_carry -= whole;
        }
    }

    fn train_skills(&mut self, action: Action, success: bool) {
        let gain = if success { SKILL_GAIN_SUCCESS } else { SKILL_GAIN_FAILURE };
        for index in trained_skills(action) {
            self.skills[index] = (self.skills[index] + gain).min(1.0);
        }
    }

    fn check_level_up(&mut self) -> bool {
        if self.experience < self.level.saturating_mul(EXPERIENCE_PER_LEVEL) {
            return false;
        }
        self.level += 1;
        for skill in &mut self.skills {
            *skill = (*skill + LEVEL_SKILL_BONUS).min(1.0);
        }
        info!(level = self.level, "Learning level up");
        true
    }

    /// Human-readable hints derived from skills and experience.
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, &value) in SKILL_NAMES.iter().zip(&self.skills) {
            if value < 0.3 {
                out.push(format!("Develop skill: {name}"));
            } else if value > 0.8 {
                out.push(format!("Skill {name} is well developed"));
            }
        }
        if self.experience < EXPERIENCE_PER_LEVEL {
            out.push("Experiment more".to_string());
        }
        out
    }

    /// Per-action success rates over the history, split into best and worst.
    #[must_use]
    pub fn insights(&self) -> LearningInsights {
        let mut stats: BTreeMap<Action, (u32, u32)> = BTreeMap::new();
        for record in self.history.iter() {
            let entry = stats.entry(record.action).or_default();
            entry.0 += 1;
            entry.1 += u32::from(record.success);
        }
        let mut insights = LearningInsights::default();
        for (action, (total, ok)) in stats {
            let rate = ok as f32 / total as f32;
            if rate > 0.7 {
                insights.best_actions.push((action, rate));
            } else if rate < 0.3 {
                insights.worst_actions.push((action, rate));
            }
        }
        insights
    }

    /// Overall success rate; 0 before anything was learned.
    #[must_use]
    pub fn success_rate(&self) -> f32 {
        if self.total_actions == 0 {
            0.0
        } else {
            self.successful_actions as f32 / self.total_actions as f32
        }
    }

    /// Display summary.
    #[must_use]
    pub fn status(&self) -> LearningStatus {
        LearningStatus {
            level: self.level,
            experience: self.experience,
            skills: self.skills,
            total_actions: self.total_actions,
            successful_actions: self.successful_actions,
            success_rate: self.success_rate(),
            learning_rate: self.learning_rate,
        }
    }

    /// Shift the learning rate, clamped to `[0.001, 0.05]`.
    pub fn adjust_learning_rate(&mut self, delta: f32) {
        let (lo, hi) = LEARNING_RATE_RANGE;
        self.learning_rate = (self.learning_rate + delta).clamp(lo, hi);
    }

    /// After more than ten actions, learn faster when mostly failing and
    /// slower when mostly succeeding.
    pub fn optimize(&mut self) {
        if self.total_actions <= 10 {
            return;
        }
        let rate = self.success_rate();
        let before = self.learning_rate;
        if rate < 0.3 {
            self.learning_rate = (self.learning_rate * 1.1).min(OPTIMIZE_CEILING);
        } else if rate > 0.8 {
            self.learning_rate = (self.learning_rate * 0.9).max(OPTIMIZE_FLOOR);
        }
        if (self.learning_rate - before).abs() > f32::EPSILON {
            debug!(before, after = self.learning_rate, success_rate = rate, "Learning rate tuned");
        }
    }

    /// Back to level 1 with fresh skills and an empty history.
    pub fn reset(&mut self) {
        self.skills = [INITIAL_SKILL; SKILL_COUNT];
        self.experience = 0;
        self.experience_carry = 0.0;
        self.level = 1;
        self.total_actions = 0;
        self.successful_actions = 0;
        self.history.clear();
        self.learning_rate = self.initial_learning_rate;
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Exact encoded size of the learning blob.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        4 * 4 + 4 * SKILL_COUNT + 4 + self.history.iter().map(SuccessRecord::encoded_len).sum::<usize>()
    }

    /// Encode counters, skills and history.
    ///
    /// # Errors
    /// [`crate::CritterError::BufferTooSmall`] if the blob does not fit.
    pub fn encode(&self, out: &mut StagingBuffer) -> Result<usize> {
        let len = self.encoded_len();
        out.reserve(SUBSYSTEM, len)?;
        out.put_u32(self.experience);
        out.put_u32(self.level);
        out.put_u32(self.total_actions);
        out.put_u32(self.successful_actions);
        for &skill in &self.skills {
            out.put_f32(skill);
        }
        out.put_len(self.history.len());
        for record in self.history.iter() {
            out.put_u32(record.timestamp);
            out.put_u8(u8::from(record.success));
            out.put_str(record.action.name());
            out.put_f32(record.experience_gain);
        }
        Ok(len)
    }

    /// Decode a learning blob into a fresh system. The learning rate is not
    /// persisted and starts from configuration.
    ///
    /// # Errors
    /// [`crate::CritterError::Truncated`] on a short blob,
    /// [`crate::CritterError::Malformed`] on an unknown action name.
    pub fn decode(input: &mut ByteReader<'_>, config: &LearningConfig) -> Result<Self> {
        let mut system = Self::new(config);
        system.experience = input.u32()?;
        system.level = input.u32()?.max(1);
        system.total_actions = input.u32()?;
        system.successful_actions = input.u32()?.min(system.total_actions);
        for skill in &mut system.skills {
            *skill = crate::types::unit(input.f32()?);
        }
        let count = input.count(10)?;
        for _ in 0..count {
            let timestamp = input.u32()?;
            let success = input.u8()? != 0;
            let name = input.string()?;
            let action = Action::from_name(&name)
                .ok_or_else(|| input.malformed(format!("unknown action {name:?}")))?;
            let experience_gain = input.f32()?;
            system.history.push(SuccessRecord {
                action,
                success,
                timestamp,
                experience_gain,
            });
        }
        Ok(system)
    }
}
