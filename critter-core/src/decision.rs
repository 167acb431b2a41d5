//! Epsilon-greedy Q-learning over a per-dimension Q-table.
//!
//! Each action owns one Q-value per state dimension. The value of taking an
//! action in a given state is `Σ_dim Q[a][dim] × state[dim]`; updates move
//! a whole row at once by the TD error.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::config::DecisionConfig;
use crate::types::{Action, StateDim, Vitals};

/// Starting per-action weights, in [`Action::ALL`] order.
const INITIAL_ACTION_WEIGHTS: [f32; Action::COUNT] = [0.8, 0.7, 0.9, 0.6, 0.5, 0.4, 0.3];

/// Starting value of every Q-table cell.
const INITIAL_Q: f32 = 0.5;

/// Q-table shape: one row per action, one column per state dimension.
pub type QTable = [[f32; StateDim::COUNT]; Action::COUNT];

/// Outcome of one action selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Chosen action.
    pub action: Action,
    /// Whether the action was picked at random.
    pub exploration: bool,
}

/// Q-learning action selector.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    action_weights: [f32; Action::COUNT],
    q_table: QTable,
    learning_rate: f32,
    discount_factor: f32,
    exploration_rate: f32,
    dimension_weights: [f32; StateDim::COUNT],
    rng: StdRng,
}

fn row_mean(row: &[f32; StateDim::COUNT]) -> f32 {
    row.iter().sum::<f32>() / StateDim::COUNT as f32
}

impl DecisionEngine {
    /// Fresh table; seeded from `config.seed` when given, otherwise from entropy.
    #[must_use]
    pub fn new(config: &DecisionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            action_weights: INITIAL_ACTION_WEIGHTS,
            q_table: [[INITIAL_Q; StateDim::COUNT]; Action::COUNT],
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
            exploration_rate: config.exploration_rate,
            dimension_weights: config.dimension_weights,
            rng,
        }
    }

    /// The Q-table.
    #[must_use]
    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    /// Per-action weights (row means after the first update of each row).
    #[must_use]
    pub fn action_weights(&self) -> &[f32; Action::COUNT] {
        &self.action_weights
    }

    /// Current exploration probability.
    #[must_use]
    pub fn exploration_rate(&self) -> f32 {
        self.exploration_rate
    }

    /// Override the exploration probability, clamped to `[0, 1]`.
    pub fn set_exploration_rate(&mut self, rate: f32) {
        self.exploration_rate = crate::types::unit(rate);
    }

    /// State value of `action`: `Σ_dim Q[a][dim] × state[dim]`.
    #[must_use]
    pub fn action_value(&self, action: Action, vitals: &Vitals) -> f32 {
        self.q_table[action.index()]
            .iter()
            .zip(vitals.to_array())
            .map(|(q, s)| q * s)
            .sum()
    }

    /// Greedy choice: the first action whose value beats every earlier one
    /// and the zero floor. Falls back to the first action.
    #[must_use]
    pub fn best_action(&self, vitals: &Vitals) -> Action {
        let mut best = Action::ALL[0];
        let mut best_value = 0.0_f32;
        for action in Action::ALL {
            let value = self.action_value(action, vitals);
            if value > best_value {
                best_value = value;
                best = action;
            }
        }
        best
    }

    /// Epsilon-greedy selection. The emotion name is only logged.
    pub fn decide(&mut self, vitals: &Vitals, emotion: &str) -> Decision {
        let roll: f32 = self.rng.gen_range(0.0..1.0);
        let decision = if roll < self.exploration_rate {
            let index = self.rng.gen_range(0..Action::COUNT);
            Decision {
                action: Action::ALL[index],
                exploration: true,
            }
        } else {
            Decision {
                action: self.best_action(vitals),
                exploration: false,
            }
        };
        debug!(
            action = %decision.action,
            exploration = decision.exploration,
            emotion,
            "Action selected"
        );
        decision
    }

    /// Move the chosen action's row by the TD error.
    ///
    /// `max_next` is the best row mean across all actions, `current` the
    /// chosen row's mean; every cell of the row gains
    /// `learning_rate × (reward + discount × max_next − current) × weight[dim]`
    /// and is clamped to `[0, 1]`. The action's weight becomes the new row mean.
    pub fn update_table(&mut self, action: Action, reward: f32) {
        let max_next = self
            .q_table
            .iter()
            .map(row_mean)
            .fold(0.0_f32, f32::max);
        let row = &mut self.q_table[action.index()];
        let current = row_mean(row);
        let td_error = reward + self.discount_factor * max_next - current;

        for (cell, weight) in row.iter_mut().zip(self.dimension_weights) {
            *cell = crate::types::unit(*cell + self.learning_rate * td_error * weight);
        }
        let mean = row_mean(row);
        self.action_weights[action.index()] = mean;
        debug!(%action, reward, td_error, row_mean = mean, "Q-table updated");
    }

    /// Restore the initial table and weights; the RNG keeps its stream.
    pub fn reset(&mut self) {
        self.action_weights = INITIAL_ACTION_WEIGHTS;
        self.q_table = [[INITIAL_Q; StateDim::COUNT]; Action::COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(exploration_rate: f32) -> DecisionEngine {
        DecisionEngine::new(&DecisionConfig {
            exploration_rate,
            seed: Some(42),
            ..DecisionConfig::default()
        })
    }

    #[test]
    fn greedy_prefers_first_on_ties() {
        let e = engine(0.0);
        // All rows equal: the first action wins.
        assert_eq!(e.best_action(&Vitals::from_array([0.5; 6])), Action::Feed);
    }

    #[test]
    fn zero_state_falls_back_to_first_action() {
        let mut e = engine(0.0);
        e.update_table(Action::Heal, 1.0);
        assert_eq!(e.best_action(&Vitals::default()), Action::Feed);
    }

    #[test]
    fn rewarded_action_becomes_greedy_choice() {
        let mut e = engine(0.0);
        for _ in 0..20 {
            e.update_table(Action::Rest, 1.0);
        }
        let vitals = Vitals::from_array([0.5; 6]);
        let decision = e.decide(&vitals, "calm");
        assert_eq!(decision.action, Action::Rest);
        assert!(!decision.exploration);
    }

    #[test]
    fn td_update_matches_rule() {
        let mut e = engine(0.0);
        // max_next = 0.5, current = 0.5, td = 1.0 + 0.45 - 0.5 = 0.95
        e.update_table(Action::Play, 1.0);
        let expected = 0.5 + 0.1 * 0.95;
        for cell in e.q_table()[Action::Play.index()] {
            assert!((cell - expected).abs() < 1e-6);
        }
        assert!((e.action_weights()[Action::Play.index()] - expected).abs() < 1e-6);
        assert!((e.action_weights()[Action::Feed.index()] - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn q_values_stay_in_bounds() {
        let mut e = engine(0.0);
        for i in 0..200 {
            let reward = if i % 2 == 0 { 50.0 } else { -50.0 };
            e.update_table(Action::ALL[i % Action::COUNT], reward);
        }
        for row in e.q_table() {
            for &cell in row {
                assert!((0.0..=1.0).contains(&cell));
            }
        }
    }

    #[test]
    fn full_exploration_is_flagged() {
        let mut e = engine(1.0);
        for _ in 0..20 {
            assert!(e.decide(&Vitals::default(), "joy").exploration);
        }
    }

    #[test]
    fn dimension_weights_scale_updates() {
        let mut weights = [1.0; StateDim::COUNT];
        weights[StateDim::Hunger.index()] = 2.0;
        let mut e = DecisionEngine::new(&DecisionConfig {
            dimension_weights: weights,
            seed: Some(1),
            ..DecisionConfig::default()
        });
        e.update_table(Action::Feed, 0.0);
        let row = e.q_table()[Action::Feed.index()];
        // td = 0 + 0.45 - 0.5 = -0.05
        assert!((row[0] - (0.5 - 0.01)).abs() < 1e-6);
        assert!((row[1] - (0.5 - 0.005)).abs() < 1e-6);
    }
}
