//! Configuration for the critter engine.
//!
//! Maps directly to `critter.toml`. Every field has a default, so an empty
//! file (or no file at all) yields the stock creature.

use serde::{Deserialize, Serialize};

use crate::error::{CritterError, Result};
use crate::types::StateDim;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CritterConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Homeostatic state dynamics.
    #[serde(default)]
    pub state: StateConfig,
    /// Emotion dynamics.
    #[serde(default)]
    pub emotion: EmotionConfig,
    /// Q-learning parameters.
    #[serde(default)]
    pub decision: DecisionConfig,
    /// Exploration / exploitation balance.
    #[serde(default)]
    pub balance: BalanceConfig,
    /// Skill and experience learning.
    #[serde(default)]
    pub learning: LearningConfig,
    /// Episodic memory store.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Raw state-transition log.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    /// Prompt directives.
    #[serde(default)]
    pub prompts: PromptConfig,
    /// Orchestrator cadence.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Snapshot persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Host scheduling (read by the host binary only).
    #[serde(default)]
    pub host: HostConfig,
}

impl CritterConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `CritterError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| CritterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject configurations that would break an engine invariant.
    ///
    /// # Errors
    /// Returns `CritterError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let capacities = [
            ("balance.history_capacity", self.balance.history_capacity),
            ("learning.history_capacity", self.learning.history_capacity),
            ("memory.capacity", self.memory.capacity),
            ("knowledge.capacity", self.knowledge.capacity),
            ("prompts.capacity", self.prompts.capacity),
            ("emotion.max_active", self.emotion.max_active),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(CritterError::Config(format!("{name} must be non-zero")));
            }
        }

        let rates = [
            ("decision.learning_rate", self.decision.learning_rate),
            ("decision.discount_factor", self.decision.discount_factor),
            ("decision.exploration_rate", self.decision.exploration_rate),
            ("balance.exploration_rate", self.balance.exploration_rate),
            ("balance.max_exploration", self.balance.max_exploration),
            ("balance.max_exploitation", self.balance.max_exploitation),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(CritterError::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }

        if self.persistence.staging_capacity < crate::persistence::HEADER_LEN {
            return Err(CritterError::Config(
                "persistence.staging_capacity is smaller than the snapshot header".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Homeostatic decay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Minimum milliseconds between two applied decay steps.
    #[serde(default = "default_100_u64")]
    pub update_interval_ms: u64,
    /// Per-second decay rates. Hunger rises at its rate, the rest fall.
    #[serde(default)]
    pub decay: DecayRates,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 100,
            decay: DecayRates::default(),
        }
    }
}

/// Per-scalar decay rates (units per second).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecayRates {
    /// Hunger growth rate.
    #[serde(default = "default_0_01")]
    pub hunger: f32,
    /// Happiness decay rate.
    #[serde(default = "default_0_005")]
    pub happiness: f32,
    /// Health decay rate.
    #[serde(default = "default_0_002")]
    pub health: f32,
    /// Energy decay rate.
    #[serde(default = "default_0_008")]
    pub energy: f32,
    /// Social decay rate.
    #[serde(default = "default_0_003")]
    pub social: f32,
    /// Curiosity decay rate.
    #[serde(default = "default_0_004")]
    pub curiosity: f32,
}

impl DecayRates {
    /// Rate for one dimension.
    #[must_use]
    pub fn get(&self, dim: StateDim) -> f32 {
        match dim {
            StateDim::Hunger => self.hunger,
            StateDim::Happiness => self.happiness,
            StateDim::Health => self.health,
            StateDim::Energy => self.energy,
            StateDim::Social => self.social,
            StateDim::Curiosity => self.curiosity,
        }
    }
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            hunger: 0.01,
            happiness: 0.005,
            health: 0.002,
            energy: 0.008,
            social: 0.003,
            curiosity: 0.004,
        }
    }
}

/// Emotion dynamics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionConfig {
    /// Linear intensity decay per second.
    #[serde(default = "default_0_01")]
    pub decay_rate: f32,
    /// Maximum number of simultaneously active emotions.
    #[serde(default = "default_6_usize")]
    pub max_active: usize,
    /// Intensity above which an emotion counts as active.
    #[serde(default = "default_0_1")]
    pub active_threshold: f32,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.01,
            max_active: 6,
            active_threshold: 0.1,
        }
    }
}

/// Q-learning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Step size for Q updates.
    #[serde(default = "default_0_1")]
    pub learning_rate: f32,
    /// Discount applied to the best next-action estimate.
    #[serde(default = "default_0_9")]
    pub discount_factor: f32,
    /// Probability of picking a random action.
    #[serde(default = "default_0_3")]
    pub exploration_rate: f32,
    /// Per-dimension multipliers on the Q update, in state-vector order.
    #[serde(default = "default_dimension_weights")]
    pub dimension_weights: [f32; StateDim::COUNT],
    /// Fixed RNG seed; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 0.3,
            dimension_weights: default_dimension_weights(),
            seed: None,
        }
    }
}

/// Exploration / exploitation balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Initial exploration rate; exploitation is its complement.
    #[serde(default = "default_0_3")]
    pub exploration_rate: f32,
    /// Maximum nudge per adaptation step.
    #[serde(default = "default_0_01")]
    pub adaptation_rate: f32,
    /// Upper bound on the exploration rate.
    #[serde(default = "default_0_5")]
    pub max_exploration: f32,
    /// Upper bound on the exploitation rate.
    #[serde(default = "default_0_8")]
    pub max_exploitation: f32,
    /// Action history ring size.
    #[serde(default = "default_20_usize")]
    pub history_capacity: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            exploration_rate: 0.3,
            adaptation_rate: 0.01,
            max_exploration: 0.5,
            max_exploitation: 0.8,
            history_capacity: 20,
        }
    }
}

/// Skill and experience learning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Initial experience learning rate.
    #[serde(default = "default_0_01")]
    pub learning_rate: f32,
    /// Skill decay per second.
    #[serde(default = "default_0_001")]
    pub skill_decay_rate: f32,
    /// Success history size.
    #[serde(default = "default_50_usize")]
    pub history_capacity: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            skill_decay_rate: 0.001,
            history_capacity: 50,
        }
    }
}

/// Episodic memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Hard cap on stored memory records.
    #[serde(default = "default_30_usize")]
    pub capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { capacity: 30 }
    }
}

/// Raw state-transition log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Hard cap on knowledge records.
    #[serde(default = "default_50_usize")]
    pub capacity: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Prompt directives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Capacity of each prompt map.
    #[serde(default = "default_10_usize")]
    pub capacity: usize,
    /// Persistent prompts installed at construction and on reset.
    #[serde(default = "default_prompts")]
    pub defaults: Vec<(String, String)>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            defaults: default_prompts(),
        }
    }
}

/// Orchestrator cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Run `optimize_behavior` every N ticks (0 disables it).
    #[serde(default = "default_10_u32")]
    pub optimize_every_steps: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            optimize_every_steps: 10,
        }
    }
}

/// Snapshot persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Size of the staging buffer the snapshot is encoded into. The bound
    /// covers the 12-byte header plus every subsystem blob. The default is
    /// 4096 rather than the device's 2048 because full histories plus a full
    /// memory store at the default capacities encode to roughly 2.9 KiB.
    #[serde(default = "default_4096")]
    pub staging_capacity: usize,
    /// Default snapshot location.
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            staging_capacity: 4096,
            state_path: default_state_path(),
        }
    }
}

/// Host scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Milliseconds between ticks.
    #[serde(default = "default_1000_u64")]
    pub tick_interval_ms: u64,
    /// Seconds between autosaves (0 disables autosave).
    #[serde(default = "default_30_u64")]
    pub autosave_interval_secs: u64,
    /// Stop after this many ticks; run forever when absent.
    #[serde(default)]
    pub max_steps: Option<u64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            autosave_interval_secs: 30,
            max_steps: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_log_level() -> String { "info".to_string() }
fn default_state_path() -> String { "critter_state.bin".to_string() }
fn default_prompts() -> Vec<(String, String)> {
    vec![
        ("personality".to_string(), "You are a small curious creature living on a tiny device.".to_string()),
        ("behavior".to_string(), "Keep yourself fed, rested and happy.".to_string()),
    ]
}
fn default_dimension_weights() -> [f32; StateDim::COUNT] { [1.0; StateDim::COUNT] }
fn default_0_001() -> f32 { 0.001 }
fn default_0_002() -> f32 { 0.002 }
fn default_0_003() -> f32 { 0.003 }
fn default_0_004() -> f32 { 0.004 }
fn default_0_005() -> f32 { 0.005 }
fn default_0_008() -> f32 { 0.008 }
fn default_0_01() -> f32 { 0.01 }
fn default_0_1() -> f32 { 0.1 }
fn default_0_3() -> f32 { 0.3 }
fn default_0_5() -> f32 { 0.5 }
fn default_0_8() -> f32 { 0.8 }
fn default_0_9() -> f32 { 0.9 }
fn default_6_usize() -> usize { 6 }
fn default_10_usize() -> usize { 10 }
fn default_20_usize() -> usize { 20 }
fn default_30_usize() -> usize { 30 }
fn default_50_usize() -> usize { 50 }
fn default_10_u32() -> u32 { 10 }
fn default_30_u64() -> u64 { 30 }
fn default_100_u64() -> u64 { 100 }
fn default_1000_u64() -> u64 { 1000 }
fn default_4096() -> usize { 4096 }
