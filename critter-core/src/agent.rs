//! The agent orchestrator.
//!
//! [`Agent`] owns every subsystem by value and sequences the per-tick
//! pipeline. Hosts hold it directly (or behind a mutex when several tasks
//! touch it) and pass a timestamp into [`Agent::update`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::balance::BalanceManager;
use crate::clock::{self, Clock, Millis};
use crate::config::CritterConfig;
use crate::decision::DecisionEngine;
use crate::embedding::{Embedding, HashEmbedder, TextEmbedder};
use crate::emotion::{Emotion, EmotionEngine};
use crate::error::{CritterError, Result};
use crate::knowledge::KnowledgeBase;
use crate::learning::{LearningInsights, LearningStatus, LearningSystem};
use crate::lifecycle::{LifecycleInfo, LifecycleSystem};
use crate::memory::{MemoryRecord, MemoryStore, MemorySummary};
use crate::persistence::{self, LoadOutcome, SnapshotHeader, SnapshotParts};
use crate::prompt::PromptDirectives;
use crate::state::InternalStateModel;
use crate::types::{Action, InternalStates, StateDim, Vitals};

/// Importance every memory starts from.
const BASE_IMPORTANCE: f32 = 0.5;
/// Bonus for play and socialize.
const SOCIAL_ACTION_BONUS: f32 = 0.2;
/// Bonus per scalar that moved by more than [`SIGNIFICANT_CHANGE`].
const CHANGE_BONUS: f32 = 0.1;
const SIGNIFICANT_CHANGE: f32 = 0.1;

/// Importance of one tick's outcome, also used as the Q-learning reward.
#[must_use]
pub fn importance_score(action: Action, pre: &Vitals, post: &Vitals) -> f32 {
    let mut score = BASE_IMPORTANCE;
    if matches!(action, Action::Play | Action::Socialize) {
        score += SOCIAL_ACTION_BONUS;
    }
    for dim in StateDim::ALL {
        if (post.get(dim) - pre.get(dim)).abs() > SIGNIFICANT_CHANGE {
            score += CHANGE_BONUS;
        }
    }
    score.min(1.0)
}

/// Snapshot of everything the display layer shows, serializable to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    /// Ticks run so far.
    pub step_count: u32,
    /// Action chosen on the last tick.
    pub current_action: Option<Action>,
    /// Homeostatic state.
    pub states: InternalStates,
    /// Dominant emotion.
    pub emotion: Emotion,
    /// Life stage.
    pub lifecycle: LifecycleInfo,
    /// Skills and experience.
    pub learning: LearningStatus,
    /// Memory counters.
    pub memory: MemorySummary,
    /// Current exploration share.
    pub exploration_rate: f32,
    /// Current exploitation share.
    pub exploitation_rate: f32,
}

impl AgentStatus {
    /// Render as pretty JSON.
    ///
    /// # Errors
    /// [`CritterError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CritterError::Serialization(e.to_string()))
    }
}

/// One virtual creature.
pub struct Agent {
    config: CritterConfig,
    embedder: Arc<dyn TextEmbedder>,

    state: InternalStateModel,
    emotion: EmotionEngine,
    decision: DecisionEngine,
    balance: BalanceManager,
    learning: LearningSystem,
    memory: MemoryStore,
    knowledge: KnowledgeBase,
    prompts: PromptDirectives,
    lifecycle: LifecycleSystem,

    step_count: u32,
    last_update_time: u32,
    current_action: Option<Action>,
    current_prompt: String,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("step_count", &self.step_count)
            .field("current_action", &self.current_action)
            .field("states", self.state.states())
            .field("emotion", &self.emotion.current().name)
            .field("memory", &self.memory.summary())
            .field("embedder", &self.embedder.model_name())
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Build an agent with the default hash embedder.
    ///
    /// # Errors
    /// [`CritterError::Config`] if `config` fails validation.
    pub fn new(config: CritterConfig) -> Result<Self> {
        Self::with_embedder(config, Arc::new(HashEmbedder))
    }

    /// Build an agent with a custom text embedder for memory tags.
    ///
    /// # Errors
    /// [`CritterError::Config`] if `config` fails validation.
    pub fn with_embedder(config: CritterConfig, embedder: Arc<dyn TextEmbedder>) -> Result<Self> {
        config.validate()?;
        info!(
            model = embedder.model_name(),
            memory_capacity = config.memory.capacity,
            "Agent created"
        );
        Ok(Self {
            state: InternalStateModel::new(&config.state),
            emotion: EmotionEngine::new(&config.emotion),
            decision: DecisionEngine::new(&config.decision),
            balance: BalanceManager::new(&config.balance),
            learning: LearningSystem::new(&config.learning),
            memory: MemoryStore::with_embedder(&config.memory, Arc::clone(&embedder)),
            knowledge: KnowledgeBase::new(&config.knowledge),
            prompts: PromptDirectives::new(&config.prompts),
            lifecycle: LifecycleSystem::new(),
            step_count: 0,
            last_update_time: 0,
            current_action: None,
            current_prompt: String::new(),
            config,
            embedder,
        })
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run one tick at `clock`'s current time.
    pub fn tick(&mut self, clock: &dyn Clock) -> Action {
        self.update(clock.now_ms())
    }

    /// Run one tick at `now` and return the action taken.
    pub fn update(&mut self, now: Millis) -> Action {
        self.step_count = self.step_count.saturating_add(1);
        let timestamp = clock::wire_timestamp(now);
        self.last_update_time = timestamp;

        self.state.update(now);
        self.lifecycle.update(now);
        self.emotion.update(now);
        self.learning.update(now);
        self.memory.evict();

        let pre = self.state.states().vitals();
        let emotion = self.emotion.current().name.clone();
        let hints = self.learning.recommendations();
        self.current_prompt = self.prompts.generate_combined(&pre, &emotion, &hints, now);

        let decision = self.decision.decide(&pre, &emotion);
        let action = decision.action;
        self.state.perform_action(action);
        let post = self.state.states().vitals();
        self.current_action = Some(action);

        let importance = importance_score(action, &pre, &post);
        self.memory
            .store(action, pre, importance, &emotion, self.lifecycle.info(), timestamp);
        self.knowledge.record(action, pre, post, now);

        let outcome = self.learning.learn_from_experience(action, true, Some((&pre, &post)), timestamp);
        self.decision.update_table(action, importance);
        self.balance.record_action(action, outcome.success, timestamp);

        let every = self.config.agent.optimize_every_steps;
        if every > 0 && self.step_count % every == 0 {
            self.optimize_behavior(now);
        }

        debug!(
            step = self.step_count,
            %action,
            exploration = decision.exploration,
            importance,
            success = outcome.success,
            "Tick complete"
        );
        action
    }

    /// Periodic tuning: learning rate, expired prompts and the balance ratio.
    pub fn optimize_behavior(&mut self, now: Millis) {
        self.learning.optimize();
        self.prompts.optimize(now);
        self.balance.update();
        debug!(
            learning_rate = self.learning.learning_rate(),
            exploration = self.balance.exploration_rate(),
            "Behavior optimized"
        );
    }

    // ------------------------------------------------------------------
    // Inputs from the host
    // ------------------------------------------------------------------

    /// Set a prompt directive. Temporary prompts expire `duration_secs` after `now`.
    pub fn set_prompt(&mut self, key: &str, text: &str, temporary: bool, duration_secs: u32, now: Millis) {
        self.prompts.set(key, text, temporary, duration_secs, now);
    }

    /// Overwrite one emotion's intensity. Unknown names are ignored.
    pub fn trigger_emotion(&mut self, name: &str, intensity: f32) -> bool {
        self.emotion.trigger(name, intensity)
    }

    /// Apply an action by name outside the tick loop (e.g. a button press).
    /// Unknown names are ignored.
    pub fn perform_action(&mut self, name: &str) -> bool {
        self.state.perform_named(name)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Homeostatic state.
    #[must_use]
    pub fn internal_states(&self) -> &InternalStates {
        self.state.states()
    }

    /// Dominant emotion.
    #[must_use]
    pub fn emotional_state(&self) -> &Emotion {
        self.emotion.current()
    }

    /// Description of the dominant emotion with its intensity.
    #[must_use]
    pub fn emotional_description(&self) -> String {
        self.emotion.description()
    }

    /// Life stage derived from age.
    #[must_use]
    pub fn lifecycle_info(&self) -> LifecycleInfo {
        self.lifecycle.info()
    }

    /// Keyword search over `"action emotion"`.
    pub fn search_memories(&mut self, query: &str) -> Vec<MemoryRecord> {
        self.memory.search_by_keyword(query)
    }

    /// Cosine-similarity search, most similar first.
    pub fn search_memories_by_embedding(&mut self, query: &Embedding, threshold: f32) -> Vec<(MemoryRecord, f32)> {
        self.memory.search_by_embedding(query, threshold)
    }

    /// Memory counters.
    #[must_use]
    pub fn memory_summary(&self) -> MemorySummary {
        self.memory.summary()
    }

    /// Best and worst actions by success rate.
    #[must_use]
    pub fn learning_insights(&self) -> LearningInsights {
        self.learning.insights()
    }

    /// Action chosen on the last tick.
    #[must_use]
    pub fn current_action(&self) -> Option<Action> {
        self.current_action
    }

    /// Combined prompt generated on the last tick.
    #[must_use]
    pub fn current_prompt(&self) -> &str {
        &self.current_prompt
    }

    /// Raw state-transition log.
    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Balance-weighted priority of every action for the current state.
    #[must_use]
    pub fn action_priorities(&self) -> Vec<(Action, f32)> {
        let vitals = self.state.states().vitals();
        Action::ALL
            .into_iter()
            .map(|a| (a, self.balance.action_priority(a, &vitals)))
            .collect()
    }

    /// Ticks run so far.
    #[must_use]
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Wire timestamp of the last tick.
    #[must_use]
    pub fn last_update_time(&self) -> u32 {
        self.last_update_time
    }

    /// Skills and experience.
    #[must_use]
    pub fn learning(&self) -> &LearningSystem {
        &self.learning
    }

    /// Q-learning engine.
    #[must_use]
    pub fn decision(&self) -> &DecisionEngine {
        &self.decision
    }

    /// Exploration balance.
    #[must_use]
    pub fn balance(&self) -> &BalanceManager {
        &self.balance
    }

    /// Emotion catalog.
    #[must_use]
    pub fn emotions(&self) -> &EmotionEngine {
        &self.emotion
    }

    /// Episodic memory.
    #[must_use]
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Prompt directives.
    #[must_use]
    pub fn prompts(&self) -> &PromptDirectives {
        &self.prompts
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CritterConfig {
        &self.config
    }

    /// Everything the display layer shows.
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            step_count: self.step_count,
            current_action: self.current_action,
            states: *self.state.states(),
            emotion: self.emotion.current().clone(),
            lifecycle: self.lifecycle.info(),
            learning: self.learning.status(),
            memory: self.memory.summary(),
            exploration_rate: self.balance.exploration_rate(),
            exploitation_rate: self.balance.exploitation_rate(),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Return every subsystem to its initial state. The decision RNG keeps
    /// its stream and the default prompts are reinstalled.
    pub fn reset_all(&mut self) {
        let c = &self.config;
        self.state = InternalStateModel::new(&c.state);
        self.emotion = EmotionEngine::new(&c.emotion);
        self.decision.reset();
        self.balance.reset();
        self.learning.reset();
        self.memory.clear();
        self.knowledge.clear();
        self.prompts = PromptDirectives::new(&c.prompts);
        self.lifecycle = LifecycleSystem::new();
        self.step_count = 0;
        self.last_update_time = 0;
        self.current_action = None;
        self.current_prompt.clear();
        info!("Agent reset");
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Encode a snapshot bounded by the configured staging capacity.
    ///
    /// # Errors
    /// [`CritterError::BufferTooSmall`] naming the subsystem that did not fit.
    pub fn save(&self) -> Result<Vec<u8>> {
        let parts = SnapshotParts {
            header: SnapshotHeader {
                step_count: self.step_count,
                last_update_time: self.last_update_time,
            },
            state: &self.state,
            emotion: &self.emotion,
            learning: &self.learning,
            balance: &self.balance,
            memory: &self.memory,
        };
        persistence::encode_snapshot(&parts, self.config.persistence.staging_capacity)
            .inspect_err(|e| warn!(error = %e, "Save aborted"))
    }

    /// Restore from a snapshot. On any error the agent is left untouched.
    ///
    /// Subsystems not in the snapshot (Q-table, knowledge, prompts) keep
    /// their in-memory state. Lifecycle age is taken from the restored
    /// internal states.
    ///
    /// # Errors
    /// [`CritterError::Truncated`] or [`CritterError::Malformed`].
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        let restored = persistence::decode_snapshot(bytes, &self.config, Arc::clone(&self.embedder))
            .inspect_err(|e| warn!(error = %e, "Load aborted"))?;

        self.lifecycle = LifecycleSystem::with_age(restored.state.states().age);
        self.state = restored.state;
        self.emotion = restored.emotion;
        self.learning = restored.learning;
        self.balance = restored.balance;
        self.memory = restored.memory;
        self.step_count = restored.header.step_count;
        self.last_update_time = restored.header.last_update_time;
        info!(
            step_count = self.step_count,
            memories = self.memory.len(),
            "Agent restored"
        );
        Ok(())
    }

    /// Save to `path` atomically.
    ///
    /// # Errors
    /// Encoding or I/O errors; an existing file is never half-overwritten.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let start = Instant::now();
        let bytes = self.save()?;
        persistence::write_snapshot(path, &bytes)?;
        info!(
            path = %path.display(),
            step_count = self.step_count,
            elapsed_ms = start.elapsed().as_millis(),
            "Agent saved"
        );
        Ok(())
    }

    /// Load from `path`. A missing file is a first run and changes nothing.
    ///
    /// # Errors
    /// Decoding or I/O errors; the agent is left untouched.
    pub fn load_from(&mut self, path: &Path) -> Result<LoadOutcome> {
        let Some(bytes) = persistence::read_snapshot(path)? else {
            return Ok(LoadOutcome::FirstRun);
        };
        self.load(&bytes)?;
        Ok(LoadOutcome::Restored {
            step_count: self.step_count,
            payload_len: bytes.len().saturating_sub(persistence::HEADER_LEN),
        })
    }
}
