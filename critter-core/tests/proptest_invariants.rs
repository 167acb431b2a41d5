//! Property-based tests for engine invariants.
//!
//! Clamping of every scalar, capacity bounds on every bounded collection,
//! Q-table bounds and snapshot round trips under random inputs.

use proptest::prelude::*;

use critter_core::balance::BalanceManager;
use critter_core::config::{BalanceConfig, DecisionConfig, EmotionConfig, LearningConfig, MemoryConfig};
use critter_core::decision::DecisionEngine;
use critter_core::emotion::EmotionEngine;
use critter_core::learning::LearningSystem;
use critter_core::lifecycle::LifecycleInfo;
use critter_core::memory::MemoryStore;
use critter_core::state::InternalStateModel;
use critter_core::types::Vitals;
use critter_core::{Action, Agent, CritterConfig, InternalStates};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_action() -> impl Strategy<Value = Action> {
    (0..Action::COUNT).prop_map(|i| Action::ALL[i])
}

fn arb_vitals() -> impl Strategy<Value = Vitals> {
    prop::array::uniform6(0.0..=1.0f32).prop_map(Vitals::from_array)
}

static EMOTIONS: [&str; 12] = [
    "joy", "apathy", "discontent", "capricious", "anger", "satisfaction",
    "curiosity", "fear", "excitement", "calm", "loneliness", "love",
];

fn arb_emotion_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(EMOTIONS.to_vec())
}

fn in_unit(v: f32) -> bool {
    (0.0..=1.0).contains(&v)
}

// ---------------------------------------------------------------------------
// Property: internal-state scalars stay in [0, 1]
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn states_clamped_under_any_action_sequence(
        start in prop::array::uniform6(-5.0..5.0f32),
        actions in prop::collection::vec(arb_action(), 0..60),
        gaps in prop::collection::vec(0u64..100_000, 0..60),
    ) {
        let config = CritterConfig::default();
        let mut model = InternalStateModel::new(&config.state);
        let [hunger, happiness, health, energy, social, curiosity] = start;
        model.set_states(InternalStates { hunger, happiness, health, energy, social, curiosity, ..InternalStates::default() });

        let mut now = 0;
        for (action, gap) in actions.iter().zip(gaps.iter().chain(std::iter::repeat(&0))) {
            now += gap;
            model.update(now);
            model.perform_action(*action);
            for (_, v) in model.states().vitals().named() {
                prop_assert!(in_unit(v), "scalar escaped [0, 1]: {v}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: emotion normalization bounds
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn at_most_six_active_emotions(
        triggers in prop::collection::vec((arb_emotion_name(), -2.0..3.0f32), 1..40),
    ) {
        let mut engine = EmotionEngine::new(&EmotionConfig::default());
        for (name, intensity) in triggers {
            engine.trigger(name, intensity);
            prop_assert!(engine.active_count() <= 6);
            prop_assert!(engine.emotions().iter().all(|e| in_unit(e.intensity)));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: Q-table stays in [0, 1]
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn q_table_bounded(
        updates in prop::collection::vec((arb_action(), -10.0..10.0f32), 1..80),
    ) {
        let mut engine = DecisionEngine::new(&DecisionConfig { seed: Some(3), ..DecisionConfig::default() });
        for (action, reward) in updates {
            engine.update_table(action, reward);
        }
        for row in engine.q_table() {
            prop_assert!(row.iter().all(|q| in_unit(*q)));
        }
        prop_assert!(engine.action_weights().iter().all(|w| in_unit(*w)));
    }
}

// ---------------------------------------------------------------------------
// Property: memory capacity and importance-priority eviction
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn memory_never_exceeds_capacity_and_keeps_important(
        capacity in 2usize..40,
        importances in prop::collection::vec(0.0..=1.0f32, 1..120),
    ) {
        let config = MemoryConfig { capacity };
        let mut store = MemoryStore::new(&config);
        for (i, importance) in importances.iter().enumerate() {
            let before: Vec<(u32, f32)> = store.records().iter().map(|r| (r.timestamp, r.importance)).collect();
            let stamp = i as u32;
            store.store(Action::Wait, Vitals::default(), *importance, "calm", LifecycleInfo::from_age(0), stamp);
            prop_assert!(store.len() <= capacity);

            // No evicted record outranks a surviving older one.
            let kept: Vec<f32> = store
                .records()
                .iter()
                .filter(|r| r.timestamp != stamp)
                .map(|r| r.importance)
                .collect();
            let max_evicted = before
                .iter()
                .filter(|(ts, _)| store.records().iter().all(|r| r.timestamp != *ts))
                .map(|&(_, imp)| imp)
                .fold(f32::NEG_INFINITY, f32::max);
            let min_kept = kept.iter().copied().fold(f32::INFINITY, f32::min);
            if !kept.is_empty() {
                prop_assert!(min_kept >= max_evicted, "evicted {max_evicted} while keeping {min_kept}");
            }
        }

        if importances.len() <= capacity {
            prop_assert_eq!(store.len(), importances.len());
        } else {
            prop_assert!(store.len() >= capacity / 2);
        }
        // The most important memory ever stored always survives.
        let best_in = importances.iter().copied().fold(0.0_f32, f32::max);
        let best_kept = store.records().iter().map(|r| r.importance).fold(0.0_f32, f32::max);
        prop_assert_eq!(best_kept, best_in);
    }
}

// ---------------------------------------------------------------------------
// Property: FIFO histories hold exactly their capacity
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn balance_history_is_exactly_capacity(
        capacity in 1usize..30,
        extra in 1usize..30,
    ) {
        let mut balance = BalanceManager::new(&BalanceConfig { history_capacity: capacity, ..BalanceConfig::default() });
        for i in 0..capacity + extra {
            balance.record_action(Action::Explore, i % 2 == 0, i as u32);
        }
        prop_assert_eq!(balance.history().count(), capacity);
        // Oldest-first eviction keeps the newest timestamps.
        let first = balance.history().next().map(|r| r.timestamp);
        prop_assert_eq!(first, Some(extra as u32));
    }

    #[test]
    fn learning_history_is_exactly_capacity(
        capacity in 1usize..30,
        extra in 1usize..30,
        pre in arb_vitals(),
        post in arb_vitals(),
    ) {
        let mut learning = LearningSystem::new(&LearningConfig { history_capacity: capacity, ..LearningConfig::default() });
        for i in 0..capacity + extra {
            learning.learn_from_experience(Action::Play, true, Some((&pre, &post)), i as u32);
        }
        prop_assert_eq!(learning.history().count(), capacity);
        prop_assert!(learning.skills().iter().all(|s| in_unit(*s)));
    }
}

// ---------------------------------------------------------------------------
// Property: balance rates stay complementary and bounded
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn balance_rates_complementary(
        records in prop::collection::vec((arb_action(), any::<bool>()), 0..80),
        vitals in arb_vitals(),
    ) {
        let config = BalanceConfig::default();
        let mut balance = BalanceManager::new(&config);
        for (i, (action, success)) in records.into_iter().enumerate() {
            balance.record_action(action, success, i as u32);
            balance.update();
            let sum = balance.exploration_rate() + balance.exploitation_rate();
            prop_assert!((sum - 1.0).abs() < 1e-5);
            prop_assert!(balance.exploration_rate() <= config.max_exploration + 1e-6);
            prop_assert!(balance.exploitation_rate() <= config.max_exploitation + 1e-6);
        }
        for action in Action::ALL {
            prop_assert!(in_unit(balance.action_priority(action, &vitals)));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: agent snapshots round-trip after any tick schedule
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn agent_snapshot_round_trips(
        seed in any::<u64>(),
        gaps in prop::collection::vec(1u64..5_000, 0..50),
        mood in arb_emotion_name(),
    ) {
        let mut config = CritterConfig::default();
        config.decision.seed = Some(seed);
        let mut a = Agent::new(config.clone()).expect("valid");
        a.trigger_emotion(mood, 0.9);
        let mut now = 0;
        for gap in gaps {
            now += gap;
            a.update(now);
        }

        let bytes = a.save().expect("fits the default staging buffer");
        let mut b = Agent::new(config).expect("valid");
        b.load(&bytes).expect("round trip");
        prop_assert_eq!(b.step_count(), a.step_count());
        prop_assert_eq!(b.internal_states(), a.internal_states());
        prop_assert_eq!(b.emotions().emotions(), a.emotions().emotions());
        prop_assert_eq!(b.learning().skills(), a.learning().skills());
        prop_assert_eq!(b.memory().records(), a.memory().records());
    }
}
