//! # Critter Core Library
//!
//! Simulation and learning engine for an autonomous virtual creature running
//! on a memory-constrained device.
//!
//! One [`Agent`] owns every subsystem by value and advances them all from a
//! single [`Agent::update`] call:
//!
//! - **Internal state**: six homeostatic scalars with decay and action effects
//! - **Emotion**: a fixed catalog of twelve affects with decay and normalization
//! - **Decision**: epsilon-greedy Q-learning over a per-dimension Q-table
//! - **Balance**: adaptive exploration / exploitation ratio
//! - **Learning**: skills, experience, success analysis
//! - **Memory**: importance-evicted episodic records with embedding search
//! - **Prompts**: persistent and expiring directive text
//! - **Lifecycle**: age-derived life stage
//!
//! State is persisted as a compact little-endian snapshot (see [`persistence`]).
//!
//! ## Resource Contract
//!
//! Every collection is capacity-bounded and every scalar is clamped after each
//! mutation. Nothing in this crate spawns threads or blocks except the file
//! helpers in [`persistence`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod agent;
pub mod balance;
pub mod clock;
pub mod codec;
pub mod config;
pub mod decision;
pub mod embedding;
pub mod emotion;
pub mod error;
pub mod history;
pub mod knowledge;
pub mod learning;
pub mod lifecycle;
pub mod memory;
pub mod persistence;
pub mod prompt;
pub mod state;
pub mod types;

pub use agent::{Agent, AgentStatus};
pub use clock::{Clock, ManualClock, Millis, MonotonicClock};
pub use config::CritterConfig;
pub use error::{CritterError, Result};
pub use types::{Action, InternalStates, StateDim};
