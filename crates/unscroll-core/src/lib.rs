//! # Unscroll Core Library
//!
//! Core business logic for Unscroll, an engagement intervention engine
//! that nudges a user away from low-value scrolling sessions. The engine
//! watches coarse behavioral signals -- which site is open, for how long,
//! and what share of recently rendered content a classifier flags -- and
//! decides when to surface an interruption or a once-daily morning gate.
//!
//! ## Architecture
//!
//! - **Engine**: a wall-clock-based state machine and single ingestion
//!   point; the caller feeds it platform events and invokes `tick()`
//!   periodically
//! - **Storage**: SQLite-based session archive and key-value store plus
//!   TOML-based configuration
//! - **Classification**: a replaceable keyword heuristic behind the
//!   [`ContentClassifier`] trait; the engine only consumes booleans
//! - **Simulation**: a seeded scripted-day harness for regression runs
//!
//! ## Key Components
//!
//! - [`Engine`]: the event-driven intervention engine
//! - [`SessionTracker`] / [`ContentTally`]: per-session activity signals
//! - [`InterventionSelector`] / [`MorningGate`]: the two decision machines
//! - [`ProgressLedger`]: persistent points and streak
//! - [`Database`] / [`Config`]: persistence and configuration

pub mod classify;
pub mod engine;
pub mod error;
pub mod events;
pub mod intervention;
pub mod ledger;
pub mod morning;
pub mod rng;
pub mod session;
pub mod simulation;
pub mod storage;

pub use classify::{ContentClassifier, KeywordClassifier};
pub use engine::{Engine, EngineSnapshot};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use intervention::{
    Intervention, InterventionKind, InterventionResponse, InterventionSelector, Severity,
    TriggerConfig,
};
pub use ledger::{LedgerSnapshot, ProgressLedger};
pub use morning::{IdleState, MessageStyle, MorningAction, MorningConfig, MorningGate};
pub use rng::{PcgSource, RandomSource, XorShift64};
pub use session::{ContentTally, SessionConfig, SessionTracker};
pub use simulation::{run_scenario, ScenarioConfig, SimulationReport};
pub use storage::{Config, Database, MemStore, Stats, Store};
