#![forbid(unsafe_code)]

//! Blood-alcohol simulation engine and its supporting pieces.
//!
//! This crate provides:
//! - Domain types (drinks, profile, samples, status, peer snapshots)
//! - The pure engine: normalizer, absorption and elimination models,
//!   stepped simulator, peak/sober extraction, stage classifier, decay
//!   approximation
//! - History analytics, batch evaluation and a recurring status monitor
//! - Caller-side persistence (drink log, profile, CSV export) and config

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod normalize;
pub mod absorption;
pub mod elimination;
pub mod simulator;
pub mod peak;
pub mod stage;
pub mod decay;
pub mod engine;
pub mod analytics;
pub mod batch;
pub mod monitor;
pub mod drink_log;
pub mod profile_store;
pub mod csv_export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use stage::{classify, should_notify, BacStage, StageTracker, StageTransition};
pub use simulator::{SimulationParams, Simulator};
pub use elimination::EliminationOnset;
pub use decay::approximate_decay;
pub use engine::{
    compute_bac_series, compute_bac_series_with, compute_bac_status, compute_bac_status_with,
    resolve_peer_status, resolve_peer_status_with,
};
pub use analytics::{compute_session_stats, drinking_streaks, SessionStats, StreakStats};
pub use batch::{compute_batch, rank_by_bac, BatchOutcome, PeerEntry, PeerStatus};
pub use monitor::{PublishedStatus, SnapshotSource, StageAlert, StatusMonitor};
pub use drink_log::{DrinkSink, JsonlDrinkLog};
