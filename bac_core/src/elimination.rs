//! Elimination model: zero-order metabolic decay.

use crate::{Pace, HOUR_MS};
use serde::{Deserialize, Serialize};

/// Metabolism rate in %/hour for a drinking habit level
///
/// Shared by the stepped simulator and the decay approximation so the two
/// converge once a full drink history becomes available.
pub fn metabolism_rate_per_hour(habit: Pace) -> f64 {
    match habit {
        Pace::Slow => 0.010,
        Pace::Average => 0.015,
        Pace::Fast => 0.020,
    }
}

/// BAC removed over `duration_ms` at `rate_per_hour`
pub fn elimination_over(rate_per_hour: f64, duration_ms: i64) -> f64 {
    rate_per_hour * duration_ms.max(0) as f64 / HOUR_MS as f64
}

/// Subtract eliminated BAC, never going below zero
pub fn eliminate(bac: f64, amount: f64) -> f64 {
    (bac - amount).max(0.0)
}

/// When elimination starts acting on absorbed alcohol
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EliminationOnset {
    /// From the end of the first drink's absorption window onwards
    #[default]
    AfterAbsorption,
    /// On every step, including those still absorbing
    Concurrent,
}
