//! Batch evaluation across many users.
//!
//! Every user is independent, so the batch is spread over the rayon pool
//! with no shared state. Callers refreshing a whole leaderboard should run
//! this off their interactive path (e.g. `tokio::task::spawn_blocking`).

use crate::engine::resolve_peer_status_with;
use crate::simulator::SimulationParams;
use crate::{BacStatus, PeerSnapshot, Result};
use rayon::prelude::*;
use std::cmp::Ordering;

/// One user's snapshot to evaluate
#[derive(Clone, Debug)]
pub struct PeerEntry {
    pub user_id: String,
    pub snapshot: PeerSnapshot,
}

/// Evaluation result for one user
#[derive(Debug)]
pub struct BatchOutcome {
    pub user_id: String,
    pub result: Result<BacStatus>,
}

/// Successfully evaluated user, as used for ranking
#[derive(Clone, Debug, PartialEq)]
pub struct PeerStatus {
    pub user_id: String,
    pub status: BacStatus,
}

/// Evaluate every peer at `now_ms`, in parallel, preserving input order
pub fn compute_batch(params: &SimulationParams, peers: &[PeerEntry], now_ms: i64) -> Vec<BatchOutcome> {
    let outcomes: Vec<BatchOutcome> = peers
        .par_iter()
        .map(|peer| BatchOutcome {
            user_id: peer.user_id.clone(),
            result: resolve_peer_status_with(params, &peer.snapshot, now_ms),
        })
        .collect();

    tracing::info!("Evaluated {} peers", outcomes.len());
    outcomes
}

/// Order successful outcomes by current BAC, highest first
///
/// Failed evaluations are logged and left out. Ties are broken by user id
/// so the order is stable between refreshes.
pub fn rank_by_bac(outcomes: Vec<BatchOutcome>) -> Vec<PeerStatus> {
    let mut ranked: Vec<PeerStatus> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome.result {
            Ok(status) => Some(PeerStatus {
                user_id: outcome.user_id,
                status,
            }),
            Err(e) => {
                tracing::warn!("Leaving {} out of ranking: {}", outcome.user_id, e);
                None
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.status
            .current_bac
            .partial_cmp(&a.status.current_bac)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    ranked
}
