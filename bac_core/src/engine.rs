//! Public entry points of the BAC engine.
//!
//! Both operations are pure: they take an immutable snapshot of drinks and
//! profile plus a point in time and return fresh values. Drinks are
//! normalized on the way in, so callers may pass raw application data.

use crate::decay::approximate_decay;
use crate::elimination::{eliminate, elimination_over};
use crate::normalize::normalize_events;
use crate::peak::extract_peak_and_sober;
use crate::simulator::{SimulationParams, Simulator};
use crate::stage::BacStage;
use crate::{BacSample, BacStatus, DrinkEvent, Error, PeerSnapshot, Profile, Result};

fn require_non_negative(name: &str, value: i64) -> Result<()> {
    if value < 0 {
        return Err(Error::InvalidArgument(format!(
            "{} must not be negative, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Current BAC, projected peak, projected sober time and stage at `now_ms`
pub fn compute_bac_status(events: &[DrinkEvent], profile: &Profile, now_ms: i64) -> Result<BacStatus> {
    compute_bac_status_with(&SimulationParams::default(), events, profile, now_ms)
}

/// [`compute_bac_status`] with explicit simulation parameters
///
/// The current value comes from a run up to `min(now, last drink + margin)`,
/// decayed linearly for any time beyond that. Peak and sober time come from
/// the full run to `last drink + margin`; a sober time beyond it is projected
/// by the same linear decay.
pub fn compute_bac_status_with(
    params: &SimulationParams,
    events: &[DrinkEvent],
    profile: &Profile,
    now_ms: i64,
) -> Result<BacStatus> {
    require_non_negative("now_ms", now_ms)?;
    params.validate()?;

    let events = normalize_events(events);
    let profile = profile.sanitized();
    let simulator = match Simulator::new(&events, &profile, params) {
        Some(simulator) => simulator,
        None => {
            tracing::debug!("No valid drinks, returning baseline sober status");
            return Ok(BacStatus::sober());
        }
    };

    let full_horizon = full_history_horizon(&simulator, params);
    let full: Vec<BacSample> = simulator.samples(full_horizon).collect();
    let summary = extract_peak_and_sober(&full, params.sober_epsilon);

    let horizon_bac = full.last().map_or(0.0, |sample| sample.bac);

    let current_bac = if now_ms > full_horizon {
        bac_past_horizon(&simulator, full_horizon, horizon_bac, now_ms)
    } else {
        simulator.bac_at(now_ms)
    };
    let sober_time_ms = match summary.sober_time_ms {
        Some(sober) => Some(sober),
        None if summary.peak_time_ms.is_some() => {
            projected_sober_time(&simulator, params, full_horizon, horizon_bac)
        }
        None => None,
    };
    let stage = BacStage::classify(current_bac);

    tracing::debug!(
        "BAC status at {}: current {:.4}, peak {:.4}, stage {}",
        now_ms,
        current_bac,
        summary.peak_bac,
        stage
    );

    Ok(BacStatus {
        current_bac,
        peak_bac: summary.peak_bac,
        peak_time_ms: summary.peak_time_ms,
        sober_time_ms,
        stage,
        color_token: stage.color_token().to_string(),
    })
}

/// Carry the curve past the simulated horizon as plain zero-order decay
fn bac_past_horizon(simulator: &Simulator, horizon_ms: i64, horizon_bac: f64, now_ms: i64) -> f64 {
    let absorbed = horizon_bac + simulator.absorbed_increment(horizon_ms, now_ms);
    let eliminating_from = horizon_ms.max(simulator.elimination_start_ms());
    eliminate(
        absorbed,
        elimination_over(simulator.rate_per_hour(), now_ms - eliminating_from),
    )
}

/// First step-grid time after the horizon at which linear decay reaches epsilon
fn projected_sober_time(
    simulator: &Simulator,
    params: &SimulationParams,
    horizon_ms: i64,
    horizon_bac: f64,
) -> Option<i64> {
    let step_ms = params.step_ms();
    let per_step = elimination_over(simulator.rate_per_hour(), step_ms);
    if per_step <= 0.0 || horizon_bac <= params.sober_epsilon {
        return None;
    }

    let steps = ((horizon_bac - params.sober_epsilon) / per_step).ceil() as i64;
    Some(horizon_ms.saturating_add(steps.saturating_mul(step_ms)))
}

/// The simulated BAC curve from the first drink up to `horizon_ms`
///
/// `horizon_ms` is an absolute timestamp. No valid drinks, or a horizon
/// before the first drink, gives an empty series.
pub fn compute_bac_series(
    events: &[DrinkEvent],
    profile: &Profile,
    horizon_ms: i64,
) -> Result<Vec<BacSample>> {
    compute_bac_series_with(&SimulationParams::default(), events, profile, horizon_ms)
}

/// [`compute_bac_series`] with explicit simulation parameters
pub fn compute_bac_series_with(
    params: &SimulationParams,
    events: &[DrinkEvent],
    profile: &Profile,
    horizon_ms: i64,
) -> Result<Vec<BacSample>> {
    require_non_negative("horizon_ms", horizon_ms)?;
    params.validate()?;

    let events = normalize_events(events);
    let profile = profile.sanitized();
    Ok(match Simulator::new(&events, &profile, params) {
        Some(simulator) => simulator.samples(horizon_ms).collect(),
        None => Vec::new(),
    })
}

/// Last drink plus the live margin: where full-history analytics stop
pub fn default_horizon(events: &[DrinkEvent], params: &SimulationParams) -> Option<i64> {
    normalize_events(events)
        .last()
        .map(|last| last.timestamp_ms.saturating_add(params.live_margin_ms()))
}

fn full_history_horizon(simulator: &Simulator, params: &SimulationParams) -> i64 {
    simulator
        .last_event_ms()
        .saturating_add(params.live_margin_ms())
}

/// Status for whatever is known about a peer
pub fn resolve_peer_status(snapshot: &PeerSnapshot, now_ms: i64) -> Result<BacStatus> {
    resolve_peer_status_with(&SimulationParams::default(), snapshot, now_ms)
}

/// [`resolve_peer_status`] with explicit simulation parameters
pub fn resolve_peer_status_with(
    params: &SimulationParams,
    snapshot: &PeerSnapshot,
    now_ms: i64,
) -> Result<BacStatus> {
    match snapshot {
        PeerSnapshot::Full { events, profile } => {
            compute_bac_status_with(params, events, profile, now_ms)
        }
        PeerSnapshot::LastKnown {
            bac,
            last_update_ms,
            habit_level,
        } => approximate_decay(*bac, *last_update_ms, *habit_level, now_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elimination::metabolism_rate_per_hour;
    use crate::{Pace, HOUR_MS, MINUTE_MS};

    /// Roughly the evening of 2024-06-01 in epoch ms
    const T0: i64 = 1_717_264_800_000;

    fn profile_80kg_male() -> Profile {
        Profile {
            weight_kg: 80.0,
            ..Profile::default()
        }
    }

    fn beer(id: &str, at: i64) -> DrinkEvent {
        DrinkEvent::new(id, at, 330.0, 5.0)
    }

    #[test]
    fn test_empty_list_is_sober_at_any_time() {
        for now in [0, T0, T0 + 100 * HOUR_MS] {
            let status = compute_bac_status(&[], &Profile::default(), now).unwrap();
            assert_eq!(status.current_bac, 0.0);
            assert_eq!(status.peak_bac, 0.0);
            assert_eq!(status.peak_time_ms, None);
            assert_eq!(status.sober_time_ms, None);
            assert_eq!(status.stage, BacStage::Sober);
        }
    }

    #[test]
    fn test_only_malformed_drinks_is_sober() {
        let mut broken = beer("x", T0);
        broken.volume_ml = -10.0;
        let status = compute_bac_status(&[broken], &Profile::default(), T0 + HOUR_MS).unwrap();
        assert_eq!(status, BacStatus::sober());
    }

    #[test]
    fn test_single_beer_scenario() {
        let profile = profile_80kg_male();
        let status = compute_bac_status(&[beer("b", T0)], &profile, T0 + 2 * HOUR_MS).unwrap();

        assert!(
            (0.015..=0.030).contains(&status.peak_bac),
            "peak {} out of range",
            status.peak_bac
        );
        let peak_time = status.peak_time_ms.unwrap();
        let minutes_to_peak = (peak_time - T0) / MINUTE_MS;
        assert!(
            (45..=60).contains(&minutes_to_peak),
            "peak after {} minutes",
            minutes_to_peak
        );

        let sober_time = status.sober_time_ms.unwrap();
        assert!(sober_time > peak_time);
        assert!(sober_time - T0 >= 2 * HOUR_MS);
    }

    #[test]
    fn test_chug_peaks_earlier_with_same_magnitude() {
        let profile = profile_80kg_male();
        let now = T0 + 3 * HOUR_MS;
        let sipped = compute_bac_status(&[beer("s", T0)], &profile, now).unwrap();
        let chugged = compute_bac_status(&[beer("c", T0).chugged()], &profile, now).unwrap();

        assert!(chugged.peak_time_ms.unwrap() < sipped.peak_time_ms.unwrap());
        let relative = (chugged.peak_bac - sipped.peak_bac).abs() / sipped.peak_bac;
        assert!(relative < 0.05, "peaks differ by {:.1}%", relative * 100.0);
    }

    #[test]
    fn test_status_is_deterministic() {
        let events = vec![beer("a", T0), beer("b", T0 + 20 * MINUTE_MS).chugged()];
        let profile = profile_80kg_male();
        let first = compute_bac_status(&events, &profile, T0 + 90 * MINUTE_MS).unwrap();
        let second = compute_bac_status(&events, &profile, T0 + 90 * MINUTE_MS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let profile = profile_80kg_male();
        let ordered = vec![beer("a", T0), beer("b", T0 + HOUR_MS)];
        let shuffled = vec![beer("b", T0 + HOUR_MS), beer("a", T0)];
        assert_eq!(
            compute_bac_status(&ordered, &profile, T0 + 2 * HOUR_MS).unwrap(),
            compute_bac_status(&shuffled, &profile, T0 + 2 * HOUR_MS).unwrap()
        );
    }

    #[test]
    fn test_non_negative_far_past_and_future() {
        let events = vec![beer("a", T0), beer("b", T0 + 30 * MINUTE_MS)];
        let profile = profile_80kg_male();

        let before = compute_bac_status(&events, &profile, T0 - 10 * HOUR_MS).unwrap();
        assert_eq!(before.current_bac, 0.0);

        let after = compute_bac_status(&events, &profile, T0 + 1_000 * HOUR_MS).unwrap();
        assert_eq!(after.current_bac, 0.0);
        assert_eq!(after.stage, BacStage::Sober);

        for minutes in (0..600).step_by(7) {
            let status = compute_bac_status(&events, &profile, T0 + minutes * MINUTE_MS).unwrap();
            assert!(status.current_bac >= 0.0);
        }
    }

    #[test]
    fn test_heavy_session_sobers_up_past_horizon() {
        // Still well above zero a day after the last drink
        let events: Vec<_> = (0..14)
            .map(|i| beer(&format!("b{}", i), T0 + i * 30 * MINUTE_MS))
            .collect();
        let profile = Profile {
            weight_kg: 60.0,
            gender: crate::Gender::Female,
            habit_level: Pace::Slow,
            ..Profile::default()
        };
        let horizon = T0 + 13 * 30 * MINUTE_MS + 24 * HOUR_MS;
        let at_horizon = compute_bac_status(&events, &profile, horizon).unwrap();
        assert!(at_horizon.current_bac > 0.1);

        let hour_later = compute_bac_status(&events, &profile, horizon + HOUR_MS).unwrap();
        assert!((at_horizon.current_bac - hour_later.current_bac - 0.010).abs() < 1e-9);

        let far = compute_bac_status(&events, &profile, T0 + 1_000 * HOUR_MS).unwrap();
        assert_eq!(far.current_bac, 0.0);
        assert_eq!(far.stage, BacStage::Sober);

        let sober = far.sober_time_ms.unwrap();
        assert!(sober > horizon);
        assert!(sober < T0 + 1_000 * HOUR_MS);
        assert_eq!((sober - horizon) % (15 * MINUTE_MS), 0);
        assert_eq!(at_horizon.sober_time_ms, Some(sober));
    }

    #[test]
    fn test_long_session_is_metabolised_throughout() {
        // A beer every 45 minutes for six hours
        let events: Vec<_> = (0..9)
            .map(|i| beer(&format!("b{}", i), T0 + i * 45 * MINUTE_MS))
            .collect();
        let profile = profile_80kg_male();
        let last_window_end = T0 + 8 * 45 * MINUTE_MS + HOUR_MS;

        let one_beer = compute_bac_status(&events[..1], &profile, T0 + HOUR_MS).unwrap();
        let total_potential = one_beer.peak_bac * 9.0;
        let status = compute_bac_status(&events, &profile, last_window_end).unwrap();

        let eliminated = elimination_over(metabolism_rate_per_hour(Pace::Average), 6 * HOUR_MS);
        assert!(status.current_bac < total_potential);
        assert!((status.current_bac - (total_potential - eliminated)).abs() < 1e-9);
    }

    #[test]
    fn test_negative_time_is_rejected() {
        assert!(matches!(
            compute_bac_status(&[], &Profile::default(), -1),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            compute_bac_series(&[beer("a", T0)], &Profile::default(), -5),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_series_matches_status() {
        let events = vec![beer("a", T0), beer("b", T0 + 40 * MINUTE_MS)];
        let profile = profile_80kg_male();
        let now = T0 + 2 * HOUR_MS;

        let series = compute_bac_series(&events, &profile, now).unwrap();
        let status = compute_bac_status(&events, &profile, now).unwrap();
        assert_eq!(series.last().unwrap().time_ms, now);
        assert_eq!(series.last().unwrap().bac, status.current_bac);
    }

    #[test]
    fn test_series_before_first_drink_is_empty() {
        let series = compute_bac_series(&[beer("a", T0)], &Profile::default(), T0 - 1).unwrap();
        assert!(series.is_empty());
        assert!(compute_bac_series(&[], &Profile::default(), T0).unwrap().is_empty());
    }

    #[test]
    fn test_decay_approximation_converges_with_simulator() {
        let events: Vec<_> = (0..4).map(|i| beer(&format!("b{}", i), T0)).collect();
        let profile = profile_80kg_male();
        let known_at = T0 + 2 * HOUR_MS;

        let known = compute_bac_status(&events, &profile, known_at).unwrap();
        assert!(known.current_bac > 0.0);

        let later = known_at + 10 * MINUTE_MS;
        let simulated = compute_bac_status(&events, &profile, later).unwrap();
        let approximated =
            approximate_decay(known.current_bac, known_at, profile.habit_level, later).unwrap();

        let one_step = elimination_over(metabolism_rate_per_hour(Pace::Average), 15 * MINUTE_MS);
        assert!((simulated.current_bac - approximated.current_bac).abs() <= one_step);
    }

    #[test]
    fn test_peer_dispatch() {
        let full = PeerSnapshot::Full {
            events: vec![beer("a", T0)],
            profile: profile_80kg_male(),
        };
        let status = resolve_peer_status(&full, T0 + HOUR_MS).unwrap();
        assert!(status.current_bac > 0.0);
        assert!(status.peak_time_ms.is_some());

        let cached = PeerSnapshot::LastKnown {
            bac: 0.1,
            last_update_ms: T0,
            habit_level: Pace::Average,
        };
        let status = resolve_peer_status(&cached, T0 + HOUR_MS).unwrap();
        assert!((status.current_bac - 0.085).abs() < 1e-12);
        assert_eq!(status.peak_time_ms, None);
    }

    #[test]
    fn test_heavier_and_faster_metabolism_lower_bac() {
        let events = vec![beer("a", T0), beer("b", T0 + 15 * MINUTE_MS)];
        let now = T0 + 3 * HOUR_MS;
        let base = compute_bac_status(&events, &profile_80kg_male(), now).unwrap();

        let heavier = Profile {
            weight_kg: 110.0,
            ..profile_80kg_male()
        };
        let fast_habit = Profile {
            habit_level: Pace::Fast,
            ..profile_80kg_male()
        };
        assert!(compute_bac_status(&events, &heavier, now).unwrap().peak_bac < base.peak_bac);
        assert!(compute_bac_status(&events, &fast_habit, now).unwrap().current_bac < base.current_bac);
    }
}
