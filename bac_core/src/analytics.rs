//! History analytics derived from the canonical BAC series.
//!
//! Intoxicated episodes and durations are read off the same samples the
//! live status uses, so the dashboard and the stats view never disagree.

use crate::engine::{compute_bac_series_with, default_horizon};
use crate::normalize::normalize_events;
use crate::peak::extract_peak_and_sober;
use crate::simulator::SimulationParams;
use crate::{BacSample, DrinkEvent, Profile, Result};
use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

/// A maximal stretch of time spent above the sober threshold
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Episode {
    pub start_ms: i64,
    /// First sober sample, or the last sample if the series ends intoxicated
    pub end_ms: i64,
    pub peak_bac: f64,
    pub peak_time_ms: i64,
}

impl Episode {
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Summary of a simulated drinking history
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct SessionStats {
    pub peak_bac: f64,
    pub peak_time_ms: Option<i64>,
    pub episodes: Vec<Episode>,
    pub total_intoxicated_ms: i64,
    pub longest_intoxicated_ms: i64,
}

/// Split a series into intoxicated episodes
pub fn session_stats(samples: &[BacSample], epsilon: f64) -> SessionStats {
    let summary = extract_peak_and_sober(samples, epsilon);
    let mut episodes = Vec::new();
    let mut open: Option<Episode> = None;

    for sample in samples {
        if sample.bac > epsilon {
            if let Some(episode) = open.as_mut() {
                episode.end_ms = sample.time_ms;
                if sample.bac > episode.peak_bac {
                    episode.peak_bac = sample.bac;
                    episode.peak_time_ms = sample.time_ms;
                }
            } else {
                open = Some(Episode {
                    start_ms: sample.time_ms,
                    end_ms: sample.time_ms,
                    peak_bac: sample.bac,
                    peak_time_ms: sample.time_ms,
                });
            }
        } else if let Some(mut episode) = open.take() {
            episode.end_ms = sample.time_ms;
            episodes.push(episode);
        }
    }
    episodes.extend(open);

    let total_intoxicated_ms = episodes.iter().map(Episode::duration_ms).sum();
    let longest_intoxicated_ms = episodes
        .iter()
        .map(Episode::duration_ms)
        .max()
        .unwrap_or(0);

    SessionStats {
        peak_bac: summary.peak_bac,
        peak_time_ms: summary.peak_time_ms,
        episodes,
        total_intoxicated_ms,
        longest_intoxicated_ms,
    }
}

/// Session stats over a user's whole history (to last drink + margin)
pub fn compute_session_stats(
    params: &SimulationParams,
    events: &[DrinkEvent],
    profile: &Profile,
) -> Result<SessionStats> {
    let horizon = match default_horizon(events, params) {
        Some(horizon) => horizon,
        None => return Ok(SessionStats::default()),
    };
    let series = compute_bac_series_with(params, events, profile, horizon)?;
    Ok(session_stats(&series, params.sober_epsilon))
}

/// Consecutive-day drinking streaks
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct StreakStats {
    pub drinking_days: usize,
    pub longest_streak_days: u32,
    /// Streak ending today, or yesterday if nothing has been logged today yet
    pub current_streak_days: u32,
}

/// Count drinking streaks over UTC calendar days
pub fn drinking_streaks(events: &[DrinkEvent], today: NaiveDate) -> StreakStats {
    let days: BTreeSet<NaiveDate> = normalize_events(events)
        .iter()
        .filter_map(|event| DateTime::from_timestamp_millis(event.timestamp_ms))
        .map(|at| at.date_naive())
        .filter(|day| *day <= today)
        .collect();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in &days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }

    let anchor = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt().filter(|yesterday| days.contains(yesterday))
    };

    let mut current = 0u32;
    let mut cursor = anchor;
    while let Some(day) = cursor.filter(|day| days.contains(day)) {
        current += 1;
        cursor = day.pred_opt();
    }

    StreakStats {
        drinking_days: days.len(),
        longest_streak_days: longest,
        current_streak_days: current,
    }
}
