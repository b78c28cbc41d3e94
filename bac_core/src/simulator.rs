//! Fixed-step BAC integrator.
//!
//! Starting at the earliest drink with BAC 0, every step first adds the
//! alcohol absorbed from all drinks whose window overlaps the step, then
//! subtracts the step's elimination and floors at zero. That order is fixed:
//! every consumer of the engine goes through this one integrator.

use crate::absorption::{AbsorptionWindow, DEFAULT_ABSORPTION_DELAY_MINUTES};
use crate::elimination::{eliminate, elimination_over, metabolism_rate_per_hour, EliminationOnset};
use crate::{BacSample, DrinkEvent, Error, Profile, Result, HOUR_MS, MINUTE_MS};
use serde::{Deserialize, Serialize};

/// Tunable constants of the simulation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationParams {
    #[serde(default = "default_step_minutes")]
    pub step_minutes: u32,

    #[serde(default = "default_absorption_delay_minutes")]
    pub absorption_delay_minutes: u32,

    /// BAC at or below this counts as sober when looking for the sober time
    #[serde(default = "default_sober_epsilon")]
    pub sober_epsilon: f64,

    /// How far past the last drink the simulation runs
    #[serde(default = "default_live_margin_hours")]
    pub live_margin_hours: u32,

    /// When metabolism starts relative to the first drink's absorption
    #[serde(default)]
    pub elimination_onset: EliminationOnset,
}

fn default_step_minutes() -> u32 {
    15
}

fn default_absorption_delay_minutes() -> u32 {
    DEFAULT_ABSORPTION_DELAY_MINUTES
}

fn default_sober_epsilon() -> f64 {
    0.0005
}

fn default_live_margin_hours() -> u32 {
    24
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            step_minutes: default_step_minutes(),
            absorption_delay_minutes: default_absorption_delay_minutes(),
            sober_epsilon: default_sober_epsilon(),
            live_margin_hours: default_live_margin_hours(),
            elimination_onset: EliminationOnset::default(),
        }
    }
}

impl SimulationParams {
    pub fn step_ms(&self) -> i64 {
        i64::from(self.step_minutes) * MINUTE_MS
    }

    pub fn absorption_delay_ms(&self) -> i64 {
        i64::from(self.absorption_delay_minutes) * MINUTE_MS
    }

    pub fn live_margin_ms(&self) -> i64 {
        i64::from(self.live_margin_hours) * HOUR_MS
    }

    /// Reject parameter sets the integrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.step_minutes == 0 {
            return Err(Error::Config("step_minutes must be positive".into()));
        }
        if self.live_margin_hours == 0 {
            return Err(Error::Config("live_margin_hours must be positive".into()));
        }
        if !(self.sober_epsilon.is_finite() && self.sober_epsilon >= 0.0) {
            return Err(Error::Config(format!(
                "sober_epsilon must be a non-negative number, got {}",
                self.sober_epsilon
            )));
        }
        Ok(())
    }
}

/// Integrator over one user's normalized drink list
#[derive(Clone, Debug)]
pub struct Simulator {
    windows: Vec<AbsorptionWindow>,
    start_ms: i64,
    last_event_ms: i64,
    rate_per_hour: f64,
    step_ms: i64,
    elimination_start_ms: i64,
}

impl Simulator {
    /// Build a simulator, or `None` when there is nothing to simulate
    ///
    /// `events` must already be normalized (valid and sorted).
    pub fn new(events: &[DrinkEvent], profile: &Profile, params: &SimulationParams) -> Option<Self> {
        let first = events.first()?;
        let last = events.last()?;
        let delay_ms = params.absorption_delay_ms();

        let windows: Vec<AbsorptionWindow> = events
            .iter()
            .map(|event| AbsorptionWindow::for_event(event, profile, delay_ms))
            .collect();

        let elimination_start_ms = match params.elimination_onset {
            EliminationOnset::Concurrent => first.timestamp_ms,
            EliminationOnset::AfterAbsorption => windows
                .first()
                .map_or(first.timestamp_ms, |window| window.end_ms),
        };

        Some(Self {
            windows,
            start_ms: first.timestamp_ms,
            last_event_ms: last.timestamp_ms,
            rate_per_hour: metabolism_rate_per_hour(profile.habit_level),
            step_ms: params.step_ms().max(1),
            elimination_start_ms,
        })
    }

    /// Time of the earliest drink, where the series starts
    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    /// Time of the latest drink
    pub fn last_event_ms(&self) -> i64 {
        self.last_event_ms
    }

    /// Elimination rate in %/hour
    pub fn rate_per_hour(&self) -> f64 {
        self.rate_per_hour
    }

    /// Sum of all drinks' absorption during `[from_ms, to_ms)`
    pub fn absorbed_increment(&self, from_ms: i64, to_ms: i64) -> f64 {
        self.windows
            .iter()
            .map(|window| window.absorbed_between(from_ms, to_ms))
            .sum()
    }

    /// When metabolism starts acting on the absorbed alcohol
    pub fn elimination_start_ms(&self) -> i64 {
        self.elimination_start_ms
    }

    /// Advance `bac` across one step `[from_ms, to_ms)`
    ///
    /// Absorption is added first, then elimination for the part of the step
    /// at or after the elimination start.
    pub fn step(&self, bac: f64, from_ms: i64, to_ms: i64) -> f64 {
        let absorbed = bac + self.absorbed_increment(from_ms, to_ms);

        let eliminating_from = from_ms.max(self.elimination_start_ms);
        if to_ms > eliminating_from {
            eliminate(absorbed, elimination_over(self.rate_per_hour, to_ms - eliminating_from))
        } else {
            absorbed
        }
    }

    /// Lazily produce samples from the first drink up to `horizon_ms`
    ///
    /// The final step is shortened so the last sample lands exactly on the
    /// horizon. A horizon before the first drink yields nothing.
    pub fn samples(&self, horizon_ms: i64) -> BacSeries<'_> {
        BacSeries {
            simulator: self,
            time_ms: self.start_ms,
            bac: 0.0,
            horizon_ms,
            started: false,
        }
    }

    /// BAC at a single instant
    pub fn bac_at(&self, time_ms: i64) -> f64 {
        self.samples(time_ms)
            .last()
            .map(|sample| sample.bac)
            .unwrap_or(0.0)
    }
}

/// Iterator over a simulated BAC curve
#[derive(Clone, Debug)]
pub struct BacSeries<'a> {
    simulator: &'a Simulator,
    time_ms: i64,
    bac: f64,
    horizon_ms: i64,
    started: bool,
}

impl Iterator for BacSeries<'_> {
    type Item = BacSample;

    fn next(&mut self) -> Option<BacSample> {
        if self.horizon_ms < self.simulator.start_ms {
            return None;
        }

        if !self.started {
            self.started = true;
            return Some(BacSample {
                time_ms: self.time_ms,
                bac: self.bac,
            });
        }

        if self.time_ms >= self.horizon_ms {
            return None;
        }

        let end_ms = self
            .time_ms
            .saturating_add(self.simulator.step_ms)
            .min(self.horizon_ms);
        self.bac = self.simulator.step(self.bac, self.time_ms, end_ms);
        self.time_ms = end_ms;

        Some(BacSample {
            time_ms: self.time_ms,
            bac: self.bac,
        })
    }
}
