//! Absorption model: one drink becomes a time-bounded input rate.
//!
//! Each drink's Widmark potential BAC enters the blood at a constant rate
//! over its absorption window (consumption time plus a fixed delay).

use crate::{DrinkEvent, Gender, Pace, Profile, MINUTE_MS};

/// Density of ethanol in g/ml
pub const ETHANOL_DENSITY_G_PER_ML: f64 = 0.789;

/// Default delay between finishing a drink and full absorption
pub const DEFAULT_ABSORPTION_DELAY_MINUTES: u32 = 45;

/// Widmark distribution ratio `r`
///
/// This is the single canonical table for the whole engine.
pub fn distribution_ratio(gender: Gender) -> f64 {
    match gender {
        Gender::Male => 0.68,
        Gender::Female => 0.55,
    }
}

/// Time spent drinking, before the absorption delay starts counting
pub fn consumption_ms(speed: Pace, is_chug: bool) -> i64 {
    if is_chug {
        return 0;
    }
    let minutes = match speed {
        Pace::Slow => 20,
        Pace::Average => 15,
        Pace::Fast => 10,
    };
    minutes * MINUTE_MS
}

/// Grams of pure ethanol in a drink
pub fn alcohol_mass_g(event: &DrinkEvent) -> f64 {
    event.volume_ml * (event.abv_percent / 100.0) * ETHANOL_DENSITY_G_PER_ML
}

/// BAC (%) the drink would cause if absorbed instantly with no elimination
pub fn potential_bac(mass_g: f64, profile: &Profile) -> f64 {
    // g/kg divided by 10 gives percent
    (mass_g / (profile.weight_kg * distribution_ratio(profile.gender))) / 10.0
}

/// Interval `[start_ms, end_ms)` during which one drink enters the blood
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbsorptionWindow {
    pub start_ms: i64,
    pub end_ms: i64,
    pub potential_bac: f64,
    pub rate_per_ms: f64,
}

impl AbsorptionWindow {
    /// Build the window for a (valid) drink
    pub fn for_event(event: &DrinkEvent, profile: &Profile, absorption_delay_ms: i64) -> Self {
        let potential = potential_bac(alcohol_mass_g(event), profile);
        let window_ms = consumption_ms(profile.drinking_speed, event.is_chug) + absorption_delay_ms;
        let start_ms = event.timestamp_ms;

        // A zero-length window would divide by zero; absorb in one millisecond instead
        let window_ms = window_ms.max(1);

        Self {
            start_ms,
            end_ms: start_ms.saturating_add(window_ms),
            potential_bac: potential,
            rate_per_ms: potential / window_ms as f64,
        }
    }

    /// Length of the window
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Whether the window intersects `[from_ms, to_ms)`
    pub fn overlaps(&self, from_ms: i64, to_ms: i64) -> bool {
        self.start_ms < to_ms && from_ms < self.end_ms
    }

    /// BAC absorbed from this drink during `[from_ms, to_ms)`
    ///
    /// Uses the exact overlap, so summing over consecutive intervals that
    /// cover the window always yields `potential_bac`.
    pub fn absorbed_between(&self, from_ms: i64, to_ms: i64) -> f64 {
        let overlap = to_ms.min(self.end_ms) - from_ms.max(self.start_ms);
        if overlap <= 0 {
            0.0
        } else {
            self.rate_per_ms * overlap as f64
        }
    }
}
