//! Core domain types for the BAC engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Drink events, both the strict engine form and the lenient on-disk form
//! - The physiological profile and its enumerations
//! - Simulation output (samples and the status snapshot)
//! - Peer snapshots for the full-history / last-known dispatch

use crate::stage::BacStage;
use serde::{Deserialize, Serialize};

/// Milliseconds in one minute
pub const MINUTE_MS: i64 = 60 * 1000;

/// Milliseconds in one hour
pub const HOUR_MS: i64 = 60 * MINUTE_MS;

// ============================================================================
// Drink Events
// ============================================================================

/// A single logged drink, as consumed by the engine
///
/// Events are immutable once logged. Validity (`volume_ml > 0`, ABV inside
/// `[0, 100]`) is enforced by the normalizer rather than by construction so
/// that a corrupt record can be dropped without failing the whole list.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrinkEvent {
    pub id: String,
    pub timestamp_ms: i64,
    pub volume_ml: f64,
    pub abv_percent: f64,
    #[serde(default)]
    pub is_chug: bool,
}

impl DrinkEvent {
    /// Create a sipped (non-chug) drink
    pub fn new(id: impl Into<String>, timestamp_ms: i64, volume_ml: f64, abv_percent: f64) -> Self {
        Self {
            id: id.into(),
            timestamp_ms,
            volume_ml,
            abv_percent,
            is_chug: false,
        }
    }

    /// Create a sipped drink with a fresh random id
    pub fn logged(timestamp_ms: i64, volume_ml: f64, abv_percent: f64) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), timestamp_ms, volume_ml, abv_percent)
    }

    /// Mark this drink as chugged
    pub fn chugged(mut self) -> Self {
        self.is_chug = true;
        self
    }
}

/// Lenient drink record as it appears in stored documents
///
/// Every field may be missing and the timestamp may be fractional or
/// non-finite. Conversion into [`DrinkEvent`] happens in the normalizer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawDrinkEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp_ms: Option<f64>,
    #[serde(default)]
    pub volume_ml: Option<f64>,
    #[serde(default)]
    pub abv_percent: Option<f64>,
    #[serde(default)]
    pub is_chug: bool,
}

// ============================================================================
// Profile
// ============================================================================

/// Biological sex used to pick the Widmark distribution ratio
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

/// Three-level setting shared by drinking speed and drinking habit
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Slow,
    #[default]
    Average,
    Fast,
}

/// Language for stage messages
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    De,
}

/// Physiological profile governing one user's simulation
///
/// Missing fields in stored documents fall back to the documented defaults.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default = "default_weight_kg")]
    pub weight_kg: f64,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub drinking_speed: Pace,
    /// Drives the elimination rate
    #[serde(default)]
    pub habit_level: Pace,
    #[serde(default)]
    pub language: Language,
}

/// Default body weight when the profile has none
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

fn default_weight_kg() -> f64 {
    DEFAULT_WEIGHT_KG
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            weight_kg: DEFAULT_WEIGHT_KG,
            gender: Gender::default(),
            drinking_speed: Pace::default(),
            habit_level: Pace::default(),
            language: Language::default(),
        }
    }
}

impl Profile {
    /// Return a copy with unusable values replaced by defaults
    pub fn sanitized(&self) -> Self {
        let mut profile = self.clone();
        if !profile.weight_kg.is_finite() || profile.weight_kg <= 0.0 {
            tracing::warn!(
                "Profile weight {} is unusable, falling back to {} kg",
                profile.weight_kg,
                DEFAULT_WEIGHT_KG
            );
            profile.weight_kg = DEFAULT_WEIGHT_KG;
        }
        profile
    }
}

// ============================================================================
// Simulation Output
// ============================================================================

/// One point of a simulated BAC curve
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct BacSample {
    pub time_ms: i64,
    pub bac: f64,
}

/// Snapshot of a user's intoxication state at one instant
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BacStatus {
    pub current_bac: f64,
    pub peak_bac: f64,
    pub peak_time_ms: Option<i64>,
    pub sober_time_ms: Option<i64>,
    pub stage: BacStage,
    pub color_token: String,
}

impl BacStatus {
    /// Baseline status for a user with no (valid) drinks
    pub fn sober() -> Self {
        Self {
            current_bac: 0.0,
            peak_bac: 0.0,
            peak_time_ms: None,
            sober_time_ms: None,
            stage: BacStage::Sober,
            color_token: BacStage::Sober.color_token().to_string(),
        }
    }

    /// Localized message for the current stage
    pub fn message(&self, language: Language) -> &'static str {
        self.stage.message(language)
    }
}

// ============================================================================
// Peer Snapshots
// ============================================================================

/// What a consumer knows about a user at evaluation time
///
/// The full variant goes through the stepped simulator; the last-known
/// variant goes through the closed-form decay approximation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerSnapshot {
    /// Raw drink history is available
    Full {
        events: Vec<DrinkEvent>,
        profile: Profile,
    },
    /// Only the last published BAC value is available
    LastKnown {
        bac: f64,
        last_update_ms: i64,
        #[serde(default)]
        habit_level: Pace,
    },
}
