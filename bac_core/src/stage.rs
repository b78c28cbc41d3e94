//! Status classification: BAC value to named stage.
//!
//! Stages are ordered by severity and each has a strictly higher lower bound
//! than the one before it, so classification is monotonic in BAC.

use crate::Language;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Named intoxication stage, ordered from least to most severe
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BacStage {
    Sober,
    Buzzy,
    Tipsy,
    Loaded,
    Drunk,
    Blackout,
}

impl BacStage {
    /// All stages in order of severity
    pub const ALL: [BacStage; 6] = [
        BacStage::Sober,
        BacStage::Buzzy,
        BacStage::Tipsy,
        BacStage::Loaded,
        BacStage::Drunk,
        BacStage::Blackout,
    ];

    /// Position in the severity order, starting at 0 for sober
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Lowest BAC (%) that falls into this stage
    pub fn lower_bound(self) -> f64 {
        match self {
            BacStage::Sober => 0.0,
            BacStage::Buzzy => 0.02,
            BacStage::Tipsy => 0.05,
            BacStage::Loaded => 0.08,
            BacStage::Drunk => 0.15,
            BacStage::Blackout => 0.25,
        }
    }

    /// Display gradient token
    pub fn color_token(self) -> &'static str {
        match self {
            BacStage::Sober => "gradient-green",
            BacStage::Buzzy => "gradient-lime",
            BacStage::Tipsy => "gradient-yellow",
            BacStage::Loaded => "gradient-orange",
            BacStage::Drunk => "gradient-red",
            BacStage::Blackout => "gradient-purple",
        }
    }

    /// Localized message for this stage
    pub fn message(self, language: Language) -> &'static str {
        MESSAGES
            .get(&(language, self))
            .or_else(|| MESSAGES.get(&(Language::En, self)))
            .copied()
            .unwrap_or("")
    }

    /// Classify a BAC value
    ///
    /// Anything that is not at least the buzzy bound (including NaN) is sober.
    pub fn classify(bac: f64) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|stage| bac >= stage.lower_bound())
            .unwrap_or(BacStage::Sober)
    }
}

impl fmt::Display for BacStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BacStage::Sober => "sober",
            BacStage::Buzzy => "buzzy",
            BacStage::Tipsy => "tipsy",
            BacStage::Loaded => "loaded",
            BacStage::Drunk => "drunk",
            BacStage::Blackout => "blackout",
        };
        write!(f, "{}", label)
    }
}

static MESSAGES: Lazy<HashMap<(Language, BacStage), &'static str>> = Lazy::new(|| {
    use BacStage::*;
    use Language::*;

    HashMap::from([
        ((En, Sober), "You're sober."),
        ((En, Buzzy), "Feeling a light buzz."),
        ((En, Tipsy), "You're tipsy. Slow down."),
        ((En, Loaded), "Over the driving limit. Switch to water."),
        ((En, Drunk), "You're drunk. Stop drinking now."),
        ((En, Blackout), "Dangerous level. Get a friend to look after you."),
        ((De, Sober), "Du bist nüchtern."),
        ((De, Buzzy), "Ein leichter Schwips."),
        ((De, Tipsy), "Du bist angeheitert. Mach langsamer."),
        ((De, Loaded), "Über der Promillegrenze. Wechsel zu Wasser."),
        ((De, Drunk), "Du bist betrunken. Hör jetzt auf zu trinken."),
        ((De, Blackout), "Gefährlicher Wert. Lass dir von Freunden helfen."),
    ])
});

/// Classify a BAC value (free-function form of [`BacStage::classify`])
pub fn classify(bac: f64) -> BacStage {
    BacStage::classify(bac)
}

/// Whether moving from `previous` to `next` warrants a "getting drunker" alert
///
/// Only strict increases in severity qualify; falling BAC never alerts.
pub fn should_notify(previous: BacStage, next: BacStage) -> bool {
    next.ordinal() > previous.ordinal()
}

/// A change of stage between two consecutive evaluations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTransition {
    pub from: BacStage,
    pub to: BacStage,
}

/// Remembers the last observed stage and reports escalations
#[derive(Clone, Debug, Default)]
pub struct StageTracker {
    last: Option<BacStage>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last stage seen, if any
    pub fn last(&self) -> Option<BacStage> {
        self.last
    }

    /// Record a new stage; returns the transition if it is an escalation
    pub fn observe(&mut self, stage: BacStage) -> Option<StageTransition> {
        let previous = self.last.replace(stage)?;
        if should_notify(previous, stage) {
            Some(StageTransition {
                from: previous,
                to: stage,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_strictly_increase() {
        for pair in BacStage::ALL.windows(2) {
            assert!(pair[0].lower_bound() < pair[1].lower_bound());
            assert!(pair[0].ordinal() < pair[1].ordinal());
        }
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0.0), BacStage::Sober);
        assert_eq!(classify(0.0199), BacStage::Sober);
        assert_eq!(classify(0.02), BacStage::Buzzy);
        assert_eq!(classify(0.06), BacStage::Tipsy);
        assert_eq!(classify(0.08), BacStage::Loaded);
        assert_eq!(classify(0.2), BacStage::Drunk);
        assert_eq!(classify(0.4), BacStage::Blackout);
        assert_eq!(classify(f64::NAN), BacStage::Sober);
    }

    #[test]
    fn test_rise_and_fall_is_monotonic() {
        let rising: Vec<f64> = (0..=60).map(|i| i as f64 * 0.005).collect();
        let falling: Vec<f64> = rising.iter().rev().copied().collect();

        let up: Vec<BacStage> = rising.iter().map(|&b| classify(b)).collect();
        let down: Vec<BacStage> = falling.iter().map(|&b| classify(b)).collect();

        for pair in up.windows(2) {
            assert!(pair[1] >= pair[0]);
            // No stage is skipped on a fine-grained rise
            assert!(pair[1].ordinal() - pair[0].ordinal() <= 1);
        }
        for pair in down.windows(2) {
            assert!(pair[1] <= pair[0]);
        }

        let mut visited = up.clone();
        visited.dedup();
        assert_eq!(visited, BacStage::ALL.to_vec());
    }

    #[test]
    fn test_notify_only_on_increase() {
        assert!(should_notify(BacStage::Sober, BacStage::Buzzy));
        assert!(!should_notify(BacStage::Drunk, BacStage::Tipsy));
        assert!(!should_notify(BacStage::Tipsy, BacStage::Tipsy));
    }

    #[test]
    fn test_tracker_reports_escalations() {
        let mut tracker = StageTracker::new();
        assert_eq!(tracker.observe(BacStage::Buzzy), None);
        assert_eq!(
            tracker.observe(BacStage::Tipsy),
            Some(StageTransition {
                from: BacStage::Buzzy,
                to: BacStage::Tipsy
            })
        );
        assert_eq!(tracker.observe(BacStage::Buzzy), None);
        assert_eq!(tracker.observe(BacStage::Buzzy), None);
        assert!(tracker.observe(BacStage::Drunk).is_some());
        assert_eq!(tracker.last(), Some(BacStage::Drunk));
    }

    #[test]
    fn test_messages_localized() {
        assert_eq!(BacStage::Sober.message(Language::En), "You're sober.");
        assert_eq!(BacStage::Sober.message(Language::De), "Du bist nüchtern.");
        for stage in BacStage::ALL {
            assert!(!stage.message(Language::De).is_empty());
        }
    }
}
