//! Drink event normalization.
//!
//! Turns an arbitrary list of drink records into the sorted, valid list the
//! simulator expects. Corrupt records are dropped and logged, never raised.

use crate::{DrinkEvent, Error, RawDrinkEvent, Result};

/// Reason a drink was refused by the normalizer
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("volume {0} ml is not positive")]
    NonPositiveVolume(f64),

    #[error("ABV {0}% is outside [0, 100]")]
    AbvOutOfRange(f64),

    #[error("timestamp {0} ms is negative")]
    NegativeTimestamp(i64),
}

/// Check a single drink against the engine's invariants
pub fn validate_event(event: &DrinkEvent) -> std::result::Result<(), Rejection> {
    // Written so NaN fails every comparison and gets rejected
    if !(event.volume_ml > 0.0 && event.volume_ml.is_finite()) {
        return Err(Rejection::NonPositiveVolume(event.volume_ml));
    }
    if !(0.0..=100.0).contains(&event.abv_percent) {
        return Err(Rejection::AbvOutOfRange(event.abv_percent));
    }
    if event.timestamp_ms < 0 {
        return Err(Rejection::NegativeTimestamp(event.timestamp_ms));
    }
    Ok(())
}

/// Drop invalid drinks and sort the rest chronologically
///
/// Sorting is stable, so drinks sharing a timestamp keep their input order.
pub fn normalize_events(events: &[DrinkEvent]) -> Vec<DrinkEvent> {
    let mut valid: Vec<DrinkEvent> = events
        .iter()
        .filter(|event| match validate_event(event) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!("Dropping drink {}: {}", event.id, reason);
                false
            }
        })
        .cloned()
        .collect();

    valid.sort_by_key(|event| event.timestamp_ms);

    if valid.len() != events.len() {
        tracing::debug!(
            "Normalized {} drinks down to {} valid",
            events.len(),
            valid.len()
        );
    }

    valid
}

impl TryFrom<RawDrinkEvent> for DrinkEvent {
    type Error = Error;

    fn try_from(raw: RawDrinkEvent) -> Result<Self> {
        let id = raw
            .id
            .ok_or_else(|| Error::Other("drink record has no id".into()))?;

        let timestamp = raw
            .timestamp_ms
            .ok_or_else(|| Error::Other(format!("drink {} has no timestamp", id)))?;
        if !timestamp.is_finite() || timestamp < 0.0 || timestamp > i64::MAX as f64 {
            return Err(Error::Other(format!(
                "drink {} has unusable timestamp {}",
                id, timestamp
            )));
        }

        let volume_ml = raw
            .volume_ml
            .ok_or_else(|| Error::Other(format!("drink {} has no volume", id)))?;
        let abv_percent = raw
            .abv_percent
            .ok_or_else(|| Error::Other(format!("drink {} has no ABV", id)))?;

        let event = DrinkEvent {
            id,
            timestamp_ms: timestamp.round() as i64,
            volume_ml,
            abv_percent,
            is_chug: raw.is_chug,
        };

        validate_event(&event)
            .map_err(|reason| Error::Other(format!("drink {}: {}", event.id, reason)))?;

        Ok(event)
    }
}

/// Convert lenient records, dropping the ones that cannot be used
pub fn normalize_raw(raw: impl IntoIterator<Item = RawDrinkEvent>) -> Vec<DrinkEvent> {
    let converted: Vec<DrinkEvent> = raw
        .into_iter()
        .filter_map(|record| match DrinkEvent::try_from(record) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Dropping drink record: {}", e);
                None
            }
        })
        .collect();

    normalize_events(&converted)
}
