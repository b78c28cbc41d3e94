//! Closed-form decay for users whose drink history is not available.
//!
//! Given the last published BAC and when it was published, the estimate is a
//! straight line at the same metabolism rate the simulator uses.

use crate::elimination::metabolism_rate_per_hour;
use crate::stage::BacStage;
use crate::{BacStatus, Error, Pace, Result, HOUR_MS};

/// Linear decay of `bac_last` over `hours_elapsed`, floored at zero
pub fn decay_bac(bac_last: f64, rate_per_hour: f64, hours_elapsed: f64) -> f64 {
    (bac_last - rate_per_hour * hours_elapsed.max(0.0)).max(0.0)
}

/// Estimate a peer's status from their last known BAC
///
/// The projected peak is the current estimate (the curve only falls from
/// here), and the sober time is where the line reaches zero. A `now_ms`
/// earlier than `last_update_ms` is treated as no time having passed.
pub fn approximate_decay(
    bac_last: f64,
    last_update_ms: i64,
    habit: Pace,
    now_ms: i64,
) -> Result<BacStatus> {
    if now_ms < 0 {
        return Err(Error::InvalidArgument(format!(
            "now_ms must not be negative, got {}",
            now_ms
        )));
    }
    if !bac_last.is_finite() || bac_last < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "last known BAC must be a non-negative number, got {}",
            bac_last
        )));
    }

    if bac_last == 0.0 {
        return Ok(BacStatus::sober());
    }

    let rate = metabolism_rate_per_hour(habit);
    let elapsed_ms = now_ms.saturating_sub(last_update_ms).max(0);
    let bac_now = decay_bac(bac_last, rate, elapsed_ms as f64 / HOUR_MS as f64);

    let hours_to_sober = bac_last / rate;
    let sober_time_ms = last_update_ms.saturating_add((hours_to_sober * HOUR_MS as f64).ceil() as i64);

    // Fully decayed means sober, with no lingering stage
    let stage = if bac_now == 0.0 {
        BacStage::Sober
    } else {
        BacStage::classify(bac_now)
    };

    tracing::debug!(
        "Decayed last known BAC {:.4} over {} ms to {:.4}",
        bac_last,
        elapsed_ms,
        bac_now
    );

    Ok(BacStatus {
        current_bac: bac_now,
        peak_bac: bac_now,
        peak_time_ms: None,
        sober_time_ms: Some(sober_time_ms),
        stage,
        color_token: stage.color_token().to_string(),
    })
}
