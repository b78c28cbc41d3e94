//! Peak and sober-time extraction from a sample series.

use crate::BacSample;

/// Peak and sober-time summary of a series
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PeakSober {
    pub peak_bac: f64,
    pub peak_time_ms: Option<i64>,
    pub peak_index: Option<usize>,
    pub sober_time_ms: Option<i64>,
}

/// Scan a time-ordered series for its maximum and the first sober sample after it
///
/// The earliest sample wins when the maximum repeats. A series that never
/// rises above zero has no peak time. `sober_time_ms` stays `None` if the
/// series ends at its peak or never drops to `epsilon` afterwards; callers
/// re-query once more time has passed.
pub fn extract_peak_and_sober(samples: &[BacSample], epsilon: f64) -> PeakSober {
    let mut peak: Option<(usize, &BacSample)> = None;
    for (index, sample) in samples.iter().enumerate() {
        match peak {
            Some((_, best)) if sample.bac <= best.bac => {}
            _ => peak = Some((index, sample)),
        }
    }

    let (peak_index, peak_sample) = match peak {
        Some((index, sample)) if sample.bac > 0.0 => (index, sample),
        _ => return PeakSober::default(),
    };

    let sober_time_ms = samples[peak_index + 1..]
        .iter()
        .find(|sample| sample.bac <= epsilon)
        .map(|sample| sample.time_ms);

    PeakSober {
        peak_bac: peak_sample.bac,
        peak_time_ms: Some(peak_sample.time_ms),
        peak_index: Some(peak_index),
        sober_time_ms,
    }
}
