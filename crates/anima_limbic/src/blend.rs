//! Inertia blending and trend inference.
//!
//! Emotions don't switch instantly. A new target is mixed into the current
//! value with a weight that depends on how activated the companion is:
//! high arousal moves fast, low arousal lingers.

use anima_core::{EmotionConfig, HistoryEntry, Trend};

/// Round to three decimal places.
#[inline]
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// `current * inertia + target * (1 - inertia)`, rounded.
///
/// Without a target the current value passes through untouched (not
/// re-rounded).
pub fn blend(current: f64, target: Option<f64>, inertia: f64) -> f64 {
    match target {
        Some(t) => round3(current * inertia + t * (1.0 - inertia)),
        None => current,
    }
}

/// Classify the arc from recent history and the freshly blended valence.
///
/// Fewer than two history entries is always `Stable`. Otherwise the new
/// valence is compared to the mean of the last `trend_window` entries.
pub fn infer_trend(history: &[HistoryEntry], valence: f64, config: &EmotionConfig) -> Trend {
    if history.len() < 2 {
        return Trend::Stable;
    }

    let window = config.trend_window.max(1).min(history.len());
    let recent = &history[history.len() - window..];
    let mean = recent.iter().map(|h| h.entry.valence).sum::<f64>() / window as f64;
    let delta = valence - mean;

    if delta > config.trend_threshold {
        Trend::RisingPositive
    } else if delta < -config.trend_threshold {
        Trend::FallingNegative
    } else if valence > config.trend_band {
        Trend::StablePositive
    } else if valence < -config.trend_band {
        Trend::StableNegative
    } else {
        Trend::Stable
    }
}
