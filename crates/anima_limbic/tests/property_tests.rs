//! Property-based tests for the emotion engine.
//!
//! Verifies the blending formula, the history bound and the monotonic
//! session peaks for arbitrary directive sequences.

use anima_core::{DirectiveFields, EmotionConfig, EmotionState, EmotionTaxonomy};
use anima_limbic::{blend, round3, EmotionEngine};
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// A directive with optional targets, some deliberately out of range.
fn arb_directive() -> impl Strategy<Value = DirectiveFields> {
    (
        prop_oneof![
            Just("joy"),
            Just("sadness"),
            Just("anxious"),
            Just("love"),
            Just("quiet anger"),
            Just("mystery"),
        ],
        prop::option::of(-1.5f64..=1.5),
        prop::option::of(-0.5f64..=1.5),
    )
        .prop_map(|(name, valence, arousal)| {
            let mut fields = DirectiveFields::new();
            fields.insert("name".into(), name.to_string());
            if let Some(v) = valence {
                fields.insert("valence".into(), format!("{}", v));
            }
            if let Some(a) = arousal {
                fields.insert("arousal".into(), format!("{}", a));
            }
            fields
        })
}

fn seeded() -> EmotionState {
    EmotionState::seeded(EmotionTaxonomy::plutchik(), Utc::now())
}

// ============================================================================
// Blending Properties
// ============================================================================

proptest! {
    /// With a target the result is the rounded convex combination.
    #[test]
    fn blend_matches_formula(c in -1.0f64..=1.0, t in -1.0f64..=1.0, i in 0.0f64..=1.0) {
        let expected = round3(c * i + t * (1.0 - i));
        prop_assert_eq!(blend(c, Some(t), i), expected);
    }

    /// Without a target the value is returned bit-for-bit.
    #[test]
    fn blend_without_target_is_exact(c in -1.0f64..=1.0, i in 0.0f64..=1.0) {
        prop_assert_eq!(blend(c, None, i).to_bits(), c.to_bits());
    }

    /// Blended values stay inside the documented ranges.
    #[test]
    fn engine_keeps_values_in_range(directives in prop::collection::vec(arb_directive(), 1..30)) {
        let engine = EmotionEngine::default();
        let mut doc = seeded();
        for d in &directives {
            doc = engine.apply(Some(&doc), d, Utc::now()).updated().unwrap();
            let current = doc.current.as_ref().unwrap();
            prop_assert!((-1.0..=1.0).contains(&current.valence));
            prop_assert!((0.0..=1.0).contains(&current.arousal));
            prop_assert!((0.0..=1.0).contains(&current.confidence));
        }
    }

    /// Peaks never decrease, whatever the blended values do.
    #[test]
    fn peaks_are_monotonic(directives in prop::collection::vec(arb_directive(), 1..40)) {
        let engine = EmotionEngine::default();
        let mut doc = seeded();
        let mut peaks = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for d in &directives {
            doc = engine.apply(Some(&doc), d, Utc::now()).updated().unwrap();
            let pv = doc.session_arc.peak_valence.unwrap();
            let pa = doc.session_arc.peak_arousal.unwrap();
            prop_assert!(pv >= peaks.0);
            prop_assert!(pa >= peaks.1);
            peaks = (pv, pa);
        }
    }

    /// History never exceeds the configured limit and keeps the newest entries.
    #[test]
    fn history_is_bounded(n in 1usize..80, limit in 1usize..20) {
        let engine = EmotionEngine::new(EmotionConfig { history_limit: limit, ..Default::default() });
        let mut doc = seeded();
        for i in 0..n {
            let mut fields = DirectiveFields::new();
            fields.insert("name".into(), format!("step-{}", i));
            doc = engine.apply(Some(&doc), &fields, Utc::now()).updated().unwrap();
        }
        prop_assert_eq!(doc.history.len(), n.min(limit));
        if n >= 2 {
            let newest = doc.history.last().unwrap();
            let expected = format!("step-{}", n - 2);
            prop_assert_eq!(newest.entry.secondary.as_deref(), Some(expected.as_str()));
        }
    }
}
