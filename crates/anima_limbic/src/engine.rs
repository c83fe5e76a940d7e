//! Emotion state engine.
//!
//! `apply` is a pure transform: document in, new document (or a reason for
//! leaving it alone) out. Loading and storing are the caller's job.

use anima_core::directive::{field, numeric_field};
use anima_core::{
    Applied, DirectiveFields, EmotionConfig, EmotionEntry, EmotionState, HistoryEntry,
    NoOpReason, PreviousEmotion,
};
use chrono::{DateTime, Utc};

use crate::blend::{blend, infer_trend};
use crate::resolve::resolve_emotion;

/// Applies `[[emotion: ...]]` directives to an [`EmotionState`].
#[derive(Debug, Clone, Default)]
pub struct EmotionEngine {
    config: EmotionConfig,
}

impl EmotionEngine {
    pub fn new(config: EmotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmotionConfig {
        &self.config
    }

    /// Blend one directive into `doc`.
    ///
    /// Recognised fields: `name` (alias `emotion`), `valence`, `arousal`,
    /// `confidence`, `secondary`, `trigger`.
    pub fn apply(
        &self,
        doc: Option<&EmotionState>,
        fields: &DirectiveFields,
        now: DateTime<Utc>,
    ) -> Applied<EmotionState> {
        let Some(doc) = doc else {
            return Applied::Unchanged(NoOpReason::DocumentMissing);
        };
        let Some(name) = field(fields, "name").or_else(|| field(fields, "emotion")) else {
            return Applied::Unchanged(NoOpReason::MissingName);
        };

        let target_valence = numeric_field(fields, "valence").map(|v| v.clamp(-1.0, 1.0));
        let target_arousal = numeric_field(fields, "arousal").map(|v| v.clamp(0.0, 1.0));
        let confidence = numeric_field(fields, "confidence")
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(self.config.default_confidence);

        let resolution = resolve_emotion(
            name,
            target_valence,
            &doc.taxonomy,
            self.config.fallback_band,
        );

        let baseline = doc.current.clone().unwrap_or_else(EmotionEntry::neutral);
        let inertia = self
            .config
            .inertia
            .for_arousal(target_arousal.unwrap_or(baseline.arousal));
        let valence = blend(baseline.valence, target_valence, inertia);
        let arousal = blend(baseline.arousal, target_arousal, inertia);

        let mut next = doc.clone();

        if let Some(current) = doc.current.clone() {
            next.previous = Some(PreviousEmotion {
                entry: current.clone(),
                transitioned_at: now,
            });
            next.history.push(HistoryEntry {
                entry: current,
                ended_at: now,
            });
        }

        let secondary = field(fields, "secondary")
            .map(str::to_string)
            .or_else(|| resolution.secondary());

        next.current = Some(EmotionEntry {
            primary: resolution.primary.clone(),
            secondary,
            valence,
            arousal,
            confidence,
            since: Some(now),
            trigger: field(fields, "trigger").map(str::to_string),
        });

        let arc = &mut next.session_arc;
        if arc.start_emotion.is_none() {
            arc.start_emotion = Some(resolution.primary.clone());
        }
        arc.peak_valence = Some(arc.peak_valence.map_or(valence, |p| p.max(valence)));
        arc.peak_arousal = Some(arc.peak_arousal.map_or(arousal, |p| p.max(arousal)));
        arc.trend = infer_trend(&next.history, valence, &self.config);

        let limit = self.config.history_limit;
        if next.history.len() > limit {
            let excess = next.history.len() - limit;
            next.history.drain(..excess);
        }

        tracing::debug!(
            "Emotion '{}' → {} ({:?}), inertia {}, v={} a={}, trend {}",
            resolution.term,
            resolution.primary,
            resolution.via,
            inertia,
            valence,
            arousal,
            next.session_arc.trend.as_str()
        );

        Applied::Updated(next)
    }
}
