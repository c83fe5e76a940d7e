//! Presence state engine
//!
//! Applies partial `[[presence: ...]]` updates (location, posture, clothing
//! and the rest of the appearance) to the persisted presence document.

use anima_core::directive::field;
use anima_core::{Applied, DirectiveFields, NoOpReason, PresenceState, Transition};
use chrono::{DateTime, Utc};

/// Sentinel meaning "leave this field alone".
const UNCHANGED: &str = "unchanged";

/// Applies presence directives. Stateless; every call is a pure transform.
#[derive(Debug, Clone, Default)]
pub struct PresenceEngine;

impl PresenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Apply one directive to `doc`.
    ///
    /// Recognised fields: `location`, `zone`, `posture`, `clothing`, `hair`,
    /// `accessories` (comma separated), `outfit`, `footwear`, and
    /// `narration` for the transition text of a location change.
    pub fn apply(
        &self,
        doc: Option<&PresenceState>,
        fields: &DirectiveFields,
        now: DateTime<Utc>,
    ) -> Applied<PresenceState> {
        let Some(doc) = doc else {
            return Applied::Unchanged(NoOpReason::DocumentMissing);
        };

        let mut next = doc.clone();
        let mut changed: Vec<&'static str> = Vec::new();

        if let Some(label) = incoming(fields, "location") {
            if label != next.location.label {
                let from = Some(next.location.label.clone()).filter(|l| !l.is_empty());
                let narration = field(fields, "narration")
                    .map(str::to_string)
                    .unwrap_or_else(|| default_narration(from.as_deref(), label));
                next.location.label = label.to_string();
                next.location.room_key = room_key(label);
                next.last_transition = Some(Transition {
                    from,
                    to: label.to_string(),
                    narration,
                    timestamp: now,
                });
                changed.push("location");
            }
        }

        if let Some(zone) = incoming(fields, "zone") {
            if next.location.zone.as_deref() != Some(zone) {
                next.location.zone = Some(zone.to_string());
                changed.push("zone");
            }
        }

        let appearance = &mut next.appearance;
        for (key, slot) in [
            ("posture", &mut appearance.posture),
            ("clothing", &mut appearance.clothing),
            ("hair", &mut appearance.hair),
            ("outfit", &mut appearance.outfit_key),
            ("footwear", &mut appearance.footwear),
        ] {
            if let Some(value) = incoming(fields, key) {
                if slot.as_deref() != Some(value) {
                    *slot = Some(value.to_string());
                    changed.push(key);
                }
            }
        }

        if let Some(raw) = incoming(fields, "accessories") {
            let items = split_accessories(raw);
            if appearance.accessories != items {
                appearance.accessories = items;
                changed.push("accessories");
            }
        }

        if changed.is_empty() {
            return Applied::Unchanged(NoOpReason::NothingChanged);
        }

        next.updated_at = Some(now);
        next.idle_since = None;
        tracing::debug!("Presence updated: {}", changed.join(", "));

        Applied::Updated(next)
    }
}

/// A field value unless it is absent, blank, or the "unchanged" sentinel.
fn incoming<'a>(fields: &'a DirectiveFields, key: &str) -> Option<&'a str> {
    field(fields, key).filter(|v| !v.eq_ignore_ascii_case(UNCHANGED))
}

/// Split a comma-separated accessory list, trimming items and dropping empties.
pub fn split_accessories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Derive a rooms-table key from a free-form label.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into a
/// single `_`, and strips separators from both ends: `"  Living Room!"` →
/// `"living_room"`.
pub fn room_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut pending_sep = false;
    for c in label.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.extend(c.to_lowercase().filter(|l| l.is_alphanumeric()));
        } else {
            pending_sep = true;
        }
    }
    key
}

fn default_narration(from: Option<&str>, to: &str) -> String {
    match from {
        Some(from) => format!("Moved from {} to {}.", from, to),
        None => format!("Arrived at {}.", to),
    }
}
