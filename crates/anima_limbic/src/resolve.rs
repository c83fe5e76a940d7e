//! Emotion label resolution against a taxonomy.
//!
//! Pure: the taxonomy is passed in, nothing is read from disk. The substring
//! step is a heuristic and can match short primaries inside unrelated words
//! ("ire" inside "desire"); downstream consumers rely on the current matches,
//! so it is kept as is.

use anima_core::EmotionTaxonomy;

/// Which rule produced the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Primary,
    Secondary,
    Compound,
    Substring,
    ValenceFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical lower-case primary.
    pub primary: String,
    /// The normalised input term.
    pub term: String,
    pub via: ResolvedVia,
}

impl Resolution {
    /// The input term, when it says more than the primary does.
    pub fn secondary(&self) -> Option<String> {
        (self.term != self.primary).then(|| self.term.clone())
    }
}

/// Resolve `name` to a primary emotion.
///
/// Tried in order: exact primary, secondary membership, compound (first
/// component), substring in either direction, then the sign of `valence`
/// (`>= band` joy, `<= -band` sadness, otherwise neutral).
pub fn resolve_emotion(
    name: &str,
    valence: Option<f64>,
    taxonomy: &EmotionTaxonomy,
    band: f64,
) -> Resolution {
    let term = name.trim().to_lowercase();
    let done = |primary: String, via: ResolvedVia| Resolution {
        primary,
        term: term.clone(),
        via,
    };

    if let Some(p) = exact_primary(&term, taxonomy) {
        return done(p, ResolvedVia::Primary);
    }
    if let Some(p) = secondary_parent(&term, taxonomy) {
        return done(p, ResolvedVia::Secondary);
    }
    if let Some(p) = compound_component(&term, taxonomy) {
        return done(p, ResolvedVia::Compound);
    }
    if let Some(p) = substring_primary(&term, taxonomy) {
        return done(p, ResolvedVia::Substring);
    }

    let v = valence.unwrap_or(0.0);
    let fallback = if v >= band {
        "joy"
    } else if v <= -band {
        "sadness"
    } else {
        "neutral"
    };
    done(fallback.to_string(), ResolvedVia::ValenceFallback)
}

fn exact_primary(term: &str, taxonomy: &EmotionTaxonomy) -> Option<String> {
    taxonomy
        .primary
        .iter()
        .map(|p| p.trim().to_lowercase())
        .find(|p| p == term)
}

fn secondary_parent(term: &str, taxonomy: &EmotionTaxonomy) -> Option<String> {
    // Declared primaries first, in priority order; then any leftover keys.
    let ordered = taxonomy
        .primary
        .iter()
        .filter_map(|p| taxonomy.secondary.get_key_value(p))
        .chain(
            taxonomy
                .secondary
                .iter()
                .filter(|(k, _)| !taxonomy.primary.contains(k)),
        );

    for (parent, terms) in ordered {
        if terms.iter().any(|t| t.trim().to_lowercase() == term) {
            return Some(parent.trim().to_lowercase());
        }
    }
    None
}

fn compound_component(term: &str, taxonomy: &EmotionTaxonomy) -> Option<String> {
    taxonomy
        .compound
        .iter()
        .find(|(name, _)| name.trim().to_lowercase() == term)
        .and_then(|(_, parts)| parts.first())
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
}

fn substring_primary(term: &str, taxonomy: &EmotionTaxonomy) -> Option<String> {
    if term.is_empty() {
        return None;
    }
    taxonomy
        .primary
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .find(|p| term.contains(p.as_str()) || p.contains(term))
}
