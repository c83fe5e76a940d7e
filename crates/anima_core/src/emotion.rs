//! Persistent emotional state document.
//!
//! The document is created outside the pipeline and only ever mutated by the
//! emotion engine. It carries its own taxonomy so that each companion can
//! normalise emotion labels differently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Accept a number, a numeric string or null. Anything unreadable becomes 0.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let v = match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if v.is_finite() {
        Ok(v)
    } else {
        tracing::warn!("Non-finite value in emotion document, resetting to 0");
        Ok(0.0)
    }
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

fn default_confidence() -> f64 {
    0.8
}

/// Like [`lenient_f64`] but unreadable values fall back to the default confidence.
fn lenient_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_f64(deserializer)?.unwrap_or_else(default_confidence))
}

/// A single resolved emotional reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionEntry {
    pub primary: String,
    #[serde(default)]
    pub secondary: Option<String>,
    /// -1.0 (negative) to 1.0 (positive)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub valence: f64,
    /// 0.0 (calm) to 1.0 (activated)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub arousal: f64,
    #[serde(default = "default_confidence", deserialize_with = "lenient_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

impl EmotionEntry {
    /// Resting baseline used when a document has no current entry.
    pub fn neutral() -> Self {
        Self {
            primary: "neutral".to_string(),
            secondary: None,
            valence: 0.0,
            arousal: 0.0,
            confidence: default_confidence(),
            since: None,
            trigger: None,
        }
    }

    /// Label shown to users: the nuanced term when present.
    pub fn display_name(&self) -> &str {
        self.secondary.as_deref().unwrap_or(&self.primary)
    }
}

/// The entry that was current before the latest transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousEmotion {
    #[serde(flatten)]
    pub entry: EmotionEntry,
    pub transitioned_at: DateTime<Utc>,
}

/// An archived entry in the bounded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub entry: EmotionEntry,
    pub ended_at: DateTime<Utc>,
}

/// Direction of the emotional arc over recent transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    #[default]
    Stable,
    RisingPositive,
    FallingNegative,
    StablePositive,
    StableNegative,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::RisingPositive => "rising-positive",
            Self::FallingNegative => "falling-negative",
            Self::StablePositive => "stable-positive",
            Self::StableNegative => "stable-negative",
        }
    }
}

/// Running summary across the document's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionArc {
    /// Set by the first directive ever applied, then frozen.
    pub start_emotion: Option<String>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub peak_valence: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub peak_arousal: Option<f64>,
    pub trend: Trend,
}

/// Label normalisation table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionTaxonomy {
    /// Canonical emotion names, in priority order.
    pub primary: Vec<String>,
    /// Primary name → finer-grained terms that map onto it.
    pub secondary: BTreeMap<String, Vec<String>>,
    /// Compound name → component primaries (first one wins).
    pub compound: BTreeMap<String, Vec<String>>,
}

impl EmotionTaxonomy {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty() && self.compound.is_empty()
    }

    /// Plutchik's wheel plus a neutral resting state.
    pub fn plutchik() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        let primary = list(&[
            "joy",
            "trust",
            "fear",
            "surprise",
            "sadness",
            "disgust",
            "anger",
            "anticipation",
            "neutral",
        ]);

        let secondary = [
            ("joy", &["happy", "content", "cheerful", "delighted", "ecstatic", "serene", "playful", "proud"][..]),
            ("trust", &["accepting", "admiring", "affectionate", "safe", "grateful"][..]),
            ("fear", &["anxious", "nervous", "scared", "worried", "apprehensive", "terrified"][..]),
            ("surprise", &["amazed", "astonished", "startled", "distracted", "curious"][..]),
            ("sadness", &["lonely", "melancholy", "grief", "pensive", "disappointed", "hurt"][..]),
            ("disgust", &["bored", "loathing", "contempt", "repulsed"][..]),
            ("anger", &["annoyed", "frustrated", "irritated", "furious", "rage", "jealous"][..]),
            ("anticipation", &["eager", "hopeful", "interested", "vigilant", "excited"][..]),
            ("neutral", &["calm", "relaxed", "indifferent", "tired"][..]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), list(v)))
        .collect();

        let compound = [
            ("love", &["joy", "trust"][..]),
            ("submission", &["trust", "fear"][..]),
            ("awe", &["fear", "surprise"][..]),
            ("disapproval", &["surprise", "sadness"][..]),
            ("remorse", &["sadness", "disgust"][..]),
            ("contempt", &["disgust", "anger"][..]),
            ("aggressiveness", &["anger", "anticipation"][..]),
            ("optimism", &["anticipation", "joy"][..]),
            ("guilt", &["joy", "fear"][..]),
            ("curiosity", &["trust", "surprise"][..]),
            ("despair", &["fear", "sadness"][..]),
            ("envy", &["sadness", "anger"][..]),
            ("cynicism", &["disgust", "anticipation"][..]),
            ("pride", &["anger", "joy"][..]),
            ("hope", &["anticipation", "trust"][..]),
            ("anxiety", &["anticipation", "fear"][..]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), list(v)))
        .collect();

        Self {
            primary,
            secondary,
            compound,
        }
    }
}

/// The whole persisted emotion document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionState {
    #[serde(default)]
    pub current: Option<EmotionEntry>,
    #[serde(default)]
    pub previous: Option<PreviousEmotion>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub session_arc: SessionArc,
    #[serde(default)]
    pub taxonomy: EmotionTaxonomy,
    /// Keys this crate does not model, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmotionState {
    /// A fresh document resting at neutral.
    pub fn seeded(taxonomy: EmotionTaxonomy, now: DateTime<Utc>) -> Self {
        Self {
            current: Some(EmotionEntry {
                since: Some(now),
                ..EmotionEntry::neutral()
            }),
            taxonomy,
            ..Default::default()
        }
    }
}
