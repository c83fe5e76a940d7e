//! Display-oriented projection of emotion and presence.
//!
//! Recomputed from the persisted documents on every pipeline run and written
//! over the previous snapshot. Never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::EmotionState;
use crate::presence::{PresenceState, RoomsTable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEmotion {
    /// Secondary term when present, otherwise the primary.
    pub name: String,
    pub primary: String,
    pub valence: f64,
    pub arousal: f64,
}

impl CanvasEmotion {
    pub fn project(state: &EmotionState) -> Option<Self> {
        let current = state.current.as_ref()?;
        Some(Self {
            name: current.display_name().to_string(),
            primary: current.primary.clone(),
            valence: current.valence,
            arousal: current.arousal,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasPresence {
    pub room: String,
    pub room_label: String,
    pub background: Option<String>,
    pub posture: Option<String>,
    pub clothing: Option<String>,
}

impl CanvasPresence {
    pub fn project(state: &PresenceState, rooms: Option<&RoomsTable>) -> Self {
        let room = state.location.room_key.clone();
        Self {
            background: rooms.and_then(|r| r.background_for(&room)),
            room,
            room_label: state.location.label.clone(),
            posture: state.appearance.posture.clone(),
            clothing: state.appearance.clothing.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasSnapshot {
    pub emotion: Option<CanvasEmotion>,
    pub presence: Option<CanvasPresence>,
    pub narration: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CanvasSnapshot {
    pub fn build(
        emotion: Option<&EmotionState>,
        presence: Option<&PresenceState>,
        rooms: Option<&RoomsTable>,
        narration_segments: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            emotion: emotion.and_then(CanvasEmotion::project),
            presence: presence.map(|p| CanvasPresence::project(p, rooms)),
            narration: narration_segments.last().cloned(),
            timestamp: now,
        }
    }
}
