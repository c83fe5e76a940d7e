//! Persistent physical-presence document and the static rooms lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    /// Normalised key into the rooms table.
    pub room_key: String,
    /// Human-facing name as the companion said it.
    pub label: String,
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Appearance {
    pub outfit_key: Option<String>,
    pub posture: Option<String>,
    pub clothing: Option<String>,
    pub accessories: Vec<String>,
    pub hair: Option<String>,
    pub footwear: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    #[serde(default)]
    pub narration: String,
    pub timestamp: DateTime<Utc>,
}

/// The whole persisted presence document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceState {
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub appearance: Appearance,
    #[serde(default)]
    pub last_transition: Option<Transition>,
    #[serde(default)]
    pub idle_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PresenceState {
    /// A fresh document in a given room.
    pub fn seeded(room_key: &str, label: &str, now: DateTime<Utc>) -> Self {
        Self {
            location: Location {
                room_key: room_key.to_string(),
                label: label.to_string(),
                zone: None,
            },
            appearance: Appearance {
                posture: Some("standing".to_string()),
                ..Default::default()
            },
            updated_at: Some(now),
            ..Default::default()
        }
    }
}

/// One row of the rooms table. Either a bare background or a detailed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoomEntry {
    Background(String),
    Detailed {
        #[serde(default)]
        background: Option<String>,
        #[serde(default)]
        label: Option<String>,
    },
}

impl RoomEntry {
    pub fn background(&self) -> Option<&str> {
        match self {
            Self::Background(bg) => Some(bg.as_str()),
            Self::Detailed { background, .. } => background.as_deref(),
        }
    }
}

/// Static room key → background lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomsTable {
    pub rooms: BTreeMap<String, RoomEntry>,
}

impl RoomsTable {
    /// Resolve a background: exact key first, then the first key (in key
    /// order) whose alphanumeric-only lower-case form matches.
    pub fn background_for(&self, room_key: &str) -> Option<String> {
        if let Some(entry) = self.rooms.get(room_key) {
            return entry.background().map(str::to_string);
        }
        let wanted = squash_key(room_key);
        if wanted.is_empty() {
            return None;
        }
        self.rooms
            .iter()
            .find(|(key, _)| squash_key(key) == wanted)
            .and_then(|(_, entry)| entry.background().map(str::to_string))
    }

    /// A small house used when seeding a new workspace.
    pub fn sample() -> Self {
        let rooms = [
            ("living_room", "backgrounds/living-room.png", "Living Room"),
            ("kitchen", "backgrounds/kitchen.png", "Kitchen"),
            ("bedroom", "backgrounds/bedroom.png", "Bedroom"),
            ("study", "backgrounds/study.png", "Study"),
            ("garden", "backgrounds/garden.png", "Garden"),
        ]
        .into_iter()
        .map(|(key, bg, label)| {
            (
                key.to_string(),
                RoomEntry::Detailed {
                    background: Some(bg.to_string()),
                    label: Some(label.to_string()),
                },
            )
        })
        .collect();
        Self { rooms }
    }
}

/// Lower-case and drop everything that is not alphanumeric.
fn squash_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
