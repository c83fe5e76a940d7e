//! Canvas aggregator.
//!
//! Re-reads both state documents and the rooms table after the engines have
//! settled and overwrites the single snapshot the display layer polls.
//! Nothing here returns an error: unreadable inputs become `null`
//! projections and a failed write is logged.

use anima_core::{CanvasSnapshot, EmotionState, PresenceState, RoomsTable, WorkspaceConfig};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::store::{load_json, save_json, DocumentStore};

pub struct CanvasAggregator {
    workspace: Arc<dyn DocumentStore>,
    canvas: Arc<dyn DocumentStore>,
    layout: WorkspaceConfig,
    canvas_file: String,
}

impl CanvasAggregator {
    pub fn new(
        workspace: Arc<dyn DocumentStore>,
        canvas: Arc<dyn DocumentStore>,
        layout: WorkspaceConfig,
        canvas_file: impl Into<String>,
    ) -> Self {
        Self {
            workspace,
            canvas,
            layout,
            canvas_file: canvas_file.into(),
        }
    }

    /// Project the current documents into a fresh snapshot.
    pub async fn build_snapshot(&self, narration_segments: &[String]) -> CanvasSnapshot {
        let (emotion, presence, rooms) = tokio::join!(
            self.read_or_none::<EmotionState>(&self.layout.emotion_state),
            self.read_or_none::<PresenceState>(&self.layout.presence_state),
            self.read_or_none::<RoomsTable>(&self.layout.rooms),
        );

        CanvasSnapshot::build(
            emotion.as_ref(),
            presence.as_ref(),
            rooms.as_ref(),
            narration_segments,
            Utc::now(),
        )
    }

    /// Build and write the snapshot. Returns whether the write succeeded.
    pub async fn refresh(&self, narration_segments: &[String]) -> bool {
        let snapshot = self.build_snapshot(narration_segments).await;
        match save_json(self.canvas.as_ref(), &self.canvas_file, &snapshot).await {
            Ok(()) => {
                tracing::debug!(
                    "Canvas refreshed (emotion: {}, presence: {})",
                    snapshot.emotion.is_some(),
                    snapshot.presence.is_some()
                );
                true
            }
            Err(e) => {
                tracing::warn!("Failed to write canvas snapshot: {}", e);
                false
            }
        }
    }

    async fn read_or_none<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        match load_json(self.workspace.as_ref(), path).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Canvas input unavailable: {}", e);
                None
            }
        }
    }
}
