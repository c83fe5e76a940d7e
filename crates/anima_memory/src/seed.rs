//! First-run seeding of a workspace.

use anima_core::{EmotionState, EmotionTaxonomy, PresenceState, RoomsTable, WorkspaceConfig};
use chrono::Utc;

use crate::store::{save_json, DocumentStore, StoreResult};

/// Write a neutral emotion document, a presence document in the living room
/// and a sample rooms table. Existing documents are kept unless `force`.
///
/// Returns the paths that were written.
pub async fn seed_workspace(
    store: &dyn DocumentStore,
    layout: &WorkspaceConfig,
    force: bool,
) -> StoreResult<Vec<String>> {
    let now = Utc::now();
    let mut written = Vec::new();

    if force || store.read(&layout.emotion_state).await?.is_none() {
        let doc = EmotionState::seeded(EmotionTaxonomy::plutchik(), now);
        save_json(store, &layout.emotion_state, &doc).await?;
        written.push(layout.emotion_state.clone());
    }
    if force || store.read(&layout.presence_state).await?.is_none() {
        let doc = PresenceState::seeded("living_room", "Living Room", now);
        save_json(store, &layout.presence_state, &doc).await?;
        written.push(layout.presence_state.clone());
    }
    if force || store.read(&layout.rooms).await?.is_none() {
        save_json(store, &layout.rooms, &RoomsTable::sample()).await?;
        written.push(layout.rooms.clone());
    }

    tracing::info!("Seeded {} workspace document(s)", written.len());
    Ok(written)
}
