//! Persona pipeline coordinator.
//!
//! One payload flows through four stages:
//!
//! 1. the directive parser (synchronous, no I/O),
//! 2. the emotion and presence engines, each on its own task doing
//!    load → transform → store against its own document,
//! 3. a join that records every engine's outcome, task panics included,
//! 4. the canvas aggregator, strictly after both engines have settled.
//!
//! Nothing here returns an error to the caller; failures are logged and
//! reported in [`PipelineReport`].
//!
//! Concurrency: there is no locking. Two pipeline runs touching the same
//! document at the same time race, and the last write wins. Runs share no
//! in-memory state, so this only matters for overlapping payloads.

use anima_core::{
    AnimaConfig, Applied, DirectiveFields, DirectiveKind, EngineOutcome, NoOpReason,
    ParseResult, WorkspaceConfig,
};
use anima_directive::ParseOptions;
use anima_expression::PresenceEngine;
use anima_limbic::EmotionEngine;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::canvas::CanvasAggregator;
use crate::store::{load_json, save_json, DocumentStore, FsStore, StoreError};

/// What one pipeline run did to each document.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub emotion: EngineOutcome,
    pub presence: EngineOutcome,
    pub snapshot_written: bool,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "emotion: {}; presence: {}; canvas: {}",
            self.emotion,
            self.presence,
            if self.snapshot_written { "written" } else { "not written" }
        )
    }
}

pub struct PersonaPipeline {
    options: ParseOptions,
    emotion: EmotionEngine,
    presence: PresenceEngine,
    workspace: Arc<dyn DocumentStore>,
    layout: WorkspaceConfig,
    aggregator: CanvasAggregator,
}

impl PersonaPipeline {
    pub fn new(
        config: &AnimaConfig,
        workspace: Arc<dyn DocumentStore>,
        canvas: Arc<dyn DocumentStore>,
    ) -> Self {
        let aggregator = CanvasAggregator::new(
            workspace.clone(),
            canvas,
            config.workspace.clone(),
            config.canvas.file.clone(),
        );
        Self {
            options: ParseOptions::from(&config.parser),
            emotion: EmotionEngine::new(config.emotion.clone()),
            presence: PresenceEngine::new(),
            workspace,
            layout: config.workspace.clone(),
            aggregator,
        }
    }

    /// Filesystem-backed pipeline rooted at the configured directories.
    pub fn from_config(config: &AnimaConfig) -> Self {
        let workspace = Arc::new(FsStore::new(config.workspace.root.clone()));
        let canvas = Arc::new(FsStore::new(config.canvas.root.clone()));
        Self::new(config, workspace, canvas)
    }

    pub fn aggregator(&self) -> &CanvasAggregator {
        &self.aggregator
    }

    /// Run only the parser.
    pub fn parse(&self, text: &str, current_message_id: Option<&str>) -> ParseResult {
        let options = match current_message_id {
            Some(id) => self.options.clone().with_message_id(id),
            None => self.options.clone(),
        };
        anima_directive::parse(text, &options)
    }

    /// Parse, then apply the state half and wait for it.
    pub async fn process(
        &self,
        text: &str,
        current_message_id: Option<&str>,
    ) -> (ParseResult, PipelineReport) {
        let parsed = self.parse(text, current_message_id);
        let report = self.apply(&parsed).await;
        (parsed, report)
    }

    /// Parse synchronously and hand the state half to a background task.
    ///
    /// The caller can deliver the cleaned text right away; awaiting the
    /// handle is optional.
    pub fn spawn(
        self: &Arc<Self>,
        text: &str,
        current_message_id: Option<&str>,
    ) -> (ParseResult, JoinHandle<PipelineReport>) {
        let parsed = self.parse(text, current_message_id);
        let this = Arc::clone(self);
        let owned = parsed.clone();
        let handle = tokio::spawn(async move { this.apply(&owned).await });
        (parsed, handle)
    }

    /// Run both engines concurrently, then refresh the canvas.
    pub async fn apply(&self, parsed: &ParseResult) -> PipelineReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("persona_pipeline", %run_id);

        async move {
            let emotion_task = {
                let engine = self.emotion.clone();
                spawn_in_span(run_stage(
                    DirectiveKind::Emotion,
                    self.workspace.clone(),
                    self.layout.emotion_state.clone(),
                    collect_fields(parsed, DirectiveKind::Emotion),
                    move |doc, fields, now| engine.apply(doc, fields, now),
                ))
            };
            let presence_task = {
                let engine = self.presence.clone();
                spawn_in_span(run_stage(
                    DirectiveKind::Presence,
                    self.workspace.clone(),
                    self.layout.presence_state.clone(),
                    collect_fields(parsed, DirectiveKind::Presence),
                    move |doc, fields, now| engine.apply(doc, fields, now),
                ))
            };

            let (emotion, presence) = tokio::join!(emotion_task, presence_task);
            let emotion = settle(DirectiveKind::Emotion, emotion);
            let presence = settle(DirectiveKind::Presence, presence);

            let snapshot_written = self.aggregator.refresh(&parsed.narration_segments).await;

            let report = PipelineReport {
                run_id,
                emotion,
                presence,
                snapshot_written,
            };
            tracing::info!("Persona pipeline finished: {}", report);
            report
        }
        .instrument(span)
        .await
    }
}

/// Spawn `stage` so its log lines stay inside the caller's span.
fn spawn_in_span<F>(stage: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(stage.in_current_span())
}

fn collect_fields(parsed: &ParseResult, kind: DirectiveKind) -> Vec<DirectiveFields> {
    parsed
        .directives_of(kind)
        .map(|d| d.fields.clone())
        .collect()
}

/// Turn a joined task into an outcome; a panicked or cancelled task is a failure.
fn settle(
    kind: DirectiveKind,
    joined: Result<EngineOutcome, tokio::task::JoinError>,
) -> EngineOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("{} engine task failed: {}", kind.as_str(), e);
            EngineOutcome::Failed(format!("task failed: {}", e))
        }
    }
}

/// Load one document, fold every directive into it in order, store it once.
async fn run_stage<T, F>(
    kind: DirectiveKind,
    store: Arc<dyn DocumentStore>,
    path: String,
    directives: Vec<DirectiveFields>,
    apply: F,
) -> EngineOutcome
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    F: Fn(Option<&T>, &DirectiveFields, DateTime<Utc>) -> Applied<T> + Send + 'static,
{
    if directives.is_empty() {
        return EngineOutcome::NoOp(NoOpReason::NoDirectives);
    }

    let loaded: Option<T> = match load_json(store.as_ref(), &path).await {
        Ok(doc) => doc,
        Err(e @ StoreError::Codec { .. }) => {
            tracing::warn!("Skipping {} update, unreadable document: {}", kind.as_str(), e);
            None
        }
        Err(e) => {
            tracing::warn!("Failed to load {} document: {}", kind.as_str(), e);
            return EngineOutcome::Failed(e.to_string());
        }
    };
    let Some(mut doc) = loaded else {
        tracing::debug!("No {} document at {}, nothing to update", kind.as_str(), path);
        return EngineOutcome::NoOp(NoOpReason::DocumentMissing);
    };

    let now = Utc::now();
    let mut applied = 0;
    let mut last_reason = NoOpReason::NothingChanged;
    for fields in &directives {
        match apply(Some(&doc), fields, now) {
            Applied::Updated(next) => {
                doc = next;
                applied += 1;
            }
            Applied::Unchanged(reason) => {
                tracing::debug!("{} directive ignored: {}", kind.as_str(), reason);
                last_reason = reason;
            }
        }
    }

    if applied == 0 {
        return EngineOutcome::NoOp(last_reason);
    }

    match save_json(store.as_ref(), &path, &doc).await {
        Ok(()) => EngineOutcome::Updated { applied },
        Err(e) => {
            tracing::warn!("Failed to store {} document: {}", kind.as_str(), e);
            EngineOutcome::Failed(e.to_string())
        }
    }
}
