//! # Anima Core
//!
//! Shared vocabulary for the persona-directive pipeline: the directive records
//! the parser emits, the two persisted state documents the engines mutate, the
//! canvas projection, typed engine outcomes and the TOML configuration.

pub mod canvas;
pub mod config;
pub mod directive;
pub mod emotion;
pub mod outcome;
pub mod presence;

pub use canvas::{CanvasEmotion, CanvasPresence, CanvasSnapshot};
pub use config::{
    AnimaConfig, CanvasConfig, EmotionConfig, InertiaProfile, LoggingConfig, ParserConfig,
    WorkspaceConfig,
};
pub use directive::{
    DirectiveFields, DirectiveKind, DirectiveRecord, ParseResult, ReplyTarget,
};
pub use emotion::{
    EmotionEntry, EmotionState, EmotionTaxonomy, HistoryEntry, PreviousEmotion, SessionArc, Trend,
};
pub use outcome::{Applied, EngineOutcome, NoOpReason};
pub use presence::{Appearance, Location, PresenceState, RoomEntry, RoomsTable, Transition};
