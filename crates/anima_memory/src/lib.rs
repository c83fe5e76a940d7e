//! # Anima Memory
//!
//! The stateful half of the persona pipeline: whole-document storage, the
//! canvas aggregator and the coordinator that fans parsed directives out to
//! the emotion and presence engines.

pub mod canvas;
pub mod coordinator;
pub mod seed;
pub mod store;

pub use canvas::CanvasAggregator;
pub use coordinator::{PersonaPipeline, PipelineReport};
pub use seed::seed_workspace;
pub use store::{load_json, save_json, DocumentStore, FsStore, MemoryStore, StoreError, StoreResult};
