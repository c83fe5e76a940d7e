//! # Anima Limbic
//!
//! The emotion half of the persona pipeline. Given an `[[emotion: ...]]`
//! directive it:
//!
//! 1. Resolves the free-form label against the document's taxonomy
//! 2. Blends valence/arousal into the current state with arousal-dependent inertia
//! 3. Archives the outgoing state into `previous` and a bounded history
//! 4. Updates the session arc (start, peaks, trend)
//!
//! Everything here is pure; the coordinator in `anima_memory` owns I/O.

mod blend;
mod engine;
mod resolve;

pub use blend::{blend, infer_trend, round3};
pub use engine::EmotionEngine;
pub use resolve::{resolve_emotion, Resolution, ResolvedVia};
