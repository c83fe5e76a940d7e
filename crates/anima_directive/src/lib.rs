//! # Anima Directive Parser
//!
//! Turns raw assistant text into cleaned, user-facing text plus structured
//! directive records. Pure: no I/O, no failure mode.

pub mod parser;

pub use parser::{
    contains_tag, normalize_whitespace, parse, parse_default, parse_fields, ParseOptions,
};
