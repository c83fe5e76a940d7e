//! Typed results for state engines.
//!
//! Engines never raise errors to the caller. A directive either produces a
//! new document, leaves the document alone for a known reason, or fails on
//! I/O; the coordinator logs each case.

use std::fmt;

/// Why an engine left its document untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// The payload carried no directive for this engine.
    NoDirectives,
    /// The target document does not exist or could not be decoded.
    DocumentMissing,
    /// An emotion directive without a usable `name`/`emotion` field.
    MissingName,
    /// Every field was absent, "unchanged", or equal to the stored value.
    NothingChanged,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoDirectives => "no directives",
            Self::DocumentMissing => "document missing",
            Self::MissingName => "missing emotion name",
            Self::NothingChanged => "nothing changed",
        };
        f.write_str(s)
    }
}

/// Result of a pure document transformation.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied<T> {
    Updated(T),
    Unchanged(NoOpReason),
}

impl<T> Applied<T> {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }

    pub fn updated(self) -> Option<T> {
        match self {
            Self::Updated(doc) => Some(doc),
            Self::Unchanged(_) => None,
        }
    }
}

/// Result of one engine's load → transform → store stage.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// The document was written; `applied` directives changed it.
    Updated { applied: usize },
    NoOp(NoOpReason),
    Failed(String),
}

impl EngineOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for EngineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated { applied } => write!(f, "updated ({} applied)", applied),
            Self::NoOp(reason) => write!(f, "no-op ({})", reason),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_helpers() {
        let a: Applied<u8> = Applied::Updated(3);
        assert!(a.is_updated());
        assert_eq!(a.updated(), Some(3));
        let b: Applied<u8> = Applied::Unchanged(NoOpReason::NothingChanged);
        assert!(!b.is_updated());
        assert_eq!(b.updated(), None);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            EngineOutcome::Updated { applied: 2 }.to_string(),
            "updated (2 applied)"
        );
        assert_eq!(
            EngineOutcome::NoOp(NoOpReason::DocumentMissing).to_string(),
            "no-op (document missing)"
        );
        assert!(EngineOutcome::Failed("disk".into()).is_failed());
    }
}
