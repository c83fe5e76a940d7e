//! Directive records extracted from assistant text.
//!
//! A directive is the structured half of a `[[emotion: ...]]` or
//! `[[presence: ...]]` tag. The parser produces them, the engines consume them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which state engine a directive is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Emotion,
    Presence,
}

impl DirectiveKind {
    /// Resolve a tag name (already lower-cased) to a kind.
    pub fn from_tag(name: &str) -> Option<Self> {
        match name {
            "emotion" => Some(Self::Emotion),
            "presence" => Some(Self::Presence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emotion => "emotion",
            Self::Presence => "presence",
        }
    }
}

/// `key=value` pairs carried by a persona tag. Keys are lower-cased.
pub type DirectiveFields = BTreeMap<String, String>;

/// One persona tag occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveRecord {
    pub kind: DirectiveKind,
    pub fields: DirectiveFields,
}

impl DirectiveRecord {
    pub fn new(kind: DirectiveKind, fields: DirectiveFields) -> Self {
        Self { kind, fields }
    }

    /// Look up a field by (lower-case) key, ignoring blank values.
    pub fn field(&self, key: &str) -> Option<&str> {
        field(&self.fields, key)
    }
}

/// Look up a non-blank field value.
pub fn field<'a>(fields: &'a DirectiveFields, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Look up a field and parse it as a finite number. Garbage reads as absent.
pub fn numeric_field(fields: &DirectiveFields, key: &str) -> Option<f64> {
    field(fields, key)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Reply routing requested by the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTarget {
    /// Last explicit `[[reply_to: id]]` in document order.
    pub explicit_id: Option<String>,
    /// A bare `[[reply_to_current]]` marker was seen.
    pub current_requested: bool,
}

impl ReplyTarget {
    /// Effective reply id: the explicit id wins, otherwise the caller's
    /// current message id when the bare marker was present.
    pub fn resolve(&self, current_message_id: Option<&str>) -> Option<String> {
        if let Some(id) = &self.explicit_id {
            return Some(id.clone());
        }
        if self.current_requested {
            return current_message_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string);
        }
        None
    }
}

/// Output of one parser pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub cleaned_text: String,
    pub audio_as_voice: bool,
    pub reply_target: ReplyTarget,
    /// Effective reply id after combining the tags with the caller's id.
    pub reply_to_id: Option<String>,
    pub directives: Vec<DirectiveRecord>,
    pub narration_segments: Vec<String>,
}

impl ParseResult {
    pub fn has_directives(&self) -> bool {
        !self.directives.is_empty()
    }

    /// Directives addressed to `kind`, in document order.
    pub fn directives_of(&self, kind: DirectiveKind) -> impl Iterator<Item = &DirectiveRecord> {
        self.directives.iter().filter(move |d| d.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_target_explicit_wins() {
        let target = ReplyTarget {
            explicit_id: Some("B".into()),
            current_requested: true,
        };
        assert_eq!(target.resolve(Some("m1")), Some("B".to_string()));
    }

    #[test]
    fn test_reply_target_current_needs_caller_id() {
        let target = ReplyTarget {
            explicit_id: None,
            current_requested: true,
        };
        assert_eq!(target.resolve(Some("m1")), Some("m1".to_string()));
        assert_eq!(target.resolve(None), None);
        assert_eq!(target.resolve(Some("  ")), None);
    }

    #[test]
    fn test_reply_target_nothing_requested() {
        assert_eq!(ReplyTarget::default().resolve(Some("m1")), None);
    }

    #[test]
    fn test_numeric_field_rejects_garbage() {
        let mut fields = DirectiveFields::new();
        fields.insert("valence".into(), "0.5".into());
        fields.insert("arousal".into(), "lots".into());
        fields.insert("confidence".into(), "NaN".into());
        assert_eq!(numeric_field(&fields, "valence"), Some(0.5));
        assert_eq!(numeric_field(&fields, "arousal"), None);
        assert_eq!(numeric_field(&fields, "confidence"), None);
        assert_eq!(numeric_field(&fields, "missing"), None);
    }

    #[test]
    fn test_directive_kind_from_tag() {
        assert_eq!(DirectiveKind::from_tag("emotion"), Some(DirectiveKind::Emotion));
        assert_eq!(DirectiveKind::from_tag("presence"), Some(DirectiveKind::Presence));
        assert_eq!(DirectiveKind::from_tag("narration"), None);
    }

    #[test]
    fn test_parse_result_serializes_camel_case() {
        let result = ParseResult {
            cleaned_text: "hi".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["cleanedText"], "hi");
        assert_eq!(json["audioAsVoice"], false);
        assert_eq!(json["replyTarget"]["currentRequested"], false);
    }
}
