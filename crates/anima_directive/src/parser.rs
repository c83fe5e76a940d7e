//! Extract control tags from assistant text.
//!
//! The model embeds `[[name]]` / `[[name: payload]]` markers in its replies.
//! This module pulls them out, turns persona tags into [`DirectiveRecord`]s
//! and hands back text that is safe to show to the user.
//!
//! Recognised families, matched case-insensitively:
//! 1. `[[audio_as_voice]]`
//! 2. `[[reply_to_current]]` and `[[reply_to: <id>]]`
//! 3. `[[narration: <text>]]` (rewritten to `*text*`)
//! 4. `[[emotion: k=v|k=v]]` and `[[presence: k=v|k=v]]`
//!
//! Parsing never fails. Malformed payloads lose the offending pair only.

use anima_core::{
    DirectiveFields, DirectiveKind, DirectiveRecord, ParseResult, ParserConfig, ReplyTarget,
};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static RE_AUDIO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\[\s*audio_as_voice\s*\]\]").unwrap());
static RE_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\[\s*(?:reply_to_current|reply_to\s*:\s*([^\[\]\n]*?))\s*\]\]").unwrap()
});
static RE_NARRATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\[\[\s*narration\s*(?::\s*((?:[^\[]|\[[^\[])*?))?\s*\]\]").unwrap());
static RE_PERSONA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\[\s*(emotion|presence)\s*(?::\s*([^\[\]]*?))?\s*\]\]").unwrap()
});
static RE_AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]*\n[^\S\n]*").unwrap());
static RE_HSPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").unwrap());

/// Upper bound on re-scans. Removing a tag can splice two fragments into a new
/// tag; each pass consumes at least one `[[`, so this is never reached on
/// realistic input. Re-scans only look at families that are being stripped,
/// so tags kept verbatim are interpreted exactly once.
const MAX_PASSES: usize = 16;

/// Parser switches. Every strip flag defaults to `true`; when `false` the
/// matched tags stay verbatim in the output while still being interpreted.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Id of the message being answered, used by `[[reply_to_current]]`.
    pub current_message_id: Option<String>,
    pub strip_audio_tag: bool,
    pub strip_reply_tags: bool,
    /// Also governs the narration rewrite.
    pub strip_persona_tags: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            current_message_id: None,
            strip_audio_tag: true,
            strip_reply_tags: true,
            strip_persona_tags: true,
        }
    }
}

impl ParseOptions {
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.current_message_id = Some(id.into());
        self
    }

    /// Whether `text` still holds a tag of a family these options strip.
    fn has_strippable_tag(&self, text: &str) -> bool {
        text.contains("[[")
            && ((self.strip_audio_tag && RE_AUDIO.is_match(text))
                || (self.strip_reply_tags && RE_REPLY.is_match(text))
                || (self.strip_persona_tags
                    && (RE_NARRATION.is_match(text) || RE_PERSONA.is_match(text))))
    }
}

impl From<&ParserConfig> for ParseOptions {
    fn from(cfg: &ParserConfig) -> Self {
        Self {
            current_message_id: None,
            strip_audio_tag: cfg.strip_audio_tag,
            strip_reply_tags: cfg.strip_reply_tags,
            strip_persona_tags: cfg.strip_persona_tags,
        }
    }
}

/// Parse `text`, extracting every recognised tag.
pub fn parse(text: &str, options: &ParseOptions) -> ParseResult {
    if text.trim().is_empty() {
        return ParseResult::default();
    }

    let mut scan = Scan::default();
    let mut current = scan.pass(text, options, false);

    for _ in 1..MAX_PASSES {
        if !options.has_strippable_tag(&current) {
            break;
        }
        current = scan.pass(&current, options, true);
    }

    let reply_to_id = scan.reply.resolve(options.current_message_id.as_deref());

    let result = ParseResult {
        cleaned_text: normalize_whitespace(&current),
        audio_as_voice: scan.audio_as_voice,
        reply_target: scan.reply,
        reply_to_id,
        directives: scan.directives,
        narration_segments: scan.narration,
    };

    if !result.directives.is_empty() || !result.narration_segments.is_empty() {
        tracing::debug!(
            "Parsed {} directive(s), {} narration segment(s)",
            result.directives.len(),
            result.narration_segments.len()
        );
    }

    result
}

/// Parse with default options and no current message id.
pub fn parse_default(text: &str) -> ParseResult {
    parse(text, &ParseOptions::default())
}

/// Split a persona payload into fields.
///
/// `a=1|B = two|junk|=x|y=` → `{a: "1", b: "two"}`. Keys are lower-cased,
/// values keep their case. Later duplicates win.
pub fn parse_fields(payload: &str) -> DirectiveFields {
    payload
        .split('|')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key, value.to_string()))
        })
        .collect()
}

/// Collapse horizontal whitespace runs to a single space, drop whitespace
/// hugging line breaks, and trim.
pub fn normalize_whitespace(text: &str) -> String {
    let text = RE_AROUND_NEWLINE.replace_all(text, "\n");
    let text = RE_HSPACE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Whether `text` still holds any recognised tag.
pub fn contains_tag(text: &str) -> bool {
    text.contains("[[")
        && (RE_AUDIO.is_match(text)
            || RE_REPLY.is_match(text)
            || RE_NARRATION.is_match(text)
            || RE_PERSONA.is_match(text))
}

/// Strip leading/trailing emphasis markers from narration text.
fn strip_emphasis(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
}

/// Accumulated tag state across passes.
#[derive(Default)]
struct Scan {
    audio_as_voice: bool,
    reply: ReplyTarget,
    directives: Vec<DirectiveRecord>,
    narration: Vec<String>,
}

impl Scan {
    /// One sweep over every family. A re-scan skips the families kept
    /// verbatim, which were already interpreted on the first sweep.
    fn pass(&mut self, text: &str, options: &ParseOptions, rescan: bool) -> String {
        let mut text = text.to_string();
        if !rescan || options.strip_audio_tag {
            text = self.audio(&text, options.strip_audio_tag);
        }
        if !rescan || options.strip_reply_tags {
            text = self.reply_tags(&text, options.strip_reply_tags);
        }
        if !rescan || options.strip_persona_tags {
            text = self.narration_tags(&text, options.strip_persona_tags);
            text = self.persona_tags(&text, options.strip_persona_tags);
        }
        text
    }

    fn audio(&mut self, text: &str, strip: bool) -> String {
        if !RE_AUDIO.is_match(text) {
            return text.to_string();
        }
        self.audio_as_voice = true;
        if strip {
            RE_AUDIO.replace_all(text, " ").into_owned()
        } else {
            text.to_string()
        }
    }

    fn reply_tags(&mut self, text: &str, strip: bool) -> String {
        RE_REPLY
            .replace_all(text, |caps: &Captures| {
                match caps.get(1) {
                    None => self.reply.current_requested = true,
                    Some(id) => {
                        let id = id.as_str().trim();
                        if !id.is_empty() {
                            self.reply.explicit_id = Some(id.to_string());
                        }
                    }
                }
                if strip {
                    " ".to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    fn narration_tags(&mut self, text: &str, strip: bool) -> String {
        RE_NARRATION
            .replace_all(text, |caps: &Captures| {
                let body = caps.get(1).map_or("", |m| strip_emphasis(m.as_str()));
                if !body.is_empty() {
                    self.narration.push(body.to_string());
                }
                if !strip {
                    caps[0].to_string()
                } else if body.is_empty() {
                    " ".to_string()
                } else {
                    format!("*{}*", body)
                }
            })
            .into_owned()
    }

    fn persona_tags(&mut self, text: &str, strip: bool) -> String {
        RE_PERSONA
            .replace_all(text, |caps: &Captures| {
                let name = caps[1].to_lowercase();
                if let Some(kind) = DirectiveKind::from_tag(&name) {
                    let fields = caps.get(2).map_or_else(DirectiveFields::new, |m| {
                        parse_fields(m.as_str())
                    });
                    self.directives.push(DirectiveRecord::new(kind, fields));
                }
                if strip {
                    " ".to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let result = parse_default("");
        assert_eq!(result, ParseResult::default());
        let result = parse_default("   \n  ");
        assert_eq!(result, ParseResult::default());
    }

    #[test]
    fn test_plain_text_is_normalized() {
        let result = parse_default("  hello   there \t friend \n  next line  ");
        assert_eq!(result.cleaned_text, "hello there friend\nnext line");
        assert!(result.directives.is_empty());
        assert!(result.narration_segments.is_empty());
        assert!(!result.audio_as_voice);
    }

    #[test]
    fn test_emotion_tag_extracted() {
        let result = parse_default("I feel happy today [[emotion: name=joy|valence=0.8|arousal=0.5]]");
        assert_eq!(result.cleaned_text, "I feel happy today");
        assert_eq!(result.directives.len(), 1);
        let d = &result.directives[0];
        assert_eq!(d.kind, DirectiveKind::Emotion);
        assert_eq!(d.field("name"), Some("joy"));
        assert_eq!(d.field("valence"), Some("0.8"));
        assert_eq!(d.field("arousal"), Some("0.5"));
    }

    #[test]
    fn test_tags_case_insensitive_with_loose_whitespace() {
        let result = parse_default("Hi [[  PRESENCE :  Location=Kitchen | POSTURE = sitting  ]] there");
        assert_eq!(result.cleaned_text, "Hi there");
        let d = &result.directives[0];
        assert_eq!(d.kind, DirectiveKind::Presence);
        assert_eq!(d.field("location"), Some("Kitchen"));
        assert_eq!(d.field("posture"), Some("sitting"));
    }

    #[test]
    fn test_directives_in_document_order() {
        let text = "[[presence: posture=sitting]] a [[emotion: name=joy]] b [[presence: hair=loose]]";
        let result = parse_default(text);
        let kinds: Vec<_> = result.directives.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DirectiveKind::Presence, DirectiveKind::Emotion, DirectiveKind::Presence]
        );
        assert_eq!(result.directives[2].field("hair"), Some("loose"));
        assert_eq!(result.cleaned_text, "a b");
    }

    #[test]
    fn test_malformed_pairs_dropped() {
        let fields = parse_fields("name=joy|garbage|=nokey|novalue=| Valence = 0.4 ");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["name"], "joy");
        assert_eq!(fields["valence"], "0.4");
    }

    #[test]
    fn test_value_keeps_equals_and_case() {
        let fields = parse_fields("trigger=User said a=b|Name=Joy");
        assert_eq!(fields["trigger"], "User said a=b");
        assert_eq!(fields["name"], "Joy");
    }

    #[test]
    fn test_persona_tag_without_payload() {
        let result = parse_default("x [[emotion]] y");
        assert_eq!(result.cleaned_text, "x y");
        assert_eq!(result.directives.len(), 1);
        assert!(result.directives[0].fields.is_empty());
    }

    #[test]
    fn test_audio_tag() {
        let result = parse_default("[[audio_as_voice]] Hello there");
        assert!(result.audio_as_voice);
        assert_eq!(result.cleaned_text, "Hello there");

        let keep = ParseOptions {
            strip_audio_tag: false,
            ..Default::default()
        };
        let result = parse("[[ Audio_As_Voice ]] Hello", &keep);
        assert!(result.audio_as_voice);
        assert_eq!(result.cleaned_text, "[[ Audio_As_Voice ]] Hello");
    }

    #[test]
    fn test_reply_last_explicit_wins() {
        let text = "[[reply_to: A]] one [[reply_to_current]] two [[reply_to:B]] three";
        let result = parse(text, &ParseOptions::default().with_message_id("m1"));
        assert_eq!(result.reply_target.explicit_id.as_deref(), Some("B"));
        assert!(result.reply_target.current_requested);
        assert_eq!(result.reply_to_id.as_deref(), Some("B"));
        assert_eq!(result.cleaned_text, "one two three");
    }

    #[test]
    fn test_reply_to_current_uses_caller_id() {
        let result = parse("[[reply_to_current]]", &ParseOptions::default().with_message_id("m1"));
        assert!(result.reply_target.current_requested);
        assert_eq!(result.reply_target.explicit_id, None);
        assert_eq!(result.reply_to_id.as_deref(), Some("m1"));
        assert_eq!(result.cleaned_text, "");
    }

    #[test]
    fn test_reply_tags_kept_when_not_stripping() {
        let opts = ParseOptions {
            strip_reply_tags: false,
            ..Default::default()
        };
        let result = parse("ok [[reply_to: 42]]", &opts);
        assert_eq!(result.reply_to_id.as_deref(), Some("42"));
        assert_eq!(result.cleaned_text, "ok [[reply_to: 42]]");
    }

    #[test]
    fn test_empty_explicit_reply_ignored() {
        let result = parse_default("hi [[reply_to:   ]]");
        assert_eq!(result.reply_target.explicit_id, None);
        assert_eq!(result.cleaned_text, "hi");
    }

    #[test]
    fn test_narration_rewritten_in_place() {
        let result = parse_default("Hello. [[narration: *they wave from the doorway*]] How are you?");
        assert_eq!(result.cleaned_text, "Hello. *they wave from the doorway* How are you?");
        assert_eq!(result.narration_segments, vec!["they wave from the doorway"]);
    }

    #[test]
    fn test_narration_order_and_multiline() {
        let text = "[[narration: _first_]]\n[[Narration:\nsecond part]]";
        let result = parse_default(text);
        assert_eq!(result.narration_segments, vec!["first", "second part"]);
        assert_eq!(result.cleaned_text, "*first*\n*second part*");
    }

    #[test]
    fn test_empty_narration_removed() {
        let result = parse_default("a [[narration: ** ]] b");
        assert!(result.narration_segments.is_empty());
        assert_eq!(result.cleaned_text, "a b");
    }

    #[test]
    fn test_persona_tags_kept_when_not_stripping() {
        let opts = ParseOptions {
            strip_persona_tags: false,
            ..Default::default()
        };
        let text = "hi [[emotion: name=joy]] [[narration: waves]]";
        let result = parse(text, &opts);
        assert_eq!(result.cleaned_text, text);
        assert_eq!(result.directives.len(), 1);
        assert_eq!(result.narration_segments, vec!["waves"]);
    }

    #[test]
    fn test_unknown_tags_untouched() {
        let result = parse_default("see [[wiki: Rust]] and [[emotion: name=joy]]");
        assert_eq!(result.cleaned_text, "see [[wiki: Rust]] and");
        assert_eq!(result.directives.len(), 1);
    }

    #[test]
    fn test_spliced_tag_is_also_removed() {
        let result = parse_default("[[ [[emotion: name=joy]] audio_as_voice]] ok");
        assert!(result.audio_as_voice);
        assert_eq!(result.directives.len(), 1);
        assert_eq!(result.cleaned_text, "ok");
        assert!(!contains_tag(&result.cleaned_text));
    }

    #[test]
    fn test_unterminated_persona_tag_does_not_swallow_next() {
        let result = parse_default("[[emotion: name=joy and then [[presence: posture=sitting]]");
        assert_eq!(result.directives.len(), 1);
        assert_eq!(result.directives[0].kind, DirectiveKind::Presence);
        assert_eq!(result.cleaned_text, "[[emotion: name=joy and then");
    }

    #[test]
    fn test_unterminated_narration_does_not_swallow_next() {
        let result =
            parse_default("[[narration: they wave and then [[emotion: name=joy|valence=0.8]] ok");
        assert_eq!(result.directives.len(), 1);
        assert_eq!(result.directives[0].kind, DirectiveKind::Emotion);
        assert_eq!(result.directives[0].fields["name"], "joy");
        assert!(result.narration_segments.is_empty());
        assert_eq!(result.cleaned_text, "[[narration: they wave and then ok");
    }

    #[test]
    fn test_narration_with_single_brackets() {
        let result = parse_default("[[narration: they point at [the map] ]] done");
        assert_eq!(result.narration_segments, vec!["they point at [the map]"]);
        assert_eq!(result.cleaned_text, "*they point at [the map]* done");
    }

    #[test]
    fn test_spliced_tag_removed_when_other_families_kept() {
        let opts = ParseOptions {
            strip_audio_tag: false,
            strip_reply_tags: false,
            ..Default::default()
        };
        let text = "[[ [[emotion: name=joy]] presence: posture=sitting]] ok [[reply_to: 7]]";
        let result = parse(text, &opts);
        let kinds: Vec<_> = result.directives.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DirectiveKind::Emotion, DirectiveKind::Presence]);
        assert_eq!(result.reply_to_id.as_deref(), Some("7"));
        assert_eq!(result.cleaned_text, "ok [[reply_to: 7]]");
    }

    #[test]
    fn test_rescan_does_not_reinterpret_kept_tags() {
        let opts = ParseOptions {
            strip_persona_tags: false,
            ..Default::default()
        };
        let text = "[[emotion: name=joy]] [[ [[reply_to: a]] reply_to: b]] x";
        let result = parse(text, &opts);
        assert_eq!(result.directives.len(), 1);
        assert_eq!(result.reply_to_id.as_deref(), Some("b"));
        assert_eq!(result.cleaned_text, "[[emotion: name=joy]] x");
    }

    #[test]
    fn test_whitespace_around_newlines_collapsed() {
        let result = parse_default("line one [[emotion: name=calm]]  \n   line two");
        assert_eq!(result.cleaned_text, "line one\nline two");
    }

    #[test]
    fn test_options_from_config() {
        let cfg = ParserConfig {
            strip_audio_tag: false,
            strip_reply_tags: true,
            strip_persona_tags: false,
        };
        let opts = ParseOptions::from(&cfg);
        assert!(!opts.strip_audio_tag);
        assert!(opts.strip_reply_tags);
        assert!(!opts.strip_persona_tags);
        assert!(opts.current_message_id.is_none());
    }
}
