// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # LLM Response Repair Pipeline
//!
//! Recovers a JSON value from free-form model output. Models reliably break
//! strict JSON in a handful of ways; each stage below undoes one of them.
//!
//! 1. **Fence extraction**: take the interior of a ```` ```json ```` block.
//! 2. **Direct parse**: fenced interior, then raw text.
//! 3. **Bracket matching**: from the first `{`/`[`, walk to the matching
//!    close bracket, skipping anything inside string literals.
//! 4. **Template literals**: `` `...` `` values become JSON strings.
//! 5. **Truncation**: an unterminated array is cut back to its last complete
//!    element and closed.
//! 6. **Control characters**: raw newlines/tabs inside strings are escaped
//!    and trailing commas removed.
//!
//! Stages 3–6 run on the fenced interior first and then on the raw text;
//! the first candidate that parses wins. Everything here is pure string
//! processing, no I/O.

use serde_json::Value;

use crate::domain::repair::{RepairError, ResponseParser};

const DEFAULT_PREVIEW_CHARS: usize = 200;
const FENCE: &str = "```";

#[derive(Debug, Clone)]
pub struct ResponseRepairPipeline {
    preview_chars: usize,
}

impl Default for ResponseRepairPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseRepairPipeline {
    pub fn new() -> Self {
        Self {
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Number of leading characters kept in `RepairError::Unparsable::preview`
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    pub fn repair(&self, raw: &str) -> Result<Value, RepairError> {
        let fenced = extract_fenced_block(raw);

        for candidate in fenced.into_iter().chain(std::iter::once(raw)) {
            if let Ok(value) = serde_json::from_str::<Value>(candidate.trim()) {
                return Ok(value);
            }
        }

        let mut reason = String::from("no JSON object or array found");
        for source in fenced.into_iter().chain(std::iter::once(raw)) {
            match repair_candidate(source) {
                Ok(value) => return Ok(value),
                Err(e) => reason = e,
            }
        }

        Err(RepairError::Unparsable {
            reason,
            preview: raw.chars().take(self.preview_chars).collect(),
        })
    }
}

impl ResponseParser for ResponseRepairPipeline {
    fn parse(&self, raw: &str) -> Result<Value, RepairError> {
        self.repair(raw)
    }
}

fn repair_candidate(source: &str) -> Result<Value, String> {
    let extracted =
        extract_balanced(source).ok_or_else(|| "no JSON object or array found".to_string())?;

    let mut candidate = normalize_template_literals(extracted.text);
    if extracted.unterminated && candidate.starts_with('[') {
        candidate = close_truncated_array(&candidate);
    }

    if let Ok(value) = serde_json::from_str(&candidate) {
        return Ok(value);
    }

    let escaped = strip_trailing_commas(&escape_control_chars(&candidate));
    serde_json::from_str(&escaped).map_err(|e| e.to_string())
}

// ============================================================================
// Scanner state
// ============================================================================

/// Tracks whether a scan position is inside a `"..."` or `` `...` `` literal.
/// A backslash escapes the following character, so a delimiter preceded by
/// an odd number of backslashes does not end the literal.
#[derive(Debug, Default)]
struct LiteralTracker {
    delimiter: Option<char>,
    escaped: bool,
}

impl LiteralTracker {
    /// Feed one character. Returns `true` if it belongs to a literal,
    /// delimiters included.
    fn step(&mut self, c: char) -> bool {
        match self.delimiter {
            Some(delimiter) => {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == delimiter {
                    self.delimiter = None;
                }
                true
            }
            None if c == '"' || c == '`' => {
                self.delimiter = Some(c);
                true
            }
            None => false,
        }
    }

    fn in_literal(&self) -> bool {
        self.delimiter.is_some()
    }
}

// ============================================================================
// Stage 1: fences
// ============================================================================

/// Interior of the fenced block wrapping the payload. A fence that sits
/// inside a string literal of an outer JSON value is string content, not the
/// wrapper. An opening fence with no closing fence yields the rest of the text.
fn extract_fenced_block(text: &str) -> Option<&str> {
    let open = text.find(FENCE)?;
    if fence_inside_literal(text, open) {
        return None;
    }

    let rest = strip_language_tag(&text[open + FENCE.len()..]);
    let interior = match rest.rfind(FENCE) {
        Some(close) => &rest[..close],
        None => rest,
    };
    Some(interior.trim())
}

/// Prose before the payload may mention brackets; only a literal opened
/// after the first bracket and still open at the fence disqualifies it.
fn fence_inside_literal(text: &str, open: usize) -> bool {
    let Some(first_bracket) = text[..open].find(['{', '[']) else {
        return false;
    };
    let mut tracker = LiteralTracker::default();
    for c in text[first_bracket..open].chars() {
        tracker.step(c);
    }
    tracker.in_literal()
}

fn strip_language_tag(rest: &str) -> &str {
    let tag_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
        .count();
    if tag_len == 0 {
        return rest;
    }
    match rest[tag_len..].chars().next() {
        None => "",
        Some(c) if c.is_whitespace() || c == '{' || c == '[' => &rest[tag_len..],
        Some(_) => rest,
    }
}

// ============================================================================
// Stage 3: bracket matching
// ============================================================================

struct Extracted<'a> {
    text: &'a str,
    /// The scan reached the end of input before nesting returned to zero
    unterminated: bool,
}

fn extract_balanced(source: &str) -> Option<Extracted<'_>> {
    let start = source.find(['{', '['])?;
    let (open, close) = if source[start..].starts_with('{') {
        ('{', '}')
    } else {
        ('[', ']')
    };

    let mut depth = 0usize;
    let mut tracker = LiteralTracker::default();
    for (offset, c) in source[start..].char_indices() {
        if tracker.step(c) {
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                let end = start + offset + c.len_utf8();
                return Some(Extracted {
                    text: &source[start..end],
                    unterminated: false,
                });
            }
        }
    }

    Some(Extracted {
        text: source[start..].trim_end(),
        unterminated: true,
    })
}

// ============================================================================
// Stage 4: template literals
// ============================================================================

/// Rewrite every backtick literal outside a double-quoted string as a JSON
/// string. Inside the literal, `` \` `` is a backtick and any other
/// backslash is kept as a literal backslash.
fn normalize_template_literals(text: &str) -> String {
    if !text.contains('`') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut chars = text.chars().peekable();
    let mut in_quote = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quote = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_quote = true;
                out.push(c);
            }
            '`' => {
                let mut content = String::new();
                while let Some(t) = chars.next() {
                    match t {
                        '\\' => match chars.peek().copied() {
                            Some('`') => {
                                chars.next();
                                content.push('`');
                            }
                            Some('\\') => {
                                chars.next();
                                content.push_str("\\\\");
                            }
                            _ => content.push('\\'),
                        },
                        '`' => break,
                        other => content.push(other),
                    }
                }
                push_json_string(&mut out, &content);
            }
            _ => out.push(c),
        }
    }

    out
}

fn push_json_string(out: &mut String, content: &str) {
    out.push('"');
    for c in content.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

// ============================================================================
// Stage 5: truncated arrays
// ============================================================================

/// Close an array whose tail was cut off. A final element is kept only when
/// its last character closes it (`}`, `]` or `"`); anything else, including
/// a bare number or keyword, may be a fragment and is dropped at the last
/// top-level comma.
fn close_truncated_array(candidate: &str) -> String {
    let mut depth = 0i32;
    let mut tracker = LiteralTracker::default();
    let mut last_top_level_comma = None;

    for (index, c) in candidate.char_indices() {
        if tracker.step(c) {
            continue;
        }
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth -= 1,
            ',' if depth == 1 => last_top_level_comma = Some(index),
            _ => {}
        }
    }

    if depth == 1 && !tracker.in_literal() {
        let body = candidate.trim_end().trim_end_matches(',').trim_end();
        if matches!(body.chars().last(), Some('}' | ']' | '"' | '[')) {
            return format!("{}]", body);
        }
        return match last_top_level_comma {
            Some(index) => format!("{}]", candidate[..index].trim_end()),
            None => "[]".to_string(),
        };
    }

    match last_top_level_comma {
        Some(index) => format!("{}]", candidate[..index].trim_end()),
        None => format!("{}]", candidate.trim_end()),
    }
}

// ============================================================================
// Stage 6: control characters and trailing commas
// ============================================================================

fn escape_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut tracker = LiteralTracker::default();

    for c in text.chars() {
        let inside = tracker.in_literal();
        tracker.step(c);
        if inside && (c as u32) < 0x20 {
            match c {
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c => out.push_str(&format!("\\u{:04x}", c as u32)),
            }
        } else {
            out.push(c);
        }
    }

    out
}

fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut tracker = LiteralTracker::default();

    for (index, &c) in chars.iter().enumerate() {
        if tracker.step(c) {
            out.push(c);
            continue;
        }
        if c == ',' {
            let next = chars[index + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        out.push(c);
    }

    out
}
