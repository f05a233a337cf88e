//! Heuristic classifier: does this response look like a fixture talking back?
//!
//! Fixture controllers answer a `?`/`help` probe with an ad-hoc command
//! listing. There is no schema to validate against, only texture: lots of
//! `NAME:DESCRIPTION` lines, short bare command tokens, a recognizable
//! vocabulary, and sometimes an explicit help banner. The classifier counts
//! that texture and applies threshold rules tuned against real fixture
//! firmware. The thresholds are carried as configuration defaults, not
//! guarantees — other firmware may need different numbers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Strong vocabulary searched word-boundary-tolerantly across the whole
/// response. Each distinct hit contributes one point of keyword score.
pub const STRONG_KEYWORDS: &[&str] = &[
    "IN", "OUT", "OPEN", "CLOSE", "UP", "DOWN", "RESET", "CLEAR", "STATE", "PRODUCT", "VERSION",
    "HELP", "FIXTURE", "EMPTY", "EMPTY_IN", "STOP", "EMC", "POWER", "PWR", "RELAY", "UART", "USB",
    "RJ45", "INPUT", "CHECK", "SET", "SN", "READSN",
];

/// Phrases that mark an explicit help/command listing. The misspelled
/// variants appear verbatim in shipped fixture firmware.
const HELP_MARKERS: &[&str] = &[
    "CONTROL CAMMAND",
    "CONTROL COMMAND",
    "THIS IS THE HELP COMMAND",
    "SHOW ALL THE COMMANDS",
    "GET CAMMAND INFO",
    "GET COMMAND INFO",
    "SHOW_COMMAND",
];

/// Tokens a fixture echoes as whole lines in terse command listings.
const FIXTURE_TOKENS: &[&str] = &[
    "?",
    "HELP",
    "SHOW_COMMAND",
    "OPEN",
    "CLOSE",
    "IN",
    "OUT",
    "UP",
    "DOWN",
    "RESET",
    "CLEAR",
    "STOP",
    "STATE",
    "VERSION",
    "PWR_ON",
    "PWR_OFF",
    "FIXTURE_IN",
    "FIXTURE_OUT",
    "GOHOME",
    "READSN",
];

/// Boot-banner/info prefixes that disqualify a line from the simple
/// command-like form (firmware version strings, flash-size banners, serial
/// number echoes).
const INFO_PREFIXES: &[&str] = &["MCU", "APP", "BOOT", "INITIAL", "SN:", "BJ_", "FW"];

/// `KEY : VALUE` colon-definition form, the dominant shape of help dumps.
static RE_COLON_CMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[A-Za-z0-9_?]+\s*:\s*.+$").expect("valid colon regex"));

/// 1-2 token simple form, e.g. `RESET` or `power on`.
static RE_SIMPLE_CMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[A-Za-z0-9_?]+(?:\s+[A-Za-z0-9_?]+)?\s*$").expect("valid simple regex")
});

/// Per-line timestamp prefix of the form `[HH:MM:SS:mmm]`.
static RE_TIMESTAMP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[\d{2}:\d{2}:\d{2}:\d{3}\]\s*").expect("valid timestamp regex"));

/// One boundary-tolerant pattern per strong keyword. `_` counts as a word
/// character, so `EMPTY` does not fire inside `EMPTY_IN`.
static KEYWORD_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    STRONG_KEYWORDS
        .iter()
        .map(|kw| {
            let pattern = format!("(^|[^A-Z0-9_]){}([^A-Z0-9_]|$)", regex::escape(kw));
            (*kw, Regex::new(&pattern).expect("valid keyword regex"))
        })
        .collect()
});

/// Decision thresholds for the fixture verdict.
///
/// Defaults were tuned against specific fixture firmware; they are exposed
/// through configuration rather than hardcoded because they do not provably
/// generalize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// With a help marker present: colon definitions needed.
    pub marker_colon_defs: u32,
    /// With a help marker present: exact vocabulary lines needed.
    pub marker_token_lines: u32,
    /// With a help marker present: command-like lines needed.
    pub marker_command_lines: u32,
    /// Colon definitions that alone confirm a fixture.
    pub colon_defs_alone: u32,
    /// Token lines needed for the bare-token rule.
    pub token_lines_floor: u32,
    /// Keyword hits needed alongside `token_lines_floor`.
    pub token_keyword_floor: u32,
    /// Token lines needed alongside a `CMD=` assignment line.
    pub cmd_assign_token_lines: u32,
    /// Keyword hits needed alongside a `CMD=` assignment line.
    pub cmd_assign_keywords: u32,
    /// Score bonus for a help marker.
    pub help_marker_bonus: u32,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            marker_colon_defs: 3,
            marker_token_lines: 6,
            marker_command_lines: 8,
            colon_defs_alone: 6,
            token_lines_floor: 8,
            token_keyword_floor: 2,
            cmd_assign_token_lines: 4,
            cmd_assign_keywords: 2,
            help_marker_bonus: 6,
        }
    }
}

/// Everything the classifier measured about one response, plus the verdict.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// The verdict: does this response look like a fixture's listing?
    pub is_fixture: bool,
    /// Composite evidence score (always non-negative, kept for diagnostics
    /// and best-so-far comparison even when the verdict is negative).
    pub score: u32,
    /// Lines matching any command-like form.
    pub command_lines: u32,
    /// Lines in `KEY : VALUE` colon-definition form.
    pub colon_definitions: u32,
    /// Lines exactly matching the fixture token vocabulary.
    pub token_lines: u32,
    /// Whether an explicit help-marker phrase was present.
    pub has_help_marker: bool,
    /// Distinct strong keywords found.
    pub matched_keywords: BTreeSet<String>,
    /// The normalized lines the verdict was computed from.
    pub lines: Vec<String>,
}

impl Classification {
    fn empty() -> Self {
        Self {
            is_fixture: false,
            score: 0,
            command_lines: 0,
            colon_definitions: 0,
            token_lines: 0,
            has_help_marker: false,
            matched_keywords: BTreeSet::new(),
            lines: Vec::new(),
        }
    }
}

/// Normalize a raw response into trimmed, timestamp-stripped lines.
///
/// CR is folded into LF first so `CR`-only devices still split into lines;
/// empty lines are dropped.
pub fn normalize_lines(raw: &str) -> Vec<String> {
    raw.replace('\r', "\n")
        .split('\n')
        .map(|line| RE_TIMESTAMP_PREFIX.replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Whether a normalized line looks like one entry of a command listing.
fn is_command_like(line: &str) -> bool {
    if RE_COLON_CMD.is_match(line) {
        return true;
    }

    let upper = line.to_uppercase();
    if upper.starts_with("CMD=") {
        return true;
    }

    if RE_SIMPLE_CMD.is_match(line) {
        // Status noise and boot banners also fit the 1-2 token shape;
        // they carry no evidence of a command listing.
        if matches!(upper.as_str(), "OK" | "NG" | "<BREAK>") {
            return false;
        }
        if INFO_PREFIXES.iter().any(|p| upper.starts_with(p)) {
            return false;
        }
        return true;
    }

    false
}

/// Distinct strong keywords present in the joined, uppercased text.
fn extract_keywords(text_upper: &str) -> BTreeSet<String> {
    KEYWORD_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text_upper))
        .map(|(kw, _)| (*kw).to_string())
        .collect()
}

/// Classify an already-normalized line set.
///
/// Decision rules are evaluated in order, first match wins; a non-fixture
/// verdict still carries the full evidence for diagnostics.
pub fn classify_lines(lines: Vec<String>, thresholds: &ClassifierThresholds) -> Classification {
    if lines.is_empty() {
        return Classification::empty();
    }

    let text_upper = lines.join(" ").to_uppercase();
    let has_help_marker = HELP_MARKERS.iter().any(|m| text_upper.contains(m));

    let mut command_lines = 0u32;
    let mut colon_definitions = 0u32;
    let mut token_lines = 0u32;
    let mut has_cmd_assign = false;

    for line in &lines {
        if is_command_like(line) {
            command_lines += 1;
        }
        if RE_COLON_CMD.is_match(line) {
            colon_definitions += 1;
        }
        let upper = line.to_uppercase();
        if FIXTURE_TOKENS.iter().any(|t| *t == upper) {
            token_lines += 1;
        }
        if upper.starts_with("CMD=") {
            has_cmd_assign = true;
        }
    }

    let matched_keywords = extract_keywords(&text_upper);
    let kw_score = matched_keywords.len() as u32;

    let score = kw_score
        + 2 * colon_definitions
        + token_lines
        + if has_help_marker {
            thresholds.help_marker_bonus
        } else {
            0
        };

    let is_fixture = if has_help_marker
        && (colon_definitions >= thresholds.marker_colon_defs
            || token_lines >= thresholds.marker_token_lines
            || command_lines >= thresholds.marker_command_lines)
    {
        true
    } else if colon_definitions >= thresholds.colon_defs_alone {
        true
    } else if token_lines >= thresholds.token_lines_floor && kw_score >= thresholds.token_keyword_floor
    {
        true
    } else {
        has_cmd_assign
            && (token_lines >= thresholds.cmd_assign_token_lines
                || kw_score >= thresholds.cmd_assign_keywords)
    };

    Classification {
        is_fixture,
        score,
        command_lines,
        colon_definitions,
        token_lines,
        has_help_marker,
        matched_keywords,
        lines,
    }
}

/// Classify a raw byte response: lossy-decode, normalize, classify.
pub fn classify_bytes(raw: &[u8], thresholds: &ClassifierThresholds) -> Classification {
    let text = String::from_utf8_lossy(raw);
    classify_lines(normalize_lines(&text), thresholds)
}
