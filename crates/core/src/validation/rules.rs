//! Individual request rules.
//!
//! Each rule is a pure function over a [`BuildRequest`]. A rule reports every
//! message that applies to its field so related checks surface together.

use super::BuildRequest;

/// The line a preset must open with.
pub const PRESET_DECLARATION: &str = "tailwind.config = {";

pub const PRESET_REQUIRED: &str = "The preset field is required.";
pub const PRESET_INVALID_FORMAT: &str =
    "The preset has an invalid format: the first line must be `tailwind.config = {`.";
pub const CONTENT_REQUIRED: &str = "The content field is required.";
pub const CSS_REQUIRED: &str = "The css field is required.";
pub const AGENT_REQUIRED: &str = "The user agent is required.";
pub const UNKNOWN_ORIGIN: &str = "Unknown origin: the user agent is not a recognised client.";

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    Fail(Vec<&'static str>),
}

impl RuleOutcome {
    fn from_messages(messages: Vec<&'static str>) -> Self {
        if messages.is_empty() {
            Self::Pass
        } else {
            Self::Fail(messages)
        }
    }
}

/// A field rule: name of the field it guards plus the predicate.
pub struct Rule {
    pub field: &'static str,
    pub check: fn(&BuildRequest) -> RuleOutcome,
}

/// Field rules in evaluation order. The caller identity check runs after
/// these because it needs a matcher.
pub const FIELD_RULES: &[Rule] = &[
    Rule {
        field: "preset",
        check: preset_rule,
    },
    Rule {
        field: "content",
        check: content_rule,
    },
    Rule {
        field: "css",
        check: css_rule,
    },
];

/// Non-empty, and the first non-blank line is exactly [`PRESET_DECLARATION`].
pub fn preset_rule(request: &BuildRequest) -> RuleOutcome {
    let mut messages = Vec::new();
    if request.preset.is_empty() {
        messages.push(PRESET_REQUIRED);
    }
    if first_non_blank_line(&request.preset) != Some(PRESET_DECLARATION) {
        messages.push(PRESET_INVALID_FORMAT);
    }
    RuleOutcome::from_messages(messages)
}

pub fn content_rule(request: &BuildRequest) -> RuleOutcome {
    required(&request.content, CONTENT_REQUIRED)
}

pub fn css_rule(request: &BuildRequest) -> RuleOutcome {
    required(&request.css, CSS_REQUIRED)
}

fn required(value: &str, message: &'static str) -> RuleOutcome {
    if value.is_empty() {
        RuleOutcome::Fail(vec![message])
    } else {
        RuleOutcome::Pass
    }
}

/// First line that is non-empty after trimming, itself trimmed.
fn first_non_blank_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}
