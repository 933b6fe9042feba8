//! Build request validation.
//!
//! Rules run in a fixed order and the first failing rule short-circuits the
//! chain. A request that passes yields the recognised [`CallerIdentity`].

pub mod rules;

use serde::Deserialize;

use crate::caller::{CallerIdentity, CallerMatcher};
use rules::{RuleOutcome, AGENT_REQUIRED, FIELD_RULES, UNKNOWN_ORIGIN};

/// One compilation request.
///
/// Missing body fields deserialize to empty strings, which the rules then
/// reject. `caller_agent` comes from the request headers, never the body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildRequest {
    pub css: String,
    pub preset: String,
    pub content: String,
    #[serde(skip)]
    pub caller_agent: String,
}

/// A rejected request, carrying the field that failed and its messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .messages.join(" "))]
pub struct ValidationError {
    pub field: &'static str,
    pub messages: Vec<&'static str>,
}

/// Run the full rule chain against `request`.
pub fn validate(
    request: &BuildRequest,
    matcher: &dyn CallerMatcher,
) -> Result<CallerIdentity, ValidationError> {
    for rule in FIELD_RULES {
        if let RuleOutcome::Fail(messages) = (rule.check)(request) {
            return Err(ValidationError {
                field: rule.field,
                messages,
            });
        }
    }

    identify_caller(&request.caller_agent, matcher)
}

fn identify_caller(
    agent: &str,
    matcher: &dyn CallerMatcher,
) -> Result<CallerIdentity, ValidationError> {
    let message = if agent.is_empty() {
        AGENT_REQUIRED
    } else {
        match matcher.identify(agent) {
            Some(identity) => return Ok(identity),
            None => UNKNOWN_ORIGIN,
        }
    };

    Err(ValidationError {
        field: "caller_agent",
        messages: vec![message],
    })
}
