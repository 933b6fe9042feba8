//! Caller identity recognition.
//!
//! Requests carry a user-agent-like string identifying the calling plugin and
//! the site it runs on. A [`CallerMatcher`] turns that string into a
//! structured [`CallerIdentity`], or rejects it.

/// The parsed client/site pair behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Client name (for WordPress agents, the WordPress version).
    pub client_name: String,
    /// Site the request originates from.
    pub site_identifier: String,
}

/// Recognises caller agent strings.
///
/// Returns `None` when the agent is not a known client or is malformed.
/// Implementations must never panic on arbitrary input.
pub trait CallerMatcher: Send + Sync {
    fn identify(&self, agent: &str) -> Option<CallerIdentity>;
}

/// Marker every recognised WordPress agent carries.
pub const WORDPRESS_MARKER: &str = "WordPress/";

/// Separator between the client segment and the site segment.
pub const SEGMENT_SEPARATOR: &str = "; ";

/// Matches the agent format WordPress sends with outgoing HTTP requests:
/// `WordPress/<version>; <site>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordPressAgentMatcher;

impl CallerMatcher for WordPressAgentMatcher {
    fn identify(&self, agent: &str) -> Option<CallerIdentity> {
        if !agent.contains(WORDPRESS_MARKER) {
            return None;
        }

        let mut segments = agent.split(SEGMENT_SEPARATOR);
        let client = segments.next()?;
        let site = segments.next()?.trim();

        let client_name = client.strip_prefix(WORDPRESS_MARKER).unwrap_or(client).trim();
        if client_name.is_empty() || site.is_empty() {
            return None;
        }

        Some(CallerIdentity {
            client_name: client_name.to_string(),
            site_identifier: site.to_string(),
        })
    }
}
