//! Control-route classification.
//!
//! Incoming paths are matched against a small ordered regex table, first
//! match wins; control patterns are evaluated before the catch-all, so
//! everything unmatched falls through to the dynamic handler.

use once_cell::sync::Lazy;
use regex::Regex;

/// Where a request path is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// `/_` service descriptor.
    Home,
    /// `/_register` policy registration.
    Register,
    /// `/_history` rolling request log.
    History,
    /// `/_reset` flush registry and history.
    Reset,
    /// Everything else: resolved against the registry.
    Dynamic,
}

static CONTROL_ROUTES: Lazy<Vec<(Regex, RouteKind)>> = Lazy::new(|| {
    [
        ("^/_register$", RouteKind::Register),
        ("^/_history$", RouteKind::History),
        ("^/_reset$", RouteKind::Reset),
        ("^/_$", RouteKind::Home),
    ]
    .into_iter()
    .map(|(pattern, kind)| {
        (
            Regex::new(pattern).expect("control route patterns are static"),
            kind,
        )
    })
    .collect()
});

/// Classify `path`. Never fails: an unmatched path is [`RouteKind::Dynamic`].
pub fn classify(path: &str) -> RouteKind {
    CONTROL_ROUTES
        .iter()
        .find(|(pattern, _)| pattern.is_match(path))
        .map(|(_, kind)| *kind)
        .unwrap_or(RouteKind::Dynamic)
}
