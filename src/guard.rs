//! Route guard.
//!
//! Decides, from a path and whether a session cookie is present, whether a
//! request may proceed or where it should be sent instead.

use serde::Serialize;

use crate::model::DayKey;

/// Routes reachable without a session. Matched by prefix.
pub const PUBLIC_ROUTES: [&str; 4] = ["/login", "/register", "/verify", "/verify-notice"];

pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    Redirect { location: String },
}

pub fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES.iter().any(|route| path.starts_with(route))
}

/// Daily view for `day`.
pub fn dashboard_path(day: DayKey) -> String {
    format!("/dashboard/{day}")
}

pub fn check(path: &str, has_session: bool, today: DayKey) -> GuardDecision {
    match (has_session, is_public(path)) {
        (false, false) => GuardDecision::Redirect {
            location: LOGIN_ROUTE.to_string(),
        },
        (true, true) => GuardDecision::Redirect {
            location: dashboard_path(today),
        },
        _ => GuardDecision::Allow,
    }
}
