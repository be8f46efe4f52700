//! Authentication state owned by one connector.
//!
//! # Design
//! `SessionState` is mutated only by the connector's login, logout and
//! `add_header` paths. While authenticated it holds exactly one session
//! cookie header: a new login strips the previous session entries before
//! adding fresh ones, and logout clears everything.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConnectorError;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "B1SESSION";

/// Load-balancer affinity cookie.
pub const ROUTE_COOKIE: &str = "ROUTEID";

/// Empty `Expect` header: tells the transport not to negotiate 100-continue.
pub const EXPECT_SUPPRESSION: &str = "Expect:";

static ROUTE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^set-cookie:.*?\bROUTEID=([^;]+);").expect("ROUTE_ID_RE should compile")
});

/// Extract the route-affinity token from a `Set-Cookie` response header line.
pub fn route_id_from_header(line: &str) -> Option<String> {
    ROUTE_ID_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `Cookie` header sent with every authenticated request.
pub fn session_cookie_header(session_id: &str, route_id: &str) -> String {
    format!("Cookie: {SESSION_COOKIE}={session_id}; {ROUTE_COOKIE}={route_id};")
}

fn is_session_cookie(header: &str) -> bool {
    header
        .strip_prefix("Cookie:")
        .is_some_and(|rest| rest.trim_start().starts_with(&format!("{SESSION_COOKIE}=")))
}

fn is_session_managed(header: &str) -> bool {
    is_session_cookie(header) || header == EXPECT_SUPPRESSION
}

#[derive(Debug, Default)]
pub struct SessionState {
    session_id: String,
    route_id: String,
    authenticated: bool,
    last_login_error: Option<ConnectorError>,
    outgoing_headers: Vec<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Session token; empty when unauthenticated.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Route-affinity token from the last login attempt; empty when unset.
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn outgoing_headers(&self) -> &[String] {
        &self.outgoing_headers
    }

    pub fn last_login_error(&self) -> Option<&ConnectorError> {
        self.last_login_error.as_ref()
    }

    pub fn session_cookie_count(&self) -> usize {
        self.outgoing_headers
            .iter()
            .filter(|header| is_session_cookie(header))
            .count()
    }

    pub(crate) fn push_header(&mut self, header: String) {
        self.outgoing_headers.push(header);
    }

    /// Drop the credentials of any previous session. Caller-added headers
    /// survive so they accompany the login request.
    pub(crate) fn begin_login(&mut self) {
        self.outgoing_headers.retain(|header| !is_session_managed(header));
        self.session_id.clear();
        self.route_id.clear();
        self.authenticated = false;
        self.last_login_error = None;
    }

    pub(crate) fn set_route_id(&mut self, route_id: Option<String>) {
        self.route_id = route_id.unwrap_or_default();
    }

    /// Enter the authenticated state. `session_id` must be non-empty.
    pub(crate) fn authenticate(&mut self, session_id: String) {
        debug_assert!(!session_id.is_empty());
        self.outgoing_headers
            .push(session_cookie_header(&session_id, &self.route_id));
        self.outgoing_headers.push(EXPECT_SUPPRESSION.to_string());
        self.session_id = session_id;
        self.authenticated = true;
    }

    pub(crate) fn fail(&mut self, error: ConnectorError) {
        self.authenticated = false;
        self.session_id.clear();
        self.last_login_error = Some(error);
    }

    /// Back to the unauthenticated baseline: no token, route, headers or
    /// diagnostic.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
