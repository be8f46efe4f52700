//! Authenticated session against the Service Layer and the request pipeline
//! every data call goes through.
//!
//! # Design
//! Each call is split into a `build_*` method producing a plain `HttpRequest`
//! and `classify`, which consumes the `HttpResponse`. Between the two the
//! connector prepares its transport and executes the request; nothing else
//! touches the network.
//!
//! `login` and `logout` never return errors: a failed login is recorded and
//! reported through `login_error_msg`, and logout resets the session whatever
//! the remote side answers. `get`, `post` and `patch` return classification
//! errors to the caller. The connector does not check that it is logged in
//! before a data call; unauthenticated calls simply go out without a session
//! cookie.
//!
//! A connector is meant for one thread. Callers needing concurrency use one
//! connector per logical session or wrap it in a mutex.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classify::{classify, decode_body, error_message};
use crate::config::ConnectionParams;
use crate::error::{ConnectorError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::{route_id_from_header, SessionState};
use crate::transport::{Transport, UreqTransport};
use crate::types::{LoginRequest, ResponseOutcome};

pub const LOGIN_PATH: &str = "Login";
pub const LOGOUT_PATH: &str = "Logout";

pub struct ServiceLayerConnector<T: Transport = UreqTransport> {
    params: ConnectionParams,
    session: SessionState,
    transport: T,
}

impl ServiceLayerConnector<UreqTransport> {
    pub fn new(params: ConnectionParams) -> Self {
        let transport = UreqTransport::new(&params);
        Self::with_transport(params, transport)
    }
}

impl<T: Transport> ServiceLayerConnector<T> {
    pub fn with_transport(params: ConnectionParams, transport: T) -> Self {
        Self {
            params,
            session: SessionState::new(),
            transport,
        }
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Open a session. Returns `true` iff the connector is now authenticated.
    pub fn login(&mut self) -> bool {
        self.session.begin_login();
        info!(
            host = %self.params.host(),
            user = %self.params.user(),
            "logging in to service layer"
        );

        match self.try_login() {
            Ok(session_id) => {
                self.session.authenticate(session_id);
                info!(route_id = %self.session.route_id(), "service layer session opened");
                true
            }
            Err(error) => {
                warn!(%error, status = ?error.status(), "service layer login failed");
                self.session.fail(error);
                false
            }
        }
    }

    fn try_login(&mut self) -> Result<String, ConnectorError> {
        let request = self.build_login()?;

        let mut route_id = None;
        let result = self.dispatch(&request, &mut |line| {
            if let Some(found) = route_id_from_header(line) {
                route_id = Some(found);
            }
        });
        self.session.set_route_id(route_id);

        let response = result.map_err(|e| ConnectorError::Connectivity { reason: e.0 })?;
        parse_login(response)
    }

    /// Diagnostic from the last failed login; empty when there is none.
    pub fn login_error_msg(&self) -> String {
        self.session
            .last_login_error()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Close the session on the remote side, then reset local state whatever
    /// the outcome.
    pub fn logout(&mut self) {
        let request = self.build_logout();
        match self.dispatch(&request, &mut |_| {}) {
            Ok(response) => debug!(status = response.status, "logout answered"),
            Err(error) => warn!(%error, "logout request failed"),
        }
        self.session.reset();
        info!("service layer session closed");
    }

    /// Append a raw `Name: value` header to every later request.
    pub fn add_header(&mut self, header: impl Into<String>) {
        self.session.push_header(header.into());
    }

    pub fn get(&mut self, path: &str) -> Result<Value, ConnectorError> {
        let request = self.build_get(path);
        let response = self.dispatch(&request, &mut |_| {})?;
        decoded(classify(response, false)?)
    }

    /// POST `body` as given. An empty body sends no payload. With `raw_mode`
    /// the result is a `ResponseOutcome::Raw` envelope.
    pub fn post(
        &mut self,
        path: &str,
        body: impl AsRef<[u8]>,
        raw_mode: bool,
    ) -> Result<ResponseOutcome, ConnectorError> {
        let request = self.build_post(path, body.as_ref(), raw_mode);
        let response = self.dispatch(&request, &mut |_| {})?;
        classify(response, raw_mode)
    }

    /// PATCH `body` encoded as JSON.
    pub fn patch<B: Serialize + ?Sized>(
        &mut self,
        path: &str,
        body: &B,
    ) -> Result<Value, ConnectorError> {
        let request = self.build_patch(path, body)?;
        let response = self.dispatch(&request, &mut |_| {})?;
        decoded(classify(response, false)?)
    }

    pub fn build_login(&self) -> Result<HttpRequest, ConnectorError> {
        let credentials = LoginRequest {
            user_name: self.params.user(),
            password: self.params.password(),
            company_db: self.params.company_db(),
        };
        let body = serde_json::to_vec(&credentials).map_err(ConnectorError::Serialization)?;
        Ok(self.request(HttpMethod::Post, LOGIN_PATH, Some(body), false))
    }

    pub fn build_logout(&self) -> HttpRequest {
        self.request(HttpMethod::Post, LOGOUT_PATH, None, false)
    }

    pub fn build_get(&self, path: &str) -> HttpRequest {
        self.request(HttpMethod::Get, path, None, false)
    }

    pub fn build_post(&self, path: &str, body: &[u8], raw_mode: bool) -> HttpRequest {
        let body = (!body.is_empty()).then(|| body.to_vec());
        self.request(HttpMethod::Post, path, body, raw_mode)
    }

    pub fn build_patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest, ConnectorError> {
        let body = serde_json::to_vec(body).map_err(ConnectorError::Serialization)?;
        Ok(self.request(HttpMethod::Patch, path, Some(body), false))
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
        capture_headers: bool,
    ) -> HttpRequest {
        HttpRequest {
            method,
            url: self.params.endpoint(path),
            headers: self.session.outgoing_headers().to_vec(),
            body,
            capture_headers,
        }
    }

    fn dispatch(
        &mut self,
        request: &HttpRequest,
        on_header: &mut dyn FnMut(&str),
    ) -> Result<HttpResponse, TransportError> {
        debug!(method = request.method.as_str(), url = %request.url, "dispatching request");
        self.transport.prepare();
        self.transport.execute(request, on_header)
    }
}

fn decoded(outcome: ResponseOutcome) -> Result<Value, ConnectorError> {
    match outcome {
        ResponseOutcome::Decoded(value) => Ok(value),
        ResponseOutcome::Raw(envelope) => {
            decode_body(&envelope.body).map_err(ConnectorError::Decode)
        }
    }
}

/// Login succeeds only on exactly 200 with a non-empty `SessionId`.
fn parse_login(response: HttpResponse) -> Result<String, ConnectorError> {
    let status = response.status;
    let body = decode_body(&response.payload).unwrap_or(Value::Null);

    if status != 200 {
        let message = match error_message(&body) {
            Some(message) => message.to_string(),
            None => format!(
                "unexpected error while logging in to the service layer: {}",
                render_body(&body, &response.payload)
            ),
        };
        return Err(ConnectorError::Authentication { message, status });
    }

    match body.get("SessionId").and_then(Value::as_str) {
        Some(session_id) if !session_id.is_empty() => Ok(session_id.to_string()),
        _ => Err(ConnectorError::Authentication {
            message: format!(
                "login succeeded without a SessionId: {}",
                render_body(&body, &response.payload)
            ),
            status,
        }),
    }
}

fn render_body(decoded: &Value, raw: &[u8]) -> String {
    if decoded.is_null() {
        String::from_utf8_lossy(raw).into_owned()
    } else {
        decoded.to_string()
    }
}
