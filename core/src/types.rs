//! Payloads and result shapes of the connector.
//!
//! The connector is payload-agnostic: business bodies travel as pre-encoded
//! bytes or `serde_json::Value`. Only the login body has a fixed schema.

use serde::Serialize;
use serde_json::Value;

/// Credentials sent to the `Login` endpoint.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    #[serde(rename = "UserName")]
    pub user_name: &'a str,
    #[serde(rename = "Password")]
    pub password: &'a str,
    #[serde(rename = "CompanyDB")]
    pub company_db: &'a str,
}

/// Status, header lines and unparsed body of a raw-mode response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnvelope {
    pub status: u16,
    /// Lines of the raw header block, status line first, line endings removed.
    pub headers: Vec<String>,
    /// Payload bytes after the reported header size.
    pub body: Vec<u8>,
}

impl RawEnvelope {
    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Successful outcome of a data call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// JSON body decoded into a generic value.
    Decoded(Value),
    /// Raw mode: status, headers and body left as received.
    Raw(RawEnvelope),
}

impl ResponseOutcome {
    pub fn into_decoded(self) -> Option<Value> {
        match self {
            ResponseOutcome::Decoded(value) => Some(value),
            ResponseOutcome::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<RawEnvelope> {
        match self {
            ResponseOutcome::Raw(envelope) => Some(envelope),
            ResponseOutcome::Decoded(_) => None,
        }
    }
}
