//! HTTP request and response values exchanged with a `Transport`.
//!
//! # Design
//! The pipeline describes each call as a plain `HttpRequest` and receives a
//! plain `HttpResponse`; only the transport touches the network. Headers stay
//! raw `Name: value` strings because callers may inject arbitrary ones through
//! `add_header`.
//!
//! `HttpResponse` mirrors what a curl-style handle reports: the status, the
//! byte length of the raw header block, and the payload. The payload starts
//! with the header block only when the request set `capture_headers`.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<String>,
    pub body: Option<Vec<u8>>,
    /// Prefix the response payload with the raw header block.
    pub capture_headers: bool,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Length in bytes of the raw header block, status line included.
    pub header_size: usize,
    pub payload: Vec<u8>,
}

/// Split a raw `Name: value` header string.
///
/// Returns `None` when there is no `:`. The value is trimmed and may be empty.
pub fn split_header(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}
