//! Low-level request execution.
//!
//! # Design
//! `Transport` is the I/O seam of the connector: the pipeline hands it a
//! fully built `HttpRequest` and a header observer, and gets back the status,
//! header size and payload. Tests swap in scripted transports; production
//! uses `UreqTransport`.
//!
//! `UreqTransport` owns a single `ureq::Agent`, built on first use and reused
//! for every later call. It is dropped with the connector. Status codes are
//! returned as data, never as errors, so the classifier sees every response.
//! Redirects are not followed: a 3xx reaches the classifier like any other
//! non-2xx status. Bodies are read in full with no size cap.
//!
//! `ureq` is built without its `gzip` feature. No `Accept-Encoding` is sent
//! and bodies are never decompressed, so a raw envelope's `content-encoding`
//! and `content-length` always describe the bytes it carries.

use std::time::Duration;

use tracing::{debug, trace, warn};
use ureq::tls::TlsConfig;
use ureq::{Agent, RequestBuilder};

use crate::config::ConnectionParams;
use crate::error::TransportError;
use crate::http::{split_header, HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    /// Ready the handle for the next request. Called before every `execute`.
    fn prepare(&mut self) {}

    /// Execute `request`, reporting the status line and every response
    /// header line to `on_header` as they are read.
    fn execute(
        &mut self,
        request: &HttpRequest,
        on_header: &mut dyn FnMut(&str),
    ) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by `ureq`.
pub struct UreqTransport {
    timeout: Option<Duration>,
    verify_certificates: bool,
    agent: Option<Agent>,
}

impl UreqTransport {
    pub fn new(params: &ConnectionParams) -> Self {
        Self {
            timeout: params.timeout(),
            verify_certificates: params.verifies_certificates(),
            agent: None,
        }
    }

    fn agent(&mut self) -> &Agent {
        let (timeout, verify) = (self.timeout, self.verify_certificates);
        self.agent.get_or_insert_with(|| {
            debug!(?timeout, verify_certificates = verify, "creating HTTP agent");
            let tls = TlsConfig::builder().disable_verification(!verify).build();
            Agent::config_builder()
                .http_status_as_error(false)
                .max_redirects(0)
                .tls_config(tls)
                .timeout_global(timeout)
                .build()
                .new_agent()
        })
    }
}

impl Transport for UreqTransport {
    fn prepare(&mut self) {
        self.agent();
    }

    fn execute(
        &mut self,
        request: &HttpRequest,
        on_header: &mut dyn FnMut(&str),
    ) -> Result<HttpResponse, TransportError> {
        let agent = self.agent();
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => with_headers(agent.get(&request.url), &request.headers).call(),
            HttpMethod::Post => {
                let builder = with_headers(agent.post(&request.url), &request.headers);
                match body {
                    Some(body) => builder.send(body),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Patch => {
                let builder = with_headers(agent.patch(&request.url), &request.headers);
                match body {
                    Some(body) => builder.send(body),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let status_line = format!("{:?} {status}", response.version());
        on_header(&status_line);
        let mut block = format!("{status_line}\r\n");
        for (name, value) in response.headers() {
            let line = format!("{name}: {}", String::from_utf8_lossy(value.as_bytes()));
            on_header(&line);
            block.push_str(&line);
            block.push_str("\r\n");
        }
        block.push_str("\r\n");

        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| TransportError(e.to_string()))?;
        trace!(status = status.as_u16(), len = body.len(), "response received");

        let header_size = block.len();
        let payload = if request.capture_headers {
            let mut payload = block.into_bytes();
            payload.extend_from_slice(&body);
            payload
        } else {
            body
        };

        Ok(HttpResponse {
            status: status.as_u16(),
            header_size,
            payload,
        })
    }
}

/// Apply raw header strings. An empty value suppresses the header instead of
/// sending it.
fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[String]) -> RequestBuilder<B> {
    for raw in headers {
        match split_header(raw) {
            Some((_, "")) => {}
            Some((name, value)) => builder = builder.header(name, value),
            None => warn!(header = %raw, "skipping malformed header"),
        }
    }
    builder
}
