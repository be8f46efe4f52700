//! Turn a transport response into a `ResponseOutcome` or a `ConnectorError`.
//!
//! # Design
//! Success is any status whose decimal form starts with `2`; 204 and friends
//! get no special treatment. Raw mode splits the payload at the header size
//! the transport reported and trusts it: an offset that lands inside the
//! payload is used as-is even if it is wrong, and only an offset past the end
//! is rejected.

use serde_json::Value;

use crate::error::ConnectorError;
use crate::http::HttpResponse;
use crate::types::{RawEnvelope, ResponseOutcome};

/// Message used when a failed response carries no structured error.
pub const GENERIC_ERROR: &str = "An error has occurred";

pub fn is_success(status: u16) -> bool {
    status.to_string().starts_with('2')
}

/// `error.message.value` of a service layer error body.
pub fn error_message(body: &Value) -> Option<&str> {
    body.get("error")?.get("message")?.get("value")?.as_str()
}

/// Decode a JSON body. An empty body decodes to `Value::Null`.
pub fn decode_body(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
}

pub fn classify(response: HttpResponse, raw_mode: bool) -> Result<ResponseOutcome, ConnectorError> {
    let HttpResponse {
        status,
        header_size,
        mut payload,
    } = response;

    if !is_success(status) {
        let body = if raw_mode {
            payload.get(header_size..).unwrap_or(&payload[..])
        } else {
            &payload[..]
        };
        let message = decode_body(body)
            .ok()
            .as_ref()
            .and_then(error_message)
            .unwrap_or(GENERIC_ERROR)
            .to_string();
        return Err(ConnectorError::Remote { message, status });
    }

    if raw_mode {
        if header_size > payload.len() {
            return Err(ConnectorError::MalformedResponse {
                header_size,
                len: payload.len(),
            });
        }
        let body = payload.split_off(header_size);
        let headers = String::from_utf8_lossy(&payload)
            .lines()
            .map(str::to_string)
            .collect();
        return Ok(ResponseOutcome::Raw(RawEnvelope {
            status,
            headers,
            body,
        }));
    }

    decode_body(&payload)
        .map(ResponseOutcome::Decoded)
        .map_err(ConnectorError::Decode)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            header_size: 0,
            payload: body.as_bytes().to_vec(),
        }
    }

    fn raw_response(status: u16, header: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            header_size: header.len(),
            payload: format!("{header}{body}").into_bytes(),
        }
    }

    #[test]
    fn every_2xx_status_is_success() {
        for status in [200, 201, 204, 299] {
            assert!(is_success(status), "{status}");
        }
        for status in [0, 100, 199, 300, 302, 401, 404, 500] {
            assert!(!is_success(status), "{status}");
        }
    }

    #[test]
    fn decodes_success_body() {
        let outcome = classify(response(200, r#"{"ItemCode":"A1"}"#), false).unwrap();
        assert_eq!(outcome, ResponseOutcome::Decoded(json!({"ItemCode": "A1"})));
    }

    #[test]
    fn empty_success_body_is_null() {
        let outcome = classify(response(204, ""), false).unwrap();
        assert_eq!(outcome, ResponseOutcome::Decoded(Value::Null));
    }

    #[test]
    fn invalid_success_body_is_decode_error() {
        let err = classify(response(200, "not json"), false).unwrap_err();
        assert!(matches!(err, ConnectorError::Decode(_)));
    }

    #[test]
    fn error_status_uses_structured_message() {
        let body = r#"{"error":{"code":-1,"message":{"lang":"en-us","value":"Item not found"}}}"#;
        let err = classify(response(404, body), false).unwrap_err();
        match err {
            ConnectorError::Remote { message, status } => {
                assert_eq!(message, "Item not found");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_status_without_structure_uses_generic_message() {
        let err = classify(response(502, "<html>Bad Gateway</html>"), false).unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::Remote { ref message, status: 502 } if message == GENERIC_ERROR
        ));
    }

    #[test]
    fn raw_mode_splits_headers_and_body() {
        let header = "HTTP/1.1 201 Created\r\nlocation: /b1s/v1/Orders(1)\r\n\r\n";
        let outcome = classify(raw_response(201, header, r#"{"DocEntry":1}"#), true).unwrap();
        let envelope = outcome.into_raw().unwrap();
        assert_eq!(envelope.status, 201);
        assert_eq!(
            envelope.headers,
            ["HTTP/1.1 201 Created", "location: /b1s/v1/Orders(1)", ""]
        );
        assert_eq!(envelope.body, br#"{"DocEntry":1}"#);
    }

    #[test]
    fn raw_mode_trusts_a_wrong_offset() {
        let mut response = raw_response(200, "HTTP/1.1 200 OK\r\n\r\n", "{}");
        response.header_size -= 2;
        let envelope = classify(response, true).unwrap().into_raw().unwrap();
        assert_eq!(envelope.body, b"\r\n{}");
    }

    #[test]
    fn raw_mode_rejects_offset_past_end() {
        let mut response = raw_response(200, "HTTP/1.1 200 OK\r\n\r\n", "");
        response.header_size = 500;
        let err = classify(response, true).unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::MalformedResponse { header_size: 500, len: 19 }
        ));
    }

    #[test]
    fn raw_mode_error_reads_message_after_headers() {
        let header = "HTTP/1.1 400 Bad Request\r\n\r\n";
        let body = r#"{"error":{"message":{"value":"Invalid document"}}}"#;
        let err = classify(raw_response(400, header, body), true).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 400: Invalid document");
    }
}
