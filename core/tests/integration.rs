//! Full session lifecycle against the live mock service layer.
//!
//! # Design
//! Starts the mock server on a random port, then drives a
//! `ServiceLayerConnector` with the real `UreqTransport` over HTTP: login,
//! data calls in both decoded and raw mode, error classification and logout.

use std::net::SocketAddr;

use b1sl_core::{ConnectionParams, ConnectorError, ServiceLayerConnector};
use serde_json::{json, Value};

/// Run the mock server on a background runtime and return its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn params(addr: SocketAddr, password: &str) -> ConnectionParams {
    ConnectionParams::new("manager", password, "SBODEMOUS", "http://127.0.0.1")
        .with_port(Some(addr.port()))
}

#[test]
fn session_lifecycle() {
    let addr = start_server();
    let mut connector = ServiceLayerConnector::new(params(addr, "1234"));

    // Step 1: login.
    assert!(connector.login(), "login failed: {}", connector.login_error_msg());
    assert_eq!(connector.session().route_id(), mock_server::ROUTE_ID);
    assert_eq!(connector.session().session_cookie_count(), 1);
    let cookie = format!(
        "Cookie: B1SESSION={}; ROUTEID={};",
        connector.session().session_id(),
        mock_server::ROUTE_ID
    );
    assert_eq!(connector.session().outgoing_headers(), [cookie.as_str(), "Expect:"]);

    // Step 2: list — should be empty.
    let items = connector.get("Items").unwrap();
    assert_eq!(items, json!({"value": []}));

    // Step 3: create an item in decoded mode.
    let created = connector
        .post("Items", r#"{"ItemCode":"A1","ItemName":"Desk"}"#, false)
        .unwrap()
        .into_decoded()
        .unwrap();
    assert_eq!(created["ItemCode"], "A1");

    // Step 4: create an order in raw mode.
    let envelope = connector
        .post("Orders", r#"{"CardCode":"C20000"}"#, true)
        .unwrap()
        .into_raw()
        .unwrap();
    assert_eq!(envelope.status, 201);
    assert!(envelope.headers[0].starts_with("HTTP/1.1 201"));
    assert_eq!(envelope.header("location"), Some("/b1s/v1/Orders(1)"));
    let order: Value = serde_json::from_slice(&envelope.body).unwrap();
    assert_eq!(order["DocEntry"], 1);

    // Step 5: patch the item — 204 decodes to null.
    let patched = connector
        .patch("Items('A1')", &json!({"ItemName": "Standing desk"}))
        .unwrap();
    assert_eq!(patched, Value::Null);

    // Step 6: read it back.
    let item = connector.get("Items('A1')").unwrap();
    assert_eq!(item["ItemName"], "Standing desk");

    // Step 7: patch a missing record — remote error with server message.
    let err = connector
        .patch("Items('missing')", &json!({"ItemName": "x"}))
        .unwrap_err();
    match err {
        ConnectorError::Remote { message, status } => {
            assert_eq!(status, 404);
            assert_eq!(message, "No matching records found (ODBC -2028)");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Step 8: logout resets local state.
    connector.logout();
    assert!(!connector.is_authenticated());
    assert!(connector.session().outgoing_headers().is_empty());

    // Step 9: data calls after logout go out without a session and fail.
    let err = connector.get("Items").unwrap_err();
    assert!(matches!(err, ConnectorError::Remote { status: 401, .. }));
}

#[test]
fn invalid_credentials_are_reported() {
    let addr = start_server();
    let mut connector = ServiceLayerConnector::new(params(addr, "wrong"));

    assert!(!connector.login());
    assert!(!connector.is_authenticated());
    assert_eq!(connector.login_error_msg(), "Invalid credentials");
    assert_eq!(connector.session().route_id(), mock_server::ROUTE_ID);
    assert!(connector.session().outgoing_headers().is_empty());
}

#[test]
fn repeated_login_keeps_one_session_cookie() {
    let addr = start_server();
    let mut connector = ServiceLayerConnector::new(params(addr, "1234"));

    assert!(connector.login());
    let first = connector.session().session_id().to_string();
    assert!(connector.login());
    assert_ne!(connector.session().session_id(), first);
    assert_eq!(connector.session().session_cookie_count(), 1);
    assert_eq!(connector.session().outgoing_headers().len(), 2);

    assert!(connector.get("Items").is_ok());
}

#[test]
fn unreachable_server_fails_login() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let params = ConnectionParams::new("manager", "1234", "SBODEMOUS", "http://127.0.0.1")
        .with_port(Some(port))
        .with_timeout(std::time::Duration::from_secs(5));
    let mut connector = ServiceLayerConnector::new(params);

    assert!(!connector.login());
    assert_eq!(connector.login_error_msg(), "can't connect with the service layer");
    assert_eq!(
        connector.session().last_login_error().and_then(ConnectorError::status),
        Some(400)
    );

    // Logout against a dead server still resets.
    connector.logout();
    assert!(!connector.is_authenticated());
    assert_eq!(connector.login_error_msg(), "");
}
