use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// Affinity cookie value handed out on every login attempt.
pub const ROUTE_ID: &str = ".node1";

/// Credentials the mock accepts.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub company_db: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            user: "manager".to_string(),
            password: "1234".to_string(),
            company_db: "SBODEMOUS".to_string(),
        }
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "CompanyDB")]
    pub company_db: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "SessionId")]
    pub session_id: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "SessionTimeout")]
    pub session_timeout: u32,
}

#[derive(Default)]
pub struct Store {
    sessions: HashSet<String>,
    entities: HashMap<String, BTreeMap<String, Map<String, Value>>>,
    next_doc_entry: u64,
}

#[derive(Clone)]
pub struct AppState {
    credentials: Arc<Credentials>,
    store: Arc<RwLock<Store>>,
}

pub fn app() -> Router {
    app_with(Credentials::default())
}

pub fn app_with(credentials: Credentials) -> Router {
    let state = AppState {
        credentials: Arc::new(credentials),
        store: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route("/b1s/v1/Login", post(login))
        .route("/b1s/v1/Logout", post(logout))
        .route(
            "/b1s/v1/{resource}",
            get(get_resource).post(create_resource).patch(update_resource),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error_body(status: StatusCode, code: i64, message: &str) -> Response {
    let body = json!({
        "error": {
            "code": code,
            "message": { "lang": "en-us", "value": message }
        }
    });
    (status, Json(body)).into_response()
}

fn route_cookie() -> String {
    format!("ROUTEID={ROUTE_ID}; path=/b1s")
}

async fn login(State(state): State<AppState>, body: Bytes) -> Response {
    let Ok(input) = serde_json::from_slice::<LoginRequest>(&body) else {
        return (
            [(header::SET_COOKIE, route_cookie())],
            error_body(StatusCode::BAD_REQUEST, -1, "Invalid login payload"),
        )
            .into_response();
    };

    let expected = &state.credentials;
    if input.user_name != expected.user
        || input.password != expected.password
        || input.company_db != expected.company_db
    {
        debug!(user = %input.user_name, "rejecting login");
        return (
            [(header::SET_COOKIE, route_cookie())],
            error_body(StatusCode::UNAUTHORIZED, 100000027, "Invalid credentials"),
        )
            .into_response();
    }

    let session_id = Uuid::new_v4().to_string();
    state.store.write().await.sessions.insert(session_id.clone());
    debug!(user = %input.user_name, "session opened");

    let response = LoginResponse {
        session_id: session_id.clone(),
        version: "1000190".to_string(),
        session_timeout: 30,
    };
    (
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, format!("B1SESSION={session_id}; HttpOnly;")),
            (header::SET_COOKIE, route_cookie()),
        ]),
        Json(response),
    )
        .into_response()
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(session_id) = session_cookie(&headers) {
        state.store.write().await.sessions.remove(&session_id);
    }
    StatusCode::NO_CONTENT
}

/// `B1SESSION` value from the `Cookie` header, if any.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| pair.trim().strip_prefix("B1SESSION="))
        .map(str::to_string)
}

/// Split `Items('A1')` into `("Items", Some("A1"))`, `Orders(7)` into
/// `("Orders", Some("7"))` and `Items` into `("Items", None)`.
pub fn parse_resource(resource: &str) -> (&str, Option<&str>) {
    match resource.split_once('(') {
        Some((entity, rest)) if rest.ends_with(')') => {
            let key = rest.trim_end_matches(')').trim_matches('\'');
            (entity, Some(key))
        }
        _ => (resource, None),
    }
}

async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let valid = match session_cookie(headers) {
        Some(session_id) => state.store.read().await.sessions.contains(&session_id),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(error_body(
            StatusCode::UNAUTHORIZED,
            301,
            "Invalid session or session already timeout.",
        ))
    }
}

/// Entities keyed by a caller-supplied code; everything else gets a
/// generated `DocEntry`.
fn key_field(entity: &str) -> Option<&'static str> {
    match entity {
        "Items" => Some("ItemCode"),
        "BusinessPartners" => Some("CardCode"),
        _ => None,
    }
}

fn not_found() -> Response {
    error_body(
        StatusCode::NOT_FOUND,
        -2028,
        "No matching records found (ODBC -2028)",
    )
}

async fn get_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(resource): Path<String>,
) -> Response {
    if let Err(response) = require_session(&state, &headers).await {
        return response;
    }
    let (entity, key) = parse_resource(&resource);
    let store = state.store.read().await;
    let records = store.entities.get(entity);

    match key {
        None => {
            let values: Vec<&Map<String, Value>> =
                records.map(|r| r.values().collect()).unwrap_or_default();
            Json(json!({ "value": values })).into_response()
        }
        Some(key) => match records.and_then(|r| r.get(key)) {
            Some(record) => Json(record.clone()).into_response(),
            None => not_found(),
        },
    }
}

async fn create_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(resource): Path<String>,
    body: Bytes,
) -> Response {
    if let Err(response) = require_session(&state, &headers).await {
        return response;
    }
    let (entity, None) = parse_resource(&resource) else {
        return error_body(StatusCode::BAD_REQUEST, -1, "Cannot create with a key in the path");
    };
    let Ok(Value::Object(mut record)) = serde_json::from_slice::<Value>(&body) else {
        return error_body(StatusCode::BAD_REQUEST, -1, "Invalid JSON payload");
    };

    let mut store = state.store.write().await;
    let key = match key_field(entity)
        .and_then(|field| record.get(field))
        .and_then(Value::as_str)
    {
        Some(code) => format!("'{code}'"),
        None => {
            store.next_doc_entry += 1;
            let entry = store.next_doc_entry;
            record.insert("DocEntry".to_string(), json!(entry));
            entry.to_string()
        }
    };

    let stored_key = key.trim_matches('\'').to_string();
    let records = store.entities.entry(entity.to_string()).or_default();
    if records.contains_key(&stored_key) {
        return error_body(
            StatusCode::BAD_REQUEST,
            -10,
            &format!("{entity} {stored_key} already exists"),
        );
    }
    records.insert(stored_key, record.clone());

    (
        StatusCode::CREATED,
        [(header::LOCATION, format!("/b1s/v1/{entity}({key})"))],
        Json(record),
    )
        .into_response()
}

async fn update_resource(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(resource): Path<String>,
    body: Bytes,
) -> Response {
    if let Err(response) = require_session(&state, &headers).await {
        return response;
    }
    let (entity, Some(key)) = parse_resource(&resource) else {
        return error_body(StatusCode::BAD_REQUEST, -1, "PATCH requires a key in the path");
    };
    let Ok(Value::Object(changes)) = serde_json::from_slice::<Value>(&body) else {
        return error_body(StatusCode::BAD_REQUEST, -1, "Invalid JSON payload");
    };

    let mut store = state.store.write().await;
    let Some(record) = store
        .entities
        .get_mut(entity)
        .and_then(|records| records.get_mut(key))
    else {
        return not_found();
    };
    record.extend(changes);
    StatusCode::NO_CONTENT.into_response()
}
