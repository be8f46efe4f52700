//! Blocking connector for the SAP Business One Service Layer.
//!
//! # Overview
//! `ServiceLayerConnector` logs in with a user, password and company
//! database, keeps the resulting `B1SESSION` token and `ROUTEID` affinity
//! cookie, and forwards `get`, `post` and `patch` calls with those credentials
//! attached. Bodies are passed through untouched or as generic JSON; the
//! connector knows nothing about business objects.
//!
//! # Design
//! - `SessionState` is owned by the connector and mutated only by `login`,
//!   `logout` and `add_header`.
//! - Every call is built as a plain `HttpRequest`, executed by a `Transport`
//!   and classified into a `ResponseOutcome` or a `ConnectorError`.
//! - `UreqTransport` is the production transport; tests plug in their own.
//! - Login failures are reported through `login_error_msg`; data-call
//!   failures are returned as errors.
//!
//! ```no_run
//! use b1sl_core::{ConnectionParams, ServiceLayerConnector};
//!
//! let params = ConnectionParams::new("manager", "secret", "SBODEMOUS", "https://sap.local");
//! let mut connector = ServiceLayerConnector::new(params);
//! if !connector.login() {
//!     eprintln!("login failed: {}", connector.login_error_msg());
//!     return;
//! }
//! let items = connector.get("Items?$top=5");
//! connector.logout();
//! # let _ = items;
//! ```

pub mod classify;
pub mod config;
pub mod connector;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;
pub mod types;

pub use classify::{classify, is_success};
pub use config::{ConnectionParams, BASE_PATH, DEFAULT_PORT};
pub use connector::ServiceLayerConnector;
pub use error::{ConfigError, ConnectorError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::SessionState;
pub use transport::{Transport, UreqTransport};
pub use types::{RawEnvelope, ResponseOutcome};
