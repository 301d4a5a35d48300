//! # graphql
//!
//! Minimal blocking GraphQL client.
//!
//! This crate provides:
//! - A [`Transport`] trait with an HTTPS implementation and an in-memory mock
//! - Request and response envelopes, with server not-found detection
//! - Mutation `problems` inspection
//! - Relay-style pagination and equality filter envelopes
//!
//! ## Example
//!
//! ```no_run
//! use declarative::Cancellation;
//! use graphql::transport::http::{HttpConfig, HttpTransport};
//! use graphql::{Client, Request};
//!
//! let client = Client::new(HttpTransport::new(HttpConfig {
//!     endpoint: "https://api.example.stacklet.io/".into(),
//!     api_key: "key".into(),
//!     version: "dev".into(),
//!     debug: false,
//!     timeout: None,
//! }));
//!
//! let data: serde_json::Value = client
//!     .query(&Cancellation::new(), Request::query("platform", "{ platform { externalID } }"))
//!     .expect("query failed");
//! ```

pub mod error;
pub mod filter;
pub mod pagination;
pub mod problem;
pub mod request;
pub mod transport;

pub use error::{Error, Result};
pub use filter::Filter;
pub use pagination::{Connection, PageInfo, paginate, paginate_filtered};
pub use request::Request;
pub use transport::{MockTransport, Transport};

use declarative::Cancellation;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::sync::Arc;

/// Shared handle over a transport with typed helpers
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client that owns `transport`.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Create a client over a shared transport.
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Run a query and decode its `data`.
    pub fn query<T: DeserializeOwned>(&self, cancel: &Cancellation, request: Request) -> Result<T> {
        let data = self.transport.execute(cancel, &request)?;
        decode(request.operation_name, data)
    }

    /// Run a mutation, check the payload under `field` for problems, and decode it.
    ///
    /// A null payload is reported as not found.
    pub fn mutate<T: DeserializeOwned>(
        &self,
        cancel: &Cancellation,
        request: Request,
        field: &str,
    ) -> Result<T> {
        let mut data = self.transport.execute(cancel, &request)?;
        let payload = data.get_mut(field).map(Json::take).unwrap_or(Json::Null);
        if payload.is_null() {
            return Err(Error::NotFound(request.operation_name.to_string()));
        }
        problem::check(&payload)?;
        decode(request.operation_name, payload)
    }
}

fn decode<T: DeserializeOwned>(operation: &str, data: Json) -> Result<T> {
    serde_json::from_value(data).map_err(|e| Error::Decode(format!("{operation}: {e}")))
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
