//! Transport traits and implementations.
//!
//! This module provides the [`Transport`] trait and its implementations. The
//! primary implementation is [`http::HttpTransport`], which posts documents
//! to the GraphQL endpoint.
//!
//! # Testing
//!
//! Use [`MockTransport`] for testing without network access:
//!
//! ```
//! use declarative::Cancellation;
//! use graphql::transport::{MockTransport, Transport};
//! use graphql::Request;
//! use serde_json::json;
//!
//! let mock = MockTransport::new();
//! mock.reply("platform", json!({"platform": {"externalID": "x"}}));
//!
//! let data = mock.execute(&Cancellation::new(), &Request::query("platform", "{ platform { externalID } }")).unwrap();
//! assert_eq!(data["platform"]["externalID"], "x");
//! assert_eq!(mock.requests().len(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::request::Request;
use declarative::Cancellation;
use serde_json::Value as Json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

/// Executes one GraphQL operation and returns its `data`.
///
/// Implementations must be safe for concurrent use; a single handle is shared
/// by every resource.
pub trait Transport: Send + Sync {
    /// Execute a request.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` when `cancel` fires before the response is used,
    /// `Error::NotFound` when the server reports a missing entity, and
    /// `Error::Http`/`Error::GraphQl` otherwise.
    fn execute(&self, cancel: &Cancellation, request: &Request) -> Result<Json>;
}

/// Mock transport for testing without network access.
///
/// Replies are scripted per operation name and consumed in order; the last
/// reply for an operation is repeated once the queue is down to one. Every
/// request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<HashMap<String, VecDeque<Result<Json>>>>>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    /// Create a new empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `data` as the next reply for `operation`.
    pub fn reply(&self, operation: &str, data: Json) -> &Self {
        self.push(operation, Ok(data))
    }

    /// Queue an error as the next reply for `operation`.
    pub fn fail(&self, operation: &str, error: Error) -> &Self {
        self.push(operation, Err(error))
    }

    fn push(&self, operation: &str, reply: Result<Json>) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(operation.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request executed so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests for one operation.
    pub fn requests_for(&self, operation: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.operation_name == operation)
            .collect()
    }

    /// Names of the operations executed, in order.
    pub fn operations(&self) -> Vec<&'static str> {
        self.requests().iter().map(|r| r.operation_name).collect()
    }

    /// Number of mutations executed.
    pub fn mutation_count(&self) -> usize {
        self.requests().iter().filter(|r| r.is_mutation()).count()
    }
}

impl Transport for MockTransport {
    fn execute(&self, cancel: &Cancellation, request: &Request) -> Result<Json> {
        cancel.check()?;
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = replies
            .get_mut(request.operation_name)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::http(format!("mock reply not configured: {}", request.operation_name), None))?;

        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply.unwrap_or_else(|| Err(Error::http("mock queue empty", None)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(name: &'static str) -> Request {
        Request::mutation(name, "mutation { x }")
    }

    #[test]
    fn test_mock_transport_new() {
        let mock = MockTransport::new();
        assert!(mock.execute(&Cancellation::new(), &req("x")).is_err());
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_mock_replies_in_order_last_sticky() {
        let mock = MockTransport::new();
        mock.reply("op", json!(1)).reply("op", json!(2));
        let cancel = Cancellation::new();
        assert_eq!(mock.execute(&cancel, &req("op")).unwrap(), json!(1));
        assert_eq!(mock.execute(&cancel, &req("op")).unwrap(), json!(2));
        assert_eq!(mock.execute(&cancel, &req("op")).unwrap(), json!(2));
        assert_eq!(mock.mutation_count(), 3);
    }

    #[test]
    fn test_mock_fail() {
        let mock = MockTransport::new();
        mock.fail("reportGroup", Error::NotFound("reportGroup".into()));
        let err = mock.execute(&Cancellation::new(), &req("reportGroup")).unwrap_err();
        assert_eq!(err, Error::NotFound("reportGroup".into()));
    }

    #[test]
    fn test_mock_cancelled() {
        let mock = MockTransport::new();
        mock.reply("op", json!(1));
        let cancel = Cancellation::new();
        cancel.cancel();
        assert_eq!(mock.execute(&cancel, &req("op")).unwrap_err(), Error::Cancelled);
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let mock = MockTransport::new();
        let clone = mock.clone();
        clone.reply("op", json!("shared"));
        assert_eq!(mock.execute(&Cancellation::new(), &req("op")).unwrap(), json!("shared"));
        assert_eq!(clone.operations(), vec!["op"]);
        assert_eq!(clone.requests_for("op").len(), 1);
    }
}
