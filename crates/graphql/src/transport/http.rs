//! HTTP transport.
//!
//! This module provides [`HttpTransport`], which posts GraphQL documents to a
//! single endpoint with bearer authentication.
//!
//! # Debug logging
//!
//! With `debug` set (or `TF_LOG`/`STACKLET_LOG` at `DEBUG` or `TRACE`), the
//! method, URL, request body and response body are logged at debug level. The
//! response body is read once and the same text is both logged and decoded.
//! The `Authorization` header is never logged.
//!
//! # Cancellation
//!
//! The blocking call runs on a worker thread while the caller polls the
//! [`Cancellation`] token. Once the token is set the caller returns
//! [`Error::Cancelled`] without waiting for the response; the abandoned worker
//! ends when the response arrives or the agent's timeout fires.

use crate::error::{Error, Result};
use crate::request::{Envelope, Request};
use crate::transport::Transport;
use declarative::Cancellation;
use serde_json::Value as Json;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Product token used in the `User-Agent` header.
pub const USER_AGENT_PRODUCT: &str = "terraform-provider-stacklet";

/// Maximum response size (GraphQL pages are small; 32 MB is generous).
const MAX_BODY_SIZE: u64 = 32 * 1024 * 1024;

/// How often an in-flight request checks for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    /// Bearer token.
    pub api_key: String,
    /// Version appended to the User-Agent.
    pub version: String,
    /// Log request and response bodies.
    pub debug: bool,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

/// Whether the environment asks for body logging
pub fn debug_from_env() -> bool {
    ["TF_LOG", "STACKLET_LOG"].iter().any(|var| {
        std::env::var(var)
            .map(|v| v.eq_ignore_ascii_case("debug") || v.eq_ignore_ascii_case("trace"))
            .unwrap_or(false)
    })
}

/// Blocking GraphQL transport over HTTPS.
#[derive(Clone)]
pub struct HttpTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    endpoint: String,
    authorization: String,
    user_agent: String,
    debug: bool,
}

impl HttpTransport {
    /// Create a transport from its settings.
    #[must_use]
    pub fn new(config: HttpConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(config.timeout)
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            endpoint: config.endpoint,
            authorization: format!("Bearer {}", config.api_key),
            user_agent: format!("{USER_AGENT_PRODUCT}/{}", config.version),
            debug: config.debug || debug_from_env(),
        }
    }

    /// Get the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the User-Agent header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn post(&self, body: &str) -> Result<(u16, String)> {
        if self.debug {
            log::debug!("POST {}\n{body}", self.endpoint);
        }

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &self.authorization)
            .header("User-Agent", &self.user_agent)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_string()?;

        if self.debug {
            log::debug!("HTTP {status} from {}\n{text}", self.endpoint);
        }
        Ok((status, text))
    }

    /// Post on a worker, giving up as soon as `cancel` is set
    fn post_cancellable(&self, cancel: &Cancellation, body: String) -> Result<(u16, String)> {
        let (tx, rx) = mpsc::channel();
        let transport = self.clone();
        thread::spawn(move || {
            // the receiver is gone once the caller gave up
            let _ = tx.send(transport.post(&body));
        });

        loop {
            match rx.recv_timeout(CANCEL_POLL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        log::debug!("abandoning in-flight request to {}", self.endpoint);
                        return Err(Error::Cancelled);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::http("request worker exited without a response", None));
                }
            }
        }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, cancel: &Cancellation, request: &Request) -> Result<Json> {
        cancel.check()?;
        let body = serde_json::to_string(request)?;
        log::trace!("executing {}", request.operation_name);

        let (status, text) = self.post_cancellable(cancel, body)?;
        cancel.check()?;

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => envelope.into_data(request.operation_name),
            Err(_) if status >= 400 => Err(Error::http(format!("HTTP {status}"), Some(status))),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HttpConfig {
        HttpConfig {
            endpoint: "https://api.example.stacklet.io/".to_string(),
            api_key: "secret-key".to_string(),
            version: "1.2.3".to_string(),
            debug: false,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    #[test]
    fn test_user_agent() {
        let transport = HttpTransport::new(config());
        assert_eq!(transport.user_agent(), "terraform-provider-stacklet/1.2.3");
        assert_eq!(transport.endpoint(), "https://api.example.stacklet.io/");
    }

    #[test]
    fn test_cancel_aborts_in_flight_request() {
        // accepts connections but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = HttpTransport::new(HttpConfig {
            endpoint: format!("http://127.0.0.1:{port}/"),
            ..config()
        });

        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = transport
            .execute(&cancel, &Request::query("platform", "{ platform { externalID } }"))
            .unwrap_err();
        canceller.join().unwrap();
        assert_eq!(err, Error::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5), "{:?}", started.elapsed());
        drop(listener);
    }

    #[test]
    fn test_cancelled_before_dispatch() {
        let transport = HttpTransport::new(config());
        let cancel = Cancellation::new();
        cancel.cancel();
        let err = transport
            .execute(&cancel, &Request::query("platform", "{ platform { externalID } }"))
            .unwrap_err();
        assert_eq!(err, Error::Cancelled);
    }
}
