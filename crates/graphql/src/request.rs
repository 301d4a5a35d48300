//! Request and response envelopes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Query or mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Query,
    Mutation,
}

/// One GraphQL operation as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// GraphQL document
    pub query: &'static str,
    pub operation_name: &'static str,
    pub variables: Json,
    #[serde(skip)]
    pub kind: Kind,
}

impl Request {
    pub fn query(operation_name: &'static str, document: &'static str) -> Self {
        Self::new(Kind::Query, operation_name, document)
    }

    pub fn mutation(operation_name: &'static str, document: &'static str) -> Self {
        Self::new(Kind::Mutation, operation_name, document)
    }

    fn new(kind: Kind, operation_name: &'static str, document: &'static str) -> Self {
        Self {
            query: document,
            operation_name,
            variables: Json::Object(Map::new()),
            kind,
        }
    }

    /// Set one variable
    pub fn var(mut self, name: &str, value: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        if let Json::Object(map) = &mut self.variables {
            map.insert(name.to_string(), value);
        }
        Ok(self)
    }

    /// Variable by name, mostly for assertions
    pub fn variable(&self, name: &str) -> Option<&Json> {
        self.variables.get(name)
    }

    pub fn is_mutation(&self) -> bool {
        self.kind == Kind::Mutation
    }
}

/// An entry of the response `errors` array
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Json>,
}

impl GraphQlError {
    /// Whether the server reported a missing entity
    ///
    /// `extensions.code` decides when present; the message text is only
    /// consulted for servers that send no code.
    pub fn is_not_found(&self) -> bool {
        match self.code() {
            Some(code) => code.eq_ignore_ascii_case("NOT_FOUND"),
            None => self.message.to_ascii_lowercase().contains("not found"),
        }
    }

    /// `extensions.code`, if the server sent one
    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|e| e.get("code"))
            .and_then(Json::as_str)
    }
}

/// Standard `{data, errors}` response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<Json>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl Envelope {
    /// Resolve the envelope to its `data`
    ///
    /// A not-found among the errors wins over the other messages so callers
    /// can tell a deleted entity from a failed request.
    pub fn into_data(self, operation_name: &str) -> Result<Json> {
        if let Some(nf) = self.errors.iter().find(|e| e.is_not_found()) {
            log::debug!("{operation_name}: {}", nf.message);
            return Err(Error::NotFound(operation_name.to_string()));
        }
        if !self.errors.is_empty() {
            return Err(Error::GraphQl(
                self.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        Ok(self.data.unwrap_or(Json::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let req = Request::query("account", "query account($key: String!) { account(key: $key) { id } }")
            .var("key", "123")
            .unwrap();
        let wire = serde_json::to_value(&req).unwrap();
        assert_eq!(wire["operationName"], json!("account"));
        assert_eq!(wire["variables"], json!({"key": "123"}));
        assert!(wire.get("kind").is_none());
        assert!(!req.is_mutation());
    }

    #[test]
    fn test_envelope_data() {
        let env: Envelope = serde_json::from_value(json!({"data": {"a": 1}})).unwrap();
        assert_eq!(env.into_data("op").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_envelope_not_found() {
        let env: Envelope = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "boom"}, {"message": "x", "extensions": {"code": "NOT_FOUND"}}]
        }))
        .unwrap();
        assert!(matches!(env.into_data("reportGroup"), Err(Error::NotFound(_))));

        let env: Envelope = serde_json::from_value(json!({
            "errors": [{"message": "Account not found"}]
        }))
        .unwrap();
        assert!(matches!(env.into_data("account"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_error_code_beats_message() {
        let env: Envelope = serde_json::from_value(json!({
            "errors": [{"message": "role not found for principal", "extensions": {"code": "FORBIDDEN"}}]
        }))
        .unwrap();
        assert_eq!(
            env.into_data("addRoleAssignment").unwrap_err(),
            Error::GraphQl(vec!["role not found for principal".into()])
        );
    }

    #[test]
    fn test_envelope_errors() {
        let env: Envelope = serde_json::from_value(json!({
            "errors": [{"message": "permission denied"}]
        }))
        .unwrap();
        assert_eq!(
            env.into_data("op").unwrap_err(),
            Error::GraphQl(vec!["permission denied".into()])
        );
    }
}
