//! API keys
//!
//! The secret is returned by create only. Revoking keeps the record with
//! `revokedAt` set.

use super::{entity, problems};
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! key_fields {
    () => {
        "id identity description expiresAt revokedAt"
    };
}

const READ: &str = concat!(
    "query apiKey($id: ID!) { apiKey(id: $id) { ",
    key_fields!(),
    " } }"
);

const ADD: &str = concat!(
    "mutation addApiKey($input: AddApiKeyInput!) { addApiKey(input: $input) { key { ",
    key_fields!(),
    " } secret ",
    problems!(),
    " } }"
);

const UPDATE: &str = concat!(
    "mutation updateApiKey($input: UpdateApiKeyInput!) { updateApiKey(input: $input) { key { ",
    key_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REVOKE: &str = concat!(
    "mutation revokeApiKey($id: ID!) { revokeApiKey(id: $id) { key { ",
    key_fields!(),
    " } ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: String,
    pub identity: String,
    pub description: Option<String>,
    pub expires_at: Option<String>,
    pub revoked_at: Option<String>,
}

impl ApiKey {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub description: Option<String>,
    /// RFC 3339 timestamp
    pub expires_at: Option<String>,
}

/// A plaintext key secret, only ever seen once
#[derive(Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn expose(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct CreatePayload {
    key: Option<Json>,
    secret: Option<Secret>,
}

pub struct ApiKeys<'a> {
    client: &'a Client,
}

impl<'a> ApiKeys<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, id: &str) -> Result<ApiKey> {
        let request = Request::query("apiKey", READ).var("id", id)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "apiKey", format_args!("API key {id}"))
    }

    /// Create a key; the secret in the result cannot be fetched again
    pub fn create(&self, cancel: &Cancellation, input: &ApiKeyInput) -> Result<(ApiKey, Secret)> {
        let request = Request::mutation("addApiKey", ADD).var("input", input)?;
        let payload: CreatePayload = self.client.mutate(cancel, request, "addApiKey")?;
        let key = entity(
            serde_json::json!({ "key": payload.key }),
            "key",
            "created API key",
        )?;
        let secret = payload
            .secret
            .ok_or_else(|| graphql::Error::Decode("addApiKey returned no secret".into()))?;
        Ok((key, secret))
    }

    pub fn update(&self, cancel: &Cancellation, input: &ApiKeyInput) -> Result<ApiKey> {
        let request = Request::mutation("updateApiKey", UPDATE).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "updateApiKey")?;
        entity(payload, "key", "API key")
    }

    pub fn revoke(&self, cancel: &Cancellation, id: &str) -> Result<ApiKey> {
        let request = Request::mutation("revokeApiKey", REVOKE).var("id", id)?;
        let payload: Json = self.client.mutate(cancel, request, "revokeApiKey")?;
        entity(payload, "key", format_args!("API key {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql::MockTransport;
    use serde_json::json;

    #[test]
    fn test_create_returns_secret() {
        let mock = MockTransport::new();
        mock.reply(
            "addApiKey",
            json!({"addApiKey": {"key": {"id": "k1", "identity": "ci"}, "secret": "sk-123"}}),
        );
        let client = Client::new(mock);
        let (key, secret) = ApiKeys::new(&client)
            .create(&Cancellation::new(), &ApiKeyInput::default())
            .unwrap();
        assert_eq!(key.id, "k1");
        assert!(!key.is_revoked());
        assert!(!format!("{secret:?}").contains("sk-123"));
        assert_eq!(secret.expose(), "sk-123");
    }

    #[test]
    fn test_revoked() {
        let key: ApiKey =
            serde_json::from_value(json!({"id": "k", "identity": "i", "revokedAt": "2026-01-01T00:00:00Z"})).unwrap();
        assert!(key.is_revoked());
    }
}
