//! API key resource
//!
//! The key secret is observed once, when the key is created, and kept in
//! state from then on. Deleting revokes the key; a revoked key reads as gone.

use super::{key, opt};
use crate::api::Api;
use crate::api::api_key::{ApiKey, ApiKeyInput};
use chrono::{DateTime, FixedOffset};
use declarative::value::nullable_string;
use declarative::{Attribute, Context, Diagnostic, ImportKeys, Resource, Result, Schema, Value};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "stacklet_api_key";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeyModel {
    pub id: Value<String>,
    pub identity: Value<String>,
    pub description: Value<String>,
    pub expires_at: Value<String>,
    pub revoked_at: Value<String>,
    pub secret: Value<String>,
}

fn timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// The remote may render the same instant differently; keep the known spelling
fn same_instant(remote: Option<String>, known: &Value<String>) -> Value<String> {
    match (remote.as_deref().and_then(timestamp), known.as_str().and_then(timestamp)) {
        (Some(a), Some(b)) if a == b => known.clone(),
        _ => nullable_string(remote),
    }
}

impl ApiKeyModel {
    fn from_remote(key: ApiKey, prior: Option<&Self>, secret: Value<String>) -> Self {
        let known_expiry = prior.map(|p| p.expires_at.clone()).unwrap_or_default();
        Self {
            id: Value::Known(key.id),
            identity: Value::Known(key.identity),
            description: nullable_string(key.description),
            expires_at: same_instant(key.expires_at, &known_expiry),
            revoked_at: nullable_string(key.revoked_at),
            secret,
        }
    }

    fn input(&self, id: Option<String>) -> ApiKeyInput {
        ApiKeyInput {
            id,
            description: opt(&self.description),
            expires_at: opt(&self.expires_at),
        }
    }
}

pub struct ApiKeyResource {
    api: Api,
}

impl ApiKeyResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for ApiKeyResource {
    type Model = ApiKeyModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::computed("identity").use_state())
            .attr(Attribute::optional("description"))
            .attr(Attribute::optional("expires_at"))
            .attr(Attribute::computed("revoked_at").use_state())
            .attr(Attribute::computed("secret").use_state().sensitive())
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["id"])
    }

    fn validate(&self, config: &ApiKeyModel) -> Vec<Diagnostic> {
        match config.expires_at.as_str() {
            Some(s) if timestamp(s).is_none() => vec![
                Diagnostic::error("Invalid attribute value", format!("\"{s}\" is not an RFC 3339 timestamp"))
                    .at("expires_at"),
            ],
            _ => Vec::new(),
        }
    }

    fn read(&self, ctx: &Context, state: &ApiKeyModel) -> Result<Option<ApiKeyModel>> {
        let key = self.api.api_keys().read(&ctx.cancel, key(&state.id, "id")?)?;
        if key.is_revoked() {
            log::info!("API key {} was revoked", key.id);
            return Ok(None);
        }
        Ok(Some(ApiKeyModel::from_remote(key, Some(state), state.secret.clone())))
    }

    fn create(&self, ctx: &Context, planned: &ApiKeyModel, _config: &ApiKeyModel) -> Result<ApiKeyModel> {
        let (key, secret) = self.api.api_keys().create(&ctx.cancel, &planned.input(None))?;
        log::info!("created API key {} for {}", key.id, key.identity);
        Ok(ApiKeyModel::from_remote(key, Some(planned), Value::Known(secret.expose())))
    }

    fn update(
        &self,
        ctx: &Context,
        prior: &ApiKeyModel,
        planned: &ApiKeyModel,
        _config: &ApiKeyModel,
    ) -> Result<ApiKeyModel> {
        let id = key(&prior.id, "id")?.to_string();
        let updated = self.api.api_keys().update(&ctx.cancel, &planned.input(Some(id)))?;
        Ok(ApiKeyModel::from_remote(updated, Some(planned), prior.secret.clone()))
    }

    fn delete(&self, ctx: &Context, state: &ApiKeyModel) -> Result<()> {
        let revoked = self.api.api_keys().revoke(&ctx.cancel, key(&state.id, "id")?)?;
        log::debug!("revoked API key {} at {:?}", revoked.id, revoked.revoked_at);
        Ok(())
    }

    fn import(&self, id: &str) -> Result<ApiKeyModel> {
        Ok(ApiKeyModel {
            id: Value::Known(self.import_keys().values(id)?.remove(0)),
            ..ApiKeyModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use declarative::{Action, DynResource, Error};
    use serde_json::{Value as Json, json};

    fn remote(revoked_at: Json) -> Json {
        json!({
            "id": "k-1", "identity": "ci-bot", "description": "CI",
            "expiresAt": "2027-01-01T00:00:00+00:00", "revokedAt": revoked_at
        })
    }

    #[test]
    fn test_create_keeps_secret() {
        let (api, mock) = testing::api();
        mock.reply("addApiKey", json!({"addApiKey": {"key": remote(Json::Null), "secret": "sk-live-1"}}));
        mock.reply("apiKey", json!({"apiKey": remote(Json::Null)}));
        let resource = ApiKeyResource::new(api);
        let config = json!({"description": "CI", "expires_at": "2027-01-01T00:00:00Z"});

        let change = resource.plan(Some(&config), None).unwrap();
        let state = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(state["secret"], json!("sk-live-1"));
        // same instant, config spelling kept
        assert_eq!(state["expires_at"], json!("2027-01-01T00:00:00Z"));

        let refreshed = resource.refresh(&Context::new(), &state).unwrap().unwrap();
        assert_eq!(refreshed, state);
        assert_eq!(resource.plan(Some(&config), Some(&refreshed)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_revoked_key_reads_as_gone() {
        let (api, mock) = testing::api();
        mock.reply("apiKey", json!({"apiKey": remote(json!("2026-05-01T00:00:00Z"))}));
        let resource = ApiKeyResource::new(api);
        let state = json!({"id": "k-1", "identity": "ci-bot", "secret": "sk-live-1"});
        assert!(resource.refresh(&Context::new(), &state).unwrap().is_none());
    }

    #[test]
    fn test_delete_revokes() {
        let (api, mock) = testing::api();
        mock.reply(
            "revokeApiKey",
            json!({"revokeApiKey": {"key": remote(json!("2026-05-01T00:00:00Z"))}}),
        );
        let resource = ApiKeyResource::new(api);
        let state = json!({"id": "k-1", "identity": "ci-bot", "secret": "sk-live-1"});
        let change = resource.plan(None, Some(&state)).unwrap();
        assert!(resource.apply(&Context::new(), &change, None, Some(&state)).unwrap().is_none());
        assert_eq!(mock.operations(), vec!["revokeApiKey"]);
    }

    #[test]
    fn test_update_description_keeps_secret() {
        let (api, mock) = testing::api();
        let mut updated = remote(Json::Null);
        updated["description"] = json!("CI pipeline");
        mock.reply("updateApiKey", json!({"updateApiKey": {"key": updated}}));
        let resource = ApiKeyResource::new(api);
        let prior = json!({
            "id": "k-1", "identity": "ci-bot", "description": "CI",
            "expires_at": "2027-01-01T00:00:00+00:00", "revoked_at": null, "secret": "sk-live-1"
        });
        let config = json!({"description": "CI pipeline", "expires_at": "2027-01-01T00:00:00+00:00"});
        let change = resource.plan(Some(&config), Some(&prior)).unwrap();
        assert_eq!(change.action, Action::Update);
        let state = resource.apply(&Context::new(), &change, Some(&config), Some(&prior)).unwrap().unwrap();
        assert_eq!(state["secret"], json!("sk-live-1"));
        assert_eq!(state["description"], json!("CI pipeline"));
    }

    #[test]
    fn test_bad_expiry_rejected() {
        let (api, _) = testing::api();
        let resource = ApiKeyResource::new(api);
        let err = resource.plan(Some(&json!({"expires_at": "next tuesday"})), None).unwrap_err();
        assert!(matches!(err, Error::Validation(ref d) if d[0].path.as_deref() == Some("expires_at")));
    }
}
