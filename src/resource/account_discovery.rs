//! Account discovery resources - scheduled enumeration of accounts in a
//! cloud organization, one kind per provider
//!
//! Discoveries are upserted by name and never deleted: the remote keeps
//! them, and scheduling is switched off through `suspended`. Azure and GCP
//! carry a write-only credential.

use super::{Secret, key, list, opt, read_ciphertext};
use crate::api::Api;
use crate::api::account_discovery::{
    AccountDiscovery, AwsDiscoveryInput, AzureDiscoveryInput, DiscoveryConfig, GcpDiscoveryInput,
};
use declarative::secret::settle;
use declarative::value::{list_or_null, nullable_string};
use declarative::{
    Attribute, Context, Error, ImportKeys, Resource, Result, Schema, SecretField, SecretState, Value, json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub const AWS_TYPE_NAME: &str = "stacklet_account_discovery_aws";
pub const AZURE_TYPE_NAME: &str = "stacklet_account_discovery_azure";
pub const GCP_TYPE_NAME: &str = "stacklet_account_discovery_gcp";

const REFUSAL: &str = "Account discoveries cannot be deleted. Set `suspended = true` instead.";

const CLIENT_SECRET: SecretField = SecretField::new("client_secret");
const CREDENTIAL_JSON: SecretField = SecretField::new("credential_json");

fn not_suspended() -> Json {
    Json::Bool(false)
}

fn import_name(keys: ImportKeys, id: &str) -> Result<Value<String>> {
    Ok(Value::Known(keys.values(id)?.remove(0)))
}

fn wrong_provider(name: &str, expected: &str, discovery: &AccountDiscovery) -> Error {
    Error::InvalidState(format!(
        "account discovery {name} is configured for {}, not {expected}",
        discovery.provider
    ))
}

/// Apply the desired suspended flag once the upsert went through
fn settle_suspended(
    api: &Api,
    ctx: &Context,
    discovery: AccountDiscovery,
    suspended: &Value<bool>,
) -> Result<AccountDiscovery> {
    let wanted = suspended.is_true();
    if discovery.suspended == wanted {
        return Ok(discovery);
    }
    log::debug!("account discovery {}: setting suspended = {wanted}", discovery.name);
    Ok(api
        .account_discoveries()
        .update_suspended(&ctx.cancel, &discovery.name, wanted)?)
}

// ============================================================================
// AWS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsDiscoveryModel {
    pub id: Value<String>,
    pub name: Value<String>,
    pub description: Value<String>,
    pub org_read_role: Value<String>,
    pub member_role: Value<String>,
    pub custom_config: Value<String>,
    pub suspended: Value<bool>,
}

impl AwsDiscoveryModel {
    fn from_remote(discovery: AccountDiscovery) -> Result<Self> {
        let name = discovery.name.clone();
        let config = discovery
            .config
            .aws()
            .ok_or_else(|| wrong_provider(&name, "AWS", &discovery))?;
        Ok(Self {
            id: Value::Known(discovery.id.clone()),
            name: Value::Known(name),
            description: nullable_string(discovery.description.clone()),
            org_read_role: Value::Known(config.org_read_role.clone()),
            member_role: nullable_string(config.member_role.clone()),
            custom_config: json::from_api(config.custom_config.as_ref())?,
            suspended: Value::Known(discovery.suspended),
        })
    }

    fn input(&self) -> Result<AwsDiscoveryInput> {
        Ok(AwsDiscoveryInput {
            name: key(&self.name, "name")?.to_string(),
            description: opt(&self.description),
            org_read_role: key(&self.org_read_role, "org_read_role")?.to_string(),
            member_role: opt(&self.member_role),
            custom_config: opt(&self.custom_config),
        })
    }
}

pub struct AwsDiscoveryResource {
    api: Api,
}

impl AwsDiscoveryResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn write(&self, ctx: &Context, planned: &AwsDiscoveryModel) -> Result<AwsDiscoveryModel> {
        let discovery = self.api.account_discoveries().upsert_aws(&ctx.cancel, &planned.input()?)?;
        let discovery = settle_suspended(&self.api, ctx, discovery, &planned.suspended)?;
        AwsDiscoveryModel::from_remote(discovery)
    }
}

impl Resource for AwsDiscoveryResource {
    type Model = AwsDiscoveryModel;

    fn type_name(&self) -> &'static str {
        AWS_TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(AWS_TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("name").replace())
            .attr(Attribute::optional("description"))
            .attr(Attribute::required("org_read_role").trim())
            .attr(Attribute::optional("member_role").trim())
            .attr(Attribute::optional("custom_config").json())
            .attr(Attribute::optional("suspended").default(not_suspended))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["name"])
    }

    fn read(&self, ctx: &Context, state: &AwsDiscoveryModel) -> Result<Option<AwsDiscoveryModel>> {
        let discovery = self.api.account_discoveries().read(&ctx.cancel, key(&state.name, "name")?)?;
        AwsDiscoveryModel::from_remote(discovery).map(Some)
    }

    fn create(&self, ctx: &Context, planned: &AwsDiscoveryModel, _config: &AwsDiscoveryModel) -> Result<AwsDiscoveryModel> {
        self.write(ctx, planned)
    }

    fn update(
        &self,
        ctx: &Context,
        _prior: &AwsDiscoveryModel,
        planned: &AwsDiscoveryModel,
        _config: &AwsDiscoveryModel,
    ) -> Result<AwsDiscoveryModel> {
        self.write(ctx, planned)
    }

    fn delete(&self, _ctx: &Context, _state: &AwsDiscoveryModel) -> Result<()> {
        Err(Error::Refusal(REFUSAL.to_string()))
    }

    fn import(&self, id: &str) -> Result<AwsDiscoveryModel> {
        Ok(AwsDiscoveryModel {
            name: import_name(self.import_keys(), id)?,
            ..AwsDiscoveryModel::default()
        })
    }
}

// ============================================================================
// Azure
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureDiscoveryModel {
    pub id: Value<String>,
    pub name: Value<String>,
    pub description: Value<String>,
    pub tenant_id: Value<String>,
    pub client_id: Value<String>,
    #[serde(skip_serializing)]
    pub client_secret_wo: Value<String>,
    pub client_secret_wo_version: Value<String>,
    pub client_secret: Value<String>,
    pub suspended: Value<bool>,
}

impl AzureDiscoveryModel {
    fn from_remote(
        discovery: AccountDiscovery,
        ciphertext: Value<String>,
        version: Value<String>,
    ) -> Result<Self> {
        let name = discovery.name.clone();
        let config = discovery
            .config
            .azure()
            .ok_or_else(|| wrong_provider(&name, "AZURE", &discovery))?;
        Ok(Self {
            id: Value::Known(discovery.id.clone()),
            name: Value::Known(name),
            description: nullable_string(discovery.description.clone()),
            tenant_id: Value::Known(config.tenant_id.clone()),
            client_id: Value::Known(config.client_id.clone()),
            client_secret_wo: Value::Null,
            client_secret_wo_version: version,
            client_secret: ciphertext,
            suspended: Value::Known(discovery.suspended),
        })
    }
}

pub struct AzureDiscoveryResource {
    api: Api,
}

impl AzureDiscoveryResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn write(
        &self,
        ctx: &Context,
        prior: Option<&AzureDiscoveryModel>,
        planned: &AzureDiscoveryModel,
        config: &AzureDiscoveryModel,
    ) -> Result<AzureDiscoveryModel> {
        let secret = Secret {
            field: CLIENT_SECRET,
            plaintext: &config.client_secret_wo,
            version: &planned.client_secret_wo_version,
        };
        let paired_changed = prior.is_some_and(|p| p.client_id != planned.client_id);
        let input = AzureDiscoveryInput {
            name: key(&planned.name, "name")?.to_string(),
            description: opt(&planned.description),
            tenant_id: key(&planned.tenant_id, "tenant_id")?.to_string(),
            client_id: key(&planned.client_id, "client_id")?.to_string(),
            client_secret: secret.outgoing(
                prior.map(|p| (&p.client_secret, &p.client_secret_wo_version)),
                paired_changed,
            ),
        };

        let discovery = self.api.account_discoveries().upsert_azure(&ctx.cancel, &input)?;
        let discovery = settle_suspended(&self.api, ctx, discovery, &planned.suspended)?;
        let returned = discovery.config.azure().and_then(|c| c.client_secret.clone());
        let prior_secret = prior.map(|p| SecretState {
            ciphertext: &p.client_secret,
            version: &p.client_secret_wo_version,
        });
        let (ciphertext, version) = settle(returned, prior_secret, &planned.client_secret_wo_version);
        AzureDiscoveryModel::from_remote(discovery, ciphertext, version)
    }
}

impl Resource for AzureDiscoveryResource {
    type Model = AzureDiscoveryModel;

    fn type_name(&self) -> &'static str {
        AZURE_TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(AZURE_TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("name").replace())
            .attr(Attribute::optional("description"))
            .attr(Attribute::required("tenant_id"))
            .attr(Attribute::required("client_id"))
            .attr(Attribute::write_only("client_secret_wo"))
            .attr(Attribute::optional("client_secret_wo_version"))
            .attr(Attribute::ciphertext("client_secret", "client_secret_wo_version").paired(&["client_id"]))
            .attr(Attribute::optional("suspended").default(not_suspended))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["name"])
    }

    fn read(&self, ctx: &Context, state: &AzureDiscoveryModel) -> Result<Option<AzureDiscoveryModel>> {
        let discovery = self.api.account_discoveries().read(&ctx.cancel, key(&state.name, "name")?)?;
        let returned = discovery.config.azure().and_then(|c| c.client_secret.clone());
        AzureDiscoveryModel::from_remote(
            discovery,
            read_ciphertext(&state.client_secret, returned),
            state.client_secret_wo_version.clone(),
        )
        .map(Some)
    }

    fn create(
        &self,
        ctx: &Context,
        planned: &AzureDiscoveryModel,
        config: &AzureDiscoveryModel,
    ) -> Result<AzureDiscoveryModel> {
        self.write(ctx, None, planned, config)
    }

    fn update(
        &self,
        ctx: &Context,
        prior: &AzureDiscoveryModel,
        planned: &AzureDiscoveryModel,
        config: &AzureDiscoveryModel,
    ) -> Result<AzureDiscoveryModel> {
        self.write(ctx, Some(prior), planned, config)
    }

    fn delete(&self, _ctx: &Context, _state: &AzureDiscoveryModel) -> Result<()> {
        Err(Error::Refusal(REFUSAL.to_string()))
    }

    fn import(&self, id: &str) -> Result<AzureDiscoveryModel> {
        Ok(AzureDiscoveryModel {
            name: import_name(self.import_keys(), id)?,
            ..AzureDiscoveryModel::default()
        })
    }
}

// ============================================================================
// GCP
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpDiscoveryModel {
    pub id: Value<String>,
    pub name: Value<String>,
    pub description: Value<String>,
    pub org_id: Value<String>,
    pub root_folder_ids: Value<Vec<String>>,
    pub exclude_folder_ids: Value<Vec<String>>,
    #[serde(skip_serializing)]
    pub credential_json_wo: Value<String>,
    pub credential_json_wo_version: Value<String>,
    pub credential_json: Value<String>,
    pub client_email: Value<String>,
    pub suspended: Value<bool>,
}

impl GcpDiscoveryModel {
    fn from_remote(
        discovery: AccountDiscovery,
        prior: Option<&Self>,
        ciphertext: Value<String>,
        version: Value<String>,
    ) -> Result<Self> {
        let name = discovery.name.clone();
        let config = discovery
            .config
            .gcp()
            .ok_or_else(|| wrong_provider(&name, "GCP", &discovery))?;
        Ok(Self {
            id: Value::Known(discovery.id.clone()),
            name: Value::Known(name),
            description: nullable_string(discovery.description.clone()),
            org_id: Value::Known(config.org_id.clone()),
            root_folder_ids: list_or_null(
                config.root_folder_ids.clone().unwrap_or_default(),
                prior.map(|p| &p.root_folder_ids),
            ),
            exclude_folder_ids: list_or_null(
                config.exclude_folder_ids.clone().unwrap_or_default(),
                prior.map(|p| &p.exclude_folder_ids),
            ),
            credential_json_wo: Value::Null,
            credential_json_wo_version: version,
            credential_json: ciphertext,
            client_email: nullable_string(config.client_email.clone()),
            suspended: Value::Known(discovery.suspended),
        })
    }
}

pub struct GcpDiscoveryResource {
    api: Api,
}

impl GcpDiscoveryResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn write(
        &self,
        ctx: &Context,
        prior: Option<&GcpDiscoveryModel>,
        planned: &GcpDiscoveryModel,
        config: &GcpDiscoveryModel,
    ) -> Result<GcpDiscoveryModel> {
        let secret = Secret {
            field: CREDENTIAL_JSON,
            plaintext: &config.credential_json_wo,
            version: &planned.credential_json_wo_version,
        };
        let paired_changed = prior.is_some_and(|p| p.org_id != planned.org_id);
        let input = GcpDiscoveryInput {
            name: key(&planned.name, "name")?.to_string(),
            description: opt(&planned.description),
            org_id: key(&planned.org_id, "org_id")?.to_string(),
            root_folder_ids: Some(list(&planned.root_folder_ids)),
            exclude_folder_ids: Some(list(&planned.exclude_folder_ids)),
            credential_json: secret.outgoing(
                prior.map(|p| (&p.credential_json, &p.credential_json_wo_version)),
                paired_changed,
            ),
        };

        let discovery = self.api.account_discoveries().upsert_gcp(&ctx.cancel, &input)?;
        let discovery = settle_suspended(&self.api, ctx, discovery, &planned.suspended)?;
        let returned = discovery.config.gcp().and_then(|c| c.credential_json.clone());
        let prior_secret = prior.map(|p| SecretState {
            ciphertext: &p.credential_json,
            version: &p.credential_json_wo_version,
        });
        let (ciphertext, version) = settle(returned, prior_secret, &planned.credential_json_wo_version);
        GcpDiscoveryModel::from_remote(discovery, Some(planned), ciphertext, version)
    }
}

impl Resource for GcpDiscoveryResource {
    type Model = GcpDiscoveryModel;

    fn type_name(&self) -> &'static str {
        GCP_TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(GCP_TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("name").replace())
            .attr(Attribute::optional("description"))
            .attr(Attribute::required("org_id"))
            .attr(Attribute::optional("root_folder_ids"))
            .attr(Attribute::optional("exclude_folder_ids"))
            .attr(Attribute::write_only("credential_json_wo"))
            .attr(Attribute::optional("credential_json_wo_version"))
            .attr(Attribute::ciphertext("credential_json", "credential_json_wo_version").paired(&["org_id"]))
            .attr(Attribute::computed("client_email"))
            .attr(Attribute::optional("suspended").default(not_suspended))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["name"])
    }

    fn validate(&self, config: &GcpDiscoveryModel) -> Vec<declarative::Diagnostic> {
        // The credential document is parsed by the remote; reject garbage early
        match config.credential_json_wo.as_str() {
            Some(raw) if serde_json::from_str::<Json>(raw).is_err() => vec![
                declarative::Diagnostic::error("Invalid attribute value", "credential JSON is not valid JSON")
                    .at("credential_json_wo"),
            ],
            _ => Vec::new(),
        }
    }

    fn read(&self, ctx: &Context, state: &GcpDiscoveryModel) -> Result<Option<GcpDiscoveryModel>> {
        let discovery = self.api.account_discoveries().read(&ctx.cancel, key(&state.name, "name")?)?;
        let returned = discovery.config.gcp().and_then(|c| c.credential_json.clone());
        GcpDiscoveryModel::from_remote(
            discovery,
            Some(state),
            read_ciphertext(&state.credential_json, returned),
            state.credential_json_wo_version.clone(),
        )
        .map(Some)
    }

    fn create(&self, ctx: &Context, planned: &GcpDiscoveryModel, config: &GcpDiscoveryModel) -> Result<GcpDiscoveryModel> {
        self.write(ctx, None, planned, config)
    }

    fn update(
        &self,
        ctx: &Context,
        prior: &GcpDiscoveryModel,
        planned: &GcpDiscoveryModel,
        config: &GcpDiscoveryModel,
    ) -> Result<GcpDiscoveryModel> {
        self.write(ctx, Some(prior), planned, config)
    }

    fn delete(&self, _ctx: &Context, _state: &GcpDiscoveryModel) -> Result<()> {
        Err(Error::Refusal(REFUSAL.to_string()))
    }

    fn import(&self, id: &str) -> Result<GcpDiscoveryModel> {
        Ok(GcpDiscoveryModel {
            name: import_name(self.import_keys(), id)?,
            ..GcpDiscoveryModel::default()
        })
    }
}
