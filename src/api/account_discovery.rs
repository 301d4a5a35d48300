//! Account discoveries
//!
//! One record per discovery, with a provider-specific configuration union.
//! Discoveries are written by per-provider upserts and are never deleted;
//! scheduling is controlled through the suspended flag.

use super::{entity, problems};
use crate::enums::CloudProvider;
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! discovery_fields {
    () => {
        "id name description provider suspended config { __typename \
         ... on AWSAccountDiscoveryConfig { orgReadRole memberRole customConfig } \
         ... on AzureAccountDiscoveryConfig { tenantID clientID clientSecret } \
         ... on GCPAccountDiscoveryConfig { orgID rootFolderIDs excludeFolderIDs credentialJSON clientEmail } }"
    };
}

const READ: &str = concat!(
    "query accountDiscovery($name: String!) { accountDiscovery(name: $name) { ",
    discovery_fields!(),
    " } }"
);

const UPSERT_AWS: &str = concat!(
    "mutation upsertAWSAccountDiscovery($input: UpsertAWSAccountDiscoveryInput!) { upsertAWSAccountDiscovery(input: $input) { accountDiscovery { ",
    discovery_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPSERT_AZURE: &str = concat!(
    "mutation upsertAzureAccountDiscovery($input: UpsertAzureAccountDiscoveryInput!) { upsertAzureAccountDiscovery(input: $input) { accountDiscovery { ",
    discovery_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPSERT_GCP: &str = concat!(
    "mutation upsertGCPAccountDiscovery($input: UpsertGCPAccountDiscoveryInput!) { upsertGCPAccountDiscovery(input: $input) { accountDiscovery { ",
    discovery_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPDATE_SUSPENDED: &str = concat!(
    "mutation updateAccountDiscoverySuspended($name: String!, $suspended: Boolean!) { updateAccountDiscovery(input: { name: $name, suspended: $suspended }) { accountDiscovery { ",
    discovery_fields!(),
    " } ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDiscovery {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub provider: CloudProvider,
    #[serde(default)]
    pub suspended: bool,
    pub config: DiscoveryConfig,
}

/// Provider-specific discovery settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "__typename")]
pub enum DiscoveryConfig {
    #[serde(rename = "AWSAccountDiscoveryConfig")]
    Aws(AwsDiscoveryConfig),
    #[serde(rename = "AzureAccountDiscoveryConfig")]
    Azure(AzureDiscoveryConfig),
    #[serde(rename = "GCPAccountDiscoveryConfig")]
    Gcp(GcpDiscoveryConfig),
}

impl DiscoveryConfig {
    pub fn aws(&self) -> Option<&AwsDiscoveryConfig> {
        match self {
            Self::Aws(c) => Some(c),
            _ => None,
        }
    }

    pub fn azure(&self) -> Option<&AzureDiscoveryConfig> {
        match self {
            Self::Azure(c) => Some(c),
            _ => None,
        }
    }

    pub fn gcp(&self) -> Option<&GcpDiscoveryConfig> {
        match self {
            Self::Gcp(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsDiscoveryConfig {
    pub org_read_role: String,
    pub member_role: Option<String>,
    pub custom_config: Option<Json>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AzureDiscoveryConfig {
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    /// Ciphertext of the stored secret
    #[serde(rename = "clientSecret")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GcpDiscoveryConfig {
    #[serde(rename = "orgID")]
    pub org_id: String,
    #[serde(rename = "rootFolderIDs", default)]
    pub root_folder_ids: Option<Vec<String>>,
    #[serde(rename = "excludeFolderIDs", default)]
    pub exclude_folder_ids: Option<Vec<String>>,
    /// Ciphertext of the stored credentials
    #[serde(rename = "credentialJSON")]
    pub credential_json: Option<String>,
    #[serde(rename = "clientEmail")]
    pub client_email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsDiscoveryInput {
    pub name: String,
    pub description: Option<String>,
    pub org_read_role: String,
    pub member_role: Option<String>,
    pub custom_config: Option<String>,
}

/// Plaintext or echoed ciphertext in `client_secret`
#[derive(Clone, Default, PartialEq, Serialize)]
pub struct AzureDiscoveryInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientSecret", skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Plaintext or echoed ciphertext in `credential_json`
#[derive(Clone, Default, PartialEq, Serialize)]
pub struct GcpDiscoveryInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "orgID")]
    pub org_id: String,
    #[serde(rename = "rootFolderIDs")]
    pub root_folder_ids: Option<Vec<String>>,
    #[serde(rename = "excludeFolderIDs")]
    pub exclude_folder_ids: Option<Vec<String>>,
    #[serde(rename = "credentialJSON", skip_serializing_if = "Option::is_none")]
    pub credential_json: Option<String>,
}

impl std::fmt::Debug for AzureDiscoveryInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDiscoveryInput")
            .field("name", &self.name)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for GcpDiscoveryInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpDiscoveryInput")
            .field("name", &self.name)
            .field("org_id", &self.org_id)
            .field("credential_json", &self.credential_json.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

pub struct AccountDiscoveries<'a> {
    client: &'a Client,
}

impl<'a> AccountDiscoveries<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, name: &str) -> Result<AccountDiscovery> {
        let request = Request::query("accountDiscovery", READ).var("name", name)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "accountDiscovery", format_args!("account discovery {name}"))
    }

    pub fn upsert_aws(&self, cancel: &Cancellation, input: &AwsDiscoveryInput) -> Result<AccountDiscovery> {
        self.upsert(cancel, Request::mutation("upsertAWSAccountDiscovery", UPSERT_AWS), input, &input.name)
    }

    pub fn upsert_azure(&self, cancel: &Cancellation, input: &AzureDiscoveryInput) -> Result<AccountDiscovery> {
        self.upsert(cancel, Request::mutation("upsertAzureAccountDiscovery", UPSERT_AZURE), input, &input.name)
    }

    pub fn upsert_gcp(&self, cancel: &Cancellation, input: &GcpDiscoveryInput) -> Result<AccountDiscovery> {
        self.upsert(cancel, Request::mutation("upsertGCPAccountDiscovery", UPSERT_GCP), input, &input.name)
    }

    fn upsert(&self, cancel: &Cancellation, request: Request, input: &impl Serialize, name: &str) -> Result<AccountDiscovery> {
        let field = request.operation_name;
        let payload: Json = self.client.mutate(cancel, request.var("input", input)?, field)?;
        entity(payload, "accountDiscovery", format_args!("account discovery {name}"))
    }

    pub fn update_suspended(&self, cancel: &Cancellation, name: &str, suspended: bool) -> Result<AccountDiscovery> {
        let request = Request::mutation("updateAccountDiscoverySuspended", UPDATE_SUSPENDED)
            .var("name", name)?
            .var("suspended", suspended)?;
        let payload: Json = self.client.mutate(cancel, request, "updateAccountDiscovery")?;
        entity(payload, "accountDiscovery", format_args!("account discovery {name}"))
    }
}
