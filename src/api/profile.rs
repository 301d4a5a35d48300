//! Configuration profiles
//!
//! Singleton integration settings, one per profile kind, addressed by a fixed
//! name. Each kind has its own upsert; removing a profile clears its content.

use super::{entity, problems};
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! profile_fields {
    () => {
        concat!(
            "id name record { __typename ",
            "... on EmailConfiguration { fromEmail sesRegion smtp { server port ssl username password } } ",
            "... on SlackConfiguration { userFields token webhooks { name url } } ",
            "... on TeamsConfiguration { webhooks { name url } } ",
            "... on MSTeamsConfiguration { accessConfig { clientID tenantID } customerConfig { prefix tags } channelMappings { name teamID channelID } } ",
            "... on JiraConfiguration { url user apiKey projects { project name issueTypes closedStatus } } ",
            "... on ServiceNowConfiguration { endpoint username password issueType closedState } ",
            "... on SymphonyConfiguration { agentDomain serviceAccount privateKey } ",
            "... on AccountOwnersConfiguration { default { accountKey owners } orgDomain orgDomainTagKey tags } ",
            "... on ResourceOwnerConfiguration { default orgDomain orgDomainTagKey tags } }"
        )
    };
}

macro_rules! upsert_document {
    ($op:literal, $input:literal) => {
        concat!(
            "mutation ", $op, "($input: ", $input, "!) { ", $op, "(input: $input) { configuration { ",
            profile_fields!(),
            " } ",
            problems!(),
            " } }"
        )
    };
}

const READ: &str = concat!(
    "query profile($name: String!) { profile(name: $name) { ",
    profile_fields!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removeProfile($name: String!) { removeProfile(name: $name) { configuration { id } ",
    problems!(),
    " } }"
);

/// Which singleton profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Email,
    Slack,
    Teams,
    MsTeams,
    Jira,
    ServiceNow,
    Symphony,
    AccountOwners,
    ResourceOwner,
}

impl ProfileKind {
    /// Fixed profile name, also the import ID
    pub fn name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Slack => "slack",
            Self::Teams => "teams",
            Self::MsTeams => "msteams",
            Self::Jira => "jira",
            Self::ServiceNow => "servicenow",
            Self::Symphony => "symphony",
            Self::AccountOwners => "account_owners",
            Self::ResourceOwner => "resource_owner",
        }
    }

    fn upsert_request(&self) -> Request {
        match self {
            Self::Email => Request::mutation("addEmailProfile", upsert_document!("addEmailProfile", "EmailConfigurationInput")),
            Self::Slack => Request::mutation("addSlackProfile", upsert_document!("addSlackProfile", "SlackConfigurationInput")),
            Self::Teams => Request::mutation("addTeamsProfile", upsert_document!("addTeamsProfile", "TeamsConfigurationInput")),
            Self::MsTeams => Request::mutation("addMSTeamsProfile", upsert_document!("addMSTeamsProfile", "MSTeamsConfigurationInput")),
            Self::Jira => Request::mutation("addJiraProfile", upsert_document!("addJiraProfile", "JiraConfigurationInput")),
            Self::ServiceNow => Request::mutation("addServiceNowProfile", upsert_document!("addServiceNowProfile", "ServiceNowConfigurationInput")),
            Self::Symphony => Request::mutation("addSymphonyProfile", upsert_document!("addSymphonyProfile", "SymphonyConfigurationInput")),
            Self::AccountOwners => Request::mutation(
                "addAccountOwnersProfile",
                upsert_document!("addAccountOwnersProfile", "AccountOwnersConfigurationInput"),
            ),
            Self::ResourceOwner => Request::mutation(
                "addResourceOwnerProfile",
                upsert_document!("addResourceOwnerProfile", "ResourceOwnerConfigurationInput"),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub record: ProfileRecord,
}

/// Content of a profile, discriminated on `__typename`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "__typename")]
pub enum ProfileRecord {
    #[serde(rename = "EmailConfiguration")]
    Email(EmailConfiguration),
    #[serde(rename = "SlackConfiguration")]
    Slack(SlackConfiguration),
    #[serde(rename = "TeamsConfiguration")]
    Teams(TeamsConfiguration),
    #[serde(rename = "MSTeamsConfiguration")]
    MsTeams(MsTeamsConfiguration),
    #[serde(rename = "JiraConfiguration")]
    Jira(JiraConfiguration),
    #[serde(rename = "ServiceNowConfiguration")]
    ServiceNow(ServiceNowConfiguration),
    #[serde(rename = "SymphonyConfiguration")]
    Symphony(SymphonyConfiguration),
    #[serde(rename = "AccountOwnersConfiguration")]
    AccountOwners(OwnersConfiguration<AccountOwnersDefault>),
    #[serde(rename = "ResourceOwnerConfiguration")]
    ResourceOwner(OwnersConfiguration<String>),
}

impl ProfileRecord {
    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::Email(_) => ProfileKind::Email,
            Self::Slack(_) => ProfileKind::Slack,
            Self::Teams(_) => ProfileKind::Teams,
            Self::MsTeams(_) => ProfileKind::MsTeams,
            Self::Jira(_) => ProfileKind::Jira,
            Self::ServiceNow(_) => ProfileKind::ServiceNow,
            Self::Symphony(_) => ProfileKind::Symphony,
            Self::AccountOwners(_) => ProfileKind::AccountOwners,
            Self::ResourceOwner(_) => ProfileKind::ResourceOwner,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfiguration {
    pub from_email: String,
    pub ses_region: Option<String>,
    pub smtp: Option<SmtpConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfiguration {
    pub server: String,
    pub port: Option<String>,
    pub ssl: Option<bool>,
    pub username: Option<String>,
    /// Ciphertext when read; plaintext or echoed ciphertext when written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfiguration {
    #[serde(default)]
    pub user_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub webhooks: Vec<Webhook>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamsConfiguration {
    #[serde(default)]
    pub webhooks: Vec<Webhook>,
}

/// A named incoming webhook; `url` is a secret
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsTeamsConfiguration {
    pub access_config: Option<MsTeamsAccessConfig>,
    pub customer_config: Option<MsTeamsCustomerConfig>,
    #[serde(default)]
    pub channel_mappings: Vec<ChannelMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsTeamsAccessConfig {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsTeamsCustomerConfig {
    pub prefix: String,
    #[serde(default)]
    pub tags: Option<Json>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMapping {
    pub name: String,
    #[serde(rename = "teamID")]
    pub team_id: String,
    #[serde(rename = "channelID")]
    pub channel_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraConfiguration {
    pub url: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub projects: Vec<JiraProject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraProject {
    pub project: String,
    pub name: String,
    #[serde(default)]
    pub issue_types: Vec<String>,
    pub closed_status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNowConfiguration {
    pub endpoint: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub issue_type: String,
    pub closed_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymphonyConfiguration {
    pub agent_domain: String,
    pub service_account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

/// Owner resolution; account owners default per account, resource owners to a flat list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnersConfiguration<D> {
    #[serde(default = "Vec::new")]
    pub default: Vec<D>,
    pub org_domain: Option<String>,
    pub org_domain_tag_key: Option<String>,
    #[serde(default = "Vec::new")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOwnersDefault {
    pub account_key: String,
    #[serde(default)]
    pub owners: Vec<String>,
}

pub struct Profiles<'a> {
    client: &'a Client,
}

impl<'a> Profiles<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, kind: ProfileKind) -> Result<Profile> {
        let name = kind.name();
        let request = Request::query("profile", READ).var("name", name)?;
        let data: Json = self.client.query(cancel, request)?;
        let profile: Profile = entity(data, "profile", format_args!("{name} profile"))?;
        if profile.record.kind() != kind {
            return Err(graphql::Error::Decode(format!(
                "profile {name} holds a {} record",
                profile.record.kind().name()
            )));
        }
        Ok(profile)
    }

    /// Create or replace the content of a profile
    pub fn upsert(&self, cancel: &Cancellation, kind: ProfileKind, input: &impl Serialize) -> Result<Profile> {
        let request = kind.upsert_request();
        let field = request.operation_name;
        let payload: Json = self.client.mutate(cancel, request.var("input", input)?, field)?;
        entity(payload, "configuration", format_args!("{} profile", kind.name()))
    }

    /// Clear the content of a profile
    pub fn remove(&self, cancel: &Cancellation, kind: ProfileKind) -> Result<()> {
        let request = Request::mutation("removeProfile", REMOVE).var("name", kind.name())?;
        let _: Json = self.client.mutate(cancel, request, "removeProfile")?;
        Ok(())
    }
}
