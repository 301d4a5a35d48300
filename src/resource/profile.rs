//! Configuration profile resources
//!
//! Nine singleton kinds share one lifecycle: read by fixed name, create and
//! update through the kind's upsert, delete by clearing the content. Each kind
//! supplies its model, attributes and record mapping through [`Shape`].

use super::{Secret, key, list, opt, read_ciphertext};
use crate::api::Api;
use crate::api::profile::{
    AccountOwnersDefault, ChannelMapping, EmailConfiguration, JiraConfiguration, JiraProject, MsTeamsAccessConfig,
    MsTeamsConfiguration, MsTeamsCustomerConfig, OwnersConfiguration, ProfileKind, ProfileRecord,
    ServiceNowConfiguration, SlackConfiguration, SmtpConfiguration, SymphonyConfiguration, TeamsConfiguration,
    Webhook,
};
use declarative::order::{identifiers, preserve_order};
use declarative::secret::{by_name, plan_ciphertext, settle};
use declarative::value::{list_or_null, nullable_bool, nullable_string};
use declarative::{
    Attribute, BoxedResource, Context, Diagnostic, Error, ImportKeys, Resource, Result, Schema, SecretField,
    SecretState, Validator, Value, json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Every profile kind
pub fn all(api: &Api) -> Vec<BoxedResource> {
    vec![
        Arc::new(ProfileResource::<Email>::new(api.clone())),
        Arc::new(ProfileResource::<Slack>::new(api.clone())),
        Arc::new(ProfileResource::<Teams>::new(api.clone())),
        Arc::new(ProfileResource::<MsTeams>::new(api.clone())),
        Arc::new(ProfileResource::<Jira>::new(api.clone())),
        Arc::new(ProfileResource::<ServiceNow>::new(api.clone())),
        Arc::new(ProfileResource::<Symphony>::new(api.clone())),
        Arc::new(ProfileResource::<AccountOwners>::new(api.clone())),
        Arc::new(ProfileResource::<ResourceOwner>::new(api.clone())),
    ]
}

/// Which side of a round with the remote a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    /// Refresh: stored ciphertexts win over what the remote reports
    Read,
    /// Create or update: the remote's ciphertext wins
    Write,
}

impl Round {
    /// Ciphertext and version after this round, given the stored pair: the
    /// state on read, the plan on write
    fn secret(
        self,
        returned: Option<String>,
        ciphertext: &Value<String>,
        version: &Value<String>,
    ) -> (Value<String>, Value<String>) {
        match self {
            Self::Read => (read_ciphertext(ciphertext, returned), version.clone()),
            Self::Write => settle(returned, Some(prior_secret(ciphertext, version)), version),
        }
    }
}

/// Per-kind half of a profile resource
pub trait Shape: Send + Sync + 'static {
    type Model: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Default + Send + Sync;
    type Input: Serialize;

    const KIND: ProfileKind;
    const TYPE_NAME: &'static str;

    /// Attributes besides `id`
    fn attributes(schema: Schema) -> Schema;

    fn validate(_config: &Self::Model) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Nested ciphertexts and order
    fn modify_plan(_planned: &mut Self::Model, _prior: Option<&Self::Model>) -> Result<()> {
        Ok(())
    }

    /// Map a remote record onto the model
    fn from_record(id: String, record: ProfileRecord, basis: &Self::Model, round: Round) -> Result<Self::Model>;

    /// Upsert payload; plaintexts come from `config`
    fn input(planned: &Self::Model, prior: Option<&Self::Model>, config: &Self::Model) -> Result<Self::Input>;

    /// Computed attributes filled from elsewhere after every round
    fn decorate(_api: &Api, _ctx: &Context, _model: &mut Self::Model) -> Result<()> {
        Ok(())
    }
}

fn unexpected(expected: ProfileKind, record: &ProfileRecord) -> Error {
    Error::InvalidState(format!(
        "{} profile holds a {} record",
        expected.name(),
        record.kind().name()
    ))
}

fn missing(path: String) -> Diagnostic {
    Diagnostic::error("Missing required argument", "a value is required").at(path)
}

fn require(path: &str, value: &Value<String>) -> Option<Diagnostic> {
    value.is_null().then(|| missing(path.to_string()))
}

fn prior_secret<'a>(ciphertext: &'a Value<String>, version: &'a Value<String>) -> SecretState<'a> {
    SecretState { ciphertext, version }
}

pub struct ProfileResource<S> {
    api: Api,
    shape: PhantomData<fn() -> S>,
}

impl<S: Shape> ProfileResource<S> {
    pub fn new(api: Api) -> Self {
        Self {
            api,
            shape: PhantomData,
        }
    }

    fn write(&self, ctx: &Context, planned: &S::Model, prior: Option<&S::Model>, config: &S::Model) -> Result<S::Model> {
        let input = S::input(planned, prior, config)?;
        let profile = self.api.profiles().upsert(&ctx.cancel, S::KIND, &input)?;
        let mut model = S::from_record(profile.id, profile.record, planned, Round::Write)?;
        S::decorate(&self.api, ctx, &mut model)?;
        Ok(model)
    }
}

impl<S: Shape> Resource for ProfileResource<S> {
    type Model = S::Model;

    fn type_name(&self) -> &'static str {
        S::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        S::attributes(Schema::new(S::TYPE_NAME).attr(Attribute::computed("id").use_state()))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["name"])
    }

    fn validate(&self, config: &S::Model) -> Vec<Diagnostic> {
        S::validate(config)
    }

    fn modify_plan(&self, planned: &mut S::Model, prior: Option<&S::Model>, _config: &S::Model) -> Result<()> {
        S::modify_plan(planned, prior)
    }

    fn read(&self, ctx: &Context, state: &S::Model) -> Result<Option<S::Model>> {
        let profile = self.api.profiles().read(&ctx.cancel, S::KIND)?;
        let mut model = S::from_record(profile.id, profile.record, state, Round::Read)?;
        S::decorate(&self.api, ctx, &mut model)?;
        Ok(Some(model))
    }

    fn create(&self, ctx: &Context, planned: &S::Model, config: &S::Model) -> Result<S::Model> {
        let model = self.write(ctx, planned, None, config)?;
        log::info!("configured {} profile", S::KIND.name());
        Ok(model)
    }

    fn update(&self, ctx: &Context, prior: &S::Model, planned: &S::Model, config: &S::Model) -> Result<S::Model> {
        self.write(ctx, planned, Some(prior), config)
    }

    fn delete(&self, ctx: &Context, _state: &S::Model) -> Result<()> {
        self.api.profiles().remove(&ctx.cancel, S::KIND)?;
        log::info!("cleared {} profile", S::KIND.name());
        Ok(())
    }

    fn import(&self, id: &str) -> Result<S::Model> {
        let name = self.import_keys().values(id)?.remove(0);
        if name != S::KIND.name() {
            return Err(Error::ImportId {
                expected: S::KIND.name().to_string(),
            });
        }
        Ok(S::Model::default())
    }
}

// Named webhooks, shared by Slack and Teams

const WEBHOOK_URL: SecretField = SecretField::new("webhooks.url");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookModel {
    pub name: Value<String>,
    #[serde(skip_serializing)]
    pub url_wo: Value<String>,
    pub url_wo_version: Value<String>,
    pub url: Value<String>,
}

fn webhook_name(hook: &WebhookModel) -> Option<&str> {
    hook.name.as_str()
}

fn plan_webhooks(planned: &mut Value<Vec<WebhookModel>>, prior: Option<&Value<Vec<WebhookModel>>>) {
    let prior = prior.map(list).unwrap_or_default();
    if let Value::Known(hooks) = planned {
        for hook in hooks {
            let stored = hook.name.as_str().and_then(|n| by_name(&prior, n, webhook_name));
            hook.url = plan_ciphertext(
                stored.map(|p| prior_secret(&p.url, &p.url_wo_version)),
                &hook.url_wo_version,
                false,
            );
        }
    }
}

fn webhook_inputs(
    planned: &Value<Vec<WebhookModel>>,
    prior: Option<&Value<Vec<WebhookModel>>>,
    config: &Value<Vec<WebhookModel>>,
) -> Result<Vec<Webhook>> {
    let (prior, config) = (prior.map(list).unwrap_or_default(), list(config));
    let null = Value::Null;
    list(planned)
        .iter()
        .map(|hook| {
            let name = key(&hook.name, "webhooks.name")?;
            let plaintext = by_name(&config, name, webhook_name).map_or(&null, |c| &c.url_wo);
            let url = Secret {
                field: WEBHOOK_URL,
                plaintext,
                version: &hook.url_wo_version,
            }
            .outgoing(
                by_name(&prior, name, webhook_name).map(|p| (&p.url, &p.url_wo_version)),
                false,
            );
            Ok(Webhook {
                name: name.to_string(),
                url,
            })
        })
        .collect()
}

fn webhooks_from_remote(remote: Vec<Webhook>, basis: &Value<Vec<WebhookModel>>, round: Round) -> Value<Vec<WebhookModel>> {
    let known = list(basis);
    let order = identifiers(&known, |h| h.name.as_str().unwrap_or_default().to_string());
    let null = Value::Null;
    let hooks = preserve_order(remote, &order, |w| w.name.clone())
        .into_iter()
        .map(|w| {
            let prior = by_name(&known, &w.name, webhook_name);
            let (url, url_wo_version) = round.secret(
                w.url,
                prior.map_or(&null, |p| &p.url),
                prior.map_or(&null, |p| &p.url_wo_version),
            );
            WebhookModel {
                name: Value::Known(w.name),
                url_wo: Value::Null,
                url_wo_version,
                url,
            }
        })
        .collect();
    list_or_null(hooks, Some(basis))
}

fn webhook_attribute() -> Attribute {
    Attribute::optional("webhooks").validate(Validator::UniqueStringAttribute("name"))
}

// Email

pub struct Email;

const SMTP_PASSWORD: SecretField = SecretField::new("smtp.password");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpModel {
    pub server: Value<String>,
    pub port: Value<String>,
    pub ssl: Value<bool>,
    pub username: Value<String>,
    #[serde(skip_serializing)]
    pub password_wo: Value<String>,
    pub password_wo_version: Value<String>,
    pub password: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailProfileModel {
    pub id: Value<String>,
    pub from_email: Value<String>,
    pub ses_region: Value<String>,
    pub smtp: Value<SmtpModel>,
}

impl Shape for Email {
    type Model = EmailProfileModel;
    type Input = EmailConfiguration;

    const KIND: ProfileKind = ProfileKind::Email;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_email";

    fn attributes(schema: Schema) -> Schema {
        schema
            .attr(Attribute::required("from_email").validate(Validator::NotBlank))
            .attr(Attribute::optional("ses_region"))
            .attr(Attribute::optional("smtp"))
    }

    fn validate(config: &EmailProfileModel) -> Vec<Diagnostic> {
        config
            .smtp
            .as_known()
            .and_then(|smtp| require("smtp.server", &smtp.server))
            .into_iter()
            .collect()
    }

    fn modify_plan(planned: &mut EmailProfileModel, prior: Option<&EmailProfileModel>) -> Result<()> {
        let stored = prior.and_then(|p| p.smtp.as_known());
        if let Value::Known(smtp) = &mut planned.smtp {
            smtp.password = plan_ciphertext(
                stored.map(|s| prior_secret(&s.password, &s.password_wo_version)),
                &smtp.password_wo_version,
                false,
            );
        }
        Ok(())
    }

    fn from_record(id: String, record: ProfileRecord, basis: &EmailProfileModel, round: Round) -> Result<EmailProfileModel> {
        let email = match record {
            ProfileRecord::Email(email) => email,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        let known = basis.smtp.as_known().cloned().unwrap_or_default();
        let smtp = email.smtp.map(|smtp| {
            let (password, password_wo_version) =
                round.secret(smtp.password, &known.password, &known.password_wo_version);
            SmtpModel {
                server: Value::Known(smtp.server),
                port: nullable_string(smtp.port),
                ssl: nullable_bool(smtp.ssl),
                username: nullable_string(smtp.username),
                password_wo: Value::Null,
                password_wo_version,
                password,
            }
        });
        Ok(EmailProfileModel {
            id: Value::Known(id),
            from_email: Value::Known(email.from_email),
            ses_region: nullable_string(email.ses_region),
            smtp: Value::from_option(smtp),
        })
    }

    fn input(
        planned: &EmailProfileModel,
        prior: Option<&EmailProfileModel>,
        config: &EmailProfileModel,
    ) -> Result<EmailConfiguration> {
        let smtp = match planned.smtp.as_known() {
            Some(smtp) => {
                let null = Value::Null;
                let plaintext = config.smtp.as_known().map_or(&null, |c| &c.password_wo);
                let stored = prior.and_then(|p| p.smtp.as_known());
                let password = Secret {
                    field: SMTP_PASSWORD,
                    plaintext,
                    version: &smtp.password_wo_version,
                }
                .outgoing(stored.map(|s| (&s.password, &s.password_wo_version)), false);
                Some(SmtpConfiguration {
                    server: key(&smtp.server, "smtp.server")?.to_string(),
                    port: opt(&smtp.port),
                    ssl: opt(&smtp.ssl),
                    username: opt(&smtp.username),
                    password,
                })
            }
            None => None,
        };
        Ok(EmailConfiguration {
            from_email: key(&planned.from_email, "from_email")?.to_string(),
            ses_region: opt(&planned.ses_region),
            smtp,
        })
    }
}

// Slack

pub struct Slack;

const SLACK_TOKEN: SecretField = SecretField::new("token");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackProfileModel {
    pub id: Value<String>,
    pub user_fields: Value<Vec<String>>,
    #[serde(skip_serializing)]
    pub token_wo: Value<String>,
    pub token_wo_version: Value<String>,
    pub token: Value<String>,
    pub webhooks: Value<Vec<WebhookModel>>,
}

impl Shape for Slack {
    type Model = SlackProfileModel;
    type Input = SlackConfiguration;

    const KIND: ProfileKind = ProfileKind::Slack;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_slack";

    fn attributes(schema: Schema) -> Schema {
        schema
            .attr(Attribute::optional("user_fields"))
            .attr(Attribute::write_only("token_wo"))
            .attr(Attribute::optional("token_wo_version"))
            .attr(Attribute::ciphertext("token", "token_wo_version"))
            .attr(webhook_attribute())
    }

    fn modify_plan(planned: &mut SlackProfileModel, prior: Option<&SlackProfileModel>) -> Result<()> {
        plan_webhooks(&mut planned.webhooks, prior.map(|p| &p.webhooks));
        Ok(())
    }

    fn from_record(id: String, record: ProfileRecord, basis: &SlackProfileModel, round: Round) -> Result<SlackProfileModel> {
        let slack = match record {
            ProfileRecord::Slack(slack) => slack,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        let (token, token_wo_version) = round.secret(slack.token, &basis.token, &basis.token_wo_version);
        Ok(SlackProfileModel {
            id: Value::Known(id),
            user_fields: list_or_null(slack.user_fields, Some(&basis.user_fields)),
            token_wo: Value::Null,
            token_wo_version,
            token,
            webhooks: webhooks_from_remote(slack.webhooks, &basis.webhooks, round),
        })
    }

    fn input(
        planned: &SlackProfileModel,
        prior: Option<&SlackProfileModel>,
        config: &SlackProfileModel,
    ) -> Result<SlackConfiguration> {
        let token = Secret {
            field: SLACK_TOKEN,
            plaintext: &config.token_wo,
            version: &planned.token_wo_version,
        }
        .outgoing(prior.map(|p| (&p.token, &p.token_wo_version)), false);
        Ok(SlackConfiguration {
            user_fields: list(&planned.user_fields),
            token,
            webhooks: webhook_inputs(&planned.webhooks, prior.map(|p| &p.webhooks), &config.webhooks)?,
        })
    }
}

// Teams (incoming webhooks)

pub struct Teams;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamsProfileModel {
    pub id: Value<String>,
    pub webhooks: Value<Vec<WebhookModel>>,
}

impl Shape for Teams {
    type Model = TeamsProfileModel;
    type Input = TeamsConfiguration;

    const KIND: ProfileKind = ProfileKind::Teams;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_teams";

    fn attributes(schema: Schema) -> Schema {
        schema.attr(webhook_attribute())
    }

    fn modify_plan(planned: &mut TeamsProfileModel, prior: Option<&TeamsProfileModel>) -> Result<()> {
        plan_webhooks(&mut planned.webhooks, prior.map(|p| &p.webhooks));
        Ok(())
    }

    fn from_record(id: String, record: ProfileRecord, basis: &TeamsProfileModel, round: Round) -> Result<TeamsProfileModel> {
        let teams = match record {
            ProfileRecord::Teams(teams) => teams,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        Ok(TeamsProfileModel {
            id: Value::Known(id),
            webhooks: webhooks_from_remote(teams.webhooks, &basis.webhooks, round),
        })
    }

    fn input(
        planned: &TeamsProfileModel,
        prior: Option<&TeamsProfileModel>,
        config: &TeamsProfileModel,
    ) -> Result<TeamsConfiguration> {
        Ok(TeamsConfiguration {
            webhooks: webhook_inputs(&planned.webhooks, prior.map(|p| &p.webhooks), &config.webhooks)?,
        })
    }
}

// Microsoft Teams (bot integration)

pub struct MsTeams;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfigModel {
    pub client_id: Value<String>,
    pub tenant_id: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerConfigModel {
    pub prefix: Value<String>,
    /// JSON document
    pub tags: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMappingModel {
    pub name: Value<String>,
    pub team_id: Value<String>,
    pub channel_id: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsTeamsProfileModel {
    pub id: Value<String>,
    pub access_config: Value<AccessConfigModel>,
    pub customer_config: Value<CustomerConfigModel>,
    pub channel_mappings: Value<Vec<ChannelMappingModel>>,
    pub bot_endpoint: Value<String>,
    pub wif_issuer_url: Value<String>,
    pub trust_role_arn: Value<String>,
}

impl Shape for MsTeams {
    type Model = MsTeamsProfileModel;
    type Input = MsTeamsConfiguration;

    const KIND: ProfileKind = ProfileKind::MsTeams;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_msteams";

    fn attributes(schema: Schema) -> Schema {
        schema
            .attr(Attribute::optional("access_config"))
            .attr(Attribute::optional("customer_config"))
            .attr(Attribute::optional("channel_mappings").validate(Validator::UniqueStringAttribute("name")))
            .attr(Attribute::computed("bot_endpoint").use_state())
            .attr(Attribute::computed("wif_issuer_url").use_state())
            .attr(Attribute::computed("trust_role_arn").use_state())
    }

    fn validate(config: &MsTeamsProfileModel) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if let Some(access) = config.access_config.as_known() {
            diagnostics.extend(require("access_config.client_id", &access.client_id));
            diagnostics.extend(require("access_config.tenant_id", &access.tenant_id));
        }
        if let Some(customer) = config.customer_config.as_known() {
            diagnostics.extend(require("customer_config.prefix", &customer.prefix));
            diagnostics.extend(crate::validators::check_str(Validator::Json, "customer_config.tags", &customer.tags));
        }
        for (i, mapping) in list(&config.channel_mappings).iter().enumerate() {
            for (name, value) in [
                ("name", &mapping.name),
                ("team_id", &mapping.team_id),
                ("channel_id", &mapping.channel_id),
            ] {
                diagnostics.extend(require(&format!("channel_mappings[{i}].{name}"), value));
            }
        }
        diagnostics
    }

    fn modify_plan(planned: &mut MsTeamsProfileModel, _prior: Option<&MsTeamsProfileModel>) -> Result<()> {
        if let Value::Known(customer) = &mut planned.customer_config {
            customer.tags = json::json_string(&customer.tags)
                .map_err(|e| Error::invalid("customer_config.tags", format!("value is not valid JSON: {e}")))?;
        }
        Ok(())
    }

    fn from_record(id: String, record: ProfileRecord, basis: &MsTeamsProfileModel, _round: Round) -> Result<MsTeamsProfileModel> {
        let teams = match record {
            ProfileRecord::MsTeams(teams) => teams,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        let customer_config = match teams.customer_config {
            Some(c) => Value::Known(CustomerConfigModel {
                prefix: Value::Known(c.prefix),
                tags: json::from_api(c.tags.as_ref())?,
            }),
            None => Value::Null,
        };
        let known = list(&basis.channel_mappings);
        let order = identifiers(&known, |m| m.name.as_str().unwrap_or_default().to_string());
        let mappings = preserve_order(teams.channel_mappings, &order, |m| m.name.clone())
            .into_iter()
            .map(|m| ChannelMappingModel {
                name: Value::Known(m.name),
                team_id: Value::Known(m.team_id),
                channel_id: Value::Known(m.channel_id),
            })
            .collect();
        Ok(MsTeamsProfileModel {
            id: Value::Known(id),
            access_config: Value::from_option(teams.access_config.map(|a| AccessConfigModel {
                client_id: Value::Known(a.client_id),
                tenant_id: Value::Known(a.tenant_id),
            })),
            customer_config,
            channel_mappings: list_or_null(mappings, Some(&basis.channel_mappings)),
            bot_endpoint: basis.bot_endpoint.clone(),
            wif_issuer_url: basis.wif_issuer_url.clone(),
            trust_role_arn: basis.trust_role_arn.clone(),
        })
    }

    fn input(
        planned: &MsTeamsProfileModel,
        _prior: Option<&MsTeamsProfileModel>,
        _config: &MsTeamsProfileModel,
    ) -> Result<MsTeamsConfiguration> {
        let access_config = match planned.access_config.as_known() {
            Some(a) => Some(MsTeamsAccessConfig {
                client_id: key(&a.client_id, "access_config.client_id")?.to_string(),
                tenant_id: key(&a.tenant_id, "access_config.tenant_id")?.to_string(),
            }),
            None => None,
        };
        let customer_config = match planned.customer_config.as_known() {
            Some(c) => Some(MsTeamsCustomerConfig {
                prefix: key(&c.prefix, "customer_config.prefix")?.to_string(),
                tags: c.tags.as_str().map(serde_json::from_str).transpose()?,
            }),
            None => None,
        };
        let channel_mappings = list(&planned.channel_mappings)
            .iter()
            .map(|m| {
                Ok(ChannelMapping {
                    name: key(&m.name, "channel_mappings.name")?.to_string(),
                    team_id: key(&m.team_id, "channel_mappings.team_id")?.to_string(),
                    channel_id: key(&m.channel_id, "channel_mappings.channel_id")?.to_string(),
                })
            })
            .collect::<Result<_>>()?;
        Ok(MsTeamsConfiguration {
            access_config,
            customer_config,
            channel_mappings,
        })
    }

    /// The integration surface is a platform fact, copied on every round
    fn decorate(api: &Api, ctx: &Context, model: &mut MsTeamsProfileModel) -> Result<()> {
        let surface = api.platform().msteams_integration_surface(&ctx.cancel)?;
        model.bot_endpoint = Value::Known(surface.bot_endpoint);
        model.wif_issuer_url = Value::Known(surface.wif_issuer_url);
        model.trust_role_arn = Value::Known(surface.trust_role_arn);
        Ok(())
    }
}

// Jira

pub struct Jira;

const JIRA_API_KEY: SecretField = SecretField::new("api_key");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraProjectModel {
    pub project: Value<String>,
    pub name: Value<String>,
    pub issue_types: Value<Vec<String>>,
    pub closed_status: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraProfileModel {
    pub id: Value<String>,
    pub url: Value<String>,
    pub user: Value<String>,
    #[serde(skip_serializing)]
    pub api_key_wo: Value<String>,
    pub api_key_wo_version: Value<String>,
    pub api_key: Value<String>,
    pub projects: Value<Vec<JiraProjectModel>>,
}

impl Shape for Jira {
    type Model = JiraProfileModel;
    type Input = JiraConfiguration;

    const KIND: ProfileKind = ProfileKind::Jira;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_jira";

    fn attributes(schema: Schema) -> Schema {
        schema
            .attr(Attribute::required("url").trim())
            .attr(Attribute::required("user"))
            .attr(Attribute::write_only("api_key_wo"))
            .attr(Attribute::optional("api_key_wo_version"))
            .attr(Attribute::ciphertext("api_key", "api_key_wo_version"))
            .attr(Attribute::optional("projects").validate(Validator::UniqueStringAttribute("project")))
    }

    fn validate(config: &JiraProfileModel) -> Vec<Diagnostic> {
        list(&config.projects)
            .iter()
            .enumerate()
            .flat_map(|(i, p)| {
                [
                    require(&format!("projects[{i}].project"), &p.project),
                    require(&format!("projects[{i}].name"), &p.name),
                    require(&format!("projects[{i}].closed_status"), &p.closed_status),
                ]
            })
            .flatten()
            .collect()
    }

    fn from_record(id: String, record: ProfileRecord, basis: &JiraProfileModel, round: Round) -> Result<JiraProfileModel> {
        let jira = match record {
            ProfileRecord::Jira(jira) => jira,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        let (api_key, api_key_wo_version) = round.secret(jira.api_key, &basis.api_key, &basis.api_key_wo_version);
        let known = list(&basis.projects);
        let order = identifiers(&known, |p| p.project.as_str().unwrap_or_default().to_string());
        let projects = preserve_order(jira.projects, &order, |p| p.project.clone())
            .into_iter()
            .map(|p| {
                let prior = known.iter().find(|b| b.project.as_str() == Some(p.project.as_str()));
                JiraProjectModel {
                    project: Value::Known(p.project),
                    name: Value::Known(p.name),
                    issue_types: list_or_null(p.issue_types, prior.map(|b| &b.issue_types)),
                    closed_status: Value::Known(p.closed_status),
                }
            })
            .collect();
        Ok(JiraProfileModel {
            id: Value::Known(id),
            url: Value::Known(jira.url),
            user: Value::Known(jira.user),
            api_key_wo: Value::Null,
            api_key_wo_version,
            api_key,
            projects: list_or_null(projects, Some(&basis.projects)),
        })
    }

    fn input(
        planned: &JiraProfileModel,
        prior: Option<&JiraProfileModel>,
        config: &JiraProfileModel,
    ) -> Result<JiraConfiguration> {
        let api_key = Secret {
            field: JIRA_API_KEY,
            plaintext: &config.api_key_wo,
            version: &planned.api_key_wo_version,
        }
        .outgoing(prior.map(|p| (&p.api_key, &p.api_key_wo_version)), false);
        let projects = list(&planned.projects)
            .iter()
            .map(|p| {
                Ok(JiraProject {
                    project: key(&p.project, "projects.project")?.to_string(),
                    name: key(&p.name, "projects.name")?.to_string(),
                    issue_types: list(&p.issue_types),
                    closed_status: key(&p.closed_status, "projects.closed_status")?.to_string(),
                })
            })
            .collect::<Result<_>>()?;
        Ok(JiraConfiguration {
            url: key(&planned.url, "url")?.to_string(),
            user: key(&planned.user, "user")?.to_string(),
            api_key,
            projects,
        })
    }
}

// ServiceNow

pub struct ServiceNow;

const SERVICENOW_PASSWORD: SecretField = SecretField::new("password");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNowProfileModel {
    pub id: Value<String>,
    pub endpoint: Value<String>,
    pub username: Value<String>,
    #[serde(skip_serializing)]
    pub password_wo: Value<String>,
    pub password_wo_version: Value<String>,
    pub password: Value<String>,
    pub issue_type: Value<String>,
    pub closed_state: Value<String>,
}

impl Shape for ServiceNow {
    type Model = ServiceNowProfileModel;
    type Input = ServiceNowConfiguration;

    const KIND: ProfileKind = ProfileKind::ServiceNow;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_servicenow";

    fn attributes(schema: Schema) -> Schema {
        schema
            .attr(Attribute::required("endpoint").trim())
            .attr(Attribute::required("username"))
            .attr(Attribute::write_only("password_wo"))
            .attr(Attribute::optional("password_wo_version"))
            .attr(Attribute::ciphertext("password", "password_wo_version"))
            .attr(Attribute::required("issue_type"))
            .attr(Attribute::required("closed_state"))
    }

    fn from_record(
        id: String,
        record: ProfileRecord,
        basis: &ServiceNowProfileModel,
        round: Round,
    ) -> Result<ServiceNowProfileModel> {
        let snow = match record {
            ProfileRecord::ServiceNow(snow) => snow,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        let (password, password_wo_version) = round.secret(snow.password, &basis.password, &basis.password_wo_version);
        Ok(ServiceNowProfileModel {
            id: Value::Known(id),
            endpoint: Value::Known(snow.endpoint),
            username: Value::Known(snow.username),
            password_wo: Value::Null,
            password_wo_version,
            password,
            issue_type: Value::Known(snow.issue_type),
            closed_state: Value::Known(snow.closed_state),
        })
    }

    fn input(
        planned: &ServiceNowProfileModel,
        prior: Option<&ServiceNowProfileModel>,
        config: &ServiceNowProfileModel,
    ) -> Result<ServiceNowConfiguration> {
        let password = Secret {
            field: SERVICENOW_PASSWORD,
            plaintext: &config.password_wo,
            version: &planned.password_wo_version,
        }
        .outgoing(prior.map(|p| (&p.password, &p.password_wo_version)), false);
        Ok(ServiceNowConfiguration {
            endpoint: key(&planned.endpoint, "endpoint")?.to_string(),
            username: key(&planned.username, "username")?.to_string(),
            password,
            issue_type: key(&planned.issue_type, "issue_type")?.to_string(),
            closed_state: key(&planned.closed_state, "closed_state")?.to_string(),
        })
    }
}

// Symphony

pub struct Symphony;

const SYMPHONY_PRIVATE_KEY: SecretField = SecretField::new("private_key");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymphonyProfileModel {
    pub id: Value<String>,
    pub agent_domain: Value<String>,
    pub service_account: Value<String>,
    #[serde(skip_serializing)]
    pub private_key_wo: Value<String>,
    pub private_key_wo_version: Value<String>,
    pub private_key: Value<String>,
}

impl Shape for Symphony {
    type Model = SymphonyProfileModel;
    type Input = SymphonyConfiguration;

    const KIND: ProfileKind = ProfileKind::Symphony;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_symphony";

    fn attributes(schema: Schema) -> Schema {
        schema
            .attr(Attribute::required("agent_domain").trim())
            .attr(Attribute::required("service_account"))
            .attr(Attribute::write_only("private_key_wo"))
            .attr(Attribute::optional("private_key_wo_version"))
            .attr(Attribute::ciphertext("private_key", "private_key_wo_version"))
    }

    fn from_record(id: String, record: ProfileRecord, basis: &SymphonyProfileModel, round: Round) -> Result<SymphonyProfileModel> {
        let symphony = match record {
            ProfileRecord::Symphony(symphony) => symphony,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        let (private_key, private_key_wo_version) =
            round.secret(symphony.private_key, &basis.private_key, &basis.private_key_wo_version);
        Ok(SymphonyProfileModel {
            id: Value::Known(id),
            agent_domain: Value::Known(symphony.agent_domain),
            service_account: Value::Known(symphony.service_account),
            private_key_wo: Value::Null,
            private_key_wo_version,
            private_key,
        })
    }

    fn input(
        planned: &SymphonyProfileModel,
        prior: Option<&SymphonyProfileModel>,
        config: &SymphonyProfileModel,
    ) -> Result<SymphonyConfiguration> {
        let private_key = Secret {
            field: SYMPHONY_PRIVATE_KEY,
            plaintext: &config.private_key_wo,
            version: &planned.private_key_wo_version,
        }
        .outgoing(prior.map(|p| (&p.private_key, &p.private_key_wo_version)), false);
        Ok(SymphonyConfiguration {
            agent_domain: key(&planned.agent_domain, "agent_domain")?.to_string(),
            service_account: key(&planned.service_account, "service_account")?.to_string(),
            private_key,
        })
    }
}

// Owner resolution

fn owner_attributes(schema: Schema) -> Schema {
    schema
        .attr(Attribute::optional("org_domain"))
        .attr(Attribute::optional("org_domain_tag_key"))
        .attr(Attribute::optional("tags"))
}

pub struct AccountOwners;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountOwnersDefaultModel {
    pub account_key: Value<String>,
    pub owners: Value<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountOwnersProfileModel {
    pub id: Value<String>,
    pub default: Value<Vec<AccountOwnersDefaultModel>>,
    pub org_domain: Value<String>,
    pub org_domain_tag_key: Value<String>,
    pub tags: Value<Vec<String>>,
}

impl Shape for AccountOwners {
    type Model = AccountOwnersProfileModel;
    type Input = OwnersConfiguration<AccountOwnersDefault>;

    const KIND: ProfileKind = ProfileKind::AccountOwners;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_account_owners";

    fn attributes(schema: Schema) -> Schema {
        owner_attributes(
            schema.attr(Attribute::optional("default").validate(Validator::UniqueStringAttribute("account_key"))),
        )
    }

    fn validate(config: &AccountOwnersProfileModel) -> Vec<Diagnostic> {
        list(&config.default)
            .iter()
            .enumerate()
            .filter_map(|(i, d)| require(&format!("default[{i}].account_key"), &d.account_key))
            .collect()
    }

    fn from_record(
        id: String,
        record: ProfileRecord,
        basis: &AccountOwnersProfileModel,
        _round: Round,
    ) -> Result<AccountOwnersProfileModel> {
        let owners = match record {
            ProfileRecord::AccountOwners(owners) => owners,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        let known = list(&basis.default);
        let order = identifiers(&known, |d| d.account_key.as_str().unwrap_or_default().to_string());
        let defaults = preserve_order(owners.default, &order, |d| d.account_key.clone())
            .into_iter()
            .map(|d| {
                let prior = known.iter().find(|b| b.account_key.as_str() == Some(d.account_key.as_str()));
                AccountOwnersDefaultModel {
                    account_key: Value::Known(d.account_key),
                    owners: list_or_null(d.owners, prior.map(|b| &b.owners)),
                }
            })
            .collect();
        Ok(AccountOwnersProfileModel {
            id: Value::Known(id),
            default: list_or_null(defaults, Some(&basis.default)),
            org_domain: nullable_string(owners.org_domain),
            org_domain_tag_key: nullable_string(owners.org_domain_tag_key),
            tags: list_or_null(owners.tags, Some(&basis.tags)),
        })
    }

    fn input(
        planned: &AccountOwnersProfileModel,
        _prior: Option<&AccountOwnersProfileModel>,
        _config: &AccountOwnersProfileModel,
    ) -> Result<OwnersConfiguration<AccountOwnersDefault>> {
        let default = list(&planned.default)
            .iter()
            .map(|d| {
                Ok(AccountOwnersDefault {
                    account_key: key(&d.account_key, "default.account_key")?.to_string(),
                    owners: list(&d.owners),
                })
            })
            .collect::<Result<_>>()?;
        Ok(OwnersConfiguration {
            default,
            org_domain: opt(&planned.org_domain),
            org_domain_tag_key: opt(&planned.org_domain_tag_key),
            tags: list(&planned.tags),
        })
    }
}

pub struct ResourceOwner;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceOwnerProfileModel {
    pub id: Value<String>,
    pub default: Value<Vec<String>>,
    pub org_domain: Value<String>,
    pub org_domain_tag_key: Value<String>,
    pub tags: Value<Vec<String>>,
}

impl Shape for ResourceOwner {
    type Model = ResourceOwnerProfileModel;
    type Input = OwnersConfiguration<String>;

    const KIND: ProfileKind = ProfileKind::ResourceOwner;
    const TYPE_NAME: &'static str = "stacklet_configuration_profile_resource_owner";

    fn attributes(schema: Schema) -> Schema {
        owner_attributes(schema.attr(Attribute::optional("default")))
    }

    fn from_record(
        id: String,
        record: ProfileRecord,
        basis: &ResourceOwnerProfileModel,
        _round: Round,
    ) -> Result<ResourceOwnerProfileModel> {
        let owners = match record {
            ProfileRecord::ResourceOwner(owners) => owners,
            other => return Err(unexpected(Self::KIND, &other)),
        };
        Ok(ResourceOwnerProfileModel {
            id: Value::Known(id),
            default: list_or_null(owners.default, Some(&basis.default)),
            org_domain: nullable_string(owners.org_domain),
            org_domain_tag_key: nullable_string(owners.org_domain_tag_key),
            tags: list_or_null(owners.tags, Some(&basis.tags)),
        })
    }

    fn input(
        planned: &ResourceOwnerProfileModel,
        _prior: Option<&ResourceOwnerProfileModel>,
        _config: &ResourceOwnerProfileModel,
    ) -> Result<OwnersConfiguration<String>> {
        Ok(OwnersConfiguration {
            default: list(&planned.default),
            org_domain: opt(&planned.org_domain),
            org_domain_tag_key: opt(&planned.org_domain_tag_key),
            tags: list(&planned.tags),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use declarative::{Action, DynResource};
    use serde_json::{Value as Json, json};

    fn configured(op: &str, name: &str, record: Json) -> Json {
        json!({op: {"configuration": {"id": "p-1", "name": name, "record": record}, "problems": []}})
    }

    #[test]
    fn test_email_password_sent_once() {
        let (api, mock) = testing::api();
        mock.reply(
            "addEmailProfile",
            configured(
                "addEmailProfile",
                "email",
                json!({"__typename": "EmailConfiguration", "fromEmail": "noreply@example.com",
                       "smtp": {"server": "smtp.example.com", "port": "587", "ssl": true, "password": "ENC1"}}),
            ),
        );
        let resource = ProfileResource::<Email>::new(api);
        let config = json!({
            "from_email": "noreply@example.com",
            "smtp": {"server": "smtp.example.com", "port": "587", "ssl": true,
                     "password_wo": "hunter2", "password_wo_version": "1"}
        });
        let change = resource.plan(Some(&config), None).unwrap();
        assert!(change.planned.as_ref().unwrap()["smtp"].get("password_wo").is_none());
        let state = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(state["smtp"]["password"], json!("ENC1"));
        assert_eq!(state["smtp"]["password_wo_version"], json!("1"));
        let sent = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(sent["smtp"]["password"], json!("hunter2"));

        assert_eq!(resource.plan(Some(&config), Some(&state)).unwrap().action, Action::NoOp);

        // a changed server echoes the stored ciphertext
        let mut moved = config.clone();
        moved["smtp"]["server"] = json!("smtp2.example.com");
        let change = resource.plan(Some(&moved), Some(&state)).unwrap();
        assert_eq!(change.action, Action::Update);
        resource.apply(&Context::new(), &change, Some(&moved), Some(&state)).unwrap();
        let sent = mock.requests()[1].variable("input").cloned().unwrap();
        assert_eq!(sent["smtp"]["password"], json!("ENC1"));
    }

    fn slack_state() -> Json {
        json!({
            "id": "p-1", "user_fields": null,
            "token_wo_version": "1", "token": "ENCT",
            "webhooks": [
                {"name": "alerts", "url_wo_version": "1", "url": "ENCA"},
                {"name": "ops", "url_wo_version": "1", "url": "ENCO"}
            ]
        })
    }

    fn slack_config() -> Json {
        json!({
            "token_wo": "xoxb", "token_wo_version": "1",
            "webhooks": [
                {"name": "alerts", "url_wo": "https://hooks/a", "url_wo_version": "1"},
                {"name": "ops", "url_wo": "https://hooks/o", "url_wo_version": "1"}
            ]
        })
    }

    #[test]
    fn test_slack_webhook_rotates_alone() {
        let (api, mock) = testing::api();
        mock.reply(
            "addSlackProfile",
            configured(
                "addSlackProfile",
                "slack",
                json!({"__typename": "SlackConfiguration", "token": "ENCT",
                       "webhooks": [{"name": "ops", "url": "ENCO"}, {"name": "alerts", "url": "ENCA2"}]}),
            ),
        );
        let resource = ProfileResource::<Slack>::new(api);
        let state = slack_state();
        assert_eq!(resource.plan(Some(&slack_config()), Some(&state)).unwrap().action, Action::NoOp);

        let mut config = slack_config();
        config["webhooks"][0]["url_wo"] = json!("https://hooks/a2");
        config["webhooks"][0]["url_wo_version"] = json!("2");
        let change = resource.plan(Some(&config), Some(&state)).unwrap();
        assert_eq!(change.action, Action::Update);
        let planned = change.planned.clone().unwrap();
        assert_eq!(planned["webhooks"][0]["url"], json!({"$unknown": true}));
        assert_eq!(planned["webhooks"][1]["url"], json!("ENCO"));

        let applied = resource.apply(&Context::new(), &change, Some(&config), Some(&state)).unwrap().unwrap();
        let sent = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(sent["token"], json!("ENCT"));
        assert_eq!(sent["webhooks"][0]["url"], json!("https://hooks/a2"));
        assert_eq!(sent["webhooks"][1]["url"], json!("ENCO"));

        // remote order does not leak into state
        assert_eq!(applied["webhooks"][0]["name"], json!("alerts"));
        assert_eq!(applied["webhooks"][0]["url"], json!("ENCA2"));
        assert_eq!(applied["webhooks"][0]["url_wo_version"], json!("2"));
    }

    #[test]
    fn test_duplicate_webhook_names_rejected() {
        let (api, _) = testing::api();
        let resource = ProfileResource::<Teams>::new(api);
        let config = json!({"webhooks": [{"name": "a", "url_wo": "x"}, {"name": "a", "url_wo": "y"}]});
        assert!(matches!(resource.plan(Some(&config), None), Err(Error::Validation(_))));
    }

    #[test]
    fn test_msteams_copies_surface() {
        let (api, mock) = testing::api();
        mock.reply(
            "profile",
            json!({"profile": {"id": "p-1", "name": "msteams", "record": {
                "__typename": "MSTeamsConfiguration",
                "accessConfig": {"clientID": "c", "tenantID": "t"},
                "customerConfig": {"prefix": "stk", "tags": {"team": "sec"}},
                "channelMappings": [{"name": "sec", "teamID": "T1", "channelID": "C1"}]
            }}}),
        );
        mock.reply(
            "msTeamsIntegrationSurface",
            json!({"platform": {"msTeamsIntegrationSurface": {
                "botEndpoint": "https://bot", "wifIssuerURL": "https://wif", "trustRoleARN": "arn:aws:iam::1:role/t"
            }}}),
        );
        let resource = ProfileResource::<MsTeams>::new(api);
        let state = resource.import_state(&Context::new(), "msteams").unwrap();
        assert_eq!(state["bot_endpoint"], json!("https://bot"));
        assert_eq!(state["trust_role_arn"], json!("arn:aws:iam::1:role/t"));
        assert_eq!(state["customer_config"]["tags"], json!(r#"{"team":"sec"}"#));
        assert_eq!(state["channel_mappings"][0]["team_id"], json!("T1"));
    }

    #[test]
    fn test_import_requires_fixed_name() {
        let (api, _) = testing::api();
        let resource = ProfileResource::<Jira>::new(api);
        let err = resource.import_state(&Context::new(), "slack").unwrap_err();
        assert!(matches!(err, Error::ImportId { ref expected } if expected == "jira"));
    }

    #[test]
    fn test_jira_key_rotation() {
        let (api, mock) = testing::api();
        mock.reply(
            "addJiraProfile",
            configured(
                "addJiraProfile",
                "jira",
                json!({"__typename": "JiraConfiguration", "url": "https://x.atlassian.net", "user": "bot",
                       "apiKey": "ENC2", "projects": [{"project": "SEC", "name": "Security", "closedStatus": "Done"}]}),
            ),
        );
        let resource = ProfileResource::<Jira>::new(api);
        let state = json!({
            "id": "p-1", "url": "https://x.atlassian.net", "user": "bot",
            "api_key_wo_version": "1", "api_key": "ENC1",
            "projects": [{"project": "SEC", "name": "Security", "issue_types": [], "closed_status": "Done"}]
        });
        let config = json!({
            "url": "https://x.atlassian.net", "user": "bot",
            "api_key_wo": "new-key", "api_key_wo_version": "2",
            "projects": [{"project": "SEC", "name": "Security", "issue_types": [], "closed_status": "Done"}]
        });
        let change = resource.plan(Some(&config), Some(&state)).unwrap();
        assert_eq!(change.action, Action::Update);
        let applied = resource.apply(&Context::new(), &change, Some(&config), Some(&state)).unwrap().unwrap();
        assert_eq!(mock.requests()[0].variable("input").unwrap()["apiKey"], json!("new-key"));
        assert_eq!(applied["api_key"], json!("ENC2"));
        assert_eq!(resource.plan(Some(&config), Some(&applied)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_jira_issue_types_left_out_settles() {
        let (api, mock) = testing::api();
        mock.reply(
            "addJiraProfile",
            configured(
                "addJiraProfile",
                "jira",
                json!({"__typename": "JiraConfiguration", "url": "https://x.atlassian.net", "user": "bot",
                       "apiKey": "ENC1", "projects": [{"project": "SEC", "name": "Security", "closedStatus": "Done"}]}),
            ),
        );
        let resource = ProfileResource::<Jira>::new(api);
        let config = json!({
            "url": "https://x.atlassian.net", "user": "bot",
            "api_key_wo": "key", "api_key_wo_version": "1",
            "projects": [{"project": "SEC", "name": "Security", "closed_status": "Done"}]
        });
        let change = resource.plan(Some(&config), None).unwrap();
        assert_eq!(change.action, Action::Create);
        let applied = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(applied["projects"][0]["issue_types"], Json::Null);
        assert_eq!(resource.plan(Some(&config), Some(&applied)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_account_owners_list_left_out_settles() {
        let (api, mock) = testing::api();
        mock.reply(
            "addAccountOwnersProfile",
            configured(
                "addAccountOwnersProfile",
                "account_owners",
                json!({"__typename": "AccountOwnersConfiguration", "default": [{"accountKey": "123"}], "tags": []}),
            ),
        );
        let resource = ProfileResource::<AccountOwners>::new(api);
        let config = json!({"default": [{"account_key": "123"}]});
        let change = resource.plan(Some(&config), None).unwrap();
        let applied = resource.apply(&Context::new(), &change, Some(&config), None).unwrap().unwrap();
        assert_eq!(applied["default"][0]["owners"], Json::Null);
        assert_eq!(resource.plan(Some(&config), Some(&applied)).unwrap().action, Action::NoOp);

        // a known empty list stays known
        let state = json!({"id": "p-1", "default": [{"account_key": "123", "owners": []}],
                           "org_domain": null, "org_domain_tag_key": null, "tags": null});
        let config = json!({"default": [{"account_key": "123", "owners": []}]});
        assert_eq!(resource.plan(Some(&config), Some(&state)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_delete_clears_profile() {
        let (api, mock) = testing::api();
        mock.reply("removeProfile", json!({"removeProfile": {"configuration": {"id": "p-1"}, "problems": []}}));
        let resource = ProfileResource::<ResourceOwner>::new(api);
        let state = json!({"id": "p-1", "default": ["secops@example.com"], "org_domain": null,
                           "org_domain_tag_key": null, "tags": ["owner"]});
        let change = resource.plan(None, Some(&state)).unwrap();
        assert!(resource.apply(&Context::new(), &change, None, Some(&state)).unwrap().is_none());
        assert_eq!(mock.requests()[0].variable("name"), Some(&json!("resource_owner")));
    }

    #[test]
    fn test_account_owner_defaults_need_key() {
        let (api, _) = testing::api();
        let resource = ProfileResource::<AccountOwners>::new(api);
        let config = json!({"default": [{"owners": ["a@example.com"]}]});
        let Err(Error::Validation(d)) = resource.plan(Some(&config), None) else {
            panic!("expected validation error");
        };
        assert_eq!(d[0].path.as_deref(), Some("default[0].account_key"));
    }
}
