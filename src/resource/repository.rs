//! Repository resource - a git source for dynamic policy collections
//!
//! Credentials are write-only. The remote hands back a ciphertext for each,
//! which is echoed on later updates until its version token changes.

use super::{Secret, key, opt, read_ciphertext};
use crate::api::Api;
use crate::api::repository::{Repository, RepositoryInput};
use declarative::secret::settle;
use declarative::value::nullable_string;
use declarative::{Attribute, Context, ImportKeys, Resource, Result, Schema, SecretField, SecretState, Value};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "stacklet_repository";

const AUTH_TOKEN: SecretField = SecretField::new("auth_token");
const SSH_PRIVATE_KEY: SecretField = SecretField::new("ssh_private_key");
const SSH_PASSPHRASE: SecretField = SecretField::new("ssh_passphrase");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryModel {
    pub id: Value<String>,
    pub uuid: Value<String>,
    pub url: Value<String>,
    pub name: Value<String>,
    pub description: Value<String>,
    pub webhook_url: Value<String>,
    pub auth_user: Value<String>,
    #[serde(skip_serializing)]
    pub auth_token_wo: Value<String>,
    pub auth_token_wo_version: Value<String>,
    pub auth_token: Value<String>,
    #[serde(skip_serializing)]
    pub ssh_private_key_wo: Value<String>,
    pub ssh_private_key_wo_version: Value<String>,
    pub ssh_private_key: Value<String>,
    #[serde(skip_serializing)]
    pub ssh_passphrase_wo: Value<String>,
    pub ssh_passphrase_wo_version: Value<String>,
    pub ssh_passphrase: Value<String>,
    pub ssh_public_key: Value<String>,
}

/// Ciphertext and version of each secret, in field order
struct Ciphertexts {
    auth_token: (Value<String>, Value<String>),
    ssh_private_key: (Value<String>, Value<String>),
    ssh_passphrase: (Value<String>, Value<String>),
}

impl RepositoryModel {
    fn from_remote(repo: Repository, ciphertexts: Ciphertexts) -> Self {
        let Ciphertexts {
            auth_token,
            ssh_private_key,
            ssh_passphrase,
        } = ciphertexts;
        Self {
            id: Value::Known(repo.id),
            uuid: Value::Known(repo.uuid),
            url: Value::Known(repo.url),
            name: Value::Known(repo.name),
            description: nullable_string(repo.description),
            webhook_url: nullable_string(repo.webhook_url),
            auth_user: nullable_string(repo.auth_user),
            auth_token_wo: Value::Null,
            auth_token: auth_token.0,
            auth_token_wo_version: auth_token.1,
            ssh_private_key_wo: Value::Null,
            ssh_private_key: ssh_private_key.0,
            ssh_private_key_wo_version: ssh_private_key.1,
            ssh_passphrase_wo: Value::Null,
            ssh_passphrase: ssh_passphrase.0,
            ssh_passphrase_wo_version: ssh_passphrase.1,
            ssh_public_key: nullable_string(repo.ssh_public_key),
        }
    }

    fn input(&self, uuid: Option<String>, prior: Option<&Self>, config: &Self) -> Result<RepositoryInput> {
        let auth_token = Secret {
            field: AUTH_TOKEN,
            plaintext: &config.auth_token_wo,
            version: &self.auth_token_wo_version,
        };
        let ssh_private_key = Secret {
            field: SSH_PRIVATE_KEY,
            plaintext: &config.ssh_private_key_wo,
            version: &self.ssh_private_key_wo_version,
        };
        let ssh_passphrase = Secret {
            field: SSH_PASSPHRASE,
            plaintext: &config.ssh_passphrase_wo,
            version: &self.ssh_passphrase_wo_version,
        };
        Ok(RepositoryInput {
            uuid,
            url: key(&self.url, "url")?.to_string(),
            name: key(&self.name, "name")?.to_string(),
            description: opt(&self.description),
            auth_user: opt(&self.auth_user),
            auth_token: auth_token.outgoing(prior.map(|p| (&p.auth_token, &p.auth_token_wo_version)), false),
            ssh_private_key: ssh_private_key
                .outgoing(prior.map(|p| (&p.ssh_private_key, &p.ssh_private_key_wo_version)), false),
            ssh_passphrase: ssh_passphrase
                .outgoing(prior.map(|p| (&p.ssh_passphrase, &p.ssh_passphrase_wo_version)), false),
        })
    }

    /// Ciphertexts after a write
    fn settled(&self, prior: Option<&Self>, repo: &Repository) -> Ciphertexts {
        let prior = prior.cloned().unwrap_or_default();
        Ciphertexts {
            auth_token: settle(
                repo.auth_token.clone(),
                Some(stored(&prior.auth_token, &prior.auth_token_wo_version)),
                &self.auth_token_wo_version,
            ),
            ssh_private_key: settle(
                repo.ssh_private_key.clone(),
                Some(stored(&prior.ssh_private_key, &prior.ssh_private_key_wo_version)),
                &self.ssh_private_key_wo_version,
            ),
            ssh_passphrase: settle(
                repo.ssh_passphrase.clone(),
                Some(stored(&prior.ssh_passphrase, &prior.ssh_passphrase_wo_version)),
                &self.ssh_passphrase_wo_version,
            ),
        }
    }

    /// Ciphertexts after a read: stored ones win
    fn observed(&self, repo: &Repository) -> Ciphertexts {
        Ciphertexts {
            auth_token: (
                read_ciphertext(&self.auth_token, repo.auth_token.clone()),
                self.auth_token_wo_version.clone(),
            ),
            ssh_private_key: (
                read_ciphertext(&self.ssh_private_key, repo.ssh_private_key.clone()),
                self.ssh_private_key_wo_version.clone(),
            ),
            ssh_passphrase: (
                read_ciphertext(&self.ssh_passphrase, repo.ssh_passphrase.clone()),
                self.ssh_passphrase_wo_version.clone(),
            ),
        }
    }
}

pub struct RepositoryResource {
    api: Api,
}

impl RepositoryResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for RepositoryResource {
    type Model = RepositoryModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::computed("uuid").use_state())
            .attr(Attribute::required("url").replace().trim())
            .attr(Attribute::required("name"))
            .attr(Attribute::optional("description"))
            .attr(Attribute::computed("webhook_url").use_state())
            .attr(Attribute::optional("auth_user"))
            .attr(Attribute::write_only("auth_token_wo"))
            .attr(Attribute::optional("auth_token_wo_version"))
            .attr(Attribute::ciphertext("auth_token", "auth_token_wo_version"))
            .attr(Attribute::write_only("ssh_private_key_wo"))
            .attr(Attribute::optional("ssh_private_key_wo_version"))
            .attr(Attribute::ciphertext("ssh_private_key", "ssh_private_key_wo_version"))
            .attr(Attribute::write_only("ssh_passphrase_wo"))
            .attr(Attribute::optional("ssh_passphrase_wo_version"))
            .attr(Attribute::ciphertext("ssh_passphrase", "ssh_passphrase_wo_version"))
            .attr(Attribute::computed("ssh_public_key"))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["url"])
    }

    /// Imported state knows only the URL; the UUID is resolved from it
    fn read(&self, ctx: &Context, state: &RepositoryModel) -> Result<Option<RepositoryModel>> {
        let repositories = self.api.repositories();
        let repo = match state.uuid.as_str() {
            Some(uuid) if !uuid.is_empty() => repositories.read(&ctx.cancel, uuid)?,
            _ => repositories.read_by_url(&ctx.cancel, key(&state.url, "url")?)?,
        };
        let ciphertexts = state.observed(&repo);
        Ok(Some(RepositoryModel::from_remote(repo, ciphertexts)))
    }

    fn create(&self, ctx: &Context, planned: &RepositoryModel, config: &RepositoryModel) -> Result<RepositoryModel> {
        let repo = self
            .api
            .repositories()
            .create(&ctx.cancel, &planned.input(None, None, config)?)?;
        log::info!("created repository {} ({})", repo.url, repo.uuid);
        let ciphertexts = planned.settled(None, &repo);
        Ok(RepositoryModel::from_remote(repo, ciphertexts))
    }

    fn update(
        &self,
        ctx: &Context,
        prior: &RepositoryModel,
        planned: &RepositoryModel,
        config: &RepositoryModel,
    ) -> Result<RepositoryModel> {
        let uuid = key(&prior.uuid, "uuid")?.to_string();
        let input = planned.input(Some(uuid), Some(prior), config)?;
        let repo = self.api.repositories().update(&ctx.cancel, &input)?;
        let ciphertexts = planned.settled(Some(prior), &repo);
        Ok(RepositoryModel::from_remote(repo, ciphertexts))
    }

    fn delete(&self, ctx: &Context, state: &RepositoryModel) -> Result<()> {
        self.api.repositories().delete(&ctx.cancel, key(&state.url, "url")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<RepositoryModel> {
        Ok(RepositoryModel {
            url: Value::Known(self.import_keys().values(id)?.remove(0)),
            ..RepositoryModel::default()
        })
    }
}

fn stored<'a>(ciphertext: &'a Value<String>, version: &'a Value<String>) -> SecretState<'a> {
    SecretState { ciphertext, version }
}
