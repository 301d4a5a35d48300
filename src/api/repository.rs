//! Policy source repositories
//!
//! Reads go through `repositoryConfig`, by UUID or by URL.

use super::{entity, problems};
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! repository_fields {
    () => {
        "id uuid url name description webhookURL authUser authToken sshPublicKey sshPrivateKey sshPassphrase"
    };
}

const READ: &str = concat!(
    "query repositoryConfig($uuid: String!) { repositoryConfig(uuid: $uuid) { ",
    repository_fields!(),
    " } }"
);

const READ_BY_URL: &str = concat!(
    "query repositoryConfigByURL($url: String!) { repositoryConfig(url: $url) { ",
    repository_fields!(),
    " } }"
);

const ADD: &str = concat!(
    "mutation addRepository($input: AddRepositoryInput!) { addRepository(input: $input) { repository { ",
    repository_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPDATE: &str = concat!(
    "mutation updateRepository($input: UpdateRepositoryInput!) { updateRepository(input: $input) { repository { ",
    repository_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removeRepository($url: String!) { removeRepository(url: $url) { repository { id } ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: String,
    pub uuid: String,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "webhookURL")]
    pub webhook_url: Option<String>,
    pub auth_user: Option<String>,
    /// Ciphertexts of the stored secrets
    pub auth_token: Option<String>,
    pub ssh_public_key: Option<String>,
    pub ssh_private_key: Option<String>,
    pub ssh_passphrase: Option<String>,
}

/// Secrets carry plaintext, an echoed ciphertext, or are left out
#[derive(Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub auth_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_passphrase: Option<String>,
}

impl std::fmt::Debug for RepositoryInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("RepositoryInput")
            .field("uuid", &self.uuid)
            .field("url", &self.url)
            .field("name", &self.name)
            .field("auth_user", &self.auth_user)
            .field("auth_token", &redact(&self.auth_token))
            .field("ssh_private_key", &redact(&self.ssh_private_key))
            .field("ssh_passphrase", &redact(&self.ssh_passphrase))
            .finish_non_exhaustive()
    }
}

pub struct Repositories<'a> {
    client: &'a Client,
}

impl<'a> Repositories<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, uuid: &str) -> Result<Repository> {
        let request = Request::query("repositoryConfig", READ).var("uuid", uuid)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "repositoryConfig", format_args!("repository {uuid}"))
    }

    pub fn read_by_url(&self, cancel: &Cancellation, url: &str) -> Result<Repository> {
        let request = Request::query("repositoryConfigByURL", READ_BY_URL).var("url", url)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "repositoryConfig", format_args!("repository {url}"))
    }

    pub fn create(&self, cancel: &Cancellation, input: &RepositoryInput) -> Result<Repository> {
        let request = Request::mutation("addRepository", ADD).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "addRepository")?;
        entity(payload, "repository", format_args!("repository {}", input.url))
    }

    pub fn update(&self, cancel: &Cancellation, input: &RepositoryInput) -> Result<Repository> {
        let request = Request::mutation("updateRepository", UPDATE).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "updateRepository")?;
        entity(payload, "repository", format_args!("repository {}", input.url))
    }

    pub fn delete(&self, cancel: &Cancellation, url: &str) -> Result<()> {
        let request = Request::mutation("removeRepository", REMOVE).var("url", url)?;
        let _: Json = self.client.mutate(cancel, request, "removeRepository")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql::MockTransport;
    use serde_json::json;

    #[test]
    fn test_read_by_url() {
        let mock = MockTransport::new();
        mock.reply(
            "repositoryConfigByURL",
            json!({"repositoryConfig": {"id": "r", "uuid": "u", "url": "https://git.example.com/p.git", "name": "p"}}),
        );
        let client = Client::new(mock.clone());
        let repo = Repositories::new(&client)
            .read_by_url(&Cancellation::new(), "https://git.example.com/p.git")
            .unwrap();
        assert_eq!(repo.uuid, "u");
        assert!(repo.auth_token.is_none());
    }

    #[test]
    fn test_input_debug_redacts() {
        let input = RepositoryInput {
            auth_token: Some("ghp_plain".into()),
            ..RepositoryInput::default()
        };
        let rendered = format!("{input:?}");
        assert!(!rendered.contains("ghp_plain"));
        assert!(rendered.contains("<redacted>"));
    }
}
