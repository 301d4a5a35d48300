//! Cloud accounts

use super::{entity, problems};
use crate::enums::CloudProvider;
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! account_fields {
    () => {
        "id key name shortName description provider path email securityContext variables"
    };
}

const READ: &str = concat!(
    "query account($provider: CloudProvider!, $key: String!) { account(provider: $provider, key: $key) { ",
    account_fields!(),
    " } }"
);

const ADD: &str = concat!(
    "mutation addAccount($input: AccountInput!) { addAccount(input: $input) { account { ",
    account_fields!(),
    " } ",
    problems!(),
    " } }"
);

const UPDATE: &str = concat!(
    "mutation updateAccount($input: UpdateAccountInput!) { updateAccount(input: $input) { account { ",
    account_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removeAccount($provider: CloudProvider!, $key: String!) { removeAccount(provider: $provider, key: $key) { account { id } ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub key: String,
    pub name: String,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub provider: CloudProvider,
    pub path: Option<String>,
    pub email: Option<String>,
    pub security_context: Option<String>,
    /// JSON document, as a string or an object
    pub variables: Option<Json>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInput {
    pub key: String,
    pub provider: String,
    pub name: String,
    pub short_name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub security_context: Option<String>,
    pub variables: Option<String>,
}

pub struct Accounts<'a> {
    client: &'a Client,
}

impl<'a> Accounts<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, provider: CloudProvider, key: &str) -> Result<Account> {
        let request = Request::query("account", READ)
            .var("provider", provider)?
            .var("key", key)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "account", format_args!("account {provider}:{key}"))
    }

    pub fn create(&self, cancel: &Cancellation, input: &AccountInput) -> Result<Account> {
        let request = Request::mutation("addAccount", ADD).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "addAccount")?;
        entity(payload, "account", format_args!("account {}", input.key))
    }

    pub fn update(&self, cancel: &Cancellation, input: &AccountInput) -> Result<Account> {
        let request = Request::mutation("updateAccount", UPDATE).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "updateAccount")?;
        entity(payload, "account", format_args!("account {}", input.key))
    }

    pub fn delete(&self, cancel: &Cancellation, provider: CloudProvider, key: &str) -> Result<()> {
        let request = Request::mutation("removeAccount", REMOVE)
            .var("provider", provider)?
            .var("key", key)?;
        let _: Json = self.client.mutate(cancel, request, "removeAccount")?;
        Ok(())
    }
}
