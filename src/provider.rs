//! Provider: one API handle plus the registry of resource kinds

use crate::api::Api;
use crate::config::ProviderConfig;
use crate::resource;
use declarative::{BoxedResource, Error, Result};
use graphql::Client;
use graphql::transport::http::HttpTransport;

pub struct Provider {
    api: Api,
    kinds: Vec<BoxedResource>,
}

impl Provider {
    /// Connect over HTTPS using the validated configuration
    pub fn connect(config: &ProviderConfig) -> Result<Self> {
        let http = config.http_config()?;
        log::debug!("using endpoint {}", http.endpoint);
        Ok(Self::new(Api::new(Client::new(HttpTransport::new(http)))))
    }

    pub fn new(api: Api) -> Self {
        let kinds = resource::all(&api);
        Self { api, kinds }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn kinds(&self) -> &[BoxedResource] {
        &self.kinds
    }

    /// Look up a kind by type name
    pub fn resource(&self, kind: &str) -> Result<BoxedResource> {
        self.kinds
            .iter()
            .find(|r| r.kind() == kind)
            .cloned()
            .ok_or_else(|| Error::invalid("type", format!("unknown resource type \"{kind}\"")))
    }
}
