//! Desired-state manifest
//!
//! ```toml
//! [[resource]]
//! type = "stacklet_account_group"
//! name = "prod"
//!
//! [resource.attributes]
//! name = "Production"
//! cloud_provider = "AWS"
//! regions = ["us-east-1"]
//! ```
//!
//! `type` and `name` form the local address; `attributes` is the resource
//! configuration, the same shape a state record stores.

use crate::state;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_MANIFEST_FILE: &str = "stacklet.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "resource")]
    pub resources: Vec<ManifestResource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Map<String, Json>,
}

impl ManifestResource {
    pub fn address(&self) -> String {
        state::address(&self.kind, &self.name)
    }

    pub fn config(&self) -> Json {
        Json::Object(self.attributes.clone())
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest = Self::parse(&content).with_context(|| format!("Invalid manifest: {}", path.display()))?;
        log::debug!("Loaded {} resources from {}", manifest.resources.len(), path.display());
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        manifest.check()?;
        Ok(manifest)
    }

    fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if resource.kind.trim().is_empty() || resource.name.trim().is_empty() {
                bail!("every resource needs a type and a name");
            }
            if resource.name.contains(char::is_whitespace) {
                bail!("resource name \"{}\" must not contain whitespace", resource.name);
            }
            if !seen.insert(resource.address()) {
                bail!("duplicate resource {}", resource.address());
            }
        }
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&ManifestResource> {
        self.resources.iter().find(|r| r.address() == address)
    }
}
