//! Persisted resource state
//!
//! A JSON document listing every managed resource with the attributes last
//! observed. Write-only attributes never get here: records are re-encoded
//! through each kind's model before they are stored.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fs;
use std::path::Path;

pub const DEFAULT_STATE_FILE: &str = "stacklet.state.json";
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub version: u32,
    /// Incremented on every save
    pub serial: u64,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub resources: Vec<ResourceState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub attributes: Json,
}

impl ResourceState {
    pub fn address(&self) -> String {
        address(&self.kind, &self.name)
    }
}

/// `type.name`
pub fn address(kind: &str, name: &str) -> String {
    format!("{kind}.{name}")
}

/// Split an address into kind and local name
pub fn parse_address(address: &str) -> Result<(&str, &str)> {
    match address.split_once('.') {
        Some((kind, name)) if !kind.is_empty() && !name.is_empty() => Ok((kind, name)),
        _ => bail!("invalid resource address \"{address}\", expected <type>.<name>"),
    }
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            last_updated: Utc::now(),
            resources: Vec::new(),
        }
    }
}

impl State {
    /// Load state, or start empty if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: State = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this build understands up to {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!("Loaded state serial {} from {}", state.serial, path.display());
        Ok(state)
    }

    /// Bump the serial and write to disk
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.serial += 1;
        self.last_updated = Utc::now();
        self.version = STATE_VERSION;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(&self).context("Failed to serialize state")?;
        // atomic replace
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content + "\n")
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state serial {} to {}", self.serial, path.display());
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.address() == address)
    }

    /// Insert or replace the record at `kind.name`
    pub fn set(&mut self, kind: &str, name: &str, attributes: Json) {
        let target = address(kind, name);
        match self.resources.iter_mut().find(|r| r.address() == target) {
            Some(existing) => existing.attributes = attributes,
            None => self.resources.push(ResourceState {
                kind: kind.to_string(),
                name: name.to_string(),
                attributes,
            }),
        }
    }

    /// Returns whether anything was removed
    pub fn remove(&mut self, address: &str) -> bool {
        let before = self.resources.len();
        self.resources.retain(|r| r.address() != address);
        self.resources.len() != before
    }

    /// Store an apply outcome: `None` drops the record
    pub fn record(&mut self, address: &str, attributes: Option<Json>) -> Result<()> {
        match attributes {
            Some(attributes) => {
                let (kind, name) = parse_address(address)?;
                self.set(kind, name, attributes);
            }
            None => {
                self.remove(address);
            }
        }
        Ok(())
    }

    pub fn addresses(&self) -> Vec<String> {
        self.resources.iter().map(ResourceState::address).collect()
    }
}
