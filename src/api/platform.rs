//! Platform facts
//!
//! Read-only details of the deployment: the external ID and execution
//! regions used when granting cross-account access, and the surface the
//! Microsoft Teams integration needs.

use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};

const PLATFORM: &str = "query platform { platform { externalID executionRegions defaultRole } }";

const MSTEAMS_SURFACE: &str =
    "query msTeamsIntegrationSurface { platform { msTeamsIntegrationSurface { botEndpoint wifIssuerURL trustRoleARN } } }";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(rename = "externalID")]
    pub external_id: String,
    #[serde(rename = "executionRegions", default)]
    pub execution_regions: Vec<String>,
    #[serde(rename = "defaultRole")]
    pub default_role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsTeamsIntegrationSurface {
    #[serde(rename = "botEndpoint")]
    pub bot_endpoint: String,
    #[serde(rename = "wifIssuerURL")]
    pub wif_issuer_url: String,
    #[serde(rename = "trustRoleARN")]
    pub trust_role_arn: String,
}

#[derive(Debug, Deserialize)]
struct PlatformData {
    platform: Platform,
}

#[derive(Debug, Deserialize)]
struct SurfaceData {
    platform: SurfacePlatform,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurfacePlatform {
    ms_teams_integration_surface: MsTeamsIntegrationSurface,
}

pub struct PlatformApi<'a> {
    client: &'a Client,
}

impl<'a> PlatformApi<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn platform(&self, cancel: &Cancellation) -> Result<Platform> {
        let data: PlatformData = self.client.query(cancel, Request::query("platform", PLATFORM))?;
        Ok(data.platform)
    }

    pub fn msteams_integration_surface(&self, cancel: &Cancellation) -> Result<MsTeamsIntegrationSurface> {
        let data: SurfaceData = self
            .client
            .query(cancel, Request::query("msTeamsIntegrationSurface", MSTEAMS_SURFACE))?;
        Ok(data.platform.ms_teams_integration_surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql::MockTransport;
    use serde_json::json;

    #[test]
    fn test_platform() {
        let mock = MockTransport::new();
        mock.reply(
            "platform",
            json!({"platform": {"externalID": "ext-1", "executionRegions": ["us-east-1"], "defaultRole": null}}),
        );
        let client = Client::new(mock);
        let platform = PlatformApi::new(&client).platform(&Cancellation::new()).unwrap();
        assert_eq!(platform.external_id, "ext-1");
        assert_eq!(platform.execution_regions, vec!["us-east-1"]);
    }

    #[test]
    fn test_surface() {
        let mock = MockTransport::new();
        mock.reply(
            "msTeamsIntegrationSurface",
            json!({"platform": {"msTeamsIntegrationSurface": {
                "botEndpoint": "https://bot", "wifIssuerURL": "https://wif", "trustRoleARN": "arn:aws:iam::1:role/t"
            }}}),
        );
        let client = Client::new(mock);
        let surface = PlatformApi::new(&client)
            .msteams_integration_surface(&Cancellation::new())
            .unwrap();
        assert_eq!(surface.wif_issuer_url, "https://wif");
    }
}
