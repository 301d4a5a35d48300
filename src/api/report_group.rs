//! Report groups
//!
//! Keyed by name. Create and update both go through the upsert mutation.

use super::{entity, problems};
use crate::enums::ReportSource;
use declarative::Cancellation;
use graphql::{Client, Request, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

macro_rules! recipient_fields {
    () => {
        "recipients { accountOwner eventOwner resourceOwner tag value }"
    };
}

macro_rules! report_group_fields {
    () => {
        concat!(
            "id name enabled bindings source schedule groupBy useMessageSettings deliverySettings { __typename ",
            "... on EmailSettings { cc fromEmail format priority subject template ", recipient_fields!(), " } ",
            "... on SlackSettings { template ", recipient_fields!(), " } ",
            "... on MSTeamsSettings { template ", recipient_fields!(), " } ",
            "... on SymphonySettings { template ", recipient_fields!(), " } ",
            "... on JiraSettings { project issueType summary description } ",
            "... on ServiceNowSettings { impact urgency shortDescription description } }"
        )
    };
}

const READ: &str = concat!(
    "query reportGroup($name: String!) { reportGroup(name: $name) { ",
    report_group_fields!(),
    " } }"
);

const UPSERT: &str = concat!(
    "mutation upsertReportGroup($input: UpsertReportGroupInput!) { upsertReportGroup(input: $input) { group { ",
    report_group_fields!(),
    " } ",
    problems!(),
    " } }"
);

const REMOVE: &str = concat!(
    "mutation removeReportGroup($name: String!) { removeReportGroup(name: $name) { group { id } ",
    problems!(),
    " } }"
);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bindings: Vec<String>,
    pub source: ReportSource,
    pub schedule: String,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub use_message_settings: bool,
    #[serde(default)]
    pub delivery_settings: Vec<DeliverySettings>,
}

impl ReportGroup {
    pub fn email_settings(&self) -> Vec<&EmailSettings> {
        self.delivery_settings
            .iter()
            .filter_map(|d| match d {
                DeliverySettings::Email(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn slack_settings(&self) -> Vec<&MessageSettings> {
        self.message_settings(|d| matches!(d, DeliverySettings::Slack(_)))
    }

    pub fn teams_settings(&self) -> Vec<&MessageSettings> {
        self.message_settings(|d| matches!(d, DeliverySettings::Teams(_)))
    }

    pub fn symphony_settings(&self) -> Vec<&MessageSettings> {
        self.message_settings(|d| matches!(d, DeliverySettings::Symphony(_)))
    }

    fn message_settings(&self, pick: impl Fn(&DeliverySettings) -> bool) -> Vec<&MessageSettings> {
        self.delivery_settings
            .iter()
            .filter(|d| pick(d))
            .filter_map(|d| match d {
                DeliverySettings::Slack(s) | DeliverySettings::Teams(s) | DeliverySettings::Symphony(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn jira_settings(&self) -> Vec<&JiraSettings> {
        self.delivery_settings
            .iter()
            .filter_map(|d| match d {
                DeliverySettings::Jira(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn servicenow_settings(&self) -> Vec<&ServiceNowSettings> {
        self.delivery_settings
            .iter()
            .filter_map(|d| match d {
                DeliverySettings::ServiceNow(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

/// One delivery channel of a report group
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "__typename")]
pub enum DeliverySettings {
    #[serde(rename = "EmailSettings")]
    Email(EmailSettings),
    #[serde(rename = "SlackSettings")]
    Slack(MessageSettings),
    #[serde(rename = "MSTeamsSettings")]
    Teams(MessageSettings),
    #[serde(rename = "SymphonySettings")]
    Symphony(MessageSettings),
    #[serde(rename = "JiraSettings")]
    Jira(JiraSettings),
    #[serde(rename = "ServiceNowSettings")]
    ServiceNow(ServiceNowSettings),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub account_owner: Option<bool>,
    pub event_owner: Option<bool>,
    pub resource_owner: Option<bool>,
    pub tag: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    #[serde(default)]
    pub cc: Vec<String>,
    pub from_email: Option<String>,
    pub format: Option<String>,
    pub priority: Option<String>,
    pub subject: String,
    pub template: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

/// Slack, Teams and Symphony settings share one shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSettings {
    pub template: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraSettings {
    pub project: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNowSettings {
    pub impact: String,
    pub urgency: String,
    pub short_description: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroupInput {
    pub name: String,
    pub enabled: bool,
    pub bindings: Vec<String>,
    pub source: Option<ReportSource>,
    pub schedule: String,
    pub group_by: Vec<String>,
    pub use_message_settings: Option<bool>,
    pub email_settings: Vec<EmailSettings>,
    pub slack_settings: Vec<MessageSettings>,
    #[serde(rename = "msteamsSettings")]
    pub teams_settings: Vec<MessageSettings>,
    pub symphony_settings: Vec<MessageSettings>,
    pub jira_settings: Vec<JiraSettings>,
    #[serde(rename = "servicenowSettings")]
    pub servicenow_settings: Vec<ServiceNowSettings>,
}

pub struct ReportGroups<'a> {
    client: &'a Client,
}

impl<'a> ReportGroups<'a> {
    pub(super) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn read(&self, cancel: &Cancellation, name: &str) -> Result<ReportGroup> {
        let request = Request::query("reportGroup", READ).var("name", name)?;
        let data: Json = self.client.query(cancel, request)?;
        entity(data, "reportGroup", format_args!("report group {name}"))
    }

    pub fn upsert(&self, cancel: &Cancellation, input: &ReportGroupInput) -> Result<ReportGroup> {
        let request = Request::mutation("upsertReportGroup", UPSERT).var("input", input)?;
        let payload: Json = self.client.mutate(cancel, request, "upsertReportGroup")?;
        entity(payload, "group", format_args!("report group {}", input.name))
    }

    pub fn delete(&self, cancel: &Cancellation, name: &str) -> Result<()> {
        let request = Request::mutation("removeReportGroup", REMOVE).var("name", name)?;
        let _: Json = self.client.mutate(cancel, request, "removeReportGroup")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql::MockTransport;
    use serde_json::json;

    #[test]
    fn test_delivery_settings_accessors() {
        let group: ReportGroup = serde_json::from_value(json!({
            "id": "r1",
            "name": "weekly",
            "enabled": true,
            "source": "policy",
            "schedule": "0 12 * * 1",
            "deliverySettings": [
                {"__typename": "SlackSettings", "template": "slack.j2", "recipients": [{"value": "#ops"}]},
                {"__typename": "EmailSettings", "subject": "s", "template": "email.j2"},
                {"__typename": "MSTeamsSettings", "template": "teams.j2"}
            ]
        }))
        .unwrap();
        assert_eq!(group.source, ReportSource::Policy);
        assert_eq!(group.email_settings().len(), 1);
        assert_eq!(group.slack_settings()[0].recipients[0].value.as_deref(), Some("#ops"));
        assert_eq!(group.teams_settings()[0].template, "teams.j2");
        assert!(group.jira_settings().is_empty());
        assert!(group.symphony_settings().is_empty());
    }

    #[test]
    fn test_missing_group_is_not_found() {
        let mock = MockTransport::new();
        mock.reply("reportGroup", json!({"reportGroup": null}));
        let client = Client::new(mock);
        let err = ReportGroups::new(&client)
            .read(&Cancellation::new(), "weekly")
            .unwrap_err();
        assert_eq!(err, graphql::Error::NotFound("report group weekly".into()));
    }
}
