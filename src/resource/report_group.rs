//! Report group resource - scheduled notification delivery, keyed by name
//!
//! Delivery settings arrive as one polymorphic list and are split into one
//! block list per channel. Every recipient names exactly one target.

use super::{key, list, opt};
use crate::api::Api;
use crate::api::report_group::{
    self as remote, EmailSettings, JiraSettings, MessageSettings, ReportGroup, ReportGroupInput,
    ServiceNowSettings,
};
use crate::enums::{ReportSource, normalize_report_source};
use crate::validators::{ONE_OF_REPORT_SOURCES, Recipient, recipients};
use declarative::value::{list_or_null, nullable_non_empty, nullable_string};
use declarative::{
    Attribute, Context, Diagnostic, Error, ImportKeys, Resource, Result, Schema, Validator, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub const TYPE_NAME: &str = "stacklet_report_group";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailDelivery {
    pub cc: Vec<String>,
    pub from: Value<String>,
    pub format: Value<String>,
    pub priority: Value<String>,
    pub subject: Value<String>,
    pub template: Value<String>,
    pub recipients: Vec<Recipient>,
}

/// Slack, Teams and Symphony blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageDelivery {
    pub template: Value<String>,
    pub recipients: Vec<Recipient>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraDelivery {
    pub project: Value<String>,
    pub issue_type: Value<String>,
    pub summary: Value<String>,
    pub description: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNowDelivery {
    pub impact: Value<String>,
    pub urgency: Value<String>,
    pub short_description: Value<String>,
    pub description: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportGroupModel {
    pub id: Value<String>,
    pub name: Value<String>,
    pub enabled: Value<bool>,
    pub bindings: Value<Vec<String>>,
    pub source: Value<String>,
    pub schedule: Value<String>,
    pub group_by: Value<Vec<String>>,
    pub use_message_settings: Value<bool>,
    pub email_delivery_settings: Value<Vec<EmailDelivery>>,
    pub slack_delivery_settings: Value<Vec<MessageDelivery>>,
    pub msteams_delivery_settings: Value<Vec<MessageDelivery>>,
    pub symphony_delivery_settings: Value<Vec<MessageDelivery>>,
    pub jira_delivery_settings: Value<Vec<JiraDelivery>>,
    pub servicenow_delivery_settings: Value<Vec<ServiceNowDelivery>>,
}

// Remote flags come back as `false` when unset; only `true` selects a target
fn flag(value: Option<bool>) -> Value<bool> {
    match value {
        Some(true) => Value::Known(true),
        _ => Value::Null,
    }
}

fn recipient_from_remote(r: &remote::Recipient) -> Recipient {
    Recipient {
        account_owner: flag(r.account_owner),
        event_owner: flag(r.event_owner),
        resource_owner: flag(r.resource_owner),
        tag: nullable_non_empty(r.tag.clone()),
        value: nullable_non_empty(r.value.clone()),
    }
}

fn recipient_input(r: &Recipient) -> remote::Recipient {
    remote::Recipient {
        account_owner: opt(&r.account_owner),
        event_owner: opt(&r.event_owner),
        resource_owner: opt(&r.resource_owner),
        tag: opt(&r.tag),
        value: opt(&r.value),
    }
}

fn text(value: &Value<String>) -> String {
    value.as_str().unwrap_or_default().to_string()
}

impl EmailDelivery {
    fn from_remote(s: &EmailSettings) -> Self {
        Self {
            cc: s.cc.clone(),
            from: nullable_string(s.from_email.clone()),
            format: nullable_string(s.format.clone()),
            priority: nullable_string(s.priority.clone()),
            subject: Value::Known(s.subject.clone()),
            template: Value::Known(s.template.clone()),
            recipients: s.recipients.iter().map(recipient_from_remote).collect(),
        }
    }

    fn input(&self) -> EmailSettings {
        EmailSettings {
            cc: self.cc.clone(),
            from_email: opt(&self.from),
            format: opt(&self.format),
            priority: opt(&self.priority),
            subject: text(&self.subject),
            template: text(&self.template),
            recipients: self.recipients.iter().map(recipient_input).collect(),
        }
    }
}

impl MessageDelivery {
    fn from_remote(s: &MessageSettings) -> Self {
        Self {
            template: Value::Known(s.template.clone()),
            recipients: s.recipients.iter().map(recipient_from_remote).collect(),
        }
    }

    fn input(&self) -> MessageSettings {
        MessageSettings {
            template: text(&self.template),
            recipients: self.recipients.iter().map(recipient_input).collect(),
        }
    }
}

impl JiraDelivery {
    fn from_remote(s: &JiraSettings) -> Self {
        Self {
            project: Value::Known(s.project.clone()),
            issue_type: Value::Known(s.issue_type.clone()),
            summary: Value::Known(s.summary.clone()),
            description: Value::Known(s.description.clone()),
        }
    }

    fn input(&self) -> JiraSettings {
        JiraSettings {
            project: text(&self.project),
            issue_type: text(&self.issue_type),
            summary: text(&self.summary),
            description: text(&self.description),
        }
    }
}

impl ServiceNowDelivery {
    fn from_remote(s: &ServiceNowSettings) -> Self {
        Self {
            impact: Value::Known(s.impact.clone()),
            urgency: Value::Known(s.urgency.clone()),
            short_description: Value::Known(s.short_description.clone()),
            description: Value::Known(s.description.clone()),
        }
    }

    fn input(&self) -> ServiceNowSettings {
        ServiceNowSettings {
            impact: text(&self.impact),
            urgency: text(&self.urgency),
            short_description: text(&self.short_description),
            description: text(&self.description),
        }
    }
}

fn blocks<S, M>(settings: Vec<&S>, prior: Option<&Value<Vec<M>>>, f: impl Fn(&S) -> M) -> Value<Vec<M>> {
    list_or_null(settings.into_iter().map(f).collect(), prior)
}

fn inputs<M, I>(blocks: &Value<Vec<M>>, f: impl Fn(&M) -> I) -> Vec<I> {
    blocks.as_known().map(|b| b.iter().map(f).collect()).unwrap_or_default()
}

impl ReportGroupModel {
    fn from_remote(group: ReportGroup, prior: Option<&Self>) -> Self {
        Self {
            id: Value::Known(group.id.clone()),
            name: Value::Known(group.name.clone()),
            enabled: Value::Known(group.enabled),
            bindings: Value::Known(group.bindings.clone()),
            source: Value::Known(group.source.to_string()),
            schedule: Value::Known(group.schedule.clone()),
            group_by: list_or_null(group.group_by.clone(), prior.map(|p| &p.group_by)),
            use_message_settings: Value::Known(group.use_message_settings),
            email_delivery_settings: blocks(
                group.email_settings(),
                prior.map(|p| &p.email_delivery_settings),
                EmailDelivery::from_remote,
            ),
            slack_delivery_settings: blocks(
                group.slack_settings(),
                prior.map(|p| &p.slack_delivery_settings),
                MessageDelivery::from_remote,
            ),
            msteams_delivery_settings: blocks(
                group.teams_settings(),
                prior.map(|p| &p.msteams_delivery_settings),
                MessageDelivery::from_remote,
            ),
            symphony_delivery_settings: blocks(
                group.symphony_settings(),
                prior.map(|p| &p.symphony_delivery_settings),
                MessageDelivery::from_remote,
            ),
            jira_delivery_settings: blocks(
                group.jira_settings(),
                prior.map(|p| &p.jira_delivery_settings),
                JiraDelivery::from_remote,
            ),
            servicenow_delivery_settings: blocks(
                group.servicenow_settings(),
                prior.map(|p| &p.servicenow_delivery_settings),
                ServiceNowDelivery::from_remote,
            ),
        }
    }

    fn input(&self) -> Result<ReportGroupInput> {
        let source = opt(&self.source)
            .map(|s| s.parse::<ReportSource>())
            .transpose()
            .map_err(|e| Error::invalid("source", e))?;
        Ok(ReportGroupInput {
            name: key(&self.name, "name")?.to_string(),
            enabled: self.enabled.as_known().copied().unwrap_or(true),
            bindings: list(&self.bindings),
            source,
            schedule: key(&self.schedule, "schedule")?.to_string(),
            group_by: list(&self.group_by),
            use_message_settings: opt(&self.use_message_settings),
            email_settings: inputs(&self.email_delivery_settings, EmailDelivery::input),
            slack_settings: inputs(&self.slack_delivery_settings, MessageDelivery::input),
            teams_settings: inputs(&self.msteams_delivery_settings, MessageDelivery::input),
            symphony_settings: inputs(&self.symphony_delivery_settings, MessageDelivery::input),
            jira_settings: inputs(&self.jira_delivery_settings, JiraDelivery::input),
            servicenow_settings: inputs(&self.servicenow_delivery_settings, ServiceNowDelivery::input),
        })
    }
}

fn enabled_by_default() -> Json {
    Json::Bool(true)
}

/// Missing-argument diagnostics for nested block fields
fn require(diagnostics: &mut Vec<Diagnostic>, path: &str, fields: &[(&str, &Value<String>)]) {
    for (name, value) in fields {
        if value.is_null() {
            diagnostics.push(
                Diagnostic::error("Missing required argument", format!("the argument \"{name}\" is required"))
                    .at(format!("{path}.{name}")),
            );
        }
    }
}

fn each<M>(blocks: &Value<Vec<M>>) -> impl Iterator<Item = (usize, &M)> {
    blocks.as_known().into_iter().flatten().enumerate()
}

pub struct ReportGroupResource {
    api: Api,
}

impl ReportGroupResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn upsert(&self, ctx: &Context, planned: &ReportGroupModel) -> Result<ReportGroupModel> {
        let group = self.api.report_groups().upsert(&ctx.cancel, &planned.input()?)?;
        Ok(ReportGroupModel::from_remote(group, Some(planned)))
    }
}

impl Resource for ReportGroupResource {
    type Model = ReportGroupModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("name").replace())
            .attr(Attribute::optional("enabled").default(enabled_by_default))
            .attr(Attribute::required("bindings").validate(Validator::Uuid))
            .attr(
                Attribute::required("source")
                    .normalize(normalize_report_source)
                    .validate(ONE_OF_REPORT_SOURCES),
            )
            .attr(Attribute::required("schedule").trim())
            .attr(Attribute::optional("group_by"))
            .attr(Attribute::optional_computed("use_message_settings"))
            .attr(Attribute::optional("email_delivery_settings"))
            .attr(Attribute::optional("slack_delivery_settings"))
            .attr(Attribute::optional("msteams_delivery_settings"))
            .attr(Attribute::optional("symphony_delivery_settings"))
            .attr(Attribute::optional("jira_delivery_settings"))
            .attr(Attribute::optional("servicenow_delivery_settings"))
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["name"])
    }

    fn validate(&self, config: &ReportGroupModel) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (i, email) in each(&config.email_delivery_settings) {
            let path = format!("email_delivery_settings[{i}]");
            require(&mut diagnostics, &path, &[("subject", &email.subject), ("template", &email.template)]);
            diagnostics.extend(recipients(&email.recipients, &path));
        }
        for (field, settings) in [
            ("slack_delivery_settings", &config.slack_delivery_settings),
            ("msteams_delivery_settings", &config.msteams_delivery_settings),
            ("symphony_delivery_settings", &config.symphony_delivery_settings),
        ] {
            for (i, message) in each(settings) {
                let path = format!("{field}[{i}]");
                require(&mut diagnostics, &path, &[("template", &message.template)]);
                diagnostics.extend(recipients(&message.recipients, &path));
            }
        }
        for (i, jira) in each(&config.jira_delivery_settings) {
            require(
                &mut diagnostics,
                &format!("jira_delivery_settings[{i}]"),
                &[
                    ("project", &jira.project),
                    ("issue_type", &jira.issue_type),
                    ("summary", &jira.summary),
                    ("description", &jira.description),
                ],
            );
        }
        for (i, snow) in each(&config.servicenow_delivery_settings) {
            require(
                &mut diagnostics,
                &format!("servicenow_delivery_settings[{i}]"),
                &[
                    ("impact", &snow.impact),
                    ("urgency", &snow.urgency),
                    ("short_description", &snow.short_description),
                    ("description", &snow.description),
                ],
            );
        }

        diagnostics
    }

    fn read(&self, ctx: &Context, state: &ReportGroupModel) -> Result<Option<ReportGroupModel>> {
        let group = self.api.report_groups().read(&ctx.cancel, key(&state.name, "name")?)?;
        Ok(Some(ReportGroupModel::from_remote(group, Some(state))))
    }

    fn create(&self, ctx: &Context, planned: &ReportGroupModel, _config: &ReportGroupModel) -> Result<ReportGroupModel> {
        self.upsert(ctx, planned)
    }

    fn update(
        &self,
        ctx: &Context,
        _prior: &ReportGroupModel,
        planned: &ReportGroupModel,
        _config: &ReportGroupModel,
    ) -> Result<ReportGroupModel> {
        self.upsert(ctx, planned)
    }

    fn delete(&self, ctx: &Context, state: &ReportGroupModel) -> Result<()> {
        self.api.report_groups().delete(&ctx.cancel, key(&state.name, "name")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<ReportGroupModel> {
        Ok(ReportGroupModel {
            name: Value::Known(self.import_keys().values(id)?.remove(0)),
            ..ReportGroupModel::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{self, GROUP_UUID};
    use crate::validators::RECIPIENT_SUMMARY;
    use declarative::{Action, DynResource};
    use serde_json::json;

    fn config() -> Json {
        json!({
            "name": "weekly", "bindings": [GROUP_UUID], "source": "policy", "schedule": "0 12 * * 1",
            "slack_delivery_settings": [
                {"template": "slack.j2", "recipients": [{"value": "#ops"}, {"account_owner": true}]}
            ],
            "jira_delivery_settings": [
                {"project": "SEC", "issue_type": "Task", "summary": "{{ policy }}", "description": "found"}
            ]
        })
    }

    fn remote() -> Json {
        json!({
            "id": "rg-1", "name": "weekly", "enabled": true, "bindings": [GROUP_UUID], "source": "POLICY",
            "schedule": "0 12 * * 1", "groupBy": [], "useMessageSettings": false,
            "deliverySettings": [
                {"__typename": "SlackSettings", "template": "slack.j2", "recipients": [
                    {"accountOwner": false, "eventOwner": false, "resourceOwner": false, "tag": "", "value": "#ops"},
                    {"accountOwner": true, "eventOwner": false, "resourceOwner": false, "tag": null, "value": null}
                ]},
                {"__typename": "JiraSettings", "project": "SEC", "issueType": "Task", "summary": "{{ policy }}",
                 "description": "found"}
            ]
        })
    }

    #[test]
    fn test_upsert_splits_delivery_settings() {
        let (api, mock) = testing::api();
        mock.reply("upsertReportGroup", json!({"upsertReportGroup": {"group": remote()}}));
        let resource = ReportGroupResource::new(api);
        let change = resource.plan(Some(&config()), None).unwrap();
        let planned = change.planned.clone().unwrap();
        assert_eq!(planned["source"], json!("POLICY"));
        assert_eq!(planned["enabled"], json!(true));
        assert_eq!(planned["use_message_settings"], json!({"$unknown": true}));

        let state = resource.apply(&Context::new(), &change, Some(&config()), None).unwrap().unwrap();
        assert_eq!(state["slack_delivery_settings"][0]["recipients"][0]["value"], json!("#ops"));
        assert_eq!(state["slack_delivery_settings"][0]["recipients"][0]["account_owner"], Json::Null);
        assert_eq!(state["slack_delivery_settings"][0]["recipients"][1]["account_owner"], json!(true));
        assert_eq!(state["email_delivery_settings"], Json::Null);
        assert_eq!(state["group_by"], Json::Null);

        let input = mock.requests()[0].variable("input").cloned().unwrap();
        assert_eq!(input["source"], json!("POLICY"));
        assert_eq!(input["jiraSettings"][0]["issueType"], json!("Task"));
        assert_eq!(input["msteamsSettings"], json!([]));

        assert_eq!(resource.plan(Some(&config()), Some(&state)).unwrap().action, Action::NoOp);
    }

    #[test]
    fn test_deleted_group_leaves_state() {
        let (api, mock) = testing::api();
        mock.reply("reportGroup", json!({"reportGroup": null}));
        let resource = ReportGroupResource::new(api);
        let refreshed = resource.refresh(&Context::new(), &json!({"name": "weekly"})).unwrap();
        assert!(refreshed.is_none());
    }

    #[test]
    fn test_recipient_needs_exactly_one_target() {
        let (api, mock) = testing::api();
        let resource = ReportGroupResource::new(api);
        let mut bad = config();
        bad["slack_delivery_settings"][0]["recipients"] = json!([{"account_owner": true, "tag": "team"}]);
        let err = resource.plan(Some(&bad), None).unwrap_err();
        let Error::Validation(diagnostics) = err else {
            panic!("expected validation error");
        };
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, RECIPIENT_SUMMARY);
        assert_eq!(
            diagnostics[0].path.as_deref(),
            Some("slack_delivery_settings[0].recipients[0]")
        );
        assert!(mock.requests().is_empty());

        let mut good = config();
        good["slack_delivery_settings"][0]["recipients"] = json!([{"account_owner": true}]);
        assert!(resource.plan(Some(&good), None).is_ok());
    }

    #[test]
    fn test_missing_nested_fields() {
        let (api, _) = testing::api();
        let resource = ReportGroupResource::new(api);
        let mut bad = config();
        bad["jira_delivery_settings"][0] = json!({"project": "SEC"});
        let Err(Error::Validation(diagnostics)) = resource.plan(Some(&bad), None) else {
            panic!("expected validation error");
        };
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[0].path.as_deref(), Some("jira_delivery_settings[0].issue_type"));
    }

    #[test]
    fn test_invalid_source() {
        let (api, _) = testing::api();
        let resource = ReportGroupResource::new(api);
        let mut bad = config();
        bad["source"] = json!("alerts");
        assert!(matches!(resource.plan(Some(&bad), None), Err(Error::Validation(_))));
    }
}
