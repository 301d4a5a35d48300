//! Role assignment resource
//!
//! Assignments are immutable: any change replaces them. An imported
//! assignment is found by ID across the full listing.

use super::key;
use crate::api::Api;
use crate::api::role_assignment::{Principal, RoleAssignment, Target};
use crate::enums::{PrincipalType, TargetType};
use crate::validators::{ONE_OF_PRINCIPAL_TYPES, ONE_OF_TARGET_TYPES, check_str};
use declarative::{
    Attribute, Context, Diagnostic, Error, ImportKeys, Resource, Result, Schema, Validator, Value,
};
use serde::{Deserialize, Serialize};

pub const TYPE_NAME: &str = "stacklet_role_assignment";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrincipalModel {
    #[serde(rename = "type")]
    pub kind: Value<String>,
    pub id: Value<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetModel {
    #[serde(rename = "type")]
    pub kind: Value<String>,
    /// Unset for the system target
    pub id: Value<String>,
}

impl PrincipalModel {
    fn to_remote(&self) -> Result<Principal> {
        let kind: PrincipalType = key(&self.kind, "principal.type")?
            .parse()
            .map_err(|e: String| Error::invalid("principal.type", e))?;
        Ok(Principal::new(kind, key(&self.id, "principal.id")?))
    }
}

impl From<&Principal> for PrincipalModel {
    fn from(principal: &Principal) -> Self {
        Self {
            kind: Value::Known(principal.kind().to_string()),
            id: Value::Known(principal.id().to_string()),
        }
    }
}

impl TargetModel {
    fn to_remote(&self) -> Result<Target> {
        let kind: TargetType = key(&self.kind, "target.type")?
            .parse()
            .map_err(|e: String| Error::invalid("target.type", e))?;
        Ok(Target::new(kind, self.id.as_str()))
    }
}

impl From<&Target> for TargetModel {
    fn from(target: &Target) -> Self {
        Self {
            kind: Value::Known(target.kind().to_string()),
            id: Value::from_option(target.id().map(str::to_string)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleAssignmentModel {
    pub id: Value<String>,
    pub role_name: Value<String>,
    pub principal: Value<PrincipalModel>,
    pub target: Value<TargetModel>,
}

impl From<RoleAssignment> for RoleAssignmentModel {
    fn from(assignment: RoleAssignment) -> Self {
        Self {
            id: Value::Known(assignment.id),
            role_name: Value::Known(assignment.role.name),
            principal: Value::Known((&assignment.principal).into()),
            target: Value::Known((&assignment.target).into()),
        }
    }
}

impl RoleAssignmentModel {
    fn principal(&self) -> Result<Principal> {
        self.principal
            .as_known()
            .ok_or_else(|| Error::InvalidState("\"principal\" is not set".into()))?
            .to_remote()
    }

    fn target(&self) -> Result<Target> {
        self.target
            .as_known()
            .ok_or_else(|| Error::InvalidState("\"target\" is not set".into()))?
            .to_remote()
    }
}

pub struct RoleAssignmentResource {
    api: Api,
}

impl RoleAssignmentResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

impl Resource for RoleAssignmentResource {
    type Model = RoleAssignmentModel;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(TYPE_NAME)
            .attr(Attribute::computed("id").use_state())
            .attr(Attribute::required("role_name").replace())
            .attr(Attribute::required("principal").replace())
            .attr(Attribute::required("target").replace())
    }

    fn import_keys(&self) -> ImportKeys {
        ImportKeys::new(&["id"])
    }

    fn validate(&self, config: &RoleAssignmentModel) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if let Some(principal) = config.principal.as_known() {
            diagnostics.extend(check_str(ONE_OF_PRINCIPAL_TYPES, "principal.type", &principal.kind));
            if principal.id.is_null() {
                diagnostics.push(
                    Diagnostic::error("Missing required argument", "the argument \"id\" is required")
                        .at("principal.id"),
                );
            }
        }
        if let Some(target) = config.target.as_known() {
            diagnostics.extend(check_str(ONE_OF_TARGET_TYPES, "target.type", &target.kind));
            let system = target
                .kind
                .as_str()
                .and_then(|k| k.parse::<TargetType>().ok())
                .is_some_and(|k| k == TargetType::System);
            if system && !target.id.is_null() {
                diagnostics.push(
                    Diagnostic::error("Invalid attribute combination", "the system target takes no \"id\"")
                        .at("target.id"),
                );
            } else if !system && target.id.is_null() {
                diagnostics.push(
                    Diagnostic::error("Missing required argument", "the argument \"id\" is required")
                        .at("target.id"),
                );
            } else if !system {
                diagnostics.extend(check_str(Validator::Uuid, "target.id", &target.id));
            }
        }
        diagnostics
    }

    /// Type names compare in canonical spelling
    fn modify_plan(
        &self,
        planned: &mut RoleAssignmentModel,
        _prior: Option<&RoleAssignmentModel>,
        _config: &RoleAssignmentModel,
    ) -> Result<()> {
        if let Value::Known(principal) = &mut planned.principal
            && let Some(kind) = principal.kind.as_str().and_then(|k| k.parse::<PrincipalType>().ok())
        {
            principal.kind = Value::Known(kind.to_string());
        }
        if let Value::Known(target) = &mut planned.target
            && let Some(kind) = target.kind.as_str().and_then(|k| k.parse::<TargetType>().ok())
        {
            target.kind = Value::Known(kind.to_string());
        }
        Ok(())
    }

    fn read(&self, ctx: &Context, state: &RoleAssignmentModel) -> Result<Option<RoleAssignmentModel>> {
        let id = key(&state.id, "id")?;
        let assignments = self.api.role_assignments();
        let assignment = match (state.target(), state.principal()) {
            (Ok(target), Ok(principal)) => assignments.read(&ctx.cancel, id, &target, &principal)?,
            // imported: only the ID is known
            _ => assignments
                .list(&ctx.cancel, None, None)?
                .into_iter()
                .find(|a| a.id == id)
                .ok_or_else(|| Error::not_found(format!("role assignment {id}")))?,
        };
        Ok(Some(assignment.into()))
    }

    fn create(
        &self,
        ctx: &Context,
        planned: &RoleAssignmentModel,
        _config: &RoleAssignmentModel,
    ) -> Result<RoleAssignmentModel> {
        let role = key(&planned.role_name, "role_name")?;
        let (principal, target) = (planned.principal()?, planned.target()?);
        let assignment = self.api.role_assignments().create(&ctx.cancel, role, &principal, &target)?;
        log::info!("granted {role} to {principal} on {target}");
        Ok(assignment.into())
    }

    fn update(
        &self,
        _ctx: &Context,
        _prior: &RoleAssignmentModel,
        _planned: &RoleAssignmentModel,
        _config: &RoleAssignmentModel,
    ) -> Result<RoleAssignmentModel> {
        Err(Error::Refusal(
            "Role assignments cannot be updated in place. Change the role, principal or target to replace it.".into(),
        ))
    }

    fn delete(&self, ctx: &Context, state: &RoleAssignmentModel) -> Result<()> {
        self.api.role_assignments().delete(&ctx.cancel, key(&state.id, "id")?)?;
        Ok(())
    }

    fn import(&self, id: &str) -> Result<RoleAssignmentModel> {
        Ok(RoleAssignmentModel {
            id: Value::Known(self.import_keys().values(id)?.remove(0)),
            ..RoleAssignmentModel::default()
        })
    }
}
