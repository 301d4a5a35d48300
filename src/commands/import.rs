//! `import` - adopt an existing remote resource

use anyhow::{Result, bail};
use declarative::DynResource;

use super::connect;
use crate::Context;
use crate::state::{self, State};
use crate::ui;

pub fn run(ctx: &Context, kind: &str, name: &str, id: &str) -> Result<()> {
    let provider = connect(ctx)?;
    let resource = provider.resource(kind)?;
    let mut state = State::load(&ctx.state)?;

    let address = state::address(kind, name);
    if state.get(&address).is_some() {
        bail!("{address} is already managed; remove it from state before importing again");
    }

    let attributes = import(resource.as_ref(), &ctx.operation(), id)?;
    state.set(kind, name, attributes);
    state.save(&ctx.state)?;
    ui::success(&format!("Imported {id} as {address}"));
    Ok(())
}

fn import(resource: &dyn DynResource, ctx: &declarative::Context, id: &str) -> Result<serde_json::Value> {
    match resource.import_state(ctx, id) {
        Ok(attributes) => Ok(attributes),
        Err(e) if e.is_not_found() => bail!("{} \"{id}\" does not exist: {e}", resource.kind()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use crate::resource::testing;
    use serde_json::json;

    #[test]
    fn test_import_reads_remote() {
        let (api, mock) = testing::api();
        mock.reply(
            "ssoGroup",
            json!({"ssoGroup": {"id": "g-1", "name": "admins", "roles": ["viewer"], "accountGroupUUIDs": []}}),
        );
        let provider = Provider::new(api);
        let resource = provider.resource("stacklet_sso_group").unwrap();
        let attributes = import(resource.as_ref(), &declarative::Context::new(), "admins").unwrap();
        assert_eq!(attributes["id"], json!("g-1"));
    }

    #[test]
    fn test_bad_id_names_format() {
        let (api, _) = testing::api();
        let provider = Provider::new(api);
        let resource = provider.resource("stacklet_account").unwrap();
        let err = import(resource.as_ref(), &declarative::Context::new(), "123456789012").unwrap_err();
        assert!(err.to_string().contains("Import ID must be in the format"), "{err}");
    }
}
