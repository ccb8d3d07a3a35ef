use crate::context::Context;
use crate::utils;
use colored::Colorize;
use natgate_cloud::{Plan, ReconciledState, StateFile, plan_gateway};
use std::collections::BTreeMap;

/// A plan together with the live states it was computed from
pub struct PlannedChanges {
    pub plan: Plan,
    pub live: BTreeMap<String, ReconciledState>,
}

/// Read every tracked gateway once and decide an action per gateway
pub async fn compute(
    ctx: &Context,
    state: &StateFile,
    name: Option<&str>,
) -> anyhow::Result<PlannedChanges> {
    let mut actions = Vec::new();
    let mut live = BTreeMap::new();

    for gateway in ctx.target_names(name, state)? {
        let desired = ctx.manifest.descriptor(&gateway);
        let tracked = state.get_gateway(&gateway);

        let observed = match tracked {
            Some(t) => ctx.reconciler.read(&t.id).await?,
            None => None,
        };

        actions.push(plan_gateway(
            &gateway,
            desired.as_ref(),
            tracked,
            observed.as_ref(),
            ctx.reconciler.tag_config(),
        ));

        if let Some(observed) = observed {
            live.insert(gateway, observed);
        }
    }

    Ok(PlannedChanges {
        plan: Plan::new(actions),
        live,
    })
}

pub async fn handle(ctx: &Context, name: Option<&str>) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("Refreshing gateway state ({})...", ctx.reconciler.client_name()).blue()
    );

    let state = ctx.state.load().await?;
    let planned = compute(ctx, &state, name).await?;

    println!();
    utils::print_plan(&planned.plan);

    if !planned.plan.has_changes {
        println!("{}", "✓ Gateways match the manifest".green());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use natgate_cloud::{ActionType, GatewayState, TrackedGateway};

    #[tokio::test]
    async fn test_plan_create_and_delete() {
        let client = mock_client();
        let manifest = manifest_with(&[("main", "subnet-1")]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest, dir.path());

        let mut state = StateFile::new();
        state.set_gateway("old", TrackedGateway::new("nat-old", descriptor("subnet-9")));
        client.push_states([gateway("nat-old", GatewayState::Available, "subnet-9")]);

        let planned = compute(&ctx, &state, None).await.unwrap();
        let summary = planned.plan.summary();

        assert_eq!(summary.create, 1);
        assert_eq!(summary.delete, 1);
        assert_eq!(planned.plan.actions_by_type(ActionType::Delete)[0].gateway, "old");
        assert!(planned.live.contains_key("old"));
    }

    #[tokio::test]
    async fn test_plan_gone_gateway_is_recreated() {
        let client = mock_client();
        let manifest = manifest_with(&[("main", "subnet-1")]);
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest, dir.path());

        let mut state = StateFile::new();
        state.set_gateway("main", TrackedGateway::new("nat-1", descriptor("subnet-1")));
        client.push_describe(Ok(vec![]));

        let planned = compute(&ctx, &state, Some("main")).await.unwrap();

        let action = &planned.plan.actions[0];
        assert_eq!(action.action_type, ActionType::Create);
        assert_eq!(action.remote_id.as_deref(), Some("nat-1"));
        assert!(planned.live.is_empty());
    }

    #[tokio::test]
    async fn test_plan_unknown_name() {
        let client = mock_client();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest_with(&[("main", "subnet-1")]), dir.path());

        let result = compute(&ctx, &StateFile::new(), Some("other")).await;
        assert!(result.is_err());
        assert_eq!(client.describe_calls(), 0);
    }
}
