use crate::context::{self, Context};
use crate::utils;
use colored::Colorize;
use natgate_cloud::{StateFile, TrackedGateway};

pub async fn handle(ctx: &Context, name: &str, id: &str) -> anyhow::Result<()> {
    let lock = ctx.state.acquire_lock().await?;
    let result = run(ctx, name, id).await;
    context::release_lock(lock, result).await
}

async fn run(ctx: &Context, name: &str, id: &str) -> anyhow::Result<()> {
    let mut state = ctx.state.load().await?;
    import(ctx, &mut state, name, id).await?;
    ctx.state.save(&state).await?;

    println!("{} Imported {} as {}", "✓".green(), id, name.cyan());
    if let Some(observed) = state.get_gateway(name).and_then(|t| t.observed.as_ref()) {
        println!();
        utils::print_gateway(name, observed);
    }
    Ok(())
}

/// Adopt `id` under `name`
///
/// The tracked descriptor is taken from the live gateway, so the next plan
/// shows any difference from the manifest.
pub async fn import(
    ctx: &Context,
    state: &mut StateFile,
    name: &str,
    id: &str,
) -> anyhow::Result<()> {
    if let Some(existing) = state.get_gateway(name) {
        anyhow::bail!("Gateway '{}' already tracks {}", name, existing.id);
    }
    if let Some(other) = state.name_for_id(id) {
        anyhow::bail!("{} is already tracked as '{}'", id, other);
    }
    if ctx.manifest.descriptor(name).is_none() {
        tracing::warn!("Gateway '{}' is not declared; the next apply will delete it", name);
    }

    let observed = ctx.reconciler.import(id).await?;
    let mut tracked = TrackedGateway::new(id, observed.descriptor());
    tracked.observe(observed);
    state.set_gateway(name, tracked);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use natgate_cloud::{ActionType, GatewayState, ResourceStatus};

    #[tokio::test]
    async fn test_import_then_plan_is_noop() {
        let client = mock_client();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest_with(&[("main", "subnet-1")]), dir.path());

        client.push_states([gateway("nat-1", GatewayState::Available, "subnet-1")]);

        let mut state = StateFile::new();
        import(&ctx, &mut state, "main", "nat-1").await.unwrap();

        let tracked = state.get_gateway("main").unwrap();
        assert_eq!(tracked.status, ResourceStatus::Available);
        assert_eq!(tracked.descriptor.subnet_id, "subnet-1");

        let planned = crate::commands::plan::compute(&ctx, &state, None).await.unwrap();
        assert_eq!(planned.plan.actions[0].action_type, ActionType::NoOp);
    }

    #[tokio::test]
    async fn test_import_missing_gateway() {
        let client = mock_client();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest_with(&[]), dir.path());

        client.push_describe(Ok(vec![]));

        let mut state = StateFile::new();
        assert!(import(&ctx, &mut state, "main", "nat-404").await.is_err());
        assert!(state.gateways.is_empty());
    }

    #[tokio::test]
    async fn test_import_twice_is_rejected() {
        let client = mock_client();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest_with(&[]), dir.path());

        let mut state = StateFile::new();
        state.set_gateway("main", TrackedGateway::new("nat-1", descriptor("subnet-1")));

        assert!(import(&ctx, &mut state, "other", "nat-1").await.is_err());
        assert!(import(&ctx, &mut state, "main", "nat-2").await.is_err());
        assert_eq!(client.describe_calls(), 0);
    }
}
