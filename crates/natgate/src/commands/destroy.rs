use crate::context::{self, Context};
use colored::Colorize;
use natgate_cloud::StateFile;

pub async fn handle(ctx: &Context, name: Option<&str>, yes: bool) -> anyhow::Result<()> {
    let lock = ctx.state.acquire_lock().await?;
    let result = run(ctx, name, yes).await;
    context::release_lock(lock, result).await
}

async fn run(ctx: &Context, name: Option<&str>, yes: bool) -> anyhow::Result<()> {
    let mut state = ctx.state.load().await?;
    let targets = targets(&state, name)?;

    if targets.is_empty() {
        println!("{}", "No tracked gateways".dimmed());
        return Ok(());
    }

    println!("{}", "Gateways to destroy:".bold());
    for (gateway, id) in &targets {
        println!("  {} {:<16} {}", "-".red().bold(), gateway.cyan(), id.dimmed());
    }

    if !yes {
        println!();
        println!("{}", "Re-run with --yes to delete these gateways".yellow());
        return Ok(());
    }

    println!();
    let failed = destroy(ctx, &mut state, &targets).await?;
    if failed > 0 {
        anyhow::bail!("{} gateway(s) could not be deleted", failed);
    }
    println!("{}", "✓ Destroy complete".green());
    Ok(())
}

fn targets(state: &StateFile, name: Option<&str>) -> anyhow::Result<Vec<(String, String)>> {
    match name {
        Some(name) => {
            let tracked = state
                .get_gateway(name)
                .ok_or_else(|| anyhow::anyhow!("Gateway '{}' is not tracked", name))?;
            Ok(vec![(name.to_string(), tracked.id.clone())])
        }
        None => Ok(state
            .gateways
            .iter()
            .map(|(name, tracked)| (name.clone(), tracked.id.clone()))
            .collect()),
    }
}

/// Delete each target, removing it from state as soon as it is gone
///
/// Returns the number of failed deletions.
pub async fn destroy(
    ctx: &Context,
    state: &mut StateFile,
    targets: &[(String, String)],
) -> anyhow::Result<usize> {
    let mut failed = 0;

    for (gateway, id) in targets {
        println!("Deleting {} ({})...", gateway.cyan(), id);
        match ctx.reconciler.delete(id).await {
            Ok(()) => {
                state.remove_gateway(gateway);
                ctx.state.save(state).await?;
                println!("  {} deleted", "✓".green());
            }
            Err(err) => {
                failed += 1;
                println!("  {} {}", "✗".red(), err.to_string().red());
                if err.is_cancelled() {
                    break;
                }
            }
        }
    }
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use natgate_cloud::{RemoteError, TrackedGateway};

    #[tokio::test]
    async fn test_destroy_already_gone_gateway() {
        let client = mock_client();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest_with(&[("main", "subnet-1")]), dir.path());

        let mut state = StateFile::new();
        state.set_gateway("main", TrackedGateway::new("nat-1", descriptor("subnet-1")));
        client.push_delete(Err(RemoteError::new("InvalidNatGatewayID.NotFound", "gone")));

        let targets = targets(&state, Some("main")).unwrap();
        let failed = destroy(&ctx, &mut state, &targets).await.unwrap();

        assert_eq!(failed, 0);
        assert!(state.gateways.is_empty());
        assert_eq!(client.describe_calls(), 0);
    }

    #[tokio::test]
    async fn test_destroy_failure_keeps_entry() {
        let client = mock_client();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest_with(&[]), dir.path());

        let mut state = StateFile::new();
        state.set_gateway("main", TrackedGateway::new("nat-1", descriptor("subnet-1")));
        client.push_delete(Err(RemoteError::new("UnauthorizedOperation", "denied")));

        let targets = targets(&state, None).unwrap();
        let failed = destroy(&ctx, &mut state, &targets).await.unwrap();

        assert_eq!(failed, 1);
        assert!(state.get_gateway("main").is_some());
    }

    #[test]
    fn test_targets_unknown_name() {
        assert!(targets(&StateFile::new(), Some("main")).is_err());
    }
}
