use crate::context::{self, Context};
use crate::utils;
use colored::Colorize;
use natgate_cloud::StateFile;

pub async fn handle(ctx: &Context, name: Option<&str>) -> anyhow::Result<()> {
    let lock = ctx.state.acquire_lock().await?;
    let result = run(ctx, name).await;
    context::release_lock(lock, result).await
}

async fn run(ctx: &Context, name: Option<&str>) -> anyhow::Result<()> {
    let mut state = ctx.state.load().await?;
    let dropped = refresh(ctx, &mut state, name).await?;
    ctx.state.save(&state).await?;

    let mut shown = 0;
    for (gateway, tracked) in &state.gateways {
        if name.is_some_and(|n| n != gateway) {
            continue;
        }
        if let Some(observed) = &tracked.observed {
            utils::print_gateway(gateway, observed);
            println!();
            shown += 1;
        }
    }

    for gateway in &dropped {
        println!(
            "{} {} no longer exists, removed from state",
            "⚠".yellow(),
            gateway.cyan()
        );
    }

    if shown == 0 && dropped.is_empty() {
        println!("{}", "No tracked gateways".dimmed());
    }
    Ok(())
}

/// Read every tracked gateway, dropping the ones that are gone
///
/// Returns the names that were dropped.
pub async fn refresh(
    ctx: &Context,
    state: &mut StateFile,
    name: Option<&str>,
) -> anyhow::Result<Vec<String>> {
    let names: Vec<String> = match name {
        Some(name) if state.get_gateway(name).is_none() => {
            anyhow::bail!("Gateway '{}' is not tracked", name)
        }
        Some(name) => vec![name.to_string()],
        None => state.gateways.keys().cloned().collect(),
    };

    let mut dropped = Vec::new();
    for gateway in names {
        let Some(mut tracked) = state.get_gateway(&gateway).cloned() else {
            continue;
        };

        match ctx.reconciler.read(&tracked.id).await? {
            Some(observed) => {
                tracked.observe(observed);
                state.set_gateway(gateway, tracked);
            }
            None => {
                state.remove_gateway(&gateway);
                dropped.push(gateway);
            }
        }
    }
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use natgate_cloud::{GatewayState, RemoteError, TrackedGateway};

    #[tokio::test]
    async fn test_refresh_drops_absent_gateways() {
        let client = mock_client();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest_with(&[]), dir.path());

        let mut state = StateFile::new();
        state.set_gateway("a", TrackedGateway::new("nat-a", descriptor("subnet-1")));
        state.set_gateway("b", TrackedGateway::new("nat-b", descriptor("subnet-2")));

        client.push_states([gateway("nat-a", GatewayState::Available, "subnet-1")]);
        client.push_describe(Err(RemoteError::not_found("nat-b")));

        let dropped = refresh(&ctx, &mut state, None).await.unwrap();

        assert_eq!(dropped, vec!["b".to_string()]);
        let a = state.get_gateway("a").unwrap();
        assert_eq!(a.observed.as_ref().unwrap().state, GatewayState::Available);
        assert!(state.get_gateway("b").is_none());
    }

    #[tokio::test]
    async fn test_refresh_unknown_name() {
        let client = mock_client();
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&client, manifest_with(&[]), dir.path());

        let mut state = StateFile::new();
        assert!(refresh(&ctx, &mut state, Some("missing")).await.is_err());
    }
}
