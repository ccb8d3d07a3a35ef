use crate::commands::plan::{self, PlannedChanges};
use crate::context::{self, Context};
use crate::utils;
use colored::Colorize;
use natgate_cloud::{
    Action, ActionType, ApplyResult, CloudError, NatGatewayDescriptor, ReconciledState,
    ResourceStatus, StateFile, TrackedGateway,
};
use std::time::Instant;

pub async fn handle(ctx: &Context, name: Option<&str>, yes: bool) -> anyhow::Result<()> {
    let lock = ctx.state.acquire_lock().await?;
    let result = run(ctx, name, yes).await;
    context::release_lock(lock, result).await
}

async fn run(ctx: &Context, name: Option<&str>, yes: bool) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("Refreshing gateway state ({})...", ctx.reconciler.client_name()).blue()
    );

    let mut state = ctx.state.load().await?;
    let planned = plan::compute(ctx, &state, name).await?;

    println!();
    utils::print_plan(&planned.plan);

    if !planned.plan.has_changes {
        refresh_observed(&mut state, &planned);
        ctx.state.save(&state).await?;
        println!("{}", "✓ Gateways match the manifest".green());
        return Ok(());
    }

    if !yes {
        println!();
        println!("{}", "Re-run with --yes to apply these changes".yellow());
        return Ok(());
    }

    println!();
    let result = execute(ctx, &mut state, &planned).await?;

    println!();
    println!(
        "{} succeeded, {} failed ({} ms)",
        result.succeeded.len().to_string().green(),
        result.failed.len().to_string().red(),
        result.duration_ms
    );

    if !result.is_success() {
        anyhow::bail!("{} action(s) failed", result.failed.len());
    }
    Ok(())
}

/// Run every action of a plan, saving state after each one
///
/// Stops early once a wait has been cancelled.
pub async fn execute(
    ctx: &Context,
    state: &mut StateFile,
    planned: &PlannedChanges,
) -> anyhow::Result<ApplyResult> {
    let start = Instant::now();
    let mut result = ApplyResult::new();

    refresh_observed(state, planned);

    for action in &planned.plan.actions {
        if action.action_type == ActionType::NoOp {
            continue;
        }

        println!(
            "{} {}",
            utils::action_marker(action.action_type),
            action.description
        );

        let outcome = apply_action(ctx, state, action, planned.live.get(&action.gateway)).await;
        ctx.state.save(state).await?;

        match outcome {
            Ok(message) => {
                println!("  {} {}", "✓".green(), message);
                result.add_success(action.id.clone(), message);
            }
            Err(err) => {
                println!("  {} {}", "✗".red(), err.to_string().red());
                let cancelled = err.is_cancelled();
                result.add_failure(action.id.clone(), err.to_string());
                if cancelled {
                    println!("{}", "⚠ Cancelled, remaining actions skipped".yellow());
                    break;
                }
            }
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

fn refresh_observed(state: &mut StateFile, planned: &PlannedChanges) {
    for action in &planned.plan.actions {
        if action.action_type != ActionType::NoOp {
            continue;
        }
        if let (Some(tracked), Some(live)) = (
            state.gateways.get_mut(&action.gateway),
            planned.live.get(&action.gateway),
        ) {
            tracked.observe(live.clone());
        }
    }
}

fn declared(ctx: &Context, name: &str) -> natgate_cloud::Result<NatGatewayDescriptor> {
    ctx.manifest
        .descriptor(name)
        .ok_or_else(|| CloudError::InvalidConfig(format!("gateway '{}' is not declared", name)))
}

fn tracked_id(action: &Action) -> natgate_cloud::Result<&str> {
    action.remote_id.as_deref().ok_or_else(|| {
        CloudError::StateError(format!("gateway '{}' is not tracked", action.gateway))
    })
}

async fn apply_action(
    ctx: &Context,
    state: &mut StateFile,
    action: &Action,
    live: Option<&ReconciledState>,
) -> natgate_cloud::Result<String> {
    let name = action.gateway.as_str();

    match action.action_type {
        ActionType::Create => {
            let descriptor = declared(ctx, name)?;
            create(ctx, state, name, &descriptor).await
        }
        ActionType::Update => {
            let descriptor = declared(ctx, name)?;
            let id = tracked_id(action)?;
            let live = live.ok_or_else(|| {
                CloudError::StateError(format!("no live state for gateway '{}'", name))
            })?;

            let desired = ctx.reconciler.tag_config().merge(&descriptor.tags);
            let diff = ctx.reconciler.update(id, &live.tags_all, &desired).await?;

            if let Some(mut tracked) = state.get_gateway(name).cloned() {
                tracked.descriptor = descriptor;
                match ctx.reconciler.read(id).await? {
                    Some(observed) => tracked.observe(observed),
                    None => tracked.status = ResourceStatus::Unknown,
                }
                state.set_gateway(name, tracked);
            }

            Ok(format!(
                "updated tags of {} (+{} -{})",
                id,
                diff.to_set.len(),
                diff.to_remove.len()
            ))
        }
        ActionType::Replace => {
            let descriptor = declared(ctx, name)?;
            let id = tracked_id(action)?;

            ctx.reconciler.delete(id).await?;
            state.remove_gateway(name);

            let created = create(ctx, state, name, &descriptor).await?;
            Ok(format!("deleted {}, {}", id, created))
        }
        ActionType::Delete => {
            let id = tracked_id(action)?;
            ctx.reconciler.delete(id).await?;
            state.remove_gateway(name);
            Ok(format!("deleted {}", id))
        }
        ActionType::NoOp => Ok(String::new()),
    }
}

/// Create a gateway and track it
///
/// A gateway that was created but never became available is tracked as
/// tainted so the next plan can read or replace it.
pub async fn create(
    ctx: &Context,
    state: &mut StateFile,
    name: &str,
    descriptor: &NatGatewayDescriptor,
) -> natgate_cloud::Result<String> {
    match ctx.reconciler.create(descriptor).await {
        Ok(observed) => {
            let id = observed.id.clone();
            let mut tracked = TrackedGateway::new(&id, descriptor.clone());
            tracked.observe(observed);
            state.set_gateway(name, tracked);
            Ok(format!("created {}", id))
        }
        Err(err) => {
            if let Some(id) = err.tracked_id() {
                tracing::warn!("Tracking incomplete NAT gateway {} as tainted", id);
                state.set_gateway(
                    name,
                    TrackedGateway::new(id, descriptor.clone()).with_status(ResourceStatus::Tainted),
                );
            }
            Err(err)
        }
    }
}
