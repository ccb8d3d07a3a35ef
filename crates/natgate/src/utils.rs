use colored::Colorize;
use natgate_cloud::{Action, ActionType, Plan, ReconciledState};

pub fn action_marker(action_type: ActionType) -> colored::ColoredString {
    match action_type {
        ActionType::Create => "+".green().bold(),
        ActionType::Update => "~".yellow().bold(),
        ActionType::Replace => "-/+".magenta().bold(),
        ActionType::Delete => "-".red().bold(),
        ActionType::NoOp => "=".dimmed(),
    }
}

pub fn print_action(action: &Action) {
    let id = action.remote_id.as_deref().unwrap_or("(new)");
    println!(
        "  {} {:<16} {:<24} {}",
        action_marker(action.action_type),
        action.gateway.cyan(),
        id.dimmed(),
        action.description
    );

    for (key, value) in &action.details {
        println!("      {}: {}", key.dimmed(), value);
    }
}

pub fn print_plan(plan: &Plan) {
    println!("{}", "Plan:".bold());
    if plan.actions.is_empty() {
        println!("  {}", "(no gateways)".dimmed());
    }
    for action in &plan.actions {
        print_action(action);
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

pub fn print_gateway(name: &str, state: &ReconciledState) {
    let dash = || "-".to_string();
    println!("{} {}", name.cyan().bold(), state.id.dimmed());
    println!("  {:<22} {}", "state:", state.state.to_string().green());
    println!(
        "  {:<22} {}",
        "connectivity_type:",
        state.connectivity_type.map(|c| c.to_string()).unwrap_or_else(dash)
    );
    println!("  {:<22} {}", "subnet_id:", state.subnet_id.clone().unwrap_or_else(dash));
    println!(
        "  {:<22} {}",
        "allocation_id:",
        state.allocation_id.clone().unwrap_or_else(dash)
    );
    println!(
        "  {:<22} {}",
        "network_interface_id:",
        state.network_interface_id.clone().unwrap_or_else(dash)
    );
    println!("  {:<22} {}", "private_ip:", state.private_ip.clone().unwrap_or_else(dash));
    println!("  {:<22} {}", "public_ip:", state.public_ip.clone().unwrap_or_else(dash));
    if !state.tags_all.is_empty() {
        println!("  tags:");
        for (key, value) in &state.tags_all {
            let marker = if state.tags.contains_key(key) { "" } else { " (default)" };
            println!("    {} = {}{}", key, value, marker.dimmed());
        }
    }
}
