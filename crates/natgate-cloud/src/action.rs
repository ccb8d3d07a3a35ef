//! Action types for gateway reconciliation

use crate::model::{NatGatewayDescriptor, ReconciledState};
use crate::state::TrackedGateway;
use crate::tags::{TagConfig, TagDiff};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a planned action for one gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Gateway name in the manifest
    pub gateway: String,

    /// Remote id, when the gateway is tracked
    pub remote_id: Option<String>,

    /// Description of the action
    pub description: String,

    /// Additional details about the action
    pub details: HashMap<String, serde_json::Value>,
}

impl Action {
    fn new(
        action_type: ActionType,
        gateway: &str,
        remote_id: Option<&str>,
        description: String,
    ) -> Self {
        Self {
            id: format!("{}-{}", action_type, gateway),
            action_type,
            gateway: gateway.to_string(),
            remote_id: remote_id.map(str::to_string),
            description,
            details: HashMap::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: serde_json::Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new gateway
    Create,
    /// Update tags in place
    Update,
    /// Destroy and recreate (immutable attribute changed)
    Replace,
    /// Delete a gateway
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Decide what to do with one gateway
///
/// `live` is the result of a fresh read (`None` if the gateway is gone or
/// was never created). Immutable attributes are compared against the
/// descriptor the gateway was created from; tags against the live tags.
pub fn plan_gateway(
    name: &str,
    desired: Option<&NatGatewayDescriptor>,
    tracked: Option<&TrackedGateway>,
    live: Option<&ReconciledState>,
    tags: &TagConfig,
) -> Action {
    let remote_id = tracked.map(|t| t.id.as_str());

    let (desired, tracked, live) = match (desired, tracked, live) {
        (None, Some(_), _) => {
            return Action::new(
                ActionType::Delete,
                name,
                remote_id,
                format!("Delete NAT gateway {} (no longer declared)", name),
            );
        }
        (None, None, _) => {
            return Action::new(ActionType::NoOp, name, None, format!("{} is not managed", name));
        }
        (Some(_), None, _) => {
            return Action::new(
                ActionType::Create,
                name,
                None,
                format!("Create NAT gateway {}", name),
            );
        }
        (Some(_), Some(_), None) => {
            return Action::new(
                ActionType::Create,
                name,
                remote_id,
                format!("Create NAT gateway {} (tracked gateway is gone)", name),
            );
        }
        (Some(d), Some(t), Some(l)) => (d, t, l),
    };

    let changed = tracked.descriptor.immutable_changes(desired);
    if !changed.is_empty() {
        return Action::new(
            ActionType::Replace,
            name,
            remote_id,
            format!("Replace NAT gateway {} ({} changed)", name, changed.join(", ")),
        )
        .with_detail("changed", serde_json::json!(changed));
    }

    let diff = TagDiff::between(&live.tags_all, &tags.merge(&desired.tags));
    if !diff.is_empty() {
        return Action::new(
            ActionType::Update,
            name,
            remote_id,
            format!(
                "Update tags of NAT gateway {} (+{} -{})",
                name,
                diff.to_set.len(),
                diff.to_remove.len()
            ),
        )
        .with_detail("to_set", serde_json::json!(diff.to_set))
        .with_detail("to_remove", serde_json::json!(diff.to_remove));
    }

    Action::new(
        ActionType::NoOp,
        name,
        remote_id,
        format!("NAT gateway {} is up to date", name),
    )
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionResult>,

    /// Failed actions
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// ID of the action
    pub action_id: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            replace: self.actions_by_type(ActionType::Replace).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}
