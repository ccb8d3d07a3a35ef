//! natgate.yaml manifest

use crate::error::{ConfigError, Result};
use natgate_cloud::{
    ConnectivityType, IgnoreTags, NatGatewayDescriptor, TagConfig, Tags, WaitPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Declared NAT gateways plus provider-wide settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// AWS region; the CLI flag and `AWS_REGION` take precedence
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub default_tags: Tags,

    #[serde(default)]
    pub ignore_tags: IgnoreTags,

    #[serde(default)]
    pub wait: WaitSettings,

    #[serde(default)]
    pub gateways: BTreeMap<String, GatewaySpec>,
}

/// One declared gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySpec {
    #[serde(default)]
    pub subnet_id: String,

    #[serde(default)]
    pub connectivity_type: ConnectivityType,

    #[serde(default)]
    pub allocation_id: Option<String>,

    #[serde(default)]
    pub tags: Tags,
}

impl GatewaySpec {
    pub fn descriptor(&self) -> NatGatewayDescriptor {
        NatGatewayDescriptor {
            allocation_id: self.allocation_id.clone(),
            connectivity_type: self.connectivity_type,
            subnet_id: self.subnet_id.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitSettings {
    #[serde(default)]
    pub create: WaitOverrides,

    #[serde(default)]
    pub delete: WaitOverrides,
}

/// Per-operation overrides on top of the built-in wait policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitOverrides {
    pub timeout_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub initial_delay_secs: Option<u64>,
    pub not_found_checks: Option<u32>,
}

impl WaitOverrides {
    pub fn apply(&self, mut policy: WaitPolicy) -> WaitPolicy {
        if let Some(secs) = self.timeout_secs {
            policy.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_interval_secs {
            policy.poll_interval = Duration::from_secs(secs);
            policy.max_interval = policy.max_interval.max(policy.poll_interval);
        }
        if let Some(secs) = self.initial_delay_secs {
            policy.initial_delay = Duration::from_secs(secs);
        }
        if let Some(checks) = self.not_found_checks {
            policy.not_found_checks = checks;
        }
        policy
    }

    fn validate(&self, operation: &str) -> Result<()> {
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "wait.{}.timeout_secs must be greater than 0",
                operation
            )));
        }
        if self.poll_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "wait.{}.poll_interval_secs must be greater than 0",
                operation
            )));
        }
        Ok(())
    }
}

impl Manifest {
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        let manifest: Manifest =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, gateway) in &self.gateways {
            if gateway.subnet_id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "gateway '{}' has no subnet_id",
                    name
                )));
            }
            if gateway.allocation_id.as_deref() == Some("") {
                return Err(ConfigError::Invalid(format!(
                    "gateway '{}' has an empty allocation_id",
                    name
                )));
            }
        }
        self.wait.create.validate("create")?;
        self.wait.delete.validate("delete")?;
        Ok(())
    }

    pub fn tag_config(&self) -> TagConfig {
        TagConfig {
            default_tags: self.default_tags.clone(),
            ignore_tags: self.ignore_tags.clone(),
        }
    }

    pub fn create_policy(&self) -> WaitPolicy {
        self.wait.create.apply(WaitPolicy::for_create())
    }

    pub fn delete_policy(&self) -> WaitPolicy {
        self.wait.delete.apply(WaitPolicy::for_delete())
    }

    pub fn descriptor(&self, name: &str) -> Option<NatGatewayDescriptor> {
        self.gateways.get(name).map(GatewaySpec::descriptor)
    }

    pub fn descriptors(&self) -> BTreeMap<String, NatGatewayDescriptor> {
        self.gateways
            .iter()
            .map(|(name, spec)| (name.clone(), spec.descriptor()))
            .collect()
    }
}

/// Read, parse and validate a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    tracing::debug!("Loading manifest from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Manifest::from_yaml(&content, path)
}
