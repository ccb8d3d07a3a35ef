//! NAT gateway data model
//!
//! The desired-state descriptor, the provider's view of a live gateway and
//! the reconciled state handed back to the orchestrator.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Tag set, ordered by key
pub type Tags = BTreeMap<String, String>;

/// Whether the gateway routes to the internet or only within the VPC
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityType {
    #[default]
    Public,
    Private,
}

impl ConnectivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityType::Public => "public",
            ConnectivityType::Private => "private",
        }
    }
}

impl std::fmt::Display for ConnectivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectivityType {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(ConnectivityType::Public),
            "private" => Ok(ConnectivityType::Private),
            other => Err(CloudError::MalformedResponse(format!(
                "unknown connectivity type '{}'",
                other
            ))),
        }
    }
}

/// Lifecycle state reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayState {
    Pending,
    Failed,
    Available,
    Deleting,
    Deleted,
}

impl GatewayState {
    pub const ALL: [GatewayState; 5] = [
        GatewayState::Pending,
        GatewayState::Failed,
        GatewayState::Available,
        GatewayState::Deleting,
        GatewayState::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayState::Pending => "pending",
            GatewayState::Failed => "failed",
            GatewayState::Available => "available",
            GatewayState::Deleting => "deleting",
            GatewayState::Deleted => "deleted",
        }
    }

    /// States in which a gateway no longer counts as existing
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            GatewayState::Deleted | GatewayState::Deleting | GatewayState::Failed
        )
    }
}

impl std::fmt::Display for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayState {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        GatewayState::ALL
            .into_iter()
            .find(|state| state.as_str() == lower)
            .ok_or_else(|| {
                CloudError::MalformedResponse(format!("unknown NAT gateway state '{}'", s))
            })
    }
}

/// Desired state of a NAT gateway
///
/// Everything except `tags` is immutable once the gateway exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGatewayDescriptor {
    /// Elastic IP allocation (public gateways)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_id: Option<String>,

    #[serde(default)]
    pub connectivity_type: ConnectivityType,

    pub subnet_id: String,

    #[serde(default)]
    pub tags: Tags,
}

impl NatGatewayDescriptor {
    pub fn new(subnet_id: impl Into<String>) -> Self {
        Self {
            subnet_id: subnet_id.into(),
            ..Default::default()
        }
    }

    pub fn with_allocation_id(mut self, allocation_id: impl Into<String>) -> Self {
        self.allocation_id = Some(allocation_id.into());
        self
    }

    pub fn with_connectivity_type(mut self, connectivity_type: ConnectivityType) -> Self {
        self.connectivity_type = connectivity_type;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Names of immutable attributes that differ from `other`
    pub fn immutable_changes(&self, other: &NatGatewayDescriptor) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.allocation_id != other.allocation_id {
            changed.push("allocation_id");
        }
        if self.connectivity_type != other.connectivity_type {
            changed.push("connectivity_type");
        }
        if self.subnet_id != other.subnet_id {
            changed.push("subnet_id");
        }
        changed
    }
}

/// Request sent to the Remote Client's create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateNatGatewayRequest {
    pub allocation_id: Option<String>,
    pub connectivity_type: Option<ConnectivityType>,
    pub subnet_id: Option<String>,
    pub tags: Tags,
}

impl CreateNatGatewayRequest {
    /// Build a request from the descriptor, leaving empty fields unset
    pub fn from_descriptor(descriptor: &NatGatewayDescriptor, tags: Tags) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            allocation_id: descriptor.allocation_id.as_deref().and_then(non_empty),
            connectivity_type: Some(descriptor.connectivity_type),
            subnet_id: non_empty(&descriptor.subnet_id),
            tags,
        }
    }
}

/// One address entry of a live gateway
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAddress {
    pub allocation_id: Option<String>,
    pub network_interface_id: Option<String>,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
}

/// The provider's view of a live NAT gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatGateway {
    pub id: String,
    pub state: GatewayState,
    pub connectivity_type: Option<ConnectivityType>,
    pub subnet_id: Option<String>,
    /// Only the first entry is authoritative
    pub addresses: Vec<GatewayAddress>,
    pub tags: Tags,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
}

impl NatGateway {
    pub fn new(id: impl Into<String>, state: GatewayState) -> Self {
        Self {
            id: id.into(),
            state,
            connectivity_type: None,
            subnet_id: None,
            addresses: Vec::new(),
            tags: Tags::new(),
            failure_code: None,
            failure_message: None,
        }
    }

    pub fn with_subnet(mut self, subnet_id: impl Into<String>) -> Self {
        self.subnet_id = Some(subnet_id.into());
        self
    }

    pub fn with_connectivity_type(mut self, connectivity_type: ConnectivityType) -> Self {
        self.connectivity_type = Some(connectivity_type);
        self
    }

    pub fn with_address(mut self, address: GatewayAddress) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_failure(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.failure_code = Some(code.into());
        self.failure_message = Some(message.into());
        self
    }

    /// The authoritative address entry
    pub fn primary_address(&self) -> Result<&GatewayAddress> {
        self.addresses.first().ok_or_else(|| {
            CloudError::MalformedResponse(format!("NAT gateway {} has no addresses", self.id))
        })
    }

    /// Human-readable reason for a `failed` state
    pub fn failure_reason(&self) -> String {
        match (&self.failure_code, &self.failure_message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => format!("state '{}'", self.state),
        }
    }
}

/// Reconciled state written back to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledState {
    pub id: String,
    pub allocation_id: Option<String>,
    pub connectivity_type: Option<ConnectivityType>,
    pub subnet_id: Option<String>,
    pub network_interface_id: Option<String>,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    /// User-managed tags (provider defaults removed)
    pub tags: Tags,
    /// All tags on the gateway, defaults included
    pub tags_all: Tags,
    pub state: GatewayState,
}

impl ReconciledState {
    /// The descriptor this live state corresponds to
    pub fn descriptor(&self) -> NatGatewayDescriptor {
        NatGatewayDescriptor {
            allocation_id: self.allocation_id.clone(),
            connectivity_type: self.connectivity_type.unwrap_or_default(),
            subnet_id: self.subnet_id.clone().unwrap_or_default(),
            tags: self.tags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parse() {
        for state in GatewayState::ALL {
            assert_eq!(state.as_str().parse::<GatewayState>().unwrap(), state);
        }
        assert_eq!("Available".parse::<GatewayState>().unwrap(), GatewayState::Available);
        assert!(matches!(
            "exploding".parse::<GatewayState>(),
            Err(CloudError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_gone_states() {
        let gone: Vec<_> = GatewayState::ALL.into_iter().filter(|s| s.is_gone()).collect();
        assert_eq!(
            gone,
            vec![GatewayState::Failed, GatewayState::Deleting, GatewayState::Deleted]
        );
    }

    #[test]
    fn test_descriptor_defaults_from_yaml_shape() {
        let descriptor: NatGatewayDescriptor =
            serde_json::from_value(serde_json::json!({ "subnet_id": "subnet-1" })).unwrap();
        assert_eq!(descriptor.connectivity_type, ConnectivityType::Public);
        assert!(descriptor.allocation_id.is_none());
        assert!(descriptor.tags.is_empty());
    }

    #[test]
    fn test_create_request_skips_empty_fields() {
        let descriptor = NatGatewayDescriptor::new("subnet-1").with_allocation_id("");
        let request = CreateNatGatewayRequest::from_descriptor(&descriptor, Tags::new());
        assert_eq!(request.allocation_id, None);
        assert_eq!(request.subnet_id.as_deref(), Some("subnet-1"));
        assert_eq!(request.connectivity_type, Some(ConnectivityType::Public));
    }

    #[test]
    fn test_immutable_changes() {
        let a = NatGatewayDescriptor::new("subnet-1").with_tag("a", "1");
        let b = NatGatewayDescriptor::new("subnet-2")
            .with_connectivity_type(ConnectivityType::Private)
            .with_tag("a", "2");
        assert_eq!(a.immutable_changes(&b), vec!["connectivity_type", "subnet_id"]);
        assert!(a.immutable_changes(&a.clone().with_tag("b", "3")).is_empty());
    }

    #[test]
    fn test_primary_address() {
        let empty = NatGateway::new("nat-1", GatewayState::Available);
        assert!(matches!(
            empty.primary_address(),
            Err(CloudError::MalformedResponse(_))
        ));

        let first = GatewayAddress {
            private_ip: Some("10.0.0.1".into()),
            ..Default::default()
        };
        let second = GatewayAddress {
            private_ip: Some("10.0.0.2".into()),
            ..Default::default()
        };
        let gw = empty.with_address(first.clone()).with_address(second);
        assert_eq!(gw.primary_address().unwrap(), &first);
    }

    #[test]
    fn test_failure_reason() {
        let gw = NatGateway::new("nat-1", GatewayState::Failed)
            .with_failure("InsufficientFreeAddressesInSubnet", "subnet is full");
        assert_eq!(
            gw.failure_reason(),
            "InsufficientFreeAddressesInSubnet: subnet is full"
        );
        assert_eq!(
            NatGateway::new("nat-2", GatewayState::Failed).failure_reason(),
            "state 'failed'"
        );
    }
}
