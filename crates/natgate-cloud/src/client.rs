//! Remote Client trait definition

use crate::error::Result;
use crate::model::{CreateNatGatewayRequest, NatGateway, Tags};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Remote control plane abstraction
///
/// Each method is one atomic API call. Retries below the HTTP layer are the
/// implementation's concern; callers never retry mutations on their own.
/// Errors are `CloudError::Remote` carrying the provider's error code, so
/// that callers can match on not-found codes.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Returns the client name (e.g., "aws-ec2")
    fn name(&self) -> &str;

    /// Create a NAT gateway and return its id
    async fn create_nat_gateway(&self, request: &CreateNatGatewayRequest) -> Result<String>;

    /// Describe NAT gateways by id. An empty result is not an error.
    async fn describe_nat_gateways(&self, ids: &[String]) -> Result<Vec<NatGateway>>;

    /// Add or overwrite tags on a resource
    async fn tag_object(&self, id: &str, tags: &Tags) -> Result<()>;

    /// Remove tags by key from a resource
    async fn untag_object(&self, id: &str, keys: &BTreeSet<String>) -> Result<()>;

    /// Start deleting a NAT gateway
    async fn delete_nat_gateway(&self, id: &str) -> Result<()>;
}
