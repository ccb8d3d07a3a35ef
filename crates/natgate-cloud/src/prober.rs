//! Point-in-time state probes
//!
//! A probe is a single side-effect-free describe call that reports whether
//! the gateway exists. A failed query is never reported as absence; the
//! waiter relies on that to avoid converging on a transient error.

use crate::client::RemoteClient;
use crate::error::{CloudError, Result};
use crate::model::NatGateway;
use async_trait::async_trait;
use std::sync::Arc;

/// Why a probe found nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    /// The describe call succeeded with zero matches
    EmptyResponse,
    /// The describe call failed with a not-found error code
    NotFoundError,
}

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(NatGateway),
    Absent(Absence),
}

impl Probe {
    pub fn is_absent(&self) -> bool {
        matches!(self, Probe::Absent(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Probe::Found(gw) => gw.state.as_str(),
            Probe::Absent(_) => "absent",
        }
    }

    pub fn into_gateway(self) -> Option<NatGateway> {
        match self {
            Probe::Found(gw) => Some(gw),
            Probe::Absent(_) => None,
        }
    }
}

/// Something the waiter can poll
#[async_trait]
pub trait StateProber: Send + Sync {
    /// Identifier of the probed object, for logs and errors
    fn id(&self) -> &str;

    async fn probe(&self) -> Result<Probe>;
}

/// Probes one NAT gateway through a Remote Client
pub struct NatGatewayProber {
    client: Arc<dyn RemoteClient>,
    id: String,
}

impl NatGatewayProber {
    pub fn new(client: Arc<dyn RemoteClient>, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
        }
    }
}

#[async_trait]
impl StateProber for NatGatewayProber {
    fn id(&self) -> &str {
        &self.id
    }

    async fn probe(&self) -> Result<Probe> {
        let gateways = match self
            .client
            .describe_nat_gateways(std::slice::from_ref(&self.id))
            .await
        {
            Ok(gateways) => gateways,
            Err(e) if e.is_not_found() => {
                // Usually the same as an empty response, but reported through
                // a different path. Keep the signals apart.
                tracing::warn!(
                    "NAT gateway {} reported missing via error code ({}), not an empty response",
                    self.id,
                    e
                );
                return Ok(Probe::Absent(Absence::NotFoundError));
            }
            Err(e) => {
                tracing::debug!("Probe for NAT gateway {} failed: {}", self.id, e);
                return Err(e);
            }
        };

        if gateways.is_empty() {
            tracing::debug!("NAT gateway {} not visible yet or gone", self.id);
            return Ok(Probe::Absent(Absence::EmptyResponse));
        }

        let count = gateways.len();
        gateways
            .into_iter()
            .find(|gw| gw.id == self.id)
            .map(Probe::Found)
            .ok_or_else(|| {
                CloudError::MalformedResponse(format!(
                    "describe for {} returned {} gateways, none with a matching id",
                    self.id, count
                ))
            })
    }
}
