//! NAT gateway lifecycle controller
//!
//! Create, read, update and delete as a four-operation protocol. Each
//! operation composes Remote Client calls with waits and maps the result
//! into a [`ReconciledState`]. None of them persists anything: the caller
//! owns the mapping from its own names to remote ids.

use crate::client::RemoteClient;
use crate::error::{CloudError, Result};
use crate::model::{CreateNatGatewayRequest, NatGateway, NatGatewayDescriptor, ReconciledState, Tags};
use crate::prober::{NatGatewayProber, Probe, StateProber};
use crate::tags::{TagConfig, TagDiff, apply_tag_diff};
use crate::waiter::{CancelSignal, WaitPolicy, WaitTarget, Waiter};
use std::sync::Arc;

/// Lifecycle controller for NAT gateways
pub struct Reconciler {
    client: Arc<dyn RemoteClient>,
    tags: TagConfig,
    create_policy: WaitPolicy,
    delete_policy: WaitPolicy,
    cancel: Option<CancelSignal>,
}

impl Reconciler {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            tags: TagConfig::default(),
            create_policy: WaitPolicy::for_create(),
            delete_policy: WaitPolicy::for_delete(),
            cancel: None,
        }
    }

    pub fn with_tag_config(mut self, tags: TagConfig) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_create_policy(mut self, policy: WaitPolicy) -> Self {
        self.create_policy = policy;
        self
    }

    pub fn with_delete_policy(mut self, policy: WaitPolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn tag_config(&self) -> &TagConfig {
        &self.tags
    }

    /// Name of the Remote Client in use, e.g. "aws-ec2"
    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    fn prober(&self, id: &str) -> NatGatewayProber {
        NatGatewayProber::new(self.client.clone(), id)
    }

    fn waiter(&self, policy: &WaitPolicy) -> Waiter {
        let waiter = Waiter::new(policy.clone());
        match &self.cancel {
            Some(cancel) => waiter.with_cancel(cancel.clone()),
            None => waiter,
        }
    }

    /// Create a gateway and wait until it is available
    ///
    /// If the create call itself fails nothing was created and its error is
    /// returned. Once an id exists, any later failure is wrapped in
    /// [`CloudError::Incomplete`] so the caller can track the id and clean up.
    pub async fn create(&self, descriptor: &NatGatewayDescriptor) -> Result<ReconciledState> {
        let request =
            CreateNatGatewayRequest::from_descriptor(descriptor, self.tags.merge(&descriptor.tags));

        tracing::debug!("Creating NAT gateway via {}: {:?}", self.client.name(), request);
        let id = self.client.create_nat_gateway(&request).await?;
        tracing::info!("Created NAT gateway {}, waiting until available", id);

        let incomplete = |source: CloudError| CloudError::Incomplete {
            id: id.clone(),
            source: Box::new(source),
        };

        let outcome = self
            .waiter(&self.create_policy)
            .wait(&self.prober(&id), WaitTarget::Created)
            .await
            .map_err(incomplete)?;

        let gateway = outcome
            .into_result(&id, &self.create_policy)
            .map_err(incomplete)?
            .ok_or_else(|| {
                incomplete(CloudError::MalformedResponse(format!(
                    "wait for {} succeeded without a gateway",
                    id
                )))
            })?;

        self.to_state(&gateway).map_err(incomplete)
    }

    /// Read the live state with a single probe
    ///
    /// `Ok(None)` means the gateway is gone (absent, deleting, deleted or
    /// failed) and should be dropped from tracked state.
    pub async fn read(&self, id: &str) -> Result<Option<ReconciledState>> {
        let gateway = match self.prober(id).probe().await? {
            Probe::Found(gw) if !gw.state.is_gone() => gw,
            Probe::Found(gw) => {
                tracing::info!("NAT gateway {} is {}, removing from state", id, gw.state);
                return Ok(None);
            }
            Probe::Absent(absence) => {
                tracing::info!("NAT gateway {} not found ({:?}), removing from state", id, absence);
                return Ok(None);
            }
        };

        self.to_state(&gateway).map(Some)
    }

    /// Adopt an existing gateway by id
    pub async fn import(&self, id: &str) -> Result<ReconciledState> {
        self.read(id)
            .await?
            .ok_or_else(|| CloudError::NotFound(format!("NAT gateway {}", id)))
    }

    /// Bring the remote tags from `old` to `new`
    ///
    /// Both sets are effective tags (defaults merged, see
    /// [`TagConfig::merge`]). Only the delta is sent. Returns the applied diff.
    pub async fn update(&self, id: &str, old: &Tags, new: &Tags) -> Result<TagDiff> {
        let diff = TagDiff::between(old, new);
        if diff.is_empty() {
            tracing::debug!("Tags of NAT gateway {} unchanged", id);
            return Ok(diff);
        }

        tracing::info!(
            "Updating tags of NAT gateway {} (+{} -{})",
            id,
            diff.to_set.len(),
            diff.to_remove.len()
        );
        apply_tag_diff(self.client.as_ref(), id, &diff).await?;
        Ok(diff)
    }

    /// Delete a gateway and wait until it is gone
    ///
    /// Deleting a gateway that does not exist succeeds without waiting.
    pub async fn delete(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting NAT gateway {}", id);
        match self.client.delete_nat_gateway(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::info!("NAT gateway {} already gone", id);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let prober = self.prober(id);
        self.waiter(&self.delete_policy)
            .wait(&prober, WaitTarget::Deleted)
            .await?
            .into_result(prober.id(), &self.delete_policy)?;

        tracing::info!("NAT gateway {} deleted", id);
        Ok(())
    }

    fn to_state(&self, gateway: &NatGateway) -> Result<ReconciledState> {
        let address = gateway.primary_address()?;
        let tags_all = self.tags.filter_ignored(&gateway.tags);

        Ok(ReconciledState {
            id: gateway.id.clone(),
            allocation_id: address.allocation_id.clone(),
            connectivity_type: gateway.connectivity_type,
            subnet_id: gateway.subnet_id.clone(),
            network_interface_id: address.network_interface_id.clone(),
            private_ip: address.private_ip.clone(),
            public_ip: address.public_ip.clone(),
            tags: self.tags.remove_defaults(&tags_all),
            tags_all,
            state: gateway.state,
        })
    }
}
