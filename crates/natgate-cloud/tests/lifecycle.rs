//! End-to-end lifecycle tests against a simulated control plane.
//!
//! The simulated control plane advances each gateway independently: a new
//! gateway stays `pending` for a few describe calls, a deleted one stays
//! `deleting` for a few more, and then it disappears.

use async_trait::async_trait;
use natgate_cloud::{
    CloudError, CreateNatGatewayRequest, GatewayAddress, GatewayState, NatGateway,
    NatGatewayDescriptor, Reconciler, RemoteClient, RemoteError, Result, TagConfig, Tags,
    WaitPolicy,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct SimGateway {
    gateway: NatGateway,
    /// Describe calls left before the next state transition
    countdown: u32,
}

/// Simulated EC2 control plane
struct SimulatedEc2 {
    gateways: Mutex<HashMap<String, SimGateway>>,
    next_id: Mutex<u32>,
    transition_after: u32,
}

impl SimulatedEc2 {
    fn new(transition_after: u32) -> Self {
        Self {
            gateways: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
            transition_after,
        }
    }

    fn not_found(id: &str) -> CloudError {
        RemoteError::new(
            "InvalidNatGatewayID.NotFound",
            format!("The NAT gateway {} was not found", id),
        )
        .into()
    }
}

#[async_trait]
impl RemoteClient for SimulatedEc2 {
    fn name(&self) -> &str {
        "simulated-ec2"
    }

    async fn create_nat_gateway(&self, request: &CreateNatGatewayRequest) -> Result<String> {
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("nat-{:04}", *next)
        };

        let mut gateway = NatGateway::new(&id, GatewayState::Pending).with_address(GatewayAddress {
            allocation_id: request.allocation_id.clone(),
            network_interface_id: Some(format!("eni-{}", id)),
            private_ip: Some("10.0.1.10".into()),
            public_ip: Some("198.51.100.10".into()),
        });
        gateway.subnet_id = request.subnet_id.clone();
        gateway.connectivity_type = request.connectivity_type;
        gateway.tags = request.tags.clone();
        gateway.tags.insert("aws:created-by".into(), "natgate".into());

        self.gateways.lock().unwrap().insert(
            id.clone(),
            SimGateway {
                gateway,
                countdown: self.transition_after,
            },
        );
        Ok(id)
    }

    async fn describe_nat_gateways(&self, ids: &[String]) -> Result<Vec<NatGateway>> {
        let mut gateways = self.gateways.lock().unwrap();
        let mut found = Vec::new();
        for id in ids {
            let Some(sim) = gateways.get_mut(id) else {
                continue;
            };
            found.push(sim.gateway.clone());

            if sim.countdown > 0 {
                sim.countdown -= 1;
                continue;
            }
            match sim.gateway.state {
                GatewayState::Pending => sim.gateway.state = GatewayState::Available,
                GatewayState::Deleting => sim.gateway.state = GatewayState::Deleted,
                _ => {}
            }
        }
        Ok(found)
    }

    async fn tag_object(&self, id: &str, tags: &Tags) -> Result<()> {
        let mut gateways = self.gateways.lock().unwrap();
        let sim = gateways.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        sim.gateway.tags.extend(tags.clone());
        Ok(())
    }

    async fn untag_object(&self, id: &str, keys: &BTreeSet<String>) -> Result<()> {
        let mut gateways = self.gateways.lock().unwrap();
        let sim = gateways.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        sim.gateway.tags.retain(|k, _| !keys.contains(k));
        Ok(())
    }

    async fn delete_nat_gateway(&self, id: &str) -> Result<()> {
        let mut gateways = self.gateways.lock().unwrap();
        let sim = gateways.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        if sim.gateway.state == GatewayState::Deleted {
            return Err(Self::not_found(id));
        }
        sim.gateway.state = GatewayState::Deleting;
        sim.countdown = self.transition_after;
        Ok(())
    }
}

fn policy() -> WaitPolicy {
    WaitPolicy {
        initial_delay: Duration::ZERO,
        poll_interval: Duration::from_secs(1),
        max_interval: Duration::from_secs(4),
        ..WaitPolicy::for_create().without_jitter()
    }
}

fn reconciler(client: Arc<SimulatedEc2>) -> Reconciler {
    Reconciler::new(client)
        .with_create_policy(policy())
        .with_delete_policy(policy())
        .with_tag_config(TagConfig {
            default_tags: [("Owner".to_string(), "platform".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        })
}

#[tokio::test(start_paused = true)]
async fn full_lifecycle() {
    let client = Arc::new(SimulatedEc2::new(2));
    let reconciler = reconciler(client.clone());

    let descriptor = NatGatewayDescriptor::new("subnet-1")
        .with_allocation_id("eipalloc-1")
        .with_tag("Name", "main");

    let created = reconciler.create(&descriptor).await.unwrap();
    assert_eq!(created.state, GatewayState::Available);
    assert_eq!(created.subnet_id.as_deref(), Some("subnet-1"));
    assert_eq!(created.allocation_id.as_deref(), Some("eipalloc-1"));
    assert!(!created.tags_all.contains_key("aws:created-by"));
    assert_eq!(created.tags.get("Name").map(String::as_str), Some("main"));
    assert!(!created.tags.contains_key("Owner"));

    let read = reconciler.read(&created.id).await.unwrap().unwrap();
    assert_eq!(read.id, created.id);

    let user_tags: Tags = [("Name".to_string(), "primary".to_string())]
        .into_iter()
        .collect();
    let new_tags = reconciler.tag_config().merge(&user_tags);
    reconciler
        .update(&created.id, &read.tags_all, &new_tags)
        .await
        .unwrap();
    let updated = reconciler.read(&created.id).await.unwrap().unwrap();
    assert_eq!(updated.tags_all, new_tags);

    reconciler.delete(&created.id).await.unwrap();
    assert_eq!(reconciler.read(&created.id).await.unwrap(), None);

    // Second delete hits the not-found code and is still a success
    reconciler.delete(&created.id).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn concurrent_creates_are_independent() {
    let client = Arc::new(SimulatedEc2::new(3));
    let reconciler = Arc::new(reconciler(client));

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let reconciler = reconciler.clone();
            tokio::spawn(async move {
                let descriptor = NatGatewayDescriptor::new(format!("subnet-{}", i));
                reconciler.create(&descriptor).await
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for task in tasks {
        let state = task.await.unwrap().unwrap();
        assert_eq!(state.state, GatewayState::Available);
        ids.insert(state.id);
    }
    assert_eq!(ids.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn slow_gateway_times_out_with_id() {
    let client = Arc::new(SimulatedEc2::new(u32::MAX));
    let reconciler = reconciler(client).with_create_policy(policy().with_timeout(Duration::from_secs(30)));

    let err = reconciler
        .create(&NatGatewayDescriptor::new("subnet-1"))
        .await
        .unwrap_err();

    assert_eq!(err.tracked_id(), Some("nat-0001"));
}
