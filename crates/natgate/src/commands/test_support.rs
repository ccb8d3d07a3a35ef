//! Fixtures shared by the command tests

use crate::context::Context;
use natgate_cloud::testing::MockRemoteClient;
use natgate_cloud::{
    GatewayAddress, GatewayState, NatGateway, NatGatewayDescriptor, Reconciler, StateManager,
    WaitPolicy,
};
use natgate_config::{GatewaySpec, Manifest};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn mock_client() -> Arc<MockRemoteClient> {
    Arc::new(MockRemoteClient::new())
}

fn fast_policy(base: WaitPolicy) -> WaitPolicy {
    let mut policy = base
        .with_poll_interval(Duration::from_millis(1))
        .with_timeout(Duration::from_secs(5))
        .without_jitter();
    policy.initial_delay = Duration::ZERO;
    policy.max_interval = Duration::from_millis(2);
    policy
}

pub fn context(client: &Arc<MockRemoteClient>, manifest: Manifest, root: &Path) -> Context {
    let reconciler = Reconciler::new(client.clone())
        .with_tag_config(manifest.tag_config())
        .with_create_policy(fast_policy(WaitPolicy::for_create()))
        .with_delete_policy(fast_policy(WaitPolicy::for_delete()));
    Context::new(manifest, reconciler, StateManager::new(root))
}

pub fn manifest_with(gateways: &[(&str, &str)]) -> Manifest {
    Manifest {
        gateways: gateways
            .iter()
            .map(|(name, subnet)| {
                let spec = GatewaySpec {
                    subnet_id: subnet.to_string(),
                    ..Default::default()
                };
                (name.to_string(), spec)
            })
            .collect(),
        ..Default::default()
    }
}

pub fn descriptor(subnet: &str) -> NatGatewayDescriptor {
    NatGatewayDescriptor::new(subnet)
}

pub fn gateway(id: &str, state: GatewayState, subnet: &str) -> NatGateway {
    NatGateway::new(id, state)
        .with_subnet(subnet)
        .with_address(GatewayAddress {
            private_ip: Some("10.0.0.5".to_string()),
            ..Default::default()
        })
}
