//! Conversions between SDK shapes and the natgate model

use aws_sdk_ec2::types::{
    ConnectivityType as SdkConnectivityType, NatGateway as SdkNatGateway, NatGatewayAddress,
    ResourceType, Tag, TagSpecification,
};
use natgate_cloud::{
    CloudError, ConnectivityType, GatewayAddress, GatewayState, NatGateway, Result, Tags,
};

pub fn connectivity_to_sdk(connectivity_type: ConnectivityType) -> SdkConnectivityType {
    match connectivity_type {
        ConnectivityType::Public => SdkConnectivityType::Public,
        ConnectivityType::Private => SdkConnectivityType::Private,
    }
}

pub fn tags_to_sdk(tags: &Tags) -> Vec<Tag> {
    tags.iter()
        .map(|(k, v)| Tag::builder().key(k).value(v).build())
        .collect()
}

pub fn tag_specification(tags: &Tags) -> Option<TagSpecification> {
    if tags.is_empty() {
        return None;
    }
    Some(
        TagSpecification::builder()
            .resource_type(ResourceType::Natgateway)
            .set_tags(Some(tags_to_sdk(tags)))
            .build(),
    )
}

pub fn tags_from_sdk(tags: &[Tag]) -> Tags {
    tags.iter()
        .filter_map(|t| {
            let key = t.key()?;
            Some((key.to_string(), t.value().unwrap_or_default().to_string()))
        })
        .collect()
}

fn address_from_sdk(address: &NatGatewayAddress) -> GatewayAddress {
    GatewayAddress {
        allocation_id: address.allocation_id().map(str::to_string),
        network_interface_id: address.network_interface_id().map(str::to_string),
        private_ip: address.private_ip().map(str::to_string),
        public_ip: address.public_ip().map(str::to_string),
    }
}

/// Convert a described gateway. Missing id or unknown state is malformed.
pub fn gateway_from_sdk(gateway: &SdkNatGateway) -> Result<NatGateway> {
    let id = gateway
        .nat_gateway_id()
        .ok_or_else(|| CloudError::MalformedResponse("NAT gateway without an id".to_string()))?;

    let state: GatewayState = gateway
        .state()
        .ok_or_else(|| CloudError::MalformedResponse(format!("NAT gateway {} without a state", id)))?
        .as_str()
        .parse()?;

    let connectivity_type = gateway
        .connectivity_type()
        .map(|c| c.as_str().parse::<ConnectivityType>())
        .transpose()?;

    Ok(NatGateway {
        id: id.to_string(),
        state,
        connectivity_type,
        subnet_id: gateway.subnet_id().map(str::to_string),
        addresses: gateway
            .nat_gateway_addresses()
            .iter()
            .map(address_from_sdk)
            .collect(),
        tags: tags_from_sdk(gateway.tags()),
        failure_code: gateway.failure_code().map(str::to_string),
        failure_message: gateway.failure_message().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::NatGatewayState;

    fn sdk_gateway() -> aws_sdk_ec2::types::builders::NatGatewayBuilder {
        SdkNatGateway::builder()
            .nat_gateway_id("nat-0abc")
            .state(NatGatewayState::Available)
            .connectivity_type(SdkConnectivityType::Public)
            .subnet_id("subnet-1")
            .nat_gateway_addresses(
                NatGatewayAddress::builder()
                    .allocation_id("eipalloc-1")
                    .network_interface_id("eni-1")
                    .private_ip("10.0.0.5")
                    .public_ip("203.0.113.7")
                    .build(),
            )
            .nat_gateway_addresses(NatGatewayAddress::builder().private_ip("10.0.0.6").build())
            .tags(Tag::builder().key("Name").value("main").build())
    }

    #[test]
    fn test_gateway_from_sdk() {
        let gw = gateway_from_sdk(&sdk_gateway().build()).unwrap();

        assert_eq!(gw.id, "nat-0abc");
        assert_eq!(gw.state, GatewayState::Available);
        assert_eq!(gw.connectivity_type, Some(ConnectivityType::Public));
        assert_eq!(gw.addresses.len(), 2);
        assert_eq!(gw.primary_address().unwrap().private_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(gw.tags.get("Name").map(String::as_str), Some("main"));
    }

    #[test]
    fn test_failed_gateway_keeps_failure_message() {
        let gw = gateway_from_sdk(
            &sdk_gateway()
                .state(NatGatewayState::Failed)
                .failure_code("Gateway.NotAttached")
                .failure_message("Network vpc-1 has no Internet gateway attached")
                .build(),
        )
        .unwrap();

        assert_eq!(gw.state, GatewayState::Failed);
        assert!(gw.failure_reason().starts_with("Gateway.NotAttached"));
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let sdk = SdkNatGateway::builder().state(NatGatewayState::Pending).build();
        assert!(matches!(
            gateway_from_sdk(&sdk),
            Err(CloudError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_tag_specification() {
        assert!(tag_specification(&Tags::new()).is_none());

        let tags: Tags = [("Name".to_string(), "main".to_string())].into_iter().collect();
        let spec = tag_specification(&tags).unwrap();
        assert_eq!(spec.resource_type(), Some(&ResourceType::Natgateway));
        assert_eq!(tags_from_sdk(spec.tags()), tags);
    }
}
