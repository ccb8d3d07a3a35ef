//! EC2 implementation of the Remote Client

use crate::convert::{connectivity_to_sdk, gateway_from_sdk, tag_specification, tags_to_sdk};
use crate::error::from_sdk_error;
use async_trait::async_trait;
use aws_sdk_ec2::types::Tag;
use natgate_cloud::{
    CloudError, CreateNatGatewayRequest, NatGateway, RemoteClient, Result, Tags,
};
use std::collections::BTreeSet;

/// Remote Client backed by the EC2 API
#[derive(Debug, Clone)]
pub struct Ec2RemoteClient {
    client: aws_sdk_ec2::Client,
}

impl Ec2RemoteClient {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default credential chain
    ///
    /// `region` overrides the region resolved from the environment.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            tracing::debug!("Using AWS region {}", region);
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;

        Self::new(aws_sdk_ec2::Client::new(&sdk_config))
    }
}

#[async_trait]
impl RemoteClient for Ec2RemoteClient {
    fn name(&self) -> &str {
        "aws-ec2"
    }

    async fn create_nat_gateway(&self, request: &CreateNatGatewayRequest) -> Result<String> {
        let output = self
            .client
            .create_nat_gateway()
            .set_allocation_id(request.allocation_id.clone())
            .set_connectivity_type(request.connectivity_type.map(connectivity_to_sdk))
            .set_subnet_id(request.subnet_id.clone())
            .set_tag_specifications(tag_specification(&request.tags).map(|spec| vec![spec]))
            .send()
            .await
            .map_err(|e| from_sdk_error("CreateNatGateway", e))?;

        output
            .nat_gateway()
            .and_then(|gw| gw.nat_gateway_id())
            .map(str::to_string)
            .ok_or_else(|| {
                CloudError::MalformedResponse(
                    "CreateNatGateway response did not contain a NAT gateway id".to_string(),
                )
            })
    }

    async fn describe_nat_gateways(&self, ids: &[String]) -> Result<Vec<NatGateway>> {
        let output = self
            .client
            .describe_nat_gateways()
            .set_nat_gateway_ids(Some(ids.to_vec()))
            .send()
            .await
            .map_err(|e| from_sdk_error("DescribeNatGateways", e))?;

        output.nat_gateways().iter().map(gateway_from_sdk).collect()
    }

    async fn tag_object(&self, id: &str, tags: &Tags) -> Result<()> {
        self.client
            .create_tags()
            .resources(id)
            .set_tags(Some(tags_to_sdk(tags)))
            .send()
            .await
            .map_err(|e| from_sdk_error("CreateTags", e))?;
        Ok(())
    }

    async fn untag_object(&self, id: &str, keys: &BTreeSet<String>) -> Result<()> {
        let tags = keys.iter().map(|k| Tag::builder().key(k).build()).collect();
        self.client
            .delete_tags()
            .resources(id)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| from_sdk_error("DeleteTags", e))?;
        Ok(())
    }

    async fn delete_nat_gateway(&self, id: &str) -> Result<()> {
        self.client
            .delete_nat_gateway()
            .nat_gateway_id(id)
            .send()
            .await
            .map_err(|e| from_sdk_error("DeleteNatGateway", e))?;
        Ok(())
    }
}
