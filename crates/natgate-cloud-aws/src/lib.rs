//! AWS EC2 remote client for natgate
//!
//! Implements the `RemoteClient` trait from `natgate-cloud` on top of
//! `aws-sdk-ec2`, so the reconciler can manage real NAT gateways.
//!
//! # Requirements
//!
//! - AWS credentials resolvable by the default provider chain
//!   (environment, shared config, SSO, instance profile, ...)
//!
//! # Example
//!
//! ```ignore
//! use natgate_cloud::{NatGatewayDescriptor, Reconciler};
//! use natgate_cloud_aws::Ec2RemoteClient;
//! use std::sync::Arc;
//!
//! let client = Ec2RemoteClient::from_env(Some("us-east-1".into())).await;
//! let reconciler = Reconciler::new(Arc::new(client));
//!
//! let state = reconciler
//!     .create(&NatGatewayDescriptor::new("subnet-0123").with_allocation_id("eipalloc-0456"))
//!     .await?;
//! println!("{} is {}", state.id, state.state);
//! ```

pub mod client;
pub mod convert;
pub mod error;

pub use client::Ec2RemoteClient;
pub use error::{from_sdk_error, is_transient_code};
