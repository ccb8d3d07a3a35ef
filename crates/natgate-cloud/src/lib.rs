//! natgate lifecycle controller
//!
//! This crate reconciles a declared NAT gateway against an
//! eventually-consistent control plane: it issues the remote mutations and
//! then polls until the gateway reaches a terminal state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  natgate CLI                     │
//! │         (plan / apply / destroy, state)          │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                natgate-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  Reconciler (create/read/update/delete)  │   │
//! │  └──────┬───────────────────────┬───────────┘   │
//! │  ┌──────▼───────┐  ┌────────────▼───┐           │
//! │  │    Waiter    │──│  StateProber   │           │
//! │  └──────────────┘  └────────────────┘           │
//! │  ┌──────────────┐  ┌────────────────┐           │
//! │  │   TagDiff    │  │   State Mgmt   │           │
//! │  └──────────────┘  └────────────────┘           │
//! └─────────────────┬───────────────────────────────┘
//!                   │ trait RemoteClient
//!           ┌───────▼────────┐
//!           │ natgate-cloud- │
//!           │   aws (EC2)    │
//!           └────────────────┘
//! ```

pub mod action;
pub mod client;
pub mod error;
pub mod model;
pub mod prober;
pub mod reconciler;
pub mod state;
pub mod tags;
pub mod waiter;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary, plan_gateway};
pub use client::RemoteClient;
pub use error::{CloudError, NOT_FOUND_CODES, RemoteError, Result};
pub use model::{
    ConnectivityType, CreateNatGatewayRequest, GatewayAddress, GatewayState, NatGateway,
    NatGatewayDescriptor, ReconciledState, Tags,
};
pub use prober::{Absence, NatGatewayProber, Probe, StateProber};
pub use reconciler::Reconciler;
pub use state::{ResourceStatus, StateFile, StateLock, StateManager, TrackedGateway};
pub use tags::{IgnoreTags, TagConfig, TagDiff, apply_tag_diff};
pub use waiter::{CancelSignal, Classification, WaitOutcome, WaitPolicy, WaitTarget, Waiter};
