//! Scripted in-memory Remote Client for tests
//!
//! Responses are queued per call type. When a describe queue runs dry the
//! last response repeats, which makes "always pending" probes a one-liner.

use crate::client::RemoteClient;
use crate::error::{RemoteError, Result};
use crate::model::{CreateNatGatewayRequest, NatGateway, Tags};
use async_trait::async_trait;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

type DescribeResponse = std::result::Result<Vec<NatGateway>, RemoteError>;

#[derive(Debug, Default)]
struct Script {
    create: VecDeque<std::result::Result<String, RemoteError>>,
    describe: VecDeque<DescribeResponse>,
    last_describe: Option<DescribeResponse>,
    tag: VecDeque<std::result::Result<(), RemoteError>>,
    delete: VecDeque<std::result::Result<(), RemoteError>>,
}

#[derive(Debug, Default)]
struct Calls {
    create: Vec<CreateNatGatewayRequest>,
    describe: usize,
    tag: Vec<(String, Tags)>,
    untag: Vec<(String, BTreeSet<String>)>,
    delete: Vec<String>,
}

/// Remote Client that replays queued responses and records every call
#[derive(Debug, Default)]
pub struct MockRemoteClient {
    script: Mutex<Script>,
    calls: Mutex<Calls>,
}

impl MockRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_create(&self, response: std::result::Result<String, RemoteError>) {
        self.script.lock().unwrap().create.push_back(response);
    }

    pub fn push_describe(&self, response: DescribeResponse) {
        self.script.lock().unwrap().describe.push_back(response);
    }

    /// Queue one describe response per gateway, in order
    pub fn push_states(&self, gateways: impl IntoIterator<Item = NatGateway>) {
        for gw in gateways {
            self.push_describe(Ok(vec![gw]));
        }
    }

    pub fn push_tag(&self, response: std::result::Result<(), RemoteError>) {
        self.script.lock().unwrap().tag.push_back(response);
    }

    pub fn push_delete(&self, response: std::result::Result<(), RemoteError>) {
        self.script.lock().unwrap().delete.push_back(response);
    }

    pub fn create_requests(&self) -> Vec<CreateNatGatewayRequest> {
        self.calls.lock().unwrap().create.clone()
    }

    pub fn describe_calls(&self) -> usize {
        self.calls.lock().unwrap().describe
    }

    pub fn tag_calls(&self) -> Vec<(String, Tags)> {
        self.calls.lock().unwrap().tag.clone()
    }

    pub fn untag_calls(&self) -> Vec<(String, BTreeSet<String>)> {
        self.calls.lock().unwrap().untag.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().delete.clone()
    }
}

#[async_trait]
impl RemoteClient for MockRemoteClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_nat_gateway(&self, request: &CreateNatGatewayRequest) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.create.push(request.clone());
        let fallback = format!("nat-{}", calls.create.len());
        drop(calls);

        match self.script.lock().unwrap().create.pop_front() {
            Some(response) => response.map_err(Into::into),
            None => Ok(fallback),
        }
    }

    async fn describe_nat_gateways(&self, _ids: &[String]) -> Result<Vec<NatGateway>> {
        self.calls.lock().unwrap().describe += 1;

        let mut script = self.script.lock().unwrap();
        let response = match script.describe.pop_front() {
            Some(response) => {
                script.last_describe = Some(response.clone());
                response
            }
            None => script.last_describe.clone().unwrap_or_else(|| Ok(Vec::new())),
        };
        response.map_err(Into::into)
    }

    async fn tag_object(&self, id: &str, tags: &Tags) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .tag
            .push((id.to_string(), tags.clone()));
        self.script
            .lock()
            .unwrap()
            .tag
            .pop_front()
            .unwrap_or(Ok(()))
            .map_err(Into::into)
    }

    async fn untag_object(&self, id: &str, keys: &BTreeSet<String>) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .untag
            .push((id.to_string(), keys.clone()));
        Ok(())
    }

    async fn delete_nat_gateway(&self, id: &str) -> Result<()> {
        self.calls.lock().unwrap().delete.push(id.to_string());
        self.script
            .lock()
            .unwrap()
            .delete
            .pop_front()
            .unwrap_or(Ok(()))
            .map_err(Into::into)
    }
}
