use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::api::models::{ChainResponse, RegisterNodesRequest};
use crate::blockchain::Block;
use crate::error::{NodeError, Result};
use crate::mining::{MiningJob, WorkerRef};

/// Everything a node asks of other nodes.
pub trait NodeClient: Send + Sync + 'static {
    /// Fetch a peer's full chain.
    fn fetch_chain(&self, peer: &str) -> impl Future<Output = Result<ChainResponse>> + Send;

    /// Hand a candidate block to a worker. A worker that is already solving
    /// answers with [`NodeError::WorkerBusy`].
    fn dispatch(&self, worker: &str, job: &MiningJob) -> impl Future<Output = Result<()>> + Send;

    fn stop(&self, worker: &str) -> impl Future<Output = Result<()>> + Send;

    /// Report a solved block to the manager.
    fn report(
        &self,
        manager: &str,
        block: &Block,
        worker: &WorkerRef,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Push a peer list to another node's registry.
    fn share_peers(&self, peer: &str, nodes: &[String]) -> impl Future<Output = Result<()>> + Send;
}

/// [`NodeClient`] over the JSON/HTTP route layer of other nodes.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Config(format!("http client: {e}")))?;
        Ok(Self { http })
    }

    async fn post<T: Serialize + ?Sized>(&self, addr: &str, path: &str, body: &T) -> Result<StatusCode> {
        let resp = self
            .http
            .post(endpoint(addr, path))
            .json(body)
            .send()
            .await
            .map_err(|e| NodeError::unreachable(addr, e))?;
        Ok(resp.status())
    }
}

fn endpoint(addr: &str, path: &str) -> String {
    format!("http://{addr}/api/v1{path}")
}

fn expect_success(addr: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(NodeError::unreachable(addr, format!("status {status}")))
    }
}

impl NodeClient for HttpClient {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse> {
        let resp = self
            .http
            .get(endpoint(peer, "/chain/"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| NodeError::unreachable(peer, e))?;
        resp.json::<ChainResponse>()
            .await
            .map_err(|e| NodeError::unreachable(peer, e))
    }

    async fn dispatch(&self, worker: &str, job: &MiningJob) -> Result<()> {
        match self.post(worker, "/mining/start/", job).await? {
            StatusCode::CONFLICT => Err(NodeError::WorkerBusy(worker.to_string())),
            status => expect_success(worker, status),
        }
    }

    async fn stop(&self, worker: &str) -> Result<()> {
        let status = self.post(worker, "/mining/stop/", &()).await?;
        expect_success(worker, status)
    }

    async fn report(&self, manager: &str, block: &Block, worker: &WorkerRef) -> Result<()> {
        match self.post(manager, "/mining/report/", &(block, worker)).await? {
            StatusCode::CONFLICT => Err(NodeError::StaleSubmission {
                worker: worker.node.clone(),
                reason: format!("manager {manager} rejected block #{}", block.index),
            }),
            StatusCode::BAD_REQUEST => Err(NodeError::validation(format!(
                "manager {manager} refused block #{}",
                block.index
            ))),
            status => expect_success(manager, status),
        }
    }

    async fn share_peers(&self, peer: &str, nodes: &[String]) -> Result<()> {
        let body = RegisterNodesRequest {
            nodes: Some(nodes.to_vec()),
        };
        let status = self.post(peer, "/nodes/register/", &body).await?;
        expect_success(peer, status)
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;

    /// Records outbound calls and serves canned peer chains.
    #[derive(Debug, Default)]
    pub struct MockClient {
        pub chains: Mutex<HashMap<String, Vec<Block>>>,
        pub busy: Mutex<HashSet<String>>,
        pub dispatched: Mutex<Vec<String>>,
        pub stopped: Mutex<Vec<String>>,
        pub reports: Mutex<Vec<(String, Block, WorkerRef)>>,
        pub shared: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl MockClient {
        pub fn with_chain(self, peer: &str, chain: Vec<Block>) -> Self {
            self.chains.lock().unwrap().insert(peer.to_string(), chain);
            self
        }

        pub fn with_busy(self, worker: &str) -> Self {
            self.busy.lock().unwrap().insert(worker.to_string());
            self
        }

        pub fn stopped(&self) -> Vec<String> {
            let mut out = self.stopped.lock().unwrap().clone();
            out.sort();
            out
        }
    }

    impl NodeClient for MockClient {
        async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse> {
            match self.chains.lock().unwrap().get(peer) {
                Some(chain) => Ok(ChainResponse {
                    length: chain.len(),
                    chain: chain.clone(),
                }),
                None => Err(NodeError::unreachable(peer, "connection refused")),
            }
        }

        async fn dispatch(&self, worker: &str, _job: &MiningJob) -> Result<()> {
            if self.busy.lock().unwrap().contains(worker) {
                return Err(NodeError::WorkerBusy(worker.to_string()));
            }
            self.dispatched.lock().unwrap().push(worker.to_string());
            Ok(())
        }

        async fn stop(&self, worker: &str) -> Result<()> {
            self.stopped.lock().unwrap().push(worker.to_string());
            Ok(())
        }

        async fn report(&self, manager: &str, block: &Block, worker: &WorkerRef) -> Result<()> {
            self.reports
                .lock()
                .unwrap()
                .push((manager.to_string(), block.clone(), worker.clone()));
            Ok(())
        }

        async fn share_peers(&self, peer: &str, nodes: &[String]) -> Result<()> {
            self.shared
                .lock()
                .unwrap()
                .push((peer.to_string(), nodes.to_vec()));
            Ok(())
        }
    }
}
