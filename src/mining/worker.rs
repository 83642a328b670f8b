//! Worker side of a mining round: `Ready -> Solving -> Reporting -> Ready`.
//! A stop from the manager sends the worker straight back to `Ready` and
//! cancels the search.

use std::sync::Arc;

use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{MiningJob, WorkerRef};
use crate::blockchain::pow::{self, PowOutcome};
use crate::blockchain::Block;
use crate::error::{NodeError, Result};
use crate::network::{NodeClient, normalize_address};
use crate::node::Node;

#[derive(Debug, Default)]
pub(crate) enum WorkerState {
    #[default]
    Ready,
    Solving {
        generation: u64,
        cancel: CancellationToken,
    },
    Reporting {
        generation: u64,
    },
}

/// Current state plus a counter that tells a finished search whether it
/// still owns the slot.
#[derive(Debug, Default)]
pub(crate) struct WorkerSlot {
    state: WorkerState,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Ready,
    Solving,
    Reporting,
}

impl<C: NodeClient> Node<C> {
    pub fn worker_status(&self) -> WorkerStatus {
        match self.worker.lock().expect("mutex poisoned").state {
            WorkerState::Ready => WorkerStatus::Ready,
            WorkerState::Solving { .. } => WorkerStatus::Solving,
            WorkerState::Reporting { .. } => WorkerStatus::Reporting,
        }
    }

    /// Start solving a dispatched candidate in the background.
    pub fn accept_job(self: &Arc<Self>, job: MiningJob) -> Result<()> {
        let manager = self
            .config
            .manager
            .as_deref()
            .ok_or_else(|| NodeError::validation("no manager configured for this worker"))?;
        let manager = normalize_address(manager)?;
        if job.transactions.is_empty() {
            return Err(NodeError::validation("mining job carries no transactions"));
        }

        let (generation, cancel) = {
            let mut slot = self.worker.lock().expect("mutex poisoned");
            if !matches!(slot.state, WorkerState::Ready) {
                return Err(NodeError::WorkerBusy(self.config.address.clone()));
            }
            slot.generation += 1;
            let cancel = CancellationToken::new();
            slot.state = WorkerState::Solving {
                generation: slot.generation,
                cancel: cancel.clone(),
            };
            (slot.generation, cancel)
        };
        info!(
            "MINER - solving block #{} with {} txs",
            job.last_block.index + 1,
            job.transactions.len()
        );

        let node = Arc::clone(self);
        tokio::spawn(async move { node.run_job(job, manager, generation, cancel).await });
        Ok(())
    }

    /// Abandon any search or report in progress. Returns `false` if the
    /// worker was already idle.
    pub fn stop_mining(&self) -> bool {
        let mut slot = self.worker.lock().expect("mutex poisoned");
        match std::mem::take(&mut slot.state) {
            WorkerState::Solving { cancel, .. } => {
                cancel.cancel();
                info!("MINER - search cancelled by manager");
                true
            }
            WorkerState::Reporting { .. } => true,
            WorkerState::Ready => false,
        }
    }

    async fn run_job(
        self: Arc<Self>,
        job: MiningJob,
        manager: String,
        generation: u64,
        cancel: CancellationToken,
    ) {
        let outcome = pow::solve(
            &job.last_block,
            self.difficulty(),
            self.config.poll_interval,
            cancel.clone(),
        )
        .await;
        let proof = match outcome {
            PowOutcome::Found(proof) => proof,
            PowOutcome::Cancelled => {
                debug!("MINER - search {generation} cancelled");
                return;
            }
        };
        if !self.simulated_delay(&cancel).await || !self.begin_report(generation) {
            debug!("MINER - proof {proof} dropped, search {generation} was stopped");
            return;
        }

        let block = Block::forge(&job.last_block, job.transactions, proof, &self.config.node_id);
        let me = WorkerRef {
            node: self.config.address.clone(),
        };
        match self.client.report(&manager, &block, &me).await {
            Ok(()) => info!(
                "MINER - reported block #{} (proof={}) to {}",
                block.index, proof, manager
            ),
            Err(e) => warn!("MINER - report of block #{} rejected: {}", block.index, e),
        }
        self.finish_report(generation);
    }

    /// Sleep between a quarter of and the full configured mining delay.
    /// `false` if cancelled meanwhile.
    async fn simulated_delay(&self, cancel: &CancellationToken) -> bool {
        let max = self.config.mining_delay.as_millis() as u64;
        if max == 0 {
            return !cancel.is_cancelled();
        }
        let pause = rand::thread_rng().gen_range(max / 4..=max);
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_millis(pause)) => true,
            _ = cancel.cancelled() => false,
        }
    }

    fn begin_report(&self, generation: u64) -> bool {
        let mut guard = self.worker.lock().expect("mutex poisoned");
        let slot = &mut *guard;
        match slot.state {
            WorkerState::Solving { generation: g, .. } if g == generation => {
                slot.state = WorkerState::Reporting { generation };
                true
            }
            _ => false,
        }
    }

    fn finish_report(&self, generation: u64) {
        let mut guard = self.worker.lock().expect("mutex poisoned");
        let slot = &mut *guard;
        if let WorkerState::Reporting { generation: g } = slot.state {
            if g == generation {
                slot.state = WorkerState::Ready;
            }
        }
    }
}
