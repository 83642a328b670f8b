//! Manager side of a mining round.
//!
//! A round moves `Idle -> Dispatched -> Settled`. Dispatch composes a
//! candidate from the pool and ships it to every registered worker; the
//! first valid report appends the block and settles the round, every later
//! report for it is stale. A settled round allows the next dispatch. An
//! abandoned round (timeout, nobody accepted, chain replaced) goes back to
//! `Idle` with its transactions returned to the front of the pool.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;

use super::{MiningJob, WorkerRef};
use crate::blockchain::Block;
use crate::blockchain::validator::validate_successor;
use crate::error::{NodeError, Result};
use crate::network::{NodeClient, normalize_address};
use crate::node::Node;
use crate::transaction::Transaction;

#[derive(Debug, Default)]
pub(crate) enum RoundState {
    #[default]
    Idle,
    Dispatched(Round),
    Settled {
        id: u64,
        winner: String,
    },
}

#[derive(Debug)]
pub(crate) struct Round {
    id: u64,
    transactions: Vec<Transaction>,
    workers: Vec<String>,
    started_at: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct RoundSlot {
    state: RoundState,
    last_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round: u64,
    pub transactions: usize,
    pub workers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettledBlock {
    pub round: u64,
    pub index: u64,
    pub hash: String,
    pub winner: String,
}

impl<C: NodeClient> Node<C> {
    /// Compose a candidate block and send it to every registered worker.
    pub async fn start_round(self: &Arc<Self>) -> Result<RoundSummary> {
        let miners = self.miners();
        if miners.is_empty() {
            return Err(NodeError::validation("no miner workers registered"));
        }

        let (id, job) = {
            let mut slot = self.round.lock().expect("mutex poisoned");
            if let RoundState::Dispatched(open) = &slot.state {
                return Err(NodeError::RoundInProgress(open.id));
            }
            let last_block = self.chain.lock().expect("mutex poisoned").last_block().clone();
            let transactions = {
                let mut pool = self.pool.lock().expect("mutex poisoned");
                if pool.is_empty() {
                    return Err(NodeError::validation("no pending transactions"));
                }
                pool.compose(self.config.max_block_size).ok_or_else(|| {
                    NodeError::validation("pending head transaction exceeds the block budget")
                })?
            };

            slot.last_id += 1;
            let id = slot.last_id;
            slot.state = RoundState::Dispatched(Round {
                id,
                transactions: transactions.clone(),
                workers: miners.clone(),
                started_at: Instant::now(),
            });
            (id, MiningJob {
                transactions,
                last_block,
            })
        };
        info!(
            "MANAGER - round {} dispatching block #{} ({} txs) to {} workers",
            id,
            job.last_block.index + 1,
            job.transactions.len(),
            miners.len()
        );

        let results = join_all(miners.iter().map(|w| self.client.dispatch(w, &job))).await;
        let mut accepted = Vec::new();
        let mut first_error = None;
        for (worker, result) in miners.iter().zip(results) {
            match result {
                Ok(()) => accepted.push(worker.clone()),
                Err(e) => {
                    warn!("MANAGER - dispatch to {worker} failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        if accepted.is_empty() {
            self.abandon_round(id, "no worker accepted the dispatch").await;
            return Err(first_error
                .unwrap_or_else(|| NodeError::validation("no worker accepted the dispatch")));
        }

        if let Some(timeout) = self.config.round_timeout {
            let node = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                node.abandon_round(id, "round timed out").await;
            });
        }

        Ok(RoundSummary {
            round: id,
            transactions: job.transactions.len(),
            workers: accepted,
        })
    }

    /// Accept the first valid solution of the open round.
    pub async fn submit_solution(&self, block: Block, worker: &WorkerRef) -> Result<SettledBlock> {
        let reporter = normalize_address(&worker.node)?;

        let (settled, workers) = {
            let mut guard = self.round.lock().expect("mutex poisoned");
            let slot = &mut *guard;
            let round = match &slot.state {
                RoundState::Dispatched(round) => round,
                RoundState::Settled { id, winner } => {
                    warn!("MANAGER - stale report from {reporter}: round {id} won by {winner}");
                    return Err(NodeError::StaleSubmission {
                        worker: reporter,
                        reason: format!("round {id} already settled by {winner}"),
                    });
                }
                RoundState::Idle => {
                    warn!("MANAGER - stale report from {reporter}: no open round");
                    return Err(NodeError::StaleSubmission {
                        worker: reporter,
                        reason: "no mining round is open".into(),
                    });
                }
            };

            // a block at or below the tail belongs to a round that already settled
            let tail = self.chain.lock().expect("mutex poisoned").last_block().index;
            if block.index <= tail {
                warn!(
                    "MANAGER - stale report from {reporter}: block #{} but tail is #{tail}",
                    block.index
                );
                return Err(NodeError::StaleSubmission {
                    worker: reporter,
                    reason: format!("block #{} is already settled", block.index),
                });
            }

            if !round.workers.contains(&reporter) {
                return Err(NodeError::validation(format!(
                    "{reporter} was not dispatched in round {}",
                    round.id
                )));
            }
            if block.transactions != round.transactions {
                return Err(NodeError::validation(format!(
                    "block #{} does not carry the transactions of round {}",
                    block.index, round.id
                )));
            }

            let hash = {
                let mut chain = self.chain.lock().expect("mutex poisoned");
                validate_successor(chain.last_block(), &block, chain.difficulty())?;
                chain.append(block.clone())?.hash()
            };

            let id = round.id;
            let elapsed = round.started_at.elapsed();
            let previous = std::mem::replace(
                &mut slot.state,
                RoundState::Settled {
                    id,
                    winner: reporter.clone(),
                },
            );
            let workers = match previous {
                RoundState::Dispatched(round) => round.workers,
                _ => Vec::new(),
            };
            info!(
                "MANAGER - round {} settled by {} in {} ms: block #{} hash={}",
                id,
                reporter,
                elapsed.as_millis(),
                block.index,
                hash
            );
            (
                SettledBlock {
                    round: id,
                    index: block.index,
                    hash,
                    winner: reporter.clone(),
                },
                workers,
            )
        };

        let recipient = if block.miner_id.is_empty() {
            reporter.as_str()
        } else {
            block.miner_id.as_str()
        };
        {
            let mut pool = self.pool.lock().expect("mutex poisoned");
            let reward = pool.credit_reward(recipient, self.config.mining_reward);
            debug!("MANAGER - credited reward tx {} to {}", reward.id, recipient);
        }

        let losers: Vec<&String> = workers.iter().filter(|w| **w != reporter).collect();
        self.broadcast_stop(&losers).await;
        Ok(settled)
    }

    /// Close round `id` without a block. Returns `false` if that round is
    /// not the open one.
    pub async fn abandon_round(&self, id: u64, reason: &str) -> bool {
        let round = {
            let mut slot = self.round.lock().expect("mutex poisoned");
            match std::mem::take(&mut slot.state) {
                RoundState::Dispatched(round) if round.id == id => round,
                other => {
                    slot.state = other;
                    return false;
                }
            }
        };
        warn!(
            "MANAGER - round {} abandoned ({}), returning {} txs to the pool",
            id,
            reason,
            round.transactions.len()
        );
        self.pool
            .lock()
            .expect("mutex poisoned")
            .restore(round.transactions);

        let workers: Vec<&String> = round.workers.iter().collect();
        self.broadcast_stop(&workers).await;
        true
    }

    /// Abandon whatever round is open, if any.
    pub async fn abandon_open_round(&self, reason: &str) -> bool {
        let open = match &self.round.lock().expect("mutex poisoned").state {
            RoundState::Dispatched(round) => Some(round.id),
            _ => None,
        };
        match open {
            Some(id) => self.abandon_round(id, reason).await,
            None => false,
        }
    }

    async fn broadcast_stop(&self, workers: &[&String]) {
        let results = join_all(workers.iter().map(|w| self.client.stop(w))).await;
        for (worker, result) in workers.iter().zip(results) {
            if let Err(e) = result {
                warn!("MANAGER - stop to {worker} failed: {e}");
            }
        }
    }
}
