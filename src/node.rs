use std::sync::{Arc, Mutex};

use log::{debug, warn};
use rand::Rng;

use crate::blockchain::{Block, Blockchain, Difficulty};
use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::mining::manager::RoundSlot;
use crate::mining::worker::WorkerSlot;
use crate::network::{NodeClient, PeerRegistry, normalize_address};
use crate::transaction::{NewTransaction, Transaction, TransactionPool, ValidTransaction};

/// All state owned by one node. Each resource has its own lock; when more
/// than one is needed they are taken in the order round, chain, pool.
pub struct Node<C: NodeClient> {
    pub config: NodeConfig,
    pub chain: Mutex<Blockchain>,
    pub pool: Mutex<TransactionPool>,
    pub registry: Mutex<PeerRegistry>,
    pub(crate) round: Mutex<RoundSlot>,
    pub(crate) worker: Mutex<WorkerSlot>,
    pub client: Arc<C>,
}

impl<C: NodeClient> Node<C> {
    pub fn new(config: NodeConfig, client: C) -> Self {
        let mut registry = PeerRegistry::new();
        for peer in &config.peers {
            if let Err(e) = registry.register_node(peer) {
                warn!("ignoring configured peer {peer:?}: {e}");
            }
        }
        for miner in &config.miners {
            if let Err(e) = registry.register_miner(miner) {
                warn!("ignoring configured miner {miner:?}: {e}");
            }
        }

        Self {
            chain: Mutex::new(Blockchain::new(Difficulty::leading_zeros(config.difficulty))),
            pool: Mutex::new(TransactionPool::new(config.tx_size.clone())),
            registry: Mutex::new(registry),
            round: Mutex::new(RoundSlot::default()),
            worker: Mutex::new(WorkerSlot::default()),
            client: Arc::new(client),
            config,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.chain.lock().expect("mutex poisoned").difficulty()
    }

    /// Queue a client transaction; returns the advisory index of the block
    /// expected to carry it.
    pub fn submit_transaction(&self, tx: NewTransaction) -> Result<(Transaction, u64)> {
        let tx = tx.validate()?;
        let target = {
            let chain = self.chain.lock().expect("mutex poisoned");
            chain.len() as u64 + 1
        };
        let queued = {
            let mut pool = self.pool.lock().expect("mutex poisoned");
            pool.submit(tx).clone()
        };
        debug!(
            "POOL - queued tx {} (size={}) for block #{}",
            queued.id, queued.size, target
        );
        Ok((queued, target))
    }

    /// Fill the pool with `count` random transfers between numbered accounts.
    pub fn generate_transactions(&self, count: usize) -> Result<usize> {
        if count > self.config.max_generate {
            return Err(NodeError::validation(format!(
                "cannot generate {count} transactions, the limit is {}",
                self.config.max_generate
            )));
        }
        let mut rng = rand::thread_rng();
        let batch: Vec<ValidTransaction> = (0..count)
            .map(|_| {
                let sender = rng.gen_range(1..=100u32);
                let mut recipient = rng.gen_range(1..=100u32);
                while recipient == sender {
                    recipient = rng.gen_range(1..=100u32);
                }
                ValidTransaction {
                    sender: sender.to_string(),
                    recipient: recipient.to_string(),
                    amount: rng.gen_range(1..=1000),
                }
            })
            .collect();

        let mut pool = self.pool.lock().expect("mutex poisoned");
        for tx in batch {
            pool.submit(tx);
        }
        Ok(count)
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        let pool = self.pool.lock().expect("mutex poisoned");
        pool.iter().cloned().collect()
    }

    pub fn chain_snapshot(&self) -> Vec<Block> {
        let chain = self.chain.lock().expect("mutex poisoned");
        chain.blocks().to_vec()
    }

    /// Register peer addresses, skipping this node's own address.
    pub fn register_nodes(&self, addresses: &[String]) -> Result<Vec<String>> {
        let own = normalize_address(&self.config.address)?;
        let mut registry = self.registry.lock().expect("mutex poisoned");
        for address in addresses {
            if normalize_address(address)? == own {
                continue;
            }
            registry.register_node(address)?;
        }
        Ok(registry.nodes())
    }

    pub fn register_miners(&self, addresses: &[String]) -> Result<Vec<String>> {
        let mut registry = self.registry.lock().expect("mutex poisoned");
        for address in addresses {
            registry.register_miner(address)?;
        }
        Ok(registry.miners())
    }

    pub fn peers(&self) -> Vec<String> {
        self.registry.lock().expect("mutex poisoned").nodes()
    }

    pub fn miners(&self) -> Vec<String> {
        self.registry.lock().expect("mutex poisoned").miners()
    }
}
