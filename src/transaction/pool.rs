use std::collections::{HashSet, VecDeque};
use std::ops::RangeInclusive;

use log::debug;
use rand::Rng;

use super::model::{MINT_SENDER, Transaction, ValidTransaction};

/// Pending transactions, consumed in arrival order.
#[derive(Debug)]
pub struct TransactionPool {
    queue: VecDeque<Transaction>,
    ids: HashSet<String>,
    size_range: RangeInclusive<u32>,
}

impl TransactionPool {
    pub fn new(size_range: RangeInclusive<u32>) -> Self {
        Self {
            queue: VecDeque::new(),
            ids: HashSet::new(),
            size_range,
        }
    }

    /// Assign an id and a simulated size, then queue the transaction.
    pub fn submit(&mut self, tx: ValidTransaction) -> &Transaction {
        let size = self.sample_size();
        self.push(Transaction::new(tx.sender, tx.recipient, tx.amount, size))
    }

    /// Queue the reward for a round winner.
    pub fn credit_reward(&mut self, recipient: &str, amount: u64) -> &Transaction {
        let size = self.sample_size();
        self.push(Transaction::new(
            MINT_SENDER.to_string(),
            recipient.to_string(),
            amount,
            size,
        ))
    }

    /// Queue an already-built transaction. Duplicate ids are ignored.
    pub fn push(&mut self, tx: Transaction) -> &Transaction {
        if self.ids.insert(tx.id.clone()) {
            self.queue.push_back(tx);
            self.queue.back().expect("just pushed")
        } else {
            self.queue
                .iter()
                .find(|t| t.id == tx.id)
                .expect("id index out of sync with queue")
        }
    }

    /// Take the longest arrival-order prefix whose total size fits in
    /// `max_block_size`. Returns `None` and leaves the pool untouched when
    /// the pool is empty or its head alone exceeds the budget.
    pub fn compose(&mut self, max_block_size: u32) -> Option<Vec<Transaction>> {
        let mut running: u64 = 0;
        let mut take = 0;
        for tx in &self.queue {
            if running + u64::from(tx.size) > u64::from(max_block_size) {
                break;
            }
            running += u64::from(tx.size);
            take += 1;
        }

        if take == 0 {
            if let Some(head) = self.queue.front() {
                debug!(
                    "POOL - head tx {} (size={}) exceeds block budget {}",
                    head.id, head.size, max_block_size
                );
            }
            return None;
        }

        let picked: Vec<Transaction> = self.queue.drain(..take).collect();
        for tx in &picked {
            self.ids.remove(&tx.id);
        }
        debug!(
            "POOL - composed {} txs (size={}/{}), {} left pending",
            picked.len(),
            running,
            max_block_size,
            self.queue.len()
        );
        Some(picked)
    }

    /// Put transactions back at the front of the queue, keeping their order.
    pub fn restore(&mut self, txs: Vec<Transaction>) {
        for tx in txs.into_iter().rev() {
            if self.ids.insert(tx.id.clone()) {
                self.queue.push_front(tx);
            }
        }
    }

    /// Drop every queued transaction whose id is in `included`. Returns how
    /// many were removed.
    pub fn discard_included(&mut self, included: &HashSet<String>) -> usize {
        let before = self.queue.len();
        self.queue.retain(|tx| !included.contains(&tx.id));
        self.ids.retain(|id| !included.contains(id));
        before - self.queue.len()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.queue.iter()
    }

    fn sample_size(&self) -> u32 {
        rand::thread_rng().gen_range(self.size_range.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(size: u32) -> Transaction {
        Transaction::new("alice".into(), "bob".into(), 1, size)
    }

    fn pool_with(sizes: &[u32]) -> TransactionPool {
        let mut pool = TransactionPool::new(10..=100);
        for &size in sizes {
            pool.push(tx(size));
        }
        pool
    }

    fn ids(pool: &TransactionPool) -> Vec<String> {
        pool.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn submit_assigns_size_in_range() {
        let mut pool = TransactionPool::new(10..=100);
        for _ in 0..50 {
            let tx = pool.submit(ValidTransaction {
                sender: "a".into(),
                recipient: "b".into(),
                amount: 3,
            });
            assert!((10..=100).contains(&tx.size));
        }
        assert_eq!(pool.len(), 50);
    }

    #[test]
    fn composes_prefix_within_budget() {
        let mut pool = pool_with(&[40, 40, 40]);
        let third = pool.iter().nth(2).unwrap().id.clone();

        let block = pool.compose(100).unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(block.iter().map(|t| t.size).sum::<u32>(), 80);
        assert_eq!(ids(&pool), vec![third]);
    }

    #[test]
    fn stops_at_first_overflow_without_skipping() {
        // 30 would fit after 60 but is behind a transaction that does not
        let mut pool = pool_with(&[60, 50, 30]);
        let block = pool.compose(100).unwrap();
        assert_eq!(block.iter().map(|t| t.size).collect::<Vec<_>>(), vec![60]);
        assert_eq!(pool.len(), 2);

        // no further head transaction fits in what is left of the budget
        let used: u32 = block.iter().map(|t| t.size).sum();
        assert!(used + pool.iter().next().unwrap().size > 100);
    }

    #[test]
    fn oversized_head_leaves_pool_unchanged() {
        let mut pool = pool_with(&[150, 20, 20]);
        let before = ids(&pool);
        assert!(pool.compose(100).is_none());
        assert_eq!(ids(&pool), before);
    }

    #[test]
    fn empty_pool_composes_nothing() {
        let mut pool = TransactionPool::new(10..=100);
        assert!(pool.compose(100).is_none());
    }

    #[test]
    fn drains_whole_pool_when_everything_fits() {
        let mut pool = pool_with(&[10, 20]);
        assert_eq!(pool.compose(100).unwrap().len(), 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn restore_puts_transactions_back_in_front() {
        let mut pool = pool_with(&[40, 40, 40]);
        let before = ids(&pool);
        let block = pool.compose(100).unwrap();
        pool.restore(block);
        assert_eq!(ids(&pool), before);
    }

    #[test]
    fn reward_comes_from_mint() {
        let mut pool = TransactionPool::new(10..=100);
        let reward = pool.credit_reward("worker-1", 1).clone();
        assert_eq!(reward.sender, MINT_SENDER);
        assert_eq!(reward.recipient, "worker-1");
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn discards_transactions_already_in_a_block() {
        let mut pool = pool_with(&[10, 20, 30]);
        let first = pool.iter().next().unwrap().clone();
        let all = ids(&pool);
        let included: HashSet<String> = [all[0].clone(), all[2].clone(), "other".into()].into();

        assert_eq!(pool.discard_included(&included), 2);
        assert_eq!(ids(&pool), vec![all[1].clone()]);

        // the id index forgets discarded entries too
        pool.restore(vec![first]);
        assert_eq!(ids(&pool), vec![all[0].clone(), all[1].clone()]);
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut pool = TransactionPool::new(10..=100);
        let t = tx(10);
        pool.push(t.clone());
        pool.push(t);
        assert_eq!(pool.len(), 1);
    }
}
