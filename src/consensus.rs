use std::collections::HashSet;

use futures_util::future::join_all;
use log::{debug, info, warn};

use crate::blockchain::validator::is_valid_chain;
use crate::blockchain::{Block, Difficulty};
use crate::error::Result;
use crate::network::NodeClient;
use crate::node::Node;

/// Outcome of a consensus pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub chain: Vec<Block>,
    pub replaced: bool,
}

/// Ask every peer for its chain and return the longest valid one that is
/// strictly longer than `local_len`, with the first peer in `peers` order
/// winning ties. Unreachable peers are skipped.
pub async fn longest_valid_chain<C: NodeClient>(
    client: &C,
    peers: &[String],
    local_len: usize,
    difficulty: Difficulty,
) -> Option<(String, Vec<Block>)> {
    let responses = join_all(peers.iter().map(|p| client.fetch_chain(p))).await;

    let mut max_length = local_len;
    let mut best = None;
    for (peer, response) in peers.iter().zip(responses) {
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("CONSENSUS - skipping {peer}: {e}");
                continue;
            }
        };
        if response.length != response.chain.len() {
            warn!(
                "CONSENSUS - {peer} reported length {} for a chain of {} blocks",
                response.length,
                response.chain.len()
            );
            continue;
        }
        if response.length <= max_length {
            debug!("CONSENSUS - {peer} has {} blocks, not longer", response.length);
            continue;
        }
        if !is_valid_chain(&response.chain, difficulty) {
            warn!("CONSENSUS - {peer} served an invalid chain of {} blocks", response.length);
            continue;
        }
        max_length = response.length;
        best = Some((peer.clone(), response.chain));
    }
    best
}

impl<C: NodeClient> Node<C> {
    /// Replace the local chain with the longest valid peer chain, if one is
    /// strictly longer. An open mining round is abandoned when that happens,
    /// since its candidate no longer extends the tail.
    pub async fn resolve_conflicts(&self) -> Result<Resolution> {
        let peers = self.peers();
        let (local_len, difficulty) = {
            let chain = self.chain.lock().expect("mutex poisoned");
            (chain.len(), chain.difficulty())
        };

        let candidate = longest_valid_chain(&*self.client, &peers, local_len, difficulty).await;

        let adopted = match candidate {
            Some((peer, blocks)) => {
                let included: HashSet<String> = blocks
                    .iter()
                    .flat_map(|b| b.transactions.iter().map(|t| t.id.clone()))
                    .collect();
                let mut chain = self.chain.lock().expect("mutex poisoned");
                if blocks.len() > chain.len() {
                    info!(
                        "CONSENSUS - adopting chain of {} blocks from {} (was {})",
                        blocks.len(),
                        peer,
                        chain.len()
                    );
                    chain.replace(blocks)?;
                    Some(included)
                } else {
                    debug!("CONSENSUS - local chain grew past {peer}'s while fetching");
                    None
                }
            }
            None => None,
        };

        let replaced = adopted.is_some();
        if let Some(included) = adopted {
            self.abandon_open_round("chain replaced by consensus").await;
            let mut pool = self.pool.lock().expect("mutex poisoned");
            let dropped = pool.discard_included(&included);
            if dropped > 0 {
                info!(
                    "CONSENSUS - dropped {} pending txs already in the adopted chain, {} left",
                    dropped,
                    pool.len()
                );
            }
        }

        Ok(Resolution {
            chain: self.chain_snapshot(),
            replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::validator::tests::valid_chain;
    use crate::network::client::mock::MockClient;
    use crate::node::tests::test_node;
    use crate::transaction::Transaction;

    fn node_with(local: Vec<Block>, client: MockClient, peers: &[&str]) -> std::sync::Arc<Node<MockClient>> {
        let node = test_node(client);
        if local.len() > 1 {
            node.chain.lock().unwrap().replace(local).unwrap();
        }
        let peers: Vec<String> = peers.iter().map(|p| p.to_string()).collect();
        node.register_nodes(&peers).unwrap();
        node
    }

    #[tokio::test]
    async fn adopts_longest_valid_chain() {
        let five = valid_chain(5);
        let client = MockClient::default()
            .with_chain("10.0.0.1:5000", five.clone())
            .with_chain("10.0.0.2:5000", valid_chain(4));
        let node = node_with(valid_chain(3), client, &["10.0.0.1:5000", "10.0.0.2:5000"]);

        let res = node.resolve_conflicts().await.unwrap();
        assert!(res.replaced);
        assert_eq!(res.chain, five);
        assert_eq!(node.chain_snapshot(), five);
    }

    #[tokio::test]
    async fn ties_and_shorter_chains_leave_local_alone() {
        let local = valid_chain(3);
        let client = MockClient::default()
            .with_chain("10.0.0.1:5000", valid_chain(3))
            .with_chain("10.0.0.2:5000", valid_chain(2));
        let node = node_with(local.clone(), client, &["10.0.0.1:5000", "10.0.0.2:5000"]);

        let res = node.resolve_conflicts().await.unwrap();
        assert!(!res.replaced);
        assert_eq!(res.chain, local);
    }

    #[tokio::test]
    async fn unreachable_and_invalid_peers_are_skipped() {
        let mut forged = valid_chain(6);
        forged[3].previous_hash = "ab".repeat(32);
        let four = valid_chain(4);
        let client = MockClient::default()
            .with_chain("10.0.0.2:5000", forged)
            .with_chain("10.0.0.3:5000", four.clone());
        let node = node_with(
            valid_chain(2),
            client,
            &["10.0.0.1:5000", "10.0.0.2:5000", "10.0.0.3:5000"],
        );

        let res = node.resolve_conflicts().await.unwrap();
        assert!(res.replaced);
        assert_eq!(res.chain, four);
    }

    #[tokio::test]
    async fn first_observed_wins_among_equal_lengths() {
        let first = valid_chain(4);
        let client = MockClient::default()
            .with_chain("10.0.0.1:5000", first.clone())
            .with_chain("10.0.0.2:5000", valid_chain(4));
        let peers = vec!["10.0.0.1:5000".to_string(), "10.0.0.2:5000".to_string()];

        let (peer, chain) = longest_valid_chain(&client, &peers, 1, Difficulty::leading_zeros(2))
            .await
            .unwrap();
        assert_eq!(peer, "10.0.0.1:5000");
        assert_eq!(chain, first);
    }

    #[tokio::test]
    async fn adopted_transactions_leave_the_pool() {
        let peer_chain = valid_chain(3);
        let client = MockClient::default().with_chain("10.0.0.1:5000", peer_chain.clone());
        let node = node_with(valid_chain(1), client, &["10.0.0.1:5000"]);
        node.register_miners(&["10.0.0.9:6000".to_string()]).unwrap();

        let unrelated = Transaction::new("carol".into(), "dave".into(), 4, 10);
        {
            let mut pool = node.pool.lock().unwrap();
            for tx in &peer_chain[1].transactions {
                pool.push(tx.clone());
            }
            pool.push(unrelated.clone());
            pool.push(peer_chain[2].transactions[0].clone());
        }
        // the open round holds all four; abandoning it must not requeue the adopted ones
        assert_eq!(node.start_round().await.unwrap().transactions, 4);

        let res = node.resolve_conflicts().await.unwrap();
        assert!(res.replaced);
        assert_eq!(node.pending_transactions(), vec![unrelated]);
        assert_eq!(node.client.stopped(), vec!["10.0.0.9:6000".to_string()]);
    }

    #[tokio::test]
    async fn no_peers_means_no_change() {
        let node = node_with(valid_chain(1), MockClient::default(), &[]);
        let res = node.resolve_conflicts().await.unwrap();
        assert!(!res.replaced);
        assert_eq!(res.chain.len(), 1);
    }
}
