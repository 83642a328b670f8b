use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::NodeClient;
use crate::node::Node;

/// Start the optional gossip and consensus loops. Both end when `token` is
/// cancelled.
pub fn spawn_background_tasks<C: NodeClient>(
    node: Arc<Node<C>>,
    token: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    if let Some(every) = node.config.gossip_interval {
        info!("SYNC - gossiping peer list every {}s", every.as_secs());
        let node = Arc::clone(&node);
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            while tick(every, &token).await {
                node.share_peer_list().await;
            }
            debug!("SYNC - gossip loop stopped");
        }));
    }
    if let Some(every) = node.config.resolve_interval {
        info!("SYNC - resolving consensus every {}s", every.as_secs());
        handles.push(tokio::spawn(async move {
            while tick(every, &token).await {
                if let Err(e) = node.resolve_conflicts().await {
                    warn!("SYNC - consensus pass failed: {e}");
                }
            }
            debug!("SYNC - consensus loop stopped");
        }));
    }
    handles
}

/// Wait one period; `false` once shutdown was requested.
async fn tick(every: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(every) => true,
    }
}

impl<C: NodeClient> Node<C> {
    /// Push the known peer list, plus this node's own address, to every
    /// peer. Returns how many peers accepted it.
    pub async fn share_peer_list(&self) -> usize {
        let peers = self.peers();
        if peers.is_empty() {
            return 0;
        }
        let mut list = peers.clone();
        list.push(self.config.address.clone());

        let results = join_all(peers.iter().map(|p| self.client.share_peers(p, &list))).await;
        let mut delivered = 0;
        for (peer, result) in peers.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => debug!("SYNC - could not share peers with {peer}: {e}"),
            }
        }
        delivered
    }
}
