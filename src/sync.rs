//! Chain synchronization for PebbleChain
//!
//! Implements longest-chain consensus: every known peer is asked for its
//! chain, each response is validated locally, and the local chain is
//! replaced wholesale only when a strictly longer valid chain was found.
//! Unreachable or invalid peers are skipped, never retried.

use crate::blockchain::{Block, Blockchain};
use crate::error::ChainError;
use crate::network::{PeerAddr, PeerRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// A peer's reported chain, the shape served by every node's chain
/// endpoint and consumed by its peers' coordinators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteChain {
    pub chain: Vec<Block>,
    pub length: usize,
}

/// Transport seam for fetching a peer's chain. Keeps the coordinator
/// testable and independent of any particular wire protocol.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn fetch_chain(&self, peer: &PeerAddr) -> Result<RemoteChain, ChainError>;
}

/// HTTP implementation of [`PeerClient`] with a bounded per-peer timeout,
/// so a slow or unreachable peer cannot stall reconciliation indefinitely.
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpPeerClient { client })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &PeerAddr) -> Result<RemoteChain, ChainError> {
        let url = format!("http://{}/chain", peer);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        Ok(response.json::<RemoteChain>().await?)
    }
}

/// Reconcile the local chain with the network.
///
/// Scans every known peer sequentially, keeping the single longest valid
/// candidate whose reported length strictly exceeds the longest seen so
/// far. After the scan the local chain is replaced atomically if such a
/// candidate exists. Returns whether a replacement happened. Equal-length
/// chains never trigger replacement; a peer that errors, reports a
/// non-success status or serves an invalid chain is simply skipped.
pub async fn reach_consensus(
    blockchain: &mut Blockchain,
    peers: &PeerRegistry,
    client: &dyn PeerClient,
) -> bool {
    let mut longest_length = blockchain.chain.len();
    let mut longer_chain: Option<Vec<Block>> = None;

    for peer in peers.peers() {
        let remote = match client.fetch_chain(peer).await {
            Ok(remote) => remote,
            Err(e) => {
                debug!(peer = %peer, error = %e, "Skipping unreachable peer");
                continue;
            }
        };

        if remote.length > longest_length && Blockchain::valid_chain(&remote.chain) {
            debug!(peer = %peer, length = remote.length, "Found longer valid candidate chain");
            longest_length = remote.length;
            longer_chain = Some(remote.chain);
        } else {
            debug!(peer = %peer, length = remote.length, "Peer chain not adopted");
        }
    }

    match longer_chain {
        Some(chain) => {
            info!(
                old_length = blockchain.chain.len(),
                new_length = longest_length,
                "Replacing local chain with longer valid peer chain"
            );
            blockchain.replace_chain(chain);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mempool::Mempool;
    use crate::miner::proof_of_work;
    use std::collections::HashMap;

    /// Canned-response peer client for exercising the coordinator without
    /// a network.
    struct MockPeerClient {
        responses: HashMap<String, RemoteChain>,
    }

    impl MockPeerClient {
        fn new() -> Self {
            MockPeerClient {
                responses: HashMap::new(),
            }
        }

        fn serve(&mut self, peer: &PeerAddr, chain: Vec<Block>) {
            let length = chain.len();
            self.responses
                .insert(peer.to_string(), RemoteChain { chain, length });
        }
    }

    #[async_trait]
    impl PeerClient for MockPeerClient {
        async fn fetch_chain(&self, peer: &PeerAddr) -> Result<RemoteChain, ChainError> {
            self.responses
                .get(&peer.to_string())
                .cloned()
                .ok_or_else(|| ChainError::NetworkError(format!("Peer {} unreachable", peer)))
        }
    }

    fn extend_chain(blockchain: &mut Blockchain, blocks: usize) {
        for _ in 0..blocks {
            let transactions_hash = Mempool::hash(&Vec::<crate::transaction::Transaction>::new())
                .unwrap();
            let previous_block_hash = blockchain.last_block().hash().unwrap();
            let nonce = proof_of_work(&transactions_hash, &previous_block_hash);
            blockchain
                .create_block(nonce, Some(previous_block_hash), Vec::new())
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_adopts_strictly_longer_valid_chain() {
        let mut local = Blockchain::new().unwrap();
        let mut remote = Blockchain::new().unwrap();
        extend_chain(&mut remote, 2);

        let mut peers = PeerRegistry::new();
        let peer = peers.register_node("127.0.0.1:5000").unwrap();

        let mut client = MockPeerClient::new();
        client.serve(&peer, remote.chain.clone());

        assert!(reach_consensus(&mut local, &peers, &client).await);
        assert_eq!(local.chain, remote.chain);
    }

    #[tokio::test]
    async fn test_equal_length_chain_is_not_adopted() {
        let mut local = Blockchain::new().unwrap();
        extend_chain(&mut local, 1);
        let mut remote = Blockchain::new().unwrap();
        extend_chain(&mut remote, 1);

        let mut peers = PeerRegistry::new();
        let peer = peers.register_node("127.0.0.1:5000").unwrap();

        let mut client = MockPeerClient::new();
        client.serve(&peer, remote.chain.clone());

        let before = local.chain.clone();
        assert!(!reach_consensus(&mut local, &peers, &client).await);
        assert_eq!(local.chain, before);
    }

    #[tokio::test]
    async fn test_longer_invalid_chain_is_not_adopted() {
        let mut local = Blockchain::new().unwrap();
        let mut remote = Blockchain::new().unwrap();
        extend_chain(&mut remote, 2);
        remote.chain[1].previous_block_hash = "bogus".to_string();

        let mut peers = PeerRegistry::new();
        let peer = peers.register_node("127.0.0.1:5000").unwrap();

        let mut client = MockPeerClient::new();
        client.serve(&peer, remote.chain.clone());

        assert!(!reach_consensus(&mut local, &peers, &client).await);
        assert_eq!(local.chain.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_skipped() {
        let mut local = Blockchain::new().unwrap();

        let mut peers = PeerRegistry::new();
        peers.register_node("127.0.0.1:5000").unwrap();

        let client = MockPeerClient::new();
        assert!(!reach_consensus(&mut local, &peers, &client).await);
        assert_eq!(local.chain.len(), 1);
    }

    #[tokio::test]
    async fn test_longest_candidate_wins_across_all_peers() {
        let mut local = Blockchain::new().unwrap();
        let mut shorter = Blockchain::new().unwrap();
        extend_chain(&mut shorter, 1);
        let mut longer = Blockchain::new().unwrap();
        extend_chain(&mut longer, 3);

        let mut peers = PeerRegistry::new();
        let peer_a = peers.register_node("127.0.0.1:5000").unwrap();
        let peer_b = peers.register_node("127.0.0.1:5001").unwrap();

        let mut client = MockPeerClient::new();
        client.serve(&peer_a, shorter.chain.clone());
        client.serve(&peer_b, longer.chain.clone());

        assert!(reach_consensus(&mut local, &peers, &client).await);
        assert_eq!(local.chain, longer.chain);
    }
}
