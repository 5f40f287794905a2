//! Node context for PebbleChain
//!
//! Ties the ledger, mempool, peer registry and proof-of-work engine
//! together behind an explicit context object created at startup; there are
//! no process-wide singletons. All ledger/mempool mutations funnel through
//! the write lock held here, so transaction admission, block appends and
//! chain replacement never interleave inconsistently.

use crate::blockchain::{AddressActivity, Block, Blockchain};
use crate::config::{load_config, Config};
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::miner;
use crate::network::{PeerAddr, PeerRegistry};
use crate::sync::{self, HttpPeerClient, PeerClient, RemoteChain};
use crate::transaction::{Transaction, MAX_BLOCK_REWARD};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Balance and partitioned history of an address at the current chain tip.
#[derive(Debug, Clone, Serialize)]
pub struct AddressSummary {
    pub balance: i64,
    pub activity: AddressActivity,
}

pub struct Node {
    pub config: Config,
    blockchain: Arc<RwLock<Blockchain>>,
    peers: Arc<RwLock<PeerRegistry>>,
    peer_client: Arc<dyn PeerClient>,
    mining_cancel: Arc<AtomicBool>,
}

impl Node {
    /// Load `config.toml`, install the tracing subscriber and create the
    /// node. Intended for binary entrypoints; embedders and tests build
    /// their own [`Config`] and call [`Node::new`] or
    /// [`Node::with_peer_client`] directly.
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let config = load_config()?;
        tracing_subscriber::fmt::init();
        let node = Node::new(config)?;
        info!("Starting PebbleChain node");
        Ok(node)
    }

    /// Create a node with the HTTP peer client implied by the config.
    pub fn new(config: Config) -> Result<Self, ChainError> {
        let timeout = Duration::from_secs(config.network.peer_timeout_secs);
        let client = Arc::new(HttpPeerClient::new(timeout)?);
        Self::with_peer_client(config, client)
    }

    /// Create a node with an explicit peer client. Used by tests and by
    /// embedders that bring their own transport.
    pub fn with_peer_client(
        config: Config,
        peer_client: Arc<dyn PeerClient>,
    ) -> Result<Self, ChainError> {
        let blockchain = Blockchain::new()?;

        let mut peers = PeerRegistry::new();
        for address in &config.network.bootstrap_peers {
            if let Err(e) = peers.register_node(address) {
                warn!(address = %address, error = %e, "Skipping malformed bootstrap peer");
            }
        }

        Ok(Node {
            config,
            blockchain: Arc::new(RwLock::new(blockchain)),
            peers: Arc::new(RwLock::new(peers)),
            peer_client,
            mining_cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Submit a signed transaction for inclusion in the next block.
    /// Returns whether the mempool admitted it.
    pub async fn submit_transaction(&self, transaction: Transaction) -> bool {
        self.blockchain.write().await.submit_transaction(transaction)
    }

    /// Parse, validate and register a peer address.
    pub async fn register_peer(&self, address: &str) -> Result<PeerAddr, ChainError> {
        self.peers.write().await.register_node(address)
    }

    /// Mine the next block: snapshot the pending transactions and chain
    /// tip, run the nonce search on a blocking thread, then append.
    ///
    /// The search is cancellable: when consensus adopts a longer chain
    /// mid-mine the flag is raised and this returns
    /// [`ChainError::MiningCancelled`]. If the tip moved between snapshot
    /// and append the mined block is discarded with
    /// [`ChainError::StaleMiningAttempt`]; pending transactions stay in the
    /// mempool either way.
    pub async fn mine(&self) -> Result<Block, ChainError> {
        self.mining_cancel.store(false, Ordering::Relaxed);

        let (mut transactions, previous_block_hash) = {
            let blockchain = self.blockchain.read().await;
            (
                blockchain.mempool.pending().to_vec(),
                blockchain.last_block().hash()?,
            )
        };
        transactions.push(Transaction::coinbase(
            self.config.miner.reward_address.clone(),
            MAX_BLOCK_REWARD,
        ));
        let transactions_hash = Mempool::hash(&transactions)?;

        let cancel = self.mining_cancel.clone();
        let search_th = transactions_hash.clone();
        let search_ph = previous_block_hash.clone();
        let nonce = tokio::task::spawn_blocking(move || {
            miner::proof_of_work_cancellable(&search_th, &search_ph, &cancel)
        })
        .await
        .map_err(|_| ChainError::MiningCancelled)?
        .ok_or(ChainError::MiningCancelled)?;

        let block = self
            .append_mined_block(nonce, previous_block_hash, transactions)
            .await?;
        info!(index = block.index, nonce = block.nonce, "Mined new block");
        Ok(block)
    }

    /// Append a mined block, provided the chain tip is still the one the
    /// nonce was searched against. Mined transactions leave the mempool.
    async fn append_mined_block(
        &self,
        nonce: u64,
        previous_block_hash: String,
        transactions: Vec<Transaction>,
    ) -> Result<Block, ChainError> {
        let mut blockchain = self.blockchain.write().await;

        if blockchain.last_block().hash()? != previous_block_hash {
            return Err(ChainError::StaleMiningAttempt);
        }

        let block = blockchain.create_block(nonce, Some(previous_block_hash), transactions)?;
        let mined = block.transactions.clone();
        blockchain.mempool.remove_transactions(&mined);
        Ok(block)
    }

    /// Run longest-chain reconciliation against every known peer. On
    /// replacement the mining cancellation flag is raised so an in-flight,
    /// now-obsolete nonce search aborts.
    pub async fn reach_consensus(&self) -> bool {
        let peers = self.peers.read().await.clone();
        let mut blockchain = self.blockchain.write().await;

        let replaced =
            sync::reach_consensus(&mut blockchain, &peers, self.peer_client.as_ref()).await;
        if replaced {
            self.mining_cancel.store(true, Ordering::Relaxed);
        }
        replaced
    }

    /// The full chain with its length, the shape peers consume.
    pub async fn chain_snapshot(&self) -> RemoteChain {
        let blockchain = self.blockchain.read().await;
        RemoteChain {
            chain: blockchain.chain.clone(),
            length: blockchain.chain.len(),
        }
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.blockchain.read().await.mempool.pending().to_vec()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Balance and sent/received history of an address at the chain tip.
    pub async fn address_summary(&self, address: &str) -> AddressSummary {
        let blockchain = self.blockchain.read().await;
        let index = blockchain.chain.len();
        AddressSummary {
            balance: Blockchain::address_balance_at_index(address, &blockchain.chain, index),
            activity: Blockchain::address_transactions_at_index(
                address,
                &blockchain.chain,
                index,
            ),
        }
    }
}
