//! Main blockchain logic and validation for PebbleChain
//!
//! The [`Blockchain`] owns the ordered chain of blocks and exposes the
//! validation algorithms everything else depends on: canonical block
//! hashing, chain-linkage verification and double-spend prevention via
//! historical balance replay.

use crate::crypto;
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::miner;
use crate::transaction::{Transaction, MAX_BLOCK_REWARD};
use serde::{Deserialize, Serialize};

/// Fixed previous-hash constant carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str =
    "86a4be451d0e4ae83bcd72e1eb5308b19a4b270f95c25d752927341f7632a1cc";

/// A single block in the chain. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub nonce: u64,
    pub transactions_hash: String,
    pub previous_block_hash: String,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Canonical, deterministic hash of the block's fields. Fields are
    /// encoded with keys in lexicographic order before hashing so two
    /// semantically identical blocks always hash identically.
    pub fn hash(&self) -> Result<String, ChainError> {
        crypto::canonical_digest(self)
    }
}

/// Transaction history of an address, partitioned by role.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AddressActivity {
    pub count: usize,
    pub sent: Vec<Transaction>,
    pub received: Vec<Transaction>,
}

/// The Ledger: chain storage plus the mempool holding transactions that
/// await inclusion in the next block.
#[derive(Debug, Clone)]
pub struct Blockchain {
    pub chain: Vec<Block>,
    pub mempool: Mempool,
}

impl Blockchain {
    /// Create a new chain containing only the genesis block.
    pub fn new() -> Result<Self, ChainError> {
        let mut blockchain = Blockchain {
            chain: Vec::new(),
            mempool: Mempool::new(),
        };
        blockchain.create_block(0, Some(GENESIS_PREVIOUS_HASH.to_string()), Vec::new())?;
        Ok(blockchain)
    }

    /// Create a new block and append it to the chain.
    ///
    /// When `previous_block_hash` is `None` the hash of the current last
    /// block is used. No validation happens here; callers must have
    /// validated first (the mining path always admits transactions through
    /// the mempool before calling).
    pub fn create_block(
        &mut self,
        nonce: u64,
        previous_block_hash: Option<String>,
        transactions: Vec<Transaction>,
    ) -> Result<Block, ChainError> {
        let previous_block_hash = match previous_block_hash {
            Some(hash) => hash,
            None => self
                .chain
                .last()
                .ok_or_else(|| {
                    ChainError::InvalidBlock(
                        "Cannot derive previous hash on an empty chain".to_string(),
                    )
                })?
                .hash()?,
        };

        let block = Block {
            index: self.chain.len() as u64 + 1,
            timestamp: chrono::Utc::now().timestamp_micros() as f64 / 1e6,
            nonce,
            transactions_hash: Mempool::hash(&transactions)?,
            previous_block_hash,
            transactions,
        };

        self.chain.push(block.clone());
        Ok(block)
    }

    /// The most recently appended block. The chain is never empty.
    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("chain always contains at least the genesis block")
    }

    /// Drain the mempool, append a coinbase reward and mine the next block.
    ///
    /// This is the synchronous mining path: the nonce search blocks the
    /// caller until it succeeds. [`crate::node::Node::mine`] wraps it with
    /// a cancellable background search.
    pub fn mine_block(&mut self, reward_address: &str) -> Result<Block, ChainError> {
        let mut transactions = self.mempool.take_pending();
        transactions.push(Transaction::coinbase(reward_address, MAX_BLOCK_REWARD));

        let transactions_hash = Mempool::hash(&transactions)?;
        let previous_block_hash = self.last_block().hash()?;
        let nonce = miner::proof_of_work(&transactions_hash, &previous_block_hash);

        self.create_block(nonce, Some(previous_block_hash), transactions)
    }

    /// Admit a pending transaction into the mempool. Returns `false` and
    /// leaves the pool unchanged if the transaction is invalid.
    pub fn submit_transaction(&mut self, transaction: Transaction) -> bool {
        self.mempool.add_transaction(transaction, &self.chain)
    }

    /// Replace the whole chain atomically. Used by consensus once a strictly
    /// longer valid chain has been found; no partial merge ever happens.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        self.chain = chain;
    }

    /// Validate a chain by walking it once from the front: every block must
    /// link to the canonical hash of its predecessor, carry a nonce that
    /// satisfies the proof-of-work predicate, contain only valid
    /// transactions against the balances before it, and hold at most one
    /// coinbase transaction.
    pub fn valid_chain(chain: &[Block]) -> bool {
        if chain.is_empty() {
            return false;
        }

        let mut previous = &chain[0];
        for (position, block) in chain.iter().enumerate().skip(1) {
            let Ok(previous_hash) = previous.hash() else {
                return false;
            };
            if block.previous_block_hash != previous_hash {
                return false;
            }
            if !miner::valid_proof(&block.transactions_hash, &previous_hash, block.nonce) {
                return false;
            }

            let mut coinbase_count = 0;
            for transaction in &block.transactions {
                if transaction.is_coinbase() {
                    coinbase_count += 1;
                }
                if !Self::valid_transaction(transaction, chain, position) {
                    return false;
                }
            }
            if coinbase_count > 1 {
                return false;
            }

            previous = block;
        }

        true
    }

    /// Validate a single transaction against the chain state before
    /// position `index`. Coinbase transactions are valid iff their amount
    /// lies within `[0, MAX_BLOCK_REWARD]`; everything else must carry a
    /// valid signature, a non-negative amount and sufficient sender funds.
    pub fn valid_transaction(transaction: &Transaction, chain: &[Block], index: usize) -> bool {
        if transaction.is_coinbase() {
            return (0..=MAX_BLOCK_REWARD).contains(&transaction.amount);
        }

        if !transaction.verify_signature() {
            return false;
        }
        if transaction.amount < 0 {
            return false;
        }

        transaction.amount <= Self::address_balance_at_index(&transaction.sender, chain, index)
    }

    /// Compute an address's balance by replaying every transaction in chain
    /// positions strictly before `index` (genesis excluded): `+amount` where
    /// the address is recipient, `-amount` where it is sender.
    ///
    /// This is a full O(chain length) recomputation on every call, a
    /// deliberate simplicity-over-performance choice.
    pub fn address_balance_at_index(address: &str, chain: &[Block], index: usize) -> i64 {
        let mut balance = 0;

        for block in chain.iter().take(index).skip(1) {
            for transaction in &block.transactions {
                if transaction.sender == address {
                    balance -= transaction.amount;
                }
                if transaction.recipient == address {
                    balance += transaction.amount;
                }
            }
        }

        balance
    }

    /// Collect an address's sent and received transactions up to chain
    /// position `index`, using the same scan as the balance replay. A
    /// transaction where the address is both sender and recipient is not a
    /// defined input; the sender role wins.
    pub fn address_transactions_at_index(
        address: &str,
        chain: &[Block],
        index: usize,
    ) -> AddressActivity {
        let mut activity = AddressActivity::default();

        for block in chain.iter().take(index).skip(1) {
            for transaction in &block.transactions {
                if transaction.sender == address {
                    activity.sent.push(transaction.clone());
                    activity.count += 1;
                } else if transaction.recipient == address {
                    activity.received.push(transaction.clone());
                    activity.count += 1;
                }
            }
        }

        activity
    }
}
