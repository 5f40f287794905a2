//! Transaction mempool for PebbleChain
//!
//! Pending transactions live here until a mined block picks them up.
//! Admission enforces one simplifying rule on top of ledger validation:
//! at most one pending transaction per sender at a time.

use crate::blockchain::{Block, Blockchain};
use crate::crypto;
use crate::error::ChainError;
use crate::transaction::Transaction;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct Mempool {
    pending: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Mempool {
            pending: Vec::new(),
        }
    }

    /// Add a transaction to the pool if it passes validation. Returns
    /// `false` and leaves the pool unchanged otherwise.
    pub fn add_transaction(&mut self, transaction: Transaction, chain: &[Block]) -> bool {
        if !self.valid_transaction(&transaction, chain) {
            return false;
        }
        self.pending.push(transaction);
        true
    }

    /// Validate a candidate for admission: non-negative amount, no other
    /// pending transaction from the same sender, then full ledger
    /// validation against the last confirmed block's index. Pending
    /// transactions from other senders are deliberately not considered in
    /// the balance check; a pending debit from the same sender cannot exist
    /// because of the one-pending-per-sender rule.
    pub fn valid_transaction(&self, transaction: &Transaction, chain: &[Block]) -> bool {
        if transaction.amount < 0 {
            return false;
        }

        if self
            .pending
            .iter()
            .any(|pending| pending.sender == transaction.sender)
        {
            return false;
        }

        Blockchain::valid_transaction(transaction, chain, chain.len())
    }

    /// Canonical hash of an arbitrary transaction sequence, used both for
    /// mempool snapshots and as a block's transactions hash. The empty
    /// sequence hashes to a stable digest.
    pub fn hash<T: Serialize>(transactions: &[T]) -> Result<String, ChainError> {
        crypto::canonical_digest(&transactions)
    }

    /// Remove and return all pending transactions, in admission order.
    pub fn take_pending(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }

    /// Drop every pending transaction that was included in a mined block.
    pub fn remove_transactions(&mut self, mined: &[Transaction]) {
        self.pending.retain(|pending| !mined.contains(pending));
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::miner::proof_of_work;

    fn chain_with_funds(keypair: &KeyPair, amount: i64) -> Blockchain {
        let mut blockchain = Blockchain::new().unwrap();
        let transactions = vec![Transaction::coinbase(keypair.address(), amount)];
        let transactions_hash = Mempool::hash(&transactions).unwrap();
        let previous_block_hash = blockchain.last_block().hash().unwrap();
        let nonce = proof_of_work(&transactions_hash, &previous_block_hash);
        blockchain
            .create_block(nonce, Some(previous_block_hash), transactions)
            .unwrap();
        blockchain
    }

    #[test]
    fn test_add_valid_transaction() {
        let keypair = KeyPair::generate();
        let blockchain = chain_with_funds(&keypair, 10);
        let mut mempool = Mempool::new();

        let tx = Transaction::new_signed(&keypair, "bob", 10).unwrap();
        assert!(mempool.valid_transaction(&tx, &blockchain.chain));
        assert!(mempool.add_transaction(tx, &blockchain.chain));
        assert_eq!(mempool.len(), 1);
    }

    #[test]
    fn test_reject_overspend() {
        let keypair = KeyPair::generate();
        let blockchain = chain_with_funds(&keypair, 10);
        let mut mempool = Mempool::new();

        let tx = Transaction::new_signed(&keypair, "bob", 11).unwrap();
        assert!(!mempool.add_transaction(tx, &blockchain.chain));
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_reject_negative_amount() {
        let keypair = KeyPair::generate();
        let blockchain = chain_with_funds(&keypair, 10);
        let mut mempool = Mempool::new();

        let tx = Transaction::new_signed(&keypair, "bob", -1).unwrap();
        assert!(!mempool.add_transaction(tx, &blockchain.chain));
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_reject_invalid_signature() {
        let keypair = KeyPair::generate();
        let blockchain = chain_with_funds(&keypair, 10);
        let mut mempool = Mempool::new();

        let mut tx = Transaction::new_signed(&keypair, "bob", 1).unwrap();
        tx.amount = 2; // breaks the signature
        assert!(!mempool.add_transaction(tx, &blockchain.chain));
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_reject_second_pending_transaction_from_same_sender() {
        let keypair = KeyPair::generate();
        let blockchain = chain_with_funds(&keypair, 10);
        let mut mempool = Mempool::new();

        let first = Transaction::new_signed(&keypair, "bob", 3).unwrap();
        let second = Transaction::new_signed(&keypair, "carol", 3).unwrap();

        assert!(mempool.add_transaction(first.clone(), &blockchain.chain));
        assert!(!mempool.add_transaction(second, &blockchain.chain));
        assert_eq!(mempool.pending(), &[first]);
    }

    #[test]
    fn test_empty_sequence_has_stable_hash() {
        let empty: Vec<Transaction> = Vec::new();
        let digest = Mempool::hash(&empty).unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, Mempool::hash(&Vec::<Transaction>::new()).unwrap());
    }

    #[test]
    fn test_take_pending_drains_pool() {
        let keypair = KeyPair::generate();
        let blockchain = chain_with_funds(&keypair, 10);
        let mut mempool = Mempool::new();

        let tx = Transaction::new_signed(&keypair, "bob", 1).unwrap();
        mempool.add_transaction(tx.clone(), &blockchain.chain);

        assert_eq!(mempool.take_pending(), vec![tx]);
        assert!(mempool.is_empty());
    }
}
