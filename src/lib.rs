//! PebbleChain - a single-node proof-of-work value-transfer ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Chain storage, block/transaction validation, balance replay
//! - [`transaction`] - Transaction type and signature handling
//! - [`mempool`] - Pending-transaction admission
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work nonce search and verification
//! - [`sync`] - Longest-chain reconciliation with peers
//!
//! ## Cryptography
//! - [`crypto`] - Canonical hashing and recoverable ECDSA (secp256k1)
//!
//! ## Networking
//! - [`network`] - Peer address parsing and registry
//!
//! ## Node & Utilities
//! - [`node`] - Node context tying the pieces together
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;
pub mod sync;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Networking
// ============================================================================
pub mod network;

// ============================================================================
// Node & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod node;
