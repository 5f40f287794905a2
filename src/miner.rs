//! Proof-of-work engine for PebbleChain
//!
//! Brute-force nonce search over the pair (transactions hash, previous
//! block hash). Difficulty is fixed: the hex digest must start with four
//! zero characters.

use crate::crypto;
use std::sync::atomic::{AtomicBool, Ordering};

/// Required hex prefix of a valid proof digest (fixed 16-bit difficulty).
pub const DIFFICULTY_PREFIX: &str = "0000";

/// How many nonces to try between checks of the cancellation flag.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Search for a nonce satisfying [`valid_proof`], starting at 0. Unbounded:
/// the loop only terminates on success.
pub fn proof_of_work(transactions_hash: &str, previous_block_hash: &str) -> u64 {
    let mut nonce = 0;
    while !valid_proof(transactions_hash, previous_block_hash, nonce) {
        nonce += 1;
    }
    nonce
}

/// Cancellable variant of [`proof_of_work`] for background mining. Returns
/// `None` once the flag is raised, so a consensus-adopted longer chain can
/// abort a now-obsolete search.
pub fn proof_of_work_cancellable(
    transactions_hash: &str,
    previous_block_hash: &str,
    cancel: &AtomicBool,
) -> Option<u64> {
    let mut nonce = 0;
    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            return None;
        }
        if valid_proof(transactions_hash, previous_block_hash, nonce) {
            return Some(nonce);
        }
        nonce += 1;
    }
}

/// Check a candidate nonce: concatenate both hash strings with the nonce's
/// decimal form, hash the UTF-8 bytes with SHA-256 and require the hex
/// digest to start with [`DIFFICULTY_PREFIX`].
pub fn valid_proof(transactions_hash: &str, previous_block_hash: &str, nonce: u64) -> bool {
    let payload = format!("{}{}{}", transactions_hash, previous_block_hash, nonce);
    crypto::sha256_hex(payload.as_bytes()).starts_with(DIFFICULTY_PREFIX)
}
