//! Transaction type and signature handling for PebbleChain

use crate::crypto::{self, KeyPair};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};

/// Reserved sender address marking a coinbase (block reward) transaction.
pub const COINBASE_SENDER: &str = "0";

/// Upper bound on the amount a single coinbase transaction may mint.
pub const MAX_BLOCK_REWARD: i64 = 10;

/// A signed value transfer, or a coinbase mint when the sender is
/// [`COINBASE_SENDER`].
///
/// The signature covers the canonical digest of (amount, recipient, sender)
/// only; it is absent on coinbase transactions and omitted from their
/// serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// The signable triple. Kept as its own struct so the signature field can
/// never leak into the signed content.
#[derive(Serialize)]
struct TransactionContent<'a> {
    sender: &'a str,
    recipient: &'a str,
    amount: i64,
}

impl Transaction {
    /// Create and sign a transfer with the given key pair. The sender field
    /// is derived from the key pair's address.
    pub fn new_signed(
        keypair: &KeyPair,
        recipient: impl Into<String>,
        amount: i64,
    ) -> Result<Self, ChainError> {
        let mut tx = Transaction {
            sender: keypair.address(),
            recipient: recipient.into(),
            amount,
            signature: None,
        };
        let content_hash = tx.content_hash()?;
        tx.signature = Some(keypair.sign_recoverable(content_hash.as_bytes())?);
        Ok(tx)
    }

    /// Create a coinbase transaction minting `amount` to `recipient`.
    pub fn coinbase(recipient: impl Into<String>, amount: i64) -> Self {
        Transaction {
            sender: COINBASE_SENDER.to_string(),
            recipient: recipient.into(),
            amount,
            signature: None,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    /// Canonical digest of the transaction's content triple, i.e. the value
    /// that gets signed. Field order in memory does not affect the result.
    pub fn content_hash(&self) -> Result<String, ChainError> {
        crypto::canonical_digest(&TransactionContent {
            sender: &self.sender,
            recipient: &self.recipient,
            amount: self.amount,
        })
    }

    /// Verify the transaction's signature by recovering the signer's public
    /// key from the signature over the content digest.
    ///
    /// This checks internal signature consistency only: the recovered key is
    /// not compared against the claimed sender address, so a valid signature
    /// from any key passes regardless of the sender field.
    pub fn verify_signature(&self) -> bool {
        let Some(signature) = &self.signature else {
            return false;
        };
        let Ok(content_hash) = self.content_hash() else {
            return false;
        };
        crypto::recover_and_verify(content_hash.as_bytes(), signature).is_ok()
    }
}
