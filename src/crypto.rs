//! Cryptographic primitives for PebbleChain
//!
//! Covers the two hashing/signing concerns the ledger core depends on:
//! the canonical SHA-256 digest used for blocks and transaction lists, and
//! recoverable ECDSA signatures over a transaction's content digest.

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
/// This prevents repeated, unnecessary context creation.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Length of a hex-encoded recoverable signature:
/// one recovery-id byte followed by the 64-byte compact signature.
pub const RECOVERABLE_SIGNATURE_SIZE: usize = 65;

/// Compute the canonical SHA-256 digest of any serializable entity.
///
/// The entity is converted to a JSON value whose object keys are ordered
/// lexicographically, encoded as UTF-8 and hashed; the result is rendered as
/// lowercase hex. Two semantically identical values always produce the same
/// digest regardless of field insertion order, which is what lets peers
/// independently recompute block and transaction hashes.
pub fn canonical_digest<T: Serialize>(value: &T) -> Result<String, ChainError> {
    let ordered = serde_json::to_value(value)?;
    Ok(sha256_hex(ordered.to_string().as_bytes()))
}

/// SHA-256 over raw bytes, rendered as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Derives the ledger address: SHA-256 of the compressed public key,
    /// rendered as lowercase hex.
    pub fn address(&self) -> String {
        derive_address(&self.public_key)
    }

    /// Returns the KeyPair's public key as a compressed byte array.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Signs a message (which is first hashed using SHA-256) and returns a
    /// hex-encoded recoverable signature: recovery-id byte + compact bytes.
    pub fn sign_recoverable(&self, message: &[u8]) -> Result<String, ChainError> {
        let message = digest_message(message)?;
        let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &self.secret_key);

        let (recovery_id, compact) = signature.serialize_compact();
        let mut bytes = Vec::with_capacity(RECOVERABLE_SIGNATURE_SIZE);
        bytes.push(recovery_id.to_i32() as u8);
        bytes.extend_from_slice(&compact);
        Ok(hex::encode(bytes))
    }
}

/// Derive a ledger address from a public key.
pub fn derive_address(public_key: &PublicKey) -> String {
    sha256_hex(&public_key.serialize())
}

/// Recover the signer's public key from a recoverable signature and verify
/// the signature against it.
///
/// Note that recovery alone proves only that the signature is internally
/// consistent with *some* key; it does not bind that key to any claimed
/// sender address. Callers that need the binding must compare
/// [`derive_address`] of the returned key against the claimed address.
pub fn recover_and_verify(message: &[u8], signature_hex: &str) -> Result<PublicKey, ChainError> {
    let bytes = hex::decode(signature_hex)?;
    if bytes.len() != RECOVERABLE_SIGNATURE_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Signature must be exactly {} bytes, got {}",
            RECOVERABLE_SIGNATURE_SIZE,
            bytes.len()
        )));
    }

    let recovery_id = RecoveryId::from_i32(bytes[0] as i32)
        .map_err(|e| ChainError::CryptoError(format!("Invalid recovery id: {}", e)))?;
    let signature = RecoverableSignature::from_compact(&bytes[1..], recovery_id)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

    let message = digest_message(message)?;
    let public_key = SECP256K1_CONTEXT
        .recover_ecdsa(&message, &signature)
        .map_err(|_| ChainError::CryptoError("Public key recovery failed".to_string()))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature.to_standard(), &public_key)
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))?;

    Ok(public_key)
}

fn digest_message(message: &[u8]) -> Result<Message, ChainError> {
    let digest = Sha256::digest(message);
    Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))
}
