//! Peer bookkeeping for PebbleChain
//!
//! The registry holds the set of known peer network locations. Pure
//! bookkeeping: no ordering, no liveness tracking. Malformed addresses are
//! rejected with an explicit error instead of degrading into a garbage
//! entry.

use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A normalized peer network location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddr {
    pub host: String,
    pub port: u16,
}

impl PeerAddr {
    /// Parse a peer address of the form `[http[s]://]host:port`.
    pub fn parse(address: &str) -> Result<Self, ChainError> {
        let location = address
            .strip_prefix("http://")
            .or_else(|| address.strip_prefix("https://"))
            .unwrap_or(address);

        // Anything with a remaining slash is either a stray path or a
        // mistyped scheme (e.g. "http//host:port"), both malformed.
        if location.is_empty() || location.contains('/') {
            return Err(ChainError::InvalidPeerAddress(address.to_string()));
        }

        let (host, port) = location
            .rsplit_once(':')
            .ok_or_else(|| ChainError::InvalidPeerAddress(address.to_string()))?;
        if host.is_empty() {
            return Err(ChainError::InvalidPeerAddress(address.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ChainError::InvalidPeerAddress(address.to_string()))?;

        Ok(PeerAddr {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The set of peers known to this node, deduplicated.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    nodes: HashSet<PeerAddr>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        PeerRegistry {
            nodes: HashSet::new(),
        }
    }

    /// Parse and register a peer. Re-registering an existing location is a
    /// no-op; set semantics guarantee idempotence.
    pub fn register_node(&mut self, address: &str) -> Result<PeerAddr, ChainError> {
        let peer = PeerAddr::parse(address)?;
        self.nodes.insert(peer.clone());
        Ok(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerAddr> {
        self.nodes.iter()
    }

    pub fn contains(&self, peer: &PeerAddr) -> bool {
        self.nodes.contains(peer)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
