use std::collections::HashSet;

use crate::{error::RegistryError, peer::Peer};

/// Verdict on whether this node's chain can still be trusted, based on
/// tamper votes received from the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trustability {
    /// No peers to compare with yet.
    Unknown,
    /// Fewer than half of the known peers have voted the chain tampered.
    Trustable,
    /// At least half of the known peers have voted the chain tampered.
    Tampered,
}

/// The local node's view of the network: the set of known peers, its own
/// identity, and the tally of tamper votes cast against it.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry {
    peers: HashSet<Peer>,
    identity: Option<Peer>,
    votes: u32,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. A peer with the same `(address, name)` pair may only
    /// be registered once.
    pub fn add_peer(&mut self, peer: Peer) -> Result<(), RegistryError> {
        if self.peers.contains(&peer) {
            return Err(RegistryError::Duplicate {
                address: peer.address,
                name: peer.name,
            });
        }
        self.peers.insert(peer);
        Ok(())
    }

    /// Merge a batch of peers (set union). The node's own identity and
    /// already-known peers are skipped silently.
    pub fn merge_peers(&mut self, peers: impl IntoIterator<Item = Peer>) {
        for peer in peers {
            if self.identity.as_ref() == Some(&peer) {
                continue;
            }
            self.peers.insert(peer);
        }
    }

    /// Snapshot of all known peers. Iteration order is unspecified.
    pub fn peers(&self) -> Vec<Peer> {
        self.peers.iter().cloned().collect()
    }

    pub fn contains(&self, peer: &Peer) -> bool {
        self.peers.contains(peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Set (or replace, on a name change) the node's own peer record.
    pub fn set_identity(&mut self, peer: Peer) {
        self.identity = Some(peer);
    }

    pub fn identity(&self) -> Option<&Peer> {
        self.identity.as_ref()
    }

    /// The node's own record, or an error when the name was never set.
    pub fn require_identity(&self) -> Result<&Peer, RegistryError> {
        self.identity.as_ref().ok_or(RegistryError::IdentityUnset)
    }

    /// Record one tamper vote from the network. Votes only ever grow.
    pub fn record_vote(&mut self) {
        self.votes += 1;
    }

    pub fn votes(&self) -> u32 {
        self.votes
    }

    /// The chain is voted untrustworthy once at least 50% of the known
    /// peers have cast a tamper vote. With no peers there is nothing to
    /// compare against.
    pub fn trustability(&self) -> Trustability {
        if self.peers.is_empty() {
            return Trustability::Unknown;
        }

        if (self.votes as usize * 100) / self.peers.len() >= 50 {
            Trustability::Tampered
        } else {
            Trustability::Trustable
        }
    }
}
