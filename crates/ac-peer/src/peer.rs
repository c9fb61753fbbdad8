use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PeerError;
use ac_transaction::to_canonical_json;

/// A reachable remote node, identified by its base address and chosen name.
///
/// Identity is the `(address, name)` pair: two records with the same pair
/// are the same peer, which is what gives the registry its set semantics.
/// Addresses are normalised (no trailing `/`) as they enter the type so
/// that endpoint URLs join uniformly and equality is not defeated by
/// spelling differences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    #[serde(deserialize_with = "normalized_address")]
    pub address: String,
    pub name: String,
}

impl Peer {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: normalize(address.into()),
            name: name.into(),
        }
    }

    /// Canonical sorted-key JSON; the wire form of a peer record.
    pub fn canonical(&self) -> Result<String, PeerError> {
        Ok(to_canonical_json(self)?)
    }

    /// Full URL of an endpoint on this peer, e.g. `endpoint("Nodes/chain")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.address, path.trim_start_matches('/'))
    }
}

fn normalize(address: String) -> String {
    address.trim_end_matches('/').to_string()
}

fn normalized_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(normalize(String::deserialize(deserializer)?))
}
