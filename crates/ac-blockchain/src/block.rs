use ac_transaction::{to_canonical_json, Transaction};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::BlockError;

/// A single block in the chain.
///
/// The `hash` field is attached when the block is committed (mined locally
/// or accepted from a peer) and is always excluded from the hashed form, so
/// a block hashes identically before and after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Sequential block height (genesis = 0).
    pub index: u64,

    /// All transactions bundled in this block, in commitment order.
    pub transactions: Vec<Transaction>,

    /// Fractional seconds since the Unix epoch when the block was built.
    pub timestamp: f64,

    /// Hex hash of the previous block's canonical form; `"0"` for genesis.
    pub previous_hash: String,

    /// Proof-of-work nonce found by the miner.
    pub nonce: u64,

    /// Merkle root of `transactions` as lowercase hex. The genesis block
    /// carries no transactions and serialises this as the JSON number `0`.
    #[serde(with = "merkle_root")]
    pub merkle_root: Option<String>,

    /// Hex hash of the canonical form, attached on commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Block {
    /// Build an uncommitted block (nonce 0, no hash).
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        timestamp: f64,
        previous_hash: String,
        merkle_root: Option<String>,
    ) -> Self {
        Self {
            index,
            transactions,
            timestamp,
            previous_hash,
            nonce: 0,
            merkle_root,
            hash: None,
        }
    }

    /// The genesis block: no transactions, timestamp 0, previous hash `"0"`,
    /// with its canonical hash already attached.
    pub fn genesis() -> Self {
        let mut block = Self::new(0, Vec::new(), 0.0, "0".to_string(), None);
        let hash = block
            .compute_hash()
            .expect("genesis canonical form is always serialisable");
        block.hash = Some(hash);
        block
    }

    /// Canonical sorted-key JSON including `hash` when present. This is the
    /// wire representation of a committed block.
    pub fn canonical(&self) -> Result<String, BlockError> {
        Ok(to_canonical_json(self)?)
    }

    /// Canonical form with the `hash` key removed — the exact byte sequence
    /// the block hash is computed over.
    pub fn canonical_for_hashing(&self) -> Result<String, BlockError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            object.remove("hash");
        }
        Ok(serde_json::to_string(&value)?)
    }

    /// SHA-256 of [`Self::canonical_for_hashing`], lowercase hex.
    pub fn compute_hash(&self) -> Result<String, BlockError> {
        let canonical = self.canonical_for_hashing()?;
        Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
    }
}

/// The `merkle_root` field is a hex digest for mined blocks but the JSON
/// number `0` for genesis. Parse both shapes into `Option<String>` here so
/// the rest of the engine never sees the dual-typed wire form.
mod merkle_root {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        root: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match root {
            Some(hex) => serializer.serialize_str(hex),
            None => serializer.serialize_u64(0),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Unset(u64),
            Root(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Unset(0) => Ok(None),
            Wire::Unset(n) => Err(de::Error::custom(format!(
                "merkle_root must be 0 or a hex digest, got {n}"
            ))),
            Wire::Root(hex) => Ok(Some(hex)),
        }
    }
}
