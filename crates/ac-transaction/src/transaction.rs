use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{canonical::to_canonical_json, TransactionError};

/// A single record submitted to the chain: who wrote what, and when.
///
/// Once a transaction has been mined into a block its canonical JSON form is
/// committed by the block's Merkle root, so any later change to `author` or
/// `content` is detectable through a Merkle-proof audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Free-form author identifier.
    pub author: String,

    /// Payload carried by this transaction.
    pub content: String,

    /// Fractional seconds since the Unix epoch, assigned on acceptance.
    pub timestamp: f64,
}

impl Transaction {
    /// Create a transaction stamped with the current wall clock.
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_timestamp(author, content, now_unix())
    }

    /// Create a transaction with an explicit timestamp.
    pub fn with_timestamp(
        author: impl Into<String>,
        content: impl Into<String>,
        timestamp: f64,
    ) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Canonical sorted-key JSON form. This is both the wire representation
    /// and the exact byte sequence hashed into the Merkle tree.
    pub fn canonical(&self) -> Result<String, TransactionError> {
        Ok(to_canonical_json(self)?)
    }

    /// SHA-256 of the canonical form. Used as the leaf value in the Merkle
    /// tree.
    pub fn hash(&self) -> Result<[u8; 32], TransactionError> {
        let canonical = self.canonical()?;
        Ok(Sha256::digest(canonical.as_bytes()).into())
    }

    /// Hex-encoded hash, useful for display and logging.
    pub fn hash_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.hash()?))
    }
}

/// Current wall clock as fractional seconds since the epoch.
fn now_unix() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_sorts_keys() {
        let tx = Transaction::with_timestamp("alice", "hello", 0.0);
        assert_eq!(
            tx.canonical().unwrap(),
            r#"{"author":"alice","content":"hello","timestamp":0.0}"#
        );
    }

    #[test]
    fn hash_is_deterministic_for_same_data() {
        let tx = Transaction::with_timestamp("bob", "payload", 12.5);
        assert_eq!(tx.hash().unwrap(), tx.hash().unwrap());
    }

    #[test]
    fn different_content_produces_different_hashes() {
        let a = Transaction::with_timestamp("a", "x", 0.0);
        let b = Transaction::with_timestamp("a", "y", 0.0);
        assert_ne!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn new_transaction_is_stamped_with_wall_clock() {
        let tx = Transaction::new("a", "x");
        assert!(tx.timestamp > 0.0);
    }

    #[test]
    fn round_trips_through_canonical_json() {
        let tx = Transaction::with_timestamp("carol", "data", 1.25);
        let parsed: Transaction = serde_json::from_str(&tx.canonical().unwrap()).unwrap();
        assert_eq!(parsed, tx);
    }
}
