use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which side of the running hash the sibling sits on when re-computing a
/// parent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofSide {
    Left,
    Right,
}

/// A single step in a Merkle audit path: the sibling hash and its position.
///
/// On the wire a step is `{"hash":"<hex>","position":"left"|"right"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    #[serde(with = "hex_digest")]
    pub hash: [u8; 32],
    pub position: ProofSide,
}

/// An inclusion proof for a single transaction leaf: the ordered sibling
/// path from leaf level to the root.
///
/// The leaf hash itself is not part of the proof — the verifier computes it
/// from the transaction it holds, which is exactly what makes the proof
/// useful for tamper detection: a peer cannot vouch for a transaction the
/// verifier's copy disagrees with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerkleProof {
    pub path: Vec<ProofStep>,
}

impl MerkleProof {
    /// Returns `true` if hashing `leaf_hash` upward through each sibling
    /// reproduces `expected_root`.
    pub fn verify(&self, leaf_hash: &[u8; 32], expected_root: &[u8; 32]) -> bool {
        let mut current = *leaf_hash;

        for step in &self.path {
            let combined = match step.position {
                ProofSide::Left => {
                    let mut v = step.hash.to_vec();
                    v.extend_from_slice(&current);
                    v
                }
                ProofSide::Right => {
                    let mut v = current.to_vec();
                    v.extend_from_slice(&step.hash);
                    v
                }
            };
            current = Sha256::digest(&combined).into();
        }

        &current == expected_root
    }

    /// Verify against a hex-encoded root, as carried in block fields and on
    /// the wire. An undecodable root verifies as `false`.
    pub fn verify_hex(&self, leaf_hash: &[u8; 32], expected_root: &str) -> bool {
        let mut root = [0u8; 32];
        match hex::decode_to_slice(expected_root, &mut root) {
            Ok(()) => self.verify(leaf_hash, &root),
            Err(_) => false,
        }
    }
}

/// Serialise 32-byte digests as lowercase hex strings.
mod hex_digest {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(digest: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(digest))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut digest = [0u8; 32];
        hex::decode_to_slice(&s, &mut digest)
            .map_err(|_| de::Error::custom("expected a 64-char hex digest"))?;
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_serialises_to_hex_and_lowercase_position() {
        let step = ProofStep {
            hash: [0xab; 32],
            position: ProofSide::Left,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["position"], "left");
        assert_eq!(json["hash"], "ab".repeat(32));
    }

    #[test]
    fn proof_round_trips_through_json() {
        let proof = MerkleProof {
            path: vec![
                ProofStep {
                    hash: [1u8; 32],
                    position: ProofSide::Right,
                },
                ProofStep {
                    hash: [2u8; 32],
                    position: ProofSide::Left,
                },
            ],
        };
        let json = serde_json::to_string(&proof).unwrap();
        assert!(json.starts_with('['), "proof is a bare array on the wire");
        let back: MerkleProof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, proof);
    }

    #[test]
    fn bad_hex_root_fails_verification() {
        let proof = MerkleProof { path: vec![] };
        assert!(!proof.verify_hex(&[0u8; 32], "not-hex"));
    }
}
