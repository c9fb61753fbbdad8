use crate::{block::Block, error::BlockError};

/// Search for a nonce whose block hash carries `difficulty` leading zero
/// characters. Starts from nonce 0, so the result is deterministic for a
/// given block. Returns the winning hash; the winning nonce is left on the
/// block.
pub fn proof_of_work(block: &mut Block, difficulty: usize) -> Result<String, BlockError> {
    block.nonce = 0;
    let target = "0".repeat(difficulty);
    let mut hash = block.compute_hash()?;

    while !hash.starts_with(&target) {
        block.nonce += 1;
        hash = block.compute_hash()?;
    }

    Ok(hash)
}

/// True iff `hash` carries the difficulty prefix and reproduces the block's
/// canonical hash. A block that cannot be canonicalised never validates.
pub fn is_valid_proof_of_work(block: &Block, hash: &str, difficulty: usize) -> bool {
    hash.starts_with(&"0".repeat(difficulty))
        && block
            .compute_hash()
            .map(|computed| computed == hash)
            .unwrap_or(false)
}
