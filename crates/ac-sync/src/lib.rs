pub mod builder;
pub mod consensus;
pub mod error;
pub mod handshake;
pub mod publisher;
pub mod tamper;

pub use builder::{build_chain, parse_blocks};
pub use consensus::fetch_longest_valid;
pub use error::SyncError;
pub use handshake::{sync_with, HandshakeOutcome};
pub use publisher::{publish_block, PublishFailure};
pub use tamper::{diagnose_block, TamperedTransaction};
