pub mod canonical;
pub mod error;
pub mod transaction;

pub use canonical::to_canonical_json;
pub use error::TransactionError;
pub use transaction::Transaction;
