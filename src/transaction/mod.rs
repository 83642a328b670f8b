pub mod model;
pub mod pool;

pub use model::{NewTransaction, Transaction, ValidTransaction};
pub use pool::TransactionPool;

/// Simulated transaction size bounds (inclusive).
pub const DEFAULT_TX_SIZE_MIN: u32 = 10;
pub const DEFAULT_TX_SIZE_MAX: u32 = 100;

/// Largest batch a single generator request may create.
pub const DEFAULT_MAX_GENERATE: usize = 10_000;
