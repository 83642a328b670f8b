pub mod block;
pub mod model;
pub mod pow;
pub mod validator;

pub use block::Block;
pub use model::Blockchain;
pub use pow::Difficulty;

/// Default Proof-of-Work difficulty (number of leading hex zeros).
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// Composer budget, in simulated size units.
pub const DEFAULT_MAX_BLOCK_SIZE: u32 = 2000;

/// Fixed reward credited to the winner of a mining round.
pub const MINING_REWARD: u64 = 1;

/// Candidate proofs tried between two cancellation checks.
pub const DEFAULT_POLL_INTERVAL: u64 = 1_000;
