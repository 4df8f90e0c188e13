pub mod block;
pub mod model;
pub mod validation;

pub use block::{Block, BlockTemplate};
pub use model::{Blockchain, ChainRules};

/// Target seconds between blocks.
pub const BLOCK_GENERATION_INTERVAL_SECS: i64 = 10;

/// Difficulty is recomputed every this many blocks.
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

/// Allowed clock skew, in seconds, when checking block timestamps.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 60;

/// Genesis constants shared by every node of the network.
pub const GENESIS_TIMESTAMP: i64 = 1_525_132_800; // 2018-05-01T00:00:00Z
pub const GENESIS_FUND_DEPOSIT: i64 = 300;
pub const GENESIS_OWNER: &str = "Coinbase Faucet";
pub const GENESIS_MONTH: u32 = 5;
pub const GENESIS_YEAR: u32 = 2018;
