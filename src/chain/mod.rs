pub mod block;
pub mod model;
pub mod producer;

pub use block::{Block, BlockData};
pub use model::Chain;

/// Default block production interval in milliseconds.
pub const DEFAULT_BLOCK_TIME_MS: u64 = 1000;
