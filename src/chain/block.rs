use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single block in the simulated chain. Immutable once created; the
/// engine replaces the latest block each tick rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub timestamp: i64, // Unix timestamp (UTC, whole seconds)
    pub data: BlockData,
}

/// Opaque auxiliary data carried by a block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockData {
    #[serde(rename = "stateUpdates", default, skip_serializing_if = "HashMap::is_empty")]
    pub state_updates: HashMap<String, String>,
}

impl Block {
    /// Create a block with the given number, stamped with the current time.
    pub fn new(number: u64) -> Self {
        Self {
            number,
            timestamp: Utc::now().timestamp(),
            data: BlockData::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Block;

    #[test]
    fn new_block_carries_number_and_recent_timestamp() {
        let now = chrono::Utc::now().timestamp();
        let b = Block::new(7);
        assert_eq!(b.number, 7);
        assert!((b.timestamp - now).abs() <= 1);
        assert!(b.data.state_updates.is_empty());
    }
}
