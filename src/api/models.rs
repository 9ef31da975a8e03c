use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::chain::Chain;
use crate::feed::{FeedConnector, FeedRecord};
use crate::oracle::{PriceOracle, PriceRecord};

/// Shared application state: the chain engine plus the two oracle facades,
/// all over one storage. Handlers rely entirely on the components' own
/// locking.
pub struct AppState {
    pub chain: Arc<Chain>,
    pub prices: Arc<PriceOracle>,
    pub feeds: Arc<FeedConnector>,
}

/* ---------- Chain API models ---------- */

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub height: u64,
    #[serde(rename = "lastBlockTime")]
    pub last_block_time: i64,
}

#[derive(Serialize, Deserialize)]
pub struct BlockResponse {
    pub number: u64,
    pub timestamp: i64,
}

/* ---------- Price API models ---------- */

#[derive(Deserialize)]
pub struct PriceQuery {
    pub asset: String,
    pub timestamp: Option<i64>,
}

#[derive(Deserialize)]
pub struct PriceHistoryQuery {
    pub asset: String,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct InjectPriceQuery {
    pub asset: String,
    pub price: f64,
}

#[derive(Serialize, Deserialize)]
pub struct AllPricesResponse {
    pub prices: BTreeMap<String, PriceRecord>,
}

/* ---------- Feed API models ---------- */

#[derive(Deserialize)]
pub struct FeedQuery {
    pub name: String,
}

#[derive(Deserialize)]
pub struct FeedHistoryQuery {
    pub name: String,
    pub limit: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct AllFeedsResponse {
    pub feeds: BTreeMap<String, FeedRecord>,
}
