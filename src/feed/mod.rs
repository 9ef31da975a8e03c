use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::chain::Chain;
use crate::ledger::{LatestRecord, LedgerError, SeriesLedger, SeriesHistory, SeriesPoint};
use crate::state::Storage;

/// Storage key prefix for the data-feed series.
pub const FEED_PREFIX: &str = "feed";

pub type FeedRecord = LatestRecord<Value>;
pub type FeedPoint = SeriesPoint<Value>;
pub type FeedHistory = SeriesHistory<Value>;

/// Mock external-data connector: the same series ledger as the price
/// oracle, carrying arbitrary JSON payloads instead of numbers.
pub struct FeedConnector {
    ledger: SeriesLedger<Value>,
}

impl FeedConnector {
    pub fn new(store: Arc<Storage>, chain: Option<Arc<Chain>>) -> Self {
        Self {
            ledger: SeriesLedger::new(FEED_PREFIX, store, chain),
        }
    }

    pub fn set_feed(&self, name: &str, data: Value) -> FeedRecord {
        self.ledger.set_latest(name, data)
    }

    pub fn feed(&self, name: &str) -> Result<Option<FeedRecord>, LedgerError> {
        self.ledger.get_latest(name)
    }

    pub fn history(&self, name: &str) -> Result<Option<FeedHistory>, LedgerError> {
        self.ledger.get_history(name)
    }

    pub fn all_feeds(&self) -> BTreeMap<String, FeedRecord> {
        self.ledger.list_all()
    }
}

#[cfg(test)]
mod tests {
    use super::FeedConnector;
    use crate::state::Storage;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn structured_payloads_roundtrip() {
        let feeds = FeedConnector::new(Arc::new(Storage::new()), None);
        feeds.set_feed("weather", json!({ "temp": 25, "humidity": 60 }));

        let record = feeds.feed("weather").unwrap().unwrap();
        assert_eq!(record.value["temp"], 25);
        assert_eq!(record.value["humidity"], 60);

        let history = feeds.history("weather").unwrap().unwrap();
        assert_eq!(history.points.len(), 1);
        assert!(feeds.all_feeds().contains_key("weather"));
    }
}
