use std::collections::BTreeMap;
use std::sync::Arc;

use crate::chain::Chain;
use crate::ledger::{LatestRecord, LedgerError, SeriesLedger, SeriesHistory, SeriesPoint};
use crate::state::Storage;

/// Storage key prefix for the price series.
pub const PRICE_PREFIX: &str = "price";

/// Fallback starting price for assets without an entry in the default table.
pub const FALLBACK_BASE_PRICE: f64 = 100.0;

pub type PriceRecord = LatestRecord<f64>;
pub type PricePoint = SeriesPoint<f64>;
pub type PriceHistory = SeriesHistory<f64>;

/// Mock price-feed oracle: a thin facade over the generic series ledger,
/// specialised to numeric prices keyed by asset symbol.
pub struct PriceOracle {
    ledger: SeriesLedger<f64>,
}

impl PriceOracle {
    pub fn new(store: Arc<Storage>, chain: Option<Arc<Chain>>) -> Self {
        Self {
            ledger: SeriesLedger::new(PRICE_PREFIX, store, chain),
        }
    }

    pub fn set_price(&self, asset: &str, price: f64) -> PriceRecord {
        self.ledger.set_latest(asset, price)
    }

    pub fn price(&self, asset: &str) -> Result<Option<PriceRecord>, LedgerError> {
        self.ledger.get_latest(asset)
    }

    pub fn price_at(&self, asset: &str, timestamp: i64) -> Result<Option<PricePoint>, LedgerError> {
        self.ledger.get_at(asset, timestamp)
    }

    pub fn history(&self, asset: &str) -> Result<Option<PriceHistory>, LedgerError> {
        self.ledger.get_history(asset)
    }

    pub fn history_range(
        &self,
        asset: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<PricePoint>, LedgerError> {
        self.ledger.get_range(asset, from, to)
    }

    pub fn all_prices(&self) -> BTreeMap<String, PriceRecord> {
        self.ledger.list_all()
    }

    /// Starting price for an asset with no explicit base: its current
    /// latest price if one exists, else a small default table, else a flat
    /// fallback.
    pub fn starting_price(&self, asset: &str) -> f64 {
        if let Ok(Some(record)) = self.price(asset) {
            return record.value;
        }
        match asset {
            "BTC" => 50_000.0,
            "ETH" => 3_000.0,
            "XRP" => 0.5,
            _ => FALLBACK_BASE_PRICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PriceOracle;
    use crate::state::Storage;
    use std::sync::Arc;

    fn oracle() -> PriceOracle {
        PriceOracle::new(Arc::new(Storage::new()), None)
    }

    #[test]
    fn starting_price_prefers_existing_latest() {
        let oracle = oracle();
        oracle.set_price("BTC", 12_345.0);
        assert_eq!(oracle.starting_price("BTC"), 12_345.0);
    }

    #[test]
    fn starting_price_falls_back_to_defaults() {
        let oracle = oracle();
        assert_eq!(oracle.starting_price("BTC"), 50_000.0);
        assert_eq!(oracle.starting_price("ETH"), 3_000.0);
        assert_eq!(oracle.starting_price("XRP"), 0.5);
        assert_eq!(oracle.starting_price("DOGE"), 100.0);
    }
}
