use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::chain::Chain;
use crate::state::Storage;

/// Maximum number of history points retained per series; older points are
/// discarded once the cap is exceeded.
pub const MAX_HISTORY_ENTRIES: usize = 1000;

/// Errors surfaced by ledger read paths. Absence is `Option::None`, never
/// an error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Persisted bytes for a series failed to decode.
    #[error("malformed record for series `{name}`")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The most recently written value for a series, independent of history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestRecord<V> {
    pub name: String,
    pub value: V,
    pub timestamp: i64,
    #[serde(default)]
    pub block: u64,
}

/// One historical point of a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint<V> {
    pub value: V,
    pub timestamp: i64,
    pub block: u64,
}

/// The bounded, time-ordered history of a series. Points are appended in
/// write order; ordering by timestamp is expected (writes happen in real
/// time) but not enforced on ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesHistory<V> {
    pub name: String,
    pub latest: Option<LatestRecord<V>>,
    pub points: Vec<SeriesPoint<V>>,
}

impl<V> SeriesHistory<V> {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            latest: None,
            points: Vec::new(),
        }
    }
}

/// Latest-plus-bounded-history storage for named series of `V`, persisted
/// into the shared [`Storage`] under `<prefix>:<name>:latest` and
/// `<prefix>:<name>:history`. Known series names are tracked in an explicit
/// index rather than recovered by scanning storage keys.
pub struct SeriesLedger<V> {
    prefix: &'static str,
    store: Arc<Storage>,
    chain: Option<Arc<Chain>>,
    names: RwLock<BTreeSet<String>>,
    _value: std::marker::PhantomData<fn() -> V>,
}

impl<V> SeriesLedger<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// `chain` is the height source for stamping writes; `None` stamps
    /// every point with height 0 (the degraded, chainless path).
    pub fn new(prefix: &'static str, store: Arc<Storage>, chain: Option<Arc<Chain>>) -> Self {
        Self {
            prefix,
            store,
            chain,
            names: RwLock::new(BTreeSet::new()),
            _value: std::marker::PhantomData,
        }
    }

    fn latest_key(&self, name: &str) -> String {
        format!("{}:{}:latest", self.prefix, name)
    }

    fn history_key(&self, name: &str) -> String {
        format!("{}:{}:history", self.prefix, name)
    }

    /// Write a new value: persist it as the series' latest record and
    /// append it to the history, truncating to the newest
    /// [`MAX_HISTORY_ENTRIES`] points.
    ///
    /// A history that fails to decode is replaced with a fresh one so the
    /// write never fails on old corruption; the reset is logged.
    pub fn set_latest(&self, name: &str, value: V) -> LatestRecord<V> {
        let block = self.chain.as_ref().map_or(0, |c| c.height());
        let timestamp = chrono::Utc::now().timestamp();

        let record = LatestRecord {
            name: name.to_string(),
            value: value.clone(),
            timestamp,
            block,
        };
        let encoded = serde_json::to_vec(&record).expect("latest record serializes");
        self.store.set(&self.latest_key(name), encoded);

        let mut history = match self.store.get(&self.history_key(name)) {
            Some(bytes) => match serde_json::from_slice::<SeriesHistory<V>>(&bytes) {
                Ok(history) => history,
                Err(err) => {
                    warn!("resetting undecodable history for series `{name}`: {err}");
                    SeriesHistory::empty(name)
                }
            },
            None => SeriesHistory::empty(name),
        };

        history.latest = Some(record.clone());
        history.points.push(SeriesPoint {
            value,
            timestamp,
            block,
        });
        if history.points.len() > MAX_HISTORY_ENTRIES {
            let excess = history.points.len() - MAX_HISTORY_ENTRIES;
            history.points.drain(..excess);
        }

        let encoded = serde_json::to_vec(&history).expect("history serializes");
        self.store.set(&self.history_key(name), encoded);

        let mut names = self.names.write().expect("ledger index lock poisoned");
        names.insert(name.to_string());

        record
    }

    /// The latest record for `name`, or `None` if the series is unknown.
    pub fn get_latest(&self, name: &str) -> Result<Option<LatestRecord<V>>, LedgerError> {
        let Some(bytes) = self.store.get(&self.latest_key(name)) else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| LedgerError::Decode {
                name: name.to_string(),
                source,
            })
    }

    /// The full history document for `name`, or `None` if none exists.
    pub fn get_history(&self, name: &str) -> Result<Option<SeriesHistory<V>>, LedgerError> {
        let Some(bytes) = self.store.get(&self.history_key(name)) else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| LedgerError::Decode {
                name: name.to_string(),
                source,
            })
    }

    /// The point with the greatest timestamp <= `timestamp`, found by
    /// binary search over the (assumed-ordered) history. `None` when every
    /// point is later than `timestamp` or no history exists.
    pub fn get_at(
        &self,
        name: &str,
        timestamp: i64,
    ) -> Result<Option<SeriesPoint<V>>, LedgerError> {
        let Some(history) = self.get_history(name)? else {
            return Ok(None);
        };
        let idx = history.points.partition_point(|p| p.timestamp <= timestamp);
        if idx == 0 {
            return Ok(None);
        }
        Ok(Some(history.points[idx - 1].clone()))
    }

    /// All points with `from <= timestamp <= to`, in stored order. An
    /// unknown series yields an empty vec, not an error.
    pub fn get_range(
        &self,
        name: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<SeriesPoint<V>>, LedgerError> {
        let Some(history) = self.get_history(name)? else {
            return Ok(Vec::new());
        };
        Ok(history
            .points
            .into_iter()
            .filter(|p| p.timestamp >= from && p.timestamp <= to)
            .collect())
    }

    /// Every known series name mapped to its latest record. Series whose
    /// latest record no longer decodes are skipped.
    pub fn list_all(&self) -> BTreeMap<String, LatestRecord<V>> {
        let names = {
            let names = self.names.read().expect("ledger index lock poisoned");
            names.iter().cloned().collect::<Vec<_>>()
        };

        let mut all = BTreeMap::new();
        for name in names {
            if let Ok(Some(record)) = self.get_latest(&name) {
                all.insert(name, record);
            }
        }
        all
    }
}
