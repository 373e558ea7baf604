//! Reading Store: last accepted readings per meter plus the append-only bill list.
//!
//! The store keeps the whole state in memory and hands it to a [`StateBackend`]
//! as one document on every [`ReadingStore::persist`]. Loading never fails the
//! caller: a missing document is an empty store, and a document that cannot be
//! read or decoded is reported as [`LoadStatus::Recovered`] and replaced by an
//! empty store.

pub mod json_file;
pub mod memory;

use std::{collections::BTreeMap, io, path::PathBuf};

use meter_client::domain::{Bill, MeterState};
use serde::{Deserialize, Serialize};

pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;

/// Everything that is persisted, in the on-disk shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub counters: BTreeMap<String, MeterState>,
    pub bills: Vec<Bill>,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed reading store {}: {source}", path.display())]
    Malformed { path: PathBuf, source: serde_json::Error },
    #[error("failed to encode reading store: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable home for a [`StoreState`].
pub trait StateBackend {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<StoreState>, StoreError>;

    /// Replace the persisted state as a whole.
    fn save(&self, state: &StoreState) -> Result<(), StoreError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loaded { meters: usize, bills: usize },
    Missing,
    Recovered { reason: String },
}

pub struct ReadingStore<B> {
    backend: B,
    state: StoreState,
}

impl<B: StateBackend> ReadingStore<B> {
    /// Read persisted state, falling back to an empty state on any failure.
    pub fn load(backend: &B) -> (StoreState, LoadStatus) {
        match backend.load() {
            Ok(Some(state)) => {
                let status = LoadStatus::Loaded {
                    meters: state.counters.len(),
                    bills: state.bills.len(),
                };
                tracing::info!(
                    location = %backend.location(),
                    meters = state.counters.len(),
                    bills = state.bills.len(),
                    "reading store loaded"
                );
                (state, status)
            }
            Ok(None) => {
                tracing::info!(location = %backend.location(), "no reading store yet, starting empty");
                (StoreState::default(), LoadStatus::Missing)
            }
            Err(e) => {
                tracing::warn!(
                    location = %backend.location(),
                    error = %e,
                    "reading store unreadable, starting empty"
                );
                metrics::counter!("reading_store_recovered_total").increment(1);
                (
                    StoreState::default(),
                    LoadStatus::Recovered {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    pub fn open(backend: B) -> (Self, LoadStatus) {
        let (state, status) = Self::load(&backend);
        (Self { backend, state }, status)
    }

    pub fn get(&self, meter_id: &str) -> Option<&MeterState> {
        self.state.counters.get(meter_id)
    }

    /// Insert or replace a meter's state, returning what it replaced.
    pub fn upsert(&mut self, meter_id: &str, state: MeterState) -> Option<MeterState> {
        self.state.counters.insert(meter_id.to_string(), state)
    }

    pub fn append_bill(&mut self, bill: Bill) {
        self.state.bills.push(bill);
    }

    pub fn persist(&self) -> Result<(), StoreError> {
        self.backend.save(&self.state)
    }

    pub fn bills_for(&self, meter_id: &str) -> Vec<&Bill> {
        meter_client::queries::bills_for(&self.state.bills, meter_id)
    }

    pub fn bills(&self) -> &[Bill] {
        &self.state.bills
    }

    pub fn counters(&self) -> &BTreeMap<String, MeterState> {
        &self.state.counters
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// Put a meter back to `prior` (removing it when there was none).
    pub(crate) fn restore(&mut self, meter_id: &str, prior: Option<MeterState>) {
        match prior {
            Some(state) => {
                self.state.counters.insert(meter_id.to_string(), state);
            }
            None => {
                self.state.counters.remove(meter_id);
            }
        }
    }

    pub(crate) fn pop_bill(&mut self) -> Option<Bill> {
        self.state.bills.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meter(day: f64, night: f64) -> MeterState {
        MeterState {
            day_cumulative: day,
            night_cumulative: night,
            last_date: "2023-01-01".to_string(),
        }
    }

    fn bill(meter_id: &str, total: f64) -> Bill {
        Bill {
            meter_id: meter_id.to_string(),
            date: "2023-01-02".to_string(),
            day_used: 1.0,
            night_used: 1.0,
            day_cost: 1.5,
            night_cost: 0.9,
            total,
            rollover_applied: false,
        }
    }

    #[test]
    fn missing_state_opens_empty() {
        let (store, status) = ReadingStore::open(MemoryBackend::default());
        assert_eq!(status, LoadStatus::Missing);
        assert!(store.counters().is_empty());
        assert!(store.bills().is_empty());
    }

    #[test]
    fn upsert_replaces_and_returns_previous() {
        let (mut store, _) = ReadingStore::open(MemoryBackend::default());
        assert!(store.upsert("m-1", meter(1.0, 2.0)).is_none());

        let prev = store.upsert("m-1", meter(3.0, 4.0));
        assert_eq!(prev, Some(meter(1.0, 2.0)));
        assert_eq!(store.get("m-1"), Some(&meter(3.0, 4.0)));
        assert!(store.get("m-2").is_none());
    }

    #[test]
    fn bills_for_keeps_insertion_order() {
        let (mut store, _) = ReadingStore::open(MemoryBackend::default());
        store.append_bill(bill("a", 1.0));
        store.append_bill(bill("b", 2.0));
        store.append_bill(bill("a", 3.0));

        let totals: Vec<f64> = store.bills_for("a").iter().map(|b| b.total).collect();
        assert_eq!(totals, vec![1.0, 3.0]);
        assert_eq!(store.bills().len(), 3);
    }

    #[test]
    fn persist_hands_full_state_to_backend() {
        let backend = MemoryBackend::default();
        let (mut store, _) = ReadingStore::open(backend.clone());
        store.upsert("m-1", meter(10.0, 5.0));
        store.append_bill(bill("m-1", 4.2));
        store.persist().unwrap();

        let saved = backend.snapshot().unwrap();
        assert_eq!(saved.counters.len(), 1);
        assert_eq!(saved.bills.len(), 1);
        assert_eq!(&saved, store.state());
    }

    #[test]
    fn unreadable_state_is_recovered_as_empty() {
        let backend = MemoryBackend::default();
        backend.fail_loads(true);

        let (store, status) = ReadingStore::open(backend);
        assert!(matches!(status, LoadStatus::Recovered { .. }));
        assert!(store.counters().is_empty());
    }

    #[test]
    fn restore_undoes_upsert() {
        let (mut store, _) = ReadingStore::open(MemoryBackend::default());
        store.upsert("old", meter(1.0, 1.0));

        let prior = store.upsert("old", meter(2.0, 2.0));
        store.restore("old", prior);
        assert_eq!(store.get("old"), Some(&meter(1.0, 1.0)));

        store.upsert("new", meter(5.0, 5.0));
        store.restore("new", None);
        assert!(store.get("new").is_none());
    }
}
