//! Billing Engine: turns a new pair of cumulative readings into a bill.
//!
//! The first reading for a meter only sets a baseline. Every later reading is
//! priced against the stored state it replaces, with a single-wrap rollover
//! correction per band (see [`charge::band_usage`]). Each call runs
//! validate, compute, mutate, then persist before returning. A failed persist
//! rolls the in-memory store back and is reported as
//! [`BillingError::PersistenceFailure`].

pub mod charge;
pub mod clock;
pub mod event;

use meter_client::{
    domain::{format_iso_date, Bill, MeterState, RawReading, ReadingSubmission},
    queries::{self, UsageSummary},
};

use crate::config::TariffConfig;
use crate::store::{ReadingStore, StateBackend, StoreError};
use crate::transform::{validate_submission, ValidReading};

pub use clock::{Clock, FixedClock, SystemClock};
pub use event::{EventAction, ProcessingEvent};

#[derive(thiserror::Error, Debug)]
pub enum BillingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("reading not recorded, failed to persist: {0}")]
    PersistenceFailure(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// First reading for the meter; stored as its baseline, nothing billed.
    NewCounter { meter_id: String },
    Processed { bill: Bill, rollover_applied: bool },
}

impl ProcessResult {
    pub fn meter_id(&self) -> &str {
        match self {
            Self::NewCounter { meter_id } => meter_id,
            Self::Processed { bill, .. } => &bill.meter_id,
        }
    }
}

pub struct BillingEngine<B, C = SystemClock> {
    store: ReadingStore<B>,
    tariff: TariffConfig,
    clock: C,
    log: Vec<ProcessingEvent>,
}

impl<B: StateBackend> BillingEngine<B, SystemClock> {
    pub fn new(store: ReadingStore<B>, tariff: TariffConfig) -> Self {
        Self::with_clock(store, tariff, SystemClock)
    }
}

impl<B: StateBackend, C: Clock> BillingEngine<B, C> {
    pub fn with_clock(store: ReadingStore<B>, tariff: TariffConfig, clock: C) -> Self {
        Self {
            store,
            tariff,
            clock,
            log: Vec::new(),
        }
    }

    /// Record a reading for `meter_id`; bills it when the meter is already known.
    ///
    /// `date` defaults to the clock's current date.
    pub fn process(
        &mut self,
        meter_id: &str,
        day_reading: impl Into<RawReading>,
        night_reading: impl Into<RawReading>,
        date: Option<&str>,
    ) -> Result<ProcessResult, BillingError> {
        self.submit(&ReadingSubmission::new(meter_id, day_reading, night_reading, date))
    }

    pub fn submit(&mut self, submission: &ReadingSubmission) -> Result<ProcessResult, BillingError> {
        let reading = match validate_submission(submission) {
            Ok(r) => r,
            Err(e) => {
                metrics::counter!("billing_invalid_input_total").increment(1);
                tracing::warn!(meter_id = %submission.meter_id, error = %e, "reading rejected");
                return Err(e);
            }
        };
        self.apply(reading)
    }

    fn apply(&mut self, reading: ValidReading) -> Result<ProcessResult, BillingError> {
        let date = format_iso_date(reading.date.unwrap_or_else(|| self.clock.today()));
        let meter_id = reading.meter_id;
        let next = MeterState {
            day_cumulative: reading.day,
            night_cumulative: reading.night,
            last_date: date.clone(),
        };

        let Some(prior) = self.store.get(&meter_id).cloned() else {
            self.store.upsert(&meter_id, next);
            self.commit(&meter_id, None, false)?;

            metrics::counter!("billing_new_meters_total").increment(1);
            tracing::info!(meter_id = %meter_id, "new meter registered");
            return Ok(ProcessResult::NewCounter { meter_id });
        };

        let bill = charge::compute_bill(&self.tariff, &meter_id, &date, &prior, reading.day, reading.night);
        let rollover_applied = bill.rollover_applied;

        // The stored baseline is always the raw new reading, never the corrected one.
        self.store.upsert(&meter_id, next);
        self.store.append_bill(bill.clone());
        self.commit(&meter_id, Some(prior), true)?;

        self.log.push(ProcessingEvent::processed(self.clock.now(), bill.clone()));

        metrics::counter!("billing_bills_issued_total").increment(1);
        if rollover_applied {
            metrics::counter!("billing_rollover_applied_total").increment(1);
            tracing::warn!(
                meter_id = %meter_id,
                day_used = bill.day_used,
                night_used = bill.night_used,
                "reading below previous value, rollover applied"
            );
        }
        tracing::info!(meter_id = %meter_id, total = bill.total, "bill issued");

        Ok(ProcessResult::Processed {
            bill,
            rollover_applied,
        })
    }

    /// Persist, undoing this call's mutation if the write fails.
    fn commit(&mut self, meter_id: &str, prior: Option<MeterState>, billed: bool) -> Result<(), BillingError> {
        if let Err(e) = self.store.persist() {
            self.store.restore(meter_id, prior);
            if billed {
                self.store.pop_bill();
            }
            metrics::counter!("billing_persistence_failures_total").increment(1);
            tracing::error!(meter_id = %meter_id, error = %e, "failed to persist reading store");
            return Err(e.into());
        }
        Ok(())
    }

    pub fn history_for(&self, meter_id: &str) -> Vec<&Bill> {
        self.store.bills_for(meter_id)
    }

    pub fn all_bills(&self) -> &[Bill] {
        self.store.bills()
    }

    pub fn processing_log(&self) -> &[ProcessingEvent] {
        &self.log
    }

    pub fn usage_summary(&self, meter_id: &str) -> UsageSummary {
        queries::usage_summary(self.store.bills(), meter_id)
    }

    pub fn tariff(&self) -> &TariffConfig {
        &self.tariff
    }

    pub fn store(&self) -> &ReadingStore<B> {
        &self.store
    }
}
