use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use futures::StreamExt;
use meter_client::domain::{Bill, ReadingSubmission};

use crate::billing::{BillingEngine, BillingError, Clock, ProcessResult, SystemClock};
use crate::pipeline::{Envelope, PipelineError, Sink};
use crate::store::StateBackend;

/// Counts for one import run, plus the bills it issued in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub records: usize,
    pub new_meters: usize,
    pub bills: usize,
    pub rollovers: usize,
    pub rejected: usize,
    pub issued: Vec<Bill>,
}

/// Feeds submissions into the billing engine one at a time, in stream order.
///
/// All access to the engine goes through one mutex, so no two submissions
/// ever read and write the same meter state concurrently. Invalid records
/// are counted and skipped; a persistence failure ends the run.
pub struct BillingSink<B, C = SystemClock> {
    engine: Arc<Mutex<BillingEngine<B, C>>>,
}

impl<B, C> BillingSink<B, C> {
    pub fn new(engine: Arc<Mutex<BillingEngine<B, C>>>) -> Self {
        Self { engine }
    }
}

#[async_trait::async_trait]
impl<B, C> Sink<ReadingSubmission> for BillingSink<B, C>
where
    B: StateBackend + Send + 'static,
    C: Clock + Send + 'static,
{
    type Output = ImportSummary;

    async fn run<S>(&self, mut input: S) -> Result<Self::Output, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<ReadingSubmission>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut summary = ImportSummary::default();

        while let Some(item) = input.next().await {
            summary.records += 1;
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping reading rejected upstream");
                    summary.rejected += 1;
                    continue;
                }
            };

            let outcome = {
                let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
                engine.submit(&env.payload)
            };

            match outcome {
                Ok(ProcessResult::NewCounter { meter_id }) => {
                    tracing::info!(origin = %env.origin, meter_id = %meter_id, "baseline reading stored");
                    summary.new_meters += 1;
                }
                Ok(ProcessResult::Processed { bill, rollover_applied }) => {
                    summary.bills += 1;
                    if rollover_applied {
                        summary.rollovers += 1;
                    }
                    summary.issued.push(bill);
                }
                Err(BillingError::InvalidInput(msg)) => {
                    tracing::warn!(origin = %env.origin, error = %msg, "skipping invalid reading");
                    summary.rejected += 1;
                    continue;
                }
                Err(e @ BillingError::PersistenceFailure(_)) => {
                    tracing::error!(origin = %env.origin, error = %e, "import stopped");
                    return Err(PipelineError::Sink(format!("{}: {e}", env.origin)));
                }
            }

            if let Ok(dur) = SystemTime::now().duration_since(env.received_at) {
                metrics::histogram!("import_reading_latency_seconds").record(dur.as_secs_f64());
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::FixedClock;
    use crate::config::TariffConfig;
    use crate::pipeline::{EnvelopeStream, Pipeline, Source};
    use crate::store::{MemoryBackend, ReadingStore};
    use crate::transform::ReadingValidation;
    use time::macros::datetime;

    struct Submissions(Vec<ReadingSubmission>);

    #[async_trait::async_trait]
    impl Source<ReadingSubmission> for Submissions {
        async fn stream(&self) -> EnvelopeStream<ReadingSubmission> {
            let items: Vec<_> = self
                .0
                .iter()
                .cloned()
                .enumerate()
                .map(|(i, s)| Ok(Envelope::new(s, format!("test:{}", i + 1))))
                .collect();
            Box::pin(futures::stream::iter(items))
        }
    }

    fn shared_engine(backend: MemoryBackend) -> Arc<Mutex<BillingEngine<MemoryBackend, FixedClock>>> {
        let (store, _) = ReadingStore::open(backend);
        Arc::new(Mutex::new(BillingEngine::with_clock(
            store,
            TariffConfig::default(),
            FixedClock(datetime!(2023-01-31 00:00:00 UTC)),
        )))
    }

    #[tokio::test]
    async fn import_bills_in_file_order_and_skips_invalid_rows() {
        let backend = MemoryBackend::default();
        let engine = shared_engine(backend.clone());

        let pipeline: Pipeline<_, ReadingSubmission, _> = Pipeline {
            source: Submissions(vec![
                ReadingSubmission::new("m-1", "1000", "500", Some("2023-01-01")),
                ReadingSubmission::new("m-1", "oops", "510", Some("2023-01-15")),
                ReadingSubmission::new("m-1", "1100", "600", Some("2023-02-01")),
                ReadingSubmission::new("m-1", "50", "620", Some("2023-03-01")),
            ]),
            transforms: vec![Arc::new(ReadingValidation)],
            sink: BillingSink::new(engine.clone()),
        };

        let summary = pipeline.run().await.unwrap();
        assert_eq!(summary.records, 4);
        assert_eq!(summary.new_meters, 1);
        assert_eq!(summary.bills, 2);
        assert_eq!(summary.rollovers, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.issued[0].total, 240.0);
        assert_eq!(summary.issued[1].day_used, 50.0 + 100.0 - 1100.0);

        let engine = engine.lock().unwrap();
        assert_eq!(engine.all_bills(), summary.issued.as_slice());
        assert_eq!(backend.snapshot().unwrap().bills.len(), 2);
    }

    #[tokio::test]
    async fn persistence_failure_aborts_import() {
        let backend = MemoryBackend::default();
        backend.fail_writes(true);

        let pipeline: Pipeline<_, ReadingSubmission, _> = Pipeline {
            source: Submissions(vec![
                ReadingSubmission::new("m-1", 1.0, 1.0, None),
                ReadingSubmission::new("m-2", 1.0, 1.0, None),
            ]),
            transforms: vec![],
            sink: BillingSink::new(shared_engine(backend)),
        };

        assert!(matches!(pipeline.run().await, Err(PipelineError::Sink(msg)) if msg.starts_with("test:1: ")));
    }
}
