use anyhow::{bail, Result};
use billing_service::{
    billing::BillingEngine,
    config::{AppConfig, TariffConfig},
    observability,
    pipeline::{Pipeline, Source},
    sinks::{BillingSink, ImportSummary},
    sources::{ReadingsDelimitedFileSource, ReadingsNdjsonFileSource},
    store::{JsonFileBackend, MemoryBackend, ReadingStore, StateBackend},
    transform,
};
use meter_client::domain::ReadingSubmission;
use std::{
    env,
    path::Path,
    sync::{Arc, Mutex},
};

/// Bill a file of meter readings in one pass.
///
/// Usage:
///   import_readings <readings.csv|readings.dat|readings.ndjson> [--dry-run]
///
/// With `--dry-run` the data file is read but never written.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing("billing_service=info");

    let args: Vec<String> = env::args().skip(1).collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let files: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let [file_path] = files.as_slice() else {
        bail!("usage: import_readings <readings.csv|readings.dat|readings.ndjson> [--dry-run]");
    };

    // Load configuration (BILLING_CONFIG can point at a non-default data file).
    let cfg = AppConfig::load()?;
    let backend = JsonFileBackend::new(&cfg.store.data_file);

    let summary = if dry_run {
        let (state, _) = ReadingStore::load(&backend);
        import(MemoryBackend::seeded(state), cfg.tariff.clone(), Path::new(file_path.as_str())).await?
    } else {
        import(backend, cfg.tariff.clone(), Path::new(file_path.as_str())).await?
    };

    for bill in &summary.issued {
        println!(
            "{}  {}  day {} night {}  total {:.2}{}",
            bill.date,
            bill.meter_id,
            bill.day_used,
            bill.night_used,
            bill.total,
            if bill.rollover_applied { "  (rollover)" } else { "" }
        );
    }
    tracing::info!(
        records = summary.records,
        new_meters = summary.new_meters,
        bills = summary.bills,
        rollovers = summary.rollovers,
        rejected = summary.rejected,
        dry_run,
        "import finished"
    );

    Ok(())
}

async fn import<B>(backend: B, tariff: TariffConfig, path: &Path) -> Result<ImportSummary>
where
    B: StateBackend + Send + 'static,
{
    let (store, _) = ReadingStore::open(backend);
    let engine = Arc::new(Mutex::new(BillingEngine::new(store, tariff)));
    let sink = BillingSink::new(engine);

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
    let summary = match ext.as_str() {
        "csv" => run(ReadingsDelimitedFileSource::csv(path), sink).await?,
        "dat" => run(ReadingsDelimitedFileSource::dat(path), sink).await?,
        "ndjson" | "jsonl" => run(ReadingsNdjsonFileSource::new(path), sink).await?,
        other => bail!("unsupported readings file extension '{other}' (expected csv, dat, ndjson or jsonl)"),
    };
    Ok(summary)
}

async fn run<S, B>(source: S, sink: BillingSink<B>) -> Result<ImportSummary>
where
    S: Source<ReadingSubmission> + 'static,
    B: StateBackend + Send + 'static,
{
    let pipeline: Pipeline<_, ReadingSubmission, _> = Pipeline {
        source,
        transforms: vec![Arc::new(transform::ReadingValidation)],
        sink,
    };

    Ok(pipeline.run().await?)
}
