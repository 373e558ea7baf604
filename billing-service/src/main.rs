use anyhow::Result;
use billing_service::{
    billing::BillingEngine,
    config::AppConfig,
    menu, metrics_server, observability,
    store::{JsonFileBackend, LoadStatus, ReadingStore},
};
use std::io;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing("billing_service=warn");

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let (store, status) = ReadingStore::open(JsonFileBackend::new(&cfg.store.data_file));
    if let LoadStatus::Recovered { reason } = &status {
        println!("Warning: stored readings could not be loaded ({reason}); starting with an empty store.");
    }

    let mut engine = BillingEngine::new(store, cfg.tariff.clone());

    // The menu blocks on stdin; keep it off the runtime's worker threads.
    tokio::task::spawn_blocking(move || menu::run(&mut engine, io::stdin().lock(), io::stdout())).await??;

    Ok(())
}
