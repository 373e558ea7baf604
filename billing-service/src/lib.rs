pub mod billing;
pub mod config;
pub mod menu;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod store;
pub mod transform;

pub use billing::{BillingEngine, BillingError, ProcessResult};
pub use pipeline::{Envelope, Pipeline};
pub use store::{JsonFileBackend, LoadStatus, ReadingStore};
