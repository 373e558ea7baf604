pub mod domain;
pub mod queries;

pub use domain::{Bill, MeterState, RawReading, ReadingSubmission};
