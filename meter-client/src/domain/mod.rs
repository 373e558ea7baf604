pub mod bill;
pub mod date;
pub mod meter_state;
pub mod reading;

pub use bill::{round_cents, Bill};
pub use date::{format_iso_date, parse_iso_date};
pub use meter_state::MeterState;
pub use reading::{RawReading, ReadingError, ReadingSubmission};
