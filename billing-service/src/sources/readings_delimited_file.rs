use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use meter_client::domain::{RawReading, ReadingSubmission};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Delimited file of readings with a header row.
///
/// Expected header columns (by name):
/// - meter_id
/// - day (cumulative day-band reading)
/// - night (cumulative night-band reading)
/// - date (optional, `YYYY-MM-DD`; blank means "today")
///
/// `.csv` files are comma-separated, `.dat` files pipe-separated. Values are
/// passed on as text; numeric checks happen in validation.
pub struct ReadingsDelimitedFileSource {
    path: PathBuf,
    delimiter: u8,
    kind: &'static str,
}

impl ReadingsDelimitedFileSource {
    pub fn csv<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            kind: "CSV",
        }
    }

    pub fn dat<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b'|',
            kind: "DAT",
        }
    }
}

fn parse_optional_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn record_to_submission(
    record: &StringRecord,
    headers: &StringRecord,
    kind: &str,
) -> Result<ReadingSubmission, PipelineError> {
    let get = |name: &str| -> Result<&str, PipelineError> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .ok_or_else(|| PipelineError::Source(format!("missing column '{name}' in {kind} record")))
    };

    Ok(ReadingSubmission {
        meter_id: get("meter_id")?.trim().to_string(),
        day: RawReading::Text(get("day")?.trim().to_string()),
        night: RawReading::Text(get("night")?.trim().to_string()),
        date: get("date").ok().and_then(parse_optional_string),
    })
}

#[async_trait::async_trait]
impl Source<ReadingSubmission> for ReadingsDelimitedFileSource {
    async fn stream(&self) -> EnvelopeStream<ReadingSubmission> {
        // Blocking reader inside the stream; reading files are small and
        // consumed strictly in order.
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let kind = self.kind;
        let s = async_stream::try_stream! {
            let file = File::open(&path)
                .map_err(|e| PipelineError::Source(format!("failed to open {kind} file: {e}")))?;
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .from_reader(file);
            let headers = rdr
                .headers()
                .map_err(|e| PipelineError::Source(format!("failed to read {kind} headers: {e}")))?
                .clone();

            for result in rdr.records() {
                let record = result.map_err(|e| PipelineError::Source(format!(
                    "failed to read {kind} record: {e}"
                )))?;
                let line = record.position().map(|p| p.line()).unwrap_or_default();

                let submission = match record_to_submission(&record, &headers, kind) {
                    Ok(s) => s,
                    Err(e) => {
                        metrics::counter!("readings_delimited_parse_errors_total").increment(1);
                        Err(e)?
                    }
                };

                yield Envelope::new(submission, format!("{}:{line}", path.display()));
            }
        };

        Box::pin(s)
    }
}
