use std::path::PathBuf;

use meter_client::domain::ReadingSubmission;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Newline-delimited JSON readings.
///
/// Each non-blank line is an object `{"meter_id", "day", "night", "date"?}`;
/// `day` and `night` may be JSON numbers or strings. A line that does not
/// parse is reported and skipped, the rest of the file is still read.
pub struct ReadingsNdjsonFileSource {
    path: PathBuf,
}

impl ReadingsNdjsonFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source<ReadingSubmission> for ReadingsNdjsonFileSource {
    async fn stream(&self) -> EnvelopeStream<ReadingSubmission> {
        let path = self.path.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path).await {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open readings file: {e}")));
                    return;
                }
            };
            let mut lines = BufReader::new(file).lines();
            let mut line_no: u64 = 0;

            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(PipelineError::Source(format!("failed to read readings line: {e}")));
                        break;
                    }
                };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }

                let origin = format!("{}:{line_no}", path.display());
                match serde_json::from_str::<ReadingSubmission>(&line) {
                    Ok(submission) => {
                        yield Ok(Envelope::new(submission, origin));
                    }
                    Err(e) => {
                        metrics::counter!("readings_ndjson_parse_errors_total").increment(1);
                        yield Err(PipelineError::Source(format!("{origin}: invalid reading json: {e}")));
                    }
                }
            }
        };

        Box::pin(s)
    }
}
