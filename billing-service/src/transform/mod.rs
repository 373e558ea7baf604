use meter_client::domain::{parse_iso_date, ReadingSubmission};
use time::Date;

use crate::billing::BillingError;
use crate::pipeline::{Envelope, PipelineError, Transform};

/// A submission whose values have all been checked and converted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReading {
    pub meter_id: String,
    pub day: f64,
    pub night: f64,
    pub date: Option<Date>,
}

/// Pure validation of a `ReadingSubmission`.
///
/// Rules:
/// - meter id must not be blank; it is kept exactly as given.
/// - day and night must convert to finite, non-negative numbers.
/// - date, when given, must be a `YYYY-MM-DD` calendar date.
pub fn validate_submission(sub: &ReadingSubmission) -> Result<ValidReading, BillingError> {
    if sub.meter_id.trim().is_empty() {
        return Err(BillingError::InvalidInput("meter id must not be empty".to_string()));
    }

    let day = sub
        .day
        .to_value()
        .map_err(|e| BillingError::InvalidInput(format!("day reading: {e}")))?;
    let night = sub
        .night
        .to_value()
        .map_err(|e| BillingError::InvalidInput(format!("night reading: {e}")))?;

    let date = match sub.date.as_deref() {
        Some(d) => Some(parse_iso_date(d).map_err(|e| {
            BillingError::InvalidInput(format!("date '{d}' is not a YYYY-MM-DD calendar date: {e}"))
        })?),
        None => None,
    };

    Ok(ValidReading {
        meter_id: sub.meter_id.clone(),
        day,
        night,
        date,
    })
}

/// Rejects invalid submissions before they reach the billing sink.
#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<ReadingSubmission, ReadingSubmission> for ReadingValidation {
    async fn apply(
        &self,
        input: Envelope<ReadingSubmission>,
    ) -> Result<Envelope<ReadingSubmission>, PipelineError> {
        match validate_submission(&input.payload) {
            Ok(_) => Ok(input),
            Err(e) => {
                metrics::counter!("validation_readings_rejected_total").increment(1);
                Err(PipelineError::Transform(format!("{}: {e}", input.origin)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn envelope(sub: ReadingSubmission) -> Envelope<ReadingSubmission> {
        Envelope {
            payload: sub,
            received_at: std::time::SystemTime::now(),
            origin: "readings.csv:2".to_string(),
        }
    }

    #[test]
    fn reading_validation_accepts_valid_submission() {
        let sub = ReadingSubmission::new("counter1", "1100", 600.0, Some("2023-01-02"));

        let valid = validate_submission(&sub).unwrap();
        assert_eq!(
            valid,
            ValidReading {
                meter_id: "counter1".to_string(),
                day: 1100.0,
                night: 600.0,
                date: Some(date!(2023-01-02)),
            }
        );
    }

    #[test]
    fn reading_validation_keeps_meter_id_as_given() {
        let sub = ReadingSubmission::new(" counter1 ", 1.0, 2.0, None);
        assert_eq!(validate_submission(&sub).unwrap().meter_id, " counter1 ");
    }

    #[test]
    fn reading_validation_leaves_missing_date_unset() {
        let sub = ReadingSubmission::new("counter1", 1.0, 2.0, None);
        assert_eq!(validate_submission(&sub).unwrap().date, None);
    }

    #[test]
    fn reading_validation_rejects_blank_meter_id() {
        let sub = ReadingSubmission::new("   ", 1.0, 2.0, None);
        assert!(matches!(validate_submission(&sub), Err(BillingError::InvalidInput(_))));
    }

    #[test]
    fn reading_validation_rejects_non_numeric_values() {
        let day = ReadingSubmission::new("counter1", "abc", 600.0, None);
        let night = ReadingSubmission::new("counter1", 1100.0, "1,5", None);
        let nan = ReadingSubmission::new("counter1", f64::NAN, 600.0, None);

        for sub in [day, night, nan] {
            assert!(matches!(validate_submission(&sub), Err(BillingError::InvalidInput(_))));
        }
    }

    #[test]
    fn reading_validation_rejects_bad_dates() {
        for d in ["2023-02-30", "yesterday", ""] {
            let sub = ReadingSubmission::new("counter1", 1.0, 2.0, Some(d));
            assert!(matches!(validate_submission(&sub), Err(BillingError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn transform_reports_origin_of_rejected_record() {
        let t = ReadingValidation;
        let res = t
            .apply(envelope(ReadingSubmission::new("counter1", "x", 1.0, None)))
            .await;

        match res {
            Err(PipelineError::Transform(msg)) => assert!(msg.starts_with("readings.csv:2: ")),
            other => panic!("expected transform error, got {other:?}"),
        }

        let ok = t.apply(envelope(ReadingSubmission::new("counter1", "1", 1.0, None))).await;
        assert!(ok.is_ok());
    }
}
