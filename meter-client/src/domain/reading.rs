use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ReadingError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("reading must be a finite number, got {0}")]
    NotFinite(f64),
    #[error("reading must be non-negative, got {0}")]
    Negative(f64),
}

/// A cumulative reading as submitted, before conversion.
///
/// Operators type text, import files may carry either JSON numbers or
/// strings; both must convert to a finite, non-negative real.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawReading {
    Number(f64),
    Text(String),
}

impl RawReading {
    pub fn to_value(&self) -> Result<f64, ReadingError> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ReadingError::NotANumber(s.clone()))?,
        };

        if !value.is_finite() {
            return Err(ReadingError::NotFinite(value));
        }
        if value < 0.0 {
            return Err(ReadingError::Negative(value));
        }

        Ok(value)
    }
}

impl From<f64> for RawReading {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for RawReading {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawReading {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// One unvalidated reading submission for a meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSubmission {
    pub meter_id: String,
    pub day: RawReading,
    pub night: RawReading,
    #[serde(default)]
    pub date: Option<String>,
}

impl ReadingSubmission {
    pub fn new(
        meter_id: impl Into<String>,
        day: impl Into<RawReading>,
        night: impl Into<RawReading>,
        date: Option<&str>,
    ) -> Self {
        Self {
            meter_id: meter_id.into(),
            day: day.into(),
            night: night.into(),
            date: date.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_readings_are_trimmed_and_parsed() {
        assert_eq!(RawReading::from(" 1100.5 ").to_value(), Ok(1100.5));
        assert_eq!(RawReading::from("1e3").to_value(), Ok(1000.0));
        assert_eq!(RawReading::from(42.0).to_value(), Ok(42.0));
    }

    #[test]
    fn non_numeric_text_is_rejected() {
        assert_eq!(
            RawReading::from("abc").to_value(),
            Err(ReadingError::NotANumber("abc".to_string()))
        );
        assert!(matches!(RawReading::from("").to_value(), Err(ReadingError::NotANumber(_))));
    }

    #[test]
    fn non_finite_and_negative_readings_are_rejected() {
        assert!(matches!(RawReading::from("NaN").to_value(), Err(ReadingError::NotFinite(_))));
        assert!(matches!(RawReading::from("inf").to_value(), Err(ReadingError::NotFinite(_))));
        assert!(matches!(RawReading::from(f64::INFINITY).to_value(), Err(ReadingError::NotFinite(_))));
        assert_eq!(RawReading::from(-0.5).to_value(), Err(ReadingError::Negative(-0.5)));
    }

    #[test]
    fn submission_accepts_numbers_or_strings() {
        let sub: ReadingSubmission =
            serde_json::from_str(r#"{"meter_id": "m-1", "day": 1100, "night": "600"}"#).unwrap();
        assert_eq!(sub.day, RawReading::Number(1100.0));
        assert_eq!(sub.night, RawReading::Text("600".to_string()));
        assert!(sub.date.is_none());
    }
}
