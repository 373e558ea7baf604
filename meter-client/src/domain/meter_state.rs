use serde::{Deserialize, Serialize};

/// Last accepted cumulative readings for one meter.
///
/// Persisted as `{"day": .., "night": .., "last_date": ".."}`. New states
/// always carry a `YYYY-MM-DD` date; older files may hold other text, which
/// is kept as read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterState {
    #[serde(rename = "day")]
    pub day_cumulative: f64,
    #[serde(rename = "night")]
    pub night_cumulative: f64,
    pub last_date: String,
}
