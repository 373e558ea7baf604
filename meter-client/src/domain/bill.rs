use serde::{Deserialize, Serialize};

/// Immutable record of one billing period for one meter.
///
/// `date` is the text stored with the bill. Bills issued here use
/// `YYYY-MM-DD`; bills loaded from older files keep whatever was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "counter_id")]
    pub meter_id: String,
    pub date: String,
    pub day_used: f64,
    pub night_used: f64,
    pub day_cost: f64,
    pub night_cost: f64,
    pub total: f64,
    // Files written before the flag existed omit it.
    #[serde(default)]
    pub rollover_applied: bool,
}

/// Round a monetary amount to two decimal places, ties to even.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round_ties_even() / 100.0
}
