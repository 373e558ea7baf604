use meter_client::domain::{round_cents, Bill, MeterState};

use crate::config::TariffConfig;

/// Consumption for one band over one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandUsage {
    pub used: f64,
    pub rolled_over: bool,
}

/// Consumption between two cumulative readings of one band.
///
/// A drop in the cumulative value is read as exactly one wrap past
/// `rollover_max`. The corrected figure is not checked again, so a drop of
/// more than one wrap stays negative.
pub fn band_usage(reading: f64, previous: f64, rollover_max: f64) -> BandUsage {
    let used = reading - previous;
    if used < 0.0 {
        BandUsage {
            used: (reading + rollover_max) - previous,
            rolled_over: true,
        }
    } else {
        BandUsage {
            used,
            rolled_over: false,
        }
    }
}

/// Price the period between `prior` and the new cumulative readings.
pub fn compute_bill(
    tariff: &TariffConfig,
    meter_id: &str,
    date: &str,
    prior: &MeterState,
    day_reading: f64,
    night_reading: f64,
) -> Bill {
    let day = band_usage(day_reading, prior.day_cumulative, tariff.rollover_day);
    let night = band_usage(night_reading, prior.night_cumulative, tariff.rollover_night);

    let day_cost = round_cents(day.used * tariff.day_rate);
    let night_cost = round_cents(night.used * tariff.night_rate);

    Bill {
        meter_id: meter_id.to_string(),
        date: date.to_string(),
        day_used: day.used,
        night_used: night.used,
        day_cost,
        night_cost,
        total: round_cents(day_cost + night_cost),
        rollover_applied: day.rolled_over || night.rolled_over,
    }
}
