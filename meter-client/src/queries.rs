use crate::domain::{round_cents, Bill};

/// Totals over every bill issued to one meter.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSummary {
    pub meter_id: String,
    pub bills: usize,
    pub day_used: f64,
    pub night_used: f64,
    pub total_cost: f64,
    pub rollovers: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

/// Bills for a single meter, in the order they were issued.
pub fn bills_for<'a>(bills: &'a [Bill], meter_id: &str) -> Vec<&'a Bill> {
    bills.iter().filter(|b| b.meter_id == meter_id).collect()
}

/// Aggregate consumption and cost for a single meter.
pub fn usage_summary(bills: &[Bill], meter_id: &str) -> UsageSummary {
    let mut summary = UsageSummary {
        meter_id: meter_id.to_string(),
        bills: 0,
        day_used: 0.0,
        night_used: 0.0,
        total_cost: 0.0,
        rollovers: 0,
        first_date: None,
        last_date: None,
    };

    for bill in bills_for(bills, meter_id) {
        summary.bills += 1;
        summary.day_used += bill.day_used;
        summary.night_used += bill.night_used;
        summary.total_cost += bill.total;
        if bill.rollover_applied {
            summary.rollovers += 1;
        }
        summary.first_date.get_or_insert_with(|| bill.date.clone());
        summary.last_date = Some(bill.date.clone());
    }

    summary.total_cost = round_cents(summary.total_cost);
    summary
}
