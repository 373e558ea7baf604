use meter_client::domain::Bill;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    ProcessCounter,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessCounter => "process_counter",
        }
    }
}

/// One entry in the session's processing log. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingEvent {
    pub event_id: String,
    pub timestamp: OffsetDateTime,
    pub action: EventAction,
    pub meter_id: String,
    pub bill: Bill,
}

impl ProcessingEvent {
    pub fn processed(timestamp: OffsetDateTime, bill: Bill) -> Self {
        Self {
            event_id: event_id(timestamp, &bill),
            timestamp,
            action: EventAction::ProcessCounter,
            meter_id: bill.meter_id.clone(),
            bill,
        }
    }
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_f64(hasher: &mut blake3::Hasher, v: f64) {
    hasher.update(&v.to_bits().to_le_bytes());
}

/// Content fingerprint of an event: equal inputs give equal ids.
fn event_id(timestamp: OffsetDateTime, bill: &Bill) -> String {
    let mut h = blake3::Hasher::new();
    h.update(&timestamp.unix_timestamp_nanos().to_le_bytes());
    hash_str(&mut h, &bill.meter_id);
    hash_str(&mut h, &bill.date);
    hash_f64(&mut h, bill.day_used);
    hash_f64(&mut h, bill.night_used);
    hash_f64(&mut h, bill.day_cost);
    hash_f64(&mut h, bill.night_cost);
    hash_f64(&mut h, bill.total);
    h.update(&[bill.rollover_applied as u8]);
    h.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn bill(total: f64) -> Bill {
        Bill {
            meter_id: "m-1".to_string(),
            date: "2023-01-02".to_string(),
            day_used: 100.0,
            night_used: 100.0,
            day_cost: 150.0,
            night_cost: 90.0,
            total,
            rollover_applied: false,
        }
    }

    #[test]
    fn event_id_is_deterministic() {
        let ts = datetime!(2023-01-02 10:00:00 UTC);
        let a = ProcessingEvent::processed(ts, bill(240.0));
        let b = ProcessingEvent::processed(ts, bill(240.0));

        assert_eq!(a.event_id, b.event_id);
        assert_eq!(a.event_id.len(), 64);
        assert_eq!(a.action.as_str(), "process_counter");
        assert_eq!(a.meter_id, "m-1");
    }

    #[test]
    fn event_id_changes_with_content_and_time() {
        let ts = datetime!(2023-01-02 10:00:00 UTC);
        let base = ProcessingEvent::processed(ts, bill(240.0));

        assert_ne!(base.event_id, ProcessingEvent::processed(ts, bill(240.01)).event_id);
        assert_ne!(
            base.event_id,
            ProcessingEvent::processed(datetime!(2023-01-02 10:00:01 UTC), bill(240.0)).event_id
        );
    }
}
