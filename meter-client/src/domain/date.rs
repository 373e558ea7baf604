//! Calendar dates in the `YYYY-MM-DD` form used for new readings.
//!
//! Stored dates stay as the text that was written: files kept by older tools
//! can hold other forms, and those are carried through untouched.

use time::{macros::format_description, Date};

pub fn parse_iso_date(s: &str) -> Result<Date, time::error::Parse> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(s.trim(), &format)
}

pub fn format_iso_date(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}
