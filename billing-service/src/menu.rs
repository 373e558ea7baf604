//! Operator text menu over a [`BillingEngine`].
//!
//! Generic over its input and output so it can be driven from a terminal or
//! from a buffer. Input errors are reported and the loop continues; end of
//! input exits like option 3.

use std::io::{BufRead, Write};

use meter_client::domain::Bill;

use crate::billing::{BillingEngine, Clock, ProcessResult};
use crate::store::StateBackend;

pub fn run<B, C, R, W>(engine: &mut BillingEngine<B, C>, mut input: R, mut output: W) -> anyhow::Result<()>
where
    B: StateBackend,
    C: Clock,
    R: BufRead,
    W: Write,
{
    let tariff = engine.tariff();
    writeln!(output, "Dual-rate (day/night) meter billing")?;
    writeln!(
        output,
        "Tariff: day {} per kWh, night {} per kWh",
        tariff.day_rate, tariff.night_rate
    )?;

    loop {
        writeln!(output)?;
        writeln!(output, "Menu:")?;
        writeln!(output, "1. Enter meter readings")?;
        writeln!(output, "2. Show meter history")?;
        writeln!(output, "3. Exit")?;

        let Some(choice) = prompt(&mut input, &mut output, "Choose an option: ")? else {
            break;
        };

        let keep_going = match choice.trim() {
            "1" => submit_reading(engine, &mut input, &mut output)?,
            "2" => show_history(engine, &mut input, &mut output)?,
            "3" => {
                writeln!(output, "Goodbye.")?;
                return Ok(());
            }
            _ => {
                writeln!(output, "Invalid choice, try again")?;
                true
            }
        };
        if !keep_going {
            break;
        }
    }

    writeln!(output)?;
    Ok(())
}

/// `Ok(None)` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> anyhow::Result<Option<String>> {
    write!(output, "{message}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn submit_reading<B, C, R, W>(engine: &mut BillingEngine<B, C>, input: &mut R, output: &mut W) -> anyhow::Result<bool>
where
    B: StateBackend,
    C: Clock,
    R: BufRead,
    W: Write,
{
    let Some(meter_id) = prompt(input, output, "Meter ID: ")? else {
        return Ok(false);
    };
    let Some(day) = prompt(input, output, "Day reading (kWh): ")? else {
        return Ok(false);
    };
    let Some(night) = prompt(input, output, "Night reading (kWh): ")? else {
        return Ok(false);
    };
    let Some(date) = prompt(input, output, "Date (YYYY-MM-DD, blank for today): ")? else {
        return Ok(false);
    };
    let date = Some(date.trim()).filter(|d| !d.is_empty());

    match engine.process(&meter_id, day, night, date) {
        Ok(result) => {
            writeln!(output)?;
            writeln!(output, "Result:")?;
            writeln!(output, "Meter: {}", result.meter_id())?;
            match result {
                ProcessResult::NewCounter { .. } => {
                    writeln!(output, "New meter registered; this reading is its baseline.")?;
                }
                ProcessResult::Processed { bill, rollover_applied } => {
                    write_bill(output, &bill)?;
                    if rollover_applied {
                        writeln!(
                            output,
                            "WARNING: a reading was below the previous one, rollover correction applied."
                        )?;
                    }
                }
            }
        }
        Err(e) => writeln!(output, "Error: {e}")?,
    }

    Ok(true)
}

fn show_history<B, C, R, W>(engine: &BillingEngine<B, C>, input: &mut R, output: &mut W) -> anyhow::Result<bool>
where
    B: StateBackend,
    C: Clock,
    R: BufRead,
    W: Write,
{
    let Some(meter_id) = prompt(input, output, "Meter ID: ")? else {
        return Ok(false);
    };
    let history = engine.history_for(&meter_id);
    if history.is_empty() {
        writeln!(output, "No history for this meter")?;
        return Ok(true);
    }

    writeln!(output)?;
    writeln!(output, "History for meter {meter_id}:")?;
    for bill in history {
        writeln!(output)?;
        write_bill(output, bill)?;
        if bill.rollover_applied {
            writeln!(output, "(rollover correction applied)")?;
        }
    }

    let summary = engine.usage_summary(&meter_id);
    writeln!(output)?;
    writeln!(
        output,
        "{} bill(s), {} rollover(s): day {} kWh, night {} kWh, total cost {:.2}",
        summary.bills, summary.rollovers, summary.day_used, summary.night_used, summary.total_cost
    )?;

    Ok(true)
}

fn write_bill<W: Write>(output: &mut W, bill: &Bill) -> anyhow::Result<()> {
    writeln!(output, "Date: {}", bill.date)?;
    writeln!(output, "Used: day {} kWh, night {} kWh", bill.day_used, bill.night_used)?;
    writeln!(output, "Cost: day {:.2}, night {:.2}", bill.day_cost, bill.night_cost)?;
    writeln!(output, "Total: {:.2}", bill.total)?;
    Ok(())
}
