use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::DatabaseFacade;
use nosh_core::models::DateCalories;

use super::helpers::{no_neg_zero, parse_date, parse_period, print_entry_table};

pub(crate) fn cmd_day(facade: &DatabaseFacade, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let entries = facade.get_entries_for_day(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    println!("=== {date} ===\n");
    print_entry_table(&entries);

    let total = no_neg_zero(entries.iter().map(|e| e.total_energy()).sum::<f64>());
    println!("  TOTAL: {total:.0} kcal");

    Ok(())
}

pub(crate) fn cmd_period(
    facade: &DatabaseFacade,
    start: String,
    end: String,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct PeriodRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Calories")]
        calories: String,
    }

    let (start, end) = parse_period(start, end)?;
    let days = facade.get_period_calories(start, end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&days)?);
        return Ok(());
    }

    if days.is_empty() {
        eprintln!("No entries between {start} and {end}");
        process::exit(2);
    }

    let rows: Vec<PeriodRow> = days
        .iter()
        .map(|d| {
            let cal = no_neg_zero(d.energy);
            PeriodRow {
                date: d.date.to_string(),
                calories: format!("{cal:.0}"),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let average = average_per_logged_day(&days);
    println!("  AVERAGE: {average:.0} kcal over {} logged days", days.len());

    Ok(())
}

pub(crate) fn cmd_total(
    facade: &DatabaseFacade,
    start: String,
    end: String,
    json: bool,
) -> Result<()> {
    let (start, end) = parse_period(start, end)?;
    let total = facade.get_calories_per_day_in_period(start, end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&total)?);
        return Ok(());
    }

    let Some(total) = total.first() else {
        eprintln!("No entries between {start} and {end}");
        process::exit(2);
    };
    let cal = no_neg_zero(total.energy);
    println!("{start} to {end}: {cal:.0} kcal");

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn average_per_logged_day(days: &[DateCalories]) -> f64 {
    if days.is_empty() {
        return 0.0;
    }
    days.iter().map(|d| d.energy).sum::<f64>() / days.len() as f64
}
