use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::FacadeError;
use nosh_core::models::{DatabaseEntry, Product};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Parse both ends of a period, rejecting reversed ranges.
pub(crate) fn parse_period(start: String, end: String) -> Result<(NaiveDate, NaiveDate)> {
    let start = parse_date(Some(start))?;
    let end = parse_date(Some(end))?;
    if end < start {
        anyhow::bail!("End date {end} is before start date {start}");
    }
    Ok((start, end))
}

/// Report a not-found / duplicate style failure and exit with status 2.
/// Storage failures are handed back to `main`, which exits with status 1.
pub(crate) fn exit_on_caller_error<T>(result: nosh_core::Result<T>, json: bool) -> Result<T> {
    match result {
        Err(e) if e.is_caller_error() => fail(json, &caller_message(&e)),
        other => other.map_err(Into::into),
    }
}

fn caller_message(err: &FacadeError) -> String {
    match err {
        FacadeError::NotFound { id } => format!("Entry {id} not found"),
        FacadeError::Duplicate { name, .. } => format!("Product '{name}' already exists"),
        other => other.to_string(),
    }
}

pub(crate) fn fail(json: bool, message: &str) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_product_table(products: &[Product]) {
    #[derive(Tabled)]
    struct ProductRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "kcal/unit")]
        energy: String,
        #[tabled(rename = "Barcode")]
        barcode: String,
    }

    let rows: Vec<ProductRow> = products
        .iter()
        .enumerate()
        .map(|(i, p)| ProductRow {
            idx: i + 1,
            id: p.id,
            name: truncate(&p.name, 35),
            energy: {
                let energy = p.energy;
                format!("{energy:.1}")
            },
            barcode: p.barcode.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_entry_table(entries: &[DatabaseEntry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Amount")]
        amount: i64,
        #[tabled(rename = "kcal/unit")]
        energy: String,
        #[tabled(rename = "kcal")]
        total: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id.clone(),
            name: truncate(&e.name, 35),
            amount: e.amount,
            energy: format!("{:.1}", e.energy),
            total: format!("{:.0}", no_neg_zero(e.total_energy())),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_parse_period() {
        let (start, end) =
            parse_period("2024-01-01".to_string(), "2024-01-07".to_string()).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());

        // A single day is a valid period
        assert!(parse_period("2024-01-01".to_string(), "2024-01-01".to_string()).is_ok());
    }

    #[test]
    fn test_parse_period_reversed() {
        let err = parse_period("2024-01-07".to_string(), "2024-01-01".to_string()).unwrap_err();
        assert!(err.to_string().contains("before start date"));
    }

    #[test]
    fn test_caller_message() {
        assert_eq!(
            caller_message(&FacadeError::NotFound { id: 8 }),
            "Entry 8 not found"
        );
        let dup = FacadeError::Duplicate {
            name: "Oats".to_string(),
            energy: 3.7,
            barcode: String::new(),
        };
        assert_eq!(caller_message(&dup), "Product 'Oats' already exists");
    }

    #[test]
    fn test_exit_on_caller_error_passes_through() {
        assert_eq!(exit_on_caller_error(Ok(5), false).unwrap(), 5);
        let storage: nosh_core::Result<()> = Err(storage_error());
        assert!(exit_on_caller_error(storage, false).is_err());
    }

    fn storage_error() -> FacadeError {
        nosh_core::db::Database::open(std::path::Path::new("/nonexistent-dir/x/nosh.db"))
            .err()
            .unwrap()
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("Entry 3 not found"), r#"{"error":"Entry 3 not found"}"#);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(5.0), 5.0);
        assert_eq!(no_neg_zero(-3.0), -3.0);
    }
}
