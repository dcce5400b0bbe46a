//! CSV export and import of the consumption log.
//!
//! The format is one row per consumed entry:
//!
//! `Date,Name,Amount,Energy,Barcode`
//!
//! `Energy` is the energy per unit of the product the entry links to.
//! `Barcode` may be empty or left out entirely on import.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{FacadeError, Result};
use crate::facade::DatabaseFacade;
use crate::models::{CalendarDay, DATE_FORMAT, format_day};

const HEADER: [&str; 5] = ["Date", "Name", "Amount", "Energy", "Barcode"];

/// A single row read from a consumption log CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub date: NaiveDate,
    pub name: String,
    pub amount: i64,
    pub energy: f64,
    pub barcode: String,
}

/// What an import would do / did.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportSummary {
    pub rows_parsed: usize,
    pub products_created: usize,
    pub products_reused: usize,
    pub entries_logged: usize,
    pub dates_spanned: usize,
}

/// Write every entry of `[start, end]` to `writer`, by date then id.
///
/// Entries whose product no longer resolves are skipped. Returns the number
/// of rows written, not counting the header.
pub fn export_entries<W: Write>(
    facade: &DatabaseFacade,
    start: impl CalendarDay,
    end: impl CalendarDay,
    writer: W,
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;

    let mut written = 0;
    for entry in facade.get_entries_in_period(start, end)? {
        let product = match facade.get_product(entry.product_id) {
            Ok(product) => product,
            Err(FacadeError::NotFound { .. }) => {
                warn!(
                    id = entry.id,
                    product_id = entry.product_id,
                    "not exporting entry with missing product"
                );
                continue;
            }
            Err(e) => return Err(e),
        };
        wtr.write_record([
            format_day(entry.date),
            entry.name,
            entry.amount.to_string(),
            product.energy.to_string(),
            product.barcode,
        ])?;
        written += 1;
    }
    wtr.flush().map_err(csv::Error::from)?;

    debug!(rows = written, "exported consumption log");
    Ok(written)
}

/// Parse a consumption log CSV from any reader.
///
/// Headers are matched case-insensitively; `Barcode` is optional. Rows with
/// neither a date nor a name are skipped.
pub fn parse_entries_csv<R: Read>(reader: R) -> Result<Vec<CsvRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let col = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let required = |name: &str| {
        col(name).ok_or_else(|| FacadeError::InvalidRow {
            line: 1,
            reason: format!("missing required column: {name}"),
        })
    };

    let idx_date = required("Date")?;
    let idx_name = required("Name")?;
    let idx_amount = required("Amount")?;
    let idx_energy = required("Energy")?;
    let idx_barcode = col("Barcode");

    let mut rows = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let record = result?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let (date, name) = (field(idx_date), field(idx_name));
        if date.is_empty() && name.is_empty() {
            continue;
        }
        let invalid = |reason: String| FacadeError::InvalidRow { line, reason };

        if name.is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        let date = parse_date(date).ok_or_else(|| invalid(format!("cannot parse date '{date}'")))?;
        let amount = field(idx_amount);
        let amount: i64 = amount
            .parse()
            .map_err(|_| invalid(format!("amount '{amount}' is not a whole number")))?;
        let energy = field(idx_energy);
        let energy: f64 = energy
            .parse()
            .map_err(|_| invalid(format!("energy '{energy}' is not a number")))?;

        rows.push(CsvRow {
            date,
            name: name.to_string(),
            amount,
            energy,
            barcode: idx_barcode.map(field).unwrap_or_default().to_string(),
        });
    }

    Ok(rows)
}

/// Accepts `YYYY-MM-DD`, then `M/D/YYYY`, then `D.M.YYYY`.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    [DATE_FORMAT, "%m/%d/%Y", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Log parsed rows through the facade, creating products keyed on
/// `(name, energy, barcode)` as needed.
///
/// When `dry_run` is true nothing is written; the summary reports what would
/// have happened.
pub fn import_entries(
    facade: &mut DatabaseFacade,
    rows: &[CsvRow],
    dry_run: bool,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        rows_parsed: rows.len(),
        ..ImportSummary::default()
    };
    let mut dates = HashSet::new();
    // (name, energy bits, barcode) -> product id; 0 stands in for products a
    // dry run would have created
    let mut product_cache: HashMap<(String, u64, String), i64> = HashMap::new();

    for row in rows {
        dates.insert(row.date);

        let key = (row.name.clone(), row.energy.to_bits(), row.barcode.clone());
        let product_id = if let Some(&id) = product_cache.get(&key) {
            id
        } else {
            let id = if dry_run {
                let existing = facade
                    .database()
                    .products()
                    .find_existing_products(&row.name, row.energy, &row.barcode)?;
                match existing.first() {
                    Some(product) => {
                        summary.products_reused += 1;
                        product.id
                    }
                    None => {
                        summary.products_created += 1;
                        0
                    }
                }
            } else {
                let (product, created) =
                    facade.get_or_create_product(&row.name, row.energy, &row.barcode)?;
                if created {
                    summary.products_created += 1;
                } else {
                    summary.products_reused += 1;
                }
                product.id
            };
            product_cache.insert(key, id);
            id
        };

        if !dry_run {
            facade.insert_entry(row.amount, row.date, &row.name, row.energy, Some(product_id))?;
        }
        summary.entries_logged += 1;
    }

    summary.dates_spanned = dates.len();
    info!(
        rows = summary.rows_parsed,
        created = summary.products_created,
        reused = summary.products_reused,
        dry_run,
        "imported consumption log"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    const SAMPLE_CSV: &str = "\
Date,Name,Amount,Energy,Barcode
2024-01-15,Oatmeal,1,150,
2024-01-15,Banana,2,89,4011
2024-01-16,Oatmeal,2,150,
2024-01-16,Greek Yogurt,1,97,
";

    fn facade() -> DatabaseFacade {
        DatabaseFacade::new(Database::open_in_memory().unwrap())
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_parse_entries_csv_basic() {
        let rows = parse_entries_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[1],
            CsvRow {
                date: day(1, 15),
                name: "Banana".to_string(),
                amount: 2,
                energy: 89.0,
                barcode: "4011".to_string(),
            }
        );
        assert_eq!(rows[0].barcode, "");
    }

    #[test]
    fn test_parse_entries_csv_without_barcode_column() {
        let csv = "\
date,NAME,amount,energy
1/15/2024,Rice,3,130
";
        let rows = parse_entries_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, day(1, 15));
        assert_eq!(rows[0].barcode, "");
    }

    #[test]
    fn test_parse_entries_csv_missing_required_column() {
        let csv = "Date,Name,Energy\n2024-01-15,Rice,130\n";
        let err = parse_entries_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Amount"));
    }

    #[test]
    fn test_parse_entries_csv_reports_line() {
        let csv = "\
Date,Name,Amount,Energy
2024-01-15,Rice,3,130
2024-01-15,Rice,lots,130
";
        let err = parse_entries_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, FacadeError::InvalidRow { line: 3, .. }));
    }

    #[test]
    fn test_parse_entries_csv_skips_blank_rows() {
        let csv = "\
Date,Name,Amount,Energy
2024-01-15,Rice,3,130
,,,
2024-01-16,Rice,1,130
";
        let rows = parse_entries_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-15"), Some(day(1, 15)));
        assert_eq!(parse_date("1/15/2024"), Some(day(1, 15)));
        assert_eq!(parse_date("15.01.2024"), Some(day(1, 15)));
        assert_eq!(parse_date("not-a-date"), None);
    }

    #[test]
    fn test_import_entries_dry_run() {
        let mut f = facade();
        let rows = parse_entries_csv(SAMPLE_CSV.as_bytes()).unwrap();

        let summary = import_entries(&mut f, &rows, true).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                rows_parsed: 4,
                products_created: 3,
                products_reused: 0,
                entries_logged: 4,
                dates_spanned: 2,
            }
        );
        assert_eq!(f.database().products().count().unwrap(), 0);
        assert_eq!(f.database().consumed_entries().count().unwrap(), 0);
    }

    #[test]
    fn test_import_entries_actual() {
        let mut f = facade();
        let rows = parse_entries_csv(SAMPLE_CSV.as_bytes()).unwrap();

        let summary = import_entries(&mut f, &rows, false).unwrap();
        assert_eq!(summary.products_created, 3);
        assert_eq!(summary.entries_logged, 4);
        assert_eq!(f.database().products().count().unwrap(), 3);
        assert_eq!(f.database().consumed_entries().count().unwrap(), 4);

        let per_day = f.get_period_calories(day(1, 15), day(1, 16)).unwrap();
        assert_eq!(per_day.len(), 2);
        assert!((per_day[0].energy - 328.0).abs() < 1e-9);
        assert!((per_day[1].energy - 397.0).abs() < 1e-9);

        // Importing again reuses every product
        let again = import_entries(&mut f, &rows, false).unwrap();
        assert_eq!(again.products_created, 0);
        assert_eq!(again.products_reused, 3);
        assert_eq!(f.database().products().count().unwrap(), 3);
    }

    #[test]
    fn test_export_then_import_preserves_totals() {
        let mut source = facade();
        source.insert_entry(1, day(3, 1), "Bread", 2.5, None).unwrap();
        source.insert_entry(3, day(3, 1), "Jam", 2.75, None).unwrap();
        source.insert_entry(2, day(3, 2), "Bread", 2.5, None).unwrap();
        source.insert_entry(9, day(3, 9), "Bread", 2.5, None).unwrap();
        source
            .insert_entry(1, day(3, 2), "Ghost", 1.0, Some(404))
            .unwrap();

        let mut out = Vec::new();
        let written = export_entries(&source, day(3, 1), day(3, 2), &mut out).unwrap();
        assert_eq!(written, 3);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Date,Name,Amount,Energy,Barcode\n"));
        assert!(text.contains("2024-03-01,Jam,3,2.75,\n"));

        let mut target = facade();
        let rows = parse_entries_csv(text.as_bytes()).unwrap();
        import_entries(&mut target, &rows, false).unwrap();

        assert_eq!(
            source.get_period_calories(day(3, 1), day(3, 2)).unwrap(),
            target.get_period_calories(day(3, 1), day(3, 2)).unwrap()
        );
    }

    #[test]
    fn test_export_empty_period_writes_header() {
        let f = facade();
        let mut out = Vec::new();
        assert_eq!(export_entries(&f, day(1, 1), day(1, 31), &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "Date,Name,Amount,Energy,Barcode\n");
    }
}
