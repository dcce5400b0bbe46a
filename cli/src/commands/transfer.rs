use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use nosh_core::DatabaseFacade;
use nosh_core::csv_log::{export_entries, import_entries, parse_entries_csv};

use super::helpers::parse_period;

pub(crate) fn cmd_export(
    facade: &DatabaseFacade,
    start: String,
    end: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let (start, end) = parse_period(start, end)?;

    let written = if let Some(path) = &output {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        export_entries(facade, start, end, BufWriter::new(file))?
    } else {
        export_entries(facade, start, end, io::stdout().lock())?
    };

    if let Some(path) = output {
        eprintln!("Exported {written} entries to {}", path.display());
    }

    Ok(())
}

pub(crate) fn cmd_import(
    facade: &mut DatabaseFacade,
    file: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let reader = File::open(file)
        .with_context(|| format!("Failed to open file: {}", file.display()))?;
    let rows = parse_entries_csv(BufReader::new(reader))
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    if rows.is_empty() {
        anyhow::bail!("No entries found in {}", file.display());
    }

    let summary = import_entries(facade, &rows, dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let prefix = if dry_run { "[DRY RUN] " } else { "" };
        println!("{prefix}CSV Import Summary:");
        println!("  Rows parsed:       {}", summary.rows_parsed);
        println!("  Products created:  {}", summary.products_created);
        println!("  Products reused:   {}", summary.products_reused);
        println!("  Entries logged:    {}", summary.entries_logged);
        println!("  Dates spanned:     {}", summary.dates_spanned);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nosh_core::db::Database;
    use std::io::Write;

    #[test]
    fn test_export_then_import_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("log.csv");

        let mut source = DatabaseFacade::new(Database::open_in_memory().unwrap());
        let day = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        source.insert_entry(2, day, "Porridge", 150.0, None).unwrap();
        cmd_export(
            &source,
            "2024-02-01".to_string(),
            "2024-02-29".to_string(),
            Some(csv_path.clone()),
        )
        .unwrap();

        let mut target = DatabaseFacade::new(Database::open_in_memory().unwrap());
        cmd_import(&mut target, &csv_path, false, true).unwrap();

        let entries = target.get_entries_for_day(day).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Porridge");
        assert_eq!(entries[0].amount, 2);
    }

    #[test]
    fn test_import_empty_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("empty.csv");
        let mut file = File::create(&csv_path).unwrap();
        writeln!(file, "Date,Name,Amount,Energy").unwrap();

        let mut facade = DatabaseFacade::new(Database::open_in_memory().unwrap());
        let err = cmd_import(&mut facade, &csv_path, false, false).unwrap_err();
        assert!(err.to_string().contains("No entries found"));
    }
}
