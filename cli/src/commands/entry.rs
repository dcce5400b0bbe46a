use anyhow::Result;

use nosh_core::models::ConsumedEntry;
use nosh_core::{DatabaseFacade, FacadeError};

use super::helpers::{exit_on_caller_error, fail, parse_date};

#[allow(clippy::cast_precision_loss)]
fn describe(entry: &ConsumedEntry, energy: Option<f64>) -> String {
    let name = &entry.name;
    let amount = entry.amount;
    let date = entry.date;
    match energy {
        Some(e) => {
            let kcal = amount as f64 * e;
            format!("{name} x{amount} on {date}: {kcal:.0} kcal")
        }
        None => format!("{name} x{amount} on {date}"),
    }
}

/// Energy of the entry's product, if it still resolves.
fn product_energy(facade: &DatabaseFacade, entry: &ConsumedEntry) -> Result<Option<f64>> {
    match facade.get_product(entry.product_id) {
        Ok(product) => Ok(Some(product.energy)),
        Err(FacadeError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log(
    facade: &mut DatabaseFacade,
    name: &str,
    amount: i64,
    energy: Option<f64>,
    product_id: Option<i64>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    if amount <= 0 {
        fail(json, "Amount must be greater than 0");
    }
    // Product ids start at 1; 0 asks for the product to be looked up or created
    let product_id = product_id.filter(|&id| id != 0);

    let energy = match (product_id, energy) {
        (Some(id), given) => match facade.get_product(id) {
            Ok(product) => product.energy,
            Err(FacadeError::NotFound { .. }) => {
                tracing::warn!(product_id = id, "logging against a product that does not exist");
                given.unwrap_or(0.0)
            }
            Err(e) => return Err(e.into()),
        },
        (None, Some(e)) => e,
        (None, None) => fail(json, "--energy is required unless --product-id is given"),
    };

    let entry = facade.insert_entry(amount, date, name, energy, product_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let id = entry.id;
        let summary = describe(&entry, Some(energy));
        println!("Logged [{id}]: {summary}");
    }

    Ok(())
}

pub(crate) fn cmd_delete(facade: &DatabaseFacade, entry_id: i64, json: bool) -> Result<()> {
    let entry = exit_on_caller_error(facade.delete_entry_by_id(entry_id), json)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": entry.id }));
    } else {
        let summary = describe(&entry, None);
        println!("Deleted entry {entry_id}: {summary}");
    }

    Ok(())
}

pub(crate) fn cmd_edit(
    facade: &DatabaseFacade,
    entry_id: i64,
    amount: i64,
    json: bool,
) -> Result<()> {
    if amount <= 0 {
        fail(json, "Amount must be greater than 0");
    }

    let entry = exit_on_caller_error(facade.edit_entry_by_id(entry_id, amount), json)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let energy = product_energy(facade, &entry)?;
        let summary = describe(&entry, energy);
        println!("Updated entry {entry_id}: {summary}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nosh_core::db::Database;

    fn entry(amount: i64) -> ConsumedEntry {
        ConsumedEntry {
            id: 3,
            amount,
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            name: "Bagel".to_string(),
            product_id: 1,
        }
    }

    #[test]
    fn test_describe_with_energy() {
        assert_eq!(
            describe(&entry(2), Some(250.0)),
            "Bagel x2 on 2024-06-15: 500 kcal"
        );
    }

    #[test]
    fn test_describe_without_energy() {
        assert_eq!(describe(&entry(1), None), "Bagel x1 on 2024-06-15");
    }

    #[test]
    fn test_product_energy_missing_product() {
        let facade = DatabaseFacade::new(Database::open_in_memory().unwrap());
        assert_eq!(product_energy(&facade, &entry(1)).unwrap(), None);

        facade.insert_product("Bagel", 250.0, "").unwrap();
        assert_eq!(product_energy(&facade, &entry(1)).unwrap(), Some(250.0));
    }

    #[test]
    fn test_cmd_log_uses_product_energy() {
        let mut facade = DatabaseFacade::new(Database::open_in_memory().unwrap());
        let product = facade.insert_product("Bagel", 250.0, "").unwrap();

        cmd_log(
            &mut facade,
            "Bagel",
            2,
            Some(1.0),
            Some(product.id),
            Some("2024-06-15".to_string()),
            true,
        )
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let entries = facade.get_entries_for_day(day).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].energy, 250.0);
        // No product was created for the entry
        assert_eq!(facade.database().products().count().unwrap(), 1);
    }

    #[test]
    fn test_cmd_log_product_id_zero_creates_product() {
        let mut facade = DatabaseFacade::new(Database::open_in_memory().unwrap());

        cmd_log(
            &mut facade,
            "Bagel",
            1,
            Some(250.0),
            Some(0),
            Some("2024-06-15".to_string()),
            true,
        )
        .unwrap();

        let products = facade.get_product_by_name("Bagel").unwrap();
        assert_eq!(products.len(), 1);
        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let entries = facade.get_entries_in_period(day, day).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product_id, products[0].id);
    }
}
