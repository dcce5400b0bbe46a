use tracing::{debug, error, warn};

use crate::db::{ConsumedEntriesDao, Database, ProductDao};
use crate::error::{FacadeError, Result};
use crate::models::{
    CalendarDay, ConsumedEntry, DatabaseEntry, DateCalories, NewConsumedEntry, NewProduct,
    Product,
};

/// Number of products returned by `find_most_common_products` unless
/// overridden with `with_most_common_limit`.
pub const DEFAULT_MOST_COMMON_LIMIT: usize = 10;

/// Single entry point for front-end code: logs consumption, edits the log,
/// manages products, and answers the calorie aggregation queries.
pub struct DatabaseFacade {
    db: Database,
    most_common_limit: usize,
}

impl DatabaseFacade {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            most_common_limit: DEFAULT_MOST_COMMON_LIMIT,
        }
    }

    #[must_use]
    pub fn with_most_common_limit(mut self, limit: usize) -> Self {
        self.most_common_limit = limit;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // --- Consumption log ---

    /// Log `amount` of a product on the day of `date`.
    ///
    /// With `product_id` set the id is stored as given, without checking that
    /// the product exists. Without it the product is looked up by
    /// `(name, energy, "")` and created if missing; when several match, the
    /// oldest wins. Lookup, product insert and entry insert commit together.
    pub fn insert_entry(
        &mut self,
        amount: i64,
        date: impl CalendarDay,
        name: &str,
        energy: f64,
        product_id: Option<i64>,
    ) -> Result<ConsumedEntry> {
        let entry = NewConsumedEntry {
            amount,
            date: date.calendar_day(),
            name: name.to_string(),
            product_id: 0,
        };

        let tx = self.db.transaction()?;
        let product_id = match product_id {
            Some(id) => id,
            None => get_or_create_product(&ProductDao::new(&tx), name, energy, "")?.0,
        };
        let entry = NewConsumedEntry { product_id, ..entry };
        let id = ConsumedEntriesDao::new(&tx).insert(&entry)?;
        tx.commit()?;

        debug!(id, product_id, amount, date = %entry.date, "logged consumed entry");
        Ok(ConsumedEntry {
            id,
            amount: entry.amount,
            date: entry.date,
            name: entry.name,
            product_id: entry.product_id,
        })
    }

    pub fn get_entry(&self, id: i64) -> Result<ConsumedEntry> {
        let entries = self.db.consumed_entries().find_consumed_entries_by_id(id)?;
        exactly_one(id, entries)
    }

    /// Remove the entry with `id`, returning the removed row.
    pub fn delete_entry_by_id(&self, id: i64) -> Result<ConsumedEntry> {
        let entry = self.get_entry(id)?;
        self.db.consumed_entries().delete(&entry)?;
        debug!(id, "deleted consumed entry");
        Ok(entry)
    }

    /// Change the amount of the entry with `id`. Nothing else is touched.
    pub fn edit_entry_by_id(&self, id: i64, amount: i64) -> Result<ConsumedEntry> {
        let mut entry = self.get_entry(id)?;
        entry.amount = amount;
        self.db.consumed_entries().update(&entry)?;
        debug!(id, amount, "edited consumed entry");
        Ok(entry)
    }

    // --- Products ---

    pub fn insert_product(&self, name: &str, energy: f64, barcode: &str) -> Result<Product> {
        let products = self.db.products();
        if !products
            .find_existing_products(name, energy, barcode)?
            .is_empty()
        {
            return Err(FacadeError::Duplicate {
                name: name.to_string(),
                energy,
                barcode: barcode.to_string(),
            });
        }
        let product = NewProduct {
            name: name.to_string(),
            energy,
            barcode: barcode.to_string(),
        };
        let id = products.insert(&product)?;
        debug!(id, product = name, "created product");
        Ok(Product {
            id,
            name: product.name,
            energy: product.energy,
            barcode: product.barcode,
        })
    }

    pub fn get_product(&self, id: i64) -> Result<Product> {
        self.db
            .products()
            .find_product_by_id(id)?
            .ok_or(FacadeError::NotFound { id })
    }

    /// Look up the product with exactly this `(name, energy, barcode)`,
    /// creating it when absent. The flag is true when a row was inserted.
    pub fn get_or_create_product(
        &mut self,
        name: &str,
        energy: f64,
        barcode: &str,
    ) -> Result<(Product, bool)> {
        let tx = self.db.transaction()?;
        let (id, created) = get_or_create_product(&ProductDao::new(&tx), name, energy, barcode)?;
        tx.commit()?;
        Ok((
            Product {
                id,
                name: name.to_string(),
                energy,
                barcode: barcode.to_string(),
            },
            created,
        ))
    }

    /// Up to the configured limit of products, most frequently logged first.
    /// Ties go to the product eaten most recently, then to the lower id.
    pub fn find_most_common_products(&self) -> Result<Vec<Product>> {
        let ranked = self
            .db
            .consumed_entries()
            .find_most_common_products(self.most_common_limit)
            .inspect_err(|e| error!(error = %e, "ranking most common products failed"))?;

        let products = self.db.products();
        let mut result = Vec::with_capacity(ranked.len());
        for id in ranked {
            match products.find_product_by_id(id)? {
                Some(product) => result.push(product),
                None => warn!(product_id = id, "consumed entries reference a missing product"),
            }
        }
        Ok(result)
    }

    /// Products whose name contains `name`. Matching is ASCII
    /// case-insensitive; `%` and `_` in `name` match literally.
    pub fn get_product_by_name(&self, name: &str) -> Result<Vec<Product>> {
        let pattern = format!("%{}%", escape_like(name));
        let products = self
            .db
            .products()
            .find_products_by_name(&pattern)
            .inspect_err(|e| error!(error = %e, "product name search failed"))?;
        Ok(products)
    }

    // --- Aggregation ---

    pub fn get_entries_for_day(&self, date: impl CalendarDay) -> Result<Vec<DatabaseEntry>> {
        let day = date.calendar_day();
        let entries = self
            .db
            .consumed_entries()
            .find_consumed_entries_for_date(day)
            .inspect_err(|e| error!(error = %e, %day, "loading entries failed"))?;

        let products = self.db.products();
        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(product) = products.find_product_by_id(entry.product_id)? else {
                warn!(
                    id = entry.id,
                    product_id = entry.product_id,
                    "skipping entry with missing product"
                );
                continue;
            };
            result.push(DatabaseEntry {
                id: entry.id.to_string(),
                name: entry.name,
                amount: entry.amount,
                energy: product.energy,
            });
        }
        Ok(result)
    }

    /// Summed energy for each day of `[start, end]` that has entries.
    pub fn get_period_calories(
        &self,
        start: impl CalendarDay,
        end: impl CalendarDay,
    ) -> Result<Vec<DateCalories>> {
        let (start, end) = (start.calendar_day(), end.calendar_day());
        let calories = self
            .db
            .calories()
            .get_calories_period(start, end)
            .inspect_err(|e| error!(error = %e, %start, %end, "period calories failed"))?;
        Ok(calories)
    }

    /// Summed energy over all of `[start, end]` as a single element dated at
    /// `start`, or nothing when the period is empty.
    pub fn get_calories_per_day_in_period(
        &self,
        start: impl CalendarDay,
        end: impl CalendarDay,
    ) -> Result<Vec<DateCalories>> {
        let (start, end) = (start.calendar_day(), end.calendar_day());
        let calories = self
            .db
            .calories()
            .get_calories_per_day_in_period(start, end)
            .inspect_err(|e| error!(error = %e, %start, %end, "period total failed"))?;
        Ok(calories)
    }

    pub fn get_entries_in_period(
        &self,
        start: impl CalendarDay,
        end: impl CalendarDay,
    ) -> Result<Vec<ConsumedEntry>> {
        let entries = self
            .db
            .consumed_entries()
            .find_consumed_entries_in_period(start.calendar_day(), end.calendar_day())?;
        Ok(entries)
    }
}

fn get_or_create_product(
    products: &ProductDao<'_>,
    name: &str,
    energy: f64,
    barcode: &str,
) -> Result<(i64, bool)> {
    if let Some(existing) = products
        .find_existing_products(name, energy, barcode)?
        .first()
    {
        return Ok((existing.id, false));
    }
    let id = products.insert(&NewProduct {
        name: name.to_string(),
        energy,
        barcode: barcode.to_string(),
    })?;
    debug!(id, product = name, "created product");
    Ok((id, true))
}

fn exactly_one(id: i64, mut entries: Vec<ConsumedEntry>) -> Result<ConsumedEntry> {
    match entries.len() {
        0 => Err(FacadeError::NotFound { id }),
        1 => Ok(entries.remove(0)),
        matches => Err(FacadeError::Ambiguous { id, matches }),
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
