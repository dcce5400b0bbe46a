use std::path::Path;

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use crate::error::{FacadeError, Result};
use crate::models::{
    ConsumedEntry, DATE_FORMAT, DateCalories, NewConsumedEntry, NewProduct, Product, format_day,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let open_err = |source| FacadeError::Open {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(open_err)?;
        let db = Database { conn };
        db.migrate().map_err(open_err)?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> rusqlite::Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            // product_id is a reference by convention only; entries may point
            // at ids that were never created.
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS products (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    energy REAL NOT NULL,
                    barcode TEXT NOT NULL DEFAULT ''
                );

                CREATE TABLE IF NOT EXISTS consumed_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    amount INTEGER NOT NULL,
                    date TEXT NOT NULL,
                    name TEXT NOT NULL,
                    product_id INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_consumed_entries_date ON consumed_entries(date);
                CREATE INDEX IF NOT EXISTS idx_consumed_entries_product ON consumed_entries(product_id);
                CREATE INDEX IF NOT EXISTS idx_products_name ON products(name);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    pub fn products(&self) -> ProductDao<'_> {
        ProductDao::new(&self.conn)
    }

    pub fn consumed_entries(&self) -> ConsumedEntriesDao<'_> {
        ConsumedEntriesDao::new(&self.conn)
    }

    pub fn calories(&self) -> ConsumedEntryAndProductDao<'_> {
        ConsumedEntryAndProductDao::new(&self.conn)
    }

    /// Start a transaction. DAOs built over it with `ProductDao::new(&tx)` and
    /// friends see and write through the transaction until it is committed.
    pub fn transaction(&mut self) -> rusqlite::Result<Transaction<'_>> {
        self.conn.transaction()
    }
}

// --- Row mapping helpers ---

fn parse_day(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn product_from_row(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        energy: row.get(2)?,
        barcode: row.get(3)?,
    })
}

fn consumed_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<ConsumedEntry> {
    Ok(ConsumedEntry {
        id: row.get(0)?,
        amount: row.get(1)?,
        date: parse_day(row, 2)?,
        name: row.get(3)?,
        product_id: row.get(4)?,
    })
}

// --- Products ---

pub struct ProductDao<'c> {
    conn: &'c Connection,
}

impl<'c> ProductDao<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Products matching all three fields exactly, oldest first.
    pub fn find_existing_products(
        &self,
        name: &str,
        energy: f64,
        barcode: &str,
    ) -> rusqlite::Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, energy, barcode FROM products
             WHERE name = ?1 AND energy = ?2 AND barcode = ?3
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![name, energy, barcode], product_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn insert(&self, product: &NewProduct) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO products (name, energy, barcode) VALUES (?1, ?2, ?3)",
            params![product.name, product.energy, product.barcode],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_product_by_id(&self, id: i64) -> rusqlite::Result<Option<Product>> {
        self.conn
            .query_row(
                "SELECT id, name, energy, barcode FROM products WHERE id = ?1",
                params![id],
                product_from_row,
            )
            .optional()
    }

    /// `pattern` is a `LIKE` pattern using `\` as the escape character.
    pub fn find_products_by_name(&self, pattern: &str) -> rusqlite::Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, energy, barcode FROM products
             WHERE name LIKE ?1 ESCAPE '\\'
             ORDER BY name, id",
        )?;
        let rows = stmt
            .query_map(params![pattern], product_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
    }
}

// --- Consumed entries ---

pub struct ConsumedEntriesDao<'c> {
    conn: &'c Connection,
}

impl<'c> ConsumedEntriesDao<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, entry: &NewConsumedEntry) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO consumed_entries (amount, date, name, product_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.amount,
                format_day(entry.date),
                entry.name,
                entry.product_id
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_consumed_entries_by_id(&self, id: i64) -> rusqlite::Result<Vec<ConsumedEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount, date, name, product_id FROM consumed_entries WHERE id = ?1",
        )?;
        let rows = stmt
            .query_map(params![id], consumed_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn delete(&self, entry: &ConsumedEntry) -> rusqlite::Result<usize> {
        self.conn.execute(
            "DELETE FROM consumed_entries WHERE id = ?1",
            params![entry.id],
        )
    }

    pub fn update(&self, entry: &ConsumedEntry) -> rusqlite::Result<usize> {
        self.conn.execute(
            "UPDATE consumed_entries SET amount = ?1, date = ?2, name = ?3, product_id = ?4
             WHERE id = ?5",
            params![
                entry.amount,
                format_day(entry.date),
                entry.name,
                entry.product_id,
                entry.id
            ],
        )
    }

    pub fn find_consumed_entries_for_date(
        &self,
        date: NaiveDate,
    ) -> rusqlite::Result<Vec<ConsumedEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount, date, name, product_id FROM consumed_entries
             WHERE date = ?1
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![format_day(date)], consumed_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Entries with `start <= date <= end`, by date then id.
    pub fn find_consumed_entries_in_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> rusqlite::Result<Vec<ConsumedEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, amount, date, name, product_id FROM consumed_entries
             WHERE date BETWEEN ?1 AND ?2
             ORDER BY date, id",
        )?;
        let rows = stmt
            .query_map(
                params![format_day(start), format_day(end)],
                consumed_entry_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Ids of existing products ranked by how many entries reference them.
    /// Ties go to the product consumed most recently, then to the lower id.
    /// Entries pointing at a missing product do not take up a slot.
    pub fn find_most_common_products(&self, limit: usize) -> rusqlite::Result<Vec<i64>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT ce.product_id FROM consumed_entries ce
             JOIN products p ON p.id = ce.product_id
             GROUP BY ce.product_id
             ORDER BY COUNT(*) DESC, MAX(ce.date) DESC, ce.product_id ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM consumed_entries", [], |row| row.get(0))
    }
}

// --- Aggregation view ---

pub struct ConsumedEntryAndProductDao<'c> {
    conn: &'c Connection,
}

impl<'c> ConsumedEntryAndProductDao<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Energy summed per day, for days in `[start, end]` with at least one
    /// entry whose product exists.
    pub fn get_calories_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> rusqlite::Result<Vec<DateCalories>> {
        let mut stmt = self.conn.prepare(
            "SELECT ce.date, SUM(ce.amount * p.energy)
             FROM consumed_entries ce
             JOIN products p ON ce.product_id = p.id
             WHERE ce.date BETWEEN ?1 AND ?2
             GROUP BY ce.date
             ORDER BY ce.date",
        )?;
        let rows = stmt
            .query_map(params![format_day(start), format_day(end)], |row| {
                Ok(DateCalories {
                    date: parse_day(row, 0)?,
                    energy: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Energy summed over the whole of `[start, end]`, dated at `start`.
    /// Empty when no entry in the period links to an existing product.
    pub fn get_calories_per_day_in_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> rusqlite::Result<Vec<DateCalories>> {
        let (entries, energy): (i64, f64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(ce.amount * p.energy), 0.0)
             FROM consumed_entries ce
             JOIN products p ON ce.product_id = p.id
             WHERE ce.date BETWEEN ?1 AND ?2",
            params![format_day(start), format_day(end)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if entries == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![DateCalories {
            date: start,
            energy,
        }])
    }
}
