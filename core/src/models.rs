use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Storage format for calendar days in the `consumed_entries.date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Energy per unit of consumed amount.
    pub energy: f64,
    /// Empty when the product was created without a barcode.
    pub barcode: String,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub energy: f64,
    pub barcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedEntry {
    pub id: i64,
    pub amount: i64,
    pub date: NaiveDate,
    /// Copied from the product when the entry was logged.
    pub name: String,
    pub product_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewConsumedEntry {
    pub amount: i64,
    pub date: NaiveDate,
    pub name: String,
    pub product_id: i64,
}

/// An entry of the consumption log joined to the energy of its product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseEntry {
    pub id: String,
    pub name: String,
    pub amount: i64,
    pub energy: f64,
}

impl DatabaseEntry {
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.amount as f64 * self.energy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateCalories {
    pub date: NaiveDate,
    pub energy: f64,
}

/// Anything that can be reduced to the calendar day it falls on.
///
/// Queries against the consumption log only ever see whole days; the time of
/// day is dropped here.
pub trait CalendarDay {
    fn calendar_day(&self) -> NaiveDate;
}

impl CalendarDay for NaiveDate {
    fn calendar_day(&self) -> NaiveDate {
        *self
    }
}

impl CalendarDay for NaiveDateTime {
    fn calendar_day(&self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> CalendarDay for DateTime<Tz> {
    fn calendar_day(&self) -> NaiveDate {
        self.date_naive()
    }
}

pub(crate) fn format_day(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
