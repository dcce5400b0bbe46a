//! Error type returned by the facade and the CSV import/export helpers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing the food log.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// Opening or migrating the SQLite database failed.
    #[error("failed to open database at {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    /// A lookup by id matched no row.
    #[error("id {id} not found")]
    NotFound {
        /// Identifier that was looked up.
        id: i64,
    },
    /// A lookup by id matched more than one row.
    #[error("id {id} is ambiguous ({matches} rows)")]
    Ambiguous {
        /// Identifier that was looked up.
        id: i64,
        /// Number of rows sharing the identifier.
        matches: usize,
    },
    /// A product with the same name, energy and barcode already exists.
    #[error("product '{name}' ({energy} kcal, barcode '{barcode}') already exists")]
    Duplicate {
        name: String,
        energy: f64,
        barcode: String,
    },
    /// The underlying SQLite database reported an error.
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
    /// Reading or writing CSV failed.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// A CSV row could not be interpreted as a consumption entry.
    #[error("invalid CSV row {line}: {reason}")]
    InvalidRow {
        /// 1-based line number, counting the header.
        line: usize,
        reason: String,
    },
}

impl FacadeError {
    /// Whether the error reflects caller input rather than a storage fault.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Ambiguous { .. } | Self::Duplicate { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FacadeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors() {
        assert!(FacadeError::NotFound { id: 3 }.is_caller_error());
        assert!(FacadeError::Ambiguous { id: 3, matches: 2 }.is_caller_error());
        assert!(
            FacadeError::Duplicate {
                name: "Oats".to_string(),
                energy: 370.0,
                barcode: String::new(),
            }
            .is_caller_error()
        );
        let storage = FacadeError::from(rusqlite::Error::InvalidQuery);
        assert!(!storage.is_caller_error());
    }

    #[test]
    fn test_messages() {
        assert_eq!(FacadeError::NotFound { id: 12 }.to_string(), "id 12 not found");
        let err = FacadeError::InvalidRow {
            line: 4,
            reason: "amount 'x' is not a whole number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid CSV row 4: amount 'x' is not a whole number"
        );
    }
}
