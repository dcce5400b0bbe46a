pub mod csv_log;
pub mod db;
pub mod error;
pub mod facade;
pub mod models;

pub use error::{FacadeError, Result};
pub use facade::DatabaseFacade;
