mod entry;
mod helpers;
mod product;
mod summary;
mod transfer;

pub(crate) use entry::{cmd_delete, cmd_edit, cmd_log};
pub(crate) use product::{cmd_product_add, cmd_product_common, cmd_product_search};
pub(crate) use summary::{cmd_day, cmd_period, cmd_total};
pub(crate) use transfer::{cmd_export, cmd_import};
