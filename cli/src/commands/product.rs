use anyhow::Result;
use std::process;

use nosh_core::DatabaseFacade;
use nosh_core::models::Product;

use super::helpers::{exit_on_caller_error, print_product_table};

pub(crate) fn cmd_product_add(
    facade: &DatabaseFacade,
    name: &str,
    energy: f64,
    barcode: Option<String>,
    json: bool,
) -> Result<()> {
    let barcode = barcode.unwrap_or_default();
    let product = exit_on_caller_error(facade.insert_product(name, energy, &barcode), json)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&product)?);
    } else {
        let name = &product.name;
        let id = product.id;
        println!("Added product: {name} (id: {id})");
    }

    Ok(())
}

pub(crate) fn cmd_product_search(facade: &DatabaseFacade, term: &str, json: bool) -> Result<()> {
    let products = facade.get_product_by_name(term)?;
    print_products(&products, json, &format!("No products matching '{term}'"))
}

pub(crate) fn cmd_product_common(facade: &DatabaseFacade, json: bool) -> Result<()> {
    let products = facade.find_most_common_products()?;
    print_products(&products, json, "Nothing logged yet")
}

fn print_products(products: &[Product], json: bool, empty_message: &str) -> Result<()> {
    if products.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("{empty_message}");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(products)?);
    } else {
        print_product_table(products);
    }

    Ok(())
}
