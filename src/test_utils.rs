//! Shared test utilities for `CostingBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and building a small bakery catalog with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{recipe::ResolvedRow, store::EntityStore},
    errors::Result,
    models::{Ingredient, IngredientDraft, ProductDraft, RequirementRow, Unit},
};
use sea_orm::DatabaseConnection;

/// Initializes tracing for tests; repeated calls are ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all storage tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Builds a valid product draft with an empty channel label.
pub fn product_draft(name: &str, margin: f64) -> ProductDraft {
    ProductDraft::new(name, "", margin).unwrap()
}

/// Builds a valid ingredient draft.
pub fn ingredient_draft(name: &str, unit: Unit, price: f64) -> IngredientDraft {
    IngredientDraft::new(name, unit, price).unwrap()
}

/// A resolved recipe row with a made-up ingredient.
///
/// The ingredient id and name are derived from the price, so rows with
/// different prices never collide.
pub fn priced_row(price_per_unit: f64, qty_per_product: f64) -> ResolvedRow {
    let ingredient = Ingredient {
        id: format!("ing_{price_per_unit}"),
        name: format!("Item {price_per_unit}"),
        unit: Unit::Pcs,
        price_per_unit,
    };
    ResolvedRow::new(&ingredient, qty_per_product)
}

/// A small catalog with ids of the records tests refer to.
pub struct BakeryFixture {
    /// The populated store
    pub store: EntityStore,
    /// "Bread": flour 0.25 kg, sugar 0.05 kg; margin 30%, type "offline"
    pub bread: String,
    /// "Cake": flour 0.2 kg, egg 2 pcs; margin 40%
    pub cake: String,
    /// "Flour": kg at 12 000
    pub flour: String,
    /// "Sugar": kg at 15 000
    pub sugar: String,
    /// "Egg": pcs at 2 000
    pub egg: String,
}

/// Sets up the bakery catalog.
///
/// # Contents
/// * products: Bread, Cake
/// * ingredients: Flour, Sugar, Egg, Milk (Milk is not used by any recipe)
/// * recipe rows, in order: bread/flour, bread/sugar, cake/flour, cake/egg
pub fn bakery_fixture() -> BakeryFixture {
    let mut store = EntityStore::new();

    let bread = store.add_product(ProductDraft::new("Bread", "offline", 30.0).unwrap());
    let cake = store.add_product(product_draft("Cake", 40.0));

    let flour = store.add_ingredient(ingredient_draft("Flour", Unit::Kg, 12_000.0));
    let sugar = store.add_ingredient(ingredient_draft("Sugar", Unit::Kg, 15_000.0));
    let egg = store.add_ingredient(ingredient_draft("Egg", Unit::Pcs, 2_000.0));
    store.add_ingredient(ingredient_draft("Milk", Unit::Liter, 18_000.0));

    store
        .upsert_requirement_rows(
            &bread,
            vec![
                RequirementRow::new(&flour, 0.25),
                RequirementRow::new(&sugar, 0.05),
            ],
        )
        .unwrap();
    store
        .upsert_requirement_rows(
            &cake,
            vec![RequirementRow::new(&flour, 0.2), RequirementRow::new(&egg, 2.0)],
        )
        .unwrap();

    BakeryFixture {
        store,
        bread,
        cake,
        flour,
        sugar,
        egg,
    }
}
