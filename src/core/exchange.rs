//! Data exchange - JSON export of the catalog and parsing of import files.
//!
//! Exported requirements carry product and ingredient names next to their ids so
//! a file stays meaningful after it is edited by hand or loaded into a catalog
//! whose ids differ. Import records accept either form.

use crate::{
    core::store::EntityStore,
    errors::Result,
    models::{Ingredient, Product},
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Catalog as written to an export file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSnapshot {
    /// All products
    pub products: Vec<Product>,
    /// All ingredients
    pub ingredients: Vec<Ingredient>,
    /// All recipe rows, annotated with names
    pub requirements: Vec<ExportRequirement>,
}

/// A recipe row with human-readable names for portability.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequirement {
    /// Product id
    pub product_id: String,
    /// Product name (the id if the product is unknown)
    pub product: String,
    /// Ingredient id
    pub ingredient_id: String,
    /// Ingredient name (the id if the ingredient is unknown)
    pub ingredient: String,
    /// Quantity per product unit
    pub qty_per_product: f64,
    /// Ingredient unit label, empty if unknown
    pub unit: String,
}

/// Externally supplied catalog, handed to [`import_snapshot`](crate::core::reconcile::import_snapshot).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportSnapshot {
    /// Incoming products
    pub products: Vec<ImportProduct>,
    /// Incoming ingredients
    pub ingredients: Vec<ImportIngredient>,
    /// Incoming recipe rows
    pub requirements: Vec<ImportRequirement>,
}

/// Incoming product record; only `name` is required.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportProduct {
    /// Display name, matched exactly against existing products
    pub name: String,
    /// Channel label
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    /// Default markup
    #[serde(deserialize_with = "lenient_number")]
    pub default_margin_percent: Option<f64>,
}

/// Incoming ingredient record; `unit` is kept as text and validated on import.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportIngredient {
    /// Display name, matched exactly against existing ingredients
    pub name: String,
    /// Unit label
    pub unit: String,
    /// Price per unit
    #[serde(deserialize_with = "lenient_number")]
    pub price_per_unit: Option<f64>,
}

/// Incoming recipe row, referencing each side by id, by name, or both.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportRequirement {
    /// Product id
    pub product_id: Option<String>,
    /// Product name
    pub product: Option<String>,
    /// Ingredient id
    pub ingredient_id: Option<String>,
    /// Ingredient name
    pub ingredient: Option<String>,
    /// Quantity per product unit
    #[serde(deserialize_with = "lenient_number")]
    pub qty_per_product: Option<f64>,
}

/// Builds the export view of the store.
#[must_use]
pub fn export_snapshot(store: &EntityStore) -> ExportSnapshot {
    let requirements = store
        .requirements()
        .iter()
        .map(|r| {
            let product = store
                .product(&r.product_id)
                .map_or_else(|| r.product_id.clone(), |p| p.name.clone());
            let ingredient = store.ingredient(&r.ingredient_id);
            ExportRequirement {
                product_id: r.product_id.clone(),
                product,
                ingredient_id: r.ingredient_id.clone(),
                ingredient: ingredient.map_or_else(|| r.ingredient_id.clone(), |i| i.name.clone()),
                qty_per_product: r.qty_per_product,
                unit: ingredient.map(|i| i.unit.to_string()).unwrap_or_default(),
            }
        })
        .collect();

    ExportSnapshot {
        products: store.products().to_vec(),
        ingredients: store.ingredients().to_vec(),
        requirements,
    }
}

/// Serializes the store as pretty-printed JSON.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn to_json_pretty(store: &EntityStore) -> Result<String> {
    let snapshot = export_snapshot(store);
    debug!(
        "Exporting {} products, {} ingredients, {} recipe rows",
        snapshot.products.len(),
        snapshot.ingredients.len(),
        snapshot.requirements.len()
    );
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Parses an import file. Unknown fields (such as exported ids) are ignored.
///
/// # Errors
/// Returns an error if the text is not valid JSON of the expected shape.
pub fn parse_import_json(text: &str) -> Result<ImportSnapshot> {
    Ok(serde_json::from_str(text)?)
}

impl ImportSnapshot {
    /// Whether the snapshot carries no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.ingredients.is_empty() && self.requirements.is_empty()
    }
}

/// Accepts a number, a numeric string or null; anything else becomes `None`.
///
/// Spreadsheet round-trips turn numbers into strings, and hand-edited files leave
/// cells empty, so a bad cell degrades to "unset" instead of failing the import.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}
