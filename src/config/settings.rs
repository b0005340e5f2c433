//! Application settings loading from config.toml
//!
//! Besides the form defaults, the file may list a seed catalog. Seed records go
//! through the same name-matching reconciliation as an import and are applied
//! once per database, so they never overwrite edits made afterwards. Seed
//! recipes only apply to products that have no recipe yet.

use crate::{
    core::{
        costing::derive_price_per_unit,
        exchange::{ImportIngredient, ImportProduct, ImportRequirement, ImportSnapshot},
        store::EntityStore,
    },
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Markup pre-filled for new products when none is given.
pub const DEFAULT_MARGIN_PERCENT: f64 = 30.0;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Form defaults
    pub defaults: Defaults,
    /// Products to seed
    pub products: Vec<SeedProduct>,
    /// Ingredients to seed
    pub ingredients: Vec<SeedIngredient>,
    /// Recipe rows to seed, referenced by name
    pub requirements: Vec<SeedRequirement>,
}

/// The `[defaults]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Markup for new products
    pub margin_percent: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            margin_percent: DEFAULT_MARGIN_PERCENT,
        }
    }
}

/// A `[[products]]` entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedProduct {
    /// Display name
    pub name: String,
    /// Channel label (e.g., "offline", "online")
    #[serde(rename = "type", default)]
    pub product_type: Option<String>,
    /// Markup; falls back to `[defaults] margin_percent`
    #[serde(default)]
    pub margin_percent: Option<f64>,
}

/// An `[[ingredients]]` entry.
///
/// The price is either given per unit or as a purchase (`total_price` paid for
/// `total_quantity` units).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedIngredient {
    /// Display name
    pub name: String,
    /// Unit label
    pub unit: String,
    /// Price of one unit
    #[serde(default)]
    pub price_per_unit: Option<f64>,
    /// Price paid for a whole purchase
    #[serde(default)]
    pub total_price: Option<f64>,
    /// Units in that purchase
    #[serde(default)]
    pub total_quantity: Option<f64>,
}

/// A `[[requirements]]` entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedRequirement {
    /// Product name
    pub product: String,
    /// Ingredient name
    pub ingredient: String,
    /// Quantity per product unit
    pub qty_per_product: f64,
}

impl SeedIngredient {
    /// The explicit price, or the one derived from the purchase totals.
    #[must_use]
    pub fn effective_price(&self) -> Option<f64> {
        self.price_per_unit
            .or_else(|| derive_price_per_unit(self.total_price, self.total_quantity))
    }
}

impl Settings {
    /// Converts the seed catalog into an import snapshot.
    #[must_use]
    pub fn seed_snapshot(&self) -> ImportSnapshot {
        ImportSnapshot {
            products: self
                .products
                .iter()
                .map(|p| ImportProduct {
                    name: p.name.clone(),
                    product_type: p.product_type.clone(),
                    default_margin_percent: Some(
                        p.margin_percent.unwrap_or(self.defaults.margin_percent),
                    ),
                })
                .collect(),
            ingredients: self
                .ingredients
                .iter()
                .map(|i| ImportIngredient {
                    name: i.name.clone(),
                    unit: i.unit.clone(),
                    price_per_unit: i.effective_price(),
                })
                .collect(),
            requirements: self
                .requirements
                .iter()
                .map(|r| ImportRequirement {
                    product: Some(r.product.clone()),
                    ingredient: Some(r.ingredient.clone()),
                    qty_per_product: Some(r.qty_per_product),
                    ..Default::default()
                })
                .collect(),
        }
    }

    /// The seed catalog without recipe rows for products that already have a recipe.
    #[must_use]
    pub fn seed_snapshot_for(&self, store: &EntityStore) -> ImportSnapshot {
        let mut snapshot = self.seed_snapshot();
        snapshot.requirements.retain(|row| {
            row.product
                .as_deref()
                .and_then(|name| store.product_by_name(name))
                .is_none_or(|product| store.requirements_for(&product.id).next().is_none())
        });
        snapshot
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A seed record is missing a required field
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

/// Loads settings, treating a missing file as an empty configuration.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    load_settings(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_settings() {
        let toml_str = r#"
            [defaults]
            margin_percent = 25.0

            [[products]]
            name = "Bread"
            type = "offline"

            [[products]]
            name = "Cake"
            margin_percent = 40.0

            [[ingredients]]
            name = "Flour"
            unit = "kg"
            price_per_unit = 12000.0

            [[ingredients]]
            name = "Egg"
            unit = "pcs"
            total_price = 30000.0
            total_quantity = 15.0

            [[requirements]]
            product = "Bread"
            ingredient = "Flour"
            qty_per_product = 0.25
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.defaults.margin_percent, 25.0);
        assert_eq!(settings.products.len(), 2);
        assert_eq!(settings.products[0].product_type.as_deref(), Some("offline"));
        assert_eq!(settings.ingredients[1].effective_price(), Some(2000.0));

        let snapshot = settings.seed_snapshot();
        assert_eq!(snapshot.products[0].default_margin_percent, Some(25.0));
        assert_eq!(snapshot.products[1].default_margin_percent, Some(40.0));
        assert_eq!(snapshot.ingredients[0].price_per_unit, Some(12_000.0));
        assert_eq!(snapshot.ingredients[1].price_per_unit, Some(2000.0));
        assert_eq!(snapshot.requirements[0].product.as_deref(), Some("Bread"));
        assert_eq!(snapshot.requirements[0].qty_per_product, Some(0.25));
    }

    #[test]
    fn test_seed_recipes_skip_products_with_a_recipe() {
        let fixture = crate::test_utils::bakery_fixture();
        let toml_str = r#"
            [[requirements]]
            product = "Bread"
            ingredient = "Egg"
            qty_per_product = 1.0

            [[requirements]]
            product = "Milk Bun"
            ingredient = "Milk"
            qty_per_product = 0.1
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();

        let snapshot = settings.seed_snapshot_for(&fixture.store);
        assert_eq!(snapshot.requirements.len(), 1);
        assert_eq!(snapshot.requirements[0].product.as_deref(), Some("Milk Bun"));
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.defaults.margin_percent, DEFAULT_MARGIN_PERCENT);
        assert!(settings.seed_snapshot().is_empty());
    }

    #[test]
    fn test_ingredient_without_any_price() {
        let toml_str = r#"
            [[ingredients]]
            name = "Salt"
            unit = "kg"
            total_price = 5000.0
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.ingredients[0].effective_price(), None);
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[defaults]\nmargin_percent = 12.5").unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.defaults.margin_percent, 12.5);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());

        assert!(load_settings(dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[products]]\ntype = \"offline\"").unwrap();

        let result = load_settings_or_default(file.path());
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }
}
