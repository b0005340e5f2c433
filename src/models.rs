//! Catalog records - products, ingredients, recipe rows and calculation-scoped costs.
//!
//! Field names serialize in camelCase so exported JSON stays readable by the
//! browser build of the calculator (`pricePerUnit`, `qtyPerProduct`, ...).

use crate::{
    core::ids::{IdKind, generate_id},
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Unit label carried alongside an ingredient quantity. Never converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Grams (older catalogs stored this as `gr`)
    #[serde(alias = "gr")]
    Gram,
    /// Kilograms
    Kg,
    /// Pieces
    Pcs,
    /// Liters
    Liter,
}

impl Unit {
    /// Every supported unit, in the order the entry form lists them.
    pub const ALL: [Self; 4] = [Self::Gram, Self::Kg, Self::Pcs, Self::Liter];

    /// Canonical label used in storage and exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gram => "gram",
            Self::Kg => "kg",
            Self::Pcs => "pcs",
            Self::Liter => "liter",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gram" | "gr" => Ok(Self::Gram),
            "kg" => Ok(Self::Kg),
            "pcs" => Ok(Self::Pcs),
            "liter" => Ok(Self::Liter),
            _ => Err(Error::InvalidUnit {
                unit: s.to_string(),
            }),
        }
    }
}

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Generated identifier (`prd_...`)
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-text channel label (e.g. "frozen", "online")
    #[serde(rename = "type", default)]
    pub product_type: String,
    /// Markup applied when the calculation does not override it
    pub default_margin_percent: f64,
}

/// A purchasable raw material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    /// Generated identifier (`ing_...`)
    pub id: String,
    /// Display name, used as the natural key on import
    pub name: String,
    /// Unit the price and recipe quantities are expressed in
    pub unit: Unit,
    /// Cost of exactly one `unit`
    pub price_per_unit: f64,
}

/// One recipe row: how much of an ingredient one unit of a product consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    /// Owning product
    pub product_id: String,
    /// Consumed ingredient
    pub ingredient_id: String,
    /// Quantity per product unit, in the ingredient's own unit
    pub qty_per_product: f64,
}

/// A recipe row without its product, as handed to
/// [`EntityStore::upsert_requirement_rows`](crate::core::store::EntityStore::upsert_requirement_rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementRow {
    /// Consumed ingredient
    pub ingredient_id: String,
    /// Quantity per product unit
    pub qty_per_product: f64,
}

impl RequirementRow {
    /// Creates a row.
    #[must_use]
    pub fn new(ingredient_id: impl Into<String>, qty_per_product: f64) -> Self {
        Self {
            ingredient_id: ingredient_id.into(),
            qty_per_product,
        }
    }

    /// A row may be committed only with an ingredient and a positive quantity.
    #[must_use]
    pub fn is_committable(&self) -> bool {
        !self.ingredient_id.trim().is_empty()
            && self.qty_per_product.is_finite()
            && self.qty_per_product > 0.0
    }
}

/// A non-material cost spread over one calculated batch (gas, packaging, ...).
///
/// Lives only as long as the calculation that uses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalCost {
    /// Generated identifier (`cost_...`)
    pub id: String,
    /// Label shown in the report
    pub name: String,
    /// Amount; `None` when the field was left empty
    pub amount: Option<f64>,
}

impl AdditionalCost {
    /// Creates a cost row with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, amount: Option<f64>) -> Self {
        Self {
            id: generate_id(IdKind::Cost),
            name: name.into(),
            amount,
        }
    }

    /// Amount with empty and non-numeric values counted as zero.
    #[must_use]
    pub fn effective_amount(&self) -> f64 {
        self.amount.filter(|a| a.is_finite()).unwrap_or(0.0)
    }
}

/// Validated input for a new product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    /// Trimmed, non-empty name
    pub name: String,
    /// Channel label
    pub product_type: String,
    /// Default markup
    pub default_margin_percent: f64,
}

impl ProductDraft {
    /// Validates and trims the product fields.
    ///
    /// # Errors
    /// Returns an error if the name is blank or the margin is not finite.
    pub fn new(
        name: impl Into<String>,
        product_type: impl Into<String>,
        default_margin_percent: f64,
    ) -> Result<Self> {
        let name = validated_name(name.into(), "Product")?;
        if !default_margin_percent.is_finite() {
            return Err(Error::InvalidAmount {
                amount: default_margin_percent,
            });
        }

        Ok(Self {
            name,
            product_type: product_type.into().trim().to_string(),
            default_margin_percent,
        })
    }
}

/// Validated input for a new ingredient.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientDraft {
    /// Trimmed, non-empty name
    pub name: String,
    /// Unit label
    pub unit: Unit,
    /// Non-negative price of one unit
    pub price_per_unit: f64,
}

impl IngredientDraft {
    /// Validates and trims the ingredient fields.
    ///
    /// # Errors
    /// Returns an error if the name is blank or the price is negative or not finite.
    pub fn new(name: impl Into<String>, unit: Unit, price_per_unit: f64) -> Result<Self> {
        let name = validated_name(name.into(), "Ingredient")?;
        validate_price(price_per_unit)?;

        Ok(Self {
            name,
            unit,
            price_per_unit,
        })
    }
}

/// Partial update for a product; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    /// New name
    pub name: Option<String>,
    /// New channel label
    pub product_type: Option<String>,
    /// New default markup
    pub default_margin_percent: Option<f64>,
}

/// Partial update for an ingredient; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientPatch {
    /// New name
    pub name: Option<String>,
    /// New unit label
    pub unit: Option<Unit>,
    /// New price per unit
    pub price_per_unit: Option<f64>,
}

impl ProductPatch {
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validated_name(name.clone(), "Product")?;
        }
        match self.default_margin_percent {
            Some(margin) if !margin.is_finite() => Err(Error::InvalidAmount { amount: margin }),
            _ => Ok(()),
        }
    }
}

impl IngredientPatch {
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validated_name(name.clone(), "Ingredient")?;
        }
        if let Some(price) = self.price_per_unit {
            validate_price(price)?;
        }
        Ok(())
    }
}

fn validated_name(name: String, kind: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Config {
            message: format!("{kind} name cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: f64) -> Result<()> {
    if price < 0.0 || !price.is_finite() {
        return Err(Error::InvalidAmount { amount: price });
    }
    Ok(())
}
