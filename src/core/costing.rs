//! Costing calculator - turns a resolved recipe and batch inputs into a cost report.
//!
//! Everything here is pure arithmetic: no store access, no logging, no failure
//! path. Missing or non-numeric inputs arrive as `None` (or NaN) and count as zero,
//! so calling [`calculate`] twice with the same inputs always gives the same report.

use crate::{
    core::recipe::ResolvedRow,
    models::{AdditionalCost, Product, Unit},
};

/// Decimal places kept when showing a price derived from a bulk purchase.
pub const DISPLAY_PRICE_DECIMALS: i32 = 6;

/// Which markup a calculation uses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarginPolicy {
    /// The product's default markup (zero when no product is selected)
    pub default_percent: f64,
    /// Markup entered for this calculation only
    pub override_percent: Option<f64>,
}

impl MarginPolicy {
    /// Uses the product's default markup.
    #[must_use]
    pub const fn for_product(product: &Product) -> Self {
        Self {
            default_percent: product.default_margin_percent,
            override_percent: None,
        }
    }

    /// Replaces the default with `override_percent` when it holds a number.
    #[must_use]
    pub fn with_override(mut self, override_percent: Option<f64>) -> Self {
        self.override_percent = override_percent;
        self
    }

    /// The markup percentage that applies; invalid values count as zero.
    #[must_use]
    pub fn effective_percent(&self) -> f64 {
        let percent = self
            .override_percent
            .filter(|p| p.is_finite())
            .unwrap_or(self.default_percent);
        if percent.is_finite() { percent } else { 0.0 }
    }
}

/// One line of the shopping list for a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseLine {
    /// Ingredient id
    pub ingredient_id: String,
    /// Ingredient name
    pub name: String,
    /// Ingredient unit
    pub unit: Unit,
    /// Quantity per product unit
    pub qty_per_product: f64,
    /// Quantity for the whole batch
    pub qty_total: f64,
    /// Price of one ingredient unit
    pub price_per_unit: f64,
    /// `qty_total × price_per_unit`
    pub subtotal: f64,
}

/// Everything a calculation derives from its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct CostReport {
    /// Batch size after coercing invalid input to zero
    pub batch_quantity: f64,
    /// Markup percentage actually applied
    pub margin_percent: f64,
    /// Ingredient cost of one product unit
    pub material_cost_per_unit: f64,
    /// Ingredient cost of the whole batch
    pub total_material_cost: f64,
    /// Sum of all additional costs
    pub total_additional_cost: f64,
    /// Additional costs spread over the batch
    pub additional_cost_per_unit: f64,
    /// Material plus additional cost of one unit
    pub production_cost_per_unit: f64,
    /// Money needed up front for the batch
    pub initial_capital: f64,
    /// Production cost with markup applied
    pub selling_price_per_unit: f64,
    /// Selling price minus production cost (negative for a loss)
    pub profit_per_unit: f64,
    /// Profit over the whole batch
    pub total_profit: f64,
    /// Ingredients to buy, one line per recipe row
    pub purchase_list: Vec<PurchaseLine>,
}

/// Computes the full cost report for a batch.
///
/// Non-finite batch quantities count as zero, which yields zero batch totals and
/// skips spreading additional costs. Negative margins are applied as given.
#[must_use]
pub fn calculate(
    rows: &[ResolvedRow],
    batch_quantity: Option<f64>,
    margin: MarginPolicy,
    additional_costs: &[AdditionalCost],
) -> CostReport {
    let batch_quantity = batch_quantity.filter(|q| q.is_finite()).unwrap_or(0.0);
    let margin_percent = margin.effective_percent();

    let material_cost_per_unit = rows
        .iter()
        .fold(0.0, |sum, row| sum + row.qty_per_product * row.price_per_unit);
    let total_additional_cost = additional_costs
        .iter()
        .fold(0.0, |sum, cost| sum + cost.effective_amount());
    let additional_cost_per_unit = if batch_quantity > 0.0 {
        total_additional_cost / batch_quantity
    } else {
        0.0
    };

    let production_cost_per_unit = material_cost_per_unit + additional_cost_per_unit;
    let initial_capital = production_cost_per_unit * batch_quantity;
    let selling_price_per_unit = production_cost_per_unit * (1.0 + margin_percent / 100.0);
    let profit_per_unit = selling_price_per_unit - production_cost_per_unit;
    let total_profit = profit_per_unit * batch_quantity;

    let purchase_list = rows
        .iter()
        .map(|row| {
            let qty_total = row.qty_per_product * batch_quantity;
            PurchaseLine {
                ingredient_id: row.ingredient_id.clone(),
                name: row.name.clone(),
                unit: row.unit,
                qty_per_product: row.qty_per_product,
                qty_total,
                price_per_unit: row.price_per_unit,
                subtotal: qty_total * row.price_per_unit,
            }
        })
        .collect();

    CostReport {
        batch_quantity,
        margin_percent,
        material_cost_per_unit,
        total_material_cost: material_cost_per_unit * batch_quantity,
        total_additional_cost,
        additional_cost_per_unit,
        production_cost_per_unit,
        initial_capital,
        selling_price_per_unit,
        profit_per_unit,
        total_profit,
        purchase_list,
    }
}

/// Price of one unit derived from a bulk purchase (`total_price / total_quantity`).
///
/// Returns `None` unless both inputs are finite and positive, in which case the
/// caller falls back to a directly entered price.
#[must_use]
pub fn derive_price_per_unit(total_price: Option<f64>, total_quantity: Option<f64>) -> Option<f64> {
    match (total_price, total_quantity) {
        (Some(price), Some(qty)) if price.is_finite() && qty.is_finite() && price > 0.0 && qty > 0.0 => {
            Some(price / qty)
        }
        _ => None,
    }
}

/// Rounds a derived price to [`DISPLAY_PRICE_DECIMALS`] places for the entry preview.
#[must_use]
pub fn round_for_display(value: f64) -> f64 {
    let factor = 10f64.powi(DISPLAY_PRICE_DECIMALS);
    (value * factor).round() / factor
}
