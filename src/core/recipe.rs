//! Recipe resolution - joins a product's recipe rows against the ingredient table.

use crate::{
    core::store::EntityStore,
    errors::Result,
    models::{Ingredient, RequirementRow, Unit},
};
use tracing::debug;

/// A recipe row with the ingredient it points at filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow {
    /// Ingredient id
    pub ingredient_id: String,
    /// Ingredient name
    pub name: String,
    /// Ingredient unit
    pub unit: Unit,
    /// Ingredient price per unit
    pub price_per_unit: f64,
    /// Quantity consumed per product unit
    pub qty_per_product: f64,
}

impl ResolvedRow {
    /// Pairs an ingredient with the quantity a product needs of it.
    #[must_use]
    pub fn new(ingredient: &Ingredient, qty_per_product: f64) -> Self {
        Self {
            ingredient_id: ingredient.id.clone(),
            name: ingredient.name.clone(),
            unit: ingredient.unit,
            price_per_unit: ingredient.price_per_unit,
            qty_per_product,
        }
    }
}

/// Resolves the recipe of `product_id` in insertion order.
///
/// Rows whose ingredient cannot be found are skipped. An unknown product simply
/// has no rows.
#[must_use]
pub fn resolve_recipe(store: &EntityStore, product_id: &str) -> Vec<ResolvedRow> {
    store
        .requirements_for(product_id)
        .filter_map(|requirement| {
            let ingredient = store.ingredient(&requirement.ingredient_id);
            if ingredient.is_none() {
                debug!(
                    "Skipping recipe row of {} with unknown ingredient {}",
                    product_id, requirement.ingredient_id
                );
            }
            ingredient.map(|i| ResolvedRow::new(i, requirement.qty_per_product))
        })
        .collect()
}

/// Sorts resolved rows by ingredient name for display.
#[must_use]
pub fn sorted_by_ingredient_name(mut rows: Vec<ResolvedRow>) -> Vec<ResolvedRow> {
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// One editable line of a [`RecipeDraft`].
#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    /// Chosen ingredient id; empty while nothing is selected
    pub ingredient_id: String,
    /// Entered quantity; `None` while the field is empty
    pub qty_per_product: Option<f64>,
}

/// Staged recipe edits for one product.
///
/// Lines may be incomplete while being edited. Nothing reaches the store until
/// [`commit`](Self::commit), which drops incomplete lines and replaces the
/// product's recipe in one step.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    product_id: String,
    lines: Vec<DraftLine>,
}

impl RecipeDraft {
    /// Starts an empty draft.
    #[must_use]
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            lines: Vec::new(),
        }
    }

    /// Starts a draft pre-filled with the product's current recipe.
    #[must_use]
    pub fn from_store(store: &EntityStore, product_id: &str) -> Self {
        let lines = store
            .requirements_for(product_id)
            .map(|r| DraftLine {
                ingredient_id: r.ingredient_id.clone(),
                qty_per_product: Some(r.qty_per_product),
            })
            .collect();
        Self {
            product_id: product_id.to_string(),
            lines,
        }
    }

    /// Product this draft edits.
    #[must_use]
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Current lines, complete or not.
    #[must_use]
    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    /// Appends a line.
    pub fn push_line(&mut self, ingredient_id: impl Into<String>, qty_per_product: Option<f64>) {
        self.lines.push(DraftLine {
            ingredient_id: ingredient_id.into(),
            qty_per_product,
        });
    }

    /// Replaces the line at `index`; out-of-range indexes are ignored.
    pub fn set_line(&mut self, index: usize, line: DraftLine) {
        if let Some(slot) = self.lines.get_mut(index) {
            *slot = line;
        }
    }

    /// Removes the line at `index` and returns it.
    pub fn remove_line(&mut self, index: usize) -> Option<DraftLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    /// Lines that would survive a commit.
    #[must_use]
    pub fn committable_rows(&self) -> Vec<RequirementRow> {
        self.lines
            .iter()
            .filter_map(|line| {
                let row = RequirementRow::new(line.ingredient_id.clone(), line.qty_per_product?);
                row.is_committable().then_some(row)
            })
            .collect()
    }

    /// Writes the complete lines to the store, replacing the product's recipe.
    ///
    /// # Errors
    /// Propagates the store's errors (unknown product or ingredient).
    pub fn commit(self, store: &mut EntityStore) -> Result<usize> {
        let rows = self.committable_rows();
        debug!(
            "Committing recipe draft for {}: {} of {} lines complete",
            self.product_id,
            rows.len(),
            self.lines.len()
        );
        store.upsert_requirement_rows(&self.product_id, rows)
    }
}
