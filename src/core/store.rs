//! Entity store - the only legal mutation surface for the catalog.
//!
//! Holds products, ingredients and recipe rows in memory. Every mutation keeps the
//! three collections consistent: removing a product or an ingredient removes the
//! recipe rows that point at it, and a product's recipe is only ever replaced as a
//! whole (or trimmed one row at a time), so no dangling or duplicate row can exist.

use crate::{
    core::ids::{IdKind, generate_id},
    errors::{Error, Result},
    models::{
        Ingredient, IngredientDraft, IngredientPatch, Product, ProductDraft, ProductPatch,
        Requirement, RequirementRow,
    },
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// In-memory catalog of products, ingredients and recipe rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    products: Vec<Product>,
    ingredients: Vec<Ingredient>,
    requirements: Vec<Requirement>,
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from previously persisted collections.
    ///
    /// Recipe rows that reference unknown records, repeat a product/ingredient pair,
    /// or carry a non-positive quantity are dropped so the loaded store satisfies the
    /// same invariants as one built through the mutation API. Names are trimmed, as
    /// the drafts would have done.
    #[must_use]
    pub fn from_parts(
        mut products: Vec<Product>,
        mut ingredients: Vec<Ingredient>,
        requirements: Vec<Requirement>,
    ) -> Self {
        for product in &mut products {
            trim_in_place(&mut product.name);
        }
        for ingredient in &mut ingredients {
            trim_in_place(&mut ingredient.name);
        }

        let product_ids: HashSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
        let ingredient_ids: HashSet<&str> = ingredients.iter().map(|i| i.id.as_str()).collect();
        let mut seen = HashSet::new();
        let total = requirements.len();

        let requirements: Vec<Requirement> = requirements
            .into_iter()
            .filter(|r| {
                product_ids.contains(r.product_id.as_str())
                    && ingredient_ids.contains(r.ingredient_id.as_str())
                    && r.qty_per_product.is_finite()
                    && r.qty_per_product > 0.0
                    && seen.insert((r.product_id.clone(), r.ingredient_id.clone()))
            })
            .collect();

        if requirements.len() < total {
            warn!(
                "Dropped {} inconsistent recipe rows while loading the catalog",
                total - requirements.len()
            );
        }

        Self {
            products,
            ingredients,
            requirements,
        }
    }

    /// All products in insertion order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// All ingredients in insertion order.
    #[must_use]
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    /// All recipe rows in insertion order.
    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Looks up a product by id.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Looks up an ingredient by id.
    #[must_use]
    pub fn ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.id == id)
    }

    /// First product with exactly this name (case-sensitive).
    #[must_use]
    pub fn product_by_name(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    /// First ingredient with exactly this name (case-sensitive).
    #[must_use]
    pub fn ingredient_by_name(&self, name: &str) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.name == name)
    }

    /// Recipe rows of one product, in insertion order.
    pub fn requirements_for<'a>(
        &'a self,
        product_id: &'a str,
    ) -> impl Iterator<Item = &'a Requirement> + 'a {
        self.requirements
            .iter()
            .filter(move |r| r.product_id == product_id)
    }

    /// Adds a product and returns its generated id.
    pub fn add_product(&mut self, draft: ProductDraft) -> String {
        let id = generate_id(IdKind::Product);
        info!("Adding product '{}' as {}", draft.name, id);
        self.products.push(Product {
            id: id.clone(),
            name: draft.name,
            product_type: draft.product_type,
            default_margin_percent: draft.default_margin_percent,
        });
        id
    }

    /// Merges `patch` into the product with `id`.
    ///
    /// # Errors
    /// Returns `ProductNotFound` if no product has this id, or a validation error
    /// if the patch carries a blank name or a non-finite margin.
    pub fn update_product(&mut self, id: &str, patch: ProductPatch) -> Result<&Product> {
        patch.validate()?;
        let product = self
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::ProductNotFound {
                name: id.to_string(),
            })?;

        if let Some(name) = patch.name {
            product.name = name.trim().to_string();
        }
        if let Some(product_type) = patch.product_type {
            product.product_type = product_type.trim().to_string();
        }
        if let Some(margin) = patch.default_margin_percent {
            product.default_margin_percent = margin;
        }
        info!("Updated product {}", id);
        Ok(product)
    }

    /// Removes a product and every recipe row that belongs to it.
    ///
    /// Returns the removed product, or `None` if the id was unknown.
    pub fn remove_product(&mut self, id: &str) -> Option<Product> {
        let index = self.products.iter().position(|p| p.id == id)?;
        let removed = self.products.remove(index);
        let before = self.requirements.len();
        self.requirements.retain(|r| r.product_id != id);
        info!(
            "Removed product {} and {} recipe rows",
            id,
            before - self.requirements.len()
        );
        Some(removed)
    }

    /// Adds an ingredient and returns its generated id.
    pub fn add_ingredient(&mut self, draft: IngredientDraft) -> String {
        let id = generate_id(IdKind::Ingredient);
        info!("Adding ingredient '{}' as {}", draft.name, id);
        self.ingredients.push(Ingredient {
            id: id.clone(),
            name: draft.name,
            unit: draft.unit,
            price_per_unit: draft.price_per_unit,
        });
        id
    }

    /// Merges `patch` into the ingredient with `id`.
    ///
    /// # Errors
    /// Returns `IngredientNotFound` if no ingredient has this id, or a validation
    /// error if the patch carries a blank name or an invalid price.
    pub fn update_ingredient(&mut self, id: &str, patch: IngredientPatch) -> Result<&Ingredient> {
        patch.validate()?;
        let ingredient = self
            .ingredients
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| Error::IngredientNotFound {
                name: id.to_string(),
            })?;

        if let Some(name) = patch.name {
            ingredient.name = name.trim().to_string();
        }
        if let Some(unit) = patch.unit {
            ingredient.unit = unit;
        }
        if let Some(price) = patch.price_per_unit {
            ingredient.price_per_unit = price;
        }
        info!("Updated ingredient {}", id);
        Ok(ingredient)
    }

    /// Removes an ingredient and every recipe row that uses it.
    ///
    /// Returns the removed ingredient, or `None` if the id was unknown.
    pub fn remove_ingredient(&mut self, id: &str) -> Option<Ingredient> {
        let index = self.ingredients.iter().position(|i| i.id == id)?;
        let removed = self.ingredients.remove(index);
        let before = self.requirements.len();
        self.requirements.retain(|r| r.ingredient_id != id);
        info!(
            "Removed ingredient {} and {} recipe rows",
            id,
            before - self.requirements.len()
        );
        Some(removed)
    }

    /// Replaces the whole recipe of `product_id` with `rows`.
    ///
    /// Callers filter out incomplete rows first (see [`RequirementRow::is_committable`]);
    /// a row with an empty ingredient id or a non-positive quantity is rejected here and
    /// the store is left untouched. When the same ingredient appears twice, the later
    /// quantity wins. Returns the number of rows now in the recipe.
    ///
    /// # Errors
    /// Returns `ProductNotFound`, `IngredientNotFound` or `InvalidRequirement`.
    pub fn upsert_requirement_rows(
        &mut self,
        product_id: &str,
        rows: Vec<RequirementRow>,
    ) -> Result<usize> {
        if self.product(product_id).is_none() {
            return Err(Error::ProductNotFound {
                name: product_id.to_string(),
            });
        }

        let mut replacement: Vec<Requirement> = Vec::with_capacity(rows.len());
        for row in rows {
            if !row.is_committable() {
                return Err(Error::InvalidRequirement {
                    reason: format!(
                        "ingredient '{}' with quantity {}",
                        row.ingredient_id, row.qty_per_product
                    ),
                });
            }
            if self.ingredient(&row.ingredient_id).is_none() {
                return Err(Error::IngredientNotFound {
                    name: row.ingredient_id,
                });
            }

            match replacement
                .iter_mut()
                .find(|r| r.ingredient_id == row.ingredient_id)
            {
                Some(existing) => existing.qty_per_product = row.qty_per_product,
                None => replacement.push(Requirement {
                    product_id: product_id.to_string(),
                    ingredient_id: row.ingredient_id,
                    qty_per_product: row.qty_per_product,
                }),
            }
        }

        let count = replacement.len();
        self.requirements.retain(|r| r.product_id != product_id);
        self.requirements.extend(replacement);
        info!("Replaced recipe of {} with {} rows", product_id, count);
        Ok(count)
    }

    /// Removes the single recipe row for this product/ingredient pair.
    ///
    /// Returns whether a row was removed; removing a missing row is a no-op.
    pub fn remove_requirement_row(&mut self, product_id: &str, ingredient_id: &str) -> bool {
        let before = self.requirements.len();
        self.requirements
            .retain(|r| !(r.product_id == product_id && r.ingredient_id == ingredient_id));
        let removed = self.requirements.len() < before;
        debug!(
            "Remove recipe row {}/{}: {}",
            product_id,
            ingredient_id,
            if removed { "removed" } else { "not present" }
        );
        removed
    }

    /// Appends a row without any checks, to simulate corrupted state in tests.
    #[cfg(test)]
    pub(crate) fn push_unchecked_requirement(&mut self, requirement: Requirement) {
        self.requirements.push(requirement);
    }
}

fn trim_in_place(name: &mut String) {
    let trimmed = name.trim();
    if trimmed.len() != name.len() {
        *name = trimmed.to_string();
    }
}
