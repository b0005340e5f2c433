//! Import reconciliation - merges an external snapshot into the store without duplicates.
//!
//! Products and ingredients are matched by exact name and never overwritten. Recipe
//! rows are resolved against the store *after* the new records were inserted (the
//! same `&mut EntityStore` is used throughout, so there is no stale view to read),
//! grouped per product, and committed with the store's replace-all operation.

use crate::{
    core::{
        exchange::{ImportIngredient, ImportProduct, ImportRequirement, ImportSnapshot},
        store::EntityStore,
    },
    errors::Result,
    models::{IngredientDraft, ProductDraft, RequirementRow, Unit},
};
use tracing::{debug, info, warn};

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Products created
    pub products_added: usize,
    /// Products skipped because the name already existed
    pub products_existing: usize,
    /// Ingredients created
    pub ingredients_added: usize,
    /// Ingredients skipped because the name already existed
    pub ingredients_existing: usize,
    /// Product or ingredient records rejected (blank name, bad unit or price)
    pub records_invalid: usize,
    /// Products whose recipe was replaced
    pub recipes_replaced: usize,
    /// Recipe rows committed
    pub requirements_committed: usize,
    /// Recipe rows dropped (unresolved side or non-positive quantity)
    pub requirements_dropped: usize,
}

/// Merges `snapshot` into `store`.
///
/// # Errors
/// Only fails on an internal inconsistency; every row handed to the store has been
/// resolved against it first.
pub fn import_snapshot(store: &mut EntityStore, snapshot: &ImportSnapshot) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for record in &snapshot.products {
        import_product(store, record, &mut summary);
    }
    for record in &snapshot.ingredients {
        import_ingredient(store, record, &mut summary);
    }

    let groups = resolve_requirements(store, &snapshot.requirements, &mut summary);
    for (product_id, rows) in groups {
        summary.requirements_committed += store.upsert_requirement_rows(&product_id, rows)?;
        summary.recipes_replaced += 1;
    }

    info!(
        "Import finished: {} products and {} ingredients added, {} recipes replaced ({} rows, {} dropped)",
        summary.products_added,
        summary.ingredients_added,
        summary.recipes_replaced,
        summary.requirements_committed,
        summary.requirements_dropped
    );
    Ok(summary)
}

fn import_product(store: &mut EntityStore, record: &ImportProduct, summary: &mut ImportSummary) {
    if store.product_by_name(record.name.trim()).is_some() {
        summary.products_existing += 1;
        return;
    }

    let draft = ProductDraft::new(
        record.name.clone(),
        record.product_type.clone().unwrap_or_default(),
        record.default_margin_percent.unwrap_or(0.0),
    );
    match draft {
        Ok(draft) => {
            store.add_product(draft);
            summary.products_added += 1;
        }
        Err(e) => {
            warn!("Skipping imported product '{}': {}", record.name, e);
            summary.records_invalid += 1;
        }
    }
}

fn import_ingredient(
    store: &mut EntityStore,
    record: &ImportIngredient,
    summary: &mut ImportSummary,
) {
    if store.ingredient_by_name(record.name.trim()).is_some() {
        summary.ingredients_existing += 1;
        return;
    }

    let draft = record.unit.parse::<Unit>().and_then(|unit| {
        IngredientDraft::new(
            record.name.clone(),
            unit,
            record.price_per_unit.unwrap_or(0.0),
        )
    });
    match draft {
        Ok(draft) => {
            store.add_ingredient(draft);
            summary.ingredients_added += 1;
        }
        Err(e) => {
            warn!("Skipping imported ingredient '{}': {}", record.name, e);
            summary.records_invalid += 1;
        }
    }
}

/// Resolves each row to store ids and groups them by product, keeping first-seen order.
fn resolve_requirements(
    store: &EntityStore,
    records: &[ImportRequirement],
    summary: &mut ImportSummary,
) -> Vec<(String, Vec<RequirementRow>)> {
    let mut groups: Vec<(String, Vec<RequirementRow>)> = Vec::new();

    for record in records {
        let product_id = lookup(
            record.product_id.as_deref(),
            record.product.as_deref(),
            |id| store.product(id).map(|p| p.id.clone()),
            |name| store.product_by_name(name).map(|p| p.id.clone()),
        );
        let ingredient_id = lookup(
            record.ingredient_id.as_deref(),
            record.ingredient.as_deref(),
            |id| store.ingredient(id).map(|i| i.id.clone()),
            |name| store.ingredient_by_name(name).map(|i| i.id.clone()),
        );
        let qty = record.qty_per_product.unwrap_or(0.0);

        let (Some(product_id), Some(ingredient_id)) = (product_id, ingredient_id) else {
            debug!("Dropping unresolved recipe row {:?}", record);
            summary.requirements_dropped += 1;
            continue;
        };
        let row = RequirementRow::new(ingredient_id, qty);
        if !row.is_committable() {
            debug!("Dropping recipe row with quantity {}", qty);
            summary.requirements_dropped += 1;
            continue;
        }

        match groups.iter_mut().find(|(pid, _)| *pid == product_id) {
            Some((_, rows)) => rows.push(row),
            None => groups.push((product_id, vec![row])),
        }
    }

    groups
}

/// Id lookup first, name lookup as the fallback.
fn lookup(
    id: Option<&str>,
    name: Option<&str>,
    by_id: impl Fn(&str) -> Option<String>,
    by_name: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    id.filter(|id| !id.is_empty())
        .and_then(by_id)
        .or_else(|| name.map(str::trim).filter(|n| !n.is_empty()).and_then(by_name))
}
