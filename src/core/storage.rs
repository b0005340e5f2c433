//! Persistence of the catalog as JSON documents in the key-value table.
//!
//! Each collection is stored under a fixed key. Storage is best effort: a
//! missing, unreadable or corrupt entry loads as the empty default and a failed
//! write is logged and dropped, so the in-memory store keeps working either way.

use crate::{
    core::{
        exchange::ImportSnapshot,
        reconcile::{ImportSummary, import_snapshot},
        store::EntityStore,
    },
    entities::{StorageEntry, StorageEntryActiveModel, StorageEntryColumn},
    errors::Result,
    models::{Ingredient, Product, Requirement},
};
use sea_orm::{ConnectionTrait, Set, prelude::*};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

/// Key of the product collection
pub const PRODUCTS_KEY: &str = "so_products";
/// Key of the ingredient collection
pub const INGREDIENTS_KEY: &str = "so_ingredients";
/// Key of the recipe row collection
pub const REQUIREMENTS_KEY: &str = "so_requirements";
/// Set once the seed catalog has been applied to this database
pub const SEEDED_KEY: &str = "so_seeded";

/// Reads and deserializes the value stored under `key`.
///
/// Falls back to `T::default()` if the key is absent, the stored JSON does not
/// parse, or the database cannot be queried.
pub async fn load_or_default<T, C>(db: &C, key: &str) -> T
where
    T: DeserializeOwned + Default,
    C: ConnectionTrait,
{
    let entry = match StorageEntry::find()
        .filter(StorageEntryColumn::Key.eq(key))
        .one(db)
        .await
    {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            debug!("No stored value for '{}'", key);
            return T::default();
        }
        Err(e) => {
            warn!("Failed to read '{}' from storage: {}", key, e);
            return T::default();
        }
    };

    serde_json::from_str(&entry.value).unwrap_or_else(|e| {
        warn!("Stored value for '{}' is not valid JSON: {}", key, e);
        T::default()
    })
}

/// Serializes `value` and stores it under `key`, replacing any previous value.
///
/// Failures are logged and otherwise ignored.
pub async fn save_value<T, C>(db: &C, key: &str, value: &T)
where
    T: Serialize + ?Sized,
    C: ConnectionTrait,
{
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize '{}': {}", key, e);
            return;
        }
    };

    if let Err(e) = upsert_entry(db, key, json).await {
        warn!("Failed to write '{}' to storage: {}", key, e);
    }
}

async fn upsert_entry<C>(db: &C, key: &str, value: String) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now().naive_utc();
    let existing = StorageEntry::find()
        .filter(StorageEntryColumn::Key.eq(key))
        .one(db)
        .await?;

    match existing {
        Some(entry) => {
            let mut entry: StorageEntryActiveModel = entry.into();
            entry.value = Set(value);
            entry.updated_at = Set(now);
            entry.update(db).await?;
        }
        None => {
            let entry = StorageEntryActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                updated_at: Set(now),
                ..Default::default()
            };
            entry.insert(db).await?;
        }
    }

    debug!("Stored '{}'", key);
    Ok(())
}

/// Loads all three collections and rebuilds the store.
///
/// Recipe rows that no longer line up with the loaded products and ingredients
/// are dropped.
pub async fn load_store<C>(db: &C) -> EntityStore
where
    C: ConnectionTrait,
{
    let products: Vec<Product> = load_or_default(db, PRODUCTS_KEY).await;
    let ingredients: Vec<Ingredient> = load_or_default(db, INGREDIENTS_KEY).await;
    let requirements: Vec<Requirement> = load_or_default(db, REQUIREMENTS_KEY).await;
    EntityStore::from_parts(products, ingredients, requirements)
}

/// Writes all three collections.
pub async fn save_store<C>(db: &C, store: &EntityStore)
where
    C: ConnectionTrait,
{
    save_value(db, PRODUCTS_KEY, store.products()).await;
    save_value(db, INGREDIENTS_KEY, store.ingredients()).await;
    save_value(db, REQUIREMENTS_KEY, store.requirements()).await;
}

/// Merges the seed catalog into `store` the first time a database is used.
///
/// The catalog and a marker are saved right away; later calls see the marker and
/// do nothing, so records the user removed stay removed. Returns `None` when the
/// seed was skipped.
///
/// # Errors
/// Returns an error if the import itself fails.
pub async fn apply_seed_once<C>(
    db: &C,
    store: &mut EntityStore,
    seed: &ImportSnapshot,
) -> Result<Option<ImportSummary>>
where
    C: ConnectionTrait,
{
    if seed.is_empty() {
        return Ok(None);
    }
    if load_or_default::<bool, _>(db, SEEDED_KEY).await {
        debug!("Seed catalog already applied");
        return Ok(None);
    }

    let summary = import_snapshot(store, seed)?;
    save_store(db, store).await;
    save_value(db, SEEDED_KEY, &true).await;
    info!(
        "Applied seed catalog: {} products, {} ingredients, {} recipes",
        summary.products_added, summary.ingredients_added, summary.recipes_replaced
    );
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_missing_key_loads_default() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;

        let products: Vec<Product> = load_or_default(&db, PRODUCTS_KEY).await;
        assert!(products.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_load_value() -> Result<()> {
        let db = setup_test_db().await?;
        save_value(&db, "numbers", &vec![1, 2, 3]).await;

        let numbers: Vec<i32> = load_or_default(&db, "numbers").await;
        assert_eq!(numbers, vec![1, 2, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_key() -> Result<()> {
        let db = setup_test_db().await?;
        save_value(&db, "numbers", &vec![1]).await;
        save_value(&db, "numbers", &vec![7, 8]).await;

        let numbers: Vec<i32> = load_or_default(&db, "numbers").await;
        assert_eq!(numbers, vec![7, 8]);
        assert_eq!(StorageEntry::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_json_falls_back_to_default() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        upsert_entry(&db, INGREDIENTS_KEY, "{not json".to_string()).await?;

        let ingredients: Vec<Ingredient> = load_or_default(&db, INGREDIENTS_KEY).await;
        assert!(ingredients.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_table_is_swallowed() -> Result<()> {
        init_test_tracing();
        // No create_tables: every query fails
        let db = sea_orm::Database::connect("sqlite::memory:").await?;

        save_value(&db, PRODUCTS_KEY, &Vec::<Product>::new()).await;
        let store = load_store(&db).await;
        assert_eq!(store, EntityStore::new());
        Ok(())
    }

    #[tokio::test]
    async fn test_store_survives_save_and_load() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = bakery_fixture();

        save_store(&db, &fixture.store).await;
        let loaded = load_store(&db).await;
        assert_eq!(loaded, fixture.store);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_drops_dangling_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = bakery_fixture();
        save_store(&db, &fixture.store).await;

        // Persist a product list without Cake, as an older write might have
        let products: Vec<Product> = fixture
            .store
            .products()
            .iter()
            .filter(|p| p.id != fixture.cake)
            .cloned()
            .collect();
        save_value(&db, PRODUCTS_KEY, &products).await;

        let loaded = load_store(&db).await;
        assert_eq!(loaded.products().len(), 1);
        assert_eq!(loaded.requirements_for(&fixture.cake).count(), 0);
        assert_eq!(loaded.requirements_for(&fixture.bread).count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_legacy_unit_label_loads() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_entry(
            &db,
            INGREDIENTS_KEY,
            r#"[{"id":"ing_a","name":"Butter","unit":"gr","pricePerUnit":120}]"#.to_string(),
        )
        .await?;

        let ingredients: Vec<Ingredient> = load_or_default(&db, INGREDIENTS_KEY).await;
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].unit, crate::models::Unit::Gram);
        Ok(())
    }

    fn seed_settings() -> crate::config::settings::Settings {
        toml::from_str(
            r#"
            [[ingredients]]
            name = "Flour"
            unit = "kg"
            price_per_unit = 12000.0

            [[ingredients]]
            name = "Sugar"
            unit = "kg"
            price_per_unit = 15000.0

            [[products]]
            name = "Sponge Cake"

            [[requirements]]
            product = "Sponge Cake"
            ingredient = "Flour"
            qty_per_product = 0.2
        "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_seed_applies_once() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let settings = seed_settings();

        let mut store = load_store(&db).await;
        let seed = settings.seed_snapshot_for(&store);
        let summary = apply_seed_once(&db, &mut store, &seed).await?.unwrap();
        assert_eq!(summary.products_added, 1);
        assert_eq!(summary.ingredients_added, 2);
        assert_eq!(load_store(&db).await, store);

        // Remove seeded records and persist, as a remove command would
        let cake = store.product_by_name("Sponge Cake").unwrap().id.clone();
        let flour = store.ingredient_by_name("Flour").unwrap().id.clone();
        store.remove_product(&cake);
        store.remove_ingredient(&flour);
        save_store(&db, &store).await;

        // Next start: reload and seed again
        let mut store = load_store(&db).await;
        let seed = settings.seed_snapshot_for(&store);
        let skipped = apply_seed_once(&db, &mut store, &seed).await?;
        assert!(skipped.is_none());
        assert!(store.product_by_name("Sponge Cake").is_none());
        assert!(store.ingredient_by_name("Flour").is_none());
        assert!(store.requirements().is_empty());
        assert_eq!(store.ingredients().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_seed_leaves_marker_unset() -> Result<()> {
        let db = setup_test_db().await?;
        let mut store = EntityStore::new();

        let result = apply_seed_once(&db, &mut store, &ImportSnapshot::default()).await?;
        assert!(result.is_none());
        let seeded: bool = load_or_default(&db, SEEDED_KEY).await;
        assert!(!seeded);

        // A seed added to the config later still applies to this database
        let result =
            apply_seed_once(&db, &mut store, &seed_settings().seed_snapshot()).await?;
        assert!(result.is_some());
        assert_eq!(store.products().len(), 1);
        Ok(())
    }
}
