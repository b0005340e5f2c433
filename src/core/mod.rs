//! Core business logic - catalog store, recipe resolution, costing, import/export.
//!
//! Everything here except [`storage`] is synchronous and operates on an owned
//! [`store::EntityStore`] passed by reference.

/// Calculation of per-unit and per-batch figures
pub mod costing;
/// JSON export and import file formats
pub mod exchange;
/// Prefixed, time-ordered record identifiers
pub mod ids;
/// Recipe resolution and editing drafts
pub mod recipe;
/// Name-based merge of imported catalogs
pub mod reconcile;
/// Plain-text report rendering
pub mod report;
/// Best-effort persistence of the store in the database
pub mod storage;
/// Products, ingredients and recipe rows with their invariants
pub mod store;
