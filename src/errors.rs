use thiserror::Error;

/// Every failure the library can report.
///
/// Degraded numeric input and storage hiccups never show up here: those are
/// coerced or swallowed at the boundary. What remains are integration bugs
/// (unknown ids, malformed recipe rows) and configuration/IO problems.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration or user-input validation error
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// No product with the given id or name
    #[error("Product not found: {name}")]
    ProductNotFound {
        /// Id or name that was looked up
        name: String,
    },

    /// No ingredient with the given id or name
    #[error("Ingredient not found: {name}")]
    IngredientNotFound {
        /// Id or name that was looked up
        name: String,
    },

    /// A monetary amount or quantity that is negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected value
        amount: f64,
    },

    /// A unit label outside the supported vocabulary
    #[error("Invalid unit: {unit}")]
    InvalidUnit {
        /// The rejected label
        unit: String,
    },

    /// A recipe row that must have been filtered out before committing
    #[error("Invalid recipe row: {reason}")]
    InvalidRequirement {
        /// Why the row was rejected
        reason: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
