/// Database configuration and connection management
pub mod database;

/// Application settings and seed catalog from config.toml
pub mod settings;
