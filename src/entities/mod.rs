//! Entity module - Contains the SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod storage_entry;

pub use storage_entry::{
    ActiveModel as StorageEntryActiveModel, Column as StorageEntryColumn, Entity as StorageEntry,
    Model as StorageEntryModel,
};
