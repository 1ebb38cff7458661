//! # Document Store
//!
//! Typed collections held in memory and optionally mirrored to a data
//! directory as one JSON array per collection.

pub mod collection;
pub mod database;
pub mod errors;

pub use collection::{Collection, Document};
pub use database::Database;
pub use errors::{StoreError, StoreResult};
