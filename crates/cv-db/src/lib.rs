//! cv-db: SQLite persistence layer.
//!
//! Connection pooling via r2d2, embedded versioned migrations, row-mapped
//! models, and query modules per entity.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
