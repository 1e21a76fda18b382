//! Row storage behind a trait: PostgreSQL for deployments, in-memory for tests and database-less runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, ensure_tables, PgStore};

use crate::error::AppError;
use crate::model::EntityDef;
use async_trait::async_trait;
use serde_json::Value;

/// One stored record: column name -> value.
pub type Row = serde_json::Map<String, Value>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Every row of the entity, ordered by id.
    async fn list(&self, entity: &EntityDef) -> Result<Vec<Row>, AppError>;

    async fn fetch(&self, entity: &EntityDef, id: i64) -> Result<Option<Row>, AppError>;

    /// Insert validated column values; storage assigns the id and fills defaults.
    async fn insert(&self, entity: &EntityDef, values: &Row) -> Result<Row, AppError>;

    /// Overwrite the given columns. Returns None when no row has this id.
    async fn update(&self, entity: &EntityDef, id: i64, values: &Row) -> Result<Option<Row>, AppError>;

    /// Returns false when no row has this id.
    async fn delete(&self, entity: &EntityDef, id: i64) -> Result<bool, AppError>;

    /// Whether a row other than `exclude_id` already holds `value` in `column`.
    async fn exists(
        &self,
        entity: &EntityDef,
        column: &str,
        value: &Value,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}
