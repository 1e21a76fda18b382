use super::{Row, Store};
use crate::error::AppError;
use crate::model::{EntityDef, FieldDefault, PK};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Row>,
}

impl Table {
    fn conflicts(&self, entity: &EntityDef, values: &Row, exclude_id: Option<i64>) -> Option<&'static str> {
        entity
            .fields
            .iter()
            .filter(|f| f.unique && f.name != PK)
            .find(|f| {
                values.get(f.name).is_some_and(|v| {
                    self.rows
                        .iter()
                        .any(|(id, row)| Some(*id) != exclude_id && row.get(f.name) == Some(v))
                })
            })
            .map(|f| f.name)
    }
}

/// In-memory row store keyed by table name.
///
/// Intended for tests/dev. Ids are never reused, like a database sequence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::Storage("lock poisoned".into())
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(&self, entity: &EntityDef) -> Result<Vec<Row>, AppError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .get(entity.table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch(&self, entity: &EntityDef, id: i64) -> Result<Option<Row>, AppError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(entity.table).and_then(|t| t.rows.get(&id).cloned()))
    }

    async fn insert(&self, entity: &EntityDef, values: &Row) -> Result<Row, AppError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let table = tables.entry(entity.table).or_default();
        if let Some(column) = table.conflicts(entity, values, None) {
            return Err(AppError::Conflict(format!("{}.{} must be unique", entity.table, column)));
        }
        table.last_id += 1;
        let id = table.last_id;

        let mut row = Row::new();
        for f in entity.fields {
            let v = if f.name == PK {
                Value::from(id)
            } else if let Some(v) = values.get(f.name).filter(|_| !f.read_only) {
                v.clone()
            } else {
                match f.default {
                    FieldDefault::None => Value::Null,
                    FieldDefault::Bool(b) => Value::Bool(b),
                    FieldDefault::Text(s) => Value::from(s),
                }
            };
            row.insert(f.name.to_string(), v);
        }
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, entity: &EntityDef, id: i64, values: &Row) -> Result<Option<Row>, AppError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let Some(table) = tables.get_mut(entity.table) else {
            return Ok(None);
        };
        if !table.rows.contains_key(&id) {
            return Ok(None);
        }
        if let Some(column) = table.conflicts(entity, values, Some(id)) {
            return Err(AppError::Conflict(format!("{}.{} must be unique", entity.table, column)));
        }
        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        for f in entity.writable_fields() {
            if let Some(v) = values.get(f.name) {
                row.insert(f.name.to_string(), v.clone());
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, entity: &EntityDef, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        Ok(tables
            .get_mut(entity.table)
            .is_some_and(|t| t.rows.remove(&id).is_some()))
    }

    async fn exists(
        &self,
        entity: &EntityDef,
        column: &str,
        value: &Value,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(entity.table).is_some_and(|t| {
            t.rows
                .iter()
                .any(|(id, row)| Some(*id) != exclude_id && row.get(column) == Some(value))
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        let _tables = self.tables.read().map_err(poisoned)?;
        Ok(())
    }
}
