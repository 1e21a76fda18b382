//! Generic CRUD over any entity: serializer in, store, serializer out.

use crate::error::{AppError, FieldErrors};
use crate::model::EntityDef;
use crate::service::serializer::{Mode, Serializer};
use crate::store::{Row, Store};
use serde_json::Value;

pub struct CrudService;

impl CrudService {
    /// All rows, ordered by id.
    pub async fn list(store: &dyn Store, entity: &EntityDef) -> Result<Vec<Value>, AppError> {
        let rows = store.list(entity).await?;
        Ok(rows.iter().map(|r| Serializer::serialize(entity, r)).collect())
    }

    /// Validate and insert one row. Returns the created row as stored.
    pub async fn create(store: &dyn Store, entity: &EntityDef, body: Value) -> Result<Value, AppError> {
        let values = Self::validated(store, entity, body, Mode::Create, None).await?;
        let row = store.insert(entity, &values).await?;
        tracing::info!(entity = entity.name, id = ?row.get("id"), "created");
        Ok(Serializer::serialize(entity, &row))
    }

    pub async fn read(store: &dyn Store, entity: &EntityDef, id: i64) -> Result<Value, AppError> {
        let row = store.fetch(entity, id).await?.ok_or_else(|| not_found(entity, id))?;
        Ok(Serializer::serialize(entity, &row))
    }

    /// Full (PUT) or partial (PATCH) update. The row must exist before the body is validated.
    pub async fn update(
        store: &dyn Store,
        entity: &EntityDef,
        id: i64,
        body: Value,
        mode: Mode,
    ) -> Result<Value, AppError> {
        store.fetch(entity, id).await?.ok_or_else(|| not_found(entity, id))?;
        let values = Self::validated(store, entity, body, mode, Some(id)).await?;
        let row = store
            .update(entity, id, &values)
            .await?
            .ok_or_else(|| not_found(entity, id))?;
        Ok(Serializer::serialize(entity, &row))
    }

    pub async fn delete(store: &dyn Store, entity: &EntityDef, id: i64) -> Result<(), AppError> {
        if !store.delete(entity, id).await? {
            return Err(not_found(entity, id));
        }
        tracing::info!(entity = entity.name, id, "deleted");
        Ok(())
    }

    /// Serializer rules, then uniqueness against rows other than `id`.
    async fn validated(
        store: &dyn Store,
        entity: &EntityDef,
        body: Value,
        mode: Mode,
        id: Option<i64>,
    ) -> Result<Row, AppError> {
        let values = Serializer::deserialize(entity, body, mode)?;
        let mut errors = FieldErrors::new();
        for field in entity.writable_fields().filter(|f| f.unique) {
            let Some(value) = values.get(field.name) else { continue };
            if store.exists(entity, field.name, value, id).await? {
                errors.insert(
                    field.name.to_string(),
                    vec![format!("A {} with that {} already exists.", entity.name.to_lowercase(), field.name)],
                );
            }
        }
        if errors.is_empty() {
            Ok(values)
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

fn not_found(entity: &EntityDef, id: i64) -> AppError {
    AppError::NotFound(format!("{} {}", entity.name, id))
}
