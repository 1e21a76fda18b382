//! PostgreSQL store: parameterized SQL from `crate::sql`, rows decoded per field kind.

use super::{Row, Store};
use crate::error::{AppError, ConfigError};
use crate::model::{EntityDef, FieldKind, ENTITIES};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgRow};
use sqlx::query::Query;
use sqlx::{ConnectOptions, PgPool, Postgres, Row as _};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn fetch_optional(&self, entity: &EntityDef, q: &QueryBuf) -> Result<Option<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_json(entity, &r)).transpose()
    }
}

fn bind_all<'q>(mut query: Query<'q, Postgres, PgArguments>, params: &[Value]) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

#[async_trait]
impl Store for PgStore {
    async fn list(&self, entity: &EntityDef) -> Result<Vec<Row>, AppError> {
        let q = sql::select_list(entity);
        tracing::debug!(sql = %q.sql, "query");
        let rows = sqlx::query(&q.sql).fetch_all(&self.pool).await?;
        rows.iter().map(|r| row_to_json(entity, r)).collect()
    }

    async fn fetch(&self, entity: &EntityDef, id: i64) -> Result<Option<Row>, AppError> {
        self.fetch_optional(entity, &sql::select_by_id(entity, id)).await
    }

    async fn insert(&self, entity: &EntityDef, values: &Row) -> Result<Row, AppError> {
        self.fetch_optional(entity, &sql::insert(entity, values))
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, entity: &EntityDef, id: i64, values: &Row) -> Result<Option<Row>, AppError> {
        self.fetch_optional(entity, &sql::update(entity, id, values)).await
    }

    async fn delete(&self, entity: &EntityDef, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(entity, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn exists(
        &self,
        entity: &EntityDef,
        column: &str,
        value: &Value,
        exclude_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let q = sql::select_exists(entity, column, value, exclude_id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, bool>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

fn row_to_json(entity: &EntityDef, row: &PgRow) -> Result<Row, AppError> {
    let mut map = Row::new();
    for f in entity.fields {
        let v = match f.kind {
            FieldKind::Id => Value::from(row.try_get::<i64, _>(f.name)?),
            FieldKind::Text => Value::from(row.try_get::<String, _>(f.name)?),
            FieldKind::Bool => Value::from(row.try_get::<bool, _>(f.name)?),
        };
        map.insert(f.name.to_string(), v);
    }
    Ok(map)
}

/// Create every entity's table if missing. Idempotent.
pub async fn ensure_tables(pool: &PgPool) -> Result<(), AppError> {
    for entity in ENTITIES {
        let ddl = sql::create_table(entity);
        tracing::debug!(sql = %ddl, "ensure table");
        sqlx::query(&ddl).execute(pool).await?;
    }
    Ok(())
}

/// Create the database named in `database_url` when it does not exist yet, via the `postgres` maintenance DB.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (maintenance, db_name) = maintenance_options(database_url)?;
    let db_name = match db_name {
        Some(name) if name != "postgres" => name,
        _ => return Ok(()),
    };
    let mut conn: sqlx::PgConnection = maintenance.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Options for the `postgres` maintenance DB on the same server, plus the target database name.
fn maintenance_options(url: &str) -> Result<(PgConnectOptions, Option<String>), ConfigError> {
    let opts = PgConnectOptions::from_str(url).map_err(|e| ConfigError::Invalid {
        var: "DATABASE_URL",
        value: "<redacted>".into(),
        reason: e.to_string(),
    })?;
    let db_name = opts.get_database().map(str::to_string).filter(|n| !n.is_empty());
    Ok((opts.database("postgres"), db_name))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
