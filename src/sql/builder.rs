//! Builds parameterized INSERT, SELECT, UPDATE, DELETE and table DDL from an entity descriptor.

use crate::model::{EntityDef, FieldDefault, FieldKind, PK};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from entity descriptors).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

fn column_list(entity: &EntityDef) -> String {
    entity
        .fields
        .iter()
        .map(|f| quoted(f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT every row ordered by primary key.
pub fn select_list(entity: &EntityDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        column_list(entity),
        quoted(entity.table),
        quoted(PK)
    );
    q
}

/// SELECT by primary key.
pub fn select_by_id(entity: &EntityDef, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        column_list(entity),
        quoted(entity.table),
        quoted(PK),
        n
    );
    q
}

/// SELECT EXISTS for a row whose `column` equals `value`, optionally ignoring the row `exclude_id`.
pub fn select_exists(entity: &EntityDef, column: &str, value: &Value, exclude_id: Option<i64>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(value.clone());
    let mut where_clause = format!("{} = ${}", quoted(column), n);
    if let Some(id) = exclude_id {
        let n = q.push_param(Value::from(id));
        where_clause.push_str(&format!(" AND {} <> ${}", quoted(PK), n));
    }
    q.sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
        quoted(entity.table),
        where_clause
    );
    q
}

/// INSERT the given column values. Columns left out take their DB default.
pub fn insert(entity: &EntityDef, values: &serde_json::Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in entity.writable_fields() {
        let Some(v) = values.get(f.name) else { continue };
        let n = q.push_param(v.clone());
        cols.push(quoted(f.name));
        placeholders.push(format!("${}", n));
    }
    let table = quoted(entity.table);
    let returning = column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only writable columns present in `values`.
/// With nothing to set this degrades to a SELECT so the caller still gets the current row.
pub fn update(entity: &EntityDef, id: i64, values: &serde_json::Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in entity.writable_fields() {
        let Some(v) = values.get(f.name) else { continue };
        let n = q.push_param(v.clone());
        sets.push(format!("{} = ${}", quoted(f.name), n));
    }
    if sets.is_empty() {
        return select_by_id(entity, id);
    }
    let id_param = q.push_param(Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        quoted(entity.table),
        sets.join(", "),
        quoted(PK),
        id_param,
        column_list(entity)
    );
    q
}

/// DELETE by id, returning the id when a row was removed.
pub fn delete(entity: &EntityDef, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${} RETURNING {}",
        quoted(entity.table),
        quoted(PK),
        n,
        quoted(PK)
    );
    q
}

/// CREATE TABLE IF NOT EXISTS with one column per field.
pub fn create_table(entity: &EntityDef) -> String {
    let columns: Vec<String> = entity
        .fields
        .iter()
        .map(|f| {
            let mut def = format!("{} ", quoted(f.name));
            match f.kind {
                FieldKind::Id => def.push_str("BIGSERIAL PRIMARY KEY"),
                FieldKind::Text => match f.max_length {
                    Some(n) => def.push_str(&format!("VARCHAR({}) NOT NULL", n)),
                    None => def.push_str("TEXT NOT NULL"),
                },
                FieldKind::Bool => def.push_str("BOOLEAN NOT NULL"),
            }
            match f.default {
                FieldDefault::None => {}
                FieldDefault::Bool(b) => def.push_str(&format!(" DEFAULT {}", if b { "TRUE" } else { "FALSE" })),
                FieldDefault::Text(s) => def.push_str(&format!(" DEFAULT '{}'", s.replace('\'', "''"))),
            }
            if f.unique && f.kind != FieldKind::Id {
                def.push_str(" UNIQUE");
            }
            def
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quoted(entity.table),
        columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ITEM, USER};
    use serde_json::json;

    fn values(v: Value) -> serde_json::Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn select_list_orders_by_id() {
        let q = select_list(&ITEM);
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name", "description" FROM "items" ORDER BY "id""#
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn insert_skips_read_only_and_absent_columns() {
        let q = insert(
            &USER,
            &values(json!({"username": "ada", "email": "ada@example.com", "is_active": false, "id": 5})),
        );
        assert_eq!(
            q.sql,
            r#"INSERT INTO "users" ("username", "email") VALUES ($1, $2) RETURNING "id", "username", "email", "first_name", "last_name", "is_active""#
        );
        assert_eq!(q.params, vec![json!("ada"), json!("ada@example.com")]);
    }

    #[test]
    fn update_binds_id_last() {
        let q = update(&ITEM, 9, &values(json!({"description": "new"})));
        assert_eq!(
            q.sql,
            r#"UPDATE "items" SET "description" = $1 WHERE "id" = $2 RETURNING "id", "name", "description""#
        );
        assert_eq!(q.params, vec![json!("new"), json!(9)]);
    }

    #[test]
    fn empty_update_reads_current_row() {
        let q = update(&ITEM, 4, &serde_json::Map::new());
        assert!(q.sql.starts_with("SELECT "));
        assert_eq!(q.params, vec![json!(4)]);
    }

    #[test]
    fn exists_can_exclude_the_row_being_updated() {
        let q = select_exists(&USER, "username", &json!("ada"), Some(3));
        assert_eq!(
            q.sql,
            r#"SELECT EXISTS(SELECT 1 FROM "users" WHERE "username" = $1 AND "id" <> $2)"#
        );
        assert_eq!(q.params, vec![json!("ada"), json!(3)]);
    }

    #[test]
    fn user_table_ddl() {
        let ddl = create_table(&USER);
        assert!(ddl.starts_with(r#"CREATE TABLE IF NOT EXISTS "users" ("#));
        assert!(ddl.contains(r#""id" BIGSERIAL PRIMARY KEY"#));
        assert!(ddl.contains(r#""username" VARCHAR(150) NOT NULL UNIQUE"#));
        assert!(ddl.contains(r#""first_name" VARCHAR(150) NOT NULL DEFAULT ''"#));
        assert!(ddl.contains(r#""is_active" BOOLEAN NOT NULL DEFAULT TRUE"#));
    }
}
