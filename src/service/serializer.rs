//! Request body -> column values, and stored row -> response body, driven by entity field rules.

use crate::error::{AppError, FieldErrors, NON_FIELD_ERRORS};
use crate::model::{EntityDef, FieldDef, FieldKind, Format};
use crate::store::Row;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_STRING: &str = "Not a valid string.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

/// How much of the entity a request body must describe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// POST: required fields must be present.
    Create,
    /// PUT: required fields must be present; absent optional fields are left alone.
    Replace,
    /// PATCH: only the fields present are validated and written.
    Partial,
}

pub struct Serializer;

impl Serializer {
    /// Validate a request body against the entity's writable fields.
    /// Read-only and unknown keys are dropped; every field error is collected before returning.
    pub fn deserialize(entity: &EntityDef, body: Value, mode: Mode) -> Result<Row, AppError> {
        let mut body = match body {
            Value::Object(m) => m,
            other => {
                return Err(AppError::field(
                    NON_FIELD_ERRORS,
                    format!("Invalid data. Expected an object, but got {}.", json_type_name(&other)),
                ))
            }
        };

        let mut values = Row::new();
        let mut errors = FieldErrors::new();
        for field in entity.writable_fields() {
            match body.remove(field.name) {
                Some(raw) => match validate_field(field, raw) {
                    Ok(v) => {
                        values.insert(field.name.to_string(), v);
                    }
                    Err(messages) => {
                        errors.insert(field.name.to_string(), messages);
                    }
                },
                None if field.required && mode != Mode::Partial => {
                    errors.insert(field.name.to_string(), vec![REQUIRED.to_string()]);
                }
                None => {}
            }
        }

        if errors.is_empty() {
            Ok(values)
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Project a stored row onto the entity's declared fields.
    pub fn serialize(entity: &EntityDef, row: &Row) -> Value {
        let mut out = Map::new();
        for field in entity.fields {
            out.insert(field.name.to_string(), row.get(field.name).cloned().unwrap_or(Value::Null));
        }
        Value::Object(out)
    }
}

fn validate_field(field: &FieldDef, raw: Value) -> Result<Value, Vec<String>> {
    if raw.is_null() {
        return Err(vec![NOT_NULL.to_string()]);
    }
    match field.kind {
        FieldKind::Text => validate_text(field, raw).map(Value::String),
        FieldKind::Bool => match raw {
            Value::Bool(b) => Ok(Value::Bool(b)),
            _ => Err(vec!["Must be a valid boolean.".to_string()]),
        },
        FieldKind::Id => Err(vec!["This field is read only.".to_string()]),
    }
}

fn validate_text(field: &FieldDef, raw: Value) -> Result<String, Vec<String>> {
    let s = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(vec![NOT_STRING.to_string()]),
    };
    if s.is_empty() {
        if field.allow_blank {
            return Ok(String::new());
        }
        return Err(vec![NOT_BLANK.to_string()]);
    }

    let mut messages = Vec::new();
    if let Some(max) = field.max_length {
        if s.chars().count() > max {
            messages.push(format!("Ensure this field has no more than {} characters.", max));
        }
    }
    if let Some(format) = field.format {
        if let Err(message) = validate_format(&s, format) {
            messages.push(message.to_string());
        }
    }
    if messages.is_empty() {
        Ok(s)
    } else {
        Err(messages)
    }
}

fn validate_format(s: &str, format: Format) -> Result<(), &'static str> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    static USERNAME: OnceLock<Option<Regex>> = OnceLock::new();
    match format {
        Format::Email if !pattern_matches(&EMAIL, EMAIL_PATTERN, s) => Err(INVALID_EMAIL),
        Format::Username if !pattern_matches(&USERNAME, USERNAME_PATTERN, s) => Err(INVALID_USERNAME),
        _ => Ok(()),
    }
}

const EMAIL_PATTERN: &str =
    r"^[^@\s]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$";
const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";

/// A pattern that fails to compile matches nothing.
fn pattern_matches(cell: &OnceLock<Option<Regex>>, pattern: &str, s: &str) -> bool {
    cell.get_or_init(|| {
        Regex::new(pattern)
            .map_err(|e| tracing::error!(pattern, error = %e, "invalid pattern"))
            .ok()
    })
    .as_ref()
    .is_some_and(|re| re.is_match(s))
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
