//! Field values as seen by the audit layer
//!
//! A [`FieldValue`] is whatever an entity holds in one of its fields: a
//! scalar, a timestamp, raw bytes, a reference to another entity, or a
//! nested container.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::ToSql;

use crate::audit::encoding::encode_value;

/// Reference to another persisted entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    /// Table or type name of the referenced entity
    pub kind: String,
    /// Its identifier
    pub id: i64,
}

impl EntityRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
    Reference(EntityRef),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// The placeholder recorded when a field has no value in its history
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    /// Strings, numbers, booleans and null
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldValue::Null
                | FieldValue::Bool(_)
                | FieldValue::Int(_)
                | FieldValue::Float(_)
                | FieldValue::Text(_)
        )
    }

    /// Identifier of the referenced entity, if this value is a reference
    pub fn identity(&self) -> Option<i64> {
        match self {
            FieldValue::Reference(r) => Some(r.id),
            _ => None,
        }
    }

    /// Replace entity references by their identifier
    pub fn into_identity_or_value(self) -> FieldValue {
        match self {
            FieldValue::Reference(r) => FieldValue::Int(r.id),
            other => other,
        }
    }

    /// Parse a command-line literal: `null`, booleans, integers, floats,
    /// anything else is text
    pub fn parse_literal(s: &str) -> FieldValue {
        match s {
            "null" | "NULL" => FieldValue::Null,
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            _ => {
                if let Ok(i) = s.parse::<i64>() {
                    FieldValue::Int(i)
                } else if let Ok(f) = s.parse::<f64>() {
                    FieldValue::Float(f)
                } else {
                    FieldValue::Text(s.to_string())
                }
            }
        }
    }

    /// Convert a raw SQLite value
    pub fn from_sql_ref(value: ValueRef<'_>) -> FieldValue {
        match value {
            ValueRef::Null => FieldValue::Null,
            ValueRef::Integer(i) => FieldValue::Int(i),
            ValueRef::Real(f) => FieldValue::Float(f),
            ValueRef::Text(t) => FieldValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => FieldValue::Bytes(b.to_vec()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Timestamp(ts) => {
                write!(f, "{}", ts.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            FieldValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            FieldValue::Reference(r) => write!(f, "{}#{}", r.kind, r.id),
            FieldValue::List(_) | FieldValue::Map(_) => write!(f, "{}", encode_value(self)),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self {
            FieldValue::Null => ToSqlOutput::Owned(SqlValue::Null),
            FieldValue::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            FieldValue::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            FieldValue::Float(x) => ToSqlOutput::Owned(SqlValue::Real(*x)),
            FieldValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            FieldValue::Timestamp(ts) => ToSqlOutput::Owned(SqlValue::Text(
                ts.to_rfc3339_opts(SecondsFormat::Micros, true),
            )),
            FieldValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            FieldValue::Reference(r) => ToSqlOutput::Owned(SqlValue::Integer(r.id)),
            FieldValue::List(_) | FieldValue::Map(_) => {
                ToSqlOutput::Owned(SqlValue::Text(encode_value(self).to_string()))
            }
        };
        Ok(out)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Bytes(b)
    }
}

impl From<EntityRef> for FieldValue {
    fn from(r: EntityRef) -> Self {
        FieldValue::Reference(r)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_classification() {
        assert!(FieldValue::Null.is_scalar());
        assert!(FieldValue::from("x").is_scalar());
        assert!(FieldValue::from(1.5).is_scalar());
        assert!(!FieldValue::Bytes(vec![1]).is_scalar());
        assert!(!FieldValue::Reference(EntityRef::new("users", 1)).is_scalar());
    }

    #[test]
    fn test_reference_identity() {
        let owner = FieldValue::from(EntityRef::new("users", 42));
        assert_eq!(owner.identity(), Some(42));
        assert_eq!(owner.into_identity_or_value(), FieldValue::Int(42));
        assert_eq!(FieldValue::Int(42).identity(), None);
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(FieldValue::parse_literal("null"), FieldValue::Null);
        assert_eq!(FieldValue::parse_literal("true"), FieldValue::Bool(true));
        assert_eq!(FieldValue::parse_literal("31"), FieldValue::Int(31));
        assert_eq!(FieldValue::parse_literal("2.5"), FieldValue::Float(2.5));
        assert_eq!(FieldValue::parse_literal("Bob"), FieldValue::from("Bob"));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(FieldValue::from(None::<i64>), FieldValue::Null);
        assert_eq!(FieldValue::from(Some("a")), FieldValue::from("a"));
    }

    #[test]
    fn test_sql_binding() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let values = [
            FieldValue::from(EntityRef::new("users", 9)),
            FieldValue::Bool(true),
            FieldValue::from("text"),
        ];
        let row: (i64, i64, String) = conn
            .query_row("SELECT ?1, ?2, ?3", rusqlite::params_from_iter(values.iter()), |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(row, (9, 1, "text".to_string()));
    }
}
