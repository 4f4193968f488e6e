//! Semantic value types and typed values.
//!
//! [`ValueType`] is the declared type of a resource property; [`TypedValue`]
//! is a literal of one of those types, produced by denormalizers and used in
//! conditions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;
use uuid::Uuid;

/// Declared type of a resource property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Free text. Never converted.
    #[default]
    String,
    /// Signed 64-bit integer.
    #[serde(alias = "int")]
    Integer,
    /// Arbitrary precision decimal.
    #[serde(alias = "float", alias = "number")]
    Decimal,
    /// Boolean.
    #[serde(alias = "bool")]
    Boolean,
    /// RFC 3339 instant.
    #[serde(alias = "date-time", alias = "date_time")]
    DateTime,
    /// Calendar date.
    Date,
    /// UUID.
    Uuid,
    /// ULID.
    Ulid,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Decimal => write!(f, "decimal"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::Date => write!(f, "date"),
            ValueType::Uuid => write!(f, "uuid"),
            ValueType::Ulid => write!(f, "ulid"),
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(ValueType::String),
            "integer" | "int" => Ok(ValueType::Integer),
            "decimal" | "float" | "number" => Ok(ValueType::Decimal),
            "boolean" | "bool" => Ok(ValueType::Boolean),
            "datetime" | "date-time" | "date_time" => Ok(ValueType::DateTime),
            "date" => Ok(ValueType::Date),
            "uuid" => Ok(ValueType::Uuid),
            "ulid" => Ok(ValueType::Ulid),
            _ => Err(format!("unknown value type: {}", s)),
        }
    }
}

/// A literal of a [`ValueType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    /// Text value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Decimal value.
    Decimal(Decimal),
    /// Boolean value.
    Boolean(bool),
    /// Instant in UTC.
    DateTime(DateTime<Utc>),
    /// Calendar date.
    Date(NaiveDate),
    /// UUID value.
    Uuid(Uuid),
    /// ULID value.
    Ulid(Ulid),
}

impl TypedValue {
    /// Returns the type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::String(_) => ValueType::String,
            TypedValue::Integer(_) => ValueType::Integer,
            TypedValue::Decimal(_) => ValueType::Decimal,
            TypedValue::Boolean(_) => ValueType::Boolean,
            TypedValue::DateTime(_) => ValueType::DateTime,
            TypedValue::Date(_) => ValueType::Date,
            TypedValue::Uuid(_) => ValueType::Uuid,
            TypedValue::Ulid(_) => ValueType::Ulid,
        }
    }

    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to the JSON representation stored in documents.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::Integer(n) => Value::Number((*n).into()),
            TypedValue::Decimal(d) => {
                // Whole decimals stay integers so they compare equal to stored integers
                if d.fract().is_zero() {
                    if let Some(n) = d.to_i64() {
                        return Value::Number(n.into());
                    }
                }
                serde_json::Number::from_str(&d.normalize().to_string())
                    .map(Value::Number)
                    .unwrap_or_else(|_| Value::String(d.to_string()))
            }
            TypedValue::Boolean(b) => Value::Bool(*b),
            other => Value::String(other.to_string()),
        }
    }

    /// Compares this literal with a JSON document value.
    ///
    /// Returns `None` when the two are not comparable (different kinds, or a
    /// string that does not parse as the literal's type).
    pub fn compare_json(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (TypedValue::String(s), Value::String(o)) => Some(o.as_str().cmp(s.as_str())),
            (TypedValue::Integer(n), Value::Number(o)) => {
                if let Some(i) = o.as_i64() {
                    Some(i.cmp(n))
                } else {
                    o.as_f64().and_then(|f| f.partial_cmp(&(*n as f64)))
                }
            }
            (TypedValue::Decimal(d), Value::Number(o)) => {
                let stored = Decimal::from_str(&o.to_string())
                    .or_else(|_| Decimal::from_scientific(&o.to_string()))
                    .ok()?;
                Some(stored.cmp(d))
            }
            (TypedValue::Boolean(b), Value::Bool(o)) => Some(o.cmp(b)),
            (TypedValue::DateTime(dt), Value::String(o)) => {
                let stored = parse_datetime(o)?;
                Some(stored.cmp(dt))
            }
            (TypedValue::Date(d), Value::String(o)) => {
                let stored = NaiveDate::parse_from_str(o, "%Y-%m-%d")
                    .ok()
                    .or_else(|| parse_datetime(o).map(|dt| dt.date_naive()))?;
                Some(stored.cmp(d))
            }
            (TypedValue::Uuid(u), Value::String(o)) => {
                let stored = Uuid::parse_str(o).ok()?;
                Some(stored.cmp(u))
            }
            (TypedValue::Ulid(u), Value::String(o)) => {
                let stored = Ulid::from_string(o).ok()?;
                Some(stored.cmp(u))
            }
            _ => None,
        }
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(s) => write!(f, "{}", s),
            TypedValue::Integer(n) => write!(f, "{}", n),
            TypedValue::Decimal(d) => write!(f, "{}", d),
            TypedValue::Boolean(b) => write!(f, "{}", b),
            TypedValue::DateTime(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            TypedValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            TypedValue::Uuid(u) => write!(f, "{}", u.hyphenated()),
            TypedValue::Ulid(u) => write!(f, "{}", u),
        }
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::String(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        TypedValue::String(s)
    }
}

impl From<i64> for TypedValue {
    fn from(n: i64) -> Self {
        TypedValue::Integer(n)
    }
}

impl From<Decimal> for TypedValue {
    fn from(d: Decimal) -> Self {
        TypedValue::Decimal(d)
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for TypedValue {
    fn from(dt: DateTime<Utc>) -> Self {
        TypedValue::DateTime(dt)
    }
}

impl From<NaiveDate> for TypedValue {
    fn from(d: NaiveDate) -> Self {
        TypedValue::Date(d)
    }
}

impl From<Uuid> for TypedValue {
    fn from(u: Uuid) -> Self {
        TypedValue::Uuid(u)
    }
}

impl From<Ulid> for TypedValue {
    fn from(u: Ulid) -> Self {
        TypedValue::Ulid(u)
    }
}
