//! Raw-string to typed-value converters.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use ulid::Ulid;
use uuid::Uuid;

use crate::error::ConversionError;
use crate::types::{TypedValue, ValueType};

/// Converts a raw identifier or parameter segment into a [`TypedValue`].
///
/// Implementations must be pure: the chain is shared across requests without
/// synchronization.
pub trait Denormalizer: Send + Sync {
    /// Returns the converter name, used in logs.
    fn name(&self) -> &str;

    /// Returns true if this converter handles `target`.
    fn supports(&self, raw: &str, target: ValueType) -> bool;

    /// Performs the conversion.
    fn denormalize(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError>;
}

/// `i64` integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerDenormalizer;

impl Denormalizer for IntegerDenormalizer {
    fn name(&self) -> &str {
        "integer"
    }

    fn supports(&self, _raw: &str, target: ValueType) -> bool {
        target == ValueType::Integer
    }

    fn denormalize(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError> {
        raw.parse::<i64>()
            .map(TypedValue::Integer)
            .map_err(|e| ConversionError::new(raw, target, e))
    }
}

/// Arbitrary precision decimals.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalDenormalizer;

impl Denormalizer for DecimalDenormalizer {
    fn name(&self) -> &str {
        "decimal"
    }

    fn supports(&self, _raw: &str, target: ValueType) -> bool {
        target == ValueType::Decimal
    }

    fn denormalize(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError> {
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .map(TypedValue::Decimal)
            .map_err(|e| ConversionError::new(raw, target, e))
    }
}

/// `true`/`false`/`1`/`0`, case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanDenormalizer;

impl Denormalizer for BooleanDenormalizer {
    fn name(&self) -> &str {
        "boolean"
    }

    fn supports(&self, _raw: &str, target: ValueType) -> bool {
        target == ValueType::Boolean
    }

    fn denormalize(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError> {
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(TypedValue::Boolean(true)),
            "false" | "0" => Ok(TypedValue::Boolean(false)),
            _ => Err(ConversionError::new(
                raw,
                target,
                "expected true, false, 1 or 0",
            )),
        }
    }
}

/// RFC 3339 instants. A bare `YYYY-MM-DD` means midnight UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeDenormalizer;

impl Denormalizer for DateTimeDenormalizer {
    fn name(&self) -> &str {
        "datetime"
    }

    fn supports(&self, _raw: &str, target: ValueType) -> bool {
        target == ValueType::DateTime
    }

    fn denormalize(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(TypedValue::DateTime(dt.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| TypedValue::DateTime(naive.and_utc()))
            .ok_or_else(|| ConversionError::new(raw, target, "expected an RFC 3339 date-time"))
    }
}

/// `YYYY-MM-DD` calendar dates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateDenormalizer;

impl Denormalizer for DateDenormalizer {
    fn name(&self) -> &str {
        "date"
    }

    fn supports(&self, _raw: &str, target: ValueType) -> bool {
        target == ValueType::Date
    }

    fn denormalize(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(TypedValue::Date)
            .map_err(|e| ConversionError::new(raw, target, e))
    }
}

/// UUIDs in any form the `uuid` crate accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidDenormalizer;

impl Denormalizer for UuidDenormalizer {
    fn name(&self) -> &str {
        "uuid"
    }

    fn supports(&self, _raw: &str, target: ValueType) -> bool {
        target == ValueType::Uuid
    }

    fn denormalize(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError> {
        Uuid::parse_str(raw)
            .map(TypedValue::Uuid)
            .map_err(|e| ConversionError::new(raw, target, e))
    }
}

/// Crockford base32 ULIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidDenormalizer;

impl Denormalizer for UlidDenormalizer {
    fn name(&self) -> &str {
        "ulid"
    }

    fn supports(&self, _raw: &str, target: ValueType) -> bool {
        target == ValueType::Ulid
    }

    fn denormalize(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError> {
        Ulid::from_string(raw)
            .map(TypedValue::Ulid)
            .map_err(|e| ConversionError::new(raw, target, e))
    }
}

/// An ordered set of [`Denormalizer`]s.
///
/// The first converter that supports the target type performs the conversion;
/// later ones are not tried even if it fails. When no converter supports the
/// type, the raw string is returned unchanged.
///
/// ```
/// use tessera_query::identifier::DenormalizerChain;
/// use tessera_query::types::{TypedValue, ValueType};
///
/// let chain = DenormalizerChain::default();
/// assert_eq!(chain.convert("42", ValueType::Integer).unwrap(), TypedValue::Integer(42));
/// assert_eq!(chain.convert("abc", ValueType::String).unwrap(), TypedValue::from("abc"));
/// assert!(chain.convert("abc", ValueType::Integer).is_err());
/// ```
#[derive(Clone)]
pub struct DenormalizerChain {
    converters: Vec<Arc<dyn Denormalizer>>,
}

impl DenormalizerChain {
    /// Creates a chain without any converter. Every value passes through as a string.
    pub fn empty() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Adds a converter with the highest priority.
    pub fn push_front(&mut self, converter: Arc<dyn Denormalizer>) {
        self.converters.insert(0, converter);
    }

    /// Adds a converter with the lowest priority.
    pub fn push_back(&mut self, converter: Arc<dyn Denormalizer>) {
        self.converters.push(converter);
    }

    /// Builder-style [`push_back`](Self::push_back).
    pub fn with(mut self, converter: Arc<dyn Denormalizer>) -> Self {
        self.push_back(converter);
        self
    }

    /// Returns the converter names in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    /// Converts `raw` to `target`.
    pub fn convert(&self, raw: &str, target: ValueType) -> Result<TypedValue, ConversionError> {
        match self.converters.iter().find(|c| c.supports(raw, target)) {
            Some(converter) => converter.denormalize(raw, target),
            None => Ok(TypedValue::String(raw.to_string())),
        }
    }
}

impl Default for DenormalizerChain {
    fn default() -> Self {
        Self::empty()
            .with(Arc::new(IntegerDenormalizer))
            .with(Arc::new(DecimalDenormalizer))
            .with(Arc::new(BooleanDenormalizer))
            .with(Arc::new(DateTimeDenormalizer))
            .with(Arc::new(DateDenormalizer))
            .with(Arc::new(UuidDenormalizer))
            .with(Arc::new(UlidDenormalizer))
    }
}

impl std::fmt::Debug for DenormalizerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenormalizerChain")
            .field("converters", &self.names())
            .finish()
    }
}
