//! Identifier decoding and encoding.

use std::sync::Arc;

use tracing::debug;

use crate::error::{IdentifierError, QueryResult};
use crate::types::{IdentifierValue, ResourceIdentifierSpec, TypedValue, ValueType};

use super::denormalizer::DenormalizerChain;

/// Separator between `key=value` pairs of a composite identifier.
pub const PAIR_SEPARATOR: char = ';';

/// Separator between key and value inside a pair.
pub const KEY_VALUE_SEPARATOR: char = '=';

/// Decodes raw path identifiers into typed [`IdentifierValue`]s and back.
///
/// A simple identifier is the raw segment itself. A composite identifier is
/// `k1=v1;k2=v2;...`; pair order does not matter and values are not escaped.
///
/// ```
/// use tessera_query::identifier::IdentifierCodec;
/// use tessera_query::types::{IdentifierProperty, ResourceIdentifierSpec, TypedValue, ValueType};
///
/// let spec = ResourceIdentifierSpec::new(
///     "Book",
///     vec![
///         IdentifierProperty::new("isbn", ValueType::String),
///         IdentifierProperty::new("edition", ValueType::Integer),
///     ],
/// );
/// let codec = IdentifierCodec::default();
///
/// let id = codec.decode("edition=2;isbn=123", &spec).unwrap();
/// assert_eq!(id.get("edition"), Some(&TypedValue::Integer(2)));
/// assert_eq!(codec.encode(&id, &spec).unwrap(), "isbn=123;edition=2");
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdentifierCodec {
    chain: Arc<DenormalizerChain>,
}

impl IdentifierCodec {
    /// Creates a codec over the given converter chain.
    pub fn new(chain: Arc<DenormalizerChain>) -> Self {
        Self { chain }
    }

    /// Returns the converter chain.
    pub fn chain(&self) -> &Arc<DenormalizerChain> {
        &self.chain
    }

    /// Decodes a raw identifier.
    ///
    /// # Errors
    ///
    /// * [`IdentifierError::PropertyNotFound`] - a property of `spec` has no value
    /// * [`IdentifierError::InvalidIdentifier`] - a value fails conversion, or a
    ///   composite key is not declared by `spec`
    pub fn decode(&self, raw: &str, spec: &ResourceIdentifierSpec) -> QueryResult<IdentifierValue> {
        let mut value = IdentifierValue::new();

        if !spec.is_composite() {
            let Some(property) = spec.properties().first() else {
                return Ok(value);
            };
            let typed = self.convert(spec, &property.property, raw, property.value_type)?;
            value.insert(property.property.clone(), typed);
            return Ok(value);
        }

        let pairs = parse_composite(raw);
        if let Some((key, raw_value)) = pairs.iter().find(|(key, _)| spec.property(key).is_none()) {
            debug!(
                resource = spec.resource(),
                key = %key,
                "Rejecting identifier key not declared by the resource"
            );
            return Err(IdentifierError::InvalidIdentifier {
                resource: spec.resource().to_string(),
                property: key.to_string(),
                value: raw_value.to_string(),
                reason: "not an identifier property of this resource".to_string(),
            }
            .into());
        }

        for property in spec.properties() {
            let raw_value = pair_value(&pairs, &property.property).ok_or_else(|| {
                IdentifierError::PropertyNotFound {
                    resource: spec.resource().to_string(),
                    property: property.property.clone(),
                }
            })?;
            let typed = self.convert(spec, &property.property, raw_value, property.value_type)?;
            value.insert(property.property.clone(), typed);
        }

        Ok(value)
    }

    /// Encodes an identifier value into its raw path form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::PropertyNotFound`] if a property of `spec` is
    /// absent from `value`.
    pub fn encode(&self, value: &IdentifierValue, spec: &ResourceIdentifierSpec) -> QueryResult<String> {
        let mut parts = Vec::with_capacity(spec.len());
        for property in spec.properties() {
            let typed = value.get(&property.property).ok_or_else(|| {
                IdentifierError::PropertyNotFound {
                    resource: spec.resource().to_string(),
                    property: property.property.clone(),
                }
            })?;
            if spec.is_composite() {
                parts.push(format!(
                    "{}{}{}",
                    property.property, KEY_VALUE_SEPARATOR, typed
                ));
            } else {
                parts.push(typed.to_string());
            }
        }
        Ok(parts.join(&PAIR_SEPARATOR.to_string()))
    }

    fn convert(
        &self,
        spec: &ResourceIdentifierSpec,
        property: &str,
        raw: &str,
        target: ValueType,
    ) -> QueryResult<TypedValue> {
        self.chain.convert(raw, target).map_err(|e| {
            IdentifierError::InvalidIdentifier {
                resource: spec.resource().to_string(),
                property: property.to_string(),
                value: raw.to_string(),
                reason: e.reason,
            }
            .into()
        })
    }
}

/// Splits `k1=v1;k2=v2` into a map.
///
/// Segments without `=` (including a dangling trailing one) and empty
/// segments are dropped. A repeated key keeps its last value.
/// Pairs in input order. A repeated key keeps its last value.
fn parse_composite(raw: &str) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    let segments = raw
        .split(PAIR_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.split_once(KEY_VALUE_SEPARATOR));
    for (key, value) in segments {
        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => pairs.push((key, value)),
        }
    }
    pairs
}

fn pair_value<'a>(pairs: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}
