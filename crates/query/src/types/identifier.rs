//! Resource identifier specs and decoded identifier values.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::{TypedValue, ValueType};

/// One property of a resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierProperty {
    /// The property name (e.g., "isbn").
    pub property: String,

    /// The declared semantic type.
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
}

impl IdentifierProperty {
    /// Creates a new identifier property.
    pub fn new(property: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            property: property.into(),
            value_type,
        }
    }
}

/// The ordered identifier properties of a resource.
///
/// Built once from resource metadata and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifierSpec {
    resource: String,
    properties: Vec<IdentifierProperty>,
}

impl ResourceIdentifierSpec {
    /// Creates a spec for the given resource.
    pub fn new(resource: impl Into<String>, properties: Vec<IdentifierProperty>) -> Self {
        Self {
            resource: resource.into(),
            properties,
        }
    }

    /// Creates a single-property spec.
    pub fn simple(
        resource: impl Into<String>,
        property: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self::new(resource, vec![IdentifierProperty::new(property, value_type)])
    }

    /// Returns the resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the identifier properties in declaration order.
    pub fn properties(&self) -> &[IdentifierProperty] {
        &self.properties
    }

    /// Returns the number of identifier properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true if the spec has no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns true when the identifier is built from more than one property.
    pub fn is_composite(&self) -> bool {
        self.properties.len() > 1
    }

    /// Returns the property with the given name.
    pub fn property(&self, name: &str) -> Option<&IdentifierProperty> {
        self.properties.iter().find(|p| p.property == name)
    }
}

/// A decoded identifier: property name to typed value, in spec order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdentifierValue {
    entries: Vec<(String, TypedValue)>,
}

impl IdentifierValue {
    /// Creates an empty identifier value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, replacing any previous value for it.
    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<TypedValue>) {
        let property = property.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == property) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((property, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, property: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.insert(property, value);
        self
    }

    /// Returns the value of a property.
    pub fn get(&self, property: &str) -> Option<&TypedValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, v)| v)
    }

    /// Iterates over `(property, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no property is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for IdentifierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
