//! Operation descriptors and per-request context.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{IdentifierValue, QueryParams};

/// Whether an operation addresses a collection or a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Operates on a collection (e.g., `GET /books`).
    Collection,
    /// Operates on one item (e.g., `GET /books/{id}`).
    Item,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Collection => write!(f, "collection"),
            OperationKind::Item => write!(f, "item"),
        }
    }
}

/// Identifies the operation a request invokes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    resource: String,
    name: String,
    kind: OperationKind,
}

impl Operation {
    /// Creates an operation descriptor.
    pub fn new(resource: impl Into<String>, name: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            resource: resource.into(),
            name: name.into(),
            kind,
        }
    }

    /// Creates a collection operation descriptor.
    pub fn collection(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(resource, name, OperationKind::Collection)
    }

    /// Creates an item operation descriptor.
    pub fn item(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(resource, name, OperationKind::Item)
    }

    /// Returns the resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the operation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.resource, self.name)
    }
}

/// Request data visible to extensions and filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    params: QueryParams,
    identifier: Option<IdentifierValue>,
}

impl RequestContext {
    /// Creates a context from decoded query parameters.
    pub fn new(params: QueryParams) -> Self {
        Self {
            params,
            identifier: None,
        }
    }

    /// Creates a context from a raw query string.
    pub fn from_query(query: &str) -> Self {
        Self::new(QueryParams::parse(query))
    }

    /// Attaches the decoded identifier of an item request.
    pub fn with_identifier(mut self, identifier: IdentifierValue) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Returns the query parameters.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Returns the decoded identifier for item operations.
    pub fn identifier(&self) -> Option<&IdentifierValue> {
        self.identifier.as_ref()
    }
}
