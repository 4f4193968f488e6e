//! Error types for the query layer.
//!
//! Errors are grouped by the stage that raises them: identifier decoding,
//! filter evaluation, metadata lookup, configuration, query building and
//! backend execution. [`QueryError`] wraps all of them transparently.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::fmt;

use thiserror::Error;

use crate::types::ValueType;

/// The primary error type for all query operations.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Identifier decoding/encoding errors
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// Filter and parameter errors
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Resource/operation lookup errors
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Catalog and configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An extension failed while the query was being built
    #[error(transparent)]
    Build(#[from] QueryBuildFailure),

    /// Backend execution errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Client-facing classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The addressed resource does not exist.
    NotFound,
    /// The request is malformed.
    BadRequest,
    /// The server failed to answer a valid request.
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::NotFound => write!(f, "not-found"),
            ErrorClass::BadRequest => write!(f, "bad-request"),
            ErrorClass::Internal => write!(f, "internal"),
        }
    }
}

impl QueryError {
    /// Returns the client-facing class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            QueryError::Identifier(IdentifierError::PropertyNotFound { .. }) => {
                ErrorClass::NotFound
            }
            QueryError::Identifier(IdentifierError::InvalidIdentifier { .. }) => {
                ErrorClass::BadRequest
            }
            QueryError::Filter(FilterError::UnsupportedFilter { .. })
            | QueryError::Filter(FilterError::UnknownProperty { .. }) => ErrorClass::Internal,
            QueryError::Filter(_) => ErrorClass::BadRequest,
            QueryError::Metadata(_) => ErrorClass::NotFound,
            QueryError::Config(_) => ErrorClass::Internal,
            QueryError::Build(failure) => failure.source.class(),
            QueryError::Backend(_) => ErrorClass::Internal,
        }
    }

    /// Returns true if the error is caused by the client request.
    pub fn is_client_error(&self) -> bool {
        self.class() != ErrorClass::Internal
    }
}

/// Errors raised while decoding or encoding resource identifiers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentifierError {
    /// A property required by the identifier spec is absent.
    #[error("identifier property '{property}' not found for resource {resource}")]
    PropertyNotFound { resource: String, property: String },

    /// A raw identifier value could not be converted to its declared type.
    #[error("invalid identifier for {resource}: property '{property}' value '{value}' ({reason})")]
    InvalidIdentifier {
        resource: String,
        property: String,
        value: String,
        reason: String,
    },
}

/// A raw value failed conversion to a typed value.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert '{value}' to {target}: {reason}")]
pub struct ConversionError {
    pub value: String,
    pub target: ValueType,
    pub reason: String,
}

impl ConversionError {
    /// Creates a conversion error.
    pub fn new(value: impl Into<String>, target: ValueType, reason: impl fmt::Display) -> Self {
        Self {
            value: value.into(),
            target,
            reason: reason.to_string(),
        }
    }
}

/// Errors related to filters and request parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// An operation references a filter id that was never registered.
    #[error("unsupported filter '{filter_id}' referenced by {resource}::{operation}")]
    UnsupportedFilter {
        filter_id: String,
        resource: String,
        operation: String,
    },

    /// A parameter value could not be interpreted.
    #[error("invalid value '{value}' for parameter '{parameter}': {reason}")]
    InvalidFilterValue {
        parameter: String,
        value: String,
        reason: String,
    },

    /// A comparison was built without any value.
    #[error("condition on '{field}' requires at least one value")]
    EmptyCondition { field: String },

    /// A filter references a property the resource does not declare.
    #[error("filter '{filter_id}' references unknown property '{property}' of {resource}")]
    UnknownProperty {
        filter_id: String,
        resource: String,
        property: String,
    },
}

/// Errors related to resource and operation lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    /// The resource is not part of the catalog.
    #[error("unknown resource: {resource}")]
    UnknownResource { resource: String },

    /// The resource does not declare the operation.
    #[error("unknown operation {operation} on resource {resource}")]
    UnknownOperation { resource: String, operation: String },

    /// The operation was invoked with the wrong kind (item vs collection).
    #[error("operation {resource}::{operation} is a {declared} operation, not {requested}")]
    OperationKindMismatch {
        resource: String,
        operation: String,
        declared: String,
        requested: String,
    },
}

/// Errors raised while loading and validating the resource catalog.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The catalog could not be read or parsed.
    #[error("catalog load failed: {message}")]
    Load { message: String },

    /// Two resources share a name.
    #[error("duplicate resource: {resource}")]
    DuplicateResource { resource: String },

    /// A resource declares no identifier property.
    #[error("resource {resource} declares no identifier")]
    EmptyIdentifier { resource: String },

    /// A property appears twice in an identifier.
    #[error("resource {resource} repeats identifier property '{property}'")]
    DuplicateIdentifierProperty { resource: String, property: String },

    /// Two operations of a resource share a name.
    #[error("duplicate operation {operation} on resource {resource}")]
    DuplicateOperation { resource: String, operation: String },

    /// An ordering or sortable entry names an undeclared property.
    #[error("resource {resource} orders by unknown property '{property}'")]
    UnknownOrderProperty { resource: String, property: String },

    /// An operation binds a filter over a property its resource does not declare.
    #[error("filter {filter_id} on resource {resource} reads undeclared property '{property}'")]
    UnknownFilterProperty {
        resource: String,
        filter_id: String,
        property: String,
    },

    /// Two filters share an id.
    #[error("duplicate filter id: {filter_id}")]
    DuplicateFilter { filter_id: String },

    /// A filter is declared without properties.
    #[error("filter {filter_id} declares no properties")]
    EmptyFilter { filter_id: String },

    /// Pagination settings are inconsistent.
    #[error("invalid pagination settings: {message}")]
    InvalidPagination { message: String },

    /// A parameter pattern is not a valid regular expression.
    #[error("invalid pattern for parameter '{parameter}': {message}")]
    InvalidPattern { parameter: String, message: String },
}

/// An extension failed while the query handle was being built.
///
/// The run is aborted and nothing is executed.
#[derive(Error, Debug)]
#[error("query build failed in extension '{extension}': {source}")]
pub struct QueryBuildFailure {
    /// Name of the failing extension.
    pub extension: String,
    /// The original error.
    #[source]
    pub source: Box<QueryError>,
}

impl QueryBuildFailure {
    /// Wraps an extension error.
    pub fn new(extension: impl Into<String>, source: QueryError) -> Self {
        Self {
            extension: extension.into(),
            source: Box::new(source),
        }
    }
}

/// Errors originating from a query backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Query execution error.
    #[error("query execution failed in {backend_name}: {message}")]
    QueryFailed {
        backend_name: String,
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Backend(BackendError::Serialization {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        QueryError::Config(ConfigError::Load {
            message: err.to_string(),
        })
    }
}
