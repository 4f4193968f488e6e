//! Serde catalog configuration.
//!
//! A [`QueryConfig`] describes every resource the pipeline can query, the
//! filters operations may reference, and the global pagination and ordering
//! settings. It is read once at startup and turned into the immutable
//! [`MetadataRegistry`](super::MetadataRegistry).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::OperationKind;
use crate::error::{ConfigError, QueryResult};
use crate::types::{IdentifierProperty, ValueType};

/// The full catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Queryable resources.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,

    /// Filters that operations may reference by id.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,

    /// Global pagination settings.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Ordering parameter names.
    #[serde(default)]
    pub order: OrderConfig,
}

impl QueryConfig {
    /// Parses a catalog from JSON.
    pub fn from_json_str(json: &str) -> QueryResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ConfigError::Load {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Reads and parses a catalog file.
    pub fn from_path(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }
}

/// One resource of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource name (e.g., "Book").
    pub name: String,

    /// Identifier properties, in path order.
    pub identifiers: Vec<IdentifierProperty>,

    /// Declared non-identifier properties and their types.
    #[serde(default)]
    pub properties: BTreeMap<String, ValueType>,

    /// Operations exposed for the resource.
    #[serde(default)]
    pub operations: Vec<OperationConfig>,

    /// Properties clients may order by. All declared properties when absent.
    #[serde(default)]
    pub sortable: Option<Vec<String>>,

    /// Order applied when the client asks for none (`"-price"` for descending).
    #[serde(default)]
    pub default_order: Vec<String>,

    /// Pagination settings overriding the global ones.
    #[serde(default)]
    pub pagination: Option<PaginationOverride>,
}

impl ResourceConfig {
    /// Creates a resource with the given identifier and no operations.
    pub fn new(name: impl Into<String>, identifiers: Vec<IdentifierProperty>) -> Self {
        Self {
            name: name.into(),
            identifiers,
            properties: BTreeMap::new(),
            operations: Vec::new(),
            sortable: None,
            default_order: Vec::new(),
            pagination: None,
        }
    }

    /// Declares a property.
    pub fn with_property(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.properties.insert(name.into(), value_type);
        self
    }

    /// Adds an operation.
    pub fn with_operation(mut self, operation: OperationConfig) -> Self {
        self.operations.push(operation);
        self
    }

    /// Restricts client ordering to the given properties.
    pub fn with_sortable<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sortable = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the default order.
    pub fn with_default_order<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_order = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides pagination settings.
    pub fn with_pagination(mut self, pagination: PaginationOverride) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// One operation of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationConfig {
    /// Operation name (e.g., "get_collection").
    pub name: String,

    /// Collection or item operation.
    pub kind: OperationKind,

    /// Ids of the filters applied by this operation, in application order.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl OperationConfig {
    /// Creates a collection operation.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Collection,
            filters: Vec::new(),
        }
    }

    /// Creates an item operation.
    pub fn item(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OperationKind::Item,
            filters: Vec::new(),
        }
    }

    /// Binds a filter id.
    pub fn with_filter(mut self, filter_id: impl Into<String>) -> Self {
        self.filters.push(filter_id.into());
        self
    }
}

/// Kind of a built-in filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// `?prop=v` and `?prop[]=v`.
    Exact,
    /// `?prop[neq]=v`.
    Exclude,
    /// `?prop[gte]=a`, `?prop[lte]=b`, `?prop[between]=a..b`.
    Range,
    /// `?prop=true|false`.
    Boolean,
}

/// A filter declared in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Id referenced by operations.
    pub id: String,

    /// Built-in filter kind.
    pub kind: FilterKind,

    /// Properties the filter applies to.
    pub properties: Vec<String>,
}

impl FilterConfig {
    /// Creates a filter declaration.
    pub fn new<I, S>(id: impl Into<String>, kind: FilterKind, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            kind,
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }
}

/// Page-number pagination settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Paginate collection results.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Let clients turn pagination off through `enabled_parameter`.
    #[serde(default)]
    pub client_enabled: bool,

    /// Default page size.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u64,

    /// Upper bound for client-chosen page sizes.
    #[serde(default = "default_max_items_per_page")]
    pub max_items_per_page: Option<u64>,

    /// Let clients choose the page size through `items_per_page_parameter`.
    #[serde(default = "default_true")]
    pub client_items_per_page: bool,

    /// Name of the page number parameter.
    #[serde(default = "default_page_parameter")]
    pub page_parameter: String,

    /// Name of the page size parameter.
    #[serde(default = "default_items_per_page_parameter")]
    pub items_per_page_parameter: String,

    /// Name of the parameter toggling pagination.
    #[serde(default = "default_enabled_parameter")]
    pub enabled_parameter: String,

    /// Skip the total count and fetch one extra row instead.
    #[serde(default)]
    pub partial: bool,

    /// Let clients request partial pagination through `partial_parameter`.
    #[serde(default)]
    pub client_partial: bool,

    /// Name of the parameter toggling partial pagination.
    #[serde(default = "default_partial_parameter")]
    pub partial_parameter: String,
}

fn default_true() -> bool {
    true
}

fn default_items_per_page() -> u64 {
    30
}

fn default_max_items_per_page() -> Option<u64> {
    Some(100)
}

fn default_page_parameter() -> String {
    "page".to_string()
}

fn default_items_per_page_parameter() -> String {
    "itemsPerPage".to_string()
}

fn default_enabled_parameter() -> String {
    "pagination".to_string()
}

fn default_partial_parameter() -> String {
    "partial".to_string()
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            client_enabled: false,
            items_per_page: default_items_per_page(),
            max_items_per_page: default_max_items_per_page(),
            client_items_per_page: true,
            page_parameter: default_page_parameter(),
            items_per_page_parameter: default_items_per_page_parameter(),
            enabled_parameter: default_enabled_parameter(),
            partial: false,
            client_partial: false,
            partial_parameter: default_partial_parameter(),
        }
    }
}

impl PaginationConfig {
    /// Checks that the settings are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.items_per_page == 0 {
            return Err(ConfigError::InvalidPagination {
                message: "items_per_page must be at least 1".to_string(),
            });
        }
        if let Some(max) = self.max_items_per_page {
            if max < self.items_per_page {
                return Err(ConfigError::InvalidPagination {
                    message: format!(
                        "items_per_page {} exceeds max_items_per_page {}",
                        self.items_per_page, max
                    ),
                });
            }
        }
        Ok(())
    }

    /// Returns these settings with a resource override applied.
    pub fn merged(&self, overrides: &PaginationOverride) -> Self {
        Self {
            enabled: overrides.enabled.unwrap_or(self.enabled),
            client_enabled: overrides.client_enabled.unwrap_or(self.client_enabled),
            items_per_page: overrides.items_per_page.unwrap_or(self.items_per_page),
            max_items_per_page: overrides.max_items_per_page.or(self.max_items_per_page),
            client_items_per_page: overrides
                .client_items_per_page
                .unwrap_or(self.client_items_per_page),
            partial: overrides.partial.unwrap_or(self.partial),
            client_partial: overrides.client_partial.unwrap_or(self.client_partial),
            ..self.clone()
        }
    }
}

/// Per-resource pagination overrides. Unset fields keep the global value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationOverride {
    /// Overrides `enabled`.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Overrides `client_enabled`.
    #[serde(default)]
    pub client_enabled: Option<bool>,
    /// Overrides `items_per_page`.
    #[serde(default)]
    pub items_per_page: Option<u64>,
    /// Overrides `max_items_per_page`.
    #[serde(default)]
    pub max_items_per_page: Option<u64>,
    /// Overrides `client_items_per_page`.
    #[serde(default)]
    pub client_items_per_page: Option<bool>,
    /// Overrides `partial`.
    #[serde(default)]
    pub partial: Option<bool>,
    /// Overrides `client_partial`.
    #[serde(default)]
    pub client_partial: Option<bool>,
}

/// Ordering parameter names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfig {
    /// Name of the `order[prop]=asc|desc` parameter.
    #[serde(default = "default_order_parameter")]
    pub order_parameter: String,

    /// Name of the `sort=prop,-other` parameter.
    #[serde(default = "default_sort_parameter")]
    pub sort_parameter: String,
}

fn default_order_parameter() -> String {
    "order".to_string()
}

fn default_sort_parameter() -> String {
    "sort".to_string()
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            order_parameter: default_order_parameter(),
            sort_parameter: default_sort_parameter(),
        }
    }
}
