//! Build-once resource metadata.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use crate::core::{Operation, OperationKind};
use crate::error::{ConfigError, MetadataError, QueryResult};
use crate::types::{ResourceIdentifierSpec, SortKey, ValueType};

use super::config::{PaginationOverride, ResourceConfig};

/// An operation declared by a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationMetadata {
    name: String,
    kind: OperationKind,
    filters: Vec<String>,
}

impl OperationMetadata {
    /// Returns the operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the operation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns the ids of the bound filters, in application order.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }
}

/// Validated, immutable metadata of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceMetadata {
    name: String,
    identifier: ResourceIdentifierSpec,
    properties: BTreeMap<String, ValueType>,
    operations: Vec<OperationMetadata>,
    sortable: Vec<String>,
    default_order: Vec<SortKey>,
    pagination: Option<PaginationOverride>,
}

impl ResourceMetadata {
    /// Validates a resource declaration.
    pub fn from_config(config: ResourceConfig) -> Result<Self, ConfigError> {
        let ResourceConfig {
            name,
            identifiers,
            mut properties,
            operations,
            sortable,
            default_order,
            pagination,
        } = config;

        if identifiers.is_empty() {
            return Err(ConfigError::EmptyIdentifier { resource: name });
        }
        let mut seen = HashSet::new();
        for property in &identifiers {
            if !seen.insert(property.property.as_str()) {
                return Err(ConfigError::DuplicateIdentifierProperty {
                    resource: name,
                    property: property.property.clone(),
                });
            }
        }
        for property in &identifiers {
            properties.insert(property.property.clone(), property.value_type);
        }

        let mut seen = HashSet::new();
        let mut ops = Vec::with_capacity(operations.len());
        for op in operations {
            if !seen.insert(op.name.clone()) {
                return Err(ConfigError::DuplicateOperation {
                    resource: name,
                    operation: op.name,
                });
            }
            ops.push(OperationMetadata {
                name: op.name,
                kind: op.kind,
                filters: op.filters,
            });
        }

        let sortable = match sortable {
            Some(list) => list,
            None => properties.keys().cloned().collect(),
        };
        let default_order: Vec<SortKey> = default_order.iter().map(|k| SortKey::parse(k)).collect();
        let ordered = sortable
            .iter()
            .chain(default_order.iter().map(|k| &k.field));
        for property in ordered {
            if !properties.contains_key(property) {
                return Err(ConfigError::UnknownOrderProperty {
                    resource: name,
                    property: property.clone(),
                });
            }
        }

        let identifier = ResourceIdentifierSpec::new(name.clone(), identifiers);
        Ok(Self {
            name,
            identifier,
            properties,
            operations: ops,
            sortable,
            default_order,
            pagination,
        })
    }

    /// Returns the resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the identifier spec.
    pub fn identifier(&self) -> &ResourceIdentifierSpec {
        &self.identifier
    }

    /// Returns the declared type of a property, identifier properties included.
    pub fn property_type(&self, property: &str) -> Option<ValueType> {
        self.properties.get(property).copied()
    }

    /// Returns all declared properties.
    pub fn properties(&self) -> &BTreeMap<String, ValueType> {
        &self.properties
    }

    /// Returns an operation by name.
    pub fn operation(&self, name: &str) -> Option<&OperationMetadata> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Returns all operations.
    pub fn operations(&self) -> &[OperationMetadata] {
        &self.operations
    }

    /// Returns true if clients may order by `property`.
    pub fn is_sortable(&self, property: &str) -> bool {
        self.sortable.iter().any(|p| p == property)
    }

    /// Returns the properties clients may order by.
    pub fn sortable(&self) -> &[String] {
        &self.sortable
    }

    /// Returns the order used when the client requests none.
    pub fn default_order(&self) -> &[SortKey] {
        &self.default_order
    }

    /// Returns the pagination override, if any.
    pub fn pagination(&self) -> Option<&PaginationOverride> {
        self.pagination.as_ref()
    }
}

/// Every resource of the catalog, keyed by name.
///
/// Built once at startup and shared through `Arc`; never mutated afterwards.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    resources: HashMap<String, Arc<ResourceMetadata>>,
}

impl MetadataRegistry {
    /// Validates and indexes resource declarations.
    pub fn from_configs(configs: impl IntoIterator<Item = ResourceConfig>) -> QueryResult<Self> {
        let mut resources = HashMap::new();
        for config in configs {
            let metadata = ResourceMetadata::from_config(config)?;
            if resources.contains_key(metadata.name()) {
                return Err(ConfigError::DuplicateResource {
                    resource: metadata.name().to_string(),
                }
                .into());
            }
            resources.insert(metadata.name().to_string(), Arc::new(metadata));
        }
        info!(resources = resources.len(), "Built resource metadata registry");
        Ok(Self { resources })
    }

    /// Returns a resource by name.
    pub fn get(&self, resource: &str) -> QueryResult<Arc<ResourceMetadata>> {
        self.resources.get(resource).cloned().ok_or_else(|| {
            MetadataError::UnknownResource {
                resource: resource.to_string(),
            }
            .into()
        })
    }

    /// Resolves an operation, checking that it is declared with the right kind.
    pub fn resolve(
        &self,
        operation: &Operation,
    ) -> QueryResult<(Arc<ResourceMetadata>, OperationMetadata)> {
        let resource = self.get(operation.resource())?;
        let declared = resource.operation(operation.name()).cloned().ok_or_else(|| {
            MetadataError::UnknownOperation {
                resource: operation.resource().to_string(),
                operation: operation.name().to_string(),
            }
        })?;
        if declared.kind() != operation.kind() {
            return Err(MetadataError::OperationKindMismatch {
                resource: operation.resource().to_string(),
                operation: operation.name().to_string(),
                declared: declared.kind().to_string(),
                requested: operation.kind().to_string(),
            }
            .into());
        }
        Ok((resource, declared))
    }

    /// Returns the resource names, sorted.
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
