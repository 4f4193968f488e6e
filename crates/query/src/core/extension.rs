//! Query extension traits and their registry.
//!
//! Extensions mutate a shared [`QueryPlan`] during a pipeline run:
//!
//! ```text
//! CollectionExtension            ItemExtension
//!     └── ResultExtension
//! ```
//!
//! A [`ResultExtension`] may additionally claim the result of a collection
//! run (pagination does). Extensions are registered once, at startup, with an
//! [`ExtensionStage`] that fixes where they run.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::QueryResult;
use crate::metadata::ResourceMetadata;
use crate::types::QueryPlan;

use super::executor::{QueryExecutor, QueryOutput};
use super::operation::{Operation, RequestContext};

/// Where an extension runs relative to the others.
///
/// Result extensions run last so they observe the fully filtered and ordered
/// plan when computing totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtensionStage {
    /// Adds conditions.
    Filter,
    /// Adds ordering.
    Order,
    /// Windows the plan and may own the result.
    Result,
}

impl fmt::Display for ExtensionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionStage::Filter => write!(f, "filter"),
            ExtensionStage::Order => write!(f, "order"),
            ExtensionStage::Result => write!(f, "result"),
        }
    }
}

/// Mutates the plan of collection operations.
pub trait CollectionExtension: Send + Sync {
    /// Returns the extension name.
    fn name(&self) -> &str;

    /// Returns true if the extension takes part in this operation.
    fn applies_to(&self, _resource: &ResourceMetadata, _operation: &Operation) -> bool {
        true
    }

    /// Applies the extension. An error aborts the run.
    fn apply_to_collection(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<()>;
}

/// Mutates the plan of item operations.
///
/// The identifier conditions are already in the plan when item extensions run.
pub trait ItemExtension: Send + Sync {
    /// Returns the extension name.
    fn name(&self) -> &str;

    /// Returns true if the extension takes part in this operation.
    fn applies_to(&self, _resource: &ResourceMetadata, _operation: &Operation) -> bool {
        true
    }

    /// Applies the extension. An error aborts the run.
    fn apply_to_item(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<()>;
}

/// A collection extension that can materialize the final result.
#[async_trait]
pub trait ResultExtension: CollectionExtension {
    /// Returns true if this extension wants to produce the result.
    fn supports_result(
        &self,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> bool;

    /// Produces the result from the fully built plan.
    async fn get_result(
        &self,
        executor: &dyn QueryExecutor,
        plan: QueryPlan,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<QueryOutput>;
}

/// A registered collection extension.
#[derive(Clone)]
pub enum CollectionEntry {
    /// Mutates the plan only.
    Plain(Arc<dyn CollectionExtension>),
    /// Mutates the plan and may own the result.
    Result(Arc<dyn ResultExtension>),
}

impl CollectionEntry {
    /// Returns the extension name.
    pub fn name(&self) -> &str {
        match self {
            CollectionEntry::Plain(ext) => ext.name(),
            CollectionEntry::Result(ext) => ext.name(),
        }
    }

    /// Returns true if the extension takes part in this operation.
    pub fn applies_to(&self, resource: &ResourceMetadata, operation: &Operation) -> bool {
        match self {
            CollectionEntry::Plain(ext) => ext.applies_to(resource, operation),
            CollectionEntry::Result(ext) => ext.applies_to(resource, operation),
        }
    }

    /// Applies the extension.
    pub fn apply(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<()> {
        match self {
            CollectionEntry::Plain(ext) => {
                ext.apply_to_collection(plan, resource, operation, context)
            }
            CollectionEntry::Result(ext) => {
                ext.apply_to_collection(plan, resource, operation, context)
            }
        }
    }

    /// Returns the result capability, if any.
    pub fn as_result(&self) -> Option<&Arc<dyn ResultExtension>> {
        match self {
            CollectionEntry::Plain(_) => None,
            CollectionEntry::Result(ext) => Some(ext),
        }
    }
}

impl fmt::Debug for CollectionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionEntry::Plain(ext) => f.debug_tuple("Plain").field(&ext.name()).finish(),
            CollectionEntry::Result(ext) => f.debug_tuple("Result").field(&ext.name()).finish(),
        }
    }
}

/// Extensions in application order.
///
/// Entries are sorted by stage; within a stage, registration order is kept.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    collection: Vec<(ExtensionStage, CollectionEntry)>,
    item: Vec<(ExtensionStage, Arc<dyn ItemExtension>)>,
}

impl ExtensionRegistry {
    /// Starts a registry.
    pub fn builder() -> ExtensionRegistryBuilder {
        ExtensionRegistryBuilder::default()
    }

    /// Returns the collection extensions in application order.
    pub fn collection(&self) -> impl Iterator<Item = &CollectionEntry> {
        self.collection.iter().map(|(_, entry)| entry)
    }

    /// Returns the item extensions in application order.
    pub fn item(&self) -> impl Iterator<Item = &Arc<dyn ItemExtension>> {
        self.item.iter().map(|(_, ext)| ext)
    }

    /// Returns `(stage, name)` of every collection extension, in order.
    pub fn collection_names(&self) -> Vec<(ExtensionStage, &str)> {
        self.collection
            .iter()
            .map(|(stage, entry)| (*stage, entry.name()))
            .collect()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty() && self.item.is_empty()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let item: Vec<&str> = self.item.iter().map(|(_, ext)| ext.name()).collect();
        f.debug_struct("ExtensionRegistry")
            .field("collection", &self.collection_names())
            .field("item", &item)
            .finish()
    }
}

/// Builder for [`ExtensionRegistry`].
#[derive(Default)]
pub struct ExtensionRegistryBuilder {
    collection: Vec<(ExtensionStage, CollectionEntry)>,
    item: Vec<(ExtensionStage, Arc<dyn ItemExtension>)>,
}

impl ExtensionRegistryBuilder {
    /// Registers a collection extension.
    pub fn collection(mut self, stage: ExtensionStage, extension: Arc<dyn CollectionExtension>) -> Self {
        self.collection
            .push((stage, CollectionEntry::Plain(extension)));
        self
    }

    /// Registers a result-capable collection extension.
    pub fn result(mut self, stage: ExtensionStage, extension: Arc<dyn ResultExtension>) -> Self {
        self.collection
            .push((stage, CollectionEntry::Result(extension)));
        self
    }

    /// Registers an item extension.
    pub fn item(mut self, stage: ExtensionStage, extension: Arc<dyn ItemExtension>) -> Self {
        self.item.push((stage, extension));
        self
    }

    /// Freezes the registry.
    pub fn build(mut self) -> ExtensionRegistry {
        // sort_by_key is stable
        self.collection.sort_by_key(|(stage, _)| *stage);
        self.item.sort_by_key(|(stage, _)| *stage);
        ExtensionRegistry {
            collection: self.collection,
            item: self.item,
        }
    }
}

impl fmt::Debug for ExtensionRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistryBuilder")
            .field("collection", &self.collection.len())
            .field("item", &self.item.len())
            .finish()
    }
}
