//! Core pipeline traits and orchestration.
//!
//! - [`Operation`], [`RequestContext`] - What a request invokes and carries
//! - [`QueryExecutor`] - Backend execution of a finished plan
//! - [`CollectionExtension`], [`ItemExtension`], [`ResultExtension`] - Plan mutators
//! - [`ExtensionRegistry`] - Build-once, stage-ordered extension set
//! - [`QueryPipeline`] - Runs one request through the extensions
//!
//! # Example: A Custom Extension
//!
//! ```
//! use std::sync::Arc;
//! use tessera_query::core::{
//!     CollectionExtension, ExtensionRegistry, ExtensionStage, Operation, RequestContext,
//! };
//! use tessera_query::error::QueryResult;
//! use tessera_query::metadata::ResourceMetadata;
//! use tessera_query::types::{Condition, QueryPlan};
//!
//! /// Hides soft-deleted documents.
//! struct NotDeleted;
//!
//! impl CollectionExtension for NotDeleted {
//!     fn name(&self) -> &str {
//!         "not-deleted"
//!     }
//!
//!     fn apply_to_collection(
//!         &self,
//!         plan: &mut QueryPlan,
//!         _resource: &ResourceMetadata,
//!         _operation: &Operation,
//!         _context: &RequestContext,
//!     ) -> QueryResult<()> {
//!         plan.and_where(Condition::eq("deleted", false));
//!         Ok(())
//!     }
//! }
//!
//! let registry = ExtensionRegistry::builder()
//!     .collection(ExtensionStage::Filter, Arc::new(NotDeleted))
//!     .build();
//! assert_eq!(registry.collection_names(), vec![(ExtensionStage::Filter, "not-deleted")]);
//! ```

mod executor;
mod extension;
mod operation;
mod pipeline;

pub use executor::{QueryExecutor, QueryOutput};
pub use extension::{
    CollectionEntry, CollectionExtension, ExtensionRegistry, ExtensionRegistryBuilder,
    ExtensionStage, ItemExtension, ResultExtension,
};
pub use operation::{Operation, OperationKind, RequestContext};
pub use pipeline::{PipelineState, PlannedQuery, QueryPipeline};
