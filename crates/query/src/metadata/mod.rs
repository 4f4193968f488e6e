//! Resource catalog.
//!
//! [`QueryConfig`] is the serde form of the catalog; [`MetadataRegistry`] is
//! its validated, read-only form consulted on every request.

mod config;
mod registry;

pub use config::{
    FilterConfig, FilterKind, OperationConfig, OrderConfig, PaginationConfig, PaginationOverride,
    QueryConfig, ResourceConfig,
};
pub use registry::{MetadataRegistry, OperationMetadata, ResourceMetadata};
