//! Built-in query extensions.
//!
//! - [`FilterExtension`] - runs the filters bound to an operation ([`ExtensionStage::Filter`](crate::core::ExtensionStage::Filter))
//! - [`OrderExtension`] - client and default ordering ([`ExtensionStage::Order`](crate::core::ExtensionStage::Order))
//! - [`PaginationExtension`] - page windows and page results ([`ExtensionStage::Result`](crate::core::ExtensionStage::Result))

mod filter;
mod order;
mod pagination;

pub use filter::FilterExtension;
pub use order::OrderExtension;
pub use pagination::{PageRequest, PaginationExtension};
