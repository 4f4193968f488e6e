//! Core types for the query layer.
//!
//! This module provides the value types shared by every stage of a request:
//!
//! - [`ValueType`], [`TypedValue`] - Declared property types and typed literals
//! - [`ResourceIdentifierSpec`], [`IdentifierValue`] - Identifier shapes and decoded identifiers
//! - [`Condition`], [`ConditionCompiler`] - Predicate trees and their compilation seam
//! - [`QueryPlan`], [`SortKey`] - The mutable, backend-neutral query handle
//! - [`QueryParams`] - Decoded query-string parameters
//! - [`Page`], [`PageInfo`] - Paginated results
//!
//! # Examples
//!
//! ## Building a Query Plan
//!
//! ```
//! use tessera_query::types::{Condition, QueryPlan, SortKey};
//!
//! let mut plan = QueryPlan::new("Book");
//! plan.and_where(Condition::eq("status", "published"));
//! plan.order_by(SortKey::parse("-price"));
//! plan.set_window(0, 10);
//!
//! assert_eq!(
//!     plan.to_string(),
//!     "FROM Book WHERE status = published ORDER BY price DESC LIMIT 10 OFFSET 0"
//! );
//! ```
//!
//! ## Reading Request Parameters
//!
//! ```
//! use tessera_query::types::QueryParams;
//!
//! let params = QueryParams::parse("status[]=draft&status[]=published&price[gte]=10");
//! assert_eq!(params.values("status"), vec!["draft", "published"]);
//! assert_eq!(params.nested("price"), vec![("gte", "10")]);
//! ```

mod condition;
mod identifier;
mod pagination;
mod params;
mod plan;
mod value;

pub use condition::{Comparison, ComparisonOp, Condition, ConditionCompiler};
pub use identifier::{IdentifierProperty, IdentifierValue, ResourceIdentifierSpec};
pub use pagination::{Page, PageInfo};
pub use params::QueryParams;
pub use plan::{QueryPlan, SortDirection, SortKey, Window};
pub use value::{TypedValue, ValueType};
