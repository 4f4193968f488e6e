//! Request filters.
//!
//! A [`Filter`] reads request parameters and contributes to the query plan of
//! the operations it is bound to. Built-in filters return a [`Condition`] and
//! leave folding to the caller; custom filters may instead mutate the plan
//! directly and return [`FilterEffect::Applied`].
//!
//! | Kind      | Parameters                                      | Condition            |
//! |-----------|-------------------------------------------------|----------------------|
//! | `exact`   | `prop=v`, `prop[]=v1&prop[]=v2`                 | `Eq(prop, [v..])`    |
//! | `exclude` | `prop[neq]=v`                                   | `Neq(prop, v)` each  |
//! | `range`   | `prop[gte]=a`, `prop[lte]=b`, `prop[between]=a..b` | `Gte` / `Lte`     |
//! | `boolean` | `prop=true`                                     | `Eq(prop, [bool])`   |

mod builtin;
mod registry;
mod schema;

pub use builtin::{BooleanFilter, ExactFilter, ExcludeFilter, RangeFilter};
pub use registry::FilterRegistry;
pub use schema::{ParameterDescription, ParameterSchema, ParameterValidator, ParameterViolation};

use crate::core::{Operation, RequestContext};
use crate::error::QueryResult;
use crate::metadata::ResourceMetadata;
use crate::types::{Condition, QueryPlan};

/// What a filter did to the plan.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEffect {
    /// The filter mutated the plan itself.
    Applied,
    /// The caller must AND this condition into the plan.
    Condition(Condition),
    /// The request carries no parameter for this filter.
    Skipped,
}

/// A named component turning request parameters into query constraints.
pub trait Filter: Send + Sync {
    /// Returns the filter name.
    fn name(&self) -> &str;

    /// Returns the resource properties this filter reads.
    ///
    /// Checked against each bound resource when a pipeline is built from a
    /// catalog.
    fn properties(&self) -> &[String] {
        &[]
    }

    /// Describes the parameters this filter understands for a resource.
    fn description(&self, resource: &ResourceMetadata) -> ParameterSchema;

    /// Applies the filter to a plan.
    fn apply(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<FilterEffect>;
}
