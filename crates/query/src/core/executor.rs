//! Backend execution seam.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::QueryResult;
use crate::types::{Page, QueryPlan};

/// Executes a fully built [`QueryPlan`].
///
/// This is the default execution strategy used when no result extension
/// claims a collection result, and the primitive that result extensions
/// build on.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Returns a short name for the backend, used in logs and errors.
    fn backend_name(&self) -> &str;

    /// Returns the documents matching the plan, ordered and windowed.
    async fn execute(&self, plan: &QueryPlan) -> QueryResult<Vec<Value>>;

    /// Counts the documents matching the plan's conditions.
    ///
    /// Ordering and window are ignored.
    async fn count(&self, plan: &QueryPlan) -> QueryResult<u64>;
}

/// The value returned by a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum QueryOutput {
    /// Raw collection result from the default execution strategy.
    Collection(Vec<Value>),
    /// A page materialized by a result extension.
    Page(Page<Value>),
    /// Item lookup result.
    Item(Option<Value>),
}

impl QueryOutput {
    /// Returns the documents carried by this output.
    pub fn items(&self) -> &[Value] {
        match self {
            QueryOutput::Collection(items) => items,
            QueryOutput::Page(page) => &page.items,
            QueryOutput::Item(Some(item)) => std::slice::from_ref(item),
            QueryOutput::Item(None) => &[],
        }
    }

    /// Returns the page, if a result extension produced one.
    pub fn as_page(&self) -> Option<&Page<Value>> {
        match self {
            QueryOutput::Page(page) => Some(page),
            _ => None,
        }
    }

    /// Consumes the output and returns the item, if this is an item result.
    pub fn into_item(self) -> Option<Value> {
        match self {
            QueryOutput::Item(item) => item,
            _ => None,
        }
    }
}
