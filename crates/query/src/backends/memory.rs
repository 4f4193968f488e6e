//! In-process document store.
//!
//! [`MemoryBackend`] keeps JSON documents per resource and executes query
//! plans directly against them. It is the reference executor: every other
//! backend is expected to select the same documents.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use crate::core::QueryExecutor;
use crate::error::QueryResult;
use crate::types::{ComparisonOp, ConditionCompiler, QueryPlan, SortDirection, SortKey, TypedValue};

/// A compiled in-memory predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryPredicate {
    /// `field op value`.
    Compare {
        /// Comparison operator.
        op: ComparisonOp,
        /// Dotted field path.
        field: String,
        /// Literal to compare with.
        value: TypedValue,
    },
    /// All must hold. Empty is true.
    All(Vec<MemoryPredicate>),
    /// One must hold. Empty is false.
    Any(Vec<MemoryPredicate>),
}

impl MemoryPredicate {
    /// Evaluates the predicate against a document.
    ///
    /// Missing fields and values not comparable with the literal never match,
    /// whatever the operator.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            MemoryPredicate::Compare { op, field, value } => {
                let Some(stored) = lookup(document, field) else {
                    return false;
                };
                let Some(ordering) = value.compare_json(stored) else {
                    return false;
                };
                match op {
                    ComparisonOp::Eq => ordering == Ordering::Equal,
                    ComparisonOp::Neq => ordering != Ordering::Equal,
                    ComparisonOp::Gte => ordering != Ordering::Less,
                    ComparisonOp::Lte => ordering != Ordering::Greater,
                }
            }
            MemoryPredicate::All(children) => children.iter().all(|c| c.matches(document)),
            MemoryPredicate::Any(children) => children.iter().any(|c| c.matches(document)),
        }
    }
}

/// Compiles conditions into [`MemoryPredicate`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCompiler;

impl ConditionCompiler for MemoryCompiler {
    type Predicate = MemoryPredicate;

    fn comparison(
        &mut self,
        op: ComparisonOp,
        field: &str,
        value: &TypedValue,
    ) -> QueryResult<MemoryPredicate> {
        Ok(MemoryPredicate::Compare {
            op,
            field: field.to_string(),
            value: value.clone(),
        })
    }

    fn all_of(&mut self, mut predicates: Vec<MemoryPredicate>) -> MemoryPredicate {
        if predicates.len() == 1 {
            return predicates.remove(0);
        }
        MemoryPredicate::All(predicates)
    }

    fn any_of(&mut self, mut predicates: Vec<MemoryPredicate>) -> MemoryPredicate {
        if predicates.len() == 1 {
            return predicates.remove(0);
        }
        MemoryPredicate::Any(predicates)
    }
}

/// Resolves a dotted path (`author.name`) inside a document.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    match current {
        Value::Null => None,
        value => Some(value),
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Total order over document values used for sorting.
///
/// Missing values sort first, then booleans, numbers and strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_documents(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_values(lookup(a, &key.field), lookup(b, &key.field));
        let ordering = match key.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Documents per resource, guarded by a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryBackend {
    /// Backend name.
    pub const NAME: &'static str = "memory";

    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a document for a resource.
    pub fn insert(&self, resource: impl Into<String>, document: Value) {
        self.documents
            .write()
            .entry(resource.into())
            .or_default()
            .push(document);
    }

    /// Stores several documents for a resource.
    pub fn extend(&self, resource: impl Into<String>, documents: impl IntoIterator<Item = Value>) {
        self.documents
            .write()
            .entry(resource.into())
            .or_default()
            .extend(documents);
    }

    /// Returns the number of documents stored for a resource.
    pub fn len(&self, resource: &str) -> usize {
        self.documents.read().get(resource).map_or(0, Vec::len)
    }

    /// Removes every document.
    pub fn clear(&self) {
        self.documents.write().clear();
    }

    fn matching(&self, plan: &QueryPlan) -> QueryResult<Vec<Value>> {
        let predicate = match plan.predicate() {
            Some(condition) => Some(condition.compile(&mut MemoryCompiler)?),
            None => None,
        };
        let guard = self.documents.read();
        let Some(documents) = guard.get(plan.resource()) else {
            return Ok(Vec::new());
        };
        Ok(documents
            .iter()
            .filter(|doc| predicate.as_ref().is_none_or(|p| p.matches(doc)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QueryExecutor for MemoryBackend {
    fn backend_name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self, plan: &QueryPlan) -> QueryResult<Vec<Value>> {
        let mut documents = self.matching(plan)?;
        if !plan.order().is_empty() {
            documents.sort_by(|a, b| compare_documents(a, b, plan.order()));
        }
        if let Some(window) = plan.window() {
            documents = documents
                .into_iter()
                .skip(window.offset as usize)
                .take(window.limit as usize)
                .collect();
        }
        trace!(plan = %plan, rows = documents.len(), "Executed plan in memory");
        Ok(documents)
    }

    async fn count(&self, plan: &QueryPlan) -> QueryResult<u64> {
        Ok(self.matching(plan)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Condition;
    use serde_json::json;

    fn predicate(condition: Condition) -> MemoryPredicate {
        condition.compile(&mut MemoryCompiler).unwrap()
    }

    #[test]
    fn test_lookup_dotted_path() {
        let doc = json!({"author": {"name": "Le Guin"}, "missing": null});
        assert_eq!(lookup(&doc, "author.name"), Some(&json!("Le Guin")));
        assert_eq!(lookup(&doc, "author.age"), None);
        assert_eq!(lookup(&doc, "missing"), None);
    }

    #[test]
    fn test_missing_field_never_matches() {
        let doc = json!({"title": "Dune"});
        assert!(!predicate(Condition::eq("status", "a")).matches(&doc));
        assert!(!predicate(Condition::neq("status", "a")).matches(&doc));
    }

    #[test]
    fn test_incomparable_never_matches() {
        let doc = json!({"price": "cheap"});
        assert!(!predicate(Condition::gte("price", 1i64)).matches(&doc));
        assert!(!predicate(Condition::neq("price", 1i64)).matches(&doc));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let doc = json!({"price": 10});
        assert!(predicate(Condition::gte("price", 10i64)).matches(&doc));
        assert!(predicate(Condition::lte("price", 10i64)).matches(&doc));
        assert!(!predicate(Condition::gte("price", 11i64)).matches(&doc));
    }

    #[test]
    fn test_empty_composites() {
        let doc = json!({});
        assert!(predicate(Condition::and(vec![])).matches(&doc));
        assert!(!predicate(Condition::or(vec![])).matches(&doc));
    }

    #[test]
    fn test_sort_order_of_mixed_values() {
        let mut docs = [json!({"v": "b"}), json!({"v": 2}), json!({}), json!({"v": true}), json!({"v": 1.5})];
        docs.sort_by(|a, b| compare_documents(a, b, &[SortKey::asc("v")]));
        assert_eq!(
            docs.to_vec(),
            vec![json!({}), json!({"v": true}), json!({"v": 1.5}), json!({"v": 2}), json!({"v": "b"})]
        );
    }

    #[tokio::test]
    async fn test_execute_filters_sorts_and_windows() {
        let backend = MemoryBackend::new();
        backend.extend(
            "Book",
            (1..=5).map(|i| {
                let status = if i % 2 == 0 { "a" } else { "b" };
                json!({"id": i, "price": i * 10, "status": status})
            }),
        );

        let mut plan = QueryPlan::new("Book");
        plan.and_where(Condition::eq("status", "b"));
        plan.order_by(SortKey::desc("price"));
        plan.set_window(1, 1);

        let rows = backend.execute(&plan).await.unwrap();
        assert_eq!(rows, vec![json!({"id": 3, "price": 30, "status": "b"})]);
        assert_eq!(backend.count(&plan).await.unwrap(), 3);
        assert_eq!(backend.count(&QueryPlan::new("Author")).await.unwrap(), 0);
    }
}
