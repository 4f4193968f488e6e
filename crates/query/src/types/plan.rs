//! The backend-neutral query handle mutated by extensions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::condition::Condition;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    /// Descending order.
    #[serde(alias = "desc")]
    Descending,
}

impl SortDirection {
    /// Parses `asc`/`desc` (case-insensitive). Returns None for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "ASC"),
            SortDirection::Descending => write!(f, "DESC"),
        }
    }
}

/// A sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// The field to sort by.
    pub field: String,

    /// The sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    /// Creates a sort key.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Creates an ascending sort key.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    /// Creates a descending sort key.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }

    /// Parses a sort key string (e.g., "-price" for descending).
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(field) = s.strip_prefix('-') {
            Self::desc(field)
        } else {
            Self::asc(s.strip_prefix('+').unwrap_or(s))
        }
    }
}

/// A result window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Number of matching items skipped.
    pub offset: u64,
    /// Maximum number of items returned.
    pub limit: u64,
}

/// A query under construction for one resource.
///
/// Created by the pipeline for a single run and owned by it; extensions
/// receive it mutably in priority order. All conditions are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    resource: String,
    conditions: Vec<Condition>,
    order: Vec<SortKey>,
    window: Option<Window>,
}

impl QueryPlan {
    /// Creates an unrestricted plan over a resource.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            conditions: Vec::new(),
            order: Vec::new(),
            window: None,
        }
    }

    /// Returns the resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Adds a condition. Conditions are combined with AND.
    pub fn and_where(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Returns the conditions added so far.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns the combined predicate, or None if the plan is unrestricted.
    pub fn predicate(&self) -> Option<Condition> {
        match self.conditions.len() {
            0 => None,
            1 => Some(self.conditions[0].clone()),
            _ => Some(Condition::and(self.conditions.clone())),
        }
    }

    /// Appends a sort key unless the field is already ordered.
    pub fn order_by(&mut self, key: SortKey) {
        if !self.is_ordered_by(&key.field) {
            self.order.push(key);
        }
    }

    /// Returns true if the plan already sorts by `field`.
    pub fn is_ordered_by(&self, field: &str) -> bool {
        self.order.iter().any(|k| k.field == field)
    }

    /// Returns the sort keys.
    pub fn order(&self) -> &[SortKey] {
        &self.order
    }

    /// Restricts the plan to a window of results.
    pub fn set_window(&mut self, offset: u64, limit: u64) {
        self.window = Some(Window { offset, limit });
    }

    /// Removes any window.
    pub fn clear_window(&mut self) {
        self.window = None;
    }

    /// Returns the window, if any.
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    /// Returns a copy without window and ordering, suitable for counting.
    pub fn for_count(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            conditions: self.conditions.clone(),
            order: Vec::new(),
            window: None,
        }
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {}", self.resource)?;
        if let Some(predicate) = self.predicate() {
            write!(f, " WHERE {}", predicate)?;
        }
        if !self.order.is_empty() {
            let keys: Vec<String> = self
                .order
                .iter()
                .map(|k| format!("{} {}", k.field, k.direction))
                .collect();
            write!(f, " ORDER BY {}", keys.join(", "))?;
        }
        if let Some(window) = self.window {
            write!(f, " LIMIT {} OFFSET {}", window.limit, window.offset)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parse() {
        assert_eq!(SortKey::parse("-price"), SortKey::desc("price"));
        assert_eq!(SortKey::parse("title"), SortKey::asc("title"));
        assert_eq!(SortKey::parse("+title"), SortKey::asc("title"));
    }

    #[test]
    fn test_order_by_ignores_duplicates() {
        let mut plan = QueryPlan::new("Book");
        plan.order_by(SortKey::desc("price"));
        plan.order_by(SortKey::asc("price"));
        assert_eq!(plan.order(), &[SortKey::desc("price")]);
    }

    #[test]
    fn test_predicate_combination() {
        let mut plan = QueryPlan::new("Book");
        assert!(plan.predicate().is_none());
        plan.and_where(Condition::eq("status", "a"));
        assert_eq!(plan.predicate(), Some(Condition::eq("status", "a")));
        plan.and_where(Condition::gte("price", 10i64));
        assert!(matches!(plan.predicate(), Some(Condition::And(c)) if c.len() == 2));
    }

    #[test]
    fn test_display() {
        let mut plan = QueryPlan::new("Book");
        plan.and_where(Condition::eq("status", "a"));
        plan.order_by(SortKey::desc("price"));
        plan.set_window(20, 10);
        assert_eq!(
            plan.to_string(),
            "FROM Book WHERE status = a ORDER BY price DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(plan.for_count().to_string(), "FROM Book WHERE status = a");
    }
}
