//! Filter condition trees.
//!
//! A [`Condition`] is an immutable predicate expression built by filters and
//! compiled by backends through [`ConditionCompiler`]:
//!
//! ```
//! use tessera_query::types::{Condition, ComparisonOp};
//!
//! let published = Condition::any(ComparisonOp::Eq, "status", ["draft", "published"]).unwrap();
//! let affordable = Condition::lte("price", 20i64);
//! let condition = Condition::and(vec![published, affordable]);
//!
//! assert_eq!(
//!     condition.to_string(),
//!     "((status = draft OR status = published) AND price <= 20)"
//! );
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, QueryResult};

use super::value::TypedValue;

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    /// Field equals the value.
    Eq,
    /// Field differs from the value.
    Neq,
    /// Field is greater than or equal to the value.
    Gte,
    /// Field is less than or equal to the value.
    Lte,
}

impl ComparisonOp {
    /// Returns the SQL-style symbol of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Neq => "!=",
            ComparisonOp::Gte => ">=",
            ComparisonOp::Lte => "<=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOp::Eq => write!(f, "eq"),
            ComparisonOp::Neq => write!(f, "neq"),
            ComparisonOp::Gte => write!(f, "gte"),
            ComparisonOp::Lte => write!(f, "lte"),
        }
    }
}

/// A leaf comparison: `field op v1 OR field op v2 ...`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    op: ComparisonOp,
    field: String,
    values: Vec<TypedValue>,
}

impl Comparison {
    /// Returns the operator.
    pub fn op(&self) -> ComparisonOp {
        self.op
    }

    /// Returns the compared field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the candidate values. Never empty.
    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }
}

/// A predicate expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    /// A comparison leaf.
    Compare(Comparison),
    /// All children must hold. Empty means always true.
    And(Vec<Condition>),
    /// At least one child must hold. Empty means always false.
    Or(Vec<Condition>),
}

impl Condition {
    /// Creates a comparison matching any of `values`.
    ///
    /// Fails with [`FilterError::EmptyCondition`] when `values` is empty.
    pub fn any<I, V>(op: ComparisonOp, field: impl Into<String>, values: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<TypedValue>,
    {
        let field = field.into();
        let values: Vec<TypedValue> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(FilterError::EmptyCondition { field }.into());
        }
        Ok(Condition::Compare(Comparison { op, field, values }))
    }

    fn single(op: ComparisonOp, field: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Condition::Compare(Comparison {
            op,
            field: field.into(),
            values: vec![value.into()],
        })
    }

    /// `field = value`.
    pub fn eq(field: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Self::single(ComparisonOp::Eq, field, value)
    }

    /// `field != value`.
    pub fn neq(field: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Self::single(ComparisonOp::Neq, field, value)
    }

    /// `field >= value`.
    pub fn gte(field: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Self::single(ComparisonOp::Gte, field, value)
    }

    /// `field <= value`.
    pub fn lte(field: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        Self::single(ComparisonOp::Lte, field, value)
    }

    /// Conjunction of `children`.
    pub fn and(children: Vec<Condition>) -> Self {
        Condition::And(children)
    }

    /// Disjunction of `children`.
    pub fn or(children: Vec<Condition>) -> Self {
        Condition::Or(children)
    }

    /// Compiles the tree into a backend predicate.
    ///
    /// Leaves are OR-combined across their values; composites combine their
    /// compiled children with the matching boolean operator.
    pub fn compile<C: ConditionCompiler>(&self, compiler: &mut C) -> QueryResult<C::Predicate> {
        match self {
            Condition::Compare(cmp) => {
                let mut parts = Vec::with_capacity(cmp.values.len());
                for value in &cmp.values {
                    parts.push(compiler.comparison(cmp.op, &cmp.field, value)?);
                }
                Ok(compiler.any_of(parts))
            }
            Condition::And(children) => {
                let parts = children
                    .iter()
                    .map(|c| c.compile(compiler))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(compiler.all_of(parts))
            }
            Condition::Or(children) => {
                let parts = children
                    .iter()
                    .map(|c| c.compile(compiler))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(compiler.any_of(parts))
            }
        }
    }

    /// Returns every field referenced by the tree, in traversal order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Compare(cmp) => out.push(&cmp.field),
            Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare(cmp) => {
                let parts: Vec<String> = cmp
                    .values
                    .iter()
                    .map(|v| format!("{} {} {}", cmp.field, cmp.op.symbol(), v))
                    .collect();
                if parts.len() == 1 {
                    write!(f, "{}", parts[0])
                } else {
                    write!(f, "({})", parts.join(" OR "))
                }
            }
            Condition::And(children) if children.is_empty() => write!(f, "TRUE"),
            Condition::Or(children) if children.is_empty() => write!(f, "FALSE"),
            Condition::And(children) | Condition::Or(children) => {
                let joiner = if matches!(self, Condition::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                let parts: Vec<String> = children.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(joiner))
            }
        }
    }
}

/// Turns a [`Condition`] into a backend-specific predicate.
///
/// Implementations must combine predicates associatively and commutatively
/// so that child order never changes the result.
pub trait ConditionCompiler {
    /// The compiled predicate type.
    type Predicate;

    /// Compiles a single `field op value` comparison.
    fn comparison(
        &mut self,
        op: ComparisonOp,
        field: &str,
        value: &TypedValue,
    ) -> QueryResult<Self::Predicate>;

    /// Combines predicates with AND. An empty list is always true.
    fn all_of(&mut self, predicates: Vec<Self::Predicate>) -> Self::Predicate;

    /// Combines predicates with OR. An empty list is always false.
    fn any_of(&mut self, predicates: Vec<Self::Predicate>) -> Self::Predicate;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Renders predicates as strings to observe compile order.
    struct Render;

    impl ConditionCompiler for Render {
        type Predicate = String;

        fn comparison(
            &mut self,
            op: ComparisonOp,
            field: &str,
            value: &TypedValue,
        ) -> QueryResult<String> {
            Ok(format!("{}:{}:{}", field, op, value))
        }

        fn all_of(&mut self, predicates: Vec<String>) -> String {
            format!("all[{}]", predicates.join(","))
        }

        fn any_of(&mut self, predicates: Vec<String>) -> String {
            format!("any[{}]", predicates.join(","))
        }
    }

    #[test]
    fn test_any_requires_values() {
        let empty: Vec<&str> = vec![];
        let err = Condition::any(ComparisonOp::Eq, "status", empty).unwrap_err();
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn test_leaf_compiles_to_disjunction() {
        let cond = Condition::any(ComparisonOp::Eq, "status", ["a", "b"]).unwrap();
        let compiled = cond.compile(&mut Render).unwrap();
        assert_eq!(compiled, "any[status:eq:a,status:eq:b]");
    }

    #[test]
    fn test_nested_compile() {
        let cond = Condition::and(vec![
            Condition::eq("status", "a"),
            Condition::or(vec![Condition::gte("price", 10i64), Condition::neq("x", true)]),
        ]);
        let compiled = cond.compile(&mut Render).unwrap();
        assert_eq!(
            compiled,
            "all[any[status:eq:a],any[any[price:gte:10],any[x:neq:true]]]"
        );
    }

    #[test]
    fn test_fields() {
        let cond = Condition::and(vec![
            Condition::eq("status", "a"),
            Condition::or(vec![Condition::gte("price", 10i64)]),
        ]);
        assert_eq!(cond.fields(), vec!["status", "price"]);
    }

    #[test]
    fn test_display_empty_composites() {
        assert_eq!(Condition::and(vec![]).to_string(), "TRUE");
        assert_eq!(Condition::or(vec![]).to_string(), "FALSE");
    }
}
