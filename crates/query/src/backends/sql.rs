//! SQL compilation of query plans.
//!
//! Plans compile to parameterized SQLite statements over a document table:
//!
//! ```sql
//! CREATE TABLE resources (
//!     resource_type TEXT NOT NULL,
//!     id TEXT NOT NULL,
//!     content TEXT NOT NULL
//! );
//! ```
//!
//! Fields are read with `json_extract(content, '$.path')`; the path itself is
//! a bound parameter. No driver is linked: callers bind [`SqlParam`]s with the
//! driver of their choice.

use chrono::SecondsFormat;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{BackendError, QueryResult};
use crate::types::{ComparisonOp, ConditionCompiler, QueryPlan, SortDirection, TypedValue};

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }

    /// Creates a float parameter.
    pub fn float(f: f64) -> Self {
        SqlParam::Float(f)
    }

    /// Binds a typed literal the way SQLite's JSON functions return it.
    ///
    /// Booleans become 0/1, decimals become floats, and temporal and
    /// identifier values become their canonical strings.
    pub fn from_typed(value: &TypedValue) -> QueryResult<Self> {
        Ok(match value {
            TypedValue::String(s) => SqlParam::String(s.clone()),
            TypedValue::Integer(n) => SqlParam::Integer(*n),
            TypedValue::Decimal(d) => {
                SqlParam::Float(d.to_f64().ok_or_else(|| BackendError::QueryFailed {
                    backend_name: SqlQueryBuilder::BACKEND_NAME.to_string(),
                    message: format!("decimal {} does not fit a float", d),
                })?)
            }
            TypedValue::Boolean(b) => SqlParam::Integer(i64::from(*b)),
            TypedValue::DateTime(dt) => {
                SqlParam::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            other => SqlParam::String(other.to_string()),
        })
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Adds a parameter placeholder and returns the placeholder string.
    pub fn add_param(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Converts a dotted field name into a JSON path.
pub fn json_path(field: &str) -> String {
    format!("$.{}", field)
}

/// Compiles conditions into SQL, numbering placeholders in a shared fragment.
struct SqlCompiler<'a> {
    fragment: &'a mut SqlFragment,
}

impl ConditionCompiler for SqlCompiler<'_> {
    type Predicate = String;

    fn comparison(&mut self, op: ComparisonOp, field: &str, value: &TypedValue) -> QueryResult<String> {
        let path = self.fragment.add_param(SqlParam::string(json_path(field)));
        let literal = self.fragment.add_param(SqlParam::from_typed(value)?);
        Ok(format!(
            "json_extract(content, {}) {} {}",
            path,
            op.symbol(),
            literal
        ))
    }

    fn all_of(&mut self, predicates: Vec<String>) -> String {
        combine(predicates, " AND ", "1 = 1")
    }

    fn any_of(&mut self, predicates: Vec<String>) -> String {
        combine(predicates, " OR ", "1 = 0")
    }
}

fn combine(mut predicates: Vec<String>, joiner: &str, empty: &str) -> String {
    match predicates.len() {
        0 => empty.to_string(),
        1 => predicates.remove(0),
        _ => format!("({})", predicates.join(joiner)),
    }
}

/// Builds SQL statements from query plans.
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    table: String,
}

impl Default for SqlQueryBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TABLE)
    }
}

impl SqlQueryBuilder {
    /// Name used in backend errors.
    pub const BACKEND_NAME: &'static str = "sql";

    /// Default document table.
    pub const DEFAULT_TABLE: &'static str = "resources";

    /// Creates a builder over the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Builds `SELECT content ...` with ordering and window.
    pub fn build_select(&self, plan: &QueryPlan) -> QueryResult<SqlFragment> {
        let mut fragment = self.base("SELECT content", plan)?;

        if !plan.order().is_empty() {
            let mut keys = Vec::with_capacity(plan.order().len());
            for key in plan.order() {
                let path = fragment.add_param(SqlParam::string(json_path(&key.field)));
                let direction = match key.direction {
                    SortDirection::Ascending => "ASC",
                    SortDirection::Descending => "DESC",
                };
                keys.push(format!("json_extract(content, {}) {}", path, direction));
            }
            fragment.sql = format!("{} ORDER BY {}", fragment.sql, keys.join(", "));
        }

        if let Some(window) = plan.window() {
            let limit = fragment.add_param(SqlParam::integer(to_i64(window.limit)));
            let offset = fragment.add_param(SqlParam::integer(to_i64(window.offset)));
            fragment.sql = format!("{} LIMIT {} OFFSET {}", fragment.sql, limit, offset);
        }

        Ok(fragment)
    }

    /// Builds `SELECT COUNT(*) ...`, ignoring ordering and window.
    pub fn build_count(&self, plan: &QueryPlan) -> QueryResult<SqlFragment> {
        self.base("SELECT COUNT(*)", plan)
    }

    fn base(&self, select: &str, plan: &QueryPlan) -> QueryResult<SqlFragment> {
        let mut fragment = SqlFragment::new("");
        let resource = fragment.add_param(SqlParam::string(plan.resource()));
        let mut sql = format!(
            "{} FROM {} WHERE resource_type = {}",
            select, self.table, resource
        );
        if let Some(condition) = plan.predicate() {
            let predicate = condition.compile(&mut SqlCompiler {
                fragment: &mut fragment,
            })?;
            sql = format!("{} AND {}", sql, predicate);
        }
        fragment.sql = sql;
        Ok(fragment)
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
