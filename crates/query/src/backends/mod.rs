//! Backend implementations.
//!
//! - [`memory`] - In-process document store implementing [`QueryExecutor`](crate::core::QueryExecutor)
//! - [`sql`] - Compiles plans to parameterized SQLite statements over JSON documents
//!
//! Both backends compile plan conditions through
//! [`ConditionCompiler`](crate::types::ConditionCompiler), so for documents
//! holding comparable values they select the same rows.

pub mod memory;
pub mod sql;

pub use memory::{MemoryBackend, MemoryCompiler, MemoryPredicate};
pub use sql::{SqlFragment, SqlParam, SqlQueryBuilder};
