//! # Quarry
//!
//! Synchronous ORM core: entity metadata from `#[derive(Entity)]`, a
//! dialect-aware query model, buffered result sets and a row-to-entity mapper
//! that resolves declared relationships through nested queries.
//!
//! Drivers for SQLite (`sqlite` feature, default) and PostgreSQL (`postgres`
//! feature) implement [`DbClient`]; [`MockClient`] (`mock` feature) answers
//! from scripted results for tests.

extern crate self as quarry;

pub mod client;
pub mod config;
pub mod driver;
pub mod entity;
pub mod error;
pub mod mapper;
#[cfg(feature = "mock")]
pub mod mock;
pub mod query;
pub mod result;
pub mod schema;
pub mod telemetry;
pub mod transaction;
pub mod value;

pub use client::{ConnectionState, DbClient, NonQueryResult};
pub use config::{Backend, DatabaseConfig};
pub use entity::{Cardinality, Entity, EntityMetadata, MemberBinding, RelationContainer};
pub use error::{QuarryError, Result, ValueExtractionError};
pub use query::{
    CompareOp, MySqlDialect, PostgresDialect, Query, QueryKind, Select, SortOrder, SqlDialect,
    SqliteDialect, Statement,
};
pub use quarry_derive::Entity;
pub use result::{ColumnInfo, ResultRow, ResultSet};
pub use schema::{ColumnDescriptor, TableSchema};
pub use transaction::IsolationLevel;
pub use value::{TryGetable, ValueKind};

#[cfg(feature = "mock")]
pub use mock::MockClient;
#[cfg(feature = "postgres")]
pub use driver::postgres::PostgresClient;
#[cfg(feature = "sqlite")]
pub use driver::sqlite::SqliteClient;

/// Re-exports used by code generated from `#[derive(Entity)]`
#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
    pub use sea_query::Value;
}
