//! `DbClient` - the client contract
//!
//! A vendor driver implements the primitive operations (open/close, execute,
//! execute_non_query, begin/commit/rollback) and names its [`SqlDialect`].
//! Everything else (scalars, transactions, introspection and the entity CRUD
//! API) is provided on top of those primitives.
//!
//! Every operation takes `&mut self`: one client owns one connection and runs
//! one operation at a time. Relationship resolution reuses the same exclusive
//! borrow, so nested queries can never overlap an open cursor.

use sea_query::Value;

use crate::entity::Entity;
use crate::error::{QuarryError, Result};
use crate::mapper::{self, RelationLoader, DEFAULT_MAX_RELATION_DEPTH};
use crate::query::{Query, Select, SqlDialect};
use crate::result::ResultSet;
use crate::schema::TableSchema;
use crate::transaction::{self, IsolationLevel};
use crate::value::TryGetable;

/// Connection state of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

/// Outcome of a statement that projects no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NonQueryResult {
    pub rows_affected: u64,
    /// Generated identity of an insert; `None` when the statement produced none
    pub last_insert_id: Option<i64>,
}

/// Trait for executing database operations against one connection
///
/// # Examples
///
/// ```rust
/// use quarry::{DbClient, Entity, SqliteClient};
///
/// #[derive(Debug, Clone, Default, PartialEq, Entity)]
/// #[table_name = "person"]
/// struct Person {
///     #[primary_key]
///     #[auto_increment]
///     id: i64,
///     name: String,
/// }
///
/// # fn main() -> quarry::Result<()> {
/// let mut client = SqliteClient::in_memory()?;
/// client.execute_non_query_sql("CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")?;
///
/// let created = client.insert(&Person { id: 0, name: "Ana".into() })?;
/// let mut ana: Person = client.find_by_id(created.last_insert_id.unwrap_or_default())?.unwrap();
/// client.update(&mut ana, |p| p.name = "Ana Maria".into())?;
/// assert_eq!(client.select::<Person>()?, vec![ana.clone()]);
///
/// client.delete(&ana)?;
/// assert_eq!(client.execute_scalar_as::<i64>(&quarry::Query::raw("SELECT COUNT(*) FROM person"))?, 0);
/// # Ok(())
/// # }
/// ```
pub trait DbClient {
    /// Dialect used to render queries for this connection.
    fn dialect(&self) -> &dyn SqlDialect;

    fn open(&mut self) -> Result<()>;

    fn state(&self) -> ConnectionState;

    fn close(&mut self) -> Result<()>;

    /// Run a query and buffer every row it returns.
    fn execute(&mut self, query: &Query) -> Result<ResultSet>;

    /// Run a statement that projects no rows.
    fn execute_non_query(&mut self, query: &Query) -> Result<NonQueryResult>;

    fn begin(&mut self, isolation: IsolationLevel) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Maximum nesting of relationship resolution before mapping fails.
    fn max_relation_depth(&self) -> usize {
        DEFAULT_MAX_RELATION_DEPTH
    }

    /// Isolation used by [`DbClient::execute_transaction_default`].
    fn default_isolation(&self) -> IsolationLevel {
        IsolationLevel::Unspecified
    }

    /// Run a query expected to yield exactly one row with one column.
    ///
    /// Zero rows, several rows or several columns are a
    /// [`QuarryError::Cardinality`]; no value is picked silently.
    fn execute_scalar(&mut self, query: &Query) -> Result<Value> {
        let rows = self.execute(query)?;
        let columns = rows.columns().len();
        match rows.rows() {
            [row] if columns == 1 => Ok(row.values()[0].clone()),
            other => Err(QuarryError::Cardinality {
                expected: "exactly one row with one column",
                rows: other.len(),
                columns,
            }),
        }
    }

    fn execute_scalar_as<T: TryGetable>(&mut self, query: &Query) -> Result<T>
    where
        Self: Sized,
    {
        let value = self.execute_scalar(query)?;
        Ok(T::try_get(&value)?)
    }

    /// Execute statements sequentially in one transaction; see [`transaction::run`].
    fn execute_transaction(
        &mut self,
        isolation: IsolationLevel,
        queries: &[Query],
    ) -> Result<Vec<NonQueryResult>> {
        transaction::run(self, isolation, queries)
    }

    /// [`DbClient::execute_transaction`] at the client's configured isolation.
    fn execute_transaction_default(&mut self, queries: &[Query]) -> Result<Vec<NonQueryResult>> {
        let isolation = self.default_isolation();
        transaction::run(self, isolation, queries)
    }

    /// Describe the columns of `table` through the dialect's catalog query.
    fn get_table_schema(&mut self, table: &str) -> Result<TableSchema> {
        let query = self.dialect().table_schema_query(table);
        let rows = self.execute(&query)?;
        self.dialect().parse_table_schema(table, &rows)
    }

    fn get_table_names(&mut self) -> Result<Vec<String>> {
        let query = self.dialect().table_names_query();
        let rows = self.execute(&query)?;
        rows.iter()
            .map(|row| {
                let value = row.get_index(0).ok_or_else(|| {
                    QuarryError::introspection("*", "table listing returned no columns")
                })?;
                String::try_get(value).map_err(|e| QuarryError::introspection("*", e.to_string()))
            })
            .collect()
    }

    fn execute_sql(&mut self, sql: &str) -> Result<ResultSet> {
        self.execute(&Query::raw(sql))
    }

    fn execute_non_query_sql(&mut self, sql: &str) -> Result<NonQueryResult> {
        self.execute_non_query(&Query::raw(sql))
    }

    fn execute_scalar_sql(&mut self, sql: &str) -> Result<Value> {
        self.execute_scalar(&Query::raw(sql))
    }

    /// Insert every column-bound member except auto-increment ones.
    ///
    /// The generated identity, when the entity declares one, is reported in
    /// [`NonQueryResult::last_insert_id`].
    fn insert<T: Entity>(&mut self, entity: &T) -> Result<NonQueryResult>
    where
        Self: Sized,
    {
        let meta = T::metadata();
        let mut query = Query::insert(meta.table());
        for (column, value) in entity.column_values() {
            if !meta.is_auto_increment(column) {
                query = query.value(column, value);
            }
        }
        if let Some(identity) = meta.identity_column() {
            query = query.returning_identity(identity);
        }
        self.execute_non_query(&query)
    }

    /// Every row of the entity's table.
    fn select<T: Entity>(&mut self) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        self.find(Select::<T>::new())
    }

    fn find<T: Entity>(&mut self, select: Select<T>) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        let rows = self.execute(select.query())?;
        let mut loader = RelationLoader::new(self);
        mapper::map_all(&rows, &mut loader)
    }

    fn find_one<T: Entity>(&mut self, select: Select<T>) -> Result<Option<T>>
    where
        Self: Sized,
    {
        Ok(self.find(select.limit(1))?.into_iter().next())
    }

    /// Look an entity up by its single primary key column.
    fn find_by_id<T: Entity>(&mut self, id: impl Into<Value>) -> Result<Option<T>>
    where
        Self: Sized,
    {
        let meta = T::metadata();
        let mut keys = meta.primary_key_columns();
        let column = match (keys.next(), keys.next()) {
            (Some(column), None) => column,
            _ => {
                return Err(QuarryError::QueryBuild(format!(
                    "{} does not declare exactly one primary key column",
                    meta.type_name()
                )))
            }
        };
        self.find_one(Select::<T>::new().eq(column, id))
    }

    /// Apply `transform` to a copy of `entity` and write its full column set.
    ///
    /// The row is identified by the entity's primary key columns as they were
    /// before the transform (every column when it declares none). `entity` is
    /// replaced by the transformed copy only when the statement succeeds.
    fn update<T, F>(&mut self, entity: &mut T, transform: F) -> Result<NonQueryResult>
    where
        Self: Sized,
        T: Entity + Clone,
        F: FnOnce(&mut T),
    {
        let meta = T::metadata();
        let mut updated = entity.clone();
        transform(&mut updated);

        let mut query = Query::update(meta.table());
        for (column, value) in updated.column_values() {
            if !meta.is_auto_increment(column) {
                query = query.set(column, value);
            }
        }
        query = key_predicates(query, meta, entity.column_values());

        let result = self.execute_non_query(&query)?;
        *entity = updated;
        Ok(result)
    }

    /// Delete the row identified by the entity's primary key columns (every
    /// column when it declares none).
    fn delete<T: Entity>(&mut self, entity: &T) -> Result<NonQueryResult>
    where
        Self: Sized,
    {
        let meta = T::metadata();
        let query = key_predicates(Query::delete(meta.table()), meta, entity.column_values());
        self.execute_non_query(&query)
    }
}

fn key_predicates(
    mut query: Query,
    meta: &crate::entity::EntityMetadata,
    values: Vec<(&'static str, Value)>,
) -> Query {
    let keys: Vec<&str> = meta.primary_key_columns().collect();
    for (column, value) in values {
        if keys.is_empty() || keys.contains(&column) {
            query = query.eq(column, value);
        }
    }
    query
}

impl<C: DbClient + ?Sized> DbClient for Box<C> {
    fn dialect(&self) -> &dyn SqlDialect {
        (**self).dialect()
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn execute(&mut self, query: &Query) -> Result<ResultSet> {
        (**self).execute(query)
    }

    fn execute_non_query(&mut self, query: &Query) -> Result<NonQueryResult> {
        (**self).execute_non_query(query)
    }

    fn begin(&mut self, isolation: IsolationLevel) -> Result<()> {
        (**self).begin(isolation)
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }

    fn max_relation_depth(&self) -> usize {
        (**self).max_relation_depth()
    }

    fn default_isolation(&self) -> IsolationLevel {
        (**self).default_isolation()
    }
}
