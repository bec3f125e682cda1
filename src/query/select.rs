//! Typed select over an entity's table.

use std::marker::PhantomData;

use sea_query::Value;

use crate::entity::Entity;
use crate::query::{CompareOp, Query, SortOrder};

/// Query builder for selecting entities of type `T`
///
/// Executed with [`DbClient::find`](crate::DbClient::find) or
/// [`DbClient::find_one`](crate::DbClient::find_one).
///
/// ```rust
/// use quarry::{Entity, Select, SortOrder};
///
/// #[derive(Debug, Default, Entity)]
/// #[table_name = "pets"]
/// struct Pet {
///     #[primary_key]
///     id: i64,
///     owner_id: i64,
///     name: String,
/// }
///
/// let select = Select::<Pet>::new().eq("owner_id", 1).order_by("name", SortOrder::Asc);
/// assert_eq!(select.query().table(), "pets");
/// ```
pub struct Select<T: Entity> {
    query: Query,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Select<T> {
    pub fn new() -> Self {
        Select {
            query: Query::select(T::metadata().table()),
            _entity: PhantomData,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        self.query = self.query.filter(column, op, value);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, CompareOp::Eq, value)
    }

    pub fn is_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.query = self.query.is_in(column, values);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.query = self.query.order_by(column, order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn into_query(self) -> Query {
        self.query
    }
}

impl<T: Entity> Default for Select<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Clone for Select<T> {
    fn clone(&self) -> Self {
        Select {
            query: self.query.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> std::fmt::Debug for Select<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Select")
            .field("entity", &T::metadata().type_name())
            .field("query", &self.query)
            .finish()
    }
}
