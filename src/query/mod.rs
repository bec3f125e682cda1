//! Query model
//!
//! A [`Query`] describes one SELECT/INSERT/UPDATE/DELETE (or a raw statement
//! with named parameters) without any SQL in it. Rendering to text happens in
//! [`dialect`], per backend.
//!
//! ```rust
//! use quarry::query::{CompareOp, Query, SortOrder};
//!
//! let query = Query::select("person")
//!     .filter("age", CompareOp::Gte, 18)
//!     .order_by("name", SortOrder::Asc)
//!     .limit(10);
//! assert_eq!(query.predicates().len(), 1);
//! ```

pub mod dialect;
mod raw;
pub mod select;

pub use dialect::{MySqlDialect, PostgresDialect, SqlDialect, SqliteDialect, Statement};
pub use select::Select;

use sea_query::Value;

use crate::value::is_null;

/// Operation kind of a [`Query`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
    /// Caller-written SQL with `:name` parameters
    Raw,
}

/// Comparison used by a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    IsNull,
    IsNotNull,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One `column <op> value` condition. All predicates of a query are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    /// Empty for `IsNull`/`IsNotNull`, one value for comparisons, any number for `In`
    pub values: Vec<Value>,
}

impl Predicate {
    /// Effective operator after NULL normalization: `= NULL` is `IS NULL`.
    pub fn effective_op(&self) -> CompareOp {
        match (self.op, self.values.first()) {
            (CompareOp::Eq, Some(v)) if is_null(v) => CompareOp::IsNull,
            (CompareOp::Ne, Some(v)) if is_null(v) => CompareOp::IsNotNull,
            (op, _) => op,
        }
    }
}

/// Dialect-agnostic description of a database operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: QueryKind,
    table: String,
    columns: Vec<String>,
    assignments: Vec<(String, Value)>,
    predicates: Vec<Predicate>,
    order: Vec<(String, SortOrder)>,
    limit: Option<u64>,
    offset: Option<u64>,
    identity_column: Option<String>,
    unconditional: bool,
    sql: String,
    bindings: Vec<(String, Value)>,
}

impl Query {
    fn new(kind: QueryKind, table: impl Into<String>) -> Self {
        Query {
            kind,
            table: table.into(),
            columns: Vec::new(),
            assignments: Vec::new(),
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            identity_column: None,
            unconditional: false,
            sql: String::new(),
            bindings: Vec::new(),
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Select, table)
    }

    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Insert, table)
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Update, table)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(QueryKind::Delete, table)
    }

    /// Raw SQL with `:name` parameters, bound with [`Query::bind`].
    ///
    /// `::` (PostgreSQL casts) and text inside quotes are never treated as
    /// parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        let mut query = Self::new(QueryKind::Raw, String::new());
        query.sql = sql.into();
        query
    }

    /// Project a column. Without any, a select projects `*`.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Insert value; alias of [`Query::set`].
    pub fn value(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value)
    }

    /// Assign a column. Assigning the same column twice keeps the last value
    /// in the position of the first.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.assignments.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.assignments.push((column, value)),
        }
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        let values = match op {
            CompareOp::IsNull | CompareOp::IsNotNull => Vec::new(),
            _ => vec![value.into()],
        };
        self.predicates.push(Predicate {
            column: column.into(),
            op,
            values,
        });
        self
    }

    /// Shorthand for `filter(column, CompareOp::Eq, value)`.
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, CompareOp::Eq, value)
    }

    pub fn is_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.predicates.push(Predicate {
            column: column.into(),
            op: CompareOp::In,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Ask the backend to report the generated value of `column` after an insert.
    pub fn returning_identity(mut self, column: impl Into<String>) -> Self {
        self.identity_column = Some(column.into());
        self
    }

    /// Allow an UPDATE or DELETE without predicates to touch every row.
    pub fn unconditional(mut self) -> Self {
        self.unconditional = true;
        self
    }

    /// Bind a named parameter of a raw statement. Rebinding a name replaces it.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let name = name.trim_start_matches(':').to_string();
        let value = value.into();
        match self.bindings.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.bindings.push((name, value)),
        }
        self
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn selected_columns(&self) -> &[String] {
        &self.columns
    }

    pub fn assignments(&self) -> &[(String, Value)] {
        &self.assignments
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn ordering(&self) -> &[(String, SortOrder)] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    pub fn identity_column(&self) -> Option<&str> {
        self.identity_column.as_deref()
    }

    pub fn is_unconditional(&self) -> bool {
        self.unconditional
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Every bound value keyed by a name unique within this query.
    ///
    /// Assignments are keyed by column, predicate values by
    /// `where{index}_{column}` (plus `_{n}` for `IN` lists), raw bindings by
    /// their parameter name.
    pub fn parameters(&self) -> Vec<(String, Value)> {
        let mut params: Vec<(String, Value)> = self.assignments.clone();
        for (index, predicate) in self.predicates.iter().enumerate() {
            match predicate.values.as_slice() {
                [] => {}
                [single] if predicate.op != CompareOp::In => {
                    params.push((format!("where{index}_{}", predicate.column), single.clone()));
                }
                many => {
                    for (n, value) in many.iter().enumerate() {
                        params.push((
                            format!("where{index}_{}_{n}", predicate.column),
                            value.clone(),
                        ));
                    }
                }
            }
        }
        params.extend(self.bindings.iter().cloned());
        params
    }

    pub(crate) fn bindings(&self) -> &[(String, Value)] {
        &self.bindings
    }
}
