//! SQL dialects
//!
//! A [`SqlDialect`] renders a [`Query`] into parameterized SQL text for one
//! backend and supplies the backend's catalog and transaction statements.
//! Rendering is pure: the same query always yields the same text and the same
//! parameter order.

use std::fmt;

use sea_query::{
    Alias, Asterisk, Expr, MysqlQueryBuilder, Order, PostgresQueryBuilder, QueryBuilder,
    SimpleExpr, SqliteQueryBuilder, Value,
};

use crate::error::{QuarryError, Result};
use crate::query::raw::rewrite_named;
use crate::query::{CompareOp, Predicate, Query, QueryKind, SortOrder};
use crate::result::ResultSet;
use crate::schema::{self, TableSchema};
use crate::transaction::IsolationLevel;
use crate::value::TryGetable;

/// Rendered SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
    pub kind: QueryKind,
    /// Identity column requested by an insert
    pub identity_column: Option<String>,
    /// The statement itself projects the identity (`RETURNING`)
    pub returns_identity: bool,
}

/// Backend-specific SQL rendering
pub trait SqlDialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// sea-query builder used for structured queries
    fn query_builder(&self) -> &dyn QueryBuilder;

    /// Placeholder text for the 1-based parameter `position`.
    fn placeholder(&self, position: usize) -> String;

    /// Whether inserts can project generated values with `RETURNING`.
    fn supports_returning(&self) -> bool;

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Statements that open a transaction at `isolation`, in execution order.
    fn begin_transaction(&self, isolation: IsolationLevel) -> Vec<String>;

    /// Query listing user table names, one per row in the first column.
    fn table_names_query(&self) -> Query;

    /// Catalog query describing the columns of `table`.
    fn table_schema_query(&self, table: &str) -> Query;

    /// Parse the rows returned by [`SqlDialect::table_schema_query`].
    fn parse_table_schema(&self, table: &str, rows: &ResultSet) -> Result<TableSchema>;

    /// Render a query into SQL text and ordered parameters.
    fn render(&self, query: &Query) -> Result<Statement> {
        render_query(self, query)
    }
}

fn render_query<D: SqlDialect + ?Sized>(dialect: &D, query: &Query) -> Result<Statement> {
    if query.kind() == QueryKind::Raw {
        if query.sql().trim().is_empty() {
            return Err(QuarryError::QueryBuild("raw statement has no SQL".to_string()));
        }
        let (sql, params) =
            rewrite_named(query.sql(), query.bindings(), |pos| dialect.placeholder(pos))?;
        return Ok(Statement {
            sql,
            params,
            kind: QueryKind::Raw,
            identity_column: None,
            returns_identity: false,
        });
    }

    if query.table().trim().is_empty() {
        return Err(QuarryError::QueryBuild(format!(
            "{:?} query has no target table",
            query.kind()
        )));
    }
    let table = Alias::new(query.table());
    let builder = dialect.query_builder();
    let mut returns_identity = false;

    let (sql, values) = match query.kind() {
        QueryKind::Select => {
            let mut stmt = sea_query::Query::select();
            if query.selected_columns().is_empty() {
                stmt.column(Asterisk);
            }
            for column in query.selected_columns() {
                stmt.column(Alias::new(column));
            }
            stmt.from(table);
            for predicate in query.predicates() {
                stmt.and_where(predicate_expr(predicate)?);
            }
            for (column, order) in query.ordering() {
                let order = match order {
                    SortOrder::Asc => Order::Asc,
                    SortOrder::Desc => Order::Desc,
                };
                stmt.order_by(Alias::new(column), order);
            }
            if let Some(limit) = query.limit_value() {
                stmt.limit(limit);
            }
            if let Some(offset) = query.offset_value() {
                stmt.offset(offset);
            }
            stmt.build_any(builder)
        }
        QueryKind::Insert => {
            let mut stmt = sea_query::Query::insert();
            stmt.into_table(table);
            if query.assignments().is_empty() {
                stmt.or_default_values();
            } else {
                stmt.columns(query.assignments().iter().map(|(c, _)| Alias::new(c)));
                stmt.values(query.assignments().iter().map(|(_, v)| SimpleExpr::from(v.clone())))
                    .map_err(|e| QuarryError::QueryBuild(e.to_string()))?;
            }
            if let Some(identity) = query.identity_column() {
                if dialect.supports_returning() {
                    stmt.returning_col(Alias::new(identity));
                    returns_identity = true;
                }
            }
            stmt.build_any(builder)
        }
        QueryKind::Update => {
            if query.assignments().is_empty() {
                return Err(QuarryError::QueryBuild(format!(
                    "update of `{}` assigns no columns",
                    query.table()
                )));
            }
            require_predicates(query)?;
            let mut stmt = sea_query::Query::update();
            stmt.table(table);
            for (column, value) in query.assignments() {
                stmt.value(Alias::new(column), value.clone());
            }
            for predicate in query.predicates() {
                stmt.and_where(predicate_expr(predicate)?);
            }
            stmt.build_any(builder)
        }
        QueryKind::Delete => {
            require_predicates(query)?;
            let mut stmt = sea_query::Query::delete();
            stmt.from_table(table);
            for predicate in query.predicates() {
                stmt.and_where(predicate_expr(predicate)?);
            }
            stmt.build_any(builder)
        }
        QueryKind::Raw => {
            return Err(QuarryError::QueryBuild(
                "raw statement reached structured rendering".to_string(),
            ))
        }
    };

    Ok(Statement {
        sql,
        params: values.0,
        kind: query.kind(),
        identity_column: query.identity_column().map(str::to_string),
        returns_identity,
    })
}

fn require_predicates(query: &Query) -> Result<()> {
    if query.predicates().is_empty() && !query.is_unconditional() {
        return Err(QuarryError::QueryBuild(format!(
            "{:?} of `{}` has no predicates; call `unconditional()` to affect every row",
            query.kind(),
            query.table()
        )));
    }
    Ok(())
}

fn single_value(predicate: &Predicate) -> Result<Value> {
    match predicate.values.as_slice() {
        [value] => Ok(value.clone()),
        other => Err(QuarryError::QueryBuild(format!(
            "{:?} predicate on `{}` needs exactly one value, got {}",
            predicate.op,
            predicate.column,
            other.len()
        ))),
    }
}

fn predicate_expr(predicate: &Predicate) -> Result<SimpleExpr> {
    let column = Expr::col(Alias::new(&predicate.column));
    let expr = match predicate.effective_op() {
        CompareOp::IsNull => column.is_null(),
        CompareOp::IsNotNull => column.is_not_null(),
        CompareOp::Eq => column.eq(single_value(predicate)?),
        CompareOp::Ne => column.ne(single_value(predicate)?),
        CompareOp::Gt => column.gt(single_value(predicate)?),
        CompareOp::Gte => column.gte(single_value(predicate)?),
        CompareOp::Lt => column.lt(single_value(predicate)?),
        CompareOp::Lte => column.lte(single_value(predicate)?),
        CompareOp::Like => {
            let pattern = String::try_get(&single_value(predicate)?).map_err(|e| {
                QuarryError::QueryBuild(format!(
                    "LIKE pattern on `{}` must be text: {e}",
                    predicate.column
                ))
            })?;
            column.like(pattern)
        }
        CompareOp::In => {
            if predicate.values.is_empty() {
                return Err(QuarryError::QueryBuild(format!(
                    "IN predicate on `{}` has an empty value list",
                    predicate.column
                )));
            }
            column.is_in(predicate.values.iter().cloned())
        }
    };
    Ok(expr)
}

/// PostgreSQL: `$n` placeholders, `RETURNING`, `information_schema` catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn query_builder(&self) -> &dyn QueryBuilder {
        &PostgresQueryBuilder
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${position}")
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn begin_transaction(&self, isolation: IsolationLevel) -> Vec<String> {
        match isolation.to_sql() {
            Some(level) => vec![format!("BEGIN ISOLATION LEVEL {level}")],
            None => vec!["BEGIN".to_string()],
        }
    }

    fn table_names_query(&self) -> Query {
        Query::raw(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )
    }

    fn table_schema_query(&self, table: &str) -> Query {
        Query::raw(
            "SELECT c.column_name, c.data_type, c.is_nullable, c.column_default, \
             EXISTS (SELECT 1 FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage k \
             ON k.constraint_name = tc.constraint_name AND k.table_schema = tc.table_schema \
             WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = c.table_schema \
             AND tc.table_name = c.table_name AND k.column_name = c.column_name) AS is_primary_key \
             FROM information_schema.columns c \
             WHERE c.table_schema = current_schema() AND c.table_name = :table \
             ORDER BY c.ordinal_position",
        )
        .bind("table", table)
    }

    fn parse_table_schema(&self, table: &str, rows: &ResultSet) -> Result<TableSchema> {
        schema::parse_postgres_columns(table, rows)
    }
}

/// MySQL: `?` placeholders, backtick quoting, `DESCRIBE` catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn query_builder(&self) -> &dyn QueryBuilder {
        &MysqlQueryBuilder
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }

    fn begin_transaction(&self, isolation: IsolationLevel) -> Vec<String> {
        let mut statements = Vec::new();
        if let Some(level) = isolation.to_sql() {
            statements.push(format!("SET TRANSACTION ISOLATION LEVEL {level}"));
        }
        statements.push("START TRANSACTION".to_string());
        statements
    }

    fn table_names_query(&self) -> Query {
        Query::raw("SHOW TABLES")
    }

    fn table_schema_query(&self, table: &str) -> Query {
        Query::raw(format!("DESCRIBE {}", self.quote_identifier(table)))
    }

    fn parse_table_schema(&self, table: &str, rows: &ResultSet) -> Result<TableSchema> {
        schema::parse_mysql_describe(table, rows)
    }
}

/// SQLite: `?` placeholders, `PRAGMA table_info` catalog.
///
/// SQLite transactions are always serializable; isolation levels only choose
/// between a deferred and an immediate write lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn query_builder(&self) -> &dyn QueryBuilder {
        &SqliteQueryBuilder
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn supports_returning(&self) -> bool {
        false
    }

    fn begin_transaction(&self, isolation: IsolationLevel) -> Vec<String> {
        match isolation {
            IsolationLevel::Serializable => vec!["BEGIN IMMEDIATE".to_string()],
            _ => vec!["BEGIN DEFERRED".to_string()],
        }
    }

    fn table_names_query(&self) -> Query {
        Query::raw(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
    }

    fn table_schema_query(&self, table: &str) -> Query {
        Query::raw(format!("PRAGMA table_info({})", self.quote_identifier(table)))
    }

    fn parse_table_schema(&self, table: &str, rows: &ResultSet) -> Result<TableSchema> {
        schema::parse_sqlite_table_info(table, rows)
    }
}
