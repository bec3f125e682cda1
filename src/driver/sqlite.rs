//! SQLite driver over `rusqlite`.
//!
//! Temporal, UUID and JSON parameters are stored as text; the value layer
//! parses them back when mapping.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use sea_query::Value;

use crate::client::{ConnectionState, DbClient, NonQueryResult};
use crate::config::{Backend, DatabaseConfig};
use crate::error::{QuarryError, Result};
use crate::mapper::DEFAULT_MAX_RELATION_DEPTH;
use crate::query::{Query, QueryKind, SqlDialect, SqliteDialect, Statement};
use crate::result::{ColumnInfo, ResultSet};
use crate::transaction::IsolationLevel;
use crate::value::{is_null, ValueKind};

#[cfg(feature = "tracing")]
use crate::telemetry::tracing_helpers;

const IN_MEMORY: &str = ":memory:";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Client owning one SQLite connection
#[derive(Debug)]
pub struct SqliteClient {
    path: String,
    conn: Option<Connection>,
    max_relation_depth: usize,
    isolation: IsolationLevel,
}

impl SqliteClient {
    /// A closed client for the database at `path` (`:memory:` for a private
    /// in-memory database).
    pub fn new(path: impl Into<String>) -> Self {
        SqliteClient {
            path: path.into(),
            conn: None,
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
            isolation: IsolationLevel::Unspecified,
        }
    }

    /// Open the database at `path`.
    pub fn connect(path: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(path);
        client.open()?;
        Ok(client)
    }

    pub fn in_memory() -> Result<Self> {
        Self::connect(IN_MEMORY)
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if config.backend != Backend::Sqlite {
            return Err(QuarryError::Driver(format!(
                "configuration selects {:?}, not sqlite",
                config.backend
            )));
        }
        let client = Self::connect(config.url.clone())?;
        Ok(client
            .with_max_relation_depth(config.max_relation_depth)
            .with_isolation(config.isolation))
    }

    pub fn with_max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }

    /// Isolation used by `execute_transaction_default`.
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(QuarryError::NotConnected)
    }

    fn render(&self, query: &Query) -> Result<Statement> {
        let statement = SqliteDialect.render(query)?;
        log::debug!("sqlite: {} {:?}", statement.sql, statement.params);
        Ok(statement)
    }

    fn batch(&self, sql: &str) -> Result<()> {
        log::debug!("sqlite: {sql}");
        self.connection()?
            .execute_batch(sql)
            .map_err(|e| QuarryError::execution(sql, e))
    }
}

impl DbClient for SqliteClient {
    fn dialect(&self) -> &dyn SqlDialect {
        &SqliteDialect
    }

    fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = if self.path == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(&self.path)
        }
        .map_err(|e| {
            QuarryError::connection(format!("failed to open sqlite database `{}`", self.path), e)
        })?;
        self.conn = Some(conn);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        match self.conn {
            Some(_) => ConnectionState::Open,
            None => ConnectionState::Closed,
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| QuarryError::connection("failed to close sqlite connection", e))?;
        }
        Ok(())
    }

    fn execute(&mut self, query: &Query) -> Result<ResultSet> {
        let statement = self.render(query)?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span("sqlite", &statement.sql).entered();
        query_rows(self.connection()?, &statement)
    }

    fn execute_non_query(&mut self, query: &Query) -> Result<NonQueryResult> {
        let statement = self.render(query)?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span("sqlite", &statement.sql).entered();
        let conn = self.connection()?;
        let params = bind_params(&statement.params)?;
        let affected = conn
            .execute(&statement.sql, params_from_iter(params.iter()))
            .map_err(|e| QuarryError::execution(statement.sql.clone(), e))?;

        let is_insert = match statement.kind {
            QueryKind::Insert => true,
            QueryKind::Raw => statement
                .sql
                .trim_start()
                .get(..6)
                .is_some_and(|head| head.eq_ignore_ascii_case("INSERT")),
            _ => false,
        };
        Ok(NonQueryResult {
            rows_affected: affected as u64,
            last_insert_id: is_insert.then(|| conn.last_insert_rowid()),
        })
    }

    fn begin(&mut self, isolation: IsolationLevel) -> Result<()> {
        for sql in SqliteDialect.begin_transaction(isolation) {
            self.batch(&sql)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK")
    }

    fn max_relation_depth(&self) -> usize {
        self.max_relation_depth
    }

    fn default_isolation(&self) -> IsolationLevel {
        self.isolation
    }
}

/// Run a statement and buffer its rows. Column kinds come from the declared
/// types, read before the first step.
fn query_rows(conn: &Connection, statement: &Statement) -> Result<ResultSet> {
    let fail = |e: rusqlite::Error| QuarryError::execution(statement.sql.clone(), e);

    let mut stmt = conn.prepare(&statement.sql).map_err(fail)?;
    let columns: Vec<ColumnInfo> = stmt
        .columns()
        .iter()
        .map(|c| {
            let kind = c
                .decl_type()
                .map_or(ValueKind::Unknown, ValueKind::from_declared_type);
            ColumnInfo::new(c.name(), kind)
        })
        .collect();
    let kinds: Vec<ValueKind> = columns.iter().map(|c| c.kind).collect();
    let params = bind_params(&statement.params)?;

    let mut result = ResultSet::new(columns);
    let mut rows = stmt.query(params_from_iter(params.iter())).map_err(fail)?;
    while let Some(row) = rows.next().map_err(fail)? {
        let mut cells = Vec::with_capacity(kinds.len());
        for (index, kind) in kinds.iter().enumerate() {
            cells.push(read_cell(row.get_ref(index).map_err(fail)?, *kind)?);
        }
        result.add_row(cells)?;
    }
    Ok(result)
}

fn read_cell(cell: ValueRef<'_>, kind: ValueKind) -> Result<Value> {
    let value = match cell {
        ValueRef::Null => kind.null_value(),
        // NUMERIC affinity keeps integral values as integers; widening them
        // to f64 would lose precision above 2^53
        ValueRef::Integer(i) => match kind {
            ValueKind::Bool => Value::Bool(Some(i != 0)),
            _ => Value::BigInt(Some(i)),
        },
        ValueRef::Real(f) => Value::Double(Some(f)),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| QuarryError::Driver(format!("sqlite returned invalid utf-8: {e}")))?;
            Value::String(Some(Box::new(text.to_string())))
        }
        ValueRef::Blob(bytes) => Value::Bytes(Some(Box::new(bytes.to_vec()))),
    };
    Ok(value)
}

fn bind_params(params: &[Value]) -> Result<Vec<SqlValue>> {
    params.iter().map(bind_param).collect()
}

fn bind_param(value: &Value) -> Result<SqlValue> {
    if is_null(value) {
        return Ok(SqlValue::Null);
    }
    let bound = match value {
        Value::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
        Value::TinyInt(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::SmallInt(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::Int(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::BigInt(Some(v)) => SqlValue::Integer(*v),
        Value::TinyUnsigned(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::SmallUnsigned(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::Unsigned(Some(v)) => SqlValue::Integer(i64::from(*v)),
        Value::BigUnsigned(Some(v)) => SqlValue::Integer(i64::try_from(*v).map_err(|_| {
            QuarryError::QueryBuild(format!("{v} exceeds the SQLite integer range"))
        })?),
        Value::Float(Some(v)) => SqlValue::Real(f64::from(*v)),
        Value::Double(Some(v)) => SqlValue::Real(*v),
        Value::String(Some(s)) => SqlValue::Text(s.as_ref().clone()),
        Value::Char(Some(c)) => SqlValue::Text(c.to_string()),
        Value::Bytes(Some(b)) => SqlValue::Blob(b.as_ref().clone()),
        Value::Json(Some(j)) => SqlValue::Text(j.to_string()),
        Value::ChronoDate(Some(d)) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::ChronoTime(Some(t)) => SqlValue::Text(t.format("%H:%M:%S%.f").to_string()),
        Value::ChronoDateTime(Some(dt)) => SqlValue::Text(dt.format(TIMESTAMP_FORMAT).to_string()),
        Value::ChronoDateTimeUtc(Some(dt)) => {
            SqlValue::Text(dt.naive_utc().format(TIMESTAMP_FORMAT).to_string())
        }
        Value::ChronoDateTimeLocal(Some(dt)) => {
            SqlValue::Text(dt.naive_utc().format(TIMESTAMP_FORMAT).to_string())
        }
        Value::ChronoDateTimeWithTimeZone(Some(dt)) => {
            SqlValue::Text(dt.naive_utc().format(TIMESTAMP_FORMAT).to_string())
        }
        Value::Uuid(Some(u)) => SqlValue::Text(u.to_string()),
        other => {
            return Err(QuarryError::QueryBuild(format!(
                "sqlite cannot bind a {} parameter",
                ValueKind::of(other).name()
            )))
        }
    };
    Ok(bound)
}
