//! Scripted in-memory client for tests
//!
//! [`MockClient`] renders every query with a real dialect, records the SQL it
//! would have sent and answers from a FIFO of scripted results. Transaction
//! control statements are recorded too, so tests can assert the exact sequence
//! a call produced.
//!
//! ```rust
//! use quarry::mock::{result_set, MockClient};
//! use quarry::{Backend, DbClient, Query};
//! use sea_query::Value;
//!
//! let mut client = MockClient::new(Backend::Postgres)
//!     .append_rows(result_set(&["n"], vec![vec![Value::BigInt(Some(3))]]));
//! let n: i64 = client.execute_scalar_as(&Query::raw("SELECT count(*) AS n FROM pet")).unwrap();
//! assert_eq!(n, 3);
//! assert_eq!(client.executed_sql(), vec!["SELECT count(*) AS n FROM pet"]);
//! ```

use std::collections::VecDeque;

use sea_query::Value;

use crate::client::{ConnectionState, DbClient, NonQueryResult};
use crate::config::Backend;
use crate::error::{QuarryError, Result};
use crate::query::{Query, SqlDialect};
use crate::result::{ColumnInfo, ResultSet};
use crate::transaction::IsolationLevel;
use crate::value::{is_null, ValueKind};

/// Error reported for a scripted failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// One scripted answer
#[derive(Debug, Clone)]
pub enum MockResult {
    Rows(ResultSet),
    NonQuery(NonQueryResult),
    Error(String),
}

/// A statement the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct MockEvent {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug)]
pub struct MockClient {
    backend: Backend,
    state: ConnectionState,
    results: VecDeque<MockResult>,
    events: Vec<MockEvent>,
    fail_commit: bool,
    fail_rollback: bool,
    max_relation_depth: Option<usize>,
    isolation: IsolationLevel,
}

impl MockClient {
    /// An open mock rendering with `backend`'s dialect.
    pub fn new(backend: Backend) -> Self {
        MockClient {
            backend,
            state: ConnectionState::Open,
            results: VecDeque::new(),
            events: Vec::new(),
            fail_commit: false,
            fail_rollback: false,
            max_relation_depth: None,
            isolation: IsolationLevel::Unspecified,
        }
    }

    pub fn append_rows(mut self, rows: ResultSet) -> Self {
        self.results.push_back(MockResult::Rows(rows));
        self
    }

    pub fn append_non_query(mut self, rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        self.results.push_back(MockResult::NonQuery(NonQueryResult {
            rows_affected,
            last_insert_id,
        }));
        self
    }

    pub fn append_error(mut self, message: impl Into<String>) -> Self {
        self.results.push_back(MockResult::Error(message.into()));
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn with_max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = Some(depth);
        self
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn events(&self) -> &[MockEvent] {
        &self.events
    }

    /// SQL of every received statement, in order.
    pub fn executed_sql(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.sql.as_str()).collect()
    }

    /// Scripted results not consumed yet.
    pub fn remaining(&self) -> usize {
        self.results.len()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            ConnectionState::Open => Ok(()),
            ConnectionState::Closed => Err(QuarryError::NotConnected),
        }
    }

    fn record(&mut self, sql: impl Into<String>, params: Vec<Value>) {
        let sql = sql.into();
        log::debug!("mock: {sql}");
        self.events.push(MockEvent { sql, params });
    }

    fn receive(&mut self, query: &Query) -> Result<(String, MockResult)> {
        self.ensure_open()?;
        let statement = self.backend.dialect().render(query)?;
        self.record(statement.sql.clone(), statement.params);
        let result = self.results.pop_front().ok_or_else(|| {
            QuarryError::Driver(format!("mock has no scripted result for `{}`", statement.sql))
        })?;
        Ok((statement.sql, result))
    }

    fn control(&mut self, sql: &str, fail: bool) -> Result<()> {
        self.ensure_open()?;
        self.record(sql, Vec::new());
        if fail {
            return Err(QuarryError::execution(sql, MockError(format!("{sql} failed"))));
        }
        Ok(())
    }
}

impl DbClient for MockClient {
    fn dialect(&self) -> &dyn SqlDialect {
        self.backend.dialect()
    }

    fn open(&mut self) -> Result<()> {
        self.state = ConnectionState::Open;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn close(&mut self) -> Result<()> {
        self.state = ConnectionState::Closed;
        Ok(())
    }

    fn execute(&mut self, query: &Query) -> Result<ResultSet> {
        match self.receive(query)? {
            (_, MockResult::Rows(rows)) => Ok(rows),
            (_, MockResult::NonQuery(result)) => Ok(ResultSet::empty().with_rows_affected(result.rows_affected)),
            (sql, MockResult::Error(message)) => Err(QuarryError::execution(sql, MockError(message))),
        }
    }

    fn execute_non_query(&mut self, query: &Query) -> Result<NonQueryResult> {
        match self.receive(query)? {
            (_, MockResult::NonQuery(result)) => Ok(result),
            (_, MockResult::Rows(rows)) => Ok(NonQueryResult {
                rows_affected: rows.row_count() as u64,
                last_insert_id: None,
            }),
            (sql, MockResult::Error(message)) => Err(QuarryError::execution(sql, MockError(message))),
        }
    }

    fn begin(&mut self, isolation: IsolationLevel) -> Result<()> {
        for sql in self.backend.dialect().begin_transaction(isolation) {
            self.control(&sql, false)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.control("COMMIT", self.fail_commit)
    }

    fn rollback(&mut self) -> Result<()> {
        self.control("ROLLBACK", self.fail_rollback)
    }

    fn max_relation_depth(&self) -> usize {
        self.max_relation_depth
            .unwrap_or(crate::mapper::DEFAULT_MAX_RELATION_DEPTH)
    }

    fn default_isolation(&self) -> IsolationLevel {
        self.isolation
    }
}

/// Build a result from column names and rows. Column kinds are taken from the
/// first non-NULL cell of each column.
pub fn result_set(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultSet {
    let infos = columns
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let kind = rows
                .iter()
                .filter_map(|row| row.get(index))
                .find(|value| !is_null(value))
                .map_or(ValueKind::Unknown, ValueKind::of);
            ColumnInfo::new(*name, kind)
        })
        .collect();
    let mut set = ResultSet::new(infos);
    for row in rows {
        // arity mismatches are programmer errors in test scripts
        if let Err(err) = set.add_row(row) {
            panic!("invalid scripted row: {err}");
        }
    }
    set
}
