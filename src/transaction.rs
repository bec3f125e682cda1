//! Transactions
//!
//! [`run`] executes a batch of statements inside one transaction on a single
//! client. Every query is rendered before `BEGIN`, so a malformed batch never
//! opens a transaction. The first failing statement aborts the batch: the
//! transaction is rolled back and the caller receives that statement's error
//! together with its index and whether the rollback succeeded.

use serde::Deserialize;

use crate::client::{DbClient, NonQueryResult};
use crate::error::{QuarryError, Result};
use crate::query::Query;

#[cfg(feature = "tracing")]
use crate::telemetry::tracing_helpers;

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Backend default; no isolation clause is sent
    #[default]
    Unspecified,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling of the level, `None` for [`IsolationLevel::Unspecified`].
    pub fn to_sql(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::Unspecified => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

/// Execute `queries` sequentially inside one transaction.
///
/// Returns one [`NonQueryResult`] per query on commit. On failure the
/// transaction is rolled back before returning
/// [`QuarryError::Transaction`].
pub fn run<C: DbClient + ?Sized>(
    client: &mut C,
    isolation: IsolationLevel,
    queries: &[Query],
) -> Result<Vec<NonQueryResult>> {
    for (index, query) in queries.iter().enumerate() {
        client.dialect().render(query).map_err(|e| QuarryError::Transaction {
            statement: Some(index),
            rolled_back: false,
            source: Box::new(e),
        })?;
    }

    {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::begin_transaction_span(
            client.dialect().name(),
            isolation.to_sql().unwrap_or("default"),
        )
        .entered();
        client.begin(isolation)?;
    }

    let mut results = Vec::with_capacity(queries.len());
    for (index, query) in queries.iter().enumerate() {
        match client.execute_non_query(query) {
            Ok(result) => results.push(result),
            Err(err) => {
                log::debug!("transaction statement {index} failed, rolling back: {err}");
                let rolled_back = rollback(client);
                return Err(QuarryError::Transaction {
                    statement: Some(index),
                    rolled_back,
                    source: Box::new(err),
                });
            }
        }
    }

    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::commit_transaction_span(client.dialect().name()).entered();
    if let Err(err) = client.commit() {
        let rolled_back = rollback(client);
        return Err(QuarryError::Transaction {
            statement: None,
            rolled_back,
            source: Box::new(err),
        });
    }
    Ok(results)
}

fn rollback<C: DbClient + ?Sized>(client: &mut C) -> bool {
    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::rollback_transaction_span(client.dialect().name()).entered();
    match client.rollback() {
        Ok(()) => true,
        Err(err) => {
            log::error!("rollback failed: {err}");
            false
        }
    }
}
