//! Tracing span helpers
//!
//! With the `tracing` feature enabled, execution, transaction and mapping
//! paths open spans from [`tracing_helpers`]. Without it the module is absent
//! and call sites compile away behind `#[cfg(feature = "tracing")]`.

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{span, Level, Span};

    /// Span around one statement round trip.
    pub fn execute_query_span(backend: &'static str, sql: &str) -> Span {
        span!(Level::DEBUG, "quarry.execute", db.system = backend, db.statement = sql)
    }

    pub fn begin_transaction_span(backend: &'static str, isolation: &str) -> Span {
        span!(Level::DEBUG, "quarry.transaction.begin", db.system = backend, isolation = isolation)
    }

    pub fn commit_transaction_span(backend: &'static str) -> Span {
        span!(Level::DEBUG, "quarry.transaction.commit", db.system = backend)
    }

    pub fn rollback_transaction_span(backend: &'static str) -> Span {
        span!(Level::DEBUG, "quarry.transaction.rollback", db.system = backend)
    }

    /// Span around mapping the rows of one result into entities.
    pub fn map_entity_span(entity: &'static str, rows: usize, depth: usize) -> Span {
        span!(Level::TRACE, "quarry.map", entity = entity, rows = rows, depth = depth)
    }
}
