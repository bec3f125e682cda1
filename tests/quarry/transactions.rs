//! Transaction semantics against SQLite and the scripted client

use quarry::mock::MockClient;
use quarry::{Backend, DatabaseConfig, DbClient, IsolationLevel, QuarryError, Query, SqliteClient};

fn ledger() -> SqliteClient {
    let mut client = SqliteClient::in_memory().unwrap();
    client
        .execute_non_query_sql("CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER NOT NULL)")
        .unwrap();
    client
}

fn entry(id: i64, amount: Option<i64>) -> Query {
    Query::insert("ledger").value("id", id).value("amount", amount)
}

fn count(client: &mut SqliteClient) -> i64 {
    client
        .execute_scalar_as(&Query::raw("SELECT COUNT(*) FROM ledger"))
        .unwrap()
}

#[test]
fn test_all_statements_commit_together() {
    let mut client = ledger();
    let results = client
        .execute_transaction(
            IsolationLevel::Serializable,
            &[entry(1, Some(10)), entry(2, Some(-4)), entry(3, Some(7))],
        )
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.rows_affected == 1));
    assert_eq!(count(&mut client), 3);
}

#[test]
fn test_failing_statement_rolls_back_earlier_ones() {
    let mut client = ledger();
    // the second insert violates NOT NULL
    let err = client
        .execute_transaction(
            IsolationLevel::Unspecified,
            &[entry(1, Some(10)), entry(2, None), entry(3, Some(7))],
        )
        .unwrap_err();

    match &err {
        QuarryError::Transaction {
            statement,
            rolled_back,
            source,
        } => {
            assert_eq!(*statement, Some(1));
            assert!(*rolled_back);
            assert!(matches!(**source, QuarryError::QueryExecution { .. }));
        }
        other => panic!("expected a transaction error, got {other:?}"),
    }
    assert_eq!(err.failed_statement(), Some(1));
    assert_eq!(count(&mut client), 0);
}

#[test]
fn test_invalid_statement_fails_before_begin() {
    let mut client = MockClient::new(Backend::Postgres);
    let err = client
        .execute_transaction(
            IsolationLevel::ReadCommitted,
            &[entry(1, Some(1)), Query::delete("ledger")],
        )
        .unwrap_err();

    assert!(matches!(
        err,
        QuarryError::Transaction { statement: Some(1), rolled_back: false, .. }
    ));
    assert!(client.events().is_empty());
}

#[test]
fn test_statement_order_is_begin_statements_commit() {
    let mut client = MockClient::new(Backend::Postgres)
        .append_non_query(1, None)
        .append_non_query(2, None);

    client
        .execute_transaction(
            IsolationLevel::RepeatableRead,
            &[
                entry(1, Some(5)),
                Query::update("ledger").set("amount", 0).filter("id", quarry::CompareOp::Lt, 3),
            ],
        )
        .unwrap();

    assert_eq!(
        client.executed_sql(),
        vec![
            "BEGIN ISOLATION LEVEL REPEATABLE READ",
            r#"INSERT INTO "ledger" ("id", "amount") VALUES ($1, $2)"#,
            r#"UPDATE "ledger" SET "amount" = $1 WHERE "id" < $2"#,
            "COMMIT",
        ]
    );
}

#[test]
fn test_scripted_failure_rolls_back() {
    let mut client = MockClient::new(Backend::Sqlite)
        .append_non_query(1, None)
        .append_error("disk I/O error");

    let err = client
        .execute_transaction(IsolationLevel::Unspecified, &[entry(1, Some(1)), entry(2, Some(2))])
        .unwrap_err();

    assert_eq!(err.failed_statement(), Some(1));
    assert_eq!(client.executed_sql().last(), Some(&"ROLLBACK"));
}

#[test]
fn test_failed_commit_reports_no_statement() {
    let mut client = MockClient::new(Backend::Sqlite)
        .append_non_query(1, None)
        .failing_commit();

    let err = client
        .execute_transaction(IsolationLevel::Unspecified, &[entry(1, Some(1))])
        .unwrap_err();

    assert!(matches!(
        err,
        QuarryError::Transaction { statement: None, rolled_back: true, .. }
    ));
    assert_eq!(
        client.executed_sql(),
        vec!["BEGIN DEFERRED", r#"INSERT INTO "ledger" ("id", "amount") VALUES (?, ?)"#, "COMMIT", "ROLLBACK"]
    );
}

#[test]
fn test_default_transaction_uses_the_configured_isolation() {
    let mut client = MockClient::new(Backend::Postgres)
        .with_isolation(IsolationLevel::Serializable)
        .append_non_query(1, None);

    client.execute_transaction_default(&[entry(1, Some(5))]).unwrap();

    assert_eq!(client.executed_sql()[0], "BEGIN ISOLATION LEVEL SERIALIZABLE");
}

#[test]
fn test_sqlite_client_takes_isolation_from_config() {
    let config = DatabaseConfig {
        isolation: IsolationLevel::Serializable,
        ..Default::default()
    };
    let mut client = SqliteClient::from_config(&config).unwrap();
    assert_eq!(client.default_isolation(), IsolationLevel::Serializable);

    client
        .execute_non_query_sql("CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER NOT NULL)")
        .unwrap();
    let results = client
        .execute_transaction_default(&[entry(1, Some(3)), entry(2, Some(4))])
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(count(&mut client), 2);
}
