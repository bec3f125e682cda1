//! Rendering and scalar behaviour across dialects

use quarry::mock::{result_set, MockClient};
use quarry::{
    Backend, CompareOp, DbClient, MySqlDialect, PostgresDialect, QuarryError, Query, SortOrder,
    SqlDialect, SqliteDialect,
};

use crate::common::{int, text};

fn sample() -> Query {
    Query::select("person")
        .columns(["id", "name"])
        .filter("age", CompareOp::Gte, 18)
        .is_in("city", ["Lisbon", "Porto"])
        .filter("nickname", CompareOp::Eq, Option::<String>::None)
        .order_by("name", SortOrder::Asc)
        .limit(10)
}

#[test]
fn test_rendering_is_deterministic() {
    let dialects: [&dyn SqlDialect; 3] = [&PostgresDialect, &MySqlDialect, &SqliteDialect];
    for dialect in dialects {
        let first = dialect.render(&sample()).unwrap();
        let second = dialect.render(&sample()).unwrap();
        assert_eq!(first.sql, second.sql, "{}", dialect.name());
        assert_eq!(first.params, second.params, "{}", dialect.name());
    }
}

#[test]
fn test_postgres_select_rendering() {
    let statement = PostgresDialect.render(&sample()).unwrap();
    assert_eq!(
        statement.sql,
        r#"SELECT "id", "name" FROM "person" WHERE "age" >= $1 AND "city" IN ($2, $3) AND "nickname" IS NULL ORDER BY "name" ASC LIMIT $4"#
    );
    assert_eq!(statement.params.len(), 4);
}

#[test]
fn test_mysql_uses_backticks() {
    let statement = MySqlDialect
        .render(&Query::delete("person").eq("id", 5))
        .unwrap();
    assert_eq!(statement.sql, "DELETE FROM `person` WHERE `id` = ?");
}

#[test]
fn test_raw_named_parameters_follow_the_dialect() {
    let query = Query::raw("SELECT * FROM pet WHERE owner_id = :owner AND name <> :name")
        .bind("owner", 3)
        .bind(":name", "Rex");

    let pg = PostgresDialect.render(&query).unwrap();
    assert_eq!(pg.sql, "SELECT * FROM pet WHERE owner_id = $1 AND name <> $2");
    let lite = SqliteDialect.render(&query).unwrap();
    assert_eq!(lite.sql, "SELECT * FROM pet WHERE owner_id = ? AND name <> ?");
    assert_eq!(lite.params, pg.params);
}

#[test]
fn test_unbound_raw_parameter_is_a_build_error() {
    let query = Query::raw("SELECT * FROM pet WHERE owner_id = :owner");
    assert!(matches!(
        SqliteDialect.render(&query),
        Err(QuarryError::QueryBuild(_))
    ));
}

#[test]
fn test_update_without_predicates_requires_opt_in() {
    let query = Query::update("person").set("active", false);
    assert!(matches!(
        PostgresDialect.render(&query),
        Err(QuarryError::QueryBuild(_))
    ));
    let statement = PostgresDialect.render(&query.unconditional()).unwrap();
    assert_eq!(statement.sql, r#"UPDATE "person" SET "active" = $1"#);
}

#[test]
fn test_scalar_on_zero_rows_is_a_cardinality_error() {
    let mut client =
        MockClient::new(Backend::Postgres).append_rows(result_set(&["count"], vec![]));

    match client.execute_scalar_sql("SELECT count(*) FROM pet WHERE 1 = 0") {
        Err(QuarryError::Cardinality { rows, columns, .. }) => {
            assert_eq!(rows, 0);
            assert_eq!(columns, 1);
        }
        other => panic!("expected a cardinality error, got {other:?}"),
    }
}

#[test]
fn test_scalar_on_several_columns_is_a_cardinality_error() {
    let mut client = MockClient::new(Backend::Postgres)
        .append_rows(result_set(&["id", "name"], vec![vec![int(1), text("Ana")]]));

    assert!(matches!(
        client.execute_scalar_sql("SELECT id, name FROM person"),
        Err(QuarryError::Cardinality { rows: 1, columns: 2, .. })
    ));
}

#[test]
fn test_scalar_returns_the_single_cell() {
    let mut client =
        MockClient::new(Backend::Mysql).append_rows(result_set(&["name"], vec![vec![text("Ana")]]));

    let name: String = client
        .execute_scalar_as(&Query::raw("SELECT name FROM person WHERE id = :id").bind("id", 1))
        .unwrap();
    assert_eq!(name, "Ana");
    assert_eq!(client.executed_sql(), vec!["SELECT name FROM person WHERE id = ?"]);
}
