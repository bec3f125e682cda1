//! Row-to-entity mapping against the scripted client

use chrono::{DateTime, NaiveDateTime};
use quarry::mock::{result_set, MockClient};
use quarry::{Backend, DbClient, Entity, QuarryError, Select};

use crate::common::{int, null_int, text, Event, Node, Person, Pet};

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[table_name = "owner"]
struct Owner {
    #[primary_key]
    id: i64,
    #[relation(local = "id", foreign = "owner_id")]
    dogs: Vec<Dog>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[table_name = "dog"]
struct Dog {
    #[primary_key]
    id: i64,
    owner_id: i64,
    #[relation(local = "owner_id", foreign = "id")]
    owner: Option<Owner>,
}

fn person_rows(pet_id: sea_query::Value) -> quarry::ResultSet {
    result_set(&["id", "name", "pet_id"], vec![vec![int(1), text("Ana"), pet_id]])
}

fn pet_rows(pets: &[(i64, i64, &str)]) -> quarry::ResultSet {
    result_set(
        &["id", "owner_id", "name"],
        pets.iter()
            .map(|(id, owner, name)| vec![int(*id), int(*owner), text(name)])
            .collect(),
    )
}

#[test]
fn test_list_relationship_keeps_result_order() {
    let mut client = MockClient::new(Backend::Postgres)
        .append_rows(person_rows(null_int()))
        .append_rows(pet_rows(&[(7, 1, "Rex"), (3, 1, "Mia")]));

    let people: Vec<Person> = client.select().unwrap();

    assert_eq!(people.len(), 1);
    let names: Vec<&str> = people[0].pets.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Rex", "Mia"]);
    assert_eq!(people[0].favourite, None);
    assert_eq!(
        client.executed_sql(),
        vec![
            r#"SELECT * FROM "person""#,
            r#"SELECT * FROM "pet" WHERE "owner_id" = $1"#,
        ]
    );
    assert_eq!(client.events()[1].params, vec![int(1)]);
}

#[test]
fn test_null_join_key_issues_no_query() {
    let mut client = MockClient::new(Backend::Sqlite)
        .append_rows(person_rows(null_int()))
        .append_rows(pet_rows(&[]));

    let people: Vec<Person> = client.select().unwrap();

    assert_eq!(people[0].favourite, None);
    assert!(people[0].pets.is_empty());
    // only the person select and the pets list were issued
    assert_eq!(client.executed_sql().len(), 2);
    assert_eq!(client.remaining(), 0);
}

#[test]
fn test_singular_relationship_takes_the_first_match() {
    let mut client = MockClient::new(Backend::Sqlite)
        .append_rows(person_rows(int(3)))
        .append_rows(pet_rows(&[]))
        .append_rows(pet_rows(&[(3, 9, "Mia")]));

    let ana = client
        .find_one(Select::<Person>::new().eq("name", "Ana"))
        .unwrap()
        .unwrap();

    assert!(ana.pets.is_empty());
    assert_eq!(ana.favourite.map(|p| p.name), Some("Mia".to_string()));
    assert_eq!(
        client.executed_sql(),
        vec![
            r#"SELECT * FROM "person" WHERE "name" = ? LIMIT ?"#,
            r#"SELECT * FROM "pet" WHERE "owner_id" = ?"#,
            r#"SELECT * FROM "pet" WHERE "id" = ? LIMIT ?"#,
        ]
    );
}

#[test]
fn test_singular_relationship_without_match_is_none() {
    let mut client = MockClient::new(Backend::Mysql)
        .append_rows(person_rows(int(42)))
        .append_rows(pet_rows(&[]))
        .append_rows(pet_rows(&[]));

    let people: Vec<Person> = client.select().unwrap();
    assert_eq!(people[0].favourite, None);
}

#[test]
fn test_null_temporal_column_maps_to_epoch() {
    let mut client = MockClient::new(Backend::Sqlite).append_rows(result_set(
        &["id", "title", "starts_at", "ends_at"],
        vec![vec![
            int(1),
            text("launch"),
            sea_query::Value::ChronoDateTime(None),
            sea_query::Value::ChronoDateTime(None),
        ]],
    ));

    let events: Vec<Event> = client.select().unwrap();

    let epoch: NaiveDateTime = DateTime::UNIX_EPOCH.naive_utc();
    assert_eq!(events[0].starts_at, epoch);
    assert_eq!(events[0].ends_at, None);
}

#[test]
fn test_text_temporal_column_is_parsed() {
    let mut client = MockClient::new(Backend::Sqlite).append_rows(result_set(
        &["id", "title", "starts_at", "ends_at"],
        vec![vec![
            int(1),
            text("launch"),
            text("2024-03-01 09:30:00"),
            text("2024-03-01T11:00:00"),
        ]],
    ));

    let events: Vec<Event> = client.select().unwrap();

    assert_eq!(events[0].starts_at.to_string(), "2024-03-01 09:30:00");
    assert_eq!(
        events[0].ends_at.map(|t| t.to_string()),
        Some("2024-03-01 11:00:00".to_string())
    );
}

#[test]
fn test_nesting_beyond_the_limit_is_a_mapping_error() {
    let node = |id: i64, parent: Option<i64>| {
        result_set(
            &["id", "parent_id"],
            vec![vec![int(id), sea_query::Value::BigInt(parent)]],
        )
    };
    let mut client = MockClient::new(Backend::Sqlite)
        .with_max_relation_depth(2)
        .append_rows(node(1, None))
        .append_rows(node(2, Some(1)))
        .append_rows(node(3, Some(2)))
        .append_rows(node(4, Some(3)));

    match client.select::<Node>() {
        Err(QuarryError::Mapping { entity, member, reason }) => {
            assert_eq!(entity, "Node");
            assert_eq!(member, "children");
            assert!(reason.contains("maximum depth of 2"), "{reason}");
        }
        other => panic!("expected a mapping error, got {other:?}"),
    }
    assert_eq!(client.executed_sql().len(), 3);
    assert_eq!(client.remaining(), 1);
}

#[test]
fn test_nesting_within_the_limit_maps_the_tree() {
    let mut client = MockClient::new(Backend::Sqlite)
        .append_rows(result_set(&["id", "parent_id"], vec![vec![int(1), null_int()]]))
        .append_rows(result_set(
            &["id", "parent_id"],
            vec![vec![int(2), int(1)], vec![int(3), int(1)]],
        ))
        .append_rows(result_set(&["id", "parent_id"], vec![]))
        .append_rows(result_set(&["id", "parent_id"], vec![]));

    let roots: Vec<Node> = client.select().unwrap();

    let children: Vec<i64> = roots[0].children.iter().map(|n| n.id).collect();
    assert_eq!(children, vec![2, 3]);
    // depth-first: node 2's children are loaded before node 3's
    assert_eq!(
        client.events().iter().map(|e| e.params.clone()).collect::<Vec<_>>(),
        vec![vec![], vec![int(1)], vec![int(2)], vec![int(3)]]
    );
}

#[test]
fn test_unconvertible_cell_is_a_mapping_error() {
    let mut client = MockClient::new(Backend::Sqlite)
        .append_rows(pet_rows(&[]))
        .append_rows(result_set(
            &["id", "owner_id", "name"],
            vec![vec![text("seven"), int(1), text("Rex")]],
        ));

    assert!(client.select::<Pet>().unwrap().is_empty());
    assert!(matches!(
        client.select::<Pet>(),
        Err(QuarryError::Mapping { member, .. }) if member == "id"
    ));
}

#[test]
fn test_execution_failure_during_resolution_propagates() {
    let mut client = MockClient::new(Backend::Sqlite)
        .append_rows(person_rows(null_int()))
        .append_error("relation \"pet\" does not exist");

    let err = client.select::<Person>().unwrap_err();
    assert!(matches!(err, QuarryError::QueryExecution { ref sql, .. } if sql.contains("\"pet\"")));
}

#[test]
fn test_relations_declared_both_ways_stop_at_the_limit() {
    let mut client = MockClient::new(Backend::Postgres)
        .with_max_relation_depth(2)
        .append_rows(result_set(&["id"], vec![vec![int(1)]]))
        .append_rows(result_set(&["id", "owner_id"], vec![vec![int(5), int(1)]]))
        .append_rows(result_set(&["id"], vec![vec![int(1)]]));

    match client.select::<Owner>() {
        Err(QuarryError::Mapping { entity, member, reason }) => {
            assert_eq!(entity, "Owner");
            assert_eq!(member, "dogs");
            assert!(reason.contains("maximum depth of 2"), "{reason}");
        }
        other => panic!("expected a mapping error, got {other:?}"),
    }
    assert_eq!(
        client.executed_sql(),
        vec![
            r#"SELECT * FROM "owner""#,
            r#"SELECT * FROM "dog" WHERE "owner_id" = $1"#,
            r#"SELECT * FROM "owner" WHERE "id" = $1 LIMIT $2"#,
        ]
    );
}
