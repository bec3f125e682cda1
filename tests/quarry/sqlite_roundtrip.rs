//! Insert/select round trips against an in-memory SQLite database

use fake::{Fake, Faker};
use quarry::{CompareOp, DbClient, Entity, QuarryError, Select, SortOrder, SqliteClient};

use crate::common::{Event, Member, Person, Pet};

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[table_name = "invoice"]
struct Invoice {
    #[primary_key]
    #[auto_increment]
    id: i64,
    amount: i64,
    rate: f64,
}

fn client_with_schema() -> SqliteClient {
    let mut client = SqliteClient::in_memory().unwrap();
    for ddl in [
        "CREATE TABLE member (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT NOT NULL, age INTEGER, active BOOLEAN NOT NULL)",
        "CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL, pet_id INTEGER)",
        "CREATE TABLE pet (id INTEGER PRIMARY KEY, owner_id INTEGER NOT NULL, name TEXT NOT NULL)",
        "CREATE TABLE event (id INTEGER PRIMARY KEY, title TEXT NOT NULL, starts_at TIMESTAMP, ends_at TIMESTAMP)",
    ] {
        client.execute_non_query_sql(ddl).unwrap();
    }
    client
}

#[test]
fn test_inserted_entities_read_back_equal() {
    let mut client = client_with_schema();
    let mut expected = Vec::new();
    for _ in 0..5 {
        let mut member: Member = Faker.fake();
        let result = client.insert(&member).unwrap();
        assert_eq!(result.rows_affected, 1);
        member.id = result.last_insert_id.unwrap();
        expected.push(member);
    }

    let members: Vec<Member> = client
        .find(Select::new().order_by("id", SortOrder::Asc))
        .unwrap();
    assert_eq!(members, expected);
}

#[test]
fn test_find_by_id_update_and_delete() {
    let mut client = client_with_schema();
    let member: Member = Faker.fake();
    let id = client.insert(&member).unwrap().last_insert_id.unwrap();

    let mut stored: Member = client.find_by_id(id).unwrap().unwrap();
    assert_eq!(stored.name, member.name);

    let result = client
        .update(&mut stored, |m| {
            m.age = None;
            m.active = !m.active;
        })
        .unwrap();
    assert_eq!(result.rows_affected, 1);
    assert_eq!(stored.age, None);

    let reloaded: Member = client.find_by_id(id).unwrap().unwrap();
    assert_eq!(reloaded, stored);

    client.delete(&stored).unwrap();
    assert_eq!(client.find_by_id::<Member>(id).unwrap(), None);
}

#[test]
fn test_relationships_resolve_from_sqlite() {
    let mut client = client_with_schema();
    client
        .execute_non_query_sql("INSERT INTO person (id, name, pet_id) VALUES (1, 'Ana', 11), (2, 'Rui', NULL)")
        .unwrap();
    client
        .execute_non_query_sql("INSERT INTO pet (id, owner_id, name) VALUES (10, 1, 'Rex'), (11, 1, 'Mia'), (12, 2, 'Bo')")
        .unwrap();

    let people: Vec<Person> = client
        .find(Select::new().order_by("id", SortOrder::Asc))
        .unwrap();

    assert_eq!(people.len(), 2);
    assert_eq!(
        people[0].pets.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["Rex", "Mia"]
    );
    assert_eq!(people[0].favourite.as_ref().map(|p| p.id), Some(11));
    assert_eq!(people[1].pets, vec![Pet { id: 12, owner_id: 2, name: "Bo".into() }]);
    assert_eq!(people[1].favourite, None);
}

#[test]
fn test_filters_against_sqlite() {
    let mut client = client_with_schema();
    client
        .execute_non_query_sql(
            "INSERT INTO pet (id, owner_id, name) VALUES (1, 1, 'Rex'), (2, 1, 'Remy'), (3, 2, 'Mia')",
        )
        .unwrap();

    let r_names: Vec<Pet> = client
        .find(
            Select::new()
                .filter("name", CompareOp::Like, "Re%")
                .order_by("name", SortOrder::Desc),
        )
        .unwrap();
    assert_eq!(
        r_names.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["Rex", "Remy"]
    );

    let some: Vec<Pet> = client.find(Select::new().is_in("id", [1, 3])).unwrap();
    assert_eq!(some.len(), 2);
    let page: Vec<Pet> = client
        .find(Select::new().order_by("id", SortOrder::Asc).limit(1).offset(1))
        .unwrap();
    assert_eq!(page[0].id, 2);
}

#[test]
fn test_temporal_columns_round_trip_as_text() {
    let mut client = client_with_schema();
    let starts_at = chrono::DateTime::from_timestamp((0..2_000_000_000i64).fake::<i64>(), 0)
        .unwrap()
        .naive_utc();
    let event = Event {
        id: 1,
        title: "launch".into(),
        starts_at,
        ends_at: None,
    };
    client.insert(&event).unwrap();

    let stored: Event = client.find_by_id(1).unwrap().unwrap();
    assert_eq!(stored, event);

    client
        .execute_non_query_sql("UPDATE event SET starts_at = NULL")
        .unwrap();
    let cleared: Event = client.find_by_id(1).unwrap().unwrap();
    assert_eq!(cleared.starts_at, chrono::DateTime::UNIX_EPOCH.naive_utc());
}

#[test]
fn test_introspection_lists_tables_and_columns() {
    let mut client = client_with_schema();

    let mut tables = client.get_table_names().unwrap();
    tables.sort();
    assert_eq!(tables, vec!["event", "member", "person", "pet"]);

    let schema = client.get_table_schema("member").unwrap();
    let id = schema.column("id").unwrap();
    assert!(id.primary_key);
    assert!(id.auto_increment);
    assert!(schema.column("age").unwrap().nullable);
    assert!(!schema.column("name").unwrap().nullable);

    assert!(matches!(
        client.get_table_schema("missing"),
        Err(QuarryError::Introspection { .. })
    ));
}

#[test]
fn test_closed_client_reports_not_connected() {
    let mut client = client_with_schema();
    client.close().unwrap();
    assert!(matches!(
        client.select::<Pet>(),
        Err(QuarryError::NotConnected)
    ));
}

#[test]
fn test_integral_decimal_column_round_trips_exactly() {
    let mut client = client_with_schema();
    client
        .execute_non_query_sql("CREATE TABLE invoice (id INTEGER PRIMARY KEY, amount DECIMAL(20,0) NOT NULL, rate NUMERIC NOT NULL)")
        .unwrap();
    let invoice = Invoice {
        id: 0,
        amount: 9_007_199_254_740_993,
        rate: 0.25,
    };
    let id = client.insert(&invoice).unwrap().last_insert_id.unwrap();

    let stored: Invoice = client.find_by_id(id).unwrap().unwrap();
    assert_eq!(stored, Invoice { id, ..invoice });
}
