//! Shared entities and helpers

use chrono::NaiveDateTime;
use fake::Dummy;
use quarry::Entity;
use sea_query::Value;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[table_name = "pet"]
pub struct Pet {
    #[primary_key]
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[table_name = "person"]
pub struct Person {
    #[primary_key]
    pub id: i64,
    pub name: String,
    pub pet_id: Option<i64>,
    #[relation(local = "id", foreign = "owner_id")]
    pub pets: Vec<Pet>,
    #[relation(local = "pet_id", foreign = "id")]
    pub favourite: Option<Pet>,
}

/// Self-referencing tree used to exercise the nesting limit
#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[table_name = "node"]
pub struct Node {
    #[primary_key]
    pub id: i64,
    pub parent_id: Option<i64>,
    #[relation(local = "id", foreign = "parent_id")]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[table_name = "event"]
pub struct Event {
    #[primary_key]
    pub id: i64,
    pub title: String,
    pub starts_at: NaiveDateTime,
    pub ends_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity, Dummy)]
#[table_name = "member"]
pub struct Member {
    #[primary_key]
    #[auto_increment]
    #[dummy(expr = "0")]
    pub id: i64,
    #[dummy(faker = "fake::faker::name::en::Name()")]
    pub name: String,
    #[dummy(faker = "fake::faker::internet::en::SafeEmail()")]
    pub email: String,
    #[dummy(faker = "18..90")]
    pub age: Option<i64>,
    pub active: bool,
}

pub fn int(v: i64) -> Value {
    Value::BigInt(Some(v))
}

pub fn text(v: &str) -> Value {
    Value::String(Some(Box::new(v.to_string())))
}

pub fn null_int() -> Value {
    Value::BigInt(None)
}
