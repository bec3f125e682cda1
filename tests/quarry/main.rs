//! Integration tests for the quarry ORM core
//!
//! Mapping scenarios run against the scripted mock client; round trips and
//! transactions run against an in-memory SQLite database.

mod common;
mod mapping;
mod queries;
mod sqlite_roundtrip;
mod transactions;
