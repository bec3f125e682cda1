//! Vendor drivers implementing [`DbClient`](crate::DbClient).

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;
