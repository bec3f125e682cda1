//! Procedural macros for Quarry
//!
//! This crate provides the `Entity` derive re-exported as `quarry::Entity`.

mod attributes;
mod macros;
mod utils;

use proc_macro::TokenStream;

/// Derive macro for `Entity` - generates cached metadata and typed member access
///
/// This macro generates:
/// - `metadata()` built once from the struct's declarations
/// - `read_columns()` assigning every column-bound field from a result row
/// - `resolve_relations()` issuing one nested select per relationship field
/// - `column_values()` for inserts, updates and deletes
///
/// Struct attributes: `#[table_name = "..."]`.
///
/// Field attributes: `#[column_name = "..."]`, `#[primary_key]`,
/// `#[auto_increment]`, `#[relation(local = "...", foreign = "...")]`,
/// `#[skip]` and `#[null_default = "expr"]`.
///
/// See `quarry-derive/tests/test_entity.rs` for usage examples.
#[proc_macro_derive(
    Entity,
    attributes(
        table_name,
        column_name,
        primary_key,
        auto_increment,
        relation,
        skip,
        null_default
    )
)]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    macros::derive_entity(input)
}
