//! Entity metadata
//!
//! An entity is a plain struct whose members bind to table columns or to
//! related entities. `#[derive(Entity)]` builds its [`EntityMetadata`] once per
//! type (cached in a `Lazy`) and generates the typed member access the mapper
//! needs, so no member inspection happens at mapping time.
//!
//! ```rust
//! use quarry::entity::{Cardinality, MemberBinding};
//! use quarry::Entity;
//!
//! #[derive(Debug, Default, Entity)]
//! struct Pet {
//!     #[primary_key]
//!     #[auto_increment]
//!     id: i64,
//!     owner_id: i64,
//!     name: String,
//! }
//!
//! #[derive(Debug, Default, Entity)]
//! #[table_name = "people"]
//! struct Person {
//!     #[primary_key]
//!     id: i64,
//!     #[column_name = "full_name"]
//!     name: String,
//!     #[relation(local = "id", foreign = "owner_id")]
//!     pets: Vec<Pet>,
//!     #[skip]
//!     cached_label: String,
//! }
//!
//! let meta = Person::metadata();
//! assert_eq!(meta.table(), "people");
//! assert_eq!(meta.column_for("name"), Some("full_name"));
//! assert!(matches!(
//!     meta.member("pets").map(|m| &m.binding),
//!     Some(MemberBinding::Relationship { cardinality: Cardinality::List, .. })
//! ));
//! ```

mod relation;

pub use relation::{Cardinality, RelationContainer};

use sea_query::Value;

use crate::client::DbClient;
use crate::error::Result;
use crate::mapper::RelationLoader;
use crate::result::ResultRow;

/// A mappable data object
///
/// Implemented by `#[derive(Entity)]`; hand-written implementations should
/// route member access through [`crate::mapper::read_column`] and
/// [`crate::mapper::resolve_relation`].
pub trait Entity: Default + Sized {
    /// Per-type mapping, built once.
    fn metadata() -> &'static EntityMetadata;

    /// Assign every column-bound member from `row`.
    fn read_columns(&mut self, row: &ResultRow) -> Result<()>;

    /// Populate every relationship-bound member, issuing nested selects
    /// through `loader`.
    fn resolve_relations<C: DbClient + ?Sized>(
        &mut self,
        row: &ResultRow,
        loader: &mut RelationLoader<'_, C>,
    ) -> Result<()>;

    /// Current value of every column-bound member, in declaration order.
    fn column_values(&self) -> Vec<(&'static str, Value)>;
}

/// How one member of an entity is populated
#[derive(Debug, Clone, Copy)]
pub enum MemberBinding {
    /// Read from a result column
    Column {
        column: &'static str,
        primary_key: bool,
        auto_increment: bool,
    },
    /// Resolved by a nested select on the related entity's table
    Relationship {
        /// Column of this entity holding the join key
        local_column: &'static str,
        /// Column of the related table matched against the join key
        foreign_column: &'static str,
        cardinality: Cardinality,
        related: fn() -> &'static EntityMetadata,
    },
    /// Left at its default value
    Unbound,
}

#[derive(Debug, Clone, Copy)]
pub struct MemberMeta {
    pub member: &'static str,
    pub binding: MemberBinding,
}

/// Static mapping between an entity type and its table
#[derive(Debug)]
pub struct EntityMetadata {
    type_name: &'static str,
    table: &'static str,
    members: Vec<MemberMeta>,
}

impl EntityMetadata {
    pub fn builder(type_name: &'static str, table: &'static str) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            meta: EntityMetadata {
                type_name,
                table,
                members: Vec::new(),
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn members(&self) -> &[MemberMeta] {
        &self.members
    }

    pub fn member(&self, member: &str) -> Option<&MemberMeta> {
        self.members.iter().find(|m| m.member == member)
    }

    /// Column bound to `member`, if it is column-bound.
    pub fn column_for(&self, member: &str) -> Option<&'static str> {
        match self.member(member)?.binding {
            MemberBinding::Column { column, .. } => Some(column),
            _ => None,
        }
    }

    /// Column names of every column-bound member.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().filter_map(|m| match m.binding {
            MemberBinding::Column { column, .. } => Some(column),
            _ => None,
        })
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.members.iter().filter_map(|m| match m.binding {
            MemberBinding::Column {
                column,
                primary_key: true,
                ..
            } => Some(column),
            _ => None,
        })
    }

    pub fn is_auto_increment(&self, column: &str) -> bool {
        self.members.iter().any(|m| {
            matches!(
                m.binding,
                MemberBinding::Column { column: c, auto_increment: true, .. } if c == column
            )
        })
    }

    /// The first auto-increment column, used as the insert identity.
    pub fn identity_column(&self) -> Option<&'static str> {
        self.members.iter().find_map(|m| match m.binding {
            MemberBinding::Column {
                column,
                auto_increment: true,
                ..
            } => Some(column),
            _ => None,
        })
    }

    pub fn relationships(&self) -> impl Iterator<Item = &MemberMeta> + '_ {
        self.members
            .iter()
            .filter(|m| matches!(m.binding, MemberBinding::Relationship { .. }))
    }
}

/// Builder used by generated code.
#[derive(Debug)]
pub struct EntityMetadataBuilder {
    meta: EntityMetadata,
}

impl EntityMetadataBuilder {
    pub fn column(
        mut self,
        member: &'static str,
        column: &'static str,
        primary_key: bool,
        auto_increment: bool,
    ) -> Self {
        self.meta.members.push(MemberMeta {
            member,
            binding: MemberBinding::Column {
                column,
                primary_key,
                auto_increment,
            },
        });
        self
    }

    pub fn relationship(
        mut self,
        member: &'static str,
        local_column: &'static str,
        foreign_column: &'static str,
        cardinality: Cardinality,
        related: fn() -> &'static EntityMetadata,
    ) -> Self {
        self.meta.members.push(MemberMeta {
            member,
            binding: MemberBinding::Relationship {
                local_column,
                foreign_column,
                cardinality,
                related,
            },
        });
        self
    }

    pub fn unbound(mut self, member: &'static str) -> Self {
        self.meta.members.push(MemberMeta {
            member,
            binding: MemberBinding::Unbound,
        });
        self
    }

    pub fn build(self) -> EntityMetadata {
        self.meta
    }
}
