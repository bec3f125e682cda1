//! Relationship containers and their cardinality.

use crate::entity::Entity;

/// Shape a relationship resolves into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Zero or one related entity (`Option<T>`)
    Singular,
    /// Any number of related entities (`Vec<T>`)
    List,
    /// Any number of related entities in a fixed-size slice (`Box<[T]>`)
    Array,
}

/// Member types a relationship can populate.
///
/// No related rows yield `None` for [`Cardinality::Singular`] and an empty
/// container otherwise.
pub trait RelationContainer: Default {
    type Item: Entity;
    const CARDINALITY: Cardinality;

    /// Build the member from mapped rows, in result order.
    fn from_related(items: Vec<Self::Item>) -> Self;
}

impl<T: Entity> RelationContainer for Option<T> {
    type Item = T;
    const CARDINALITY: Cardinality = Cardinality::Singular;

    fn from_related(items: Vec<T>) -> Self {
        items.into_iter().next()
    }
}

impl<T: Entity> RelationContainer for Vec<T> {
    type Item = T;
    const CARDINALITY: Cardinality = Cardinality::List;

    fn from_related(items: Vec<T>) -> Self {
        items
    }
}

impl<T: Entity> RelationContainer for Box<[T]> {
    type Item = T;
    const CARDINALITY: Cardinality = Cardinality::Array;

    fn from_related(items: Vec<T>) -> Self {
        items.into_boxed_slice()
    }
}
