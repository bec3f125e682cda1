//! Result-to-entity mapping
//!
//! Per row: start from `T::default()`, assign every column-bound member, then
//! resolve every relationship-bound member with a nested select on the same
//! client. Nested selects run one at a time, in member order, which keeps the
//! generated SQL sequence deterministic. Each relationship costs one extra round
//! trip per mapped row.
//!
//! An entity is only handed back once every member resolved; any error drops
//! the partially populated value.

use sea_query::Value;

use crate::client::DbClient;
use crate::entity::{Cardinality, Entity, EntityMetadata, RelationContainer};
use crate::error::{QuarryError, Result};
use crate::query::Query;
use crate::result::{ResultRow, ResultSet};
use crate::value::{is_null, TryGetable};

#[cfg(feature = "tracing")]
use crate::telemetry::tracing_helpers;

/// Default limit on nested relationship levels.
pub const DEFAULT_MAX_RELATION_DEPTH: usize = 8;

/// Exclusive handle on a client used while resolving relationships.
///
/// Holding `&mut C` for the whole mapping call makes concurrent use of the
/// client during nested resolution impossible.
///
/// Cycles are not detected. Relations declared in both directions (an owner
/// listing its pets while each pet loads its owner) recurse until
/// `max_relation_depth` and then fail with [`QuarryError::Mapping`]. Declare
/// such pairs on one side only and query the other side explicitly.
pub struct RelationLoader<'c, C: DbClient + ?Sized> {
    client: &'c mut C,
    depth: usize,
    max_depth: usize,
}

impl<'c, C: DbClient + ?Sized> RelationLoader<'c, C> {
    pub fn new(client: &'c mut C) -> Self {
        let max_depth = client.max_relation_depth();
        RelationLoader {
            client,
            depth: 0,
            max_depth,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Current nesting level; top-level rows map at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn client(&mut self) -> &mut C {
        self.client
    }

    /// Select the related rows whose `foreign_column` equals `key` and map
    /// them into the member's container.
    pub fn load<R: RelationContainer>(
        &mut self,
        owner: &'static EntityMetadata,
        member: &str,
        foreign_column: &str,
        key: Value,
    ) -> Result<R> {
        if self.depth >= self.max_depth {
            return Err(QuarryError::mapping(
                owner.type_name(),
                member,
                format!(
                    "relationship nesting exceeds the maximum depth of {}",
                    self.max_depth
                ),
            ));
        }

        let related = R::Item::metadata();
        let mut query = Query::select(related.table()).eq(foreign_column, key);
        if R::CARDINALITY == Cardinality::Singular {
            query = query.limit(1);
        }
        log::trace!(
            "resolving {}.{} from `{}` at depth {}",
            owner.type_name(),
            member,
            related.table(),
            self.depth
        );
        let rows = self.client.execute(&query)?;

        self.depth += 1;
        let mapped = map_all::<R::Item, C>(&rows, self);
        self.depth -= 1;
        Ok(R::from_related(mapped?))
    }
}

/// Map a single row into a fresh entity.
pub fn map_row<T: Entity, C: DbClient + ?Sized>(
    row: &ResultRow,
    loader: &mut RelationLoader<'_, C>,
) -> Result<T> {
    let mut entity = T::default();
    entity.read_columns(row)?;
    entity.resolve_relations(row, loader)?;
    Ok(entity)
}

/// Map every row of `rows`, in order.
pub fn map_all<T: Entity, C: DbClient + ?Sized>(
    rows: &ResultSet,
    loader: &mut RelationLoader<'_, C>,
) -> Result<Vec<T>> {
    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::map_entity_span(
        T::metadata().type_name(),
        rows.row_count(),
        loader.depth(),
    )
    .entered();

    let mut entities = Vec::with_capacity(rows.row_count());
    for row in rows {
        entities.push(map_row::<T, C>(row, loader)?);
    }
    Ok(entities)
}

/// Assign a column-bound member.
///
/// A column missing from the result is a mapping error. A NULL cell assigns
/// `null_default` when there is one and otherwise leaves the member untouched.
pub fn read_column<T: TryGetable>(
    row: &ResultRow,
    meta: &'static EntityMetadata,
    member: &str,
    column: &str,
    slot: &mut T,
    null_default: Option<T>,
) -> Result<()> {
    let value = row.get(column).ok_or_else(|| {
        QuarryError::mapping(
            meta.type_name(),
            member,
            format!("column `{column}` is not in the result"),
        )
    })?;
    if is_null(value) {
        if let Some(default) = null_default {
            *slot = default;
        }
        return Ok(());
    }
    *slot = T::try_get(value).map_err(|e| {
        QuarryError::mapping(meta.type_name(), member, format!("column `{column}`: {e}"))
    })?;
    Ok(())
}

/// Populate a relationship-bound member.
///
/// A NULL join key leaves the member at its default without querying.
pub fn resolve_relation<R: RelationContainer, C: DbClient + ?Sized>(
    row: &ResultRow,
    meta: &'static EntityMetadata,
    member: &str,
    local_column: &str,
    foreign_column: &str,
    loader: &mut RelationLoader<'_, C>,
    slot: &mut R,
) -> Result<()> {
    let key = row.get(local_column).ok_or_else(|| {
        QuarryError::mapping(
            meta.type_name(),
            member,
            format!("join column `{local_column}` is not in the result"),
        )
    })?;
    if is_null(key) {
        return Ok(());
    }
    *slot = loader.load::<R>(meta, member, foreign_column, key.clone())?;
    Ok(())
}
