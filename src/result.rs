//! In-memory result tables
//!
//! A driver reads the column schema of its cursor once, builds a [`ResultSet`]
//! from it and buffers every row with [`ResultSet::add_row`] before the cursor
//! is closed. Mapping then iterates the buffered rows, so nested relationship
//! queries never interleave with an open cursor.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sea_query::Value;

use crate::error::{QuarryError, Result, ValueExtractionError};
use crate::value::{is_null, TryGetable, ValueKind};

/// Name and declared kind of a result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ValueKind,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        ColumnInfo {
            name: name.into(),
            kind,
        }
    }
}

/// Immutable column schema shared by every row of a result.
#[derive(Debug, PartialEq)]
pub struct ResultSchema {
    columns: Vec<ColumnInfo>,
    index: HashMap<String, usize>,
}

impl ResultSchema {
    fn new(columns: Vec<ColumnInfo>) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            // first duplicate wins, as with positional drivers
            index.entry(column.name.clone()).or_insert(i);
        }
        ResultSchema { columns, index }
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of `name`: exact match first, then ASCII case-insensitive.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied().or_else(|| {
            self.columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(name))
        })
    }
}

/// One buffered row. Cells are positional and share the owning schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    schema: Arc<ResultSchema>,
    cells: Vec<Value>,
}

impl ResultRow {
    pub fn schema(&self) -> &ResultSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.cells
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema.position(column).map(|i| &self.cells[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.schema.position(column).is_some()
    }

    /// `true` when the column is absent or NULL.
    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).map_or(true, is_null)
    }

    /// Coerce a cell; an absent column is a [`ValueExtractionError::ConversionError`].
    pub fn try_get<T: TryGetable>(&self, column: &str) -> Result<T, ValueExtractionError> {
        let value = self.get(column).ok_or_else(|| {
            ValueExtractionError::ConversionError(format!("column `{column}` is not in the result"))
        })?;
        T::try_get(value)
    }

    /// Coerce a cell, falling back to `default` when it is absent or NULL.
    pub fn get_or<T: TryGetable>(&self, column: &str, default: T) -> Result<T, ValueExtractionError> {
        match self.get(column) {
            Some(value) if !is_null(value) => T::try_get(value),
            _ => Ok(default),
        }
    }

    /// Timestamp accessor with an explicit fallback for NULL or absent cells.
    pub fn get_datetime_or(
        &self,
        column: &str,
        default: NaiveDateTime,
    ) -> Result<NaiveDateTime, ValueExtractionError> {
        self.get_or(column, default)
    }
}

/// Rows fetched by one statement, in cursor order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    schema: Arc<ResultSchema>,
    rows: Vec<ResultRow>,
    rows_affected: Option<u64>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        ResultSet {
            schema: Arc::new(ResultSchema::new(columns)),
            rows: Vec::new(),
            rows_affected: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Append a row; its arity must match the schema.
    pub fn add_row(&mut self, cells: Vec<Value>) -> Result<&ResultRow> {
        if cells.len() != self.schema.len() {
            return Err(QuarryError::Driver(format!(
                "row has {} cells but the result has {} columns",
                cells.len(),
                self.schema.len()
            )));
        }
        self.rows.push(ResultRow {
            schema: Arc::clone(&self.schema),
            cells,
        });
        let last = self.rows.len() - 1;
        Ok(&self.rows[last])
    }

    pub fn schema(&self) -> &ResultSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        self.schema.columns()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn first(&self) -> Option<&ResultRow> {
        self.rows.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRow> {
        self.rows.iter()
    }

    /// Rows affected reported by the driver, when the statement was a write.
    pub fn rows_affected(&self) -> Option<u64> {
        self.rows_affected
    }

    pub(crate) fn with_rows_affected(mut self, rows_affected: u64) -> Self {
        self.rows_affected = Some(rows_affected);
        self
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultRow;
    type IntoIter = std::slice::Iter<'a, ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = ResultRow;
    type IntoIter = std::vec::IntoIter<ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
