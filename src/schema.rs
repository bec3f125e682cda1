//! Table introspection results
//!
//! Each backend describes a table differently (`DESCRIBE`, `PRAGMA
//! table_info`, `information_schema.columns`). The parsers here turn those
//! catalog rows into one [`TableSchema`] shape.

use sea_query::Value;

use crate::error::{QuarryError, Result};
use crate::result::{ResultRow, ResultSet};
use crate::value::{is_null, TryGetable, ValueKind};

/// One column of an introspected table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Type name as the backend reports it
    pub declared_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
}

impl ColumnDescriptor {
    pub fn kind(&self) -> ValueKind {
        ValueKind::from_declared_type(&self.declared_type)
    }
}

/// Ordered column descriptors of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

fn cell<'a>(table: &str, row: &'a ResultRow, column: &str) -> Result<&'a Value> {
    row.get(column)
        .ok_or_else(|| QuarryError::introspection(table, format!("catalog row has no `{column}` column")))
}

/// Catalog text cell; some drivers report catalog text as bytes.
fn text(table: &str, row: &ResultRow, column: &str) -> Result<Option<String>> {
    let value = cell(table, row, column)?;
    if is_null(value) {
        return Ok(None);
    }
    match value {
        Value::Bytes(Some(bytes)) => String::from_utf8(bytes.as_ref().clone())
            .map(Some)
            .map_err(|e| QuarryError::introspection(table, format!("`{column}` is not utf-8: {e}"))),
        other => String::try_get(other)
            .map(Some)
            .map_err(|e| QuarryError::introspection(table, format!("`{column}`: {e}"))),
    }
}

fn required_text(table: &str, row: &ResultRow, column: &str) -> Result<String> {
    text(table, row, column)?
        .ok_or_else(|| QuarryError::introspection(table, format!("`{column}` is NULL")))
}

fn ensure_rows(table: &str, rows: &ResultSet) -> Result<()> {
    if rows.is_empty() {
        return Err(QuarryError::introspection(table, "table does not exist or has no columns"));
    }
    Ok(())
}

/// Parse MySQL `DESCRIBE` output (`Field, Type, Null, Key, Default, Extra`).
pub fn parse_mysql_describe(table: &str, rows: &ResultSet) -> Result<TableSchema> {
    ensure_rows(table, rows)?;
    let mut columns = Vec::with_capacity(rows.row_count());
    for row in rows {
        let extra = text(table, row, "Extra")?.unwrap_or_default();
        columns.push(ColumnDescriptor {
            name: required_text(table, row, "Field")?,
            declared_type: required_text(table, row, "Type")?,
            nullable: required_text(table, row, "Null")?.eq_ignore_ascii_case("YES"),
            primary_key: text(table, row, "Key")?.is_some_and(|k| k.eq_ignore_ascii_case("PRI")),
            default: text(table, row, "Default")?,
            auto_increment: extra.to_ascii_lowercase().contains("auto_increment"),
        });
    }
    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}

/// Parse SQLite `PRAGMA table_info` output (`cid, name, type, notnull, dflt_value, pk`).
///
/// A single `INTEGER PRIMARY KEY` column aliases the rowid and counts as
/// auto-increment.
pub fn parse_sqlite_table_info(table: &str, rows: &ResultSet) -> Result<TableSchema> {
    ensure_rows(table, rows)?;
    let mut columns = Vec::with_capacity(rows.row_count());
    for row in rows {
        let notnull: i64 = i64::try_get(cell(table, row, "notnull")?)
            .map_err(|e| QuarryError::introspection(table, format!("`notnull`: {e}")))?;
        let pk: i64 = i64::try_get(cell(table, row, "pk")?)
            .map_err(|e| QuarryError::introspection(table, format!("`pk`: {e}")))?;
        columns.push(ColumnDescriptor {
            name: required_text(table, row, "name")?,
            declared_type: text(table, row, "type")?.unwrap_or_default(),
            nullable: notnull == 0 && pk == 0,
            primary_key: pk > 0,
            default: text(table, row, "dflt_value")?,
            auto_increment: false,
        });
    }
    let mut keys = columns.iter_mut().filter(|c| c.primary_key);
    if let (Some(key), None) = (keys.next(), keys.next()) {
        key.auto_increment = key.declared_type.eq_ignore_ascii_case("INTEGER");
    }
    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}

/// Parse PostgreSQL `information_schema.columns` rows
/// (`column_name, data_type, is_nullable, column_default, is_primary_key`).
pub fn parse_postgres_columns(table: &str, rows: &ResultSet) -> Result<TableSchema> {
    ensure_rows(table, rows)?;
    let mut columns = Vec::with_capacity(rows.row_count());
    for row in rows {
        let default = text(table, row, "column_default")?;
        let primary_key = match row.get("is_primary_key") {
            Some(value) => Option::<bool>::try_get(value)
                .map_err(|e| QuarryError::introspection(table, format!("`is_primary_key`: {e}")))?
                .unwrap_or(false),
            None => false,
        };
        columns.push(ColumnDescriptor {
            name: required_text(table, row, "column_name")?,
            declared_type: required_text(table, row, "data_type")?,
            nullable: required_text(table, row, "is_nullable")?.eq_ignore_ascii_case("YES"),
            primary_key,
            auto_increment: default.as_deref().is_some_and(|d| d.starts_with("nextval(")),
            default,
        });
    }
    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ColumnInfo;

    fn text_value(s: &str) -> Value {
        Value::String(Some(Box::new(s.to_string())))
    }

    #[test]
    fn test_parse_mysql_describe() {
        let mut rows = ResultSet::new(
            ["Field", "Type", "Null", "Key", "Default", "Extra"]
                .into_iter()
                .map(|n| ColumnInfo::new(n, ValueKind::Text))
                .collect(),
        );
        rows.add_row(vec![
            text_value("id"),
            text_value("int(11)"),
            text_value("NO"),
            text_value("PRI"),
            Value::String(None),
            text_value("auto_increment"),
        ])
        .unwrap();
        rows.add_row(vec![
            Value::Bytes(Some(Box::new(b"name".to_vec()))),
            text_value("varchar(64)"),
            text_value("YES"),
            text_value(""),
            text_value("anon"),
            text_value(""),
        ])
        .unwrap();

        let schema = parse_mysql_describe("person", &rows).unwrap();
        assert_eq!(schema.columns.len(), 2);
        let id = &schema.columns[0];
        assert!(id.primary_key && id.auto_increment && !id.nullable);
        assert_eq!(id.kind(), ValueKind::Integer);
        let name = schema.column("name").unwrap();
        assert!(name.nullable);
        assert_eq!(name.default.as_deref(), Some("anon"));
        assert_eq!(schema.primary_key().count(), 1);
    }

    #[test]
    fn test_parse_sqlite_table_info() {
        let mut rows = ResultSet::new(vec![
            ColumnInfo::new("cid", ValueKind::Integer),
            ColumnInfo::new("name", ValueKind::Text),
            ColumnInfo::new("type", ValueKind::Text),
            ColumnInfo::new("notnull", ValueKind::Integer),
            ColumnInfo::new("dflt_value", ValueKind::Text),
            ColumnInfo::new("pk", ValueKind::Integer),
        ]);
        rows.add_row(vec![
            Value::BigInt(Some(0)),
            text_value("id"),
            text_value("INTEGER"),
            Value::BigInt(Some(0)),
            Value::String(None),
            Value::BigInt(Some(1)),
        ])
        .unwrap();
        rows.add_row(vec![
            Value::BigInt(Some(1)),
            text_value("name"),
            text_value("TEXT"),
            Value::BigInt(Some(1)),
            Value::String(None),
            Value::BigInt(Some(0)),
        ])
        .unwrap();

        let schema = parse_sqlite_table_info("person", &rows).unwrap();
        assert!(schema.columns[0].primary_key);
        assert!(schema.columns[0].auto_increment);
        assert!(!schema.columns[0].nullable);
        assert!(!schema.columns[1].nullable);
        assert!(!schema.columns[1].auto_increment);
    }

    #[test]
    fn test_parse_postgres_columns() {
        let mut rows = ResultSet::new(vec![
            ColumnInfo::new("column_name", ValueKind::Text),
            ColumnInfo::new("data_type", ValueKind::Text),
            ColumnInfo::new("is_nullable", ValueKind::Text),
            ColumnInfo::new("column_default", ValueKind::Text),
            ColumnInfo::new("is_primary_key", ValueKind::Bool),
        ]);
        rows.add_row(vec![
            text_value("id"),
            text_value("integer"),
            text_value("NO"),
            text_value("nextval('person_id_seq'::regclass)"),
            Value::Bool(Some(true)),
        ])
        .unwrap();

        let schema = parse_postgres_columns("person", &rows).unwrap();
        let id = &schema.columns[0];
        assert!(id.primary_key && id.auto_increment && !id.nullable);
    }

    #[test]
    fn test_malformed_primary_key_flag_is_an_error() {
        let mut rows = ResultSet::new(vec![
            ColumnInfo::new("column_name", ValueKind::Text),
            ColumnInfo::new("data_type", ValueKind::Text),
            ColumnInfo::new("is_nullable", ValueKind::Text),
            ColumnInfo::new("column_default", ValueKind::Text),
            ColumnInfo::new("is_primary_key", ValueKind::Text),
        ]);
        rows.add_row(vec![
            text_value("id"),
            text_value("integer"),
            text_value("NO"),
            Value::String(None),
            text_value("maybe"),
        ])
        .unwrap();

        match parse_postgres_columns("person", &rows) {
            Err(QuarryError::Introspection { table, reason }) => {
                assert_eq!(table, "person");
                assert!(reason.contains("is_primary_key"), "{reason}");
            }
            other => panic!("expected an introspection error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        let rows = ResultSet::new(vec![ColumnInfo::new("Field", ValueKind::Text)]);
        assert!(matches!(
            parse_mysql_describe("ghost", &rows),
            Err(QuarryError::Introspection { table, .. }) if table == "ghost"
        ));
    }
}
