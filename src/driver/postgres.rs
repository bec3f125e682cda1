//! PostgreSQL driver over the synchronous `postgres` client.
//!
//! Every statement is prepared before binding. Integer and float parameters
//! are converted to the width the server expects for their placeholder, so an
//! `i32` key can be matched against a `bigint` column. `numeric` cells are
//! decoded to decimal text; other types without a native mapping (`interval`,
//! arrays) are read as text when they are textual and as raw bytes otherwise.
//! Generated identities come back through `RETURNING`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres::{Client, NoTls, Row};
use postgres_types::{FromSql, ToSql, Type};
use sea_query::Value;

use crate::client::{ConnectionState, DbClient, NonQueryResult};
use crate::config::{Backend, DatabaseConfig};
use crate::error::{QuarryError, Result, ValueExtractionError};
use crate::mapper::DEFAULT_MAX_RELATION_DEPTH;
use crate::query::{PostgresDialect, Query, SqlDialect, Statement};
use crate::result::{ColumnInfo, ResultSet};
use crate::transaction::IsolationLevel;
use crate::value::{TryGetable, ValueKind};

#[cfg(feature = "tracing")]
use crate::telemetry::tracing_helpers;

type Param = Box<dyn ToSql + Sync>;

/// Client owning one PostgreSQL connection
pub struct PostgresClient {
    url: String,
    client: Option<Client>,
    max_relation_depth: usize,
    isolation: IsolationLevel,
}

impl std::fmt::Debug for PostgresClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresClient")
            .field("state", &self.state())
            .field("max_relation_depth", &self.max_relation_depth)
            .field("isolation", &self.isolation)
            .finish()
    }
}

impl PostgresClient {
    /// A closed client for the connection string `url`.
    pub fn new(url: impl Into<String>) -> Self {
        PostgresClient {
            url: url.into(),
            client: None,
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
            isolation: IsolationLevel::Unspecified,
        }
    }

    pub fn connect(url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(url);
        client.open()?;
        Ok(client)
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if config.backend != Backend::Postgres {
            return Err(QuarryError::Driver(format!(
                "configuration selects {:?}, not postgres",
                config.backend
            )));
        }
        let client = Self::connect(config.url.clone())?;
        Ok(client
            .with_max_relation_depth(config.max_relation_depth)
            .with_isolation(config.isolation))
    }

    pub fn with_max_relation_depth(mut self, depth: usize) -> Self {
        self.max_relation_depth = depth;
        self
    }

    /// Isolation used by `execute_transaction_default`.
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    fn client(&mut self) -> Result<&mut Client> {
        match self.client.as_mut() {
            Some(client) if !client.is_closed() => Ok(client),
            _ => Err(QuarryError::NotConnected),
        }
    }

    fn render(&self, query: &Query) -> Result<Statement> {
        let statement = PostgresDialect.render(query)?;
        log::debug!("postgres: {} {:?}", statement.sql, statement.params);
        Ok(statement)
    }

    fn batch(&mut self, sql: &str) -> Result<()> {
        log::debug!("postgres: {sql}");
        self.client()?
            .batch_execute(sql)
            .map_err(|e| QuarryError::execution(sql, e))
    }
}

impl DbClient for PostgresClient {
    fn dialect(&self) -> &dyn SqlDialect {
        &PostgresDialect
    }

    fn open(&mut self) -> Result<()> {
        if self.state() == ConnectionState::Open {
            return Ok(());
        }
        let client = Client::connect(&self.url, NoTls)
            .map_err(|e| QuarryError::connection("failed to connect to postgres", e))?;
        self.client = Some(client);
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        match &self.client {
            Some(client) if !client.is_closed() => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .map_err(|e| QuarryError::connection("failed to close postgres connection", e))?;
        }
        Ok(())
    }

    fn execute(&mut self, query: &Query) -> Result<ResultSet> {
        let statement = self.render(query)?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span("postgres", &statement.sql).entered();
        let fail = |e: postgres::Error| QuarryError::execution(statement.sql.clone(), e);

        let client = self.client()?;
        let prepared = client.prepare(&statement.sql).map_err(fail)?;
        let params = bind_params(&statement.params, prepared.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();
        let types: Vec<Type> = prepared.columns().iter().map(|c| c.type_().clone()).collect();
        let columns = prepared
            .columns()
            .iter()
            .map(|c| ColumnInfo::new(c.name(), kind_of(c.type_())))
            .collect();
        let rows = client.query(&prepared, &refs).map_err(fail)?;

        let mut result = ResultSet::new(columns);
        for row in &rows {
            let mut cells = Vec::with_capacity(types.len());
            for (index, ty) in types.iter().enumerate() {
                cells.push(read_cell(row, index, ty).map_err(fail)?);
            }
            result.add_row(cells)?;
        }
        Ok(result)
    }

    fn execute_non_query(&mut self, query: &Query) -> Result<NonQueryResult> {
        let statement = self.render(query)?;
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span("postgres", &statement.sql).entered();
        let fail = |e: postgres::Error| QuarryError::execution(statement.sql.clone(), e);
        let client = self.client()?;
        let prepared = client.prepare(&statement.sql).map_err(fail)?;
        let params = bind_params(&statement.params, prepared.params())?;
        let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();

        if !statement.returns_identity {
            let affected = client.execute(&prepared, &refs).map_err(fail)?;
            return Ok(NonQueryResult {
                rows_affected: affected,
                last_insert_id: None,
            });
        }

        let rows = client.query(&prepared, &refs).map_err(fail)?;
        let last_insert_id = match rows.first() {
            Some(row) => {
                let ty = row.columns()[0].type_().clone();
                let cell = read_cell(row, 0, &ty).map_err(fail)?;
                Option::<i64>::try_get(&cell)?
            }
            None => None,
        };
        Ok(NonQueryResult {
            rows_affected: rows.len() as u64,
            last_insert_id,
        })
    }

    fn begin(&mut self, isolation: IsolationLevel) -> Result<()> {
        for sql in PostgresDialect.begin_transaction(isolation) {
            self.batch(&sql)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK")
    }

    fn max_relation_depth(&self) -> usize {
        self.max_relation_depth
    }

    fn default_isolation(&self) -> IsolationLevel {
        self.isolation
    }
}

fn kind_of(ty: &Type) -> ValueKind {
    if *ty == Type::BOOL {
        ValueKind::Bool
    } else if [Type::INT2, Type::INT4, Type::INT8, Type::OID].contains(ty) {
        ValueKind::Integer
    } else if [Type::FLOAT4, Type::FLOAT8].contains(ty) {
        ValueKind::Float
    } else if *ty == Type::BYTEA {
        ValueKind::Bytes
    } else if [Type::JSON, Type::JSONB].contains(ty) {
        ValueKind::Json
    } else if *ty == Type::DATE {
        ValueKind::Date
    } else if *ty == Type::TIME {
        ValueKind::Time
    } else if *ty == Type::TIMESTAMP {
        ValueKind::DateTime
    } else if *ty == Type::TIMESTAMPTZ {
        ValueKind::DateTimeTz
    } else if *ty == Type::UUID {
        ValueKind::Uuid
    } else {
        ValueKind::Text
    }
}

/// Decode one cell by its column type.
fn read_cell(row: &Row, index: usize, ty: &Type) -> std::result::Result<Value, postgres::Error> {
    let kind = kind_of(ty);
    let value = match kind {
        ValueKind::Bool => Value::Bool(row.try_get(index)?),
        ValueKind::Integer if *ty == Type::INT2 => Value::SmallInt(row.try_get(index)?),
        ValueKind::Integer if *ty == Type::INT4 => Value::Int(row.try_get(index)?),
        ValueKind::Integer if *ty == Type::OID => Value::Unsigned(row.try_get(index)?),
        ValueKind::Integer => Value::BigInt(row.try_get(index)?),
        ValueKind::Float if *ty == Type::FLOAT4 => Value::Float(row.try_get(index)?),
        ValueKind::Float => Value::Double(row.try_get(index)?),
        ValueKind::Bytes => Value::Bytes(row.try_get::<_, Option<Vec<u8>>>(index)?.map(Box::new)),
        ValueKind::Json => {
            Value::Json(row.try_get::<_, Option<serde_json::Value>>(index)?.map(Box::new))
        }
        ValueKind::Date => Value::ChronoDate(row.try_get::<_, Option<NaiveDate>>(index)?.map(Box::new)),
        ValueKind::Time => Value::ChronoTime(row.try_get::<_, Option<NaiveTime>>(index)?.map(Box::new)),
        ValueKind::DateTime => {
            Value::ChronoDateTime(row.try_get::<_, Option<NaiveDateTime>>(index)?.map(Box::new))
        }
        ValueKind::DateTimeTz => {
            Value::ChronoDateTimeUtc(row.try_get::<_, Option<DateTime<Utc>>>(index)?.map(Box::new))
        }
        ValueKind::Uuid => Value::Uuid(row.try_get::<_, Option<uuid::Uuid>>(index)?.map(Box::new)),
        ValueKind::Text | ValueKind::Unknown => read_untyped(row, index, kind)?,
    };
    Ok(value)
}

fn read_untyped(row: &Row, index: usize, kind: ValueKind) -> std::result::Result<Value, postgres::Error> {
    Ok(row
        .try_get::<_, Option<UntypedCell>>(index)?
        .map_or_else(|| kind.null_value(), |cell| cell.0))
}

/// Cell of a type without a native mapping.
///
/// `numeric` is rendered as decimal text, types with a textual wire form as
/// their text and everything else as the raw binary payload.
struct UntypedCell(Value);

impl<'a> FromSql<'a> for UntypedCell {
    fn from_sql(
        ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        let value = if *ty == Type::NUMERIC {
            Value::String(Some(Box::new(numeric_text(raw)?)))
        } else if <String as FromSql>::accepts(ty) {
            Value::String(Some(Box::new(String::from_sql(ty, raw)?)))
        } else {
            Value::Bytes(Some(Box::new(raw.to_vec())))
        };
        Ok(UntypedCell(value))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Decode the binary `numeric` wire format: a header of digit count, weight
/// (in base-10000 groups), sign and display scale, then the base-10000 groups.
fn numeric_text(raw: &[u8]) -> std::result::Result<String, Box<dyn std::error::Error + Sync + Send>> {
    let word = |i: usize| -> std::result::Result<u16, Box<dyn std::error::Error + Sync + Send>> {
        raw.get(i * 2..i * 2 + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| "truncated numeric value".into())
    };
    let ndigits = usize::from(word(0)?);
    let weight = i32::from(word(1)? as i16);
    let sign = word(2)?;
    let scale = usize::from(word(3)?);
    match sign {
        0xC000 => return Ok("NaN".to_string()),
        0xD000 => return Ok("Infinity".to_string()),
        0xF000 => return Ok("-Infinity".to_string()),
        _ => {}
    }
    let digits = (0..ndigits)
        .map(|i| word(4 + i))
        .collect::<std::result::Result<Vec<u16>, _>>()?;
    let group = |position: i32| -> u16 {
        usize::try_from(position)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == 0x4000 {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&group(0).to_string());
        for position in 1..=weight {
            text.push_str(&format!("{:04}", group(position)));
        }
    }
    if scale > 0 {
        let mut fraction = String::new();
        let mut position = weight + 1;
        while fraction.len() < scale {
            fraction.push_str(&format!("{:04}", group(position)));
            position += 1;
        }
        fraction.truncate(scale);
        text.push('.');
        text.push_str(&fraction);
    }
    Ok(text)
}

/// Bind each parameter for the type its placeholder was prepared with.
fn bind_params(params: &[Value], expected: &[Type]) -> Result<Vec<Param>> {
    params
        .iter()
        .enumerate()
        .map(|(index, value)| match expected.get(index) {
            Some(ty) => coerce_param(index, value, ty),
            None => bind_param(value),
        })
        .collect()
}

/// Convert numeric parameters to the width of the placeholder's type; any
/// other combination is bound by its own variant.
fn coerce_param(index: usize, value: &Value, ty: &Type) -> Result<Param> {
    let kind = ValueKind::of(value);
    if !matches!(kind, ValueKind::Integer | ValueKind::Float) {
        return bind_param(value);
    }
    let convert = |e: ValueExtractionError| {
        QuarryError::QueryBuild(format!("parameter ${} for {ty}: {e}", index + 1))
    };
    let param: Param = if *ty == Type::INT2 && kind == ValueKind::Integer {
        Box::new(Option::<i16>::try_get(value).map_err(convert)?)
    } else if *ty == Type::INT4 && kind == ValueKind::Integer {
        Box::new(Option::<i32>::try_get(value).map_err(convert)?)
    } else if *ty == Type::INT8 && kind == ValueKind::Integer {
        Box::new(Option::<i64>::try_get(value).map_err(convert)?)
    } else if *ty == Type::FLOAT4 {
        Box::new(Option::<f32>::try_get(value).map_err(convert)?)
    } else if *ty == Type::FLOAT8 {
        Box::new(Option::<f64>::try_get(value).map_err(convert)?)
    } else {
        return bind_param(value);
    };
    Ok(param)
}

fn bind_param(value: &Value) -> Result<Param> {
    let param: Param = match value {
        Value::Bool(v) => Box::new(*v),
        Value::TinyInt(v) => Box::new(v.map(i16::from)),
        Value::SmallInt(v) => Box::new(*v),
        Value::Int(v) => Box::new(*v),
        Value::BigInt(v) => Box::new(*v),
        Value::TinyUnsigned(v) => Box::new(v.map(i16::from)),
        Value::SmallUnsigned(v) => Box::new(v.map(i32::from)),
        Value::Unsigned(v) => Box::new(v.map(i64::from)),
        Value::BigUnsigned(v) => {
            let converted = v
                .map(i64::try_from)
                .transpose()
                .map_err(|_| QuarryError::QueryBuild(format!("{v:?} exceeds the BIGINT range")))?;
            Box::new(converted)
        }
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::String(v) => Box::new(v.as_deref().cloned()),
        Value::Char(v) => Box::new(v.map(|c| c.to_string())),
        Value::Bytes(v) => Box::new(v.as_deref().cloned()),
        Value::Json(v) => Box::new(v.as_deref().cloned()),
        Value::ChronoDate(v) => Box::new(v.as_deref().copied()),
        Value::ChronoTime(v) => Box::new(v.as_deref().copied()),
        Value::ChronoDateTime(v) => Box::new(v.as_deref().copied()),
        Value::ChronoDateTimeUtc(v) => Box::new(v.as_deref().copied()),
        Value::ChronoDateTimeLocal(v) => Box::new(v.as_deref().map(|dt| dt.with_timezone(&Utc))),
        Value::ChronoDateTimeWithTimeZone(v) => Box::new(v.as_deref().copied()),
        Value::Uuid(v) => Box::new(v.as_deref().copied()),
        #[allow(unreachable_patterns)]
        other => {
            return Err(QuarryError::QueryBuild(format!(
                "postgres cannot bind a {} parameter",
                ValueKind::of(other).name()
            )))
        }
    };
    Ok(param)
}
