//! PostgreSQL source and destination connectors
//!
//! The source side covers the narrow interface the jobs need: table-name
//! discovery and full-scan extraction. The destination side writes tables
//! with replace or append semantics; replace is drop-and-recreate with no
//! transactional isolation from concurrent readers.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo};

use stagehand_core::connectors::{DestinationConnector, SourceConnector, WriteMode};
use stagehand_core::error::{Error, Result};
use stagehand_core::table::{Table, Value, ValueType};

/// Open a connection pool, mapping failure to a connection error.
pub async fn connect(url: &str) -> Result<PgPool> {
    PgPool::connect(url).await.map_err(|e| Error::Connection {
        endpoint: url.to_string(),
        message: e.to_string(),
    })
}

fn query_error(context: &str, e: sqlx::Error) -> Error {
    Error::Connection {
        endpoint: context.to_string(),
        message: e.to_string(),
    }
}

fn decode_cell(row: &PgRow, index: usize, table: &str) -> Result<Value> {
    let column = &row.columns()[index];
    let type_name = column.type_info().name();
    let decoded: std::result::Result<Value, sqlx::Error> = match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map_or(Value::Null, |n| Value::Int(n as i64))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| v.map_or(Value::Null, |n| Value::Int(n as i64))),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map_or(Value::Null, Value::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map_or(Value::Null, |f| Value::Float(f as f64))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.map_or(Value::Null, Value::Float)),
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .map(|v| v.map_or(Value::Null, Value::Bool)),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => row
            .try_get::<Option<String>, _>(index)
            .map(|v| v.map_or(Value::Null, Value::Text)),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .map(|v| v.map_or(Value::Null, |t| Value::Timestamp(t.and_utc()))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .map(|v| v.map_or(Value::Null, Value::Timestamp)),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(index).map(|v| {
            v.map_or(Value::Null, |d| {
                Value::Timestamp(d.and_time(NaiveTime::MIN).and_utc())
            })
        }),
        other => {
            return Err(Error::Schema {
                table: table.to_string(),
                message: format!(
                    "unsupported column type {} for column '{}'",
                    other,
                    column.name()
                ),
            });
        }
    };
    decoded.map_err(|e| Error::Schema {
        table: table.to_string(),
        message: format!("failed to decode column '{}': {}", column.name(), e),
    })
}

fn rows_to_table(name: &str, column_names: Vec<String>, rows: &[PgRow]) -> Result<Table> {
    let columns = column_names.into_iter().map(|n| (n, Vec::new())).collect();
    let mut table = Table::from_columns(name, columns)?;
    for row in rows {
        let mut values = Vec::with_capacity(table.column_count());
        for index in 0..table.column_count() {
            values.push(decode_cell(row, index, name)?);
        }
        table.push_row(values)?;
    }
    Ok(table)
}

async fn fetch(pool: &PgPool, schema: &str, name: &str) -> Result<Table> {
    let sql = format!(r#"SELECT * FROM "{}"."{}""#, schema, name);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| query_error(name, e))?;

    let column_names: Vec<String> = match rows.first() {
        Some(first) => first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
        None => {
            // Empty table: recover the column names from the catalog
            sqlx::query(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
            )
            .bind(schema)
            .bind(name)
            .fetch_all(pool)
            .await
            .map_err(|e| query_error(name, e))?
            .iter()
            .map(|r| r.get::<String, _>(0))
            .collect()
        }
    };
    rows_to_table(name, column_names, &rows)
}

/// PostgreSQL-backed source
pub struct PostgresSource {
    pool: PgPool,
    schema: String,
}

impl PostgresSource {
    /// Wrap an existing pool
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Connect to `url`
    pub async fn connect(url: &str, schema: impl Into<String>) -> Result<Self> {
        Ok(Self::new(connect(url).await?, schema))
    }
}

#[async_trait]
impl SourceConnector for PostgresSource {
    async fn table_names(&self, filter: &[String]) -> Result<Vec<String>> {
        let rows = if filter.is_empty() {
            sqlx::query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = $1 ORDER BY table_name",
            )
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = $1 AND table_name = ANY($2) ORDER BY table_name",
            )
            .bind(&self.schema)
            .bind(filter)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| query_error(&self.schema, e))?;
        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn fetch_table(&self, name: &str) -> Result<Table> {
        fetch(&self.pool, &self.schema, name).await
    }
}

/// PostgreSQL-backed destination
pub struct PostgresDestination {
    pool: PgPool,
    schema: String,
}

impl PostgresDestination {
    /// Wrap an existing pool
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Connect to `url`
    pub async fn connect(url: &str, schema: impl Into<String>) -> Result<Self> {
        Ok(Self::new(connect(url).await?, schema))
    }

    fn qualified(&self, name: &str) -> String {
        format!(r#""{}"."{}""#, self.schema, name)
    }

    async fn execute(&self, sql: &str, context: &str) -> Result<()> {
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| query_error(context, e))
    }

    async fn insert_rows(&self, name: &str, table: &Table, types: &[ValueType]) -> Result<u64> {
        if table.row_count() == 0 {
            return Ok(0);
        }
        let column_list: Vec<String> = table
            .column_names()
            .iter()
            .map(|c| format!(r#""{}""#, c))
            .collect();
        let placeholders: Vec<String> = (1..=table.column_count())
            .map(|i| format!("${i}"))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified(name),
            column_list.join(", "),
            placeholders.join(", ")
        );

        let names = table.column_names();
        for row_index in 0..table.row_count() {
            let mut query = sqlx::query(&sql);
            for (column_index, value) in table.row(row_index).into_iter().enumerate() {
                query = bind_value(query, names[column_index], value, types[column_index])?;
            }
            query.execute(&self.pool).await.map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.code().as_deref() == Some("23505") {
                        return Error::Constraint {
                            table: name.to_string(),
                            message: db.message().to_string(),
                        };
                    }
                }
                query_error(name, e)
            })?;
        }
        Ok(table.row_count() as u64)
    }
}

/// Destination column types, inferred from the first non-null cell of each
/// column; an all-null column falls back to text.
fn infer_types(table: &Table) -> Vec<ValueType> {
    table
        .columns()
        .map(|(_, values)| {
            values
                .iter()
                .find_map(Value::value_type)
                .unwrap_or(ValueType::Text)
        })
        .collect()
}

fn sql_type(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Bool => "BOOLEAN",
        ValueType::Int => "BIGINT",
        ValueType::Float => "DOUBLE PRECISION",
        ValueType::Text => "TEXT",
        ValueType::Timestamp => "TIMESTAMPTZ",
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    column: &str,
    value: Value,
    target: ValueType,
) -> Result<Query<'q, Postgres, PgArguments>> {
    let coerced = value.cast(target).ok_or_else(|| Error::TypeCoercion {
        column: column.to_string(),
        value: format!("{:?}", value),
        target: target.to_string(),
    })?;
    Ok(match coerced {
        Value::Null => match target {
            ValueType::Bool => query.bind(None::<bool>),
            ValueType::Int => query.bind(None::<i64>),
            ValueType::Float => query.bind(None::<f64>),
            ValueType::Text => query.bind(None::<String>),
            ValueType::Timestamp => query.bind(None::<DateTime<Utc>>),
        },
        Value::Bool(b) => query.bind(b),
        Value::Int(n) => query.bind(n),
        Value::Float(f) => query.bind(f),
        Value::Text(s) => query.bind(s),
        Value::Timestamp(t) => query.bind(t),
    })
}

#[async_trait]
impl DestinationConnector for PostgresDestination {
    async fn ensure_table(
        &mut self,
        name: &str,
        columns: &[(String, ValueType)],
        primary_key: Option<&str>,
    ) -> Result<()> {
        let mut definitions: Vec<String> = columns
            .iter()
            .map(|(column, value_type)| format!(r#""{}" {}"#, column, sql_type(*value_type)))
            .collect();
        if let Some(key) = primary_key {
            definitions.push(format!(r#"PRIMARY KEY ("{}")"#, key));
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.qualified(name),
            definitions.join(", ")
        );
        self.execute(&sql, name).await
    }

    async fn write_table(&mut self, name: &str, table: &Table, mode: WriteMode) -> Result<u64> {
        let types = infer_types(table);
        match mode {
            WriteMode::Replace => {
                self.execute(
                    &format!("DROP TABLE IF EXISTS {}", self.qualified(name)),
                    name,
                )
                .await?;
                let definitions: Vec<String> = table
                    .column_names()
                    .iter()
                    .zip(&types)
                    .map(|(column, value_type)| {
                        format!(r#""{}" {}"#, column, sql_type(*value_type))
                    })
                    .collect();
                self.execute(
                    &format!(
                        "CREATE TABLE {} ({})",
                        self.qualified(name),
                        definitions.join(", ")
                    ),
                    name,
                )
                .await?;
                self.insert_rows(name, table, &types).await
            }
            WriteMode::Append => self.insert_rows(name, table, &types).await,
        }
    }

    async fn read_table(&self, name: &str) -> Result<Table> {
        fetch(&self.pool, &self.schema, name).await
    }
}
