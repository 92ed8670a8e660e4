use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres::types::Type;
use postgres::{NoTls, Row};
use tracing::info;

use crate::config::DashConfig;
use crate::error::DashError;

/// One value as it arrives from the relational source, before schema
/// binding. Numeric and timestamp cells keep their source type; the
/// derivation step coerces them to the declared column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

/// Seam between the loader and whatever executes SQL. The dashboard is
/// constructed with an opaque implementation of this trait; tests
/// substitute canned row sets.
pub trait QuerySource {
    fn run_query(&mut self, query: &str) -> Result<Vec<Vec<Cell>>, DashError>;
}

/// Blocking Postgres client over a single shared connection, acquired
/// once at process start and released with [`PostgresSource::close`].
/// All statements are read-only single queries; no pooling, no
/// transactions.
pub struct PostgresSource {
    client: postgres::Client,
}

impl PostgresSource {
    pub fn connect(config: &DashConfig) -> Result<Self, DashError> {
        let client = postgres::Config::new()
            .host(&config.db_host)
            .port(config.db_port)
            .dbname(&config.db_name)
            .user(&config.db_user)
            .password(&config.db_password)
            .connect(NoTls)
            .map_err(|e| DashError::Connection(e.to_string()))?;

        info!(host = %config.db_host, port = config.db_port, "connected to reporting database");
        Ok(Self { client })
    }

    pub fn close(self) -> Result<(), DashError> {
        self.client
            .close()
            .map_err(|e| DashError::Connection(e.to_string()))
    }
}

impl QuerySource for PostgresSource {
    fn run_query(&mut self, query: &str) -> Result<Vec<Vec<Cell>>, DashError> {
        let rows = self
            .client
            .query(query, &[])
            .map_err(|e| DashError::Query {
                query: query.to_string(),
                message: e.to_string(),
            })?;

        rows.iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|idx| read_cell(row, idx))
                    .collect()
            })
            .collect()
    }
}

/// Map one wire value to a [`Cell`]. The fixed query templates cast
/// quantities to int8/float8, so NUMERIC never reaches this point.
fn read_cell(row: &Row, idx: usize) -> Result<Cell, DashError> {
    let ty = row.columns()[idx].type_().clone();
    let cell = match ty {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .map(|v| v.map_or(Cell::Null, |v| Cell::Int(v as i64))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .map(|v| v.map_or(Cell::Null, |v| Cell::Int(v as i64))),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Int)),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .map(|v| v.map_or(Cell::Null, |v| Cell::Float(v as f64))),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Float)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => row
            .try_get::<_, Option<String>>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Text)),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map(|v| v.map_or(Cell::Null, Cell::Timestamp)),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map(|v| v.map_or(Cell::Null, |v| Cell::Timestamp(v.naive_utc()))),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx).map(|v| {
            v.and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(Cell::Null, Cell::Timestamp)
        }),
        other => {
            return Err(DashError::InvalidData(format!(
                "unsupported column type '{other}' at index {idx}"
            )))
        }
    };

    cell.map_err(|e| DashError::InvalidData(e.to_string()))
}
