use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::DashError;
use crate::schema::{derived, CalendarFields, ColumnType, ReportSpec, MONTH_ABBR};
use crate::source::Cell;

/// An immutable, schema-conforming table produced by the loader +
/// derivation steps. Filtered and reshaped views are new frames; the
/// dataset itself is never mutated.
#[derive(Debug)]
pub struct Dataset {
    spec: &'static ReportSpec,
    df: DataFrame,
}

impl Dataset {
    /// Zero-row dataset carrying the full declared column set plus the
    /// derived calendar columns, so downstream filtering and the
    /// year-union never miss a column.
    pub fn empty(spec: &'static ReportSpec) -> Result<Self, DashError> {
        let mut columns: Vec<Column> = spec
            .columns
            .iter()
            .map(|c| Series::new_empty(c.name.into(), &storage_dtype(c.ty)).into())
            .collect();

        match spec.calendar {
            CalendarFields::None => {}
            CalendarFields::YearOnly => {
                columns.push(Series::new_empty(derived::YEAR.into(), &DataType::Int32).into());
            }
            CalendarFields::YearAndMonth => {
                columns.push(Series::new_empty(derived::YEAR.into(), &DataType::Int32).into());
                columns
                    .push(Series::new_empty(derived::MONTH_NUMBER.into(), &DataType::Int32).into());
                columns.push(Series::new_empty(derived::MONTH.into(), &DataType::String).into());
            }
        }

        let df = DataFrame::new(columns)?;
        Ok(Self { spec, df })
    }

    pub fn spec(&self) -> &'static ReportSpec {
        self.spec
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }
}

fn storage_dtype(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Text => DataType::String,
        ColumnType::Int => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Timestamp => DataType::Datetime(TimeUnit::Microseconds, None),
    }
}

enum ColumnBuilder {
    Text(Vec<Option<String>>),
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Timestamp(Vec<i64>),
}

impl ColumnBuilder {
    fn new(ty: ColumnType, capacity: usize) -> Self {
        match ty {
            ColumnType::Text => Self::Text(Vec::with_capacity(capacity)),
            ColumnType::Int => Self::Int(Vec::with_capacity(capacity)),
            ColumnType::Float => Self::Float(Vec::with_capacity(capacity)),
            ColumnType::Timestamp => Self::Timestamp(Vec::with_capacity(capacity)),
        }
    }

    fn into_column(self, name: &str) -> Result<Column, DashError> {
        let series = match self {
            Self::Text(v) => Series::new(name.into(), v),
            Self::Int(v) => Series::new(name.into(), v),
            Self::Float(v) => Series::new(name.into(), v),
            Self::Timestamp(v) => Series::new(name.into(), v)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?,
        };
        Ok(series.into())
    }
}

/// Bind raw rows to the declared schema and materialize the dataset.
///
/// Steps, in order: arity check per row; fill-with-0 for every numeric
/// quantity flagged fillable; timestamp parse + calendar derivation
/// (year, month_number 1-12, uppercase 3-letter month). An arity
/// mismatch or unparseable timestamp is a hard error for the whole
/// dataset, never a silently dropped row.
pub fn derive(rows: &[Vec<Cell>], spec: &'static ReportSpec) -> Result<Dataset, DashError> {
    if rows.is_empty() {
        return Dataset::empty(spec);
    }

    let mut builders: Vec<ColumnBuilder> = spec
        .columns
        .iter()
        .map(|c| ColumnBuilder::new(c.ty, rows.len()))
        .collect();

    let mut years: Vec<i32> = Vec::with_capacity(rows.len());
    let mut month_numbers: Vec<i32> = Vec::with_capacity(rows.len());
    let mut months: Vec<String> = Vec::with_capacity(rows.len());

    for (row_idx, row) in rows.iter().enumerate() {
        if row.len() != spec.arity() {
            return Err(DashError::ArityMismatch {
                report: spec.name.to_string(),
                row: row_idx,
                expected: spec.arity(),
                actual: row.len(),
            });
        }

        for ((cell, cspec), builder) in row
            .iter()
            .zip(spec.columns.iter())
            .zip(builders.iter_mut())
        {
            match builder {
                ColumnBuilder::Text(values) => values.push(match cell {
                    Cell::Text(s) => Some(s.clone()),
                    Cell::Null => None,
                    other => return Err(conformance_error(cspec.name, row_idx, other)),
                }),
                ColumnBuilder::Int(values) => values.push(match cell {
                    Cell::Int(v) => Some(*v),
                    Cell::Float(v) => Some(*v as i64),
                    Cell::Null if cspec.fill_zero => Some(0),
                    Cell::Null => None,
                    other => return Err(conformance_error(cspec.name, row_idx, other)),
                }),
                ColumnBuilder::Float(values) => values.push(match cell {
                    Cell::Float(v) => Some(*v),
                    Cell::Int(v) => Some(*v as f64),
                    Cell::Null if cspec.fill_zero => Some(0.0),
                    Cell::Null => None,
                    other => return Err(conformance_error(cspec.name, row_idx, other)),
                }),
                ColumnBuilder::Timestamp(values) => {
                    let parsed = match cell {
                        Cell::Timestamp(dt) => Some(*dt),
                        Cell::Text(s) => parse_timestamp(s),
                        _ => None,
                    };
                    let dt = parsed.ok_or_else(|| DashError::Timestamp {
                        column: cspec.name.to_string(),
                        row: row_idx,
                        value: format!("{cell:?}"),
                    })?;
                    values.push(dt.and_utc().timestamp_micros());

                    if spec.timestamp_column == Some(cspec.name)
                        && spec.calendar != CalendarFields::None
                    {
                        years.push(dt.year());
                        if spec.calendar == CalendarFields::YearAndMonth {
                            let m = dt.month() as i32;
                            month_numbers.push(m);
                            months.push(MONTH_ABBR[m as usize].to_string());
                        }
                    }
                }
            }
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(spec.arity() + 3);
    for (cspec, builder) in spec.columns.iter().zip(builders) {
        columns.push(builder.into_column(cspec.name)?);
    }

    match spec.calendar {
        CalendarFields::None => {}
        CalendarFields::YearOnly => {
            columns.push(Series::new(derived::YEAR.into(), years).into());
        }
        CalendarFields::YearAndMonth => {
            columns.push(Series::new(derived::YEAR.into(), years).into());
            columns.push(Series::new(derived::MONTH_NUMBER.into(), month_numbers).into());
            columns.push(Series::new(derived::MONTH.into(), months).into());
        }
    }

    let df = DataFrame::new(columns)?;
    Ok(Dataset { spec, df })
}

fn conformance_error(column: &str, row: usize, cell: &Cell) -> DashError {
    DashError::InvalidData(format!(
        "column '{column}' row {row}: value {cell:?} does not conform to the declared type"
    ))
}

/// Accepts `%Y-%m-%d %H:%M:%S`, the ISO-8601 `T` form (both with an
/// optional fraction), or a bare `%Y-%m-%d` date at midnight.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
