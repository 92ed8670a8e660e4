use std::collections::{BTreeSet, HashMap, HashSet};

use polars::prelude::*;

use crate::derive::Dataset;
use crate::error::DashError;
use crate::schema::derived;

/// The user's current filter state: one year plus a multi-select per
/// categorical dimension. A dimension with no entry is unconstrained,
/// matching a multi-select with everything ticked.
#[derive(Debug, Clone)]
pub struct Selection {
    pub year: i32,
    pub picks: HashMap<String, Vec<String>>,
}

impl Selection {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            picks: HashMap::new(),
        }
    }

    pub fn pick<I, S>(mut self, dimension: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.picks
            .insert(dimension.to_string(), values.into_iter().map(Into::into).collect());
        self
    }
}

/// Filter a dataset by the selection. A row survives iff its `year`
/// equals the selected year (datasets without a year column skip that
/// predicate) and, for each picked dimension the frame carries, its
/// value is among the picked values. Returns a new frame; idempotent.
pub fn apply(ds: &Dataset, selection: &Selection) -> Result<DataFrame, DashError> {
    apply_to_frame(ds.frame(), selection)
}

pub fn apply_to_frame(df: &DataFrame, selection: &Selection) -> Result<DataFrame, DashError> {
    let schema = df.schema();
    let mut lf = df.clone().lazy();

    if schema.contains(derived::YEAR) {
        lf = lf.filter(col(derived::YEAR).eq(lit(selection.year)));
    }

    for (dim, allowed) in &selection.picks {
        if !schema.contains(dim.as_str()) {
            continue;
        }
        let allowed = Series::new(dim.as_str().into(), allowed.clone());
        lf = lf.filter(col(dim.as_str()).is_in(lit(allowed), false));
    }

    Ok(lf.collect()?)
}

/// Union of the `year` column across all datasets, sorted descending.
/// Datasets without a year column (and empty ones) contribute nothing.
pub fn year_options(datasets: &[Dataset]) -> Result<Vec<i32>, DashError> {
    let mut years: BTreeSet<i32> = BTreeSet::new();
    for ds in datasets {
        if !ds.spec().has_year() {
            continue;
        }
        let column = ds.frame().column(derived::YEAR)?.i32()?;
        years.extend(column.into_iter().flatten());
    }
    Ok(years.into_iter().rev().collect())
}

/// Distinct values of one dimension across the *unfiltered* dataset,
/// in encounter order. Computed before the year filter so multi-select
/// options stay stable when the selected year changes.
pub fn dimension_options(ds: &Dataset, column: &str) -> Result<Vec<String>, DashError> {
    let values = ds.frame().column(column)?.str()?;
    let mut seen = HashSet::new();
    let mut options = Vec::new();
    for value in values.into_iter().flatten() {
        if seen.insert(value) {
            options.push(value.to_string());
        }
    }
    Ok(options)
}
