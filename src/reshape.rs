use polars::prelude::*;

use crate::error::DashError;
use crate::schema::melted;

/// Wide-to-long reshape: one output row per (id-row, value-column)
/// pair, with the value column's name under `Stage` and its cell under
/// `Quantity`. Output length = input rows x value columns.
pub fn melt(df: &DataFrame, id_cols: &[&str], value_cols: &[&str]) -> Result<DataFrame, DashError> {
    let args = UnpivotArgsDSL {
        on: cols(value_cols.iter().copied()),
        index: cols(id_cols.iter().copied()),
        variable_name: Some(PlSmallStr::from(melted::STAGE)),
        value_name: Some(PlSmallStr::from(melted::QUANTITY)),
    };
    Ok(df.clone().lazy().unpivot(args).collect()?)
}

/// Partition by the exact key tuple and sum each measure, discarding
/// detail rows. Partitions exist only for observed keys; their order is
/// the keys' encounter order. Output dtypes match the input columns.
pub fn group_sum(df: &DataFrame, keys: &[&str], measures: &[&str]) -> Result<DataFrame, DashError> {
    let schema = df.schema();
    let mut dtypes: Vec<DataType> = Vec::with_capacity(keys.len() + measures.len());
    for name in keys.iter().chain(measures.iter()) {
        let dtype = schema
            .get(name)
            .ok_or_else(|| DashError::MissingColumn((*name).to_string()))?;
        dtypes.push(dtype.clone());
    }

    if df.height() == 0 {
        let columns: Vec<Column> = keys
            .iter()
            .chain(measures.iter())
            .zip(&dtypes)
            .map(|(name, dtype)| Series::new_empty((*name).into(), dtype).into())
            .collect();
        return Ok(DataFrame::new(columns)?);
    }

    let key_names: Vec<String> = keys.iter().map(|s| s.to_string()).collect();
    let partitions = df.partition_by_stable(key_names.as_slice(), true)?;

    let mut key_columns: Vec<Vec<AnyValue>> = vec![vec![]; keys.len()];
    let mut sum_columns: Vec<Vec<AnyValue>> = vec![vec![]; measures.len()];

    for partition in &partitions {
        // Group key values: take the first row of each partition.
        for (i, key) in keys.iter().enumerate() {
            let val = partition.column(key)?.get(0)?;
            key_columns[i].push(val.into_static());
        }
        for (i, measure) in measures.iter().enumerate() {
            let series = partition.column(measure)?.as_materialized_series();
            let total = series.sum_reduce()?;
            sum_columns[i].push(total.value().clone().into_static());
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(keys.len() + measures.len());
    for ((name, dtype), values) in keys.iter().zip(&dtypes).zip(key_columns) {
        let series = Series::from_any_values_and_dtype((*name).into(), &values, dtype, true)?;
        columns.push(series.into());
    }
    for ((name, dtype), values) in measures
        .iter()
        .zip(dtypes.iter().skip(keys.len()))
        .zip(sum_columns)
    {
        let series = Series::from_any_values_and_dtype((*name).into(), &values, dtype, true)?;
        columns.push(series.into());
    }

    Ok(DataFrame::new(columns)?)
}

/// Stable descending sort by one measure, for leaderboard tables; tied
/// rows keep their encounter order.
pub fn sort_desc(df: &DataFrame, measure: &str) -> Result<DataFrame, DashError> {
    Ok(df.sort(
        [measure],
        SortMultipleOptions::default()
            .with_order_descending(true)
            .with_maintain_order(true),
    )?)
}

/// Stable ascending sort, used for calendar ordering.
pub fn sort_asc(df: &DataFrame, column: &str) -> Result<DataFrame, DashError> {
    Ok(df.sort(
        [column],
        SortMultipleOptions::default().with_maintain_order(true),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn melt_cardinality_is_rows_times_value_columns() {
        let df = df!(
            "exporter" => ["E1", "E2", "E3"],
            "s1" => [1.0, 2.0, 3.0],
            "s2" => [4.0, 5.0, 6.0],
        )
        .unwrap();
        let long = melt(&df, &["exporter"], &["s1", "s2"]).unwrap();
        assert_eq!(long.height(), 6);
        assert!(long.column("Stage").is_ok());
        assert!(long.column("Quantity").is_ok());
    }

    #[test]
    fn melt_scenario_two_stage_row() {
        let df = df!("id" => ["A"], "s1" => [5i64], "s2" => [3i64]).unwrap();
        let long = melt(&df, &["id"], &["s1", "s2"]).unwrap();
        assert_eq!(long.height(), 2);

        let stages = long.column("Stage").unwrap().str().unwrap();
        let quantities = long.column("Quantity").unwrap().i64().unwrap();
        let pairs: Vec<(&str, i64)> = (0..2)
            .map(|i| (stages.get(i).unwrap(), quantities.get(i).unwrap()))
            .collect();
        assert!(pairs.contains(&("s1", 5)));
        assert!(pairs.contains(&("s2", 3)));
    }

    #[test]
    fn group_sum_scenario_district_crop() {
        let df = df!(
            "district" => ["X", "X"],
            "crop" => ["C", "C"],
            "w" => [10i64, 5],
        )
        .unwrap();
        let grouped = group_sum(&df, &["district", "crop"], &["w"]).unwrap();
        assert_eq!(grouped.height(), 1);
        assert_eq!(grouped.column("w").unwrap().i64().unwrap().get(0), Some(15));
    }

    #[test]
    fn group_sum_conserves_totals() {
        let df = df!(
            "k" => ["a", "b", "a", "c", "b"],
            "v" => [1.5, 2.0, 3.5, 4.0, 0.5],
        )
        .unwrap();
        let grouped = group_sum(&df, &["k"], &["v"]).unwrap();
        let before: f64 = df.column("v").unwrap().f64().unwrap().into_iter().flatten().sum();
        let after: f64 = grouped.column("v").unwrap().f64().unwrap().into_iter().flatten().sum();
        assert!((before - after).abs() < 1e-9);
        // Observed keys only, in encounter order.
        let ks: Vec<&str> = grouped.column("k").unwrap().str().unwrap().into_iter().flatten().collect();
        assert_eq!(ks, vec!["a", "b", "c"]);
    }

    #[test]
    fn group_sum_of_empty_frame_keeps_columns() {
        let df = df!(
            "k" => Vec::<String>::new(),
            "v" => Vec::<i64>::new(),
        )
        .unwrap();
        let grouped = group_sum(&df, &["k"], &["v"]).unwrap();
        assert_eq!(grouped.height(), 0);
        assert!(grouped.column("k").is_ok());
        assert!(grouped.column("v").is_ok());
    }

    #[test]
    fn sort_desc_is_non_increasing_and_stable_on_ties() {
        let df = df!(
            "name" => ["first", "second", "third"],
            "w" => [5i64, 9, 5],
        )
        .unwrap();
        let sorted = sort_desc(&df, "w").unwrap();
        let ws: Vec<i64> = sorted.column("w").unwrap().i64().unwrap().into_iter().flatten().collect();
        for pair in ws.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        let names: Vec<&str> = sorted.column("name").unwrap().str().unwrap().into_iter().flatten().collect();
        assert_eq!(names, vec!["second", "first", "third"]);
    }
}
