use polars::functions::concat_df_diagonal;
use polars::prelude::*;

use crate::error::DashError;

/// Flatten one (usually filtered) frame to CSV with a header row and no
/// index column. The download/link encoding around it is the host's
/// concern.
pub fn dataset_csv(df: &DataFrame) -> Result<String, DashError> {
    let mut out = Vec::new();
    CsvWriter::new(&mut out)
        .include_header(true)
        .finish(&mut df.clone())?;
    String::from_utf8(out).map_err(|e| DashError::InvalidData(e.to_string()))
}

/// Concatenate several filtered frames into one CSV. Schemas differ per
/// report, so the concat is diagonal: the output carries the union of
/// all columns and rows leave missing cells empty.
pub fn combined_csv(frames: &[DataFrame]) -> Result<String, DashError> {
    let combined = concat_df_diagonal(frames)?;
    dataset_csv(&combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn csv_has_header_and_rows() {
        let df = df!(
            "district" => ["North", "South"],
            "net_weight" => [10i64, 20],
        )
        .unwrap();
        let csv = dataset_csv(&df).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("district,net_weight"));
        assert_eq!(lines.next(), Some("North,10"));
        assert_eq!(lines.next(), Some("South,20"));
    }

    #[test]
    fn combined_csv_takes_the_union_of_columns() {
        let a = df!("status" => ["PASSED"], "product_weight" => [10i64]).unwrap();
        let b = df!("district" => ["North"], "net_weight" => [5i64]).unwrap();
        let csv = combined_csv(&[a, b]).unwrap();

        let header = csv.lines().next().unwrap();
        for column in ["status", "product_weight", "district", "net_weight"] {
            assert!(header.contains(column), "missing column {column}");
        }
        // One row per input frame.
        assert_eq!(csv.trim_end().lines().count(), 3);
    }
}
