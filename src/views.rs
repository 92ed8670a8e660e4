//! Chart-ready tables, one builder per visualization. Every builder
//! takes an already-filtered frame (see [`crate::filter::apply`]) and
//! returns a new frame shaped exactly as the chart consumes it.
//!
//! Progress/percentage scaling policy per chart, where applicable, is
//! stated on the builder; it affects visuals only, never the numbers.

use polars::prelude::*;

use crate::error::DashError;
use crate::reshape::{group_sum, melt, sort_asc, sort_desc};
use crate::schema::{derived, export, melted, production, quality, shipment, trace};

/// KPI card: total product weight over filtered production statuses.
/// An empty frame totals 0.
pub fn total_product_weight(filtered_production: &DataFrame) -> Result<i64, DashError> {
    let series = filtered_production
        .column(production::PRODUCT_WEIGHT)?
        .as_materialized_series();
    let total = series.sum_reduce()?;
    Ok(total.value().try_extract::<i64>().unwrap_or(0))
}

/// Monthly bar chart: product weight per (month, status), rows ordered
/// by month_number so the x-axis follows the calendar.
pub fn monthly_volumes(filtered_production: &DataFrame) -> Result<DataFrame, DashError> {
    let grouped = group_sum(
        filtered_production,
        &[derived::MONTH_NUMBER, derived::MONTH, production::STATUS],
        &[production::PRODUCT_WEIGHT],
    )?;
    sort_asc(&grouped, derived::MONTH_NUMBER)
}

/// Destinations donut: product weight per (client company, country)
/// from filtered shipments, in encounter order.
pub fn destinations(filtered_shipments: &DataFrame) -> Result<DataFrame, DashError> {
    group_sum(
        filtered_shipments,
        &[shipment::CLIENT_COMPANY, shipment::COUNTRY],
        &[shipment::PRODUCT_WEIGHT],
    )
}

/// Top-districts leaderboard: net weight per (crop, district), sorted
/// descending. Progress-bar scaling: observed maximum of net_weight
/// (see [`progress_ceiling`]).
pub fn top_districts(filtered_traceability: &DataFrame) -> Result<DataFrame, DashError> {
    let grouped = group_sum(
        filtered_traceability,
        &[trace::CROP_NAME, trace::DISTRICT],
        &[trace::NET_WEIGHT],
    )?;
    sort_desc(&grouped, trace::NET_WEIGHT)
}

/// Wastage line chart: quantities removed/rejected per (exporter,
/// stage). Wide stage columns are melted to `Stage`/`Quantity`, summed
/// per exporter and stage, then tagged with the selected year the way
/// the chart legend expects.
pub fn wastage_by_stage(
    filtered_quality: &DataFrame,
    selected_year: i32,
) -> Result<DataFrame, DashError> {
    let mut narrowed_cols: Vec<&str> = vec![quality::EXPORTER_NAME];
    narrowed_cols.extend(quality::STAGES);
    let narrowed = filtered_quality.select(narrowed_cols)?;

    let long = melt(&narrowed, &[quality::EXPORTER_NAME], &quality::STAGES)?;
    let grouped = group_sum(
        &long,
        &[quality::EXPORTER_NAME, melted::STAGE],
        &[melted::QUANTITY],
    )?;

    Ok(grouped
        .lazy()
        .with_columns([lit(selected_year).alias(derived::YEAR)])
        .collect()?)
}

/// Export-company leaderboard: received and total weight per export
/// company, sorted descending by total weight. Progress-bar scaling:
/// observed maximum of weight.
pub fn export_company_totals(filtered_exports: &DataFrame) -> Result<DataFrame, DashError> {
    let grouped = group_sum(
        filtered_exports,
        &[export::EXPORT_COMPANY_NAME],
        &[export::WEIGHT_RECEIVED, export::WEIGHT],
    )?;
    sort_desc(&grouped, export::WEIGHT)
}

/// Crop/destination leaderboard: received and total weight per
/// (crop, country), sorted descending by total weight.
pub fn crop_country_totals(filtered_crop_exports: &DataFrame) -> Result<DataFrame, DashError> {
    let grouped = group_sum(
        filtered_crop_exports,
        &[export::CROP_NAME, export::COUNTRY_NAME],
        &[export::WEIGHT_RECEIVED, export::WEIGHT],
    )?;
    sort_desc(&grouped, export::WEIGHT)
}

/// Observed maximum of a measure, used as the progress-bar domain
/// ceiling by the leaderboard views. Empty frames yield 0.
pub fn progress_ceiling(df: &DataFrame, measure: &str) -> Result<f64, DashError> {
    let series = df.column(measure)?.as_materialized_series();
    let max = series.max_reduce()?;
    Ok(max.value().try_extract::<f64>().unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn total_weight_sums_the_filtered_frame_and_empty_is_zero() {
        let df = df!(
            "status" => ["PASSED", "FAILED"],
            "product_weight" => [10i64, 4],
        )
        .unwrap();
        assert_eq!(total_product_weight(&df).unwrap(), 14);

        let empty = df!(
            "status" => Vec::<String>::new(),
            "product_weight" => Vec::<i64>::new(),
        )
        .unwrap();
        assert_eq!(total_product_weight(&empty).unwrap(), 0);
    }

    #[test]
    fn monthly_volumes_follow_the_calendar() {
        let df = df!(
            "month_number" => [3i32, 1, 1],
            "month" => ["MAR", "JAN", "JAN"],
            "status" => ["PASSED", "PASSED", "FAILED"],
            "product_weight" => [5i64, 2, 1],
        )
        .unwrap();
        let monthly = monthly_volumes(&df).unwrap();
        let months: Vec<i32> = monthly
            .column("month_number")
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(months, vec![1, 1, 3]);
    }

    #[test]
    fn wastage_melts_groups_and_tags_the_year() {
        let df = df!(
            "reception_id" => [1i64, 2],
            "reception_qty_removed" => [1.0, 2.0],
            "qcp1_qty_removed" => [0.5, 0.5],
            "qcp2_qty_removed" => [0.0, 0.0],
            "qcp3_qty_removed" => [0.0, 1.0],
            "qcp4_weight_rejected" => [2.0, 0.0],
            "qcp5_weight_rejected" => [0.0, 0.0],
            "exporter_name" => ["Acme", "Acme"],
            "crop_name" => ["Avocado", "Avocado"],
            "reception_qty_rejected" => [0.0, 0.0],
        )
        .unwrap();

        let wastage = wastage_by_stage(&df, 2023).unwrap();
        // One exporter, six stages.
        assert_eq!(wastage.height(), 6);
        let years = wastage.column("year").unwrap().i32().unwrap();
        assert!((0..wastage.height()).all(|i| years.get(i) == Some(2023)));

        // reception stage total: 1.0 + 2.0.
        let stages = wastage.column("Stage").unwrap().str().unwrap();
        let quantities = wastage.column("Quantity").unwrap().f64().unwrap();
        let reception_total = (0..wastage.height())
            .find(|&i| stages.get(i) == Some("reception_qty_removed"))
            .map(|i| quantities.get(i).unwrap())
            .unwrap();
        assert!((reception_total - 3.0).abs() < 1e-9);
    }

    #[test]
    fn leaderboards_are_sorted_descending_with_observed_ceiling() {
        let df = df!(
            "crop_name" => ["Avocado", "Mango", "Avocado"],
            "district" => ["North", "South", "North"],
            "net_weight" => [10i64, 50, 20],
        )
        .unwrap();
        let board = top_districts(&df).unwrap();
        let weights: Vec<i64> = board
            .column("net_weight")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(weights, vec![50, 30]);
        assert_eq!(progress_ceiling(&board, "net_weight").unwrap(), 50.0);
    }

    #[test]
    fn export_company_totals_sum_both_measures() {
        let df = df!(
            "country_name" => ["Kenya", "Kenya", "Ghana"],
            "crop_name" => ["Avocado", "Mango", "Avocado"],
            "weight_received" => [10.0, 5.0, 2.0],
            "weight" => [9.0, 4.0, 2.0],
            "export_company_name" => ["Acme", "Acme", "Basel"],
        )
        .unwrap();
        let totals = export_company_totals(&df).unwrap();
        assert_eq!(totals.height(), 2);
        let companies: Vec<&str> = totals
            .column("export_company_name")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(companies, vec!["Acme", "Basel"]);
        let received = totals.column("weight_received").unwrap().f64().unwrap();
        assert!((received.get(0).unwrap() - 15.0).abs() < 1e-9);
    }
}
