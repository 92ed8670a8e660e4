use std::time::Duration;

use polars::prelude::DataFrame;

use crate::config::DashConfig;
use crate::derive::Dataset;
use crate::error::DashError;
use crate::export;
use crate::filter::{self, Selection};
use crate::loader::{LoadFailure, Loader};
use crate::schema;
use crate::source::{PostgresSource, QuerySource};
use crate::views;

/// Facade owning the loader and the six datasets. `refresh` runs the
/// fixed queries (cache-gated); `recompute` is a pure function of the
/// loaded datasets and the current selection, re-invoked on every
/// interaction. Before the first refresh, and after connection loss,
/// all datasets are empty but fully schema-valid, so every view still
/// renders.
pub struct Dashboard {
    loader: Loader,
    datasets: Vec<Dataset>,
}

/// Everything one render pass needs, recomputed per selection change.
/// The `*_ceiling` fields carry each leaderboard's declared
/// progress-bar domain (observed maximum).
pub struct DashboardViews {
    pub total_product_weight: i64,
    pub monthly_volumes: DataFrame,
    pub destinations: DataFrame,
    pub top_districts: DataFrame,
    pub top_districts_ceiling: f64,
    pub wastage_by_stage: DataFrame,
    pub export_company_totals: DataFrame,
    pub export_company_ceiling: f64,
    pub crop_country_totals: DataFrame,
}

impl Dashboard {
    /// Build a dashboard over an opaque query source. Datasets start
    /// empty until the first [`Dashboard::refresh`].
    pub fn new(source: Box<dyn QuerySource>, cache_ttl: Duration) -> Result<Self, DashError> {
        let datasets = schema::REPORTS
            .iter()
            .copied()
            .map(Dataset::empty)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            loader: Loader::new(source, cache_ttl),
            datasets,
        })
    }

    /// Connect the single shared Postgres resource and build the
    /// dashboard around it.
    pub fn connect(config: &DashConfig) -> Result<Self, DashError> {
        let source = PostgresSource::connect(config)?;
        Self::new(Box::new(source), config.cache_ttl)
    }

    /// Re-run all six reports. Query failures degrade the affected
    /// dataset to empty (see [`Dashboard::failures`]); derivation
    /// failures are structural and propagate.
    pub fn refresh(&mut self) -> Result<(), DashError> {
        self.loader.clear_failures();
        self.datasets = self.loader.refresh_all()?;
        Ok(())
    }

    pub fn dataset(&self, report: &str) -> Result<&Dataset, DashError> {
        self.datasets
            .iter()
            .find(|ds| ds.spec().name == report)
            .ok_or_else(|| DashError::NotLoaded(report.to_string()))
    }

    /// Query failures from the last refresh, for user-visible display.
    pub fn failures(&self) -> &[LoadFailure] {
        self.loader.failures()
    }

    /// Years offered to the user: union across all datasets, newest
    /// first.
    pub fn year_options(&self) -> Result<Vec<i32>, DashError> {
        filter::year_options(&self.datasets)
    }

    /// Multi-select options for one dimension, from the unfiltered
    /// dataset so they stay stable as the year changes.
    pub fn dimension_options(&self, report: &str, column: &str) -> Result<Vec<String>, DashError> {
        filter::dimension_options(self.dataset(report)?, column)
    }

    pub fn filtered(&self, report: &str, selection: &Selection) -> Result<DataFrame, DashError> {
        filter::apply(self.dataset(report)?, selection)
    }

    /// One synchronous recomputation pass: filter every dataset by the
    /// selection and build all chart tables. No side effects on the
    /// datasets; superseded passes can simply be discarded.
    pub fn recompute(&self, selection: &Selection) -> Result<DashboardViews, DashError> {
        let production = self.filtered(schema::PRODUCTION_STATUS.name, selection)?;
        let shipments = self.filtered(schema::SHIPMENTS.name, selection)?;
        let quality = self.filtered(schema::QUALITY_CONTROL.name, selection)?;
        let traceability = self.filtered(schema::TRACEABILITY.name, selection)?;
        let export_details = self.filtered(schema::EXPORT_DETAILS.name, selection)?;
        let crop_exports = self.filtered(schema::CROP_EXPORTS.name, selection)?;

        let top_districts = views::top_districts(&traceability)?;
        let export_company_totals = views::export_company_totals(&export_details)?;

        Ok(DashboardViews {
            total_product_weight: views::total_product_weight(&production)?,
            monthly_volumes: views::monthly_volumes(&production)?,
            destinations: views::destinations(&shipments)?,
            top_districts_ceiling: views::progress_ceiling(
                &top_districts,
                schema::trace::NET_WEIGHT,
            )?,
            top_districts,
            wastage_by_stage: views::wastage_by_stage(&quality, selection.year)?,
            export_company_ceiling: views::progress_ceiling(
                &export_company_totals,
                schema::export::WEIGHT,
            )?,
            export_company_totals,
            crop_country_totals: views::crop_country_totals(&crop_exports)?,
        })
    }

    /// CSV of one filtered report.
    pub fn report_csv(&self, report: &str, selection: &Selection) -> Result<String, DashError> {
        export::dataset_csv(&self.filtered(report, selection)?)
    }

    /// Combined CSV of all filtered reports (diagonal column union).
    pub fn combined_csv(&self, selection: &Selection) -> Result<String, DashError> {
        let frames = schema::REPORTS
            .iter()
            .map(|spec| self.filtered(spec.name, selection))
            .collect::<Result<Vec<_>, _>>()?;
        export::combined_csv(&frames)
    }
}
