use tracing::{error, info};

use crate::cache::QueryCache;
use crate::derive::{derive, Dataset};
use crate::error::DashError;
use crate::schema::{self, ReportSpec};
use crate::source::{Cell, QuerySource};

/// The fixed read-only query templates, issued verbatim. No query is
/// parameterized by user input; filtering happens after retrieval,
/// in-memory. Quantities are cast to int8/float8 on the wire so NUMERIC
/// never reaches the cell mapper.
pub mod queries {
    pub const PRODUCTION_STATUS: &str = "\
SELECT
    qcp5_products.status AS status,
    qcp5_products.totalproductnetweight::int8 AS product_weight,
    qcp5_products.created_at AS qcp5_timestamp
FROM
    qcp5_products";

    pub const SHIPMENTS: &str = "\
SELECT
    countries.countryname AS country,
    clients.companyname AS client_company,
    packinglist_products.totalproductnetweight::int8 AS product_weight,
    packinglist_products.order_id::int8 AS order_id,
    packinglist_products.created_at AS created_at
FROM
    packinglist_products
LEFT JOIN
    orders ON packinglist_products.order_id = orders.id
LEFT JOIN
    clients ON orders.client_id = clients.id
LEFT JOIN
    countries ON clients.country_id = countries.id";

    pub const QUALITY_CONTROL: &str = "\
SELECT
    receptionform.id::int8 AS reception_id,
    reception_attributes.qtyremoved::float8 AS reception_qty_removed,
    qcp1_attributes.qtyremoved::float8 AS qcp1_qty_removed,
    qcp2_attributes.qtyremoved::float8 AS qcp2_qty_removed,
    qcp3_attributes.qtyremoved::float8 AS qcp3_qty_removed,
    qcp4_recommendations.weight_rejected::float8 AS qcp4_weight_rejected,
    qcp5_recommendations.weight_rejected::float8 AS qcp5_weight_rejected,
    exportcompanies.expname AS exporter_name,
    crops.cropname AS crop_name,
    receptionform.quantityrejected::float8 AS reception_qty_rejected,
    receptionform.created_at AS created_at
FROM
    receptionform
LEFT JOIN
    reception_attributes ON reception_attributes.id = receptionform.id
LEFT JOIN
    qcp1_attributes ON qcp1_attributes.id = receptionform.id
LEFT JOIN
    qcp2_attributes ON qcp2_attributes.id = receptionform.id
LEFT JOIN
    qcp3_attributes ON qcp3_attributes.id = receptionform.id
LEFT JOIN
    qcp4_recommendations ON qcp4_recommendations.id = receptionform.id
LEFT JOIN
    qcp5_recommendations ON qcp5_recommendations.id = receptionform.id
LEFT JOIN
    exportcompanies ON exportcompanies.id = receptionform.exportcompany_id
LEFT JOIN
    crops ON crops.id = receptionform.crop_id";

    pub const TRACEABILITY: &str = "\
SELECT
    receptionform.traceability_code AS traceability_code,
    crops.cropname AS crop_name,
    receptionform.netweight::int8 AS net_weight,
    receptionform.created_at AS created_at,
    districts.name AS district
FROM
    receptionform
JOIN
    farmers ON farmers.id = receptionform.supplier_id
JOIN
    farmer_farms ON farmer_farms.farmer_id = receptionform.supplier_id
JOIN
    crops ON farmer_farms.crop_id = crops.id
JOIN
    districts ON districts.id = farmer_farms.district_id";

    pub const EXPORT_DETAILS: &str = "\
SELECT
    countries.countryname AS country_name,
    crops.cropname AS crop_name,
    exportdetails.weight_received::float8 AS weight_received,
    exportdetails.weight::float8 AS weight,
    exportcompanies.expname AS export_company_name
FROM
    exportdetails
LEFT JOIN
    exportcompanies ON exportcompanies.id = exportdetails.exportcompany_id
LEFT JOIN
    crops ON crops.id = exportdetails.crop_id
LEFT JOIN
    countries ON countries.id = exportdetails.country_id";

    pub const CROP_EXPORTS: &str = "\
SELECT
    crops.cropname AS crop_name,
    exportdetails.weight_received::float8 AS weight_received,
    exportdetails.weight::float8 AS weight,
    countries.countryname AS country_name
FROM
    exportdetails
LEFT JOIN
    crops ON crops.id = exportdetails.crop_id
LEFT JOIN
    countries ON countries.id = exportdetails.country_id";
}

fn query_for(spec: &ReportSpec) -> &'static str {
    match spec.name {
        "production_status" => queries::PRODUCTION_STATUS,
        "shipments" => queries::SHIPMENTS,
        "quality_control" => queries::QUALITY_CONTROL,
        "traceability" => queries::TRACEABILITY,
        "export_details" => queries::EXPORT_DETAILS,
        "crop_exports" => queries::CROP_EXPORTS,
        other => unreachable!("undeclared report {other}"),
    }
}

/// A query that could not be executed. Surfaced to the UI alongside the
/// (empty) dataset it would have filled.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub query: String,
    pub message: String,
}

/// Runs the fixed queries through an opaque [`QuerySource`] behind a
/// TTL cache. Execution failures degrade to empty row sets and are
/// recorded for user-visible reporting; they never abort the pipeline.
pub struct Loader {
    source: Box<dyn QuerySource>,
    cache: QueryCache,
    failures: Vec<LoadFailure>,
}

impl Loader {
    pub fn new(source: Box<dyn QuerySource>, ttl: std::time::Duration) -> Self {
        Self {
            source,
            cache: QueryCache::new(ttl),
            failures: Vec::new(),
        }
    }

    /// Execute one query, cache-gated. Never fails: a source error is
    /// recorded and an empty row set returned, so callers always get a
    /// result they can bind to the declared schema. A cached failure
    /// re-records itself, so the error stays user-visible across
    /// refreshes within the TTL window.
    pub fn load(&mut self, query: &str) -> Vec<Vec<Cell>> {
        if let Some(hit) = self.cache.get(query) {
            let rows = hit.rows.to_vec();
            if let Some(message) = hit.error {
                self.record_failure(query, message.to_string());
            }
            return rows;
        }

        match self.source.run_query(query) {
            Ok(rows) => {
                self.cache.insert(query, rows.clone());
                rows
            }
            Err(e) => {
                error!(error = %e, "query failed; serving empty result");
                self.record_failure(query, e.to_string());
                // The empty result is cached with its message: within
                // one TTL window a broken query is not retried, yet its
                // failure keeps being reported.
                self.cache.insert_failed(query, e.to_string());
                Vec::new()
            }
        }
    }

    fn record_failure(&mut self, query: &str, message: String) {
        if self.failures.iter().any(|f| f.query == query) {
            return;
        }
        self.failures.push(LoadFailure {
            query: query.to_string(),
            message,
        });
    }

    /// Load and derive one declared report. Derivation errors are
    /// structural bugs and propagate.
    pub fn load_report(&mut self, spec: &'static ReportSpec) -> Result<Dataset, DashError> {
        let rows = self.load(query_for(spec));
        derive(&rows, spec)
    }

    /// Load all six reports in declaration order.
    pub fn refresh_all(&mut self) -> Result<Vec<Dataset>, DashError> {
        let datasets = schema::REPORTS
            .iter()
            .copied()
            .map(|spec| self.load_report(spec))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            reports = datasets.len(),
            failures = self.failures.len(),
            "reports refreshed"
        );
        Ok(datasets)
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    /// Drop all cached results; the next load hits the database.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use std::cell::RefCell;
    use std::rc::Rc;

    /// Source serving a fixed row set, counting executions.
    struct CannedSource {
        rows: Vec<Vec<Cell>>,
        executed: Rc<RefCell<usize>>,
    }

    impl QuerySource for CannedSource {
        fn run_query(&mut self, _query: &str) -> Result<Vec<Vec<Cell>>, DashError> {
            *self.executed.borrow_mut() += 1;
            Ok(self.rows.clone())
        }
    }

    struct FailingSource;

    impl QuerySource for FailingSource {
        fn run_query(&mut self, query: &str) -> Result<Vec<Vec<Cell>>, DashError> {
            Err(DashError::Query {
                query: query.to_string(),
                message: "relation does not exist".to_string(),
            })
        }
    }

    #[test]
    fn cache_hit_does_not_touch_the_source() {
        let executed = Rc::new(RefCell::new(0));
        let mut loader = Loader::new(
            Box::new(CannedSource {
                rows: vec![vec![Cell::Int(1)]],
                executed: Rc::clone(&executed),
            }),
            Duration::from_secs(600),
        );
        let first = loader.load("SELECT 1");
        let second = loader.load("SELECT 1");
        assert_eq!(first, second);
        assert_eq!(*executed.borrow(), 1);

        loader.invalidate_cache();
        let third = loader.load("SELECT 1");
        assert_eq!(first, third);
        assert_eq!(*executed.borrow(), 2);
    }

    #[test]
    fn failing_query_degrades_to_empty_and_records_the_failure() {
        let mut loader = Loader::new(Box::new(FailingSource), Duration::from_secs(600));
        let rows = loader.load(queries::PRODUCTION_STATUS);
        assert!(rows.is_empty());
        assert_eq!(loader.failures().len(), 1);
        assert_eq!(loader.failures()[0].query, queries::PRODUCTION_STATUS);

        // The empty result is cached: no second failure within the TTL.
        let _ = loader.load(queries::PRODUCTION_STATUS);
        assert_eq!(loader.failures().len(), 1);
    }

    #[test]
    fn cached_failure_is_re_recorded_after_clearing_within_the_ttl() {
        let mut loader = Loader::new(Box::new(FailingSource), Duration::from_secs(600));
        let _ = loader.refresh_all().unwrap();
        assert_eq!(loader.failures().len(), schema::REPORTS.len());

        // A new refresh within the TTL serves the cached empty rows;
        // the failures must still be reported, exactly once each.
        loader.clear_failures();
        let _ = loader.refresh_all().unwrap();
        assert_eq!(loader.failures().len(), schema::REPORTS.len());
        assert_eq!(loader.failures()[0].query, queries::PRODUCTION_STATUS);
    }

    #[test]
    fn failing_source_still_yields_schema_valid_empty_datasets() {
        let mut loader = Loader::new(Box::new(FailingSource), Duration::from_secs(600));
        let datasets = loader.refresh_all().unwrap();
        assert_eq!(datasets.len(), schema::REPORTS.len());
        for ds in &datasets {
            assert_eq!(ds.height(), 0);
            for cspec in ds.spec().columns {
                assert!(ds.frame().column(cspec.name).is_ok());
            }
        }
        assert_eq!(loader.failures().len(), schema::REPORTS.len());
    }
}
