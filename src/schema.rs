/// Column-name constants and declared report schemas for crop-dashkit.
/// Single source of truth - filters, views and exports address columns
/// by name, never by position.

// ── Production-status columns (qcp5 outcome per product) ────────────────────
pub mod production {
    pub const STATUS: &str = "status";
    pub const PRODUCT_WEIGHT: &str = "product_weight";
    pub const QCP5_TIMESTAMP: &str = "qcp5_timestamp";
}

// ── Shipment columns (packing-list products joined to clients) ──────────────
pub mod shipment {
    pub const COUNTRY: &str = "country";
    pub const CLIENT_COMPANY: &str = "client_company";
    pub const PRODUCT_WEIGHT: &str = "product_weight";
    pub const ORDER_ID: &str = "order_id";
    pub const CREATED_AT: &str = "created_at";
}

// ── Quality-control columns (reception + qcp1..qcp5 stages) ─────────────────
pub mod quality {
    pub const RECEPTION_ID: &str = "reception_id";
    pub const RECEPTION_QTY_REMOVED: &str = "reception_qty_removed";
    pub const QCP1_QTY_REMOVED: &str = "qcp1_qty_removed";
    pub const QCP2_QTY_REMOVED: &str = "qcp2_qty_removed";
    pub const QCP3_QTY_REMOVED: &str = "qcp3_qty_removed";
    pub const QCP4_WEIGHT_REJECTED: &str = "qcp4_weight_rejected";
    pub const QCP5_WEIGHT_REJECTED: &str = "qcp5_weight_rejected";
    pub const EXPORTER_NAME: &str = "exporter_name";
    pub const CROP_NAME: &str = "crop_name";
    pub const RECEPTION_QTY_REJECTED: &str = "reception_qty_rejected";
    pub const CREATED_AT: &str = "created_at";

    /// Wastage stage columns, in pipeline order. These are the melt
    /// value columns for the per-exporter wastage chart.
    pub const STAGES: [&str; 6] = [
        RECEPTION_QTY_REMOVED,
        QCP1_QTY_REMOVED,
        QCP2_QTY_REMOVED,
        QCP3_QTY_REMOVED,
        QCP4_WEIGHT_REJECTED,
        QCP5_WEIGHT_REJECTED,
    ];
}

// ── Traceability columns (reception forms joined to farms/districts) ────────
pub mod trace {
    pub const TRACEABILITY_CODE: &str = "traceability_code";
    pub const CROP_NAME: &str = "crop_name";
    pub const NET_WEIGHT: &str = "net_weight";
    pub const CREATED_AT: &str = "created_at";
    pub const DISTRICT: &str = "district";
}

// ── Export columns (per export company / per crop destination) ──────────────
pub mod export {
    pub const COUNTRY_NAME: &str = "country_name";
    pub const CROP_NAME: &str = "crop_name";
    pub const WEIGHT_RECEIVED: &str = "weight_received";
    pub const WEIGHT: &str = "weight";
    pub const EXPORT_COMPANY_NAME: &str = "export_company_name";
}

// ── Derived calendar columns ────────────────────────────────────────────────
pub mod derived {
    pub const YEAR: &str = "year";
    pub const MONTH_NUMBER: &str = "month_number";
    pub const MONTH: &str = "month";
}

// ── Melted (long-form) columns ──────────────────────────────────────────────
pub mod melted {
    pub const STAGE: &str = "Stage";
    pub const QUANTITY: &str = "Quantity";
}

/// Fixed month-abbreviation table indexed by month_number. Index 0 is
/// unused/invalid, matching calendar month numbering 1..=12.
pub const MONTH_ABBR: [&str; 13] = [
    "", "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

// ── Declared report schemas ─────────────────────────────────────────────────

/// Storage type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Int,
    Float,
    Timestamp,
}

/// One declared column. `fill_zero` marks numeric quantities whose
/// missing/null source values become exactly 0 during derivation.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
    pub fill_zero: bool,
}

const fn text(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        ty: ColumnType::Text,
        fill_zero: false,
    }
}

const fn int_filled(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        ty: ColumnType::Int,
        fill_zero: true,
    }
}

const fn float_filled(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        ty: ColumnType::Float,
        fill_zero: true,
    }
}

const fn timestamp(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        ty: ColumnType::Timestamp,
        fill_zero: false,
    }
}

/// Calendar columns derived from the report's timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarFields {
    None,
    YearOnly,
    YearAndMonth,
}

/// Declared schema of one report: its columns, which column drives the
/// calendar derivation, and which text columns act as filter dimensions.
#[derive(Debug)]
pub struct ReportSpec {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    pub timestamp_column: Option<&'static str>,
    pub calendar: CalendarFields,
    pub dimensions: &'static [&'static str],
}

impl ReportSpec {
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn has_year(&self) -> bool {
        !matches!(self.calendar, CalendarFields::None)
    }
}

pub const PRODUCTION_STATUS: ReportSpec = ReportSpec {
    name: "production_status",
    columns: &[
        text(production::STATUS),
        int_filled(production::PRODUCT_WEIGHT),
        timestamp(production::QCP5_TIMESTAMP),
    ],
    timestamp_column: Some(production::QCP5_TIMESTAMP),
    calendar: CalendarFields::YearAndMonth,
    dimensions: &[production::STATUS],
};

pub const SHIPMENTS: ReportSpec = ReportSpec {
    name: "shipments",
    columns: &[
        text(shipment::COUNTRY),
        text(shipment::CLIENT_COMPANY),
        int_filled(shipment::PRODUCT_WEIGHT),
        int_filled(shipment::ORDER_ID),
        timestamp(shipment::CREATED_AT),
    ],
    timestamp_column: Some(shipment::CREATED_AT),
    calendar: CalendarFields::YearAndMonth,
    dimensions: &[shipment::COUNTRY],
};

pub const QUALITY_CONTROL: ReportSpec = ReportSpec {
    name: "quality_control",
    columns: &[
        int_filled(quality::RECEPTION_ID),
        float_filled(quality::RECEPTION_QTY_REMOVED),
        float_filled(quality::QCP1_QTY_REMOVED),
        float_filled(quality::QCP2_QTY_REMOVED),
        float_filled(quality::QCP3_QTY_REMOVED),
        float_filled(quality::QCP4_WEIGHT_REJECTED),
        float_filled(quality::QCP5_WEIGHT_REJECTED),
        text(quality::EXPORTER_NAME),
        text(quality::CROP_NAME),
        float_filled(quality::RECEPTION_QTY_REJECTED),
        timestamp(quality::CREATED_AT),
    ],
    timestamp_column: Some(quality::CREATED_AT),
    calendar: CalendarFields::YearAndMonth,
    dimensions: &[quality::CROP_NAME, quality::EXPORTER_NAME],
};

pub const TRACEABILITY: ReportSpec = ReportSpec {
    name: "traceability",
    columns: &[
        text(trace::TRACEABILITY_CODE),
        text(trace::CROP_NAME),
        int_filled(trace::NET_WEIGHT),
        timestamp(trace::CREATED_AT),
        text(trace::DISTRICT),
    ],
    timestamp_column: Some(trace::CREATED_AT),
    calendar: CalendarFields::YearOnly,
    dimensions: &[trace::DISTRICT, trace::CROP_NAME],
};

pub const EXPORT_DETAILS: ReportSpec = ReportSpec {
    name: "export_details",
    columns: &[
        text(export::COUNTRY_NAME),
        text(export::CROP_NAME),
        float_filled(export::WEIGHT_RECEIVED),
        float_filled(export::WEIGHT),
        text(export::EXPORT_COMPANY_NAME),
    ],
    timestamp_column: None,
    calendar: CalendarFields::None,
    dimensions: &[export::EXPORT_COMPANY_NAME, export::CROP_NAME],
};

pub const CROP_EXPORTS: ReportSpec = ReportSpec {
    name: "crop_exports",
    columns: &[
        text(export::CROP_NAME),
        float_filled(export::WEIGHT_RECEIVED),
        float_filled(export::WEIGHT),
        text(export::COUNTRY_NAME),
    ],
    timestamp_column: None,
    calendar: CalendarFields::None,
    dimensions: &[export::CROP_NAME, export::COUNTRY_NAME],
};

/// All declared reports, in load order.
pub const REPORTS: [&ReportSpec; 6] = [
    &PRODUCTION_STATUS,
    &SHIPMENTS,
    &QUALITY_CONTROL,
    &TRACEABILITY,
    &EXPORT_DETAILS,
    &CROP_EXPORTS,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_abbr_table_is_fixed_and_uppercase() {
        assert_eq!(MONTH_ABBR.len(), 13);
        assert_eq!(MONTH_ABBR[0], "");
        assert_eq!(MONTH_ABBR[1], "JAN");
        assert_eq!(MONTH_ABBR[7], "JUL");
        assert_eq!(MONTH_ABBR[12], "DEC");
        for abbr in &MONTH_ABBR[1..] {
            assert_eq!(*abbr, abbr.to_uppercase());
            assert_eq!(abbr.len(), 3);
        }
    }

    #[test]
    fn every_timestamped_report_declares_its_column() {
        for spec in REPORTS {
            match spec.calendar {
                CalendarFields::None => assert!(spec.timestamp_column.is_none()),
                _ => {
                    let ts = spec.timestamp_column.expect("timestamp column");
                    assert!(spec.columns.iter().any(|c| c.name == ts));
                }
            }
        }
    }

    #[test]
    fn dimensions_are_declared_text_columns() {
        for spec in REPORTS {
            for dim in spec.dimensions {
                let col = spec
                    .columns
                    .iter()
                    .find(|c| c.name == *dim)
                    .expect("dimension column declared");
                assert_eq!(col.ty, ColumnType::Text);
            }
        }
    }
}
