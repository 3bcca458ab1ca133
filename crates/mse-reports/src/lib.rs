//! # mse-reports
//!
//! Read-only reporting over evaluation rows.
//!
//! - [`accuracy`]: per-clinician and overall accuracy, confidence
//!   distribution, and the clinician ranking
//! - [`export`]: JSON export of selected evaluations
//! - [`dashboard`]: the admin panel payload
//!
//! Everything here is a pure function of rows already loaded from the
//! store; nothing performs I/O.

pub mod accuracy;
pub mod dashboard;
pub mod export;

pub use accuracy::{
    build_report, format_percentage, AccuracyReport, AccuracySummary, ClinicianStats,
    ConfidenceDistribution, KindAccuracy, RatingShare, Tally,
};
pub use dashboard::{AdminDashboard, Totals};
pub use export::{
    build_export, export_filename, format_timestamp, to_json, ExportClinician, ExportRecord,
};
