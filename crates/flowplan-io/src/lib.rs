//! # flowplan-io
//!
//! Import/export for the flowplan scheduling engine: JSON (native
//! round-trip format), CSV (flat spreadsheet interchange), and MS-Project
//! MSPDI XML.
//!
//! - [`json`] — `{version, exportedAt, tasks, links}`, lossless round-trip.
//! - [`csv`] — RFC-4180 rows over a fixed column set, lossy by design.
//! - [`mspdi`] — MS-Project's XML interchange format.
//!
//! Malformed input raises [`ImportError`] synchronously; there is no
//! partial-import or best-effort recovery path.

pub mod csv;
pub mod json;
pub mod mspdi;

pub use csv::{export_csv, import_csv, CsvExportOptions};
pub use json::{export_json, import_json, JsonExportOptions};
pub use mspdi::{export_mspdi, import_mspdi};

use thiserror::Error;

/// Failure to parse or serialize one of the supported interchange formats.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("json error: {0}")]
    Json(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("xml error: {0}")]
    Xml(String),
}
