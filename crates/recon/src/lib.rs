//! `certwatch-recon`: expiry tracking reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns the report bundle
//! and a summary. File formats live behind the [`source::TableSource`] and
//! [`source::ReportSink`] traits; see `certwatch-io`.

pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod report;
pub mod resolve;
pub mod source;
pub mod table;

pub use config::ReconConfig;
pub use engine::{run, run_with};
pub use error::ReconError;
pub use model::{Diagnostic, ReconInput, ReconResult, ReportBundle};
pub use source::{ReportSink, TableSource};
pub use table::{CellValue, Table};
