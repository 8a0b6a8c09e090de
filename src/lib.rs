//! Turns order PDFs into aggregated order tables and, optionally, a
//! post-sale inventory snapshot.
//!
//! The flow is: positioned tokens -> logical lines -> product/dimension
//! classification -> aggregation -> bedding-set / other-merchandise tables
//! -> inventory reconciliation.

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod error;
pub mod heuristics;
pub mod inventory;
pub mod lines;
pub mod pdf_extract;
pub mod pipeline;
pub mod spreadsheet;
pub mod tables;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{GeneratedFiles, Outcome, Pipeline};
