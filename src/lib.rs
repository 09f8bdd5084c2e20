//! costtree - Generate a browsable cost tree from a GCP BigQuery billing export
//!
//! This library provides functionality to:
//! - Fetch detailed billing rows and authoritative daily totals from BigQuery
//! - Aggregate costs per resource over rolling and all-time windows
//! - Reconcile detailed rows against authoritative totals (unallocated cost)
//! - Materialize the result as JSON documents plus symlink cross-indexes
//!
//! # Examples
//!
//! ```no_run
//! use costtree::{
//!     bigquery::BigQuerySource,
//!     config::BillingExportConfig,
//!     pipeline::{self, RunOutcome},
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> costtree::Result<()> {
//!     let config = BillingExportConfig::from_env()?;
//!     let source = BigQuerySource::from_env(config)?;
//!
//!     match pipeline::run(&source, 45, Path::new("costs/gcp")).await? {
//!         RunOutcome::NoData => eprintln!("no billing rows in window"),
//!         RunOutcome::Generated(summary) => {
//!             println!("rolling 30d: {:.2}", summary.rolling_30d_cost);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod bigquery;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use error::{CosttreeError, Result};
pub use types::{CostRow, DailyTotals, UsageDate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
