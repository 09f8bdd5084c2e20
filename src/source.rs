//! Data source contract
//!
//! The warehouse is an external collaborator behind the [`CostSource`] trait:
//! one call for the detailed per-resource rows, one for the authoritative
//! per-date totals the aggregator reconciles against. Both calls are blocking
//! request/response with no partial results; a failure is fatal for the run.
//!
//! The production implementation is [`crate::bigquery::BigQuerySource`].
//! Tests substitute in-memory sources.

use crate::error::Result;
use crate::types::{CostRow, DailyTotals};
use async_trait::async_trait;

/// Default lookback window for both queries, in days
pub const DEFAULT_WINDOW_DAYS: u32 = 45;

/// A source of billing cost data
#[async_trait]
pub trait CostSource {
    /// Fetch detailed rows per (date, project, service, resource) for the
    /// trailing `window_days`. Rows with zero net cost are excluded by the
    /// source itself.
    async fn fetch_detail_rows(&self, window_days: u32) -> Result<Vec<CostRow>>;

    /// Fetch authoritative daily totals (no per-resource grouping) for the
    /// trailing `window_days`.
    async fn fetch_daily_totals(&self, window_days: u32) -> Result<DailyTotals>;
}
