//! Core domain types for costtree
//!
//! This module contains the fundamental types shared between the data source
//! and the aggregation/rendering pipeline: calendar dates, billing line items,
//! and the authoritative daily totals used for reconciliation.

use crate::error::{CosttreeError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sentinel resource name emitted by the billing export for rows that carry
/// no resource attribution.
pub const UNKNOWN_RESOURCE: &str = "_unknown_";

/// Sentinel project id for rows that carry no project attribution.
pub const UNKNOWN_PROJECT: &str = "_unknown_project_";

/// Calendar date a cost was incurred on
///
/// Thin wrapper around `chrono::NaiveDate` so dates order and serialize
/// consistently (`YYYY-MM-DD`) everywhere they appear: aggregation keys,
/// JSON documents, and path-free comparisons against the rolling cutoff.
///
/// # Examples
/// ```
/// use costtree::types::UsageDate;
///
/// let date: UsageDate = "2024-01-15".parse().unwrap();
/// assert_eq!(date.to_string(), "2024-01-15");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UsageDate(NaiveDate);

impl UsageDate {
    /// Create a new UsageDate
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Today's date in UTC
    pub fn today() -> Self {
        Self(chrono::Utc::now().date_naive())
    }

    /// Get the inner NaiveDate
    pub fn inner(&self) -> &NaiveDate {
        &self.0
    }

    /// Calendar subtraction
    pub fn minus_days(&self, days: u32) -> Self {
        Self(self.0 - chrono::Duration::days(i64::from(days)))
    }
}

impl fmt::Display for UsageDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for UsageDate {
    type Err = CosttreeError;

    fn from_str(s: &str) -> Result<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| CosttreeError::InvalidDate(s.to_string()))
    }
}

/// A single billing line item from the warehouse export
///
/// One row per (date, project, service, resource) group as produced by the
/// detail query. Rows with zero net cost are filtered upstream and never
/// reach the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRow {
    /// Date the usage was incurred on (absent for rows the export could not date)
    pub usage_date: Option<UsageDate>,
    /// Owning project id
    pub project_id: Option<String>,
    /// Owning project display name
    pub project_name: Option<String>,
    /// Billed service, e.g. "Compute Engine"
    pub service_name: Option<String>,
    /// Resource name; `None` or `"_unknown_"` means unattributed
    pub resource_name: Option<String>,
    /// Net cost after credits
    pub net_cost: f64,
    /// ISO currency code for this line item
    pub currency: Option<String>,
}

impl CostRow {
    /// Whether this row lacks a usable resource attribution
    pub fn is_unknown_resource(&self) -> bool {
        match self.resource_name.as_deref() {
            None | Some(UNKNOWN_RESOURCE) | Some("") => true,
            Some(_) => false,
        }
    }
}

/// Authoritative per-date totals, computed by the warehouse without any
/// per-resource grouping. Used to surface unallocated cost.
pub type DailyTotals = BTreeMap<UsageDate, f64>;
