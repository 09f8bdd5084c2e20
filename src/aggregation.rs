//! Aggregation module for summarizing billing rows
//!
//! This module folds the flat stream of billing line items into per-resource
//! aggregates with daily, rolling-window, and all-time sums, and reconciles
//! the detailed rows against the authoritative daily totals: any per-date gap
//! beyond the tolerance becomes a synthetic `_unallocated_` aggregate.
//!
//! Monetary values accumulate at full precision here; rounding to two
//! decimals happens only when documents are serialized in [`crate::render`].
//!
//! # Examples
//!
//! ```
//! use costtree::aggregation::Aggregator;
//! use costtree::types::{CostRow, UsageDate};
//!
//! let rows = vec![CostRow {
//!     usage_date: Some("2024-01-01".parse().unwrap()),
//!     project_id: Some("p1".to_string()),
//!     project_name: Some("Project One".to_string()),
//!     service_name: Some("Compute Engine".to_string()),
//!     resource_name: Some("vm-a".to_string()),
//!     net_cost: 10.0,
//!     currency: Some("USD".to_string()),
//! }];
//!
//! let report = Aggregator::new().aggregate(&rows, None);
//! assert_eq!(report.resources.len(), 1);
//! ```

use crate::render::sanitize_name;
use crate::types::{CostRow, DailyTotals, UNKNOWN_PROJECT, UNKNOWN_RESOURCE, UsageDate};
use std::collections::{BTreeMap, BTreeSet};

/// Map key and document directory name of the synthetic reconciliation aggregate
pub const UNALLOCATED_KEY: &str = "_unallocated_";

/// Category label attached to the synthetic reconciliation aggregate
pub const UNALLOCATED_CATEGORY: &str = "Unallocated";

/// Per-date gaps smaller than this (absolute, in currency units) are treated
/// as rounding noise and not surfaced as unallocated cost.
pub const RECONCILE_TOLERANCE: f64 = 0.01;

/// Default rolling window length in calendar days
pub const DEFAULT_ROLLING_WINDOW_DAYS: u32 = 30;

/// Per-resource cost aggregate
///
/// Built incrementally by folding rows sharing a resource key. The synthetic
/// `_unallocated_` aggregate uses the same shape with no project attribution.
#[derive(Debug, Clone, Default)]
pub struct ResourceAggregate {
    /// Canonical display name
    pub resource_name: String,
    /// Owning project id (None for the unallocated aggregate)
    pub project_id: Option<String>,
    /// Owning project display name
    pub project_name: Option<String>,
    /// Every service name ever seen for this resource, window or not
    pub categories: BTreeSet<String>,
    /// Per-service cost restricted to the rolling window
    pub category_costs: BTreeMap<String, f64>,
    /// Cost per date, full precision
    pub daily_costs: BTreeMap<UsageDate, f64>,
    /// All-time cost
    pub total_cost: f64,
    /// Cost restricted to the rolling window
    pub rolling_cost: f64,
}

/// Result of one aggregation pass
#[derive(Debug, Clone)]
pub struct CostReport {
    /// Aggregates keyed by sanitized resource identity; BTreeMap so every
    /// downstream iteration is deterministic
    pub resources: BTreeMap<String, ResourceAggregate>,
    /// Currency shared by the rows ("USD" when absent or mixed)
    pub currency: String,
    /// Earliest date present in the data
    pub data_start: UsageDate,
    /// Latest date present in the data
    pub data_end: UsageDate,
    /// Rolling window cutoff: dates at or after this count toward rolling sums
    pub cutoff: UsageDate,
}

/// Folds billing rows into per-resource aggregates
#[derive(Debug, Clone)]
pub struct Aggregator {
    rolling_window_days: u32,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    /// Create an aggregator with the default 30-day rolling window
    pub fn new() -> Self {
        Self {
            rolling_window_days: DEFAULT_ROLLING_WINDOW_DAYS,
        }
    }

    /// Override the rolling window length
    pub fn with_rolling_window(mut self, days: u32) -> Self {
        self.rolling_window_days = days;
        self
    }

    /// Aggregate rows into a [`CostReport`], reconciling against
    /// `authoritative_totals` when supplied.
    pub fn aggregate(
        &self,
        rows: &[CostRow],
        authoritative_totals: Option<&DailyTotals>,
    ) -> CostReport {
        let (data_start, data_end) = Self::date_range(rows, authoritative_totals);
        let cutoff = data_end.minus_days(self.rolling_window_days);

        let mut resources: BTreeMap<String, ResourceAggregate> = BTreeMap::new();
        for row in rows {
            let key = Self::resource_key(row);
            let aggregate = resources
                .entry(key)
                .or_insert_with(|| Self::new_aggregate(row));

            if let Some(service) = row.service_name.as_deref().filter(|s| !s.is_empty()) {
                aggregate.categories.insert(service.to_string());
                let in_window = aggregate
                    .category_costs
                    .entry(service.to_string())
                    .or_insert(0.0);
                if row.usage_date.is_some_and(|date| date >= cutoff) {
                    *in_window += row.net_cost;
                }
            }

            if let Some(date) = row.usage_date {
                *aggregate.daily_costs.entry(date).or_insert(0.0) += row.net_cost;
                if date >= cutoff {
                    aggregate.rolling_cost += row.net_cost;
                }
            }
            aggregate.total_cost += row.net_cost;
        }

        if let Some(totals) = authoritative_totals {
            Self::reconcile(&mut resources, totals, cutoff);
        }

        CostReport {
            currency: Self::currency(rows),
            resources,
            data_start,
            data_end,
            cutoff,
        }
    }

    /// Derive the aggregate key for a row.
    ///
    /// Named resources key on the sanitized name alone, so identical names in
    /// different projects merge (the export's existing grouping, preserved for
    /// compatibility). Unknown resources key per project so unattributed cost
    /// stays separated.
    fn resource_key(row: &CostRow) -> String {
        if row.is_unknown_resource() {
            let project = row.project_id.as_deref().unwrap_or(UNKNOWN_PROJECT);
            format!("{}_{}", sanitize_name(project), UNKNOWN_RESOURCE)
        } else {
            sanitize_name(row.resource_name.as_deref().unwrap_or_default())
        }
    }

    fn new_aggregate(row: &CostRow) -> ResourceAggregate {
        let resource_name = if row.is_unknown_resource() {
            format!(
                "{UNKNOWN_RESOURCE} ({})",
                row.project_id.as_deref().unwrap_or(UNKNOWN_PROJECT)
            )
        } else {
            row.resource_name.clone().unwrap_or_default()
        };
        ResourceAggregate {
            resource_name,
            // Rows without a project still get a non-null owning group so the
            // by-project index has somewhere to link them.
            project_id: Some(
                row.project_id
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
            ),
            project_name: row.project_name.clone(),
            ..ResourceAggregate::default()
        }
    }

    /// Compare per-date detailed sums against the authoritative totals and
    /// collect any gap beyond the tolerance into the `_unallocated_` aggregate.
    fn reconcile(
        resources: &mut BTreeMap<String, ResourceAggregate>,
        authoritative_totals: &DailyTotals,
        cutoff: UsageDate,
    ) {
        let mut detailed_by_day: BTreeMap<UsageDate, f64> = BTreeMap::new();
        for aggregate in resources.values() {
            for (&date, &cost) in &aggregate.daily_costs {
                *detailed_by_day.entry(date).or_insert(0.0) += cost;
            }
        }

        let mut unallocated = ResourceAggregate {
            resource_name: UNALLOCATED_KEY.to_string(),
            ..ResourceAggregate::default()
        };
        for (&date, &authoritative) in authoritative_totals {
            let detailed = detailed_by_day.get(&date).copied().unwrap_or(0.0);
            let diff = authoritative - detailed;
            if diff.abs() > RECONCILE_TOLERANCE {
                // Daily values surface pre-rounded; totals keep full precision
                unallocated
                    .daily_costs
                    .insert(date, (diff * 100.0).round() / 100.0);
                unallocated.total_cost += diff;
                if date >= cutoff {
                    unallocated.rolling_cost += diff;
                }
            }
        }

        if !unallocated.daily_costs.is_empty() {
            unallocated
                .categories
                .insert(UNALLOCATED_CATEGORY.to_string());
            resources.insert(UNALLOCATED_KEY.to_string(), unallocated);
        }
    }

    /// The [min, max] dates present in rows and totals; collapses to today
    /// when no date exists anywhere.
    fn date_range(rows: &[CostRow], totals: Option<&DailyTotals>) -> (UsageDate, UsageDate) {
        let row_dates = rows.iter().filter_map(|row| row.usage_date);
        let total_dates = totals.into_iter().flat_map(|t| t.keys().copied());
        let mut dates = row_dates.chain(total_dates);

        match dates.next() {
            None => {
                let today = UsageDate::today();
                (today, today)
            }
            Some(first) => dates.fold((first, first), |(start, end), date| {
                (start.min(date), end.max(date))
            }),
        }
    }

    /// Billing accounts are single-currency; fall back to USD when the rows
    /// disagree or carry none.
    fn currency(rows: &[CostRow]) -> String {
        let currencies: BTreeSet<&str> = rows
            .iter()
            .filter_map(|row| row.currency.as_deref())
            .collect();
        match currencies.len() {
            1 => currencies.into_iter().next().unwrap_or("USD").to_string(),
            _ => "USD".to_string(),
        }
    }
}
