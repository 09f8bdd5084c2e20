//! Run orchestration
//!
//! Wires the data source, aggregator, and renderer into one generation run
//! with the ordering guarantees the CLI relies on: both fetches complete
//! before the destructive rebuild (so a transient source failure never
//! destroys a previously valid tree), and an empty detail result
//! short-circuits without touching the output tree at all.
//!
//! Progress lines go to stdout; they are part of the CLI contract.

use crate::aggregation::Aggregator;
use crate::error::Result;
use crate::render::{Renderer, Summary};
use crate::source::CostSource;
use std::path::Path;
use tracing::info;

/// Outcome of one generation run
#[derive(Debug)]
pub enum RunOutcome {
    /// The export returned no detail rows; the output tree was not touched.
    /// The CLI maps this to exit status 1.
    NoData,
    /// The tree was rebuilt from the fetched data
    Generated(Summary),
}

/// Fetch from `source`, aggregate, and rebuild the tree at `out_root`.
///
/// # Errors
///
/// Propagates any source or filesystem error; on a source error nothing
/// under `out_root` has been modified.
pub async fn run(
    source: &dyn CostSource,
    window_days: u32,
    out_root: &Path,
) -> Result<RunOutcome> {
    println!("[1] Fetching daily totals (accurate)...");
    let totals = source.fetch_daily_totals(window_days).await?;
    println!("    Got {} days of totals", totals.len());

    println!("[2] Fetching daily cost data (detailed)...");
    let rows = source.fetch_detail_rows(window_days).await?;
    println!("    Fetched {} cost entries", rows.len());

    if rows.is_empty() {
        println!("    No data fetched");
        return Ok(RunOutcome::NoData);
    }

    let mut dates: Vec<_> = rows.iter().filter_map(|r| r.usage_date).collect();
    dates.sort();
    dates.dedup();
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        println!("    Date range: {first} to {last} ({} days)", dates.len());
    }

    println!("[3] Generating directory structure...");
    let report = Aggregator::new().aggregate(&rows, Some(&totals));
    let summary = Renderer::new(out_root).render(&report)?;
    info!(resources = summary.resource_count, "render complete");

    Ok(RunOutcome::Generated(summary))
}
