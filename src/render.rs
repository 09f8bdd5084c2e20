//! Filesystem rendering of a cost report
//!
//! Materializes a [`CostReport`] as a browsable tree:
//!
//! ```text
//! <out_root>/
//! ├── by-resource/{resource}/cost.json   canonical documents
//! ├── by-project/{project}/{resource}    symlinks into by-resource
//! ├── by-service/{service}/{resource}    symlinks into by-resource
//! └── summary.json
//! ```
//!
//! The tree is destroyed and rebuilt from scratch on every run, so the
//! filesystem always reflects exactly the current report. All monetary values
//! round to two decimals here, at the serialization boundary. Output is
//! byte-reproducible for identical input apart from the generation date.

use crate::aggregation::{CostReport, ResourceAggregate};
use crate::error::Result;
use crate::types::UsageDate;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provider tag stamped into every document
pub const PROVIDER: &str = "gcp";

/// Source tag stamped into the summary
pub const SOURCE: &str = "bigquery-export";

/// How many resources the summary ranks by rolling cost
pub const TOP_RESOURCE_COUNT: usize = 20;

/// Make a raw name safe as a single path segment.
///
/// Replaces `/`, `\`, `:`, and spaces with underscores; an empty name becomes
/// the literal `_unknown_` token. Names differing only in replaced characters
/// may collide; that is a documented limitation of the layout.
pub fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return crate::types::UNKNOWN_RESOURCE.to_string();
    }
    name.replace(['/', '\\', ':', ' '], "_")
}

/// Round at the serialization boundary only
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Serialize a pre-ordered list of pairs as a JSON object, preserving order
fn ordered_map<S, V>(entries: &[(String, V)], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
}

/// Inclusive date range covered by the data
#[derive(Debug, Clone, Serialize)]
pub struct DataRange {
    /// Earliest date
    pub start: String,
    /// Latest date
    pub end: String,
}

/// Provider-specific identifiers carried on each resource document
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMetadata {
    /// Owning project id
    pub project_id: Option<String>,
    /// Owning project display name
    pub project_name: Option<String>,
}

/// Canonical per-resource document (`cost.json`)
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDocument {
    /// Provider tag
    pub provider: String,
    /// Display name
    pub resource_name: String,
    /// Owning group (project id); null only for the unallocated aggregate
    pub resource_group: Option<String>,
    /// Rolling-window cost, rounded
    pub rolling_30d_cost: f64,
    /// All-time cost, rounded
    pub total_cost: f64,
    /// Sorted category names
    pub categories: Vec<String>,
    /// ISO currency code
    pub currency: String,
    /// Generation date
    pub last_updated: String,
    /// Date range of the underlying data
    pub data_range: DataRange,
    /// Per-date costs, rounded, descending by date
    #[serde(serialize_with = "ordered_map")]
    pub daily_costs: Vec<(String, f64)>,
    /// Provider-specific identifiers
    pub provider_metadata: ProviderMetadata,
}

/// Summary entry for a top-ranked resource
#[derive(Debug, Clone, Serialize)]
pub struct TopResource {
    /// Sanitized resource identity
    pub name: String,
    /// Rolling-window cost, rounded
    pub rolling_30d_cost: f64,
}

/// Root `summary.json` document
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Provider tag
    pub provider: String,
    /// Source tag
    pub source: String,
    /// ISO currency code
    pub currency: String,
    /// Generation date
    pub date: String,
    /// Rolling-window total across all resources, rounded
    pub rolling_30d_cost: f64,
    /// All-time total across all resources, rounded
    pub total_all_time_cost: f64,
    /// Date range of the underlying data
    pub data_range: DataRange,
    /// Rolling window cutoff date
    pub rolling_30d_cutoff: String,
    /// Number of resource aggregates (synthetic one included)
    pub resource_count: usize,
    /// Number of distinct categories
    pub category_count: usize,
    /// Number of distinct owning projects
    pub project_count: usize,
    /// Top resources by rolling cost, descending
    pub top_20_resources: Vec<TopResource>,
    /// Per-date totals, rounded, descending by date
    #[serde(serialize_with = "ordered_map")]
    pub daily_totals: Vec<(String, f64)>,
    /// Per-category rolling-window totals, rounded, descending by cost
    #[serde(serialize_with = "ordered_map")]
    pub by_category: Vec<(String, f64)>,
}

/// Renders a [`CostReport`] into a directory tree
#[derive(Debug, Clone)]
pub struct Renderer {
    out_root: PathBuf,
}

impl Renderer {
    /// Create a renderer targeting `out_root`
    pub fn new(out_root: impl Into<PathBuf>) -> Self {
        Self {
            out_root: out_root.into(),
        }
    }

    /// Output tree root
    pub fn out_root(&self) -> &Path {
        &self.out_root
    }

    /// Destroy and rebuild the output tree from `report`.
    ///
    /// # Errors
    ///
    /// Any filesystem error aborts the run; no partial-success reporting.
    pub fn render(&self, report: &CostReport) -> Result<Summary> {
        let today = UsageDate::today().to_string();

        if self.out_root.exists() {
            fs::remove_dir_all(&self.out_root)?;
        }
        let by_resource = self.out_root.join("by-resource");
        let by_project = self.out_root.join("by-project");
        let by_service = self.out_root.join("by-service");
        fs::create_dir_all(&by_resource)?;
        fs::create_dir_all(&by_project)?;
        fs::create_dir_all(&by_service)?;

        let data_range = DataRange {
            start: report.data_start.to_string(),
            end: report.data_end.to_string(),
        };

        let mut projects_seen: BTreeSet<Option<String>> = BTreeSet::new();
        let mut services_seen: BTreeSet<String> = BTreeSet::new();

        for (key, aggregate) in &report.resources {
            let resource_dir = by_resource.join(key);
            fs::create_dir_all(&resource_dir)?;

            let document = Self::resource_document(aggregate, report, &data_range, &today);
            write_json(&resource_dir.join("cost.json"), &document)?;

            let link_target = Path::new("../../by-resource").join(key);

            let project_dir = by_project.join(sanitize_name(
                aggregate.project_id.as_deref().unwrap_or_default(),
            ));
            fs::create_dir_all(&project_dir)?;
            link_into(&project_dir.join(key), &link_target)?;
            projects_seen.insert(aggregate.project_id.clone());

            for category in &aggregate.categories {
                let service_dir = by_service.join(sanitize_name(category));
                fs::create_dir_all(&service_dir)?;
                link_into(&service_dir.join(key), &link_target)?;
                services_seen.insert(category.clone());
            }
        }

        let summary = Self::summary(
            report,
            &data_range,
            &today,
            projects_seen.len(),
            services_seen.len(),
        );
        write_json(&self.out_root.join("summary.json"), &summary)?;

        debug!(
            resources = summary.resource_count,
            root = %self.out_root.display(),
            "rendered cost tree"
        );
        Ok(summary)
    }

    fn resource_document(
        aggregate: &ResourceAggregate,
        report: &CostReport,
        data_range: &DataRange,
        today: &str,
    ) -> ResourceDocument {
        // Descending by date
        let daily_costs = aggregate
            .daily_costs
            .iter()
            .rev()
            .map(|(date, &cost)| (date.to_string(), round2(cost)))
            .collect();

        ResourceDocument {
            provider: PROVIDER.to_string(),
            resource_name: aggregate.resource_name.clone(),
            resource_group: aggregate.project_id.clone(),
            rolling_30d_cost: round2(aggregate.rolling_cost),
            total_cost: round2(aggregate.total_cost),
            categories: aggregate.categories.iter().cloned().collect(),
            currency: report.currency.clone(),
            last_updated: today.to_string(),
            data_range: data_range.clone(),
            daily_costs,
            provider_metadata: ProviderMetadata {
                project_id: aggregate.project_id.clone(),
                project_name: aggregate.project_name.clone(),
            },
        }
    }

    fn summary(
        report: &CostReport,
        data_range: &DataRange,
        today: &str,
        project_count: usize,
        category_count: usize,
    ) -> Summary {
        let rolling_total: f64 = report.resources.values().map(|r| r.rolling_cost).sum();
        let all_time_total: f64 = report.resources.values().map(|r| r.total_cost).sum();

        // Stable sort keeps key order for equal rolling costs
        let mut ranked: Vec<(&String, &ResourceAggregate)> = report.resources.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.rolling_cost
                .partial_cmp(&a.1.rolling_cost)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let top_20_resources = ranked
            .into_iter()
            .take(TOP_RESOURCE_COUNT)
            .map(|(name, aggregate)| TopResource {
                name: name.clone(),
                rolling_30d_cost: round2(aggregate.rolling_cost),
            })
            .collect();

        let mut daily_totals: BTreeMap<UsageDate, f64> = BTreeMap::new();
        for aggregate in report.resources.values() {
            for (&date, &cost) in &aggregate.daily_costs {
                *daily_totals.entry(date).or_insert(0.0) += cost;
            }
        }
        let daily_totals = daily_totals
            .iter()
            .rev()
            .map(|(date, &cost)| (date.to_string(), round2(cost)))
            .collect();

        let mut by_category: BTreeMap<String, f64> = BTreeMap::new();
        for aggregate in report.resources.values() {
            for (category, &cost) in &aggregate.category_costs {
                *by_category.entry(category.clone()).or_insert(0.0) += cost;
            }
        }
        let mut by_category: Vec<(String, f64)> = by_category
            .into_iter()
            .map(|(category, cost)| (category, round2(cost)))
            .collect();
        by_category.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Summary {
            provider: PROVIDER.to_string(),
            source: SOURCE.to_string(),
            currency: report.currency.clone(),
            date: today.to_string(),
            rolling_30d_cost: round2(rolling_total),
            total_all_time_cost: round2(all_time_total),
            data_range: data_range.clone(),
            rolling_30d_cutoff: report.cutoff.to_string(),
            resource_count: report.resources.len(),
            category_count,
            project_count,
            top_20_resources,
            daily_totals,
            by_category,
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// Create a non-duplicating cross-reference entry pointing at the canonical
/// document directory. Existing entries are left alone so a partial re-run
/// does not error.
#[cfg(unix)]
fn link_into(link: &Path, target: &Path) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        return Ok(());
    }
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

/// Fallback for targets without symbolic links: a redirect file naming the
/// canonical relative path, preserving the by-project/by-service traversal.
#[cfg(not(unix))]
fn link_into(link: &Path, target: &Path) -> Result<()> {
    if link.exists() {
        return Ok(());
    }
    fs::write(link, format!("{}\n", target.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("vm-a"), "vm-a");
        assert_eq!(sanitize_name("a/b\\c:d e"), "a_b_c_d_e");
        assert_eq!(sanitize_name(""), "_unknown_");
        assert_eq!(sanitize_name("Compute Engine"), "Compute_Engine");
    }

    #[test]
    fn test_sanitize_preserves_distinctness_outside_replaced_set() {
        assert_ne!(sanitize_name("vm-a"), sanitize_name("vm-b"));
        // Names differing only in replaced characters legitimately collide
        assert_eq!(sanitize_name("a b"), sanitize_name("a:b"));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(1.006), 1.01);
        assert_eq!(round2(-2.499), -2.5);
        assert_eq!(round2(10.0), 10.0);
    }

    #[test]
    fn test_ordered_map_serialization_preserves_order() {
        #[derive(Serialize)]
        struct Doc {
            #[serde(serialize_with = "ordered_map")]
            entries: Vec<(String, f64)>,
        }

        let doc = Doc {
            entries: vec![
                ("2024-01-02".to_string(), 2.0),
                ("2024-01-01".to_string(), 1.0),
            ],
        };
        let json = serde_json::to_string(&doc).unwrap();
        let first = json.find("2024-01-02").unwrap();
        let second = json.find("2024-01-01").unwrap();
        assert!(first < second);
    }
}
