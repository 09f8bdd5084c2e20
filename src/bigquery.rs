//! BigQuery data source
//!
//! Implements [`CostSource`] over the BigQuery REST API (`jobs.query` plus
//! `getQueryResults` for pagination and slow jobs). Two aggregate queries run
//! against the billing export table: a detailed one grouped by
//! (date, project, service, resource) and an authoritative per-date one used
//! for reconciliation. Net cost is usage cost plus all credits, and zero-cost
//! groups are filtered inside the query.
//!
//! Credential acquisition is delegated to the environment: the caller
//! provides a ready OAuth2 access token (`GCP_ACCESS_TOKEN`), typically from
//! `gcloud auth print-access-token` or a metadata server.

use crate::config::BillingExportConfig;
use crate::error::{CosttreeError, Result};
use crate::source::CostSource;
use crate::types::{CostRow, DailyTotals, UNKNOWN_RESOURCE, UsageDate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable supplying the OAuth2 bearer token
pub const ENV_ACCESS_TOKEN: &str = "GCP_ACCESS_TOKEN";

const BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Per-request server-side wait before the response returns with
/// `jobComplete: false` and polling takes over.
const QUERY_TIMEOUT_MS: u64 = 60_000;

const PAGE_SIZE: u64 = 10_000;

/// BigQuery-backed cost source
pub struct BigQuerySource {
    config: BillingExportConfig,
    access_token: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    timeout_ms: u64,
    max_results: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    #[serde(default)]
    rows: Vec<TableRow>,
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// Positional row as returned by the REST API: one cell per selected column,
/// every scalar encoded as a JSON string.
#[derive(Debug, Deserialize)]
pub(crate) struct TableRow {
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    v: Option<serde_json::Value>,
}

impl TableRow {
    fn cell_str(&self, index: usize) -> Option<&str> {
        self.f
            .get(index)
            .and_then(|cell| cell.v.as_ref())
            .and_then(|value| value.as_str())
    }

    fn cell_f64(&self, index: usize) -> Result<f64> {
        let raw = self
            .cell_str(index)
            .ok_or_else(|| CosttreeError::Query(format!("missing numeric cell {index}")))?;
        raw.parse::<f64>()
            .map_err(|_| CosttreeError::Query(format!("non-numeric cell value: {raw}")))
    }
}

impl BigQuerySource {
    /// Create a source with an explicit access token
    pub fn new(config: BillingExportConfig, access_token: String) -> Self {
        Self {
            config,
            access_token,
            client: reqwest::Client::new(),
        }
    }

    /// Create a source taking the access token from `GCP_ACCESS_TOKEN`
    pub fn from_env(config: BillingExportConfig) -> Result<Self> {
        let token = std::env::var(ENV_ACCESS_TOKEN)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CosttreeError::Config(format!(
                    "missing required environment variables: {ENV_ACCESS_TOKEN}"
                ))
            })?;
        Ok(Self::new(config, token))
    }

    fn detail_sql(&self, window_days: u32) -> String {
        format!(
            "SELECT \
               DATE(usage_start_time) AS usage_date, \
               project.id AS project_id, \
               project.name AS project_name, \
               service.description AS service_name, \
               resource.name AS resource_name, \
               ROUND(SUM(cost) + SUM(IFNULL((SELECT SUM(c.amount) FROM UNNEST(credits) c), 0)), 4) AS net_cost, \
               currency \
             FROM {table} \
             WHERE DATE(usage_start_time) >= DATE_SUB(CURRENT_DATE(), INTERVAL {window_days} DAY) \
             GROUP BY usage_date, project_id, project_name, service_name, resource_name, currency \
             HAVING net_cost != 0 \
             ORDER BY usage_date DESC, net_cost DESC",
            table = self.config.table_reference(),
        )
    }

    fn totals_sql(&self, window_days: u32) -> String {
        format!(
            "SELECT \
               DATE(usage_start_time) AS usage_date, \
               ROUND(SUM(cost) + SUM(IFNULL((SELECT SUM(c.amount) FROM UNNEST(credits) c), 0)), 4) AS net_cost \
             FROM {table} \
             WHERE DATE(usage_start_time) >= DATE_SUB(CURRENT_DATE(), INTERVAL {window_days} DAY) \
             GROUP BY usage_date \
             HAVING net_cost != 0 \
             ORDER BY usage_date DESC",
            table = self.config.table_reference(),
        )
    }

    /// Run a query to completion, following pagination, and collect all rows
    async fn run_query(&self, sql: &str) -> Result<Vec<TableRow>> {
        let url = format!(
            "{BIGQUERY_ENDPOINT}/projects/{}/queries",
            self.config.project_id
        );
        let request = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            timeout_ms: QUERY_TIMEOUT_MS,
            max_results: PAGE_SIZE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;
        let mut page = Self::decode_response(response).await?;

        let mut rows = Vec::new();
        loop {
            if let Some(error) = page.errors.first() {
                return Err(CosttreeError::Query(format!(
                    "{}: {}",
                    error.reason, error.message
                )));
            }

            if page.job_complete {
                rows.append(&mut page.rows);
                match (&page.page_token, &page.job_reference) {
                    (Some(_), Some(_)) => {}
                    _ => break,
                }
            }

            // Either more pages remain or the job has not finished yet;
            // both go through getQueryResults.
            let job = page.job_reference.as_ref().ok_or_else(|| {
                CosttreeError::Query("incomplete job without a job reference".to_string())
            })?;
            let results_url = format!(
                "{BIGQUERY_ENDPOINT}/projects/{}/queries/{}",
                self.config.project_id, job.job_id
            );

            let mut get = self
                .client
                .get(&results_url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("timeoutMs", QUERY_TIMEOUT_MS.to_string()),
                    ("maxResults", PAGE_SIZE.to_string()),
                ]);
            if let Some(location) = &job.location {
                get = get.query(&[("location", location.as_str())]);
            }
            if let Some(token) = &page.page_token {
                get = get.query(&[("pageToken", token.as_str())]);
            }

            debug!(job_id = %job.job_id, "polling getQueryResults");
            let next = get.send().await?;
            let job_reference = page.job_reference.take();
            page = Self::decode_response(next).await?;
            if page.job_reference.is_none() {
                page.job_reference = job_reference;
            }
        }

        Ok(rows)
    }

    async fn decode_response(response: reqwest::Response) -> Result<QueryResponse> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CosttreeError::Query(format!("HTTP {status}: {body}")));
        }
        Ok(response.json::<QueryResponse>().await?)
    }

    fn parse_detail_row(row: &TableRow) -> Result<CostRow> {
        let usage_date = match row.cell_str(0) {
            Some(raw) => Some(raw.parse::<UsageDate>()?),
            None => None,
        };
        Ok(CostRow {
            usage_date,
            project_id: row.cell_str(1).map(str::to_string),
            project_name: row.cell_str(2).map(str::to_string),
            service_name: row.cell_str(3).map(str::to_string),
            resource_name: Some(
                row.cell_str(4)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(UNKNOWN_RESOURCE)
                    .to_string(),
            ),
            net_cost: row.cell_f64(5)?,
            currency: row.cell_str(6).map(str::to_string),
        })
    }
}

#[async_trait]
impl CostSource for BigQuerySource {
    async fn fetch_detail_rows(&self, window_days: u32) -> Result<Vec<CostRow>> {
        debug!(window_days, "querying detailed costs");
        let rows = self.run_query(&self.detail_sql(window_days)).await?;
        rows.iter().map(Self::parse_detail_row).collect()
    }

    async fn fetch_daily_totals(&self, window_days: u32) -> Result<DailyTotals> {
        debug!(window_days, "querying authoritative daily totals");
        let rows = self.run_query(&self.totals_sql(window_days)).await?;

        let mut totals = DailyTotals::new();
        for row in &rows {
            let Some(raw_date) = row.cell_str(0) else {
                continue;
            };
            totals.insert(raw_date.parse::<UsageDate>()?, row.cell_f64(1)?);
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BillingExportConfig {
        BillingExportConfig {
            project_id: "proj".to_string(),
            dataset_id: "ds".to_string(),
            table_id: "tbl".to_string(),
        }
    }

    #[test]
    fn test_sql_embeds_table_and_window() {
        let source = BigQuerySource::new(test_config(), "token".to_string());
        let sql = source.detail_sql(45);
        assert!(sql.contains("`proj.ds.tbl`"));
        assert!(sql.contains("INTERVAL 45 DAY"));
        assert!(sql.contains("HAVING net_cost != 0"));

        let totals = source.totals_sql(7);
        assert!(totals.contains("INTERVAL 7 DAY"));
        assert!(!totals.contains("resource_name"));
    }

    #[test]
    fn test_parse_detail_row() {
        let raw = r#"{"f":[
            {"v":"2024-01-15"},
            {"v":"p1"},
            {"v":"Project One"},
            {"v":"Compute Engine"},
            {"v":"vm-a"},
            {"v":"12.3456"},
            {"v":"USD"}
        ]}"#;
        let row: TableRow = serde_json::from_str(raw).unwrap();
        let cost_row = BigQuerySource::parse_detail_row(&row).unwrap();

        assert_eq!(cost_row.usage_date.unwrap().to_string(), "2024-01-15");
        assert_eq!(cost_row.project_id.as_deref(), Some("p1"));
        assert_eq!(cost_row.service_name.as_deref(), Some("Compute Engine"));
        assert_eq!(cost_row.resource_name.as_deref(), Some("vm-a"));
        assert!((cost_row.net_cost - 12.3456).abs() < 1e-9);
        assert_eq!(cost_row.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_parse_detail_row_null_resource() {
        let raw = r#"{"f":[
            {"v":"2024-01-15"},
            {"v":"p1"},
            {"v":null},
            {"v":"Compute Engine"},
            {"v":null},
            {"v":"-0.5"},
            {"v":"USD"}
        ]}"#;
        let row: TableRow = serde_json::from_str(raw).unwrap();
        let cost_row = BigQuerySource::parse_detail_row(&row).unwrap();

        assert_eq!(cost_row.resource_name.as_deref(), Some(UNKNOWN_RESOURCE));
        assert!(cost_row.is_unknown_resource());
        assert!(cost_row.project_name.is_none());
    }

    #[test]
    fn test_non_numeric_cost_is_rejected() {
        let raw = r#"{"f":[
            {"v":"2024-01-15"},
            {"v":"p1"},
            {"v":"P"},
            {"v":"S"},
            {"v":"r"},
            {"v":"abc"},
            {"v":"USD"}
        ]}"#;
        let row: TableRow = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            BigQuerySource::parse_detail_row(&row),
            Err(CosttreeError::Query(_))
        ));
    }
}
