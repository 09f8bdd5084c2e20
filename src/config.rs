//! Billing export configuration
//!
//! The three identifiers locating the BigQuery billing export table are read
//! from the environment once at startup and passed explicitly into the data
//! source. A missing variable is a fatal validation error reported before any
//! query is attempted.
//!
//! Required variables:
//! - `GCP_BILLING_PROJECT_ID` - GCP project containing the billing export
//! - `GCP_BILLING_DATASET_ID` - BigQuery dataset name
//! - `GCP_BILLING_TABLE_ID`   - BigQuery table name

use crate::error::{CosttreeError, Result};

/// Environment variable naming the billing export project
pub const ENV_PROJECT_ID: &str = "GCP_BILLING_PROJECT_ID";
/// Environment variable naming the billing export dataset
pub const ENV_DATASET_ID: &str = "GCP_BILLING_DATASET_ID";
/// Environment variable naming the billing export table
pub const ENV_TABLE_ID: &str = "GCP_BILLING_TABLE_ID";

/// Location of the BigQuery billing export table
#[derive(Debug, Clone)]
pub struct BillingExportConfig {
    /// GCP project containing the export
    pub project_id: String,
    /// BigQuery dataset name
    pub dataset_id: String,
    /// BigQuery table name, e.g. `gcp_billing_export_resource_v1_XXXXXX`
    pub table_id: String,
}

impl BillingExportConfig {
    /// Build the configuration from process environment variables
    ///
    /// # Errors
    ///
    /// Returns `CosttreeError::Config` enumerating every missing variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary lookup function
    ///
    /// Exists so validation can be tested without mutating process
    /// environment variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut get = |name: &str| match lookup(name).filter(|v| !v.is_empty()) {
            Some(value) => Some(value),
            None => {
                missing.push(name.to_string());
                None
            }
        };

        let project_id = get(ENV_PROJECT_ID);
        let dataset_id = get(ENV_DATASET_ID);
        let table_id = get(ENV_TABLE_ID);

        if !missing.is_empty() {
            return Err(CosttreeError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        // All three are Some once missing is empty
        Ok(Self {
            project_id: project_id.unwrap_or_default(),
            dataset_id: dataset_id.unwrap_or_default(),
            table_id: table_id.unwrap_or_default(),
        })
    }

    /// Fully qualified table reference for use inside a query
    pub fn table_reference(&self) -> String {
        format!("`{}.{}.{}`", self.project_id, self.dataset_id, self.table_id)
    }
}
