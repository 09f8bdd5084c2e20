//! Common test utilities and helpers for costtree tests
//!
//! Provides a builder for billing rows plus small assertion helpers shared
//! by the integration and property suites.

use costtree::types::{CostRow, UsageDate};

/// Common test projects
#[allow(dead_code)]
pub const TEST_PROJECTS: &[&str] = &["project-alpha", "project-beta", "project-gamma"];

/// Common test services
#[allow(dead_code)]
pub const TEST_SERVICES: &[&str] = &["Compute Engine", "Cloud Storage", "BigQuery"];

/// Builder for creating test CostRow instances
pub struct CostRowBuilder {
    usage_date: Option<String>,
    project_id: Option<String>,
    project_name: Option<String>,
    service_name: Option<String>,
    resource_name: Option<String>,
    net_cost: f64,
    currency: Option<String>,
}

impl CostRowBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            usage_date: Some("2024-01-15".to_string()),
            project_id: Some("project-alpha".to_string()),
            project_name: Some("Project Alpha".to_string()),
            service_name: Some("Compute Engine".to_string()),
            resource_name: Some("vm-a".to_string()),
            net_cost: 1.0,
            currency: Some("USD".to_string()),
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.usage_date = Some(date.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn without_date(mut self) -> Self {
        self.usage_date = None;
        self
    }

    pub fn with_project(mut self, project: &str) -> Self {
        self.project_id = Some(project.to_string());
        self.project_name = Some(format!("{project} name"));
        self
    }

    pub fn with_service(mut self, service: &str) -> Self {
        self.service_name = Some(service.to_string());
        self
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource_name = Some(resource.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn without_resource(mut self) -> Self {
        self.resource_name = None;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.net_cost = cost;
        self
    }

    /// Build the CostRow
    pub fn build(self) -> CostRow {
        CostRow {
            usage_date: self
                .usage_date
                .map(|d| d.parse::<UsageDate>().expect("valid test date")),
            project_id: self.project_id,
            project_name: self.project_name,
            service_name: self.service_name,
            resource_name: self.resource_name,
            net_cost: self.net_cost,
            currency: self.currency,
        }
    }
}

impl Default for CostRowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert that two float values are approximately equal
#[allow(dead_code)]
pub fn assert_approx_eq(a: f64, b: f64, tolerance: f64) {
    assert!(
        (a - b).abs() <= tolerance,
        "Values are not approximately equal: {} != {} (tolerance: {})",
        a,
        b,
        tolerance
    );
}
