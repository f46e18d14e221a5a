//! Dashboard statistics and the detailed booking report.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{NoArgs, Page};
use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct BookingReportArgs {
    /// Bookings created on or after this date (YYYY-MM-DD)
    #[serde(default)]
    pub created_date_from: Option<String>,
    /// Bookings created on or before this date (YYYY-MM-DD)
    #[serde(default)]
    pub created_date_to: Option<String>,
    /// Bookings starting on or after this date (YYYY-MM-DD)
    #[serde(default)]
    pub date_from: Option<String>,
    /// Bookings starting on or before this date (YYYY-MM-DD)
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

pub struct StatisticsApi {
    client: AuthorizedClient,
}

impl StatisticsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn summary(&self) -> ApiResult<Value> {
        self.client.get(&["admin", "statistic"], &Query::new()).await
    }

    pub async fn booking_report(&self, args: &BookingReportArgs) -> ApiResult<Value> {
        let mut filter = serde_json::Map::new();
        for (name, value) in [
            ("created_date_from", &args.created_date_from),
            ("created_date_to", &args.created_date_to),
            ("date_from", &args.date_from),
            ("date_to", &args.date_to),
        ] {
            if let Some(value) = value {
                filter.insert(name.to_string(), Value::String(value.clone()));
            }
        }

        let mut body = json!({ "filter": filter });
        if let Some(page) = args.page.page {
            body["page"] = json!(page);
        }
        if let Some(on_page) = args.page.on_page {
            body["on_page"] = json!(on_page);
        }
        self.client
            .post(&["admin", "detailed-report"], &body)
            .await
    }
}

pub struct StatisticsRouter;

impl DomainRouter for StatisticsRouter {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_statistics",
                "Get dashboard statistics: bookings today and this week, most popular service and provider.",
                &["statistics", "read"],
                |client, _args: NoArgs| async move { StatisticsApi::new(client).summary().await },
            ),
            ToolSpec::new(
                "get_booking_report",
                "Build a detailed booking report for a date range.",
                &["statistics", "reports", "read"],
                |client, args: BookingReportArgs| async move {
                    StatisticsApi::new(client).booking_report(&args).await
                },
            ),
        ]
    }
}
