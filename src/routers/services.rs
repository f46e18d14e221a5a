use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use super::{segment, IdArgs, NoArgs, Page, RecordId};
use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetServicesArgs {
    /// Search by service name
    #[serde(default)]
    pub search: Option<String>,
    /// Restrict to one service category
    #[serde(default)]
    pub category_id: Option<RecordId>,
    #[serde(flatten)]
    pub page: Page,
}

pub struct ServicesApi {
    client: AuthorizedClient,
}

impl ServicesApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &GetServicesArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("search", args.search.as_deref())
            .filter("category_id", args.category_id.as_ref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "services"], &query).await
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .get(&["admin", "services", &segment(id)], &Query::new())
            .await
    }

    pub async fn categories(&self) -> ApiResult<Value> {
        self.client.get(&["admin", "categories"], &Query::new()).await
    }
}

pub struct ServicesRouter;

impl DomainRouter for ServicesRouter {
    fn name(&self) -> &'static str {
        "services"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_services",
                "List bookable services with duration, price and category.",
                &["services", "read"],
                |client, args: GetServicesArgs| async move {
                    ServicesApi::new(client).list(&args).await
                },
            ),
            ToolSpec::new(
                "get_service",
                "Get one service by id.",
                &["services", "read"],
                |client, args: IdArgs| async move { ServicesApi::new(client).get(&args.id).await },
            ),
            ToolSpec::new(
                "get_service_categories",
                "List service categories.",
                &["services", "categories", "read"],
                |client, _args: NoArgs| async move {
                    ServicesApi::new(client).categories().await
                },
            ),
        ]
    }
}
