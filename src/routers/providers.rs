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
pub struct GetProvidersArgs {
    /// Search by provider name
    #[serde(default)]
    pub search: Option<String>,
    /// Only providers offering this service
    #[serde(default)]
    pub service_id: Option<RecordId>,
    #[serde(flatten)]
    pub page: Page,
}

pub struct ProvidersApi {
    client: AuthorizedClient,
}

impl ProvidersApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &GetProvidersArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("search", args.search.as_deref())
            .filter("service_id", args.service_id.as_ref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "providers"], &query).await
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .get(&["admin", "providers", &segment(id)], &Query::new())
            .await
    }

    pub async fn locations(&self) -> ApiResult<Value> {
        self.client.get(&["admin", "locations"], &Query::new()).await
    }
}

pub struct ProvidersRouter;

impl DomainRouter for ProvidersRouter {
    fn name(&self) -> &'static str {
        "providers"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_providers",
                "List service providers (staff or resources).",
                &["providers", "read"],
                |client, args: GetProvidersArgs| async move {
                    ProvidersApi::new(client).list(&args).await
                },
            ),
            ToolSpec::new(
                "get_provider",
                "Get one provider by id.",
                &["providers", "read"],
                |client, args: IdArgs| async move { ProvidersApi::new(client).get(&args.id).await },
            ),
            ToolSpec::new(
                "get_locations",
                "List business locations.",
                &["providers", "locations", "read"],
                |client, _args: NoArgs| async move { ProvidersApi::new(client).locations().await },
            ),
        ]
    }
}
