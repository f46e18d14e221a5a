use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use super::{Page, RecordId};
use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetMembershipsArgs {
    /// Search by membership name
    #[serde(default)]
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ClientMembershipsArgs {
    /// Only memberships purchased by this client
    #[serde(default)]
    pub client_id: Option<RecordId>,
    /// Only instances of this membership
    #[serde(default)]
    pub membership_id: Option<RecordId>,
    #[serde(flatten)]
    pub page: Page,
}

pub struct MembershipsApi {
    client: AuthorizedClient,
}

impl MembershipsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &GetMembershipsArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("search", args.search.as_deref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "memberships"], &query).await
    }

    pub async fn client_memberships(&self, args: &ClientMembershipsArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("client_id", args.client_id.as_ref())
            .filter("membership_id", args.membership_id.as_ref())
            .page(args.page.page, args.page.on_page);
        self.client
            .get(&["admin", "memberships", "client-memberships"], &query)
            .await
    }
}

pub struct MembershipsRouter;

impl DomainRouter for MembershipsRouter {
    fn name(&self) -> &'static str {
        "memberships"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_memberships",
                "List membership plans offered by the business.",
                &["memberships", "read"],
                |client, args: GetMembershipsArgs| async move {
                    MembershipsApi::new(client).list(&args).await
                },
            ),
            ToolSpec::new(
                "get_client_memberships",
                "List memberships purchased by clients.",
                &["memberships", "clients", "read"],
                |client, args: ClientMembershipsArgs| async move {
                    MembershipsApi::new(client).client_memberships(&args).await
                },
            ),
        ]
    }
}
