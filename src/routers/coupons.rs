use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use super::{segment, IdArgs, Page, RecordId};
use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetCouponsArgs {
    /// Search by coupon code
    #[serde(default)]
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

pub struct CouponsApi {
    client: AuthorizedClient,
}

impl CouponsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &GetCouponsArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("search", args.search.as_deref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "coupons"], &query).await
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .get(&["admin", "coupons", &segment(id)], &Query::new())
            .await
    }
}

pub struct CouponsRouter;

impl DomainRouter for CouponsRouter {
    fn name(&self) -> &'static str {
        "coupons"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_coupons",
                "List discount coupons.",
                &["coupons", "read"],
                |client, args: GetCouponsArgs| async move {
                    CouponsApi::new(client).list(&args).await
                },
            ),
            ToolSpec::new(
                "get_coupon",
                "Get one coupon by id.",
                &["coupons", "read"],
                |client, args: IdArgs| async move { CouponsApi::new(client).get(&args.id).await },
            ),
        ]
    }
}
