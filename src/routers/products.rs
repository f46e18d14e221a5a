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
pub struct GetProductsArgs {
    /// Search by product name
    #[serde(default)]
    pub search: Option<String>,
    /// Product kind, e.g. product or attribute
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

pub struct ProductsApi {
    client: AuthorizedClient,
}

impl ProductsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &GetProductsArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("search", args.search.as_deref())
            .filter("type", args.kind.as_deref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "products"], &query).await
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .get(&["admin", "products", &segment(id)], &Query::new())
            .await
    }
}

pub struct ProductsRouter;

impl DomainRouter for ProductsRouter {
    fn name(&self) -> &'static str {
        "products"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_products",
                "List products and service add-ons sold by the business.",
                &["products", "read"],
                |client, args: GetProductsArgs| async move {
                    ProductsApi::new(client).list(&args).await
                },
            ),
            ToolSpec::new(
                "get_product",
                "Get one product by id.",
                &["products", "read"],
                |client, args: IdArgs| async move { ProductsApi::new(client).get(&args.id).await },
            ),
        ]
    }
}
