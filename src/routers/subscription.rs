use serde_json::Value;

use super::NoArgs;
use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

pub struct SubscriptionApi {
    client: AuthorizedClient,
}

impl SubscriptionApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn current(&self) -> ApiResult<Value> {
        self.client
            .get(&["admin", "tariff", "current"], &Query::new())
            .await
    }
}

pub struct SubscriptionRouter;

impl DomainRouter for SubscriptionRouter {
    fn name(&self) -> &'static str {
        "subscription"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![ToolSpec::new(
            "get_subscription",
            "Get the SimplyBook plan of the account and its limits.",
            &["subscription", "read"],
            |client, _args: NoArgs| async move { SubscriptionApi::new(client).current().await },
        )]
    }
}
