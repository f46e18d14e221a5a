use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TicketArgs {
    /// Ticket code printed on the booking confirmation
    pub code: String,
}

pub struct TicketsApi {
    client: AuthorizedClient,
}

impl TicketsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, code: &str) -> ApiResult<Value> {
        self.client
            .get(&["admin", "tickets", code], &Query::new())
            .await
    }

    pub async fn check_in(&self, code: &str) -> ApiResult<Value> {
        self.client
            .post(&["admin", "tickets", code, "check-in"], &json!({}))
            .await
    }
}

pub struct TicketsRouter;

impl DomainRouter for TicketsRouter {
    fn name(&self) -> &'static str {
        "tickets"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_ticket",
                "Look up a booking ticket by its code.",
                &["tickets", "read"],
                |client, args: TicketArgs| async move {
                    TicketsApi::new(client).get(&args.code).await
                },
            ),
            ToolSpec::new(
                "check_in_ticket",
                "Mark a ticket as checked in.",
                &["tickets", "write"],
                |client, args: TicketArgs| async move {
                    TicketsApi::new(client).check_in(&args.code).await
                },
            ),
        ]
    }
}
