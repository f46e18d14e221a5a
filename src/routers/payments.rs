//! Invoices and manual payment acceptance.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{segment, IdArgs, Page, RecordId};
use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetInvoicesArgs {
    /// Only invoices of this client
    #[serde(default)]
    pub client_id: Option<RecordId>,
    /// Invoice status, e.g. new, pending, paid or cancelled
    #[serde(default)]
    pub status: Option<String>,
    /// Invoices dated on or after this date (YYYY-MM-DD)
    #[serde(default)]
    pub date_from: Option<String>,
    /// Invoices dated on or before this date (YYYY-MM-DD)
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AcceptPaymentArgs {
    /// Invoice id
    pub id: RecordId,
    /// How the payment was received, e.g. cash or manual
    #[serde(default)]
    pub payment_processor: Option<String>,
}

const DEFAULT_PAYMENT_PROCESSOR: &str = "manual";

pub struct PaymentsApi {
    client: AuthorizedClient,
}

impl PaymentsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn invoices(&self, args: &GetInvoicesArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("client_id", args.client_id.as_ref())
            .filter("status", args.status.as_deref())
            .filter("date_from", args.date_from.as_deref())
            .filter("date_to", args.date_to.as_deref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "invoices"], &query).await
    }

    pub async fn invoice(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .get(&["admin", "invoices", &segment(id)], &Query::new())
            .await
    }

    pub async fn accept_payment(&self, args: &AcceptPaymentArgs) -> ApiResult<Value> {
        let processor = args
            .payment_processor
            .as_deref()
            .unwrap_or(DEFAULT_PAYMENT_PROCESSOR);
        self.client
            .put(
                &["admin", "invoices", &segment(&args.id), "accept-payment"],
                &json!({ "payment_processor": processor }),
            )
            .await
    }
}

pub struct PaymentsRouter;

impl DomainRouter for PaymentsRouter {
    fn name(&self) -> &'static str {
        "payments"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_invoices",
                "List invoices, optionally filtered by client, status or date.",
                &["payments", "invoices", "read"],
                |client, args: GetInvoicesArgs| async move {
                    PaymentsApi::new(client).invoices(&args).await
                },
            ),
            ToolSpec::new(
                "get_invoice",
                "Get one invoice by id.",
                &["payments", "invoices", "read"],
                |client, args: IdArgs| async move {
                    PaymentsApi::new(client).invoice(&args.id).await
                },
            ),
            ToolSpec::new(
                "accept_payment",
                "Mark an invoice as paid.",
                &["payments", "invoices", "write"],
                |client, args: AcceptPaymentArgs| async move {
                    PaymentsApi::new(client).accept_payment(&args).await
                },
            ),
        ]
    }
}
