//! Intake form (additional field) definitions used when booking.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AdditionalFieldsArgs {
    /// Service whose required fields to return; all fields when omitted
    #[serde(default)]
    pub service_id: Option<String>,
}

pub struct IntakeFormsApi {
    client: AuthorizedClient,
}

impl IntakeFormsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn additional_fields(&self, service_id: Option<&str>) -> ApiResult<Value> {
        let query = Query::new().filter("service_id", service_id);
        self.client
            .get(&["admin", "additional-fields"], &query)
            .await
    }
}

pub struct IntakeFormsRouter;

impl DomainRouter for IntakeFormsRouter {
    fn name(&self) -> &'static str {
        "intake_forms"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![ToolSpec::new(
            "get_additional_fields",
            "Get the intake form fields that must be filled when booking a service. \
             Call this before create_booking; use each field's id as the 'field' value.",
            &["intake", "fields", "additional", "booking"],
            |client, args: AdditionalFieldsArgs| async move {
                IntakeFormsApi::new(client)
                    .additional_fields(args.service_id.as_deref())
                    .await
            },
        )]
    }
}
