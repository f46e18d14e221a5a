//! Clients: CRUD plus the custom client field definitions.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json_body, segment, IdArgs, NoArgs, Page, RecordId};
use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetClientsArgs {
    /// Search by name, email or phone
    #[serde(default)]
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CreateClientArgs {
    /// Full name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone in international format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct EditClientArgs {
    /// Client id
    #[serde(skip_serializing)]
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_id: Option<String>,
}

pub struct ClientsApi {
    client: AuthorizedClient,
}

impl ClientsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &GetClientsArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("search", args.search.as_deref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "clients"], &query).await
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .get(&["admin", "clients", &segment(id)], &Query::new())
            .await
    }

    pub async fn create(&self, args: &CreateClientArgs) -> ApiResult<Value> {
        self.client
            .post(&["admin", "clients"], &json_body(args)?)
            .await
    }

    pub async fn edit(&self, args: &EditClientArgs) -> ApiResult<Value> {
        self.client
            .put(&["admin", "clients", &segment(&args.id)], &json_body(args)?)
            .await
    }

    pub async fn delete(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .delete(&["admin", "clients", &segment(id)])
            .await
    }

    pub async fn fields(&self) -> ApiResult<Value> {
        self.client
            .get(&["admin", "clients", "fields"], &Query::new())
            .await
    }
}

pub struct ClientsRouter;

impl DomainRouter for ClientsRouter {
    fn name(&self) -> &'static str {
        "clients"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_clients",
                "List clients, optionally filtered by a search string.",
                &["clients", "read"],
                |client, args: GetClientsArgs| async move {
                    ClientsApi::new(client).list(&args).await
                },
            ),
            ToolSpec::new(
                "get_client",
                "Get one client by id.",
                &["clients", "read"],
                |client, args: IdArgs| async move { ClientsApi::new(client).get(&args.id).await },
            ),
            ToolSpec::new(
                "create_client",
                "Create a client record.",
                &["clients", "write"],
                |client, args: CreateClientArgs| async move {
                    ClientsApi::new(client).create(&args).await
                },
            ),
            ToolSpec::new(
                "edit_client",
                "Update the contact details of a client.",
                &["clients", "write"],
                |client, args: EditClientArgs| async move {
                    ClientsApi::new(client).edit(&args).await
                },
            ),
            ToolSpec::new(
                "delete_client",
                "Delete a client.",
                &["clients", "write"],
                |client, args: IdArgs| async move {
                    ClientsApi::new(client).delete(&args.id).await
                },
            ),
            ToolSpec::new(
                "get_client_fields",
                "List the fields configured for client records, including custom ones.",
                &["clients", "fields", "read"],
                |client, _args: NoArgs| async move { ClientsApi::new(client).fields().await },
            ),
        ]
    }
}
