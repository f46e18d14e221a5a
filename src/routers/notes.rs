//! Calendar notes: blocked time and reminders shown on the calendar.

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
pub struct GetCalendarNotesArgs {
    /// Notes on or after this date (YYYY-MM-DD)
    #[serde(default)]
    pub date_from: Option<String>,
    /// Notes on or before this date (YYYY-MM-DD)
    #[serde(default)]
    pub date_to: Option<String>,
    /// Only notes for this provider
    #[serde(default)]
    pub provider_id: Option<RecordId>,
    #[serde(flatten)]
    pub page: Page,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CreateCalendarNoteArgs {
    /// Start date and time (YYYY-MM-DD HH:MM:SS)
    pub start_date_time: String,
    /// End date and time (YYYY-MM-DD HH:MM:SS)
    pub end_date_time: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Provider the note applies to; all providers when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<RecordId>,
    /// Service the note applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<RecordId>,
    /// Note type id from get_calendar_note_types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_type_id: Option<RecordId>,
    /// Block the time range for bookings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_blocked: Option<bool>,
}

pub struct NotesApi {
    client: AuthorizedClient,
}

impl NotesApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &GetCalendarNotesArgs) -> ApiResult<Value> {
        let query = Query::new()
            .filter("date_from", args.date_from.as_deref())
            .filter("date_to", args.date_to.as_deref())
            .filter("provider_id", args.provider_id.as_ref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "calendar-notes"], &query).await
    }

    pub async fn create(&self, args: &CreateCalendarNoteArgs) -> ApiResult<Value> {
        self.client
            .post(&["admin", "calendar-notes"], &json_body(args)?)
            .await
    }

    pub async fn delete(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .delete(&["admin", "calendar-notes", &segment(id)])
            .await
    }

    pub async fn types(&self) -> ApiResult<Value> {
        self.client
            .get(&["admin", "calendar-notes", "types"], &Query::new())
            .await
    }
}

pub struct NotesRouter;

impl DomainRouter for NotesRouter {
    fn name(&self) -> &'static str {
        "notes"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_calendar_notes",
                "List calendar notes in a date range.",
                &["notes", "calendar", "read"],
                |client, args: GetCalendarNotesArgs| async move {
                    NotesApi::new(client).list(&args).await
                },
            ),
            ToolSpec::new(
                "create_calendar_note",
                "Add a note to the calendar, optionally blocking the time for bookings.",
                &["notes", "calendar", "write"],
                |client, args: CreateCalendarNoteArgs| async move {
                    NotesApi::new(client).create(&args).await
                },
            ),
            ToolSpec::new(
                "delete_calendar_note",
                "Delete a calendar note.",
                &["notes", "calendar", "write"],
                |client, args: IdArgs| async move { NotesApi::new(client).delete(&args.id).await },
            ),
            ToolSpec::new(
                "get_calendar_note_types",
                "List the available calendar note types.",
                &["notes", "calendar", "read"],
                |client, _args: NoArgs| async move { NotesApi::new(client).types().await },
            ),
        ]
    }
}
