//! Bookings: listing, lookup, create/edit/cancel and free slots.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{json_body, segment, IdArgs, Page, RecordId};
use crate::{
    api::{AuthorizedClient, Query},
    error::ApiResult,
    registry::{DomainRouter, ToolSpec},
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetBookingsArgs {
    /// Only bookings that have not started yet
    #[serde(default)]
    pub upcoming_only: Option<bool>,
    /// Booking status: confirmed, confirmed_pending, pending or canceled
    #[serde(default)]
    pub status: Option<String>,
    /// Restrict to these service ids
    #[serde(default)]
    pub services: Option<Vec<String>>,
    /// Restrict to these provider ids
    #[serde(default)]
    pub providers: Option<Vec<String>>,
    /// Restrict to one client
    #[serde(default)]
    pub client_id: Option<RecordId>,
    /// Bookings on this date (YYYY-MM-DD)
    #[serde(default)]
    pub date: Option<String>,
    /// Free text search over code, client name, email and phone
    #[serde(default)]
    pub search: Option<String>,
    /// Bookings created on or after this date (YYYY-MM-DD)
    #[serde(default)]
    pub created_date_from: Option<String>,
    /// Bookings created on or before this date (YYYY-MM-DD)
    #[serde(default)]
    pub created_date_to: Option<String>,
    /// Bookings starting on or after this date (YYYY-MM-DD)
    #[serde(default)]
    pub date_from: Option<String>,
    /// Bookings starting on or before this date (YYYY-MM-DD)
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(flatten)]
    pub page: Page,
}

/// Value for one intake form field.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct AdditionalFieldValue {
    /// Field id as returned by get_additional_fields
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CreateBookingArgs {
    /// Service id
    pub service_id: RecordId,
    /// Provider id
    pub provider_id: RecordId,
    /// Client id
    pub client_id: RecordId,
    /// Start date and time (YYYY-MM-DD HH:MM:SS)
    pub start_datetime: String,
    /// End date and time; computed from the service duration when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<String>,
    /// Location id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<RecordId>,
    /// Service category id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<RecordId>,
    /// Number of places booked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Intake form values required by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_fields: Option<Vec<AdditionalFieldValue>>,
    /// Skip sending notifications to the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_notifications: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct EditBookingArgs {
    /// Booking id
    #[serde(skip_serializing)]
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<RecordId>,
    /// New start date and time (YYYY-MM-DD HH:MM:SS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_fields: Option<Vec<AdditionalFieldValue>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AvailableSlotsArgs {
    /// First day to search (YYYY-MM-DD)
    pub date_from: String,
    /// Last day to search (YYYY-MM-DD)
    pub date_to: String,
    /// Service id
    pub service_id: RecordId,
    /// Provider id; any provider when omitted
    #[serde(default)]
    pub provider_id: Option<RecordId>,
    /// Number of places required
    #[serde(default)]
    pub count: Option<u32>,
}

pub struct BookingsApi {
    client: AuthorizedClient,
}

impl BookingsApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &GetBookingsArgs) -> ApiResult<Value> {
        let query = Query::new()
            .flag("upcoming_only", args.upcoming_only)
            .filter("status", args.status.as_deref())
            .filter_list("services", args.services.as_deref())
            .filter_list("providers", args.providers.as_deref())
            .filter("client_id", args.client_id.as_ref())
            .filter("date", args.date.as_deref())
            .filter("search", args.search.as_deref())
            .filter("created_date_from", args.created_date_from.as_deref())
            .filter("created_date_to", args.created_date_to.as_deref())
            .filter("date_from", args.date_from.as_deref())
            .filter("date_to", args.date_to.as_deref())
            .page(args.page.page, args.page.on_page);
        self.client.get(&["admin", "bookings"], &query).await
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .get(&["admin", "bookings", &segment(id)], &Query::new())
            .await
    }

    pub async fn create(&self, args: &CreateBookingArgs) -> ApiResult<Value> {
        self.client
            .post(&["admin", "bookings"], &json_body(args)?)
            .await
    }

    pub async fn edit(&self, args: &EditBookingArgs) -> ApiResult<Value> {
        self.client
            .put(&["admin", "bookings", &segment(&args.id)], &json_body(args)?)
            .await
    }

    pub async fn cancel(&self, id: &RecordId) -> ApiResult<Value> {
        self.client
            .delete(&["admin", "bookings", &segment(id)])
            .await
    }

    pub async fn available_slots(&self, args: &AvailableSlotsArgs) -> ApiResult<Value> {
        let query = Query::new()
            .param("date_from", Some(&args.date_from))
            .param("date_to", Some(&args.date_to))
            .param("service_id", Some(&args.service_id))
            .param("provider_id", args.provider_id.as_ref())
            .param("count", args.count);
        self.client.get(&["admin", "timeline", "slots"], &query).await
    }
}

pub struct BookingsRouter;

impl DomainRouter for BookingsRouter {
    fn name(&self) -> &'static str {
        "bookings"
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "get_bookings",
                "List bookings, optionally filtered by status, date range, services, providers or client.",
                &["bookings", "read"],
                |client, args: GetBookingsArgs| async move {
                    BookingsApi::new(client).list(&args).await
                },
            ),
            ToolSpec::new(
                "get_booking",
                "Get the details of one booking.",
                &["bookings", "read"],
                |client, args: IdArgs| async move { BookingsApi::new(client).get(&args.id).await },
            ),
            ToolSpec::new(
                "create_booking",
                "Create a booking. Call get_additional_fields first to collect the intake form values the service requires.",
                &["bookings", "write"],
                |client, args: CreateBookingArgs| async move {
                    BookingsApi::new(client).create(&args).await
                },
            ),
            ToolSpec::new(
                "edit_booking",
                "Change the time, provider, service or intake values of an existing booking.",
                &["bookings", "write"],
                |client, args: EditBookingArgs| async move {
                    BookingsApi::new(client).edit(&args).await
                },
            ),
            ToolSpec::new(
                "cancel_booking",
                "Cancel a booking.",
                &["bookings", "write"],
                |client, args: IdArgs| async move {
                    BookingsApi::new(client).cancel(&args.id).await
                },
            ),
            ToolSpec::new(
                "get_available_slots",
                "List free time slots for a service between two dates.",
                &["bookings", "slots", "read"],
                |client, args: AvailableSlotsArgs| async move {
                    BookingsApi::new(client).available_slots(&args).await
                },
            ),
        ]
    }
}
