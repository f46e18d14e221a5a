//! Domain routers: one module per SimplyBook area.
//!
//! Each module pairs a thin API client (endpoint paths and query mapping)
//! with the [`DomainRouter`] that declares its tools. Argument structs double
//! as the tools' input schemas; optional fields mean "no filter".

mod bookings;
mod clients;
mod coupons;
mod intake_forms;
mod memberships;
mod notes;
mod payments;
mod products;
mod providers;
mod services;
mod statistics;
mod subscription;
mod tickets;

pub use bookings::{BookingsApi, BookingsRouter};
pub use clients::{ClientsApi, ClientsRouter};
pub use coupons::{CouponsApi, CouponsRouter};
pub use intake_forms::{IntakeFormsApi, IntakeFormsRouter};
pub use memberships::{MembershipsApi, MembershipsRouter};
pub use notes::{NotesApi, NotesRouter};
pub use payments::{PaymentsApi, PaymentsRouter};
pub use products::{ProductsApi, ProductsRouter};
pub use providers::{ProvidersApi, ProvidersRouter};
pub use services::{ServicesApi, ServicesRouter};
pub use statistics::{StatisticsApi, StatisticsRouter};
pub use subscription::{SubscriptionApi, SubscriptionRouter};
pub use tickets::{TicketsApi, TicketsRouter};

use std::fmt;

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    registry::DomainRouter,
};

/// Every router served by the process, in registration order.
pub fn all() -> Vec<Box<dyn DomainRouter>> {
    vec![
        Box::new(BookingsRouter),
        Box::new(ClientsRouter),
        Box::new(ServicesRouter),
        Box::new(ProvidersRouter),
        Box::new(StatisticsRouter),
        Box::new(TicketsRouter),
        Box::new(MembershipsRouter),
        Box::new(CouponsRouter),
        Box::new(NotesRouter),
        Box::new(ProductsRouter),
        Box::new(SubscriptionRouter),
        Box::new(PaymentsRouter),
        Box::new(IntakeFormsRouter),
    ]
}

/// Arguments for tools that take none.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// A SimplyBook record identifier, given either as a JSON number or a string.
///
/// Serializes back in the form it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// Arguments for tools addressing one record by id.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IdArgs {
    /// Record identifier
    pub id: RecordId,
}

/// Pagination shared by list tools.
#[derive(Debug, Default, Clone, Copy, Deserialize, JsonSchema)]
pub struct Page {
    /// Page number, starting at 1
    #[serde(default)]
    pub page: Option<u32>,
    /// Items per page
    #[serde(default)]
    pub on_page: Option<u32>,
}

/// Serialize tool arguments into a request body.
pub(crate) fn json_body<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::InvalidArgument(e.to_string()))
}

/// Render an id as a path segment.
pub(crate) fn segment(id: &RecordId) -> String {
    id.to_string()
}
