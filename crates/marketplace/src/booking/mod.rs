//! Bookings of listed vehicles, storage and equipment.

mod commands;
mod workflows;

pub use commands::{CreateBooking, UpdateBookingStatus};
pub use workflows::{CreateBookingWorkflow, UpdateBookingStatusWorkflow};

use chrono::{DateTime, Datelike, Utc};
use record_store::{Entity, RecordId, RecordQuery, RecordRef, UniqueKey};
use serde::{Deserialize, Serialize};

use crate::labels::labelled_enum;
use crate::listing::Listing;
use crate::value_objects::{Metadata, Money};

/// Currency used when a booking does not name one.
pub const DEFAULT_BOOKING_CURRENCY: &str = "usd";

labelled_enum! {
    pub enum BookingStatus ("booking status") {
        Pending = "pending",
        Confirmed = "confirmed",
        Active = "active",
        Completed = "completed",
        Cancelled = "cancelled",
        Disputed = "disputed",
    }
}

labelled_enum! {
    /// Where the customer's deposit stands.
    pub enum DepositStatus ("deposit status") {
        Pending = "pending",
        Held = "held",
        Released = "released",
        Forfeited = "forfeited",
    }
}

/// Builds a human-readable booking code, `BKG-<year>-<8 hex>`.
pub fn booking_code(id: RecordId, created_at: DateTime<Utc>) -> String {
    format!("BKG-{}-{}", created_at.year(), id.short().to_uppercase())
}

/// Whole hours between `start` and `end`, rounded up.
pub fn duration_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let minutes = (end - start).num_minutes().max(0);
    (minutes + 59) / 60
}

/// A customer's reservation of a listing for a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: RecordId,
    pub booking_code: String,
    pub listing_id: RecordId,
    pub customer_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_hours: i64,
    pub total: Money,
    pub deposit: Money,
    pub deposit_status: DepositStatus,
    pub booking_status: BookingStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<String>,
    pub pickup_location: Option<serde_json::Value>,
    pub delivery_location: Option<serde_json::Value>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub pickup_proof: Option<serde_json::Value>,
    pub delivery_proof: Option<serde_json::Value>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub customer_notes: Option<String>,
    pub vendor_notes: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Entity for Booking {
    const ENTITY_TYPE: &'static str = "booking";

    fn id(&self) -> RecordId {
        self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("booking_code", &self.booking_code)]
    }

    fn references(&self) -> Vec<RecordRef> {
        vec![RecordRef::new(Listing::ENTITY_TYPE, self.listing_id)]
    }
}

/// Criteria for listing bookings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub customer_id: Option<String>,
    pub listing_id: Option<RecordId>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn listing(mut self, listing_id: RecordId) -> Self {
        self.listing_id = Some(listing_id);
        self
    }

    pub fn status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn to_query(&self) -> RecordQuery {
        let mut query = Booking::query();
        if let Some(customer_id) = &self.customer_id {
            query = query.field_eq("customer_id", customer_id.as_str());
        }
        if let Some(listing_id) = self.listing_id {
            query = query.field_eq("listing_id", listing_id.to_string());
        }
        if let Some(status) = self.status {
            query = query.field_eq("booking_status", status.as_str());
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn code_carries_year_and_short_id() {
        let id = RecordId::new();
        let created = Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap();
        let code = booking_code(id, created);

        assert!(code.starts_with("BKG-2025-"));
        assert_eq!(code.len(), "BKG-2025-".len() + 8);
        assert_eq!(&code[9..], id.short().to_uppercase());
    }

    #[test]
    fn partial_hours_round_up() {
        let start = Utc::now();
        assert_eq!(duration_hours(start, start + Duration::hours(3)), 3);
        assert_eq!(duration_hours(start, start + Duration::minutes(61)), 2);
        assert_eq!(duration_hours(start, start + Duration::minutes(1)), 1);
        assert_eq!(duration_hours(start, start), 0);
    }

    #[test]
    fn filter_builds_field_filters() {
        let listing_id = RecordId::new();
        let query = BookingFilter::default()
            .customer("cus_01")
            .listing(listing_id)
            .status(BookingStatus::Confirmed)
            .to_query();

        assert_eq!(
            query.field_filters,
            vec![
                ("customer_id".to_string(), serde_json::json!("cus_01")),
                ("listing_id".to_string(), serde_json::json!(listing_id.to_string())),
                ("booking_status".to_string(), serde_json::json!("confirmed")),
            ]
        );
    }
}
