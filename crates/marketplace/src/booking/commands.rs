//! Booking commands.

use chrono::{DateTime, Utc};
use record_store::RecordId;

use super::{
    Booking, BookingStatus, DEFAULT_BOOKING_CURRENCY, DepositStatus, booking_code, duration_hours,
};
use crate::error::{ValidationError, non_negative, require};
use crate::value_objects::{Metadata, Money};

/// Command to book a listing.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub listing_id: RecordId,
    pub customer_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    /// Amounts in minor units of `currency`.
    pub total_amount: i64,
    pub deposit_amount: i64,
    pub currency: String,

    pub pickup_location: Option<serde_json::Value>,
    pub delivery_location: Option<serde_json::Value>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub delivery_time: Option<DateTime<Utc>>,
    pub customer_notes: Option<String>,
    pub metadata: Metadata,
}

impl CreateBooking {
    pub fn new(
        listing_id: RecordId,
        customer_id: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        total_amount: i64,
    ) -> Self {
        Self {
            listing_id,
            customer_id: customer_id.into(),
            start_date,
            end_date,
            total_amount,
            deposit_amount: 0,
            currency: DEFAULT_BOOKING_CURRENCY.to_string(),
            pickup_location: None,
            delivery_location: None,
            pickup_time: None,
            delivery_time: None,
            customer_notes: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_deposit(mut self, amount: i64) -> Self {
        self.deposit_amount = amount;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.customer_notes = Some(notes.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        require("customer_id", &self.customer_id)?;
        if self.start_date >= self.end_date {
            return Err(ValidationError::InvalidDateRange);
        }
        non_negative("total_amount", self.total_amount)?;
        non_negative("deposit_amount", self.deposit_amount)?;
        Money::zero(&self.currency)?;
        Ok(())
    }

    pub(crate) fn to_booking(&self) -> Result<Booking, ValidationError> {
        let id = RecordId::new();
        let created_at = Utc::now();
        Ok(Booking {
            id,
            booking_code: booking_code(id, created_at),
            listing_id: self.listing_id,
            customer_id: self.customer_id.trim().to_string(),
            start_date: self.start_date,
            end_date: self.end_date,
            duration_hours: duration_hours(self.start_date, self.end_date),
            total: Money::new(self.total_amount, &self.currency)?,
            deposit: Money::new(self.deposit_amount, &self.currency)?,
            deposit_status: DepositStatus::Pending,
            booking_status: BookingStatus::Pending,
            confirmed_at: None,
            confirmed_by: None,
            pickup_location: self.pickup_location.clone(),
            delivery_location: self.delivery_location.clone(),
            pickup_time: self.pickup_time,
            delivery_time: self.delivery_time,
            pickup_proof: None,
            delivery_proof: None,
            cancelled_at: None,
            cancellation_reason: None,
            customer_notes: self.customer_notes.clone(),
            vendor_notes: None,
            metadata: self.metadata.clone(),
            created_at,
        })
    }
}

/// Command to move a booking to another status.
///
/// Any status may follow any other; confirmation and cancellation are
/// stamped with the time and, when given, who did it and why.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBookingStatus {
    pub booking_id: RecordId,
    pub status: BookingStatus,

    /// Recorded as `confirmed_by` when confirming.
    pub actor: Option<String>,

    /// Recorded as the cancellation reason when cancelling.
    pub reason: Option<String>,

    pub deposit_status: Option<DepositStatus>,
    pub vendor_notes: Option<String>,
}

impl UpdateBookingStatus {
    pub fn new(booking_id: RecordId, status: BookingStatus) -> Self {
        Self {
            booking_id,
            status,
            actor: None,
            reason: None,
            deposit_status: None,
            vendor_notes: None,
        }
    }

    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn because(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn deposit(mut self, status: DepositStatus) -> Self {
        self.deposit_status = Some(status);
        self
    }

    pub(crate) fn apply(&self, booking: &Booking, now: DateTime<Utc>) -> Booking {
        let mut next = booking.clone();
        next.booking_status = self.status;
        match self.status {
            BookingStatus::Confirmed => {
                next.confirmed_at = Some(now);
                next.confirmed_by = self.actor.clone();
            }
            BookingStatus::Cancelled => {
                next.cancelled_at = Some(now);
                next.cancellation_reason = self.reason.clone();
            }
            _ => {}
        }
        if let Some(deposit_status) = self.deposit_status {
            next.deposit_status = deposit_status;
        }
        if let Some(notes) = &self.vendor_notes {
            next.vendor_notes = Some(notes.clone());
        }
        next
    }
}
