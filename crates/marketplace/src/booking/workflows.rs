//! Booking workflows.

use async_trait::async_trait;
use chrono::Utc;
use record_store::RecordStore;
use workflow::{Result, Workflow, WorkflowRun};

use super::{Booking, CreateBooking, UpdateBookingStatus};
use crate::context::MarketplaceContext;
use crate::error::ValidationError;
use crate::listing::Listing;
use crate::steps::{FetchEntity, InsertEntity, ReplaceEntity, Replacement};

/// `create-booking`: reserve an active listing.
pub struct CreateBookingWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for CreateBookingWorkflow {
    type Input = CreateBooking;
    type Output = Booking;

    fn name(&self) -> &'static str {
        "create-booking"
    }

    fn validate(&self, cmd: &CreateBooking) -> Result<()> {
        Ok(cmd.validate()?)
    }

    async fn execute(
        &self,
        cmd: CreateBooking,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<Booking> {
        let listing = run
            .step(FetchEntity::<Listing>::new("load_listing"), cmd.listing_id)
            .await?
            .entity;
        if !listing.is_active() {
            return Err(ValidationError::NotAllowed(format!(
                "listing {} is {}",
                listing.id, listing.status
            ))
            .into());
        }

        let booking = cmd.to_booking()?;
        let booking = run
            .step(InsertEntity::<Booking>::new("create_booking"), booking)
            .await?;
        tracing::info!(booking_code = %booking.booking_code, listing_id = %listing.id, "booking created");
        Ok(booking)
    }
}

/// `update-booking-status`: set a booking's status.
pub struct UpdateBookingStatusWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for UpdateBookingStatusWorkflow {
    type Input = UpdateBookingStatus;
    type Output = Booking;

    fn name(&self) -> &'static str {
        "update-booking-status"
    }

    async fn execute(
        &self,
        cmd: UpdateBookingStatus,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<Booking> {
        let snapshot = run
            .step(FetchEntity::<Booking>::new("load_booking"), cmd.booking_id)
            .await?;
        let next = cmd.apply(&snapshot.entity, Utc::now());
        run.step(
            ReplaceEntity::<Booking>::new("update_booking_status"),
            Replacement::new(snapshot, next),
        )
        .await
    }
}
