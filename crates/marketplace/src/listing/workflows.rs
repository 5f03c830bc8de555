//! Listing workflows.

use async_trait::async_trait;
use record_store::{RecordId, RecordStore};
use workflow::{Result, Workflow, WorkflowRun};

use super::{CreateListing, DeleteListing, Listing, UpdateListing};
use crate::context::MarketplaceContext;
use crate::error::ValidationError;
use crate::steps::{DeleteEntity, FetchEntity, InsertEntity, ReplaceEntity, Replacement};
use crate::vendor::Vendor;

/// `create-listing`: publish a listing for an active vendor.
pub struct CreateListingWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for CreateListingWorkflow {
    type Input = CreateListing;
    type Output = Listing;

    fn name(&self) -> &'static str {
        "create-listing"
    }

    fn validate(&self, cmd: &CreateListing) -> Result<()> {
        Ok(cmd.validate()?)
    }

    async fn execute(
        &self,
        cmd: CreateListing,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<Listing> {
        let vendor = run
            .step(FetchEntity::<Vendor>::new("load_vendor"), cmd.vendor_id)
            .await?
            .entity;
        if !vendor.is_active {
            return Err(ValidationError::NotAllowed(format!(
                "vendor {} is not active",
                vendor.id
            ))
            .into());
        }

        let listing = cmd.to_listing()?;
        run.step(InsertEntity::<Listing>::new("create_listing"), listing)
            .await
    }
}

/// `update-listing`: change a listing's details or status.
pub struct UpdateListingWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for UpdateListingWorkflow {
    type Input = UpdateListing;
    type Output = Listing;

    fn name(&self) -> &'static str {
        "update-listing"
    }

    fn validate(&self, cmd: &UpdateListing) -> Result<()> {
        Ok(cmd.validate()?)
    }

    async fn execute(
        &self,
        cmd: UpdateListing,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<Listing> {
        let snapshot = run
            .step(FetchEntity::<Listing>::new("load_listing"), cmd.listing_id)
            .await?;
        let next = cmd.apply(&snapshot.entity)?;
        run.step(
            ReplaceEntity::<Listing>::new("update_listing"),
            Replacement::new(snapshot, next),
        )
        .await
    }
}

/// `delete-listing`: remove a listing. Refused while bookings point at it.
pub struct DeleteListingWorkflow;

#[async_trait]
impl<S: RecordStore + 'static> Workflow<MarketplaceContext<S>> for DeleteListingWorkflow {
    type Input = DeleteListing;
    type Output = RecordId;

    fn name(&self) -> &'static str {
        "delete-listing"
    }

    async fn execute(
        &self,
        cmd: DeleteListing,
        run: &mut WorkflowRun<'_, MarketplaceContext<S>>,
    ) -> Result<RecordId> {
        let listing = run
            .step(FetchEntity::<Listing>::new("load_listing"), cmd.listing_id)
            .await?
            .entity;
        run.step(DeleteEntity::<Listing>::new("delete_listing"), listing)
            .await
    }
}
