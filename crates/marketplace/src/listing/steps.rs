//! Listing steps.

use async_trait::async_trait;
use record_store::{EntityStoreExt, RecordId, RecordStore};
use workflow::{Result, Step, StepResponse};

use super::{Listing, ListingStatus};
use crate::context::MarketplaceContext;
use crate::steps::put_back;

/// Sets every active listing of a vendor to inactive.
///
/// Takes the vendor id and returns the listings it changed. Undo puts their
/// previous state back. A write failure part way through reverts the
/// listings already changed before the error is returned.
pub struct DeactivateVendorListings;

async fn revert<S: RecordStore>(store: &S, previous: &[Listing]) {
    for listing in previous.iter().rev() {
        if let Err(err) = put_back(store, listing).await {
            tracing::error!(listing_id = %listing.id, error = %err, "failed to revert listing");
        }
    }
}

#[async_trait]
impl<S: RecordStore + 'static> Step<MarketplaceContext<S>> for DeactivateVendorListings {
    type Input = RecordId;
    type Output = Vec<Listing>;
    type Undo = Vec<Listing>;

    fn name(&self) -> &'static str {
        "deactivate_vendor_listings"
    }

    async fn run(
        &self,
        vendor_id: RecordId,
        ctx: &MarketplaceContext<S>,
    ) -> Result<StepResponse<Vec<Listing>, Vec<Listing>>> {
        let store = ctx.store();
        let active = store
            .find::<Listing>(
                Listing::for_vendor(vendor_id).field_eq("status", ListingStatus::Active.as_str()),
            )
            .await?;

        let mut previous = Vec::with_capacity(active.len());
        let mut changed = Vec::with_capacity(active.len());
        for listing in active {
            let next = Listing {
                status: ListingStatus::Inactive,
                ..listing.clone()
            };
            match store.replace(&next).await {
                Ok(stored) => {
                    previous.push(listing);
                    changed.push(stored);
                }
                Err(err) => {
                    revert(store, &previous).await;
                    return Err(err.into());
                }
            }
        }

        tracing::info!(%vendor_id, count = changed.len(), "vendor listings deactivated");
        if previous.is_empty() {
            return Ok(StepResponse::new(changed));
        }
        Ok(StepResponse::with_undo(changed, previous))
    }

    async fn compensate(&self, previous: Vec<Listing>, ctx: &MarketplaceContext<S>) -> Result<()> {
        for listing in previous.iter().rev() {
            put_back(ctx.store(), listing).await?;
        }
        Ok(())
    }
}
