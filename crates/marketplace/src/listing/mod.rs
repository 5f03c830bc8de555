//! Listings: harvests, vehicles, storage and equipment offered by vendors.

mod commands;
mod search;
mod steps;
mod workflows;

pub use commands::{CreateListing, DeleteListing, UpdateListing};
pub use search::{ListingSearch, ListingSort};
pub use steps::DeactivateVendorListings;
pub use workflows::{CreateListingWorkflow, DeleteListingWorkflow, UpdateListingWorkflow};

use chrono::{DateTime, Utc};
use record_store::{Entity, RecordId, RecordQuery, RecordRef};
use serde::{Deserialize, Serialize};

use crate::labels::labelled_enum;
use crate::value_objects::{Metadata, Money};
use crate::vendor::Vendor;

/// Currency used when a listing does not name one.
pub const DEFAULT_LISTING_CURRENCY: &str = "kes";

labelled_enum! {
    /// What is being offered.
    pub enum ListingType ("listing type") {
        Harvest = "harvest",
        Vehicle = "vehicle",
        Storage = "storage",
        Equipment = "equipment",
    }
}

labelled_enum! {
    pub enum ListingStatus ("listing status") {
        Active = "active",
        Inactive = "inactive",
        Sold = "sold",
        Rented = "rented",
    }
}

/// An offer published by a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: RecordId,
    pub vendor_id: RecordId,
    pub listing_type: ListingType,
    pub title: String,
    pub description: Option<String>,
    pub price: Money,
    pub status: ListingStatus,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Query for every listing of a vendor.
    pub fn for_vendor(vendor_id: RecordId) -> RecordQuery {
        Self::query().field_eq("vendor_id", vendor_id.to_string())
    }

    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

impl Entity for Listing {
    const ENTITY_TYPE: &'static str = "listing";

    fn id(&self) -> RecordId {
        self.id
    }

    fn references(&self) -> Vec<RecordRef> {
        vec![RecordRef::new(Vendor::ENTITY_TYPE, self.vendor_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_use_lower_case_labels() {
        assert_eq!(
            serde_json::to_value(ListingStatus::Rented).unwrap(),
            serde_json::json!("rented")
        );
        assert_eq!("Harvest".parse::<ListingType>().unwrap(), ListingType::Harvest);
        assert!("tractor".parse::<ListingType>().is_err());
    }

    #[test]
    fn vendor_query_filters_on_the_vendor_id() {
        let vendor_id = RecordId::new();
        let query = Listing::for_vendor(vendor_id);
        assert_eq!(
            query.field_filters,
            vec![(
                "vendor_id".to_string(),
                serde_json::json!(vendor_id.to_string())
            )]
        );
    }
}
