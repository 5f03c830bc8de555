//! Agricultural marketplace: vendors, their listings, bookings of those
//! listings, and the admin users who run the marketplace.
//!
//! Every change is a [`workflow::Workflow`] of small store steps, so a
//! failure part way through undoes the steps that already ran:
//! - vendors register (optionally with a login), get reviewed and can be
//!   deactivated together with their listings
//! - listings and bookings are created and updated against active owners
//! - admin users are created, updated, deleted and restored with their logins
//!
//! [`Marketplace`] bundles the workflows and the read-side queries.

mod labels;

pub mod admin;
pub mod auth;
pub mod booking;
pub mod context;
pub mod error;
pub mod listing;
pub mod service;
pub mod steps;
pub mod value_objects;
pub mod vendor;

pub use admin::{
    AdminRole, AdminUser, AdminUserSnapshot, CreateAdminUser, CreatedAdminUser, DeleteAdminUser,
    RemoveAdminUser, ResetAdminPassword, UpdateAdminUser,
};
pub use auth::{
    ActorKind, AuthIdentity, Credential, CredentialError, CredentialHasher, IdentityLink, MIN_COST,
};
pub use booking::{
    Booking, BookingFilter, BookingStatus, CreateBooking, DepositStatus, UpdateBookingStatus,
};
pub use context::MarketplaceContext;
pub use error::ValidationError;
pub use listing::{
    CreateListing, Listing, ListingSearch, ListingSort, ListingStatus, ListingType, UpdateListing,
};
pub use service::Marketplace;
pub use steps::{DeleteEntity, FetchEntity, InsertEntity, ReplaceEntity, Replacement, Snapshot};
pub use value_objects::{Email, Metadata, Money};
pub use vendor::{
    ActorType, RegisterVendor, RegisteredVendor, SetVendorStatus, UpdateVendor, VendorAction,
    VendorFilter, Vendor, VerificationStatus,
};
