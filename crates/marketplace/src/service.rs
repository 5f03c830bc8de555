//! Marketplace service providing a single entry point for workflows and
//! queries.

use std::sync::Arc;

use record_store::{Entity, EntityStoreExt, RecordId, RecordStore};
use workflow::{ExecutionJournal, Result, WorkflowExecutor};

use crate::admin::{
    AdminUser, CreateAdminUser, CreateAdminUserWorkflow, CreatedAdminUser, DeleteAdminUser,
    DeleteAdminUserWorkflow, ResetAdminPassword, ResetAdminPasswordWorkflow, UpdateAdminUser,
    UpdateAdminUserWorkflow,
};
use crate::auth::{AuthIdentity, CredentialError, EMAILPASS};
use crate::booking::{
    Booking, BookingFilter, CreateBooking, CreateBookingWorkflow, UpdateBookingStatus,
    UpdateBookingStatusWorkflow,
};
use crate::context::MarketplaceContext;
use crate::listing::{
    CreateListing, CreateListingWorkflow, DeleteListing, DeleteListingWorkflow, Listing,
    ListingSearch, UpdateListing, UpdateListingWorkflow,
};
use crate::value_objects::Email;
use crate::vendor::{
    DeactivateVendor, DeactivateVendorWorkflow, RegisterVendor, RegisterVendorWorkflow,
    RegisteredVendor, SetVendorStatus, SetVendorStatusWorkflow, UpdateVendor,
    UpdateVendorWorkflow, Vendor, VendorAction, VendorFilter,
};

/// Service for managing the marketplace.
///
/// Every change runs as a workflow on the wrapped executor, so a failure
/// part way through is compensated before the error is returned. Queries
/// read the store directly.
pub struct Marketplace<S: RecordStore + 'static> {
    executor: WorkflowExecutor<MarketplaceContext<S>>,
}

impl<S: RecordStore + 'static> Clone for Marketplace<S> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
        }
    }
}

impl<S: RecordStore + 'static> Marketplace<S> {
    /// Creates a marketplace over `store` with default settings.
    pub fn new(store: S) -> Self {
        Self::with_context(MarketplaceContext::new(store))
    }

    pub fn with_context(context: MarketplaceContext<S>) -> Self {
        Self {
            executor: WorkflowExecutor::new(context),
        }
    }

    /// Creates a marketplace that journals executions to `journal`.
    pub fn with_journal(context: MarketplaceContext<S>, journal: Arc<dyn ExecutionJournal>) -> Self {
        Self {
            executor: WorkflowExecutor::with_journal(context, journal),
        }
    }

    /// Returns the underlying workflow executor.
    pub fn executor(&self) -> &WorkflowExecutor<MarketplaceContext<S>> {
        &self.executor
    }

    pub fn store(&self) -> &S {
        self.executor.context().store()
    }

    // Vendors

    #[tracing::instrument(skip(self))]
    pub async fn register_vendor(&self, cmd: RegisterVendor) -> Result<RegisteredVendor> {
        self.executor.run(&RegisterVendorWorkflow, cmd).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_vendor(&self, cmd: UpdateVendor) -> Result<Vendor> {
        self.executor.run(&UpdateVendorWorkflow, cmd).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_vendor_status(&self, cmd: SetVendorStatus) -> Result<Vendor> {
        self.executor.run(&SetVendorStatusWorkflow, cmd).await
    }

    pub async fn approve_vendor(&self, vendor_id: RecordId) -> Result<Vendor> {
        self.set_vendor_status(SetVendorStatus::new(vendor_id, VendorAction::Approve))
            .await
    }

    pub async fn reject_vendor(&self, vendor_id: RecordId) -> Result<Vendor> {
        self.set_vendor_status(SetVendorStatus::new(vendor_id, VendorAction::Reject))
            .await
    }

    pub async fn suspend_vendor(&self, vendor_id: RecordId) -> Result<Vendor> {
        self.set_vendor_status(SetVendorStatus::new(vendor_id, VendorAction::Suspend))
            .await
    }

    pub async fn reinstate_vendor(&self, vendor_id: RecordId) -> Result<Vendor> {
        self.set_vendor_status(SetVendorStatus::new(vendor_id, VendorAction::Reinstate))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deactivate_vendor(&self, vendor_id: RecordId) -> Result<Vendor> {
        self.executor
            .run(&DeactivateVendorWorkflow, DeactivateVendor::new(vendor_id))
            .await
    }

    pub async fn vendor(&self, vendor_id: RecordId) -> Result<Option<Vendor>> {
        Ok(self.store().fetch::<Vendor>(vendor_id).await?)
    }

    pub async fn vendors(&self, filter: &VendorFilter) -> Result<Vec<Vendor>> {
        Ok(self.store().find::<Vendor>(filter.to_query()).await?)
    }

    // Listings

    #[tracing::instrument(skip(self))]
    pub async fn create_listing(&self, cmd: CreateListing) -> Result<Listing> {
        self.executor.run(&CreateListingWorkflow, cmd).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_listing(&self, cmd: UpdateListing) -> Result<Listing> {
        self.executor.run(&UpdateListingWorkflow, cmd).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_listing(&self, listing_id: RecordId) -> Result<RecordId> {
        self.executor
            .run(&DeleteListingWorkflow, DeleteListing::new(listing_id))
            .await
    }

    pub async fn listing(&self, listing_id: RecordId) -> Result<Option<Listing>> {
        Ok(self.store().fetch::<Listing>(listing_id).await?)
    }

    pub async fn search_listings(&self, search: &ListingSearch) -> Result<Vec<Listing>> {
        let candidates = self.store().find::<Listing>(search.to_query()).await?;
        Ok(search.apply(candidates))
    }

    // Bookings

    #[tracing::instrument(skip(self))]
    pub async fn create_booking(&self, cmd: CreateBooking) -> Result<Booking> {
        self.executor.run(&CreateBookingWorkflow, cmd).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_booking_status(&self, cmd: UpdateBookingStatus) -> Result<Booking> {
        self.executor.run(&UpdateBookingStatusWorkflow, cmd).await
    }

    pub async fn booking(&self, booking_id: RecordId) -> Result<Option<Booking>> {
        Ok(self.store().fetch::<Booking>(booking_id).await?)
    }

    pub async fn bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        Ok(self.store().find::<Booking>(filter.to_query()).await?)
    }

    // Admin users

    #[tracing::instrument(skip(self))]
    pub async fn create_admin_user(&self, cmd: CreateAdminUser) -> Result<CreatedAdminUser> {
        self.executor.run(&CreateAdminUserWorkflow, cmd).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_admin_user(&self, cmd: UpdateAdminUser) -> Result<AdminUser> {
        self.executor.run(&UpdateAdminUserWorkflow, cmd).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_admin_user(&self, admin_user_id: RecordId) -> Result<AdminUser> {
        self.executor
            .run(&DeleteAdminUserWorkflow, DeleteAdminUser::new(admin_user_id))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reset_admin_password(&self, cmd: ResetAdminPassword) -> Result<RecordId> {
        self.executor.run(&ResetAdminPasswordWorkflow, cmd).await
    }

    pub async fn admin_user(&self, admin_user_id: RecordId) -> Result<Option<AdminUser>> {
        Ok(self.store().fetch::<AdminUser>(admin_user_id).await?)
    }

    /// Looks an admin user up by email, ignoring case.
    pub async fn admin_user_by_email(&self, email: &str) -> Result<Option<AdminUser>> {
        let email = Email::parse(email)?;
        let mut found = self
            .store()
            .find::<AdminUser>(AdminUser::query().field_eq("email", email.as_str()))
            .await?;
        Ok(found.pop())
    }

    pub async fn admin_users(&self) -> Result<Vec<AdminUser>> {
        Ok(self.store().find::<AdminUser>(AdminUser::query()).await?)
    }

    /// Checks an email and password login. Returns the identity on success.
    pub async fn verify_login(&self, email: &str, password: &str) -> Result<Option<AuthIdentity>> {
        let email = Email::parse(email)?;
        let identities = self
            .store()
            .find::<AuthIdentity>(AuthIdentity::by_login(EMAILPASS, email.as_str()))
            .await?;
        let hasher = *self.executor.context().hasher();
        let password = password.to_string();
        let found = tokio::task::spawn_blocking(move || {
            identities
                .into_iter()
                .find(|identity| hasher.verify(&identity.credential, &password))
        })
        .await
        .map_err(CredentialError::from)?;
        Ok(found)
    }
}
