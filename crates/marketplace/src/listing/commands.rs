//! Listing commands.

use chrono::Utc;
use record_store::RecordId;

use super::{DEFAULT_LISTING_CURRENCY, Listing, ListingStatus, ListingType};
use crate::error::{ValidationError, non_negative, require};
use crate::value_objects::{Metadata, Money};

/// Command to publish a listing for a vendor.
#[derive(Debug, Clone)]
pub struct CreateListing {
    pub vendor_id: RecordId,
    pub listing_type: ListingType,
    pub title: String,
    pub description: Option<String>,

    /// Price in minor units of `currency`.
    pub price_amount: i64,
    pub currency: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub metadata: Metadata,
}

impl CreateListing {
    pub fn new(
        vendor_id: RecordId,
        listing_type: ListingType,
        title: impl Into<String>,
        price_amount: i64,
    ) -> Self {
        Self {
            vendor_id,
            listing_type,
            title: title.into(),
            description: None,
            price_amount,
            currency: DEFAULT_LISTING_CURRENCY.to_string(),
            quantity: None,
            unit: None,
            location: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_quantity(mut self, quantity: f64, unit: impl Into<String>) -> Self {
        self.quantity = Some(quantity);
        self.unit = Some(unit.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        non_negative("price", self.price_amount)?;
        Money::new(self.price_amount, &self.currency)?;
        validate_quantity(self.quantity)
    }

    pub(crate) fn to_listing(&self) -> Result<Listing, ValidationError> {
        Ok(Listing {
            id: RecordId::new(),
            vendor_id: self.vendor_id,
            listing_type: self.listing_type,
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            price: Money::new(self.price_amount, &self.currency)?,
            status: ListingStatus::Active,
            quantity: self.quantity,
            unit: self.unit.clone(),
            location: self.location.clone(),
            metadata: self.metadata.clone(),
            created_at: Utc::now(),
        })
    }
}

fn validate_quantity(quantity: Option<f64>) -> Result<(), ValidationError> {
    match quantity {
        Some(q) if !q.is_finite() || q < 0.0 => Err(ValidationError::NotAllowed(format!(
            "quantity must be a non-negative number (got {q})"
        ))),
        _ => Ok(()),
    }
}

/// Command to change a listing. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct UpdateListing {
    pub listing_id: RecordId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_amount: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<ListingStatus>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub location: Option<String>,

    /// Keys merged into the existing metadata.
    pub metadata: Option<Metadata>,
}

impl UpdateListing {
    pub fn new(listing_id: RecordId) -> Self {
        Self {
            listing_id,
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn price(mut self, amount: i64) -> Self {
        self.price_amount = Some(amount);
        self
    }

    pub fn status(mut self, status: ListingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require("title", title)?;
        }
        if let Some(amount) = self.price_amount {
            non_negative("price", amount)?;
        }
        if let Some(currency) = &self.currency {
            Money::zero(currency)?;
        }
        validate_quantity(self.quantity)
    }

    pub(crate) fn apply(&self, listing: &Listing) -> Result<Listing, ValidationError> {
        let mut next = listing.clone();
        if let Some(title) = &self.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            next.description = Some(description.clone());
        }
        if self.price_amount.is_some() || self.currency.is_some() {
            let amount = self.price_amount.unwrap_or(listing.price.amount);
            let currency = self.currency.as_deref().unwrap_or(&listing.price.currency);
            next.price = Money::new(amount, currency)?;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(quantity) = self.quantity {
            next.quantity = Some(quantity);
        }
        if let Some(unit) = &self.unit {
            next.unit = Some(unit.clone());
        }
        if let Some(location) = &self.location {
            next.location = Some(location.clone());
        }
        if let Some(metadata) = &self.metadata {
            next.metadata.extend(metadata.clone());
        }
        Ok(next)
    }
}

/// Command to remove a listing for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteListing {
    pub listing_id: RecordId,
}

impl DeleteListing {
    pub fn new(listing_id: RecordId) -> Self {
        Self { listing_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create() -> CreateListing {
        CreateListing::new(RecordId::new(), ListingType::Harvest, "Maize, 90kg bags", 350_000)
    }

    #[test]
    fn create_defaults_to_shillings() {
        let listing = create().to_listing().unwrap();
        assert_eq!(listing.price.currency, "kes");
        assert_eq!(listing.status, ListingStatus::Active);
    }

    #[test]
    fn create_validation() {
        assert!(create().validate().is_ok());

        let mut free = create();
        free.price_amount = 0;
        assert!(free.validate().is_ok());

        let mut negative = create();
        negative.price_amount = -1;
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::NegativeAmount { .. })
        ));

        assert!(create().with_currency("shilling").validate().is_err());
        assert!(create().with_quantity(-2.0, "bags").validate().is_err());
        assert!(create().with_quantity(f64::NAN, "bags").validate().is_err());
    }

    #[test]
    fn update_keeps_currency_when_only_the_amount_changes() {
        let listing = create().with_currency("usd").to_listing().unwrap();
        let next = UpdateListing::new(listing.id)
            .price(1_000)
            .status(ListingStatus::Sold)
            .apply(&listing)
            .unwrap();

        assert_eq!(next.price, Money::new(1_000, "usd").unwrap());
        assert_eq!(next.status, ListingStatus::Sold);
        assert_eq!(next.title, listing.title);
    }
}
