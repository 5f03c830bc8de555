//! Listing search.
//!
//! Equality criteria are pushed down to the store; location, price range,
//! ordering and paging are applied here.

use record_store::{Entity, RecordId, RecordQuery};

use super::{Listing, ListingStatus, ListingType};

/// Order of search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Title,
}

/// Criteria for a listing search. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingSearch {
    pub listing_type: Option<ListingType>,
    pub status: Option<ListingStatus>,
    pub vendor_id: Option<RecordId>,

    /// Case-insensitive substring of the listing location.
    pub location: Option<String>,

    /// Inclusive bounds, in minor units.
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,

    pub sort: ListingSort,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ListingSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listing_type(mut self, listing_type: ListingType) -> Self {
        self.listing_type = Some(listing_type);
        self
    }

    pub fn status(mut self, status: ListingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn vendor(mut self, vendor_id: RecordId) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn price_between(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn sort(mut self, sort: ListingSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// The store query covering the equality criteria.
    pub(crate) fn to_query(&self) -> RecordQuery {
        let mut query = Listing::query();
        if let Some(listing_type) = self.listing_type {
            query = query.field_eq("listing_type", listing_type.as_str());
        }
        if let Some(status) = self.status {
            query = query.field_eq("status", status.as_str());
        }
        if let Some(vendor_id) = self.vendor_id {
            query = query.field_eq("vendor_id", vendor_id.to_string());
        }
        query
    }

    /// Returns true if `listing` satisfies every criterion.
    pub fn matches(&self, listing: &Listing) -> bool {
        if self.listing_type.is_some_and(|t| t != listing.listing_type)
            || self.status.is_some_and(|s| s != listing.status)
            || self.vendor_id.is_some_and(|v| v != listing.vendor_id)
        {
            return false;
        }
        if let Some(needle) = &self.location {
            let needle = needle.to_lowercase();
            let found = listing
                .location
                .as_deref()
                .is_some_and(|location| location.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }
        let price = listing.price.amount;
        self.min_price.is_none_or(|min| price >= min) && self.max_price.is_none_or(|max| price <= max)
    }

    /// Filters, orders and pages `listings`.
    pub fn apply(&self, listings: Vec<Listing>) -> Vec<Listing> {
        let mut found: Vec<Listing> = listings.into_iter().filter(|l| self.matches(l)).collect();
        match self.sort {
            ListingSort::Newest => found.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ListingSort::PriceAsc => found.sort_by_key(|l| l.price.amount),
            ListingSort::PriceDesc => found.sort_by(|a, b| b.price.amount.cmp(&a.price.amount)),
            ListingSort::Title => found.sort_by_cached_key(|l| l.title.to_lowercase()),
        }
        let page = found.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::value_objects::{Metadata, Money};

    fn listing(title: &str, price: i64, location: &str, age_days: i64) -> Listing {
        Listing {
            id: RecordId::new(),
            vendor_id: RecordId::new(),
            listing_type: ListingType::Harvest,
            title: title.to_string(),
            description: None,
            price: Money::new(price, "kes").unwrap(),
            status: ListingStatus::Active,
            quantity: None,
            unit: None,
            location: Some(location.to_string()),
            metadata: Metadata::new(),
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn catalogue() -> Vec<Listing> {
        vec![
            listing("maize", 300, "Nakuru County", 3),
            listing("Beans", 500, "Kisumu", 1),
            listing("avocado", 100, "nakuru town", 2),
        ]
    }

    fn titles(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.title.as_str()).collect()
    }

    #[test]
    fn location_matches_case_insensitive_substrings() {
        let found = ListingSearch::new().location("NAKURU").apply(catalogue());
        assert_eq!(titles(&found), vec!["avocado", "maize"]);
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let found = ListingSearch::new()
            .price_between(Some(100), Some(300))
            .sort(ListingSort::PriceAsc)
            .apply(catalogue());
        assert_eq!(titles(&found), vec!["avocado", "maize"]);
    }

    #[test]
    fn sort_orders() {
        let by = |sort: ListingSort| titles(&ListingSearch::new().sort(sort).apply(catalogue()))
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        assert_eq!(by(ListingSort::Newest), vec!["Beans", "avocado", "maize"]);
        assert_eq!(by(ListingSort::PriceAsc), vec!["avocado", "maize", "Beans"]);
        assert_eq!(by(ListingSort::PriceDesc), vec!["Beans", "maize", "avocado"]);
        assert_eq!(by(ListingSort::Title), vec!["avocado", "Beans", "maize"]);
    }

    #[test]
    fn paging_applies_after_sorting() {
        let found = ListingSearch::new()
            .sort(ListingSort::PriceAsc)
            .page(1, 1)
            .apply(catalogue());
        assert_eq!(titles(&found), vec!["maize"]);
    }

    #[test]
    fn listings_without_location_never_match_a_location_filter() {
        let mut unplaced = listing("hay", 50, "", 0);
        unplaced.location = None;
        assert!(!ListingSearch::new().location("a").matches(&unplaced));
        assert!(ListingSearch::new().matches(&unplaced));
    }

    #[test]
    fn equality_criteria_become_store_filters() {
        let vendor_id = RecordId::new();
        let query = ListingSearch::new()
            .listing_type(ListingType::Vehicle)
            .status(ListingStatus::Active)
            .vendor(vendor_id)
            .location("ignored by the store")
            .to_query();
        assert_eq!(query.field_filters.len(), 3);
        assert_eq!(query.limit, None);
    }
}
