use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{
    FeeSchedule, Listing, ListingId, ListingStatus, PaymentKind, PropertyType, TransactionType,
};
use super::error::MarketplaceError;
use super::repository::{ListingRepository, PaymentRepository};

/// Ordering applied to the public listing feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSort {
    #[default]
    Recent,
    #[serde(alias = "price-asc")]
    PriceAsc,
    #[serde(alias = "price-desc")]
    PriceDesc,
}

/// Optional filters for the public feed. All filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingQuery {
    /// Case-insensitive substring over city, commune, and neighborhood.
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub transaction_type: Option<TransactionType>,
    pub property_type: Option<PropertyType>,
    pub sort: ListingSort,
}

impl ListingQuery {
    fn matches(&self, listing: &Listing) -> bool {
        self.search
            .as_deref()
            .map_or(true, |needle| listing.matches_search(needle))
            && self.featured.map_or(true, |flag| listing.featured == flag)
            && self
                .transaction_type
                .map_or(true, |kind| listing.transaction_type == kind)
            && self
                .property_type
                .map_or(true, |kind| listing.property_type == kind)
    }
}

/// Aggregates for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceSummary {
    pub total_listings: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub featured: usize,
    pub confirmed_publish_payments: usize,
    pub confirmed_unlock_payments: usize,
    /// Sum of confirmed publish fees.
    pub revenue: u64,
    pub currency: String,
}

const LISTING_CSV_HEADER: [&str; 15] = [
    "id",
    "status",
    "payment_status",
    "property_type",
    "transaction_type",
    "price",
    "deposit",
    "city",
    "commune",
    "neighborhood",
    "rooms",
    "phone",
    "featured",
    "image_count",
    "created_at",
];

/// Column order must match [`LISTING_CSV_HEADER`].
#[derive(Serialize)]
struct ListingCsvRow<'a> {
    id: &'a str,
    status: &'static str,
    payment_status: &'static str,
    property_type: &'static str,
    transaction_type: &'static str,
    price: u64,
    deposit: Option<u64>,
    city: &'a str,
    commune: &'a str,
    neighborhood: &'a str,
    rooms: u32,
    phone: &'a str,
    featured: bool,
    image_count: usize,
    created_at: String,
}

impl<'a> From<&'a Listing> for ListingCsvRow<'a> {
    fn from(listing: &'a Listing) -> Self {
        Self {
            id: &listing.id.0,
            status: listing.status.label(),
            payment_status: listing.payment_status.label(),
            property_type: listing.property_type.label(),
            transaction_type: listing.transaction_type.label(),
            price: listing.price,
            deposit: listing.deposit,
            city: &listing.city,
            commune: &listing.commune,
            neighborhood: &listing.neighborhood,
            rooms: listing.rooms,
            phone: &listing.phone,
            featured: listing.featured,
            image_count: listing.images.len(),
            created_at: listing.created_at.to_rfc3339(),
        }
    }
}

/// Read side over the listing and payment stores.
pub struct ListingQueryService<L, P> {
    listings: Arc<L>,
    payments: Arc<P>,
    fees: FeeSchedule,
}

impl<L, P> ListingQueryService<L, P>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    pub fn new(listings: Arc<L>, payments: Arc<P>, fees: FeeSchedule) -> Self {
        Self {
            listings,
            payments,
            fees,
        }
    }

    /// Approved listings only, oldest first unless a price sort is requested.
    pub fn list_approved(&self, query: &ListingQuery) -> Result<Vec<Listing>, MarketplaceError> {
        let mut listings: Vec<Listing> = self
            .listings
            .list()?
            .into_iter()
            .filter(Listing::is_public)
            .filter(|listing| query.matches(listing))
            .collect();

        // Stable sorts keep insertion order between equal prices.
        match query.sort {
            ListingSort::Recent => {}
            ListingSort::PriceAsc => listings.sort_by_key(|listing| listing.price),
            ListingSort::PriceDesc => {
                listings.sort_by(|left, right| right.price.cmp(&left.price))
            }
        }
        Ok(listings)
    }

    /// Looks a listing up regardless of its moderation status.
    pub fn get_by_id(&self, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.listings
            .fetch(id)?
            .ok_or_else(|| MarketplaceError::listing_not_found(id))
    }

    pub fn list_pending(&self) -> Result<Vec<Listing>, MarketplaceError> {
        Ok(self
            .listings
            .list()?
            .into_iter()
            .filter(|listing| listing.status == ListingStatus::Pending)
            .collect())
    }

    pub fn list_all(&self) -> Result<Vec<Listing>, MarketplaceError> {
        Ok(self.listings.list()?)
    }

    pub fn summary(&self) -> Result<MarketplaceSummary, MarketplaceError> {
        let listings = self.listings.list()?;
        let count = |status: ListingStatus| {
            listings
                .iter()
                .filter(|listing| listing.status == status)
                .count()
        };

        let payments = self.payments.list()?;
        let mut confirmed_publish_payments = 0;
        let mut confirmed_unlock_payments = 0;
        let mut revenue = 0;
        for payment in payments.iter().filter(|payment| payment.is_confirmed()) {
            match payment.kind {
                PaymentKind::ListingPublish => {
                    confirmed_publish_payments += 1;
                    revenue += payment.amount;
                }
                PaymentKind::PhoneUnlock => confirmed_unlock_payments += 1,
            }
        }

        Ok(MarketplaceSummary {
            total_listings: listings.len(),
            pending: count(ListingStatus::Pending),
            approved: count(ListingStatus::Approved),
            rejected: count(ListingStatus::Rejected),
            featured: listings.iter().filter(|listing| listing.featured).count(),
            confirmed_publish_payments,
            confirmed_unlock_payments,
            revenue,
            currency: self.fees.currency.clone(),
        })
    }

    /// Every listing as CSV, header row first even when there are no listings.
    pub fn export_csv(&self) -> Result<String, MarketplaceError> {
        let listings = self.listings.list()?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(LISTING_CSV_HEADER)
            .map_err(|err| MarketplaceError::Export(err.to_string()))?;
        for listing in &listings {
            writer
                .serialize(ListingCsvRow::from(listing))
                .map_err(|err| MarketplaceError::Export(err.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| MarketplaceError::Export(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| MarketplaceError::Export(err.to_string()))
    }
}
