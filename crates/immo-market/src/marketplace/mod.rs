//! Listing lifecycle and payment gating for the classifieds marketplace.
//!
//! Listings are created pending together with a publish-fee payment intent, the
//! fee is confirmed manually, and an admin approves or rejects the listing.
//! Visitors unlock a listing's phone number through a second manual payment.

pub(crate) mod admin;
pub mod domain;
mod error;
pub mod images;
pub mod lifecycle;
pub mod query;
pub mod repository;
pub mod router;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use admin::AdminCredential;
pub use domain::{
    mask_phone, FeeSchedule, InvalidTransition, Listing, ListingId, ListingStatus,
    ListingSubmission, ModerationAction, Payment, PaymentId, PaymentKind, PaymentStatus,
    PropertyType, TransactionType,
};
pub use error::MarketplaceError;
pub use images::{ImageStore, ImageStoreError, ImageUpload, InMemoryImageStore, LocalImageStore};
pub use lifecycle::{
    ApproveAllOutcome, ListingLifecycleService, PaymentConfirmation, PublishedListing,
};
pub use query::{ListingQuery, ListingQueryService, ListingSort, MarketplaceSummary};
pub use repository::{ListingRepository, PaymentRepository, PaymentTransition, RepositoryError};
pub use router::{marketplace_router, MarketplaceState};
pub use store::{InMemoryListingRepository, InMemoryPaymentRepository};
pub use validation::{ListingGuard, ValidationError};
