use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    FeeSchedule, Listing, ListingId, ListingStatus, ListingSubmission, ModerationAction, Payment,
    PaymentId, PaymentKind, PaymentStatus,
};
use super::error::MarketplaceError;
use super::repository::{ListingRepository, PaymentRepository, PaymentTransition, RepositoryError};
use super::validation::{ListingAttributes, ListingGuard};

/// Listing and publish-fee intent created together on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedListing {
    pub listing: Listing,
    pub payment: Payment,
}

/// Confirmed payment plus, for phone unlocks, the number the payer is now
/// entitled to see. Nothing per-viewer is stored; each visit unlocks again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentConfirmation {
    pub payment: Payment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApproveAllOutcome {
    pub count: usize,
    pub failed: usize,
    pub message: String,
}

/// State transitions for listings and their payments.
pub struct ListingLifecycleService<L, P> {
    listings: Arc<L>,
    payments: Arc<P>,
    guard: ListingGuard,
    fees: FeeSchedule,
}

impl<L, P> ListingLifecycleService<L, P>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    pub fn new(listings: Arc<L>, payments: Arc<P>, fees: FeeSchedule) -> Self {
        Self {
            listings,
            payments,
            guard: ListingGuard,
            fees,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Validates everything but images, so uploads can be persisted only for
    /// forms that will be accepted.
    pub fn precheck(
        &self,
        submission: &ListingSubmission,
    ) -> Result<ListingAttributes, MarketplaceError> {
        Ok(self.guard.attributes(submission)?)
    }

    /// Stores a pending listing along with its pending publish payment.
    pub fn create_listing(
        &self,
        submission: ListingSubmission,
    ) -> Result<PublishedListing, MarketplaceError> {
        let draft = self.guard.validate(&submission)?;
        let ListingAttributes {
            city,
            commune,
            neighborhood,
            rooms,
            property_type,
            transaction_type,
            price,
            deposit,
            description,
            phone,
        } = draft.attributes;

        let listing = Listing {
            id: ListingId::generate(),
            status: ListingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            property_type,
            transaction_type,
            price,
            deposit,
            city,
            commune,
            neighborhood,
            rooms,
            phone,
            description,
            images: draft.images,
            featured: false,
            created_at: Utc::now(),
        };

        let listing = self.listings.insert(listing)?;
        let payment = self.payments.insert(Payment::new(
            PaymentKind::ListingPublish,
            listing.id.clone(),
            &self.fees,
        ))?;

        info!(
            listing_id = %listing.id,
            payment_id = %payment.id,
            amount = payment.amount,
            "listing submitted for review"
        );
        Ok(PublishedListing { listing, payment })
    }

    /// Opens a phone-unlock payment for an existing listing. The amount always
    /// comes from the fee schedule.
    pub fn request_phone_unlock(&self, listing_id: &ListingId) -> Result<Payment, MarketplaceError> {
        let listing = self
            .listings
            .fetch(listing_id)?
            .ok_or_else(|| MarketplaceError::listing_not_found(listing_id))?;

        let payment = self.payments.insert(Payment::new(
            PaymentKind::PhoneUnlock,
            listing.id,
            &self.fees,
        ))?;

        info!(
            listing_id = %listing_id,
            payment_id = %payment.id,
            "phone unlock requested"
        );
        Ok(payment)
    }

    /// Confirms a manual payment. Repeated calls return the stored payment
    /// without further effects.
    pub fn confirm_payment(
        &self,
        payment_id: &PaymentId,
    ) -> Result<PaymentConfirmation, MarketplaceError> {
        let transition = match self.payments.confirm(payment_id, Utc::now()) {
            Ok(transition) => transition,
            Err(RepositoryError::NotFound) => {
                return Err(MarketplaceError::payment_not_found(payment_id))
            }
            Err(other) => return Err(other.into()),
        };

        let first_confirmation = matches!(transition, PaymentTransition::Confirmed(_));
        let payment = transition.into_payment();

        let phone = match payment.kind {
            PaymentKind::ListingPublish => {
                // Repeats still write so a listing update lost after the payment
                // was confirmed gets applied on retry.
                self.listings
                    .confirm_publish_payment(&payment.target_id)
                    .map_err(|err| match err {
                        RepositoryError::NotFound => {
                            MarketplaceError::listing_not_found(&payment.target_id)
                        }
                        other => other.into(),
                    })?;
                if first_confirmation {
                    info!(
                        listing_id = %payment.target_id,
                        payment_id = %payment.id,
                        "publish fee confirmed"
                    );
                }
                None
            }
            PaymentKind::PhoneUnlock => {
                let listing = self
                    .listings
                    .fetch(&payment.target_id)?
                    .ok_or_else(|| MarketplaceError::listing_not_found(&payment.target_id))?;
                if first_confirmation {
                    info!(
                        listing_id = %payment.target_id,
                        payment_id = %payment.id,
                        "phone unlock confirmed"
                    );
                }
                Some(listing.phone)
            }
        };

        if !first_confirmation {
            debug!(payment_id = %payment.id, "payment already confirmed");
        }

        Ok(PaymentConfirmation { payment, phone })
    }

    pub fn approve(&self, listing_id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.moderate(listing_id, ModerationAction::Approve)
    }

    pub fn reject(&self, listing_id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.moderate(listing_id, ModerationAction::Reject)
    }

    fn moderate(
        &self,
        listing_id: &ListingId,
        action: ModerationAction,
    ) -> Result<Listing, MarketplaceError> {
        let current = self
            .listings
            .fetch(listing_id)?
            .ok_or_else(|| MarketplaceError::listing_not_found(listing_id))?
            .status;

        let invalid_state = |current: ListingStatus| MarketplaceError::InvalidState {
            id: listing_id.to_string(),
            current,
        };

        let next = current
            .apply(action)
            .map_err(|transition| invalid_state(transition.from))?;

        let listing = self
            .listings
            .compare_and_set_status(listing_id, current, next)
            .map_err(|err| match err {
                RepositoryError::StatusMismatch { current } => invalid_state(current),
                RepositoryError::NotFound => MarketplaceError::listing_not_found(listing_id),
                other => other.into(),
            })?;

        info!(
            listing_id = %listing_id,
            action = action.label(),
            status = listing.status.label(),
            "listing moderated"
        );
        Ok(listing)
    }

    /// Approves every pending listing, paid or not. Each approval stands on its
    /// own; a failure on one listing does not undo the others.
    pub fn approve_all(&self) -> Result<ApproveAllOutcome, MarketplaceError> {
        let pending: Vec<ListingId> = self
            .listings
            .list()?
            .into_iter()
            .filter(|listing| listing.status == ListingStatus::Pending)
            .map(|listing| listing.id)
            .collect();

        let mut count = 0;
        let mut failed = 0;
        for id in &pending {
            match self.listings.compare_and_set_status(
                id,
                ListingStatus::Pending,
                ListingStatus::Approved,
            ) {
                Ok(_) => count += 1,
                Err(RepositoryError::StatusMismatch { current }) => {
                    debug!(listing_id = %id, %current, "listing left pending before bulk approval");
                }
                Err(err) => {
                    failed += 1;
                    warn!(listing_id = %id, error = %err, "bulk approval failed for listing");
                }
            }
        }

        info!(approved = count, failed, "bulk approval finished");
        Ok(ApproveAllOutcome {
            count,
            failed,
            message: format!("{count} annonce(s) approuvée(s)"),
        })
    }
}
