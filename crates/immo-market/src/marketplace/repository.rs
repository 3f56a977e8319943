use chrono::{DateTime, Utc};

use super::domain::{Listing, ListingId, ListingStatus, Payment, PaymentId};

/// Storage abstraction for listings so services can be exercised in isolation.
///
/// Implementations must apply each mutation atomically per record: the status
/// and payment-status updates are compare-and-set operations, never blind writes.
pub trait ListingRepository: Send + Sync {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    /// All listings in insertion order.
    fn list(&self) -> Result<Vec<Listing>, RepositoryError>;
    /// Moves `id` from `expected` to `next`, failing with
    /// [`RepositoryError::StatusMismatch`] when the stored status differs.
    fn compare_and_set_status(
        &self,
        id: &ListingId,
        expected: ListingStatus,
        next: ListingStatus,
    ) -> Result<Listing, RepositoryError>;
    /// Marks the publish fee as paid. Repeated calls are no-ops.
    fn confirm_publish_payment(&self, id: &ListingId) -> Result<Listing, RepositoryError>;
}

/// Storage abstraction for payment intents.
pub trait PaymentRepository: Send + Sync {
    fn insert(&self, payment: Payment) -> Result<Payment, RepositoryError>;
    fn fetch(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError>;
    fn list(&self) -> Result<Vec<Payment>, RepositoryError>;
    fn confirm(
        &self,
        id: &PaymentId,
        confirmed_at: DateTime<Utc>,
    ) -> Result<PaymentTransition, RepositoryError>;
}

/// Result of a confirm call, distinguishing the first confirmation from repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTransition {
    Confirmed(Payment),
    AlreadyConfirmed(Payment),
}

impl PaymentTransition {
    pub fn payment(&self) -> &Payment {
        match self {
            PaymentTransition::Confirmed(payment) | PaymentTransition::AlreadyConfirmed(payment) => {
                payment
            }
        }
    }

    pub fn into_payment(self) -> Payment {
        match self {
            PaymentTransition::Confirmed(payment) | PaymentTransition::AlreadyConfirmed(payment) => {
                payment
            }
        }
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("listing status changed concurrently (now {current})")]
    StatusMismatch { current: ListingStatus },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
