use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{
    Listing, ListingId, ListingStatus, Payment, PaymentId, PaymentStatus,
};
use super::repository::{ListingRepository, PaymentRepository, PaymentTransition, RepositoryError};

fn lock<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} lock poisoned")))
}

#[derive(Default)]
struct ListingTable {
    order: Vec<ListingId>,
    records: HashMap<ListingId, Listing>,
}

/// Process-local listing store. Insertion order is preserved for listing queries.
#[derive(Default, Clone)]
pub struct InMemoryListingRepository {
    table: Arc<Mutex<ListingTable>>,
}

impl ListingRepository for InMemoryListingRepository {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        let mut table = lock(&self.table, "listing store")?;
        if table.records.contains_key(&listing.id) {
            return Err(RepositoryError::Conflict);
        }
        table.order.push(listing.id.clone());
        table.records.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let table = lock(&self.table, "listing store")?;
        Ok(table.records.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        let table = lock(&self.table, "listing store")?;
        Ok(table
            .order
            .iter()
            .filter_map(|id| table.records.get(id).cloned())
            .collect())
    }

    fn compare_and_set_status(
        &self,
        id: &ListingId,
        expected: ListingStatus,
        next: ListingStatus,
    ) -> Result<Listing, RepositoryError> {
        let mut table = lock(&self.table, "listing store")?;
        let listing = table.records.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if listing.status != expected {
            return Err(RepositoryError::StatusMismatch {
                current: listing.status,
            });
        }
        listing.status = next;
        Ok(listing.clone())
    }

    fn confirm_publish_payment(&self, id: &ListingId) -> Result<Listing, RepositoryError> {
        let mut table = lock(&self.table, "listing store")?;
        let listing = table.records.get_mut(id).ok_or(RepositoryError::NotFound)?;
        listing.payment_status = PaymentStatus::Confirmed;
        Ok(listing.clone())
    }
}

#[derive(Default)]
struct PaymentTable {
    order: Vec<PaymentId>,
    records: HashMap<PaymentId, Payment>,
}

/// Process-local payment store.
#[derive(Default, Clone)]
pub struct InMemoryPaymentRepository {
    table: Arc<Mutex<PaymentTable>>,
}

impl PaymentRepository for InMemoryPaymentRepository {
    fn insert(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        let mut table = lock(&self.table, "payment store")?;
        if table.records.contains_key(&payment.id) {
            return Err(RepositoryError::Conflict);
        }
        table.order.push(payment.id.clone());
        table.records.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    fn fetch(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let table = lock(&self.table, "payment store")?;
        Ok(table.records.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Payment>, RepositoryError> {
        let table = lock(&self.table, "payment store")?;
        Ok(table
            .order
            .iter()
            .filter_map(|id| table.records.get(id).cloned())
            .collect())
    }

    fn confirm(
        &self,
        id: &PaymentId,
        confirmed_at: DateTime<Utc>,
    ) -> Result<PaymentTransition, RepositoryError> {
        let mut table = lock(&self.table, "payment store")?;
        let payment = table.records.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if payment.status == PaymentStatus::Confirmed {
            return Ok(PaymentTransition::AlreadyConfirmed(payment.clone()));
        }
        payment.status = PaymentStatus::Confirmed;
        payment.confirmed_at = Some(confirmed_at);
        Ok(PaymentTransition::Confirmed(payment.clone()))
    }
}
