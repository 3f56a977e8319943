use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::marketplace::admin::AdminCredential;
use crate::marketplace::domain::{
    FeeSchedule, Listing, ListingId, ListingStatus, ListingSubmission, Payment, PaymentId,
};
use crate::marketplace::images::InMemoryImageStore;
use crate::marketplace::lifecycle::ListingLifecycleService;
use crate::marketplace::query::ListingQueryService;
use crate::marketplace::repository::{
    ListingRepository, PaymentRepository, PaymentTransition, RepositoryError,
};
use crate::marketplace::router::{marketplace_router, MarketplaceState};
use crate::marketplace::store::{InMemoryListingRepository, InMemoryPaymentRepository};

pub(super) const ADMIN_TOKEN: &str = "test-admin-token";
pub(super) const BOUNDARY: &str = "immo-boundary";

pub(super) fn submission() -> ListingSubmission {
    ListingSubmission {
        city: Some("Kinshasa".to_string()),
        commune: Some("Gombe".to_string()),
        neighborhood: Some("Quartier Résidentiel".to_string()),
        rooms: Some("3".to_string()),
        property_type: Some("Villa".to_string()),
        transaction_type: Some("Vente".to_string()),
        price: Some("50000000".to_string()),
        deposit: None,
        description: Some("Villa lumineuse avec jardin".to_string()),
        phone: Some("+243 812 345 678".to_string()),
        images: vec!["/uploads/facade.jpeg".to_string()],
    }
}

pub(super) fn submission_in(city: &str, price: u64) -> ListingSubmission {
    ListingSubmission {
        city: Some(city.to_string()),
        price: Some(price.to_string()),
        ..submission()
    }
}

pub(super) type MemoryLifecycle =
    ListingLifecycleService<InMemoryListingRepository, InMemoryPaymentRepository>;
pub(super) type MemoryQueries =
    ListingQueryService<InMemoryListingRepository, InMemoryPaymentRepository>;

pub(super) struct Fixture {
    pub(super) lifecycle: MemoryLifecycle,
    pub(super) queries: MemoryQueries,
    pub(super) listings: Arc<InMemoryListingRepository>,
    pub(super) payments: Arc<InMemoryPaymentRepository>,
}

pub(super) fn fixture() -> Fixture {
    let listings = Arc::new(InMemoryListingRepository::default());
    let payments = Arc::new(InMemoryPaymentRepository::default());
    Fixture {
        lifecycle: ListingLifecycleService::new(
            listings.clone(),
            payments.clone(),
            FeeSchedule::default(),
        ),
        queries: ListingQueryService::new(
            listings.clone(),
            payments.clone(),
            FeeSchedule::default(),
        ),
        listings,
        payments,
    }
}

pub(super) fn memory_state(
) -> MarketplaceState<InMemoryListingRepository, InMemoryPaymentRepository> {
    memory_state_with_images(Arc::new(InMemoryImageStore::default()))
}

pub(super) fn memory_state_with_images(
    images: Arc<InMemoryImageStore>,
) -> MarketplaceState<InMemoryListingRepository, InMemoryPaymentRepository> {
    MarketplaceState::new(
        Arc::new(InMemoryListingRepository::default()),
        Arc::new(InMemoryPaymentRepository::default()),
        images,
        FeeSchedule::default(),
        AdminCredential::new(ADMIN_TOKEN),
    )
}

pub(super) fn router_with_state(
    state: MarketplaceState<InMemoryListingRepository, InMemoryPaymentRepository>,
) -> axum::Router {
    marketplace_router(state)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

pub(super) enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub(super) fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn publish_form_parts<'a>() -> Vec<Part<'a>> {
    vec![
        Part::Text("city", "Kinshasa"),
        Part::Text("commune", "Gombe"),
        Part::Text("neighborhood", "Quartier Résidentiel"),
        Part::Text("rooms", "3"),
        Part::Text("propertyType", "Villa"),
        Part::Text("transactionType", "Vente"),
        Part::Text("price", "50000000"),
        Part::Text("description", "Villa lumineuse avec jardin"),
        Part::Text("phone", "+243 812 345 678"),
    ]
}

pub(super) fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::post("/api/listings")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request builds")
}

pub(super) fn admin_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .expect("request builds")
}

/// Listing store whose status writes always lose a race to another writer.
#[derive(Default, Clone)]
pub(super) struct RacingListingRepository {
    pub(super) inner: InMemoryListingRepository,
}

impl ListingRepository for RacingListingRepository {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.insert(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.list()
    }

    fn compare_and_set_status(
        &self,
        _id: &ListingId,
        _expected: ListingStatus,
        _next: ListingStatus,
    ) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::StatusMismatch {
            current: ListingStatus::Rejected,
        })
    }

    fn confirm_publish_payment(&self, id: &ListingId) -> Result<Listing, RepositoryError> {
        self.inner.confirm_publish_payment(id)
    }
}

/// Listing store that fails status writes for one specific listing and can
/// fail a set number of publish-fee updates.
#[derive(Clone)]
pub(super) struct FlakyListingRepository {
    pub(super) inner: InMemoryListingRepository,
    pub(super) broken: Arc<std::sync::Mutex<Option<ListingId>>>,
    pub(super) publish_failures: Arc<std::sync::Mutex<usize>>,
}

impl Default for FlakyListingRepository {
    fn default() -> Self {
        Self {
            inner: InMemoryListingRepository::default(),
            broken: Arc::new(std::sync::Mutex::new(None)),
            publish_failures: Arc::new(std::sync::Mutex::new(0)),
        }
    }
}

impl ListingRepository for FlakyListingRepository {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        self.inner.insert(listing)
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self) -> Result<Vec<Listing>, RepositoryError> {
        self.inner.list()
    }

    fn compare_and_set_status(
        &self,
        id: &ListingId,
        expected: ListingStatus,
        next: ListingStatus,
    ) -> Result<Listing, RepositoryError> {
        let broken = self.broken.lock().expect("flaky mutex poisoned").clone();
        if broken.as_ref() == Some(id) {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        self.inner.compare_and_set_status(id, expected, next)
    }

    fn confirm_publish_payment(&self, id: &ListingId) -> Result<Listing, RepositoryError> {
        let mut remaining = self
            .publish_failures
            .lock()
            .expect("flaky mutex poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(RepositoryError::Unavailable("write lost".to_string()));
        }
        drop(remaining);
        self.inner.confirm_publish_payment(id)
    }
}

/// Payment store that is always down.
#[derive(Default, Clone)]
pub(super) struct UnavailablePayments;

impl PaymentRepository for UnavailablePayments {
    fn insert(&self, _payment: Payment) -> Result<Payment, RepositoryError> {
        Err(RepositoryError::Unavailable("payments offline".to_string()))
    }

    fn fetch(&self, _id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Err(RepositoryError::Unavailable("payments offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Payment>, RepositoryError> {
        Err(RepositoryError::Unavailable("payments offline".to_string()))
    }

    fn confirm(
        &self,
        _id: &PaymentId,
        _confirmed_at: DateTime<Utc>,
    ) -> Result<PaymentTransition, RepositoryError> {
        Err(RepositoryError::Unavailable("payments offline".to_string()))
    }
}
