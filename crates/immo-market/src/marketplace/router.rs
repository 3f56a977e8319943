use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::admin::{require_admin, AdminCredential};
use super::domain::{FeeSchedule, Listing, ListingId, ListingSubmission, Payment, PaymentId};
use super::error::MarketplaceError;
use super::images::{ImageStore, ImageUpload};
use super::lifecycle::{ApproveAllOutcome, ListingLifecycleService, PaymentConfirmation, PublishedListing};
use super::query::{ListingQuery, ListingQueryService, MarketplaceSummary};
use super::repository::{ListingRepository, PaymentRepository};
use super::validation::ValidationError;

/// Upper bound for a publish form including its photos.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Everything the marketplace routes need, shared across handlers.
pub struct MarketplaceState<L, P> {
    pub lifecycle: Arc<ListingLifecycleService<L, P>>,
    pub queries: Arc<ListingQueryService<L, P>>,
    pub images: Arc<dyn ImageStore>,
    pub admin: AdminCredential,
}

impl<L, P> Clone for MarketplaceState<L, P> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            queries: self.queries.clone(),
            images: self.images.clone(),
            admin: self.admin.clone(),
        }
    }
}

impl<L, P> MarketplaceState<L, P>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    pub fn new(
        listings: Arc<L>,
        payments: Arc<P>,
        images: Arc<dyn ImageStore>,
        fees: FeeSchedule,
        admin: AdminCredential,
    ) -> Self {
        let lifecycle = Arc::new(ListingLifecycleService::new(
            listings.clone(),
            payments.clone(),
            fees.clone(),
        ));
        let queries = Arc::new(ListingQueryService::new(listings, payments, fees));
        Self {
            lifecycle,
            queries,
            images,
            admin,
        }
    }
}

/// Router builder exposing the public listing API and the admin moderation API.
pub fn marketplace_router<L, P>(state: MarketplaceState<L, P>) -> Router
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    let admin_routes = Router::new()
        .route("/api/admin/listings/pending", get(pending_handler::<L, P>))
        .route("/api/admin/listings/all", get(all_listings_handler::<L, P>))
        .route("/api/admin/listings/export", get(export_handler::<L, P>))
        .route(
            "/api/admin/listings/approve-all",
            post(approve_all_handler::<L, P>),
        )
        .route(
            "/api/admin/listings/:listing_id/approve",
            post(approve_handler::<L, P>),
        )
        .route(
            "/api/admin/listings/:listing_id/reject",
            post(reject_handler::<L, P>),
        )
        .route("/api/admin/summary", get(summary_handler::<L, P>))
        .route_layer(middleware::from_fn_with_state(
            state.admin.clone(),
            require_admin,
        ));

    Router::new()
        .route(
            "/api/listings",
            get(list_handler::<L, P>)
                .post(create_listing_handler::<L, P>)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/listings/:listing_id", get(detail_handler::<L, P>))
        .route("/api/phone-unlock", post(phone_unlock_handler::<L, P>))
        .route(
            "/api/payments/:payment_id/confirm",
            post(confirm_payment_handler::<L, P>),
        )
        .route("/api/admin/session", post(admin_session_handler::<L, P>))
        .merge(admin_routes)
        .with_state(state)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PhoneUnlockRequest {
    pub(crate) listing_id: ListingId,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PaymentEnvelope {
    pub(crate) payment: Payment,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AdminSessionRequest {
    pub(crate) code: String,
}

fn form_error(err: MultipartError) -> MarketplaceError {
    ValidationError::new("form", err.body_text()).into()
}

// Extractor rejections become JSON error bodies like every other failure.
fn rejected_form(rejection: MultipartRejection) -> MarketplaceError {
    ValidationError::new("form", rejection.body_text()).into()
}

fn rejected_query(rejection: QueryRejection) -> MarketplaceError {
    ValidationError::new("query", rejection.body_text()).into()
}

fn rejected_body(rejection: JsonRejection) -> MarketplaceError {
    ValidationError::new("body", rejection.body_text()).into()
}

/// Accepts the multipart publish form. File parts named `images` are stored
/// through the image store; text parts named `images` are taken as URLs.
pub(crate) async fn create_listing_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<PublishedListing>), MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    let mut multipart = multipart.map_err(rejected_form)?;
    let mut submission = ListingSubmission::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "images" && field.file_name().is_some() {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(form_error)?;
            uploads.push(ImageUpload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await.map_err(form_error)?;
        if !submission.set_field(&name, value) {
            debug!(field = %name, "ignoring unknown publish form field");
        }
    }

    if !uploads.is_empty() {
        state.lifecycle.precheck(&submission)?;
        // Every file must pass before any is written.
        for upload in &uploads {
            upload.validate()?;
        }
        for upload in uploads {
            let url = state.images.store(upload).await?;
            submission.images.push(url);
        }
    }

    let published = state.lifecycle.create_listing(submission)?;
    Ok((StatusCode::CREATED, Json(published)))
}

pub(crate) async fn list_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<Json<Vec<Listing>>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    let Query(query) = query.map_err(rejected_query)?;
    let listings = state.queries.list_approved(&query)?;
    Ok(Json(listings.into_iter().map(Listing::redacted).collect()))
}

pub(crate) async fn detail_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
    Path(listing_id): Path<String>,
) -> Result<Json<Listing>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    let listing = state.queries.get_by_id(&ListingId(listing_id))?;
    Ok(Json(listing.redacted()))
}

pub(crate) async fn phone_unlock_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
    request: Result<Json<PhoneUnlockRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentEnvelope>), MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    let Json(request) = request.map_err(rejected_body)?;
    let payment = state.lifecycle.request_phone_unlock(&request.listing_id)?;
    Ok((StatusCode::CREATED, Json(PaymentEnvelope { payment })))
}

pub(crate) async fn confirm_payment_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
    Path(payment_id): Path<String>,
) -> Result<Json<PaymentConfirmation>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    let confirmation = state.lifecycle.confirm_payment(&PaymentId(payment_id))?;
    Ok(Json(confirmation))
}

pub(crate) async fn admin_session_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
    request: Result<Json<AdminSessionRequest>, JsonRejection>,
) -> Response
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return rejected_body(rejection).into_response(),
    };
    if state.admin.verify(request.code.trim()) {
        (StatusCode::OK, Json(json!({ "valid": true }))).into_response()
    } else {
        warn!("admin access code rejected");
        let payload = json!({ "error": "invalid admin access code" });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    }
}

pub(crate) async fn pending_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
) -> Result<Json<Vec<Listing>>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    Ok(Json(state.queries.list_pending()?))
}

pub(crate) async fn all_listings_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
) -> Result<Json<Vec<Listing>>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    Ok(Json(state.queries.list_all()?))
}

pub(crate) async fn export_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
) -> Result<Response, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    let body = state.queries.export_csv()?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"listings.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

pub(crate) async fn summary_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
) -> Result<Json<MarketplaceSummary>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    Ok(Json(state.queries.summary()?))
}

pub(crate) async fn approve_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
    Path(listing_id): Path<String>,
) -> Result<Json<Listing>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    Ok(Json(state.lifecycle.approve(&ListingId(listing_id))?))
}

pub(crate) async fn reject_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
    Path(listing_id): Path<String>,
) -> Result<Json<Listing>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    Ok(Json(state.lifecycle.reject(&ListingId(listing_id))?))
}

pub(crate) async fn approve_all_handler<L, P>(
    State(state): State<MarketplaceState<L, P>>,
) -> Result<Json<ApproveAllOutcome>, MarketplaceError>
where
    L: ListingRepository + 'static,
    P: PaymentRepository + 'static,
{
    Ok(Json(state.lifecycle.approve_all()?))
}
