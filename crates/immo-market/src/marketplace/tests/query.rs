use super::common::*;

use crate::marketplace::domain::{ListingId, ListingStatus, TransactionType};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::query::{ListingQuery, ListingSort};

fn approved_listings(fixture: &Fixture, cities: &[(&str, u64)]) -> Vec<ListingId> {
    cities
        .iter()
        .map(|(city, price)| {
            let id = fixture
                .lifecycle
                .create_listing(submission_in(city, *price))
                .expect("valid submission")
                .listing
                .id;
            fixture.lifecycle.approve(&id).expect("approve pending");
            id
        })
        .collect()
}

#[test]
fn list_approved_excludes_pending_and_rejected() {
    let fixture = fixture();
    let approved = approved_listings(&fixture, &[("Kinshasa", 100)]);
    fixture
        .lifecycle
        .create_listing(submission())
        .expect("pending listing");
    let rejected = fixture
        .lifecycle
        .create_listing(submission())
        .expect("to reject")
        .listing;
    fixture.lifecycle.reject(&rejected.id).expect("reject");

    let listings = fixture
        .queries
        .list_approved(&ListingQuery::default())
        .expect("query succeeds");
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].id, approved[0]);
    assert!(listings
        .iter()
        .all(|listing| listing.status == ListingStatus::Approved));
}

#[test]
fn list_approved_keeps_insertion_order_by_default() {
    let fixture = fixture();
    let ids = approved_listings(
        &fixture,
        &[("Kinshasa", 300), ("Lubumbashi", 100), ("Goma", 200)],
    );

    let listings = fixture
        .queries
        .list_approved(&ListingQuery::default())
        .expect("query succeeds");
    let order: Vec<ListingId> = listings.into_iter().map(|listing| listing.id).collect();
    assert_eq!(order, ids);
}

#[test]
fn list_approved_sorts_by_price() {
    let fixture = fixture();
    approved_listings(
        &fixture,
        &[("Kinshasa", 300), ("Lubumbashi", 100), ("Goma", 200)],
    );

    let ascending = fixture
        .queries
        .list_approved(&ListingQuery {
            sort: ListingSort::PriceAsc,
            ..ListingQuery::default()
        })
        .expect("query succeeds");
    let prices: Vec<u64> = ascending.iter().map(|listing| listing.price).collect();
    assert_eq!(prices, vec![100, 200, 300]);

    let descending = fixture
        .queries
        .list_approved(&ListingQuery {
            sort: ListingSort::PriceDesc,
            ..ListingQuery::default()
        })
        .expect("query succeeds");
    let prices: Vec<u64> = descending.iter().map(|listing| listing.price).collect();
    assert_eq!(prices, vec![300, 200, 100]);
}

#[test]
fn search_matches_location_fields_case_insensitively() {
    let fixture = fixture();
    approved_listings(&fixture, &[("Kinshasa", 100), ("Lubumbashi", 200)]);

    let by_city = fixture
        .queries
        .list_approved(&ListingQuery {
            search: Some("lubum".to_string()),
            ..ListingQuery::default()
        })
        .expect("query succeeds");
    assert_eq!(by_city.len(), 1);
    assert_eq!(by_city[0].city, "Lubumbashi");

    let by_commune = fixture
        .queries
        .list_approved(&ListingQuery {
            search: Some("GOMBE".to_string()),
            ..ListingQuery::default()
        })
        .expect("query succeeds");
    assert_eq!(by_commune.len(), 2);

    let none = fixture
        .queries
        .list_approved(&ListingQuery {
            search: Some("Matadi".to_string()),
            transaction_type: Some(TransactionType::Vente),
            ..ListingQuery::default()
        })
        .expect("query succeeds");
    assert!(none.is_empty());
}

#[test]
fn filters_by_transaction_type_and_featured() {
    let fixture = fixture();
    approved_listings(&fixture, &[("Kinshasa", 100)]);

    let rentals = fixture
        .queries
        .list_approved(&ListingQuery {
            transaction_type: Some(TransactionType::Location),
            ..ListingQuery::default()
        })
        .expect("query succeeds");
    assert!(rentals.is_empty());

    let featured = fixture
        .queries
        .list_approved(&ListingQuery {
            featured: Some(true),
            ..ListingQuery::default()
        })
        .expect("query succeeds");
    assert!(featured.is_empty());

    let regular = fixture
        .queries
        .list_approved(&ListingQuery {
            featured: Some(false),
            ..ListingQuery::default()
        })
        .expect("query succeeds");
    assert_eq!(regular.len(), 1);
}

#[test]
fn get_by_id_returns_unapproved_listings() {
    let fixture = fixture();
    let pending = fixture
        .lifecycle
        .create_listing(submission())
        .expect("valid submission")
        .listing;

    let listing = fixture
        .queries
        .get_by_id(&pending.id)
        .expect("direct lookup ignores status");
    assert_eq!(listing.status, ListingStatus::Pending);

    assert!(matches!(
        fixture.queries.get_by_id(&ListingId("missing".to_string())),
        Err(MarketplaceError::NotFound { .. })
    ));
}

#[test]
fn list_pending_and_all() {
    let fixture = fixture();
    approved_listings(&fixture, &[("Kinshasa", 100)]);
    let pending = fixture
        .lifecycle
        .create_listing(submission())
        .expect("valid submission")
        .listing;

    let pending_only = fixture.queries.list_pending().expect("query succeeds");
    assert_eq!(pending_only.len(), 1);
    assert_eq!(pending_only[0].id, pending.id);

    assert_eq!(fixture.queries.list_all().expect("query succeeds").len(), 2);
}

#[test]
fn summary_counts_statuses_and_confirmed_publish_revenue() {
    let fixture = fixture();
    let first = fixture
        .lifecycle
        .create_listing(submission())
        .expect("valid submission");
    let second = fixture
        .lifecycle
        .create_listing(submission())
        .expect("valid submission");
    fixture
        .lifecycle
        .create_listing(submission())
        .expect("valid submission");

    fixture
        .lifecycle
        .confirm_payment(&first.payment.id)
        .expect("confirm");
    fixture
        .lifecycle
        .confirm_payment(&second.payment.id)
        .expect("confirm");
    fixture
        .lifecycle
        .approve(&first.listing.id)
        .expect("approve");
    fixture
        .lifecycle
        .reject(&second.listing.id)
        .expect("reject");

    let unlock = fixture
        .lifecycle
        .request_phone_unlock(&first.listing.id)
        .expect("unlock");
    fixture
        .lifecycle
        .confirm_payment(&unlock.id)
        .expect("confirm unlock");

    let summary = fixture.queries.summary().expect("summary");
    assert_eq!(summary.total_listings, 3);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.approved, 1);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.confirmed_publish_payments, 2);
    assert_eq!(summary.confirmed_unlock_payments, 1);
    assert_eq!(summary.revenue, 3000);
    assert_eq!(summary.currency, "CFA");
}

#[test]
fn export_csv_lists_every_listing() {
    let fixture = fixture();
    approved_listings(&fixture, &[("Kinshasa", 100)]);
    fixture
        .lifecycle
        .create_listing(submission_in("Goma", 250))
        .expect("valid submission");

    let csv = fixture.queries.export_csv().expect("export succeeds");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,status,payment_status,property_type"));
    assert!(lines[1].contains(",approved,pending,Villa,Vente,100,"));
    assert!(lines[2].contains("Goma"));
    assert!(lines[2].contains(",pending,"));
}

#[test]
fn export_csv_writes_header_without_listings() {
    let fixture = fixture();

    let csv = fixture.queries.export_csv().expect("export succeeds");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("id,status,payment_status"));
    assert!(lines[0].ends_with("image_count,created_at"));
}
