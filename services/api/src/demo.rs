use crate::infra::memory_marketplace;
use clap::Args;
use immo_market::config::MarketplaceConfig;
use immo_market::error::AppError;
use immo_market::marketplace::{
    FeeSchedule, ImageUpload, InMemoryImageStore, Listing, ListingQuery, ListingSort,
    ListingSubmission, MarketplaceError,
};
use std::sync::Arc;

const DEMO_CITIES: [(&str, &str, &str, u64); 4] = [
    ("Kinshasa", "Gombe", "Golf", 250_000_000),
    ("Lubumbashi", "Kampemba", "Bel-Air", 95_000_000),
    ("Goma", "Karisimbi", "Katindo", 60_000_000),
    ("Matadi", "Nzanza", "Soyo", 42_000_000),
];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of listings to publish (1 to 4)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub(crate) listings: u8,
    /// Reject the last submitted listing instead of approving everything
    #[arg(long)]
    pub(crate) reject_last: bool,
    /// Skip the phone unlock portion of the demo
    #[arg(long)]
    pub(crate) skip_unlock: bool,
}

fn demo_submission(index: usize) -> ListingSubmission {
    let (city, commune, neighborhood, price) = DEMO_CITIES[index % DEMO_CITIES.len()];
    ListingSubmission {
        city: Some(city.to_string()),
        commune: Some(commune.to_string()),
        neighborhood: Some(neighborhood.to_string()),
        rooms: Some((index + 2).to_string()),
        property_type: Some("Villa".to_string()),
        transaction_type: Some("Vente".to_string()),
        price: Some(price.to_string()),
        deposit: None,
        description: Some(format!("Villa de démonstration à {city}")),
        phone: Some(format!("+243 81{index} 000 {index}{index}{index}")),
        images: Vec::new(),
    }
}

fn render_listing(listing: &Listing) {
    println!(
        "  - {} | {} {} | {} {} | {} | phone {}",
        listing.id,
        listing.property_type.label(),
        listing.transaction_type.label(),
        listing.city,
        listing.commune,
        listing.price,
        listing.phone
    );
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        listings,
        reject_last,
        skip_unlock,
    } = args;

    let config = MarketplaceConfig {
        admin_token: "demo".to_string(),
        fees: FeeSchedule::default(),
        upload_dir: std::env::temp_dir(),
    };
    let images = Arc::new(InMemoryImageStore::default());
    let state = memory_marketplace(&config, images.clone());
    let fees = state.lifecycle.fees().clone();

    println!("Classifieds marketplace demo");
    println!(
        "Fees: publish {} {} | phone unlock {} {}",
        fees.publish, fees.currency, fees.phone_unlock, fees.currency
    );

    println!("\nSubmissions");
    let mut published = Vec::new();
    for index in 0..usize::from(listings) {
        let mut submission = demo_submission(index);
        let photo = ImageUpload {
            file_name: Some(format!("facade-{index}.jpg")),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![0xff, 0xd8, 0xff, 0xe0],
        };
        let url = state
            .images
            .store(photo)
            .await
            .map_err(MarketplaceError::from)?;
        submission.images.push(url);

        let outcome = state.lifecycle.create_listing(submission)?;
        println!(
            "- {} submitted -> {} (payment {} for {} {})",
            outcome.listing.id,
            outcome.listing.status,
            outcome.payment.id,
            outcome.payment.amount,
            outcome.payment.currency
        );
        published.push(outcome);
    }
    println!("  {} photo(s) stored", images.stored().len());

    println!("\nPublish fee confirmations");
    for outcome in &published {
        let confirmation = state.lifecycle.confirm_payment(&outcome.payment.id)?;
        println!(
            "- payment {} {} for listing {}",
            confirmation.payment.id,
            confirmation.payment.status.label(),
            confirmation.payment.target_id
        );
    }

    println!("\nModeration");
    if reject_last {
        if let Some(last) = published.last() {
            let rejected = state.lifecycle.reject(&last.listing.id)?;
            println!("- {} -> {}", rejected.id, rejected.status);
        }
    }
    let bulk = state.lifecycle.approve_all()?;
    println!("- approve all: {}", bulk.message);

    println!("\nPublic feed (most expensive first, phones masked)");
    let feed = state.queries.list_approved(&ListingQuery {
        sort: ListingSort::PriceDesc,
        ..ListingQuery::default()
    })?;
    for listing in feed.into_iter().map(Listing::redacted) {
        render_listing(&listing);
    }

    if !skip_unlock {
        if let Some(first) = published.first() {
            println!("\nPhone unlock");
            let payment = state.lifecycle.request_phone_unlock(&first.listing.id)?;
            println!(
                "- payment {} opened for {} {}",
                payment.id, payment.amount, payment.currency
            );
            let confirmation = state.lifecycle.confirm_payment(&payment.id)?;
            if let Some(phone) = confirmation.phone {
                println!("- unlocked phone for {}: {phone}", first.listing.id);
            }
        }
    }

    let summary = state.queries.summary()?;
    println!("\nAdmin summary");
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("  summary unavailable: {err}"),
    }

    Ok(())
}
