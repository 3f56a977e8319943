use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use immo_market::config::MarketplaceConfig;
use immo_market::marketplace::{
    AdminCredential, ImageStore, InMemoryListingRepository, InMemoryPaymentRepository,
    LocalImageStore, MarketplaceState,
};
use metrics_exporter_prometheus::PrometheusHandle;

/// Process-level state shared by the operational routes.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) uploads: Arc<LocalImageStore>,
}

pub(crate) type MemoryMarketplace =
    MarketplaceState<InMemoryListingRepository, InMemoryPaymentRepository>;

/// Wires the in-memory stores and the given image store into marketplace state.
pub(crate) fn memory_marketplace(
    config: &MarketplaceConfig,
    images: Arc<dyn ImageStore>,
) -> MemoryMarketplace {
    MarketplaceState::new(
        Arc::new(InMemoryListingRepository::default()),
        Arc::new(InMemoryPaymentRepository::default()),
        images,
        config.fees.clone(),
        AdminCredential::new(config.admin_token.clone()),
    )
}
