use crate::cli::CatalogArgs;
use metrics_exporter_prometheus::PrometheusHandle;
use railmatch::config::AppConfig;
use railmatch::error::AppError;
use railmatch::matching::{
    CatalogImporter, DealNotifier, DealStatusChanged, InMemoryMarketplace, MatchingService,
    NotifyError,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type Marketplace = MatchingService<InMemoryMarketplace, LogNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in for the messaging subsystem: records each status change in the log.
#[derive(Debug, Default, Clone)]
pub(crate) struct LogNotifier;

impl DealNotifier for LogNotifier {
    fn notify(&self, notice: DealStatusChanged) -> Result<(), NotifyError> {
        tracing::info!(
            subject = %notice.subject,
            previous = %notice.previous,
            current = %notice.current,
            history_id = %notice.history_id,
            "deal status notice"
        );
        Ok(())
    }
}

/// Load whichever catalog files were given into a fresh in-memory marketplace.
pub(crate) fn load_catalog(args: &CatalogArgs) -> Result<InMemoryMarketplace, AppError> {
    let offers = match &args.offers {
        Some(path) => CatalogImporter::offers_from_path(path)?,
        None => Vec::new(),
    };
    let requests = match &args.requests {
        Some(path) => CatalogImporter::requests_from_path(path)?,
        None => Vec::new(),
    };
    tracing::info!(
        offers = offers.len(),
        requests = requests.len(),
        "catalog loaded"
    );
    Ok(InMemoryMarketplace::with_catalog(offers, requests))
}

pub(crate) fn build_service(
    config: &AppConfig,
    marketplace: InMemoryMarketplace,
) -> Result<Marketplace, AppError> {
    let matching_config = config.matching.load_matching_config()?;
    Ok(MatchingService::new(
        Arc::new(marketplace),
        Arc::new(LogNotifier),
        matching_config,
    ))
}
