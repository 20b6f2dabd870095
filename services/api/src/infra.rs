use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use walletbot::config::AppConfig;
use walletbot::error::AppError;
use walletbot::i18n::Catalog;
use walletbot::workflows::conversation::ConversationEngine;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Engine backed by the bundled string tables and the configured wallet defaults.
pub(crate) fn build_engine(config: &AppConfig) -> Result<Arc<ConversationEngine>, AppError> {
    let catalog = Catalog::bundled(config.wallet.default_language)?;
    Ok(Arc::new(ConversationEngine::new(
        config.wallet.clone(),
        Arc::new(catalog),
    )))
}
