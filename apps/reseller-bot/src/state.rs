use crate::config::BotConfig;
use crate::services::account_service::AccountService;
use crate::upstream_client::UpstreamClient;
use reseller_core::i18n::Catalog;
use reseller_core::rates::RateRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BotConfig>,
    pub accounts: AccountService,
    pub upstream: UpstreamClient,
    pub rates: RateRegistry,
    pub catalog: Arc<Catalog>,
}
