use dotenvy::dotenv;
use reseller_core::i18n::Catalog;
use reseller_core::rates::RateRegistry;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;

mod api_client;
mod bot;
mod config;
mod services;
mod state;
mod upstream_client;

use crate::api_client::ApiClient;
use crate::config::BotConfig;
use crate::services::account_service::AccountService;
use crate::upstream_client::UpstreamClient;
use crate::state::AppState;

/// Built-in texts, with overrides from a JSON file when one is configured.
fn load_catalog(path: Option<&str>) -> Catalog {
    let Some(path) = path else {
        return Catalog::builtin();
    };
    let merged = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|json| Catalog::builtin().merge_json(&json).map_err(anyhow::Error::from));
    match merged {
        Ok(catalog) => {
            log::info!("Loaded locale overrides from {}", path);
            catalog
        }
        Err(e) => {
            log::warn!("Ignoring locale overrides in {}: {}", path, e);
            Catalog::builtin()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    log::info!("Starting Reseller Bot...");

    let config = Arc::new(BotConfig::load()?);

    let api_client = ApiClient::new(config.backend_url.clone(), config.backend_token.clone());
    let accounts = AccountService::new(api_client, &config.base_currency);
    let upstream = UpstreamClient::new(&config.upstream);
    let catalog = Arc::new(load_catalog(config.locales_path.as_deref()));

    let rates = RateRegistry::new(&config.base_currency, config.default_rates.clone());
    let table = rates.reload(&accounts).await;
    log::info!("Rate table ready: {} currencies", table.len());

    if config.rate_refresh_secs > 0 {
        services::rate_service::spawn_periodic_reload(
            rates.clone(),
            accounts.clone(),
            Duration::from_secs(config.rate_refresh_secs),
        );
    }

    let state = AppState {
        config: config.clone(),
        accounts,
        upstream,
        rates,
        catalog,
    };

    let bot = Bot::new(config.bot_token.clone());

    let (tx, rx) = tokio::sync::broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C received, shutting down");
            let _ = tx.send(());
        }
    });

    bot::run_bot(bot, rx, state).await;
    Ok(())
}
