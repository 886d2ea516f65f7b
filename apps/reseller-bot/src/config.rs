use anyhow::{Context, Result};
use reseller_core::pricing::MarkupPolicy;
use reseller_core::rates::{default_rates, DEFAULT_BASE_CURRENCY};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub url: String,
    pub key: String,
    /// Services whose upstream cost is passed through without markup.
    #[serde(default)]
    pub fixed_price_services: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub bot_token: String,
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub backend_token: String,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    #[serde(default = "default_support_contact")]
    pub support_contact: String,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_transactions_limit")]
    pub transactions_limit: usize,
    #[serde(default = "default_page_size")]
    pub services_page_size: usize,
    /// Periodic rate reload; 0 disables it.
    #[serde(default)]
    pub rate_refresh_secs: u64,
    #[serde(default)]
    pub locales_path: Option<String>,
    #[serde(default)]
    pub markup: MarkupPolicy,
    #[serde(default = "default_rates")]
    pub default_rates: BTreeMap<String, Decimal>,
}

fn default_backend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_support_contact() -> String {
    "@support".to_string()
}

fn default_base_currency() -> String {
    DEFAULT_BASE_CURRENCY.to_string()
}

fn default_transactions_limit() -> usize {
    5
}

fn default_page_size() -> usize {
    10
}

impl BotConfig {
    pub fn load() -> Result<Self> {
        let config_paths = vec!["/etc/reseller-bot/bot.toml", "./bot.toml"];

        for path in config_paths {
            if let Ok(contents) = fs::read_to_string(path) {
                tracing::info!("Loading config from {}", path);
                return Self::from_toml(&contents).with_context(|| format!("Invalid config in {}", path));
            }
        }

        tracing::info!("Loading config from environment");
        Self::from_env()
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn from_env() -> Result<Self> {
        let mut markup = MarkupPolicy::default();
        if let Some(v) = env_decimal("MARKUP_THRESHOLD")? {
            markup.threshold = v;
        }
        if let Some(v) = env_decimal("MARKUP_LOW_MULTIPLIER")? {
            markup.low_multiplier = v;
        }
        if let Some(v) = env_decimal("MARKUP_HIGH_MULTIPLIER")? {
            markup.high_multiplier = v;
        }

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN is not set")?,
            backend_url: env::var("BACKEND_URL").unwrap_or_else(|_| default_backend_url()),
            backend_token: env::var("BACKEND_TOKEN").unwrap_or_default(),
            upstream: UpstreamConfig {
                url: env::var("UPSTREAM_URL").context("UPSTREAM_URL is not set")?,
                key: env::var("UPSTREAM_KEY").context("UPSTREAM_KEY is not set")?,
                fixed_price_services: parse_list(&env::var("FIXED_PRICE_SERVICES").unwrap_or_default()),
            },
            admin_ids: parse_list(&env::var("ADMIN_IDS").unwrap_or_default()),
            support_contact: env::var("SUPPORT_CONTACT").unwrap_or_else(|_| default_support_contact()),
            base_currency: env::var("BASE_CURRENCY").unwrap_or_else(|_| default_base_currency()),
            transactions_limit: env::var("TRANSACTIONS_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_transactions_limit),
            services_page_size: env::var("SERVICES_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_page_size),
            rate_refresh_secs: env::var("RATE_REFRESH_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            locales_path: env::var("LOCALES_PATH").ok().filter(|p| !p.is_empty()),
            markup,
            default_rates: match env::var("DEFAULT_RATES") {
                Ok(raw) if !raw.trim().is_empty() => parse_rate_pairs(&raw)?,
                _ => default_rates(),
            },
        })
    }

    pub fn is_admin(&self, tg_id: i64) -> bool {
        self.admin_ids.contains(&tg_id)
    }
}

fn env_decimal(key: &str) -> Result<Option<Decimal>> {
    match env::var(key) {
        Ok(raw) => Ok(Some(
            Decimal::from_str(raw.trim()).with_context(|| format!("{} is not a number: {}", key, raw))?,
        )),
        Err(_) => Ok(None),
    }
}

/// `"1, 2,x,3"` -> `[1, 2, 3]`; unparsable items are logged and skipped.
fn parse_list<T: FromStr>(raw: &str) -> Vec<T> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid list entry: {}", s);
                None
            }
        })
        .collect()
}

/// `"ETB=158.5, EUR=0.92"`
fn parse_rate_pairs(raw: &str) -> Result<BTreeMap<String, Decimal>> {
    let mut rates = BTreeMap::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (code, rate) = pair
            .split_once('=')
            .with_context(|| format!("Expected CODE=RATE, got {}", pair))?;
        let rate = Decimal::from_str(rate.trim()).with_context(|| format!("Invalid rate in {}", pair))?;
        rates.insert(code.trim().to_ascii_uppercase(), rate);
    }
    Ok(rates)
}
