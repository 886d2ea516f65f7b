use crate::api_client::scalar_to_string;
use crate::config::UpstreamConfig;
use reqwest::Client;
use reseller_core::models::{Service, UpstreamBalance};
use reseller_core::pricing::parse_rate_or_zero;
use reseller_core::{CoreError, Result};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

fn unavailable(e: impl std::fmt::Display) -> CoreError {
    CoreError::UpstreamUnavailable(e.to_string())
}

/// One entry of the panel's `services` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawService {
    pub service: Value,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub rate: Value,
    #[serde(default)]
    pub min: Value,
    #[serde(default)]
    pub max: Value,
    #[serde(default)]
    pub refill: bool,
}

impl RawService {
    pub fn into_service(self, fixed_price: &HashSet<u64>) -> Option<Service> {
        let id = match scalar_to_string(&self.service).parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!("Skipping upstream service with bad id: {}", self.service);
                return None;
            }
        };
        Some(Service {
            id,
            name: self.name,
            category: self.category,
            base_rate: parse_rate_or_zero(&scalar_to_string(&self.rate)),
            min: scalar_to_string(&self.min).parse().unwrap_or(0),
            max: scalar_to_string(&self.max).parse().unwrap_or(0),
            refill: self.refill,
            skip_markup: fixed_price.contains(&id),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawBalance {
    balance: Value,
    #[serde(default)]
    currency: String,
}

/// Client for the upstream reseller panel (standard SMM panel API v2).
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    url: String,
    key: String,
    fixed_price: Arc<HashSet<u64>>,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.url.clone(),
            key: config.key.clone(),
            fixed_price: Arc::new(config.fixed_price_services.iter().copied().collect()),
        }
    }

    async fn call<T: DeserializeOwned>(&self, action: &str) -> Result<T> {
        let resp = self
            .client
            .post(&self.url)
            .form(&[("key", self.key.as_str()), ("action", action)])
            .send()
            .await
            .map_err(unavailable)?;

        if !resp.status().is_success() {
            return Err(unavailable(format!("{}: {}", action, resp.status())));
        }

        let body: Value = resp.json().await.map_err(unavailable)?;
        if let Some(err) = body.get("error").and_then(Value::as_str) {
            return Err(unavailable(format!("{}: {}", action, err)));
        }
        serde_json::from_value(body).map_err(unavailable)
    }

    pub async fn services(&self) -> Result<Vec<Service>> {
        let raw: Vec<RawService> = self.call("services").await?;
        Ok(raw
            .into_iter()
            .filter_map(|s| s.into_service(&self.fixed_price))
            .collect())
    }

    pub async fn balance(&self) -> Result<UpstreamBalance> {
        let raw: RawBalance = self.call("balance").await?;
        parse_balance(raw)
    }
}

fn parse_balance(raw: RawBalance) -> Result<UpstreamBalance> {
    let text = scalar_to_string(&raw.balance);
    let balance = Decimal::from_str(text.trim())
        .map_err(|_| unavailable(format!("malformed balance {:?}", text)))?;
    Ok(UpstreamBalance {
        balance,
        currency: raw.currency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn raw_service_maps_string_fields() {
        let raw: RawService = serde_json::from_value(json!({
            "service": 1,
            "name": "Followers",
            "type": "Default",
            "category": "Instagram",
            "rate": "0.90",
            "min": "50",
            "max": "10000",
            "refill": true
        }))
        .unwrap();
        let service = raw.into_service(&HashSet::new()).unwrap();
        assert_eq!(service.id, 1);
        assert_eq!(service.base_rate, dec!(0.90));
        assert_eq!((service.min, service.max), (50, 10000));
        assert!(service.refill);
        assert!(!service.skip_markup);
    }

    #[test]
    fn fixed_price_services_skip_markup() {
        let raw: RawService = serde_json::from_value(json!({
            "service": "12", "name": "Views", "rate": 3.5, "min": 100, "max": 1000
        }))
        .unwrap();
        let service = raw.into_service(&HashSet::from([12])).unwrap();
        assert!(service.skip_markup);
        assert_eq!(service.base_rate, dec!(3.5));
        assert_eq!(service.category, "");
    }

    #[test]
    fn bad_rate_becomes_zero_and_bad_id_is_skipped() {
        let raw: RawService = serde_json::from_value(json!({
            "service": 5, "name": "Likes", "rate": "call us"
        }))
        .unwrap();
        assert_eq!(raw.into_service(&HashSet::new()).unwrap().base_rate, Decimal::ZERO);

        let raw: RawService = serde_json::from_value(json!({
            "service": "abc", "name": "Likes", "rate": "1"
        }))
        .unwrap();
        assert!(raw.into_service(&HashSet::new()).is_none());
    }

    #[test]
    fn balance_parsing() {
        let ok = parse_balance(RawBalance {
            balance: json!("100.84"),
            currency: "USD".into(),
        })
        .unwrap();
        assert_eq!(ok.balance, dec!(100.84));

        let err = parse_balance(RawBalance {
            balance: json!("n/a"),
            currency: "USD".into(),
        })
        .unwrap_err();
        assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
    }
}
