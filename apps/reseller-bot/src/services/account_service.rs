use crate::api_client::{scalar_to_string, ApiClient, BackendError};
use async_trait::async_trait;
use reseller_core::i18n::FALLBACK_LANGUAGE;
use reseller_core::models::Transaction;
use reseller_core::store::{AccountStore, RateStore};
use reseller_core::{CoreError, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

fn storage(e: BackendError) -> CoreError {
    CoreError::Storage(e.to_string())
}

#[derive(Debug, Clone, serde::Deserialize)]
struct Preferences {
    currency: Option<String>,
    language: Option<String>,
}

/// Accounts, ledger and currency rates as served by the backend API.
#[derive(Clone)]
pub struct AccountService {
    api: ApiClient,
    base_currency: String,
}

impl AccountService {
    pub fn new(api: ApiClient, base_currency: &str) -> Self {
        Self {
            api,
            base_currency: base_currency.to_string(),
        }
    }

    async fn preferences(&self, user_id: i64) -> Result<Preferences> {
        self.api
            .get::<Preferences>(&format!("/users/{}/preferences", user_id))
            .await
            .map_err(storage)
    }
}

#[async_trait]
impl AccountStore for AccountService {
    async fn get_balance(&self, user_id: i64) -> Result<Decimal> {
        #[derive(serde::Deserialize)]
        struct BalanceResp {
            balance: Decimal,
        }
        let resp: BalanceResp = self
            .api
            .get(&format!("/users/{}/balance", user_id))
            .await
            .map_err(storage)?;
        Ok(resp.balance)
    }

    async fn get_currency_preference(&self, user_id: i64) -> Result<String> {
        Ok(self
            .preferences(user_id)
            .await?
            .currency
            .unwrap_or_else(|| self.base_currency.clone()))
    }

    async fn get_language(&self, user_id: i64) -> Result<String> {
        Ok(self
            .preferences(user_id)
            .await?
            .language
            .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string()))
    }

    async fn get_preference(&self, user_id: i64) -> Result<reseller_core::models::UserPreference> {
        let prefs = self.preferences(user_id).await?;
        Ok(reseller_core::models::UserPreference {
            user_id,
            currency_code: prefs.currency.unwrap_or_else(|| self.base_currency.clone()),
            language_code: prefs.language.unwrap_or_else(|| FALLBACK_LANGUAGE.to_string()),
        })
    }

    async fn get_transactions(&self, user_id: i64, limit: usize) -> Result<Vec<Transaction>> {
        self.api
            .get::<Vec<Transaction>>(&format!("/users/{}/transactions?limit={}", user_id, limit))
            .await
            .map_err(storage)
    }

    async fn set_currency_preference(&self, user_id: i64, currency: &str) -> Result<()> {
        #[derive(serde::Serialize)]
        struct CurrencyReq<'a> {
            currency: &'a str,
        }
        let _: serde_json::Value = self
            .api
            .post(&format!("/users/{}/currency", user_id), &CurrencyReq { currency })
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn set_language(&self, user_id: i64, language: &str) -> Result<()> {
        #[derive(serde::Serialize)]
        struct LangReq<'a> {
            lang: &'a str,
        }
        let _: serde_json::Value = self
            .api
            .post(&format!("/users/{}/language", user_id), &LangReq { lang: language })
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl RateStore for AccountService {
    async fn get_all_currency_rates(&self) -> Result<BTreeMap<String, String>> {
        let raw: BTreeMap<String, serde_json::Value> =
            self.api.get("/currency-rates").await.map_err(storage)?;
        Ok(raw
            .iter()
            .map(|(code, value)| (code.clone(), scalar_to_string(value)))
            .collect())
    }

    async fn update_currency_rate(&self, code: &str, rate: Decimal) -> Result<()> {
        #[derive(serde::Serialize)]
        struct RateReq<'a> {
            code: &'a str,
            rate: String,
        }
        let _: serde_json::Value = self
            .api
            .post(
                &format!("/currency-rates/{}", urlencoding::encode(code)),
                &RateReq {
                    code,
                    rate: rate.to_string(),
                },
            )
            .await
            .map_err(storage)?;
        Ok(())
    }
}
