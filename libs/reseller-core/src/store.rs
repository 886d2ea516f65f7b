//! Contracts of the persistent backend the core reads from.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Transaction, UserPreference};

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_balance(&self, user_id: i64) -> Result<Decimal>;
    async fn get_currency_preference(&self, user_id: i64) -> Result<String>;
    async fn get_language(&self, user_id: i64) -> Result<String>;
    /// Newest first, at most `limit` entries.
    async fn get_transactions(&self, user_id: i64, limit: usize) -> Result<Vec<Transaction>>;
    async fn set_currency_preference(&self, user_id: i64, currency: &str) -> Result<()>;
    async fn set_language(&self, user_id: i64, language: &str) -> Result<()>;

    async fn get_preference(&self, user_id: i64) -> Result<UserPreference> {
        Ok(UserPreference {
            user_id,
            currency_code: self.get_currency_preference(user_id).await?,
            language_code: self.get_language(user_id).await?,
        })
    }
}

/// Persisted currency rate overrides.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Raw persisted values keyed by currency code; parsing happens on reload.
    async fn get_all_currency_rates(&self) -> Result<BTreeMap<String, String>>;
    async fn update_currency_rate(&self, code: &str, rate: Decimal) -> Result<()>;
}
