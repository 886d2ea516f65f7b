use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A reseller service as offered by the upstream panel.
///
/// `base_rate` is the upstream cost per 1000 units in the base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: u64,
    pub name: String,
    pub category: String,
    pub base_rate: Decimal,
    pub min: u64,
    pub max: u64,
    pub refill: bool,
    /// Partner-fixed cost: shown as is, without markup.
    #[serde(default)]
    pub skip_markup: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub displayed_rate: Decimal,
    pub currency: String,
    pub per_1000: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

/// Ledger entry owned by the backend; this crate only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub description: String,
    /// ISO-8601 timestamp as stored by the ledger.
    pub created_at: String,
}

impl Transaction {
    /// Date portion of `created_at` (its first 10 characters).
    pub fn date(&self) -> Result<&str> {
        let date = self.created_at.get(..10).ok_or_else(|| {
            CoreError::MalformedTransaction(format!("timestamp too short: {:?}", self.created_at))
        })?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            CoreError::MalformedTransaction(format!("not a date: {:?}", self.created_at))
        })?;
        Ok(date)
    }

    /// Checks that the sign of `amount` agrees with `kind`.
    pub fn validate(&self) -> Result<()> {
        let consistent = match self.kind {
            TransactionKind::Credit => !self.amount.is_sign_negative() || self.amount.is_zero(),
            TransactionKind::Debit => self.amount.is_sign_negative() || self.amount.is_zero(),
        };
        if !consistent {
            return Err(CoreError::MalformedTransaction(format!(
                "{:?} with amount {}",
                self.kind, self.amount
            )));
        }
        self.date().map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: i64,
    pub currency_code: String,
    pub language_code: String,
}

/// Account balance held at the upstream reseller panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamBalance {
    pub balance: Decimal,
    pub currency: String,
}
