use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reseller_core::composer::{compose_balance_view, Action, BalanceInput};
use reseller_core::i18n::Catalog;
use reseller_core::models::{Transaction, TransactionKind};
use reseller_core::rates::{default_rates, RateRegistry};
use reseller_core::store::{AccountStore, RateStore};
use reseller_core::{CoreError, Decimal, Result};
use rust_decimal_macros::dec;

struct Backend {
    balance: Decimal,
    currency: String,
    language: String,
    transactions: Vec<Transaction>,
    rates: Mutex<BTreeMap<String, String>>,
}

impl Backend {
    fn new(currency: &str, language: &str) -> Self {
        Self {
            balance: dec!(10.0),
            currency: currency.into(),
            language: language.into(),
            transactions: vec![
                Transaction {
                    amount: dec!(25),
                    kind: TransactionKind::Credit,
                    description: "Manual top-up".into(),
                    created_at: "2024-06-01T10:00:00Z".into(),
                },
                Transaction {
                    amount: dec!(-15),
                    kind: TransactionKind::Debit,
                    description: "Order 1001".into(),
                    created_at: "2024-06-02T11:30:00Z".into(),
                },
            ],
            rates: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl AccountStore for Backend {
    async fn get_balance(&self, _user_id: i64) -> Result<Decimal> {
        Ok(self.balance)
    }

    async fn get_currency_preference(&self, _user_id: i64) -> Result<String> {
        Ok(self.currency.clone())
    }

    async fn get_language(&self, _user_id: i64) -> Result<String> {
        Ok(self.language.clone())
    }

    async fn get_transactions(&self, _user_id: i64, limit: usize) -> Result<Vec<Transaction>> {
        Ok(self.transactions.iter().take(limit).cloned().collect())
    }

    async fn set_currency_preference(&self, _user_id: i64, _currency: &str) -> Result<()> {
        Err(CoreError::Storage("read-only".into()))
    }

    async fn set_language(&self, _user_id: i64, _language: &str) -> Result<()> {
        Err(CoreError::Storage("read-only".into()))
    }
}

#[async_trait]
impl RateStore for Backend {
    async fn get_all_currency_rates(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.rates.lock().unwrap().clone())
    }

    async fn update_currency_rate(&self, code: &str, rate: Decimal) -> Result<()> {
        self.rates.lock().unwrap().insert(code.into(), rate.to_string());
        Ok(())
    }
}

async fn render(backend: &Backend, registry: &RateRegistry) -> reseller_core::composer::View {
    let pref = backend.get_preference(7).await.unwrap();
    let balance = backend.get_balance(pref.user_id).await.unwrap();
    let transactions = backend.get_transactions(pref.user_id, 10).await.unwrap();
    let rates = registry.snapshot();
    compose_balance_view(
        &BalanceInput {
            balance,
            currency: &pref.currency_code,
            language: &pref.language_code,
            transactions: &transactions,
            limit: 10,
            panel_balance: None,
        },
        &rates,
        &Catalog::builtin(),
    )
}

#[tokio::test]
async fn balance_view_after_startup_reload() {
    let backend = Backend::new("ETB", "en");
    let registry = RateRegistry::new("USD", default_rates());
    registry.reload(&backend).await;

    let view = render(&backend, &registry).await;

    assert!(view.text.starts_with("<b>💼 Your account</b>"));
    assert!(view.text.contains("ETB 1,585 (≈$10.00)"));
    assert!(view.text.find("Order 1001").unwrap() < view.text.find("Manual top-up").unwrap());
    assert_eq!(view.controls[0][0].action, Action::RefreshBalance);
    assert_eq!(view.controls[0][1].action, Action::AddFunds);
}

#[tokio::test]
async fn refresh_without_changes_is_byte_identical() {
    let backend = Backend::new("USD", "ru");
    let registry = RateRegistry::new("USD", default_rates());
    registry.reload(&backend).await;

    let first = render(&backend, &registry).await;
    let second = render(&backend, &registry).await;

    assert_eq!(first.text, second.text);
    assert!(first.text.contains("Баланс: <b>$10.00</b>"));
}

#[tokio::test]
async fn rate_change_shows_up_after_reload() {
    let backend = Backend::new("ETB", "en");
    let registry = RateRegistry::new("USD", default_rates());
    registry.reload(&backend).await;
    let before = render(&backend, &registry).await;

    backend.rates.lock().unwrap().insert("ETB".into(), "160".into());
    registry.reload(&backend).await;
    let after = render(&backend, &registry).await;

    assert_ne!(before.text, after.text);
    assert!(after.text.contains("ETB 1,600 (≈$10.00)"));
}
