use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{CoreError, Result};
use crate::pricing::parse_rate;
use crate::store::RateStore;

pub const DEFAULT_BASE_CURRENCY: &str = "USD";

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Rates seeded into storage when no override exists.
pub fn default_rates() -> BTreeMap<String, Decimal> {
    BTreeMap::from([("ETB".to_string(), dec!(158.5))])
}

/// Immutable snapshot of exchange rates relative to the base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: String,
    rates: BTreeMap<String, Decimal>,
}

impl RateTable {
    /// Builds a table, dropping non-positive rates and any entry for the base
    /// currency itself (the base always converts at 1).
    pub fn new<I>(base: &str, rates: I) -> Self
    where
        I: IntoIterator<Item = (String, Decimal)>,
    {
        let base = normalize_code(base);
        let mut table = BTreeMap::new();
        for (code, rate) in rates {
            let code = normalize_code(&code);
            if code.is_empty() || code == base {
                continue;
            }
            if rate <= Decimal::ZERO {
                warn!("Dropping non-positive rate {} for {}", rate, code);
                continue;
            }
            table.insert(code, rate);
        }
        Self { base, rates: table }
    }

    pub fn base_only(base: &str) -> Self {
        Self::new(base, std::iter::empty())
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_base(&self, code: &str) -> bool {
        normalize_code(code) == self.base
    }

    pub fn rate(&self, code: &str) -> Result<Decimal> {
        let code = normalize_code(code);
        if code == self.base {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&code)
            .copied()
            .ok_or(CoreError::UnknownCurrency(code))
    }

    /// `amount_base * rate[currency]`; a product too large for a `Decimal`
    /// is reported as `InvalidRateFormat`.
    pub fn convert(&self, amount_base: Decimal, currency: &str) -> Result<Decimal> {
        let rate = self.rate(currency)?;
        amount_base
            .checked_mul(rate)
            .ok_or_else(|| CoreError::InvalidRateFormat(format!("{} x {}", amount_base, rate)))
    }

    /// Base currency first, then the others alphabetically.
    pub fn currencies(&self) -> Vec<&str> {
        std::iter::once(self.base.as_str())
            .chain(self.rates.keys().map(String::as_str))
            .collect()
    }

    /// Number of currencies including the base.
    pub fn len(&self) -> usize {
        self.rates.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Process-wide handle to the current [`RateTable`].
///
/// The lock guards only the pointer: readers clone the `Arc`, reload builds a
/// complete table off-lock and swaps it in. Reloads run one at a time, so a
/// slow read of older storage never overwrites a newer table.
#[derive(Clone)]
pub struct RateRegistry {
    current: Arc<RwLock<Arc<RateTable>>>,
    defaults: Arc<BTreeMap<String, Decimal>>,
    reloading: Arc<Mutex<()>>,
}

impl RateRegistry {
    pub fn new(base: &str, defaults: BTreeMap<String, Decimal>) -> Self {
        let defaults: BTreeMap<String, Decimal> = defaults
            .into_iter()
            .map(|(code, rate)| (normalize_code(&code), rate))
            .collect();
        let initial = RateTable::new(base, defaults.clone());
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
            defaults: Arc::new(defaults),
            reloading: Arc::new(Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> Arc<RateTable> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn publish(&self, table: RateTable) -> Arc<RateTable> {
        let table = Arc::new(table);
        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&table),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&table),
        }
        table
    }

    /// Re-reads persisted overrides and publishes a new snapshot.
    ///
    /// Defaults missing from storage are written back. If storage cannot be
    /// read the previous snapshot stays in place and is returned.
    pub async fn reload<S>(&self, store: &S) -> Arc<RateTable>
    where
        S: RateStore + ?Sized,
    {
        let _reload = self.reloading.lock().await;
        let persisted = match store.get_all_currency_rates().await {
            Ok(rates) => rates,
            Err(e) => {
                error!("Rate reload failed, keeping previous table: {}", e);
                return self.snapshot();
            }
        };

        let mut merged = BTreeMap::new();
        for (code, raw) in persisted {
            match parse_rate(&raw) {
                Ok(rate) => {
                    merged.insert(normalize_code(&code), rate);
                }
                Err(e) => warn!("Ignoring persisted rate for {}: {}", code, e),
            }
        }

        for (code, rate) in self.defaults.iter() {
            if merged.contains_key(code) {
                continue;
            }
            info!("Seeding default rate {} = {}", code, rate);
            if let Err(e) = store.update_currency_rate(code, *rate).await {
                warn!("Failed to persist default rate for {}: {}", code, e);
            }
            merged.insert(code.clone(), *rate);
        }

        let base = self.snapshot().base().to_string();
        let table = self.publish(RateTable::new(&base, merged));
        info!("Rate table reloaded with {} currencies", table.len());
        table
    }
}
