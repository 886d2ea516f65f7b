use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::models::{PricingResult, Service};
use crate::rates::{normalize_code, RateTable};

/// Prices are quoted per this many units of service.
pub const UNITS_PER_QUOTE: Decimal = Decimal::ONE_THOUSAND;

/// Parses an upstream rate such as `"0.90"` or `"1.2e-2"`.
pub fn parse_rate(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    let rate = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| CoreError::InvalidRateFormat(raw.to_string()))?;
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(CoreError::InvalidRateFormat(raw.to_string()));
    }
    Ok(rate)
}

/// Like [`parse_rate`], but logs the failure and continues with zero.
pub fn parse_rate_or_zero(raw: &str) -> Decimal {
    parse_rate(raw).unwrap_or_else(|e| {
        warn!("{}, using zero", e);
        Decimal::ZERO
    })
}

/// Tiered markup applied on top of upstream cost.
///
/// Units cheaper than `threshold` get `low_multiplier`, the rest get
/// `high_multiplier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupPolicy {
    pub threshold: Decimal,
    pub low_multiplier: Decimal,
    pub high_multiplier: Decimal,
}

impl Default for MarkupPolicy {
    fn default() -> Self {
        Self {
            threshold: Decimal::ONE,
            low_multiplier: dec!(2),
            high_multiplier: dec!(1.5),
        }
    }
}

impl MarkupPolicy {
    /// Customer-facing price per 1000 units, in the base currency.
    ///
    /// Fails with `InvalidRateFormat` when the marked-up price does not fit
    /// in a `Decimal`.
    pub fn display_price(&self, base_rate: Decimal, skip_markup: bool) -> Result<Decimal> {
        if skip_markup {
            return Ok(base_rate);
        }
        let unit = base_rate / UNITS_PER_QUOTE;
        let multiplier = if unit < self.threshold {
            self.low_multiplier
        } else {
            self.high_multiplier
        };
        unit.checked_mul(multiplier)
            .and_then(|unit| unit.checked_mul(UNITS_PER_QUOTE))
            .ok_or_else(|| CoreError::InvalidRateFormat(base_rate.to_string()))
    }

    /// Display price of `service` in `currency`, falling back to the base
    /// currency when the rate table does not know it or the converted
    /// amount overflows.
    pub fn price(&self, service: &Service, currency: &str, rates: &RateTable) -> Result<PricingResult> {
        let displayed = self.display_price(service.base_rate, service.skip_markup)?;
        Ok(match rates.convert(displayed, currency) {
            Ok(converted) => PricingResult {
                displayed_rate: converted,
                currency: normalize_code(currency),
                per_1000: true,
            },
            Err(e) => {
                warn!("Pricing service {} in base currency: {}", service.id, e);
                PricingResult {
                    displayed_rate: displayed,
                    currency: rates.base().to_string(),
                    per_1000: true,
                }
            }
        })
    }
}

/// [`MarkupPolicy::display_price`] under the default policy.
pub fn compute_display_price(base_rate: Decimal, skip_markup: bool) -> Result<Decimal> {
    MarkupPolicy::default().display_price(base_rate, skip_markup)
}

pub fn convert(amount_base: Decimal, currency: &str, rates: &RateTable) -> Result<Decimal> {
    rates.convert(amount_base, currency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::default_rates;

    fn service(base_rate: Decimal, skip_markup: bool) -> Service {
        Service {
            id: 7,
            name: "Followers".into(),
            category: "Instagram".into(),
            base_rate,
            min: 10,
            max: 5000,
            refill: false,
            skip_markup,
        }
    }

    #[test]
    fn cheap_units_are_doubled() {
        assert_eq!(compute_display_price(dec!(0.99), false), Ok(dec!(1.98)));
        assert_eq!(compute_display_price(dec!(8), false), Ok(dec!(16)));
        assert_eq!(compute_display_price(dec!(999.99), false), Ok(dec!(1999.98)));
    }

    #[test]
    fn expensive_units_get_half_again() {
        assert_eq!(compute_display_price(dec!(1000), false), Ok(dec!(1500)));
        assert_eq!(compute_display_price(dec!(2500.40), false), Ok(dec!(3750.60)));
    }

    #[test]
    fn tiers_hold_across_a_sweep() {
        for raw in ["0", "0.0001", "0.5", "3.333333", "120", "999.999", "1000", "1000.01", "78000"] {
            let base = parse_rate(raw).unwrap();
            let expected = if base / UNITS_PER_QUOTE < Decimal::ONE {
                base * dec!(2)
            } else {
                base * dec!(1.5)
            };
            assert_eq!(compute_display_price(base, false), Ok(expected), "rate {}", raw);
            assert_eq!(compute_display_price(base, true), Ok(base), "rate {}", raw);
        }
    }

    #[test]
    fn skip_markup_passes_through() {
        assert_eq!(compute_display_price(dec!(0.99), true), Ok(dec!(0.99)));
        assert_eq!(compute_display_price(dec!(4200), true), Ok(dec!(4200)));
    }

    #[test]
    fn configured_policy_is_used() {
        let policy = MarkupPolicy {
            threshold: dec!(0.5),
            low_multiplier: dec!(3),
            high_multiplier: dec!(1.1),
        };
        assert_eq!(policy.display_price(dec!(100), false), Ok(dec!(300)));
        assert_eq!(policy.display_price(dec!(600), false), Ok(dec!(660)));
    }

    #[test]
    fn parse_rate_accepts_numeric_strings() {
        assert_eq!(parse_rate(" 0.90 ").unwrap(), dec!(0.90));
        assert_eq!(parse_rate("1.2e-2").unwrap(), dec!(0.012));
        assert_eq!(parse_rate("15").unwrap(), dec!(15));
    }

    #[test]
    fn parse_rate_rejects_garbage_and_negatives() {
        for raw in ["", "abc", "1.5.2", "-3"] {
            assert_eq!(
                parse_rate(raw),
                Err(CoreError::InvalidRateFormat(raw.to_string()))
            );
        }
        assert_eq!(parse_rate_or_zero("abc"), Decimal::ZERO);
    }

    #[test]
    fn price_converts_into_preferred_currency() {
        let rates = RateTable::new("USD", default_rates());
        let result = MarkupPolicy::default()
            .price(&service(dec!(1), false), "etb", &rates)
            .unwrap();
        assert_eq!(result.currency, "ETB");
        assert_eq!(result.displayed_rate, dec!(317));
        assert!(result.per_1000);
    }

    #[test]
    fn price_falls_back_to_base_for_unknown_currency() {
        let rates = RateTable::new("USD", default_rates());
        let result = MarkupPolicy::default()
            .price(&service(dec!(1), false), "XYZ", &rates)
            .unwrap();
        assert_eq!(result.currency, "USD");
        assert_eq!(result.displayed_rate, dec!(2));
    }

    #[test]
    fn convert_reports_unknown_currency() {
        let rates = RateTable::base_only("USD");
        assert_eq!(
            convert(dec!(1), "ETB", &rates),
            Err(CoreError::UnknownCurrency("ETB".into()))
        );
    }

    #[test]
    fn largest_upstream_rate_is_rejected_not_multiplied() {
        let huge = parse_rate("79228162514264337593543950335").unwrap();
        assert_eq!(
            compute_display_price(huge, false),
            Err(CoreError::InvalidRateFormat(huge.to_string()))
        );
        assert_eq!(compute_display_price(huge, true), Ok(huge));
    }

    #[test]
    fn overflowing_conversion_prices_in_base() {
        let etb = Decimal::from_i128_with_scale(10i128.pow(20), 0);
        let rates = RateTable::new("USD", [("ETB".to_string(), etb)]);
        let result = MarkupPolicy::default()
            .price(&service(dec!(1000000000000), true), "ETB", &rates)
            .unwrap();
        assert_eq!(result.currency, "USD");
        assert_eq!(result.displayed_rate, dec!(1000000000000));
    }
}
