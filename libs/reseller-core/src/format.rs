//! Text rendering of money and rates for chat messages.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::error::Result;
use crate::rates::{normalize_code, RateTable};

/// Decimal places for base-currency prices per 1000 units.
pub const PER_1000_DP: u32 = 6;
/// Decimal places for base-currency money amounts.
pub const MONEY_DP: u32 = 2;
/// Decimal places for converted totals.
pub const CONVERTED_DP: u32 = 0;

fn currency_prefix(code: &str) -> String {
    match code {
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        other => format!("{} ", other),
    }
}

/// Renders `value` with exactly `dp` decimals and grouped thousands,
/// rounding half away from zero. The sign is returned separately.
fn fixed_parts(value: Decimal, dp: u32) -> (bool, String) {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    rounded = rounded.abs();
    rounded.rescale(dp);

    let text = rounded.to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };
    let mut out = group_thousands(int_part);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    (negative, out)
}

pub fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `1234.5` with 2 dp -> `1,234.50`.
pub fn format_fixed(value: Decimal, dp: u32) -> String {
    let (negative, digits) = fixed_parts(value, dp);
    if negative { format!("-{}", digits) } else { digits }
}

fn format_in(code: &str, value: Decimal, dp: u32, signed: bool) -> String {
    let (negative, digits) = fixed_parts(value, dp);
    let sign = match (negative, signed) {
        (true, _) => "-",
        (false, true) => "+",
        (false, false) => "",
    };
    format!("{}{}{}", sign, currency_prefix(code), digits)
}

/// `$10.00`, `-$5.00`.
pub fn format_base_money(amount: Decimal, rates: &RateTable) -> String {
    format_in(rates.base(), amount, MONEY_DP, false)
}

/// Like [`format_base_money`] but always carries a sign: `+$5.00`.
pub fn format_signed_base_money(amount: Decimal, rates: &RateTable) -> String {
    format_in(rates.base(), amount, MONEY_DP, true)
}

/// `ETB 1,585 (≈$10.00)`.
pub fn format_converted(amount_base: Decimal, currency: &str, rates: &RateTable) -> Result<String> {
    let code = normalize_code(currency);
    let converted = rates.convert(amount_base, &code)?;
    Ok(format!(
        "{} {} (≈{})",
        code,
        format_fixed(converted, CONVERTED_DP),
        format_base_money(amount_base, rates)
    ))
}

/// Balance in the user's currency; unknown currencies fall back to base.
pub fn format_balance(amount_base: Decimal, currency: &str, rates: &RateTable) -> String {
    if rates.is_base(currency) {
        return format_base_money(amount_base, rates);
    }
    format_converted(amount_base, currency, rates).unwrap_or_else(|e| {
        warn!("Showing balance in {}: {}", rates.base(), e);
        format_base_money(amount_base, rates)
    })
}

/// Per-1000 price: `$1.980000` in base, `ETB 314 (≈$1.98)` otherwise.
pub fn format_price_per_1000(displayed_base: Decimal, currency: &str, rates: &RateTable) -> String {
    let base = format_in(rates.base(), displayed_base, PER_1000_DP, false);
    if rates.is_base(currency) {
        return base;
    }
    format_converted(displayed_base, currency, rates).unwrap_or_else(|e| {
        warn!("Showing price in {}: {}", rates.base(), e);
        base
    })
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
