//! USD/RUB rendering of quoted prices.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Last known USD→RUB rate, used until a live rate arrives.
pub const FALLBACK_USD_RUB: f64 = 95.5;

/// RUB amounts are rounded to this many roubles before formatting.
pub const DEFAULT_RUB_ROUNDING: i64 = 10;

const NBSP: char = '\u{a0}';

/// Both renderings of a price plus the raw values for copying.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedPrice {
    pub usd: String,
    pub rub: String,
    pub usd_value: i64,
    pub rub_value: i64,
}

/// Formats prices in USD and RUB using an explicitly held exchange rate.
#[derive(Clone, Debug, PartialEq)]
pub struct CurrencyFormatter {
    usd_rub: f64,
    rub_rounding: i64,
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        Self::new(FALLBACK_USD_RUB, DEFAULT_RUB_ROUNDING)
    }
}

impl CurrencyFormatter {
    /// Invalid arguments fall back to the defaults.
    pub fn new(usd_rub: f64, rub_rounding: i64) -> Self {
        let mut formatter = Self {
            usd_rub: FALLBACK_USD_RUB,
            rub_rounding: rub_rounding.max(1),
        };
        formatter.set_exchange_rate(usd_rub);
        formatter
    }

    pub fn exchange_rate(&self) -> f64 {
        self.usd_rub
    }

    /// Replaces the rate; non-finite or non-positive values are ignored.
    pub fn set_exchange_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.usd_rub = rate;
        } else {
            debug!(rate, "ignoring invalid exchange rate");
        }
    }

    /// Saturates at the `i64` bounds for amounts beyond them.
    pub fn rub_value(&self, usd: i64) -> i64 {
        let unit = self.rub_rounding as f64;
        (((usd as f64 * self.usd_rub) / unit).round() * unit) as i64
    }

    pub fn format_usd(&self, usd: i64) -> String {
        let digits = group_digits(usd.unsigned_abs(), ',');
        if usd < 0 {
            format!("-${digits}")
        } else {
            format!("${digits}")
        }
    }

    pub fn format_rub(&self, usd: i64) -> String {
        format_rub_amount(self.rub_value(usd))
    }

    pub fn format(&self, usd: i64) -> FormattedPrice {
        let rub_value = self.rub_value(usd);
        FormattedPrice {
            usd: self.format_usd(usd),
            rub: format_rub_amount(rub_value),
            usd_value: usd,
            rub_value,
        }
    }
}

fn format_rub_amount(rub: i64) -> String {
    let digits = group_digits(rub.unsigned_abs(), NBSP);
    let sign = if rub < 0 { "-" } else { "" };
    format!("{sign}{digits}{NBSP}₽")
}

fn group_digits(value: u64, separator: char) -> String {
    let raw = value.to_string();
    let mut grouped = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}
