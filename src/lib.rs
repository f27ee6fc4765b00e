//! Quote calculator for design-service projects.
//!
//! [`compute_quote`] turns a [`ProjectInput`] into a [`Quote`]: client price,
//! designer payout and an estimated hour range. [`CurrencyFormatter`] renders
//! prices in USD and RUB with an explicitly supplied exchange rate, and
//! [`infra::CbrClient`] supplies that rate, cached per calendar day.

pub mod config;
pub mod domain;
pub mod infra;
pub mod util;

pub use config::{ConfigError, QuoteConfig};
pub use domain::{
    compute_quote, CurrencyFormatter, FormCatalog, FormattedPrice, HoursRange, PricingTable,
    ProjectInput, Quote, QuoteEngine,
};
