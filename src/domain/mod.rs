//! Pricing logic for design-service quotes lives here.

pub mod catalog;
pub mod currency;
pub mod entities;
pub mod evaluation;
pub mod profiles;

pub use catalog::{FormCatalog, FormOption, MAX_UNITS};
pub use currency::{CurrencyFormatter, FormattedPrice, DEFAULT_RUB_ROUNDING, FALLBACK_USD_RUB};
pub use entities::{HoursRange, ProjectInput, Quote, QuoteBreakdown};
pub use evaluation::{compute_quote, QuoteEngine};
pub use profiles::{
    CostCurve, DesignerShare, HoursEstimate, HoursPrecision, PricingTable, RegionRule, SourceRule,
    UrgencyRule, WorkTypeProfile,
};
