//! Optional TOML configuration: pricing table overrides, currency and rate source.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::{
    CostCurve, CurrencyFormatter, HoursEstimate, PricingTable, DEFAULT_RUB_ROUNDING,
    FALLBACK_USD_RUB,
};
use crate::infra::cbr::DEFAULT_BASE_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub pricing: PricingTable,
    pub currency: CurrencyConfig,
    pub exchange: ExchangeConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    /// USD→RUB rate used until a live rate is known.
    pub fallback_rate: f64,
    /// RUB amounts are rounded to a multiple of this before display.
    pub rounding_unit: i64,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            fallback_rate: FALLBACK_USD_RUB,
            rounding_unit: DEFAULT_RUB_ROUNDING,
        }
    }
}

impl CurrencyConfig {
    pub fn formatter(&self) -> CurrencyFormatter {
        CurrencyFormatter::new(self.fallback_rate, self.rounding_unit)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    /// Never hit the network; use the cached or fallback rate.
    pub offline: bool,
    /// Directory for the daily rate cache. Platform data dir when unset.
    pub cache_dir: Option<String>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            offline: false,
            cache_dir: None,
        }
    }
}

impl QuoteConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let share = &self.pricing.designer_share;
        if share.min_points > share.max_points {
            return Err(ConfigError::Invalid(format!(
                "designer_share.min_points ({}) exceeds max_points ({})",
                share.min_points, share.max_points
            )));
        }
        if let Some(profile) = self
            .pricing
            .work_types
            .iter()
            .find(|profile| profile.code.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "work type \"{}\" has an empty code",
                profile.label
            )));
        }
        self.validate_amounts()?;
        if self.currency.rounding_unit < 1 {
            return Err(ConfigError::Invalid(
                "currency.rounding_unit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Hours and factors must be finite and non-negative; the engine clamps
    /// nothing on its own.
    fn validate_amounts(&self) -> Result<(), ConfigError> {
        let pricing = &self.pricing;
        for profile in &pricing.work_types {
            let at = format!("work type \"{}\"", profile.code);
            check_curve(&at, &profile.curve)?;
            check_estimate(&at, &profile.estimate)?;
            finite(
                &at,
                "designer_share_adjustment_points",
                profile.designer_share_adjustment_points,
            )?;
        }
        non_negative("pricing", "fallback_hours_per_unit", pricing.fallback_hours_per_unit)?;
        check_estimate("pricing.fallback_estimate", &pricing.fallback_estimate)?;

        for source in &pricing.sources {
            non_negative(&format!("source \"{}\"", source.code), "factor", source.factor)?;
        }
        for rule in &pricing.urgency {
            let at = format!("urgency rule for {} days", rule.days);
            non_negative(&at, "factor", rule.factor)?;
            finite(&at, "designer_points", rule.designer_points)?;
        }
        for region in &pricing.regions {
            let at = format!("region \"{}\"", region.code);
            finite(&at, "percent", region.percent)?;
            if region.percent <= -100.0 {
                return Err(ConfigError::Invalid(format!(
                    "{at}: percent must be above -100, got {}",
                    region.percent
                )));
            }
        }

        let share = &pricing.designer_share;
        for (field, value) in [
            ("base_points", share.base_points),
            ("volume_start_points", share.volume_start_points),
            ("volume_end_points", share.volume_end_points),
            ("min_points", share.min_points),
            ("max_points", share.max_points),
        ] {
            finite("designer_share", field, value)?;
        }

        let rate = self.currency.fallback_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "currency.fallback_rate must be positive, got {rate}"
            )));
        }
        Ok(())
    }
}

fn finite(at: &str, field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{at}: {field} must be a finite number, got {value}"
        )))
    }
}

fn non_negative(at: &str, field: &str, value: f64) -> Result<(), ConfigError> {
    finite(at, field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Invalid(format!(
            "{at}: {field} must not be negative, got {value}"
        )));
    }
    Ok(())
}

fn check_curve(at: &str, curve: &CostCurve) -> Result<(), ConfigError> {
    match *curve {
        CostCurve::Linear {
            base_hours_per_unit,
            min_hours_per_unit,
            ..
        } => {
            non_negative(at, "base_hours_per_unit", base_hours_per_unit)?;
            non_negative(at, "min_hours_per_unit", min_hours_per_unit)
        }
        CostCurve::Tiered {
            bundle_hours,
            increment_hours,
            ..
        } => {
            non_negative(at, "bundle_hours", bundle_hours)?;
            non_negative(at, "increment_hours", increment_hours)
        }
    }
}

fn check_estimate(at: &str, estimate: &HoursEstimate) -> Result<(), ConfigError> {
    match *estimate {
        HoursEstimate::Band {
            hours_per_unit,
            spread,
        } => {
            non_negative(at, "hours_per_unit", hours_per_unit)?;
            check_spread(at, spread)
        }
        HoursEstimate::Range {
            min_hours_per_unit,
            max_hours_per_unit,
        } => {
            non_negative(at, "min_hours_per_unit", min_hours_per_unit)?;
            non_negative(at, "max_hours_per_unit", max_hours_per_unit)
        }
        HoursEstimate::Tiered {
            bundle_hours,
            increment_hours,
            spread,
            ..
        } => {
            non_negative(at, "bundle_hours", bundle_hours)?;
            non_negative(at, "increment_hours", increment_hours)?;
            check_spread(at, spread)
        }
    }
}

fn check_spread(at: &str, spread: f64) -> Result<(), ConfigError> {
    non_negative(at, "spread", spread)?;
    if spread > 1.0 {
        return Err(ConfigError::Invalid(format!(
            "{at}: spread must be at most 1, got {spread}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HoursPrecision;

    #[test]
    fn empty_file_yields_defaults() {
        let config = QuoteConfig::from_toml_str("").unwrap();
        assert_eq!(config, QuoteConfig::default());
        assert_eq!(config.pricing.work_types.len(), 11);
    }

    #[test]
    fn missing_path_yields_defaults() {
        assert_eq!(QuoteConfig::load(None).unwrap(), QuoteConfig::default());
    }

    #[test]
    fn partial_pricing_override_keeps_other_sections() {
        let config = QuoteConfig::from_toml_str(
            r#"
            [pricing]
            hours_precision = "whole"
            discount_steps = [0, 20]

            [[pricing.work_types]]
            code = "logo"
            label = "Logo"
            unit = "variations"
            designer_share_adjustment_points = 5
            curve = { kind = "tiered", threshold = 2, bundle_hours = 5, increment_hours = 2 }
            estimate = { kind = "band", hours_per_unit = 2 }

            [currency]
            fallback_rate = 90.0
            "#,
        )
        .unwrap();

        assert_eq!(config.pricing.hours_precision, HoursPrecision::Whole);
        assert_eq!(config.pricing.discount_steps, vec![0, 20]);
        assert_eq!(config.pricing.work_types.len(), 1);
        assert_eq!(
            config.pricing.work_types[0].curve,
            CostCurve::Tiered {
                threshold: 2,
                bundle_hours: 5.0,
                increment_hours: 2.0
            }
        );
        assert_eq!(config.pricing.sources.len(), 6);
        assert_eq!(config.pricing.designer_share.base_points, 34.0);
        assert_eq!(config.currency.fallback_rate, 90.0);
        assert_eq!(config.currency.rounding_unit, DEFAULT_RUB_ROUNDING);
        assert!(!config.exchange.offline);
    }

    #[test]
    fn rejects_inverted_share_band() {
        let err = QuoteConfig::from_toml_str(
            r#"
            [pricing.designer_share]
            min_points = 50
            max_points = 40
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_negative_curve_hours() {
        let err = QuoteConfig::from_toml_str(
            r#"
            [[pricing.work_types]]
            code = "logo"
            label = "Logo"
            unit = "variations"
            curve = { kind = "tiered", threshold = 3, bundle_hours = -6.67, increment_hours = 1.5 }
            estimate = { kind = "band", hours_per_unit = 2 }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("bundle_hours")));
    }

    #[test]
    fn rejects_negative_source_factor() {
        let err = QuoteConfig::from_toml_str(
            r#"
            [[pricing.sources]]
            code = "upwork"
            label = "Upwork"
            factor = -1.2
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("upwork")));
    }

    #[test]
    fn rejects_bad_fallback_hours() {
        for value in ["nan", "-1.0", "inf"] {
            let err = QuoteConfig::from_toml_str(&format!(
                "[pricing]\nfallback_hours_per_unit = {value}\n"
            ))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{value}");
        }
    }

    #[test]
    fn rejects_estimate_spread_above_one() {
        let err = QuoteConfig::from_toml_str(
            r#"
            [pricing]
            fallback_estimate = { kind = "band", hours_per_unit = 1.0, spread = 1.5 }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("spread")));
    }

    #[test]
    fn rejects_region_wiping_out_the_price() {
        let err = QuoteConfig::from_toml_str(
            r#"
            [[pricing.regions]]
            code = "nowhere"
            label = "Nowhere"
            percent = -100
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            QuoteConfig::from_toml_str("[pricing"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quote.toml");
        fs::write(&path, "[exchange]\noffline = true\n").unwrap();

        let config = QuoteConfig::load(Some(&path)).unwrap();
        assert!(config.exchange.offline);

        let missing = QuoteConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
