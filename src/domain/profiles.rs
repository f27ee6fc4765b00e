//! Declarative pricing table: per-work-type curves and modifier lookups.
//!
//! Every number the engine uses lives here so that a formula revision is a
//! table change. The table deserializes from TOML; any section left out of a
//! config file keeps the canonical default below.

use serde::{Deserialize, Serialize};

use super::entities::HoursRange;

/// How the unit count turns into billable hours.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostCurve {
    /// Per-unit hours fall linearly from `base_hours_per_unit` to
    /// `min_hours_per_unit` as the count approaches `breakpoint_quantity + 1`.
    Linear {
        base_hours_per_unit: f64,
        min_hours_per_unit: f64,
        breakpoint_quantity: u32,
    },
    /// Flat bundle up to `threshold` units, then a fixed increment per unit.
    Tiered {
        threshold: u32,
        bundle_hours: f64,
        increment_hours: f64,
    },
}

impl CostCurve {
    /// Effective hours for a single unit at this quantity.
    pub fn hours_per_unit(&self, units: u32) -> f64 {
        if units == 0 {
            return 0.0;
        }
        self.total_hours(units) / f64::from(units)
    }

    pub fn total_hours(&self, units: u32) -> f64 {
        match *self {
            CostCurve::Linear {
                base_hours_per_unit,
                min_hours_per_unit,
                breakpoint_quantity,
            } => {
                let progress = linear_progress(units, breakpoint_quantity);
                let per_unit =
                    base_hours_per_unit - (base_hours_per_unit - min_hours_per_unit) * progress;
                per_unit * f64::from(units)
            }
            CostCurve::Tiered {
                threshold,
                bundle_hours,
                increment_hours,
            } => tiered_hours(units, threshold, bundle_hours, increment_hours),
        }
    }
}

/// How the hour range shown to the coordinator is derived.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoursEstimate {
    /// `hours_per_unit × units`, widened by `±spread`.
    Band {
        hours_per_unit: f64,
        #[serde(default = "default_spread")]
        spread: f64,
    },
    Range {
        min_hours_per_unit: f64,
        max_hours_per_unit: f64,
    },
    /// Same bundle/increment shape as [`CostCurve::Tiered`], widened by `±spread`.
    Tiered {
        threshold: u32,
        bundle_hours: f64,
        increment_hours: f64,
        #[serde(default = "default_spread")]
        spread: f64,
    },
}

impl HoursEstimate {
    /// Raw, unrounded bounds for the given quantity.
    pub fn raw_range(&self, units: u32) -> HoursRange {
        let count = f64::from(units);
        match *self {
            HoursEstimate::Band {
                hours_per_unit,
                spread,
            } => banded(hours_per_unit * count, spread),
            HoursEstimate::Range {
                min_hours_per_unit,
                max_hours_per_unit,
            } => HoursRange {
                min: min_hours_per_unit * count,
                max: max_hours_per_unit * count,
            },
            HoursEstimate::Tiered {
                threshold,
                bundle_hours,
                increment_hours,
                spread,
            } => banded(
                tiered_hours(units, threshold, bundle_hours, increment_hours),
                spread,
            ),
        }
    }
}

fn default_spread() -> f64 {
    0.2
}

fn banded(center: f64, spread: f64) -> HoursRange {
    HoursRange {
        min: center * (1.0 - spread),
        max: center * (1.0 + spread),
    }
}

/// Share of the way from the first unit to the breakpoint, clamped to `[0, 1]`.
pub fn linear_progress(units: u32, breakpoint: u32) -> f64 {
    if breakpoint == 0 {
        return 1.0;
    }
    (f64::from(units.saturating_sub(1)) / f64::from(breakpoint)).clamp(0.0, 1.0)
}

fn tiered_hours(units: u32, threshold: u32, bundle_hours: f64, increment_hours: f64) -> f64 {
    if units <= threshold {
        bundle_hours
    } else {
        bundle_hours + f64::from(units - threshold) * increment_hours
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkTypeProfile {
    pub code: String,
    pub label: String,
    /// What a single unit means for this work type (slides, pages, hours...).
    pub unit: String,
    pub curve: CostCurve,
    pub estimate: HoursEstimate,
    #[serde(default)]
    pub designer_share_adjustment_points: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceRule {
    pub code: String,
    pub label: String,
    pub factor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionRule {
    pub code: String,
    pub label: String,
    /// Additive surcharge in percent, applied as `×(1 + percent/100)`.
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UrgencyRule {
    pub days: u8,
    pub factor: f64,
    pub designer_points: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignerShare {
    pub base_points: f64,
    pub volume_start_points: f64,
    pub volume_end_points: f64,
    pub volume_breakpoint: u32,
    pub min_points: f64,
    pub max_points: f64,
}

impl Default for DesignerShare {
    fn default() -> Self {
        Self {
            base_points: 34.0,
            volume_start_points: 4.0,
            volume_end_points: -4.0,
            volume_breakpoint: 20,
            min_points: 26.0,
            max_points: 45.0,
        }
    }
}

impl DesignerShare {
    pub fn volume_points(&self, units: u32) -> f64 {
        let progress = linear_progress(units, self.volume_breakpoint);
        self.volume_start_points - (self.volume_start_points - self.volume_end_points) * progress
    }

    pub fn clamp(&self, points: f64) -> f64 {
        points.clamp(self.min_points, self.max_points.max(self.min_points))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursPrecision {
    Whole,
    #[default]
    Tenth,
}

impl HoursPrecision {
    pub fn round(self, hours: f64) -> f64 {
        match self {
            HoursPrecision::Whole => hours.round(),
            HoursPrecision::Tenth => (hours * 10.0).round() / 10.0,
        }
    }
}

/// The complete set of pricing parameters for one formula revision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingTable {
    pub work_types: Vec<WorkTypeProfile>,
    pub sources: Vec<SourceRule>,
    pub urgency: Vec<UrgencyRule>,
    pub regions: Vec<RegionRule>,
    pub designer_share: DesignerShare,
    pub discount_steps: Vec<u8>,
    /// Hours charged per unit for work types missing from the table.
    pub fallback_hours_per_unit: f64,
    pub fallback_estimate: HoursEstimate,
    pub hours_precision: HoursPrecision,
}

impl PricingTable {
    pub fn work_type(&self, code: &str) -> Option<&WorkTypeProfile> {
        self.work_types.iter().find(|profile| profile.code == code)
    }

    pub fn source_factor(&self, code: &str) -> Option<f64> {
        self.sources
            .iter()
            .find(|rule| rule.code == code)
            .map(|rule| rule.factor)
    }

    pub fn region_percent(&self, code: &str) -> Option<f64> {
        self.regions
            .iter()
            .find(|rule| rule.code == code)
            .map(|rule| rule.percent)
    }

    pub fn urgency_rule(&self, days: u8) -> Option<&UrgencyRule> {
        self.urgency.iter().find(|rule| rule.days == days)
    }

    pub fn is_discount_step(&self, percent: u8) -> bool {
        self.discount_steps.contains(&percent)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            work_types: default_work_types(),
            sources: vec![
                source("fiverr", "Fiverr", 0.9),
                source("upwork", "Upwork", 1.0),
                source("freelancer", "Freelancer", 0.95),
                source("telegram", "Telegram", 1.1),
                source("internal", "Internal", 1.2),
                source("other", "Other", 1.0),
            ],
            urgency: vec![
                UrgencyRule {
                    days: 1,
                    factor: 1.5,
                    designer_points: 4.0,
                },
                UrgencyRule {
                    days: 3,
                    factor: 1.3,
                    designer_points: 2.0,
                },
            ],
            regions: vec![
                region("north_america", "North America", 20.0),
                region("europe", "Europe", 15.0),
                region("asia", "Asia", 5.0),
                region("cis", "CIS", 0.0),
                region("middle_east", "Middle East", 10.0),
                region("africa", "Africa", 0.0),
                region("south_america", "South America", 0.0),
                region("australia_oceania", "Australia & Oceania", 15.0),
            ],
            designer_share: DesignerShare::default(),
            discount_steps: vec![0, 5, 10, 15],
            fallback_hours_per_unit: 1.0,
            fallback_estimate: HoursEstimate::Range {
                min_hours_per_unit: 1.0,
                max_hours_per_unit: 1.5,
            },
            hours_precision: HoursPrecision::default(),
        }
    }
}

fn default_work_types() -> Vec<WorkTypeProfile> {
    vec![
        profile(
            "presentation",
            "Presentation",
            "slides",
            linear(1.0, 0.5, 20),
            band(0.75),
            0.0,
        ),
        profile(
            "website_design",
            "Website Design",
            "pages",
            linear(6.0, 4.0, 10),
            range(4.0, 6.0),
            2.0,
        ),
        profile(
            "landing_page",
            "Landing Page",
            "sections",
            CostCurve::Tiered {
                threshold: 5,
                bundle_hours: 12.0,
                increment_hours: 2.0,
            },
            tiered_estimate(5, 12.0, 2.0),
            1.0,
        ),
        profile(
            "logo",
            "Logo",
            "variations",
            CostCurve::Tiered {
                threshold: 3,
                bundle_hours: 6.67,
                increment_hours: 1.5,
            },
            tiered_estimate(3, 6.67, 1.5),
            3.0,
        ),
        profile(
            "branding",
            "Logo+Brandbook+Aidentities",
            "elements",
            linear(3.0, 2.0, 15),
            band(2.5),
            2.0,
        ),
        profile(
            "social_media",
            "Social Media",
            "posts",
            linear(0.75, 0.4, 30),
            range(0.4, 0.75),
            -2.0,
        ),
        profile("print", "Print", "items", linear(2.0, 1.25, 10), band(1.5), 0.0),
        profile(
            "illustration",
            "Illustration",
            "illustrations",
            linear(4.0, 3.0, 10),
            range(3.0, 4.0),
            4.0,
        ),
        profile(
            "ui_ux",
            "UI/UX Hourly Rate",
            "hours",
            linear(1.0, 1.0, 1),
            range(1.0, 1.0),
            0.0,
        ),
        profile(
            "delegated_support",
            "Delegated Support",
            "hours",
            linear(1.0, 1.0, 1),
            range(1.0, 1.0),
            -4.0,
        ),
        profile(
            "web_development",
            "Web Page Development",
            "pages",
            CostCurve::Tiered {
                threshold: 3,
                bundle_hours: 16.0,
                increment_hours: 4.0,
            },
            tiered_estimate(3, 16.0, 4.0),
            0.0,
        ),
    ]
}

fn profile(
    code: &str,
    label: &str,
    unit: &str,
    curve: CostCurve,
    estimate: HoursEstimate,
    designer_share_adjustment_points: f64,
) -> WorkTypeProfile {
    WorkTypeProfile {
        code: code.to_string(),
        label: label.to_string(),
        unit: unit.to_string(),
        curve,
        estimate,
        designer_share_adjustment_points,
    }
}

fn linear(base: f64, min: f64, breakpoint: u32) -> CostCurve {
    CostCurve::Linear {
        base_hours_per_unit: base,
        min_hours_per_unit: min,
        breakpoint_quantity: breakpoint,
    }
}

fn band(hours_per_unit: f64) -> HoursEstimate {
    HoursEstimate::Band {
        hours_per_unit,
        spread: default_spread(),
    }
}

fn range(min: f64, max: f64) -> HoursEstimate {
    HoursEstimate::Range {
        min_hours_per_unit: min,
        max_hours_per_unit: max,
    }
}

fn tiered_estimate(threshold: u32, bundle_hours: f64, increment_hours: f64) -> HoursEstimate {
    HoursEstimate::Tiered {
        threshold,
        bundle_hours,
        increment_hours,
        spread: default_spread(),
    }
}

fn source(code: &str, label: &str, factor: f64) -> SourceRule {
    SourceRule {
        code: code.to_string(),
        label: label.to_string(),
        factor,
    }
}

fn region(code: &str, label: &str, percent: f64) -> RegionRule {
    RegionRule {
        code: code.to_string(),
        label: label.to_string(),
        percent,
    }
}
