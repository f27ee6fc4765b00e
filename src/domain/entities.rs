use serde::{Deserialize, Serialize};

/// Project description as entered on the quote form.
///
/// Only `work_type` and `unit_count` (plus `hourly_rate`) are mandatory; every
/// other field is a modifier that stays neutral when unset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInput {
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub work_type: Option<String>,
    /// Number of deliverable units. Zero means "not filled in yet".
    #[serde(default)]
    pub unit_count: u32,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub is_urgent: bool,
    /// Delivery window in days when `is_urgent` is set (1 or 3, 0 for none).
    #[serde(default)]
    pub urgency_days: u8,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub discount_percent: u8,
}

impl ProjectInput {
    pub fn new(work_type: impl Into<String>, unit_count: u32, hourly_rate: f64) -> Self {
        Self {
            hourly_rate: Some(hourly_rate),
            work_type: Some(work_type.into()),
            unit_count,
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Marks the project urgent with the given delivery window.
    pub fn with_urgency(mut self, days: u8) -> Self {
        self.is_urgent = days > 0;
        self.urgency_days = days;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_discount(mut self, percent: u8) -> Self {
        self.discount_percent = percent;
        self
    }

    /// Work type code, treating an empty selection as unset.
    pub fn work_type_code(&self) -> Option<&str> {
        non_empty(self.work_type.as_deref())
    }

    pub fn source_code(&self) -> Option<&str> {
        non_empty(self.source.as_deref())
    }

    pub fn region_code(&self) -> Option<&str> {
        non_empty(self.region.as_deref())
    }

    /// Urgency day count that actually applies, or `None` for a regular project.
    pub fn effective_urgency_days(&self) -> Option<u8> {
        (self.is_urgent && self.urgency_days > 0).then_some(self.urgency_days)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|code| !code.is_empty())
}

/// Estimated effort shown next to the quote.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoursRange {
    pub min: f64,
    pub max: f64,
}

/// Unrounded intermediate values behind a [`Quote`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub base_sum: f64,
    pub client_before_discount: f64,
    pub designer_share_points: f64,
    pub designer_gross: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub client_price: i64,
    pub designer_price: i64,
    pub estimated_hours: HoursRange,
    pub breakdown: QuoteBreakdown,
}
