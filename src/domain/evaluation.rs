use std::sync::OnceLock;

use tracing::debug;

use super::entities::{HoursRange, ProjectInput, Quote, QuoteBreakdown};
use super::profiles::PricingTable;

/// Quote with the canonical pricing table.
pub fn compute_quote(input: &ProjectInput) -> Option<Quote> {
    static ENGINE: OnceLock<QuoteEngine> = OnceLock::new();
    ENGINE.get_or_init(QuoteEngine::default).compute_quote(input)
}

/// Pure pricing engine over one [`PricingTable`].
#[derive(Clone, Debug, Default)]
pub struct QuoteEngine {
    table: PricingTable,
}

impl QuoteEngine {
    pub fn new(table: PricingTable) -> Self {
        Self { table }
    }

    /// Returns `None` while the form is incomplete: no work type, no units,
    /// or no usable hourly rate.
    pub fn compute_quote(&self, input: &ProjectInput) -> Option<Quote> {
        let work_type = input.work_type_code()?;
        if input.unit_count == 0 {
            return None;
        }
        let hourly_rate = input
            .hourly_rate
            .filter(|rate| rate.is_finite() && *rate > 0.0)?;

        let units = input.unit_count;
        let base_sum = self.base_sum(work_type, units, hourly_rate);

        let urgency_factor = self.urgency_factor(input);
        let client_before_discount = base_sum
            * self.source_factor(input)
            * urgency_factor
            * (1.0 + self.region_percent(input) / 100.0);

        let discount = self.discount_percent(input);
        let client_price = (client_before_discount * (1.0 - discount / 100.0)).round() as i64;

        let share_points = self.designer_share_points(input);
        let designer_gross = base_sum * urgency_factor * (share_points / 100.0);
        let designer_price = (designer_gross * (1.0 - (discount / 2.0) / 100.0)).round() as i64;

        Some(Quote {
            client_price,
            designer_price,
            estimated_hours: self.estimated_hours(work_type, units),
            breakdown: QuoteBreakdown {
                base_sum,
                client_before_discount,
                designer_share_points: share_points,
                designer_gross,
            },
        })
    }

    /// Pre-modifier cost of `units` of `work_type` at `hourly_rate`.
    pub fn base_sum(&self, work_type: &str, units: u32, hourly_rate: f64) -> f64 {
        let hours = match self.table.work_type(work_type) {
            Some(profile) => profile.curve.total_hours(units),
            None => {
                debug!(work_type, "unknown work type, charging flat hours per unit");
                self.table.fallback_hours_per_unit * f64::from(units)
            }
        };
        hours * hourly_rate
    }

    fn source_factor(&self, input: &ProjectInput) -> f64 {
        let Some(code) = input.source_code() else {
            return 1.0;
        };
        self.table.source_factor(code).unwrap_or_else(|| {
            debug!(source = code, "unknown source, no adjustment");
            1.0
        })
    }

    fn region_percent(&self, input: &ProjectInput) -> f64 {
        let Some(code) = input.region_code() else {
            return 0.0;
        };
        self.table.region_percent(code).unwrap_or_else(|| {
            debug!(region = code, "unknown region, no adjustment");
            0.0
        })
    }

    fn urgency_factor(&self, input: &ProjectInput) -> f64 {
        input
            .effective_urgency_days()
            .and_then(|days| self.table.urgency_rule(days))
            .map(|rule| rule.factor)
            .unwrap_or(1.0)
    }

    fn urgency_points(&self, input: &ProjectInput) -> f64 {
        input
            .effective_urgency_days()
            .and_then(|days| self.table.urgency_rule(days))
            .map(|rule| rule.designer_points)
            .unwrap_or(0.0)
    }

    fn discount_percent(&self, input: &ProjectInput) -> f64 {
        let percent = input.discount_percent;
        if self.table.is_discount_step(percent) {
            f64::from(percent)
        } else {
            debug!(percent, "discount is not an offered step, ignoring");
            0.0
        }
    }

    /// Designer cut in percentage points, always inside the configured band.
    pub fn designer_share_points(&self, input: &ProjectInput) -> f64 {
        let share = &self.table.designer_share;
        let work_type_points = input
            .work_type_code()
            .and_then(|code| self.table.work_type(code))
            .map(|profile| profile.designer_share_adjustment_points)
            .unwrap_or(0.0);

        share.clamp(
            share.base_points
                + work_type_points
                + share.volume_points(input.unit_count)
                + self.urgency_points(input),
        )
    }

    pub fn estimated_hours(&self, work_type: &str, units: u32) -> HoursRange {
        let estimate = self
            .table
            .work_type(work_type)
            .map(|profile| &profile.estimate)
            .unwrap_or(&self.table.fallback_estimate);
        let raw = estimate.raw_range(units);

        let precision = self.table.hours_precision;
        let min = precision.round(raw.min);
        let max = precision.round(raw.max).max(min);
        HoursRange { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profiles::{CostCurve, HoursEstimate, HoursPrecision, WorkTypeProfile};

    fn engine() -> QuoteEngine {
        QuoteEngine::default()
    }

    #[test]
    fn incomplete_form_yields_none() {
        let engine = engine();
        assert!(engine.compute_quote(&ProjectInput::default()).is_none());
        assert!(engine
            .compute_quote(&ProjectInput::new("logo", 0, 30.0))
            .is_none());
        assert!(engine
            .compute_quote(&ProjectInput::new("", 3, 30.0))
            .is_none());
        assert!(engine
            .compute_quote(&ProjectInput::new("logo", 3, 0.0))
            .is_none());
        assert!(engine
            .compute_quote(&ProjectInput::new("logo", 3, f64::NAN))
            .is_none());

        let mut no_rate = ProjectInput::new("logo", 3, 30.0);
        no_rate.hourly_rate = None;
        assert!(engine.compute_quote(&no_rate).is_none());
    }

    #[test]
    fn logo_bundle_and_increments() {
        let engine = engine();
        let three = engine.compute_quote(&ProjectInput::new("logo", 3, 30.0)).unwrap();
        assert!((three.breakdown.base_sum - 6.67 * 30.0).abs() < 1e-9);
        assert_eq!(three.client_price, 200);

        let five = engine.compute_quote(&ProjectInput::new("logo", 5, 30.0)).unwrap();
        assert!((five.breakdown.base_sum - (6.67 + 2.0 * 1.5) * 30.0).abs() < 1e-9);
        assert_eq!(five.client_price, 290);
    }

    #[test]
    fn unknown_work_type_charges_flat_rate() {
        let quote = engine()
            .compute_quote(&ProjectInput::new("motion_graphics", 4, 25.0))
            .unwrap();
        assert_eq!(quote.breakdown.base_sum, 100.0);
        assert_eq!(quote.client_price, 100);
        assert_eq!(quote.estimated_hours, HoursRange { min: 4.0, max: 6.0 });
    }

    #[test]
    fn urgency_with_zero_region_scales_by_factor() {
        let input = ProjectInput::new("print", 10, 40.0)
            .with_urgency(1)
            .with_region("south_america");
        let quote = engine().compute_quote(&input).unwrap();
        assert!(
            (quote.breakdown.client_before_discount - quote.breakdown.base_sum * 1.5).abs() < 1e-9
        );
    }

    #[test]
    fn modifiers_stack_multiplicatively() {
        let input = ProjectInput::new("presentation", 1, 100.0)
            .with_source("internal")
            .with_urgency(3)
            .with_region("europe");
        let quote = engine().compute_quote(&input).unwrap();
        // 1 slide = 1 hour at $100
        let expected = 100.0 * 1.2 * 1.3 * 1.15;
        assert!((quote.breakdown.client_before_discount - expected).abs() < 1e-9);
        assert_eq!(quote.client_price, expected.round() as i64);
    }

    #[test]
    fn unknown_codes_are_neutral() {
        let engine = engine();
        let plain = engine
            .compute_quote(&ProjectInput::new("print", 6, 30.0))
            .unwrap();
        let odd = engine
            .compute_quote(
                &ProjectInput::new("print", 6, 30.0)
                    .with_source("myspace")
                    .with_region("antarctica")
                    .with_urgency(2)
                    .with_discount(12),
            )
            .unwrap();
        assert_eq!(plain.client_price, odd.client_price);
        assert_eq!(plain.designer_price, odd.designer_price);
    }

    #[test]
    fn discount_hits_client_fully_and_designer_by_half() {
        let engine = engine();
        let base = ProjectInput::new("website_design", 5, 50.0);
        let full = engine.compute_quote(&base).unwrap();
        let discounted = engine.compute_quote(&base.clone().with_discount(10)).unwrap();

        assert_eq!(
            discounted.client_price,
            (full.breakdown.client_before_discount * 0.9).round() as i64
        );
        assert_eq!(
            discounted.designer_price,
            (full.breakdown.designer_gross * 0.95).round() as i64
        );
        assert!(discounted.client_price < full.client_price);
        assert!(discounted.designer_price < full.designer_price);
    }

    #[test]
    fn designer_pay_ignores_source_and_region() {
        let engine = engine();
        let plain = engine
            .compute_quote(&ProjectInput::new("illustration", 4, 30.0))
            .unwrap();
        let dressed = engine
            .compute_quote(
                &ProjectInput::new("illustration", 4, 30.0)
                    .with_source("internal")
                    .with_region("north_america"),
            )
            .unwrap();
        assert_eq!(plain.designer_price, dressed.designer_price);
        assert!(dressed.client_price > plain.client_price);
    }

    #[test]
    fn designer_share_combines_adjustments() {
        let engine = engine();
        // base 34 + logo 3 + volume at 1 unit 4 + 1-day urgency 4
        let points = engine.designer_share_points(&ProjectInput::new("logo", 1, 30.0).with_urgency(1));
        assert_eq!(points, 45.0);

        // base 34 - support 4 + volume floor -4
        let points = engine.designer_share_points(&ProjectInput::new("delegated_support", 40, 30.0));
        assert_eq!(points, 26.0);

        // base 34 + volume at 11 units 0
        let points = engine.designer_share_points(&ProjectInput::new("print", 11, 30.0));
        assert_eq!(points, 34.0);
    }

    #[test]
    fn designer_share_is_clamped() {
        let mut table = PricingTable::default();
        table.work_types.push(WorkTypeProfile {
            code: "generous".to_string(),
            label: "Generous".to_string(),
            unit: "units".to_string(),
            curve: CostCurve::Linear {
                base_hours_per_unit: 1.0,
                min_hours_per_unit: 1.0,
                breakpoint_quantity: 1,
            },
            estimate: HoursEstimate::Range {
                min_hours_per_unit: 1.0,
                max_hours_per_unit: 1.0,
            },
            designer_share_adjustment_points: 80.0,
        });
        let generous = table.work_types.last().cloned().unwrap();
        table.work_types.push(WorkTypeProfile {
            code: "stingy".to_string(),
            designer_share_adjustment_points: -80.0,
            ..generous
        });
        let engine = QuoteEngine::new(table);

        let high = engine.designer_share_points(&ProjectInput::new("generous", 1, 10.0));
        let low = engine.designer_share_points(&ProjectInput::new("stingy", 1, 10.0));
        assert_eq!(high, 45.0);
        assert_eq!(low, 26.0);
    }

    #[test]
    fn designer_pay_scales_with_urgency() {
        let engine = engine();
        let quote = engine
            .compute_quote(&ProjectInput::new("print", 11, 30.0).with_urgency(3))
            .unwrap();
        let expected = quote.breakdown.base_sum * 1.3 * (36.0 / 100.0);
        assert!((quote.breakdown.designer_gross - expected).abs() < 1e-9);
    }

    #[test]
    fn estimated_hours_follow_profile_rules() {
        let engine = engine();
        assert_eq!(
            engine.estimated_hours("website_design", 3),
            HoursRange { min: 12.0, max: 18.0 }
        );
        assert_eq!(
            engine.estimated_hours("print", 10),
            HoursRange { min: 12.0, max: 18.0 }
        );
        assert_eq!(
            engine.estimated_hours("logo", 3),
            HoursRange { min: 5.3, max: 8.0 }
        );
    }

    #[test]
    fn estimated_hours_never_invert() {
        let mut table = PricingTable::default();
        table.hours_precision = HoursPrecision::Whole;
        table.work_types.push(WorkTypeProfile {
            code: "inverted".to_string(),
            label: "Inverted".to_string(),
            unit: "units".to_string(),
            curve: CostCurve::Linear {
                base_hours_per_unit: 1.0,
                min_hours_per_unit: 1.0,
                breakpoint_quantity: 1,
            },
            estimate: HoursEstimate::Range {
                min_hours_per_unit: 2.0,
                max_hours_per_unit: 1.0,
            },
            designer_share_adjustment_points: 0.0,
        });
        let engine = QuoteEngine::new(table);
        let range = engine.estimated_hours("inverted", 3);
        assert_eq!(range, HoursRange { min: 6.0, max: 6.0 });

        for code in ["presentation", "logo", "social_media", "ui_ux", "unknown"] {
            for units in 1..=50 {
                let range = engine.estimated_hours(code, units);
                assert!(range.max >= range.min, "{code} inverted at {units}");
            }
        }
    }

    #[test]
    fn quote_is_deterministic() {
        let input = ProjectInput::new("branding", 7, 45.0)
            .with_source("telegram")
            .with_urgency(1)
            .with_region("asia")
            .with_discount(15);
        assert_eq!(compute_quote(&input), compute_quote(&input));
    }
}
