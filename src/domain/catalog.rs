//! Option lists for the quote form, derived from the pricing table.

use serde::Serialize;

use super::profiles::PricingTable;

/// Largest unit count the form accepts.
pub const MAX_UNITS: u32 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormOption {
    pub value: String,
    pub label: String,
}

impl FormOption {
    fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormCatalog {
    pub work_types: Vec<FormOption>,
    pub sources: Vec<FormOption>,
    pub regions: Vec<FormOption>,
    pub urgency_days: Vec<FormOption>,
    pub discounts: Vec<FormOption>,
}

impl FormCatalog {
    pub fn from_table(table: &PricingTable) -> Self {
        Self {
            work_types: table
                .work_types
                .iter()
                .map(|profile| FormOption::new(&profile.code, &profile.label))
                .collect(),
            sources: table
                .sources
                .iter()
                .map(|rule| FormOption::new(&rule.code, &rule.label))
                .collect(),
            regions: table
                .regions
                .iter()
                .map(|rule| FormOption::new(&rule.code, &rule.label))
                .collect(),
            urgency_days: table
                .urgency
                .iter()
                .map(|rule| {
                    let day_word = if rule.days == 1 { "Day" } else { "Days" };
                    let extra = ((rule.factor - 1.0) * 100.0).round();
                    FormOption::new(
                        rule.days.to_string(),
                        format!("{} {day_word} ({extra}% extra)", rule.days),
                    )
                })
                .collect(),
            discounts: table
                .discount_steps
                .iter()
                .map(|step| {
                    let label = if *step == 0 {
                        "No discount".to_string()
                    } else {
                        format!("{step}%")
                    };
                    FormOption::new(step.to_string(), label)
                })
                .collect(),
        }
    }
}
