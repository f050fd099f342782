use serde::Serialize;

use super::error::ProjectionError;

pub const MAX_ANNUAL_RETURN_RATE: f64 = 0.20;
pub const MAX_INFLATION_RATE: f64 = 0.10;
pub const DEFAULT_ANNUAL_RETURN_RATE: f64 = 0.07;
pub const DEFAULT_INFLATION_RATE: f64 = 0.02;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    Custom,
    Education,
    #[serde(rename = "eb5-visa")]
    Eb5Visa,
    Property,
    RetiringAbroad,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Custom,
        Preset::Education,
        Preset::Eb5Visa,
        Preset::Property,
        Preset::RetiringAbroad,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Preset::Custom => "Custom",
            Preset::Education => "Education",
            Preset::Eb5Visa => "EB-5 Visa",
            Preset::Property => "Property",
            Preset::RetiringAbroad => "Retiring Abroad",
        }
    }

    pub fn defaults(self) -> PresetDefaults {
        let (goal_amount, time_horizon_years, current_savings, monthly_contribution) = match self {
            Preset::Education => (250_000.0, 18, 10_000.0, 500.0),
            Preset::Eb5Visa => (800_000.0, 5, 100_000.0, 10_000.0),
            Preset::Property => (400_000.0, 7, 20_000.0, 1_000.0),
            Preset::RetiringAbroad => (500_000.0, 15, 50_000.0, 2_000.0),
            Preset::Custom => (100_000.0, 10, 10_000.0, 500.0),
        };
        PresetDefaults {
            preset: self,
            label: self.label(),
            goal_amount,
            time_horizon_years,
            current_savings,
            monthly_contribution,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDefaults {
    pub preset: Preset,
    pub label: &'static str,
    pub goal_amount: f64,
    pub time_horizon_years: u32,
    pub current_savings: f64,
    pub monthly_contribution: f64,
}

/// Which annual rate the shortfall top-up is annuitised at.
///
/// `Nominal` reproduces the long-standing calculator output even though the
/// projection itself compounds at the real rate.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateBasis {
    #[default]
    Nominal,
    Real,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct EvaluationOptions {
    pub recommendation_basis: RateBasis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInputs {
    pub current_savings: f64,
    pub monthly_contribution: f64,
    pub goal_amount: f64,
    pub time_horizon_years: u32,
    pub annual_return_rate: f64,
    pub inflation_rate: f64,
}

impl ScenarioInputs {
    pub fn from_preset(preset: Preset) -> Self {
        let defaults = preset.defaults();
        Self {
            current_savings: defaults.current_savings,
            monthly_contribution: defaults.monthly_contribution,
            goal_amount: defaults.goal_amount,
            time_horizon_years: defaults.time_horizon_years,
            annual_return_rate: DEFAULT_ANNUAL_RETURN_RATE,
            inflation_rate: DEFAULT_INFLATION_RATE,
        }
    }

    pub fn real_return(&self) -> f64 {
        self.annual_return_rate - self.inflation_rate
    }

    pub fn validate(&self) -> Result<(), ProjectionError> {
        non_negative("current_savings", self.current_savings)?;
        non_negative("monthly_contribution", self.monthly_contribution)?;
        if !self.goal_amount.is_finite() || self.goal_amount <= 0.0 {
            return Err(ProjectionError::invalid("goal_amount", "must be > 0"));
        }
        if self.time_horizon_years == 0 {
            return Err(ProjectionError::invalid(
                "time_horizon_years",
                "must be > 0",
            ));
        }
        in_range(
            "annual_return_rate",
            self.annual_return_rate,
            MAX_ANNUAL_RETURN_RATE,
        )?;
        in_range("inflation_rate", self.inflation_rate, MAX_INFLATION_RATE)?;
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ProjectionError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ProjectionError::invalid(field, "must be >= 0"));
    }
    Ok(())
}

fn in_range(field: &'static str, value: f64, max: f64) -> Result<(), ProjectionError> {
    if !(0.0..=max).contains(&value) {
        return Err(ProjectionError::invalid(
            field,
            format!("must be between 0 and {max}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub real_return: f64,
    pub future_value: f64,
    pub inflation_adjusted_goal: f64,
    pub gap: f64,
    pub progress_vs_goal_pct: f64,
}

impl ProjectionResult {
    pub fn status(&self) -> GoalStatus {
        if self.gap >= 0.0 {
            GoalStatus::Surplus
        } else {
            GoalStatus::Shortfall
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Surplus,
    Shortfall,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySeriesPoint {
    pub month: u32,
    pub projected_value: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhatIfKind {
    ReturnPlusOnePoint,
    HorizonPlusOneYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIf {
    pub kind: WhatIfKind,
    pub future_value: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Recommendation {
    Surplus {
        suggestions: Vec<&'static str>,
    },
    #[serde(rename_all = "camelCase")]
    Shortfall {
        shortfall: f64,
        additional_monthly: f64,
        rate_basis: RateBasis,
        what_ifs: Vec<WhatIf>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub projection: ProjectionResult,
    pub recommendation: Recommendation,
}
