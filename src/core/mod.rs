mod engine;
mod error;
mod recommendation;
mod types;

pub use engine::{
    GoalPath, MONTHS_PER_YEAR, MonthlySeries, future_value, goal_gap, goal_path,
    inflation_adjusted_goal, monthly_series, project, scenario_series,
};
pub use error::ProjectionError;
pub use recommendation::{
    SURPLUS_SUGGESTIONS, evaluate, recommend, required_extra_contribution, what_ifs,
};
pub use types::{
    DEFAULT_ANNUAL_RETURN_RATE, DEFAULT_INFLATION_RATE, Evaluation, EvaluationOptions,
    GoalStatus, MAX_ANNUAL_RETURN_RATE, MAX_INFLATION_RATE, MonthlySeriesPoint, Preset,
    PresetDefaults, ProjectionResult, RateBasis, Recommendation, ScenarioInputs, WhatIf,
    WhatIfKind,
};
