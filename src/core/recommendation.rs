use super::engine::{MONTHS_PER_YEAR, ZERO_RATE_EPS, check_rate, future_value, project};
use super::error::{ProjectionError, finite};
use super::types::{
    Evaluation, EvaluationOptions, ProjectionResult, RateBasis, Recommendation, ScenarioInputs,
    WhatIf, WhatIfKind,
};

pub const SURPLUS_SUGGESTIONS: [&str; 3] = [
    "Increasing your emergency fund",
    "Diversifying your investments",
    "Setting more ambitious financial goals",
];

const ONE_PERCENTAGE_POINT: f64 = 0.01;

/// Extra monthly contribution that closes `shortfall` over `years`.
///
/// Contributions are annuitised annually (ordinary annuity, no `1 + r` factor)
/// and then split evenly over twelve months.
pub fn required_extra_contribution(
    shortfall: f64,
    annual_rate: f64,
    years: u32,
) -> Result<f64, ProjectionError> {
    if !shortfall.is_finite() {
        return Err(ProjectionError::invalid("shortfall", "must be finite"));
    }
    if years == 0 {
        return Err(ProjectionError::invalid("years", "must be > 0"));
    }
    check_rate("annual_rate", annual_rate)?;

    let annuity_factor = if annual_rate.abs() < ZERO_RATE_EPS {
        years as f64
    } else {
        ((1.0 + annual_rate).powf(years as f64) - 1.0) / annual_rate
    };
    finite(
        "required extra contribution",
        shortfall.abs() / annuity_factor / MONTHS_PER_YEAR as f64,
    )
}

pub fn recommend(
    inputs: &ScenarioInputs,
    projection: &ProjectionResult,
    options: EvaluationOptions,
) -> Result<Recommendation, ProjectionError> {
    if projection.gap >= 0.0 {
        return Ok(Recommendation::Surplus {
            suggestions: SURPLUS_SUGGESTIONS.to_vec(),
        });
    }

    let rate = basis_rate(inputs, projection, options.recommendation_basis);
    let additional_monthly =
        required_extra_contribution(projection.gap, rate, inputs.time_horizon_years)?;

    Ok(Recommendation::Shortfall {
        shortfall: projection.gap.abs(),
        additional_monthly,
        rate_basis: options.recommendation_basis,
        what_ifs: what_ifs(inputs, projection, options.recommendation_basis)?,
    })
}

fn basis_rate(inputs: &ScenarioInputs, projection: &ProjectionResult, basis: RateBasis) -> f64 {
    match basis {
        RateBasis::Nominal => inputs.annual_return_rate,
        RateBasis::Real => projection.real_return,
    }
}

/// Re-runs the annual projection with the return or the horizon nudged.
///
/// Both scenarios compound at the `basis` rate, while deltas are taken against
/// the real-return projection. Under `Nominal` the "+1 year" case therefore
/// also moves off the real rate.
pub fn what_ifs(
    inputs: &ScenarioInputs,
    projection: &ProjectionResult,
    basis: RateBasis,
) -> Result<Vec<WhatIf>, ProjectionError> {
    let rate = basis_rate(inputs, projection, basis);
    let annual_contribution = inputs.monthly_contribution * MONTHS_PER_YEAR as f64;
    let horizon = inputs
        .time_horizon_years
        .checked_add(1)
        .ok_or_else(|| ProjectionError::invalid("time_horizon_years", "too large"))?;

    let higher_return = future_value(
        inputs.current_savings,
        annual_contribution,
        rate + ONE_PERCENTAGE_POINT,
        inputs.time_horizon_years,
    )?;
    let longer_horizon = future_value(
        inputs.current_savings,
        annual_contribution,
        rate,
        horizon,
    )?;

    Ok(vec![
        WhatIf {
            kind: WhatIfKind::ReturnPlusOnePoint,
            future_value: higher_return,
            delta: higher_return - projection.future_value,
        },
        WhatIf {
            kind: WhatIfKind::HorizonPlusOneYear,
            future_value: longer_horizon,
            delta: longer_horizon - projection.future_value,
        },
    ])
}

pub fn evaluate(
    inputs: &ScenarioInputs,
    options: EvaluationOptions,
) -> Result<Evaluation, ProjectionError> {
    let projection = project(inputs)?;
    let recommendation = recommend(inputs, &projection, options)?;
    Ok(Evaluation {
        projection,
        recommendation,
    })
}
