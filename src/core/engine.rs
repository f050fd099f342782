use super::error::{ProjectionError, finite};
use super::types::{MonthlySeriesPoint, ProjectionResult, ScenarioInputs};

pub const MONTHS_PER_YEAR: u32 = 12;

pub(crate) const ZERO_RATE_EPS: f64 = 1e-12;

/// Future value of a lump sum plus an annuity-due contribution stream.
///
/// `contribution` is paid every period and `rate` is the growth per period.
/// Negative rates are allowed as long as they stay above -100%.
pub fn future_value(
    principal: f64,
    contribution: f64,
    rate: f64,
    periods: u32,
) -> Result<f64, ProjectionError> {
    check_amount("principal", principal)?;
    check_amount("contribution", contribution)?;
    check_rate("rate", rate)?;
    finite("future value", compound(principal, contribution, rate, periods))
}

pub fn inflation_adjusted_goal(
    goal_amount: f64,
    inflation_rate: f64,
    years: u32,
) -> Result<f64, ProjectionError> {
    if !goal_amount.is_finite() || goal_amount <= 0.0 {
        return Err(ProjectionError::invalid("goal_amount", "must be > 0"));
    }
    if !inflation_rate.is_finite() || inflation_rate < 0.0 {
        return Err(ProjectionError::invalid("inflation_rate", "must be >= 0"));
    }
    finite(
        "inflation-adjusted goal",
        goal_amount * (1.0 + inflation_rate).powf(years as f64),
    )
}

pub fn goal_gap(future_value: f64, inflation_adjusted_goal: f64) -> f64 {
    future_value - inflation_adjusted_goal
}

/// Annual projection of a scenario at the real rate of return.
pub fn project(inputs: &ScenarioInputs) -> Result<ProjectionResult, ProjectionError> {
    inputs.validate()?;

    let real_return = inputs.real_return();
    let future_value = future_value(
        inputs.current_savings,
        inputs.monthly_contribution * MONTHS_PER_YEAR as f64,
        real_return,
        inputs.time_horizon_years,
    )?;
    let inflation_adjusted_goal = inflation_adjusted_goal(
        inputs.goal_amount,
        inputs.inflation_rate,
        inputs.time_horizon_years,
    )?;
    let gap = goal_gap(future_value, inflation_adjusted_goal);

    log::debug!(
        "projected fv={future_value:.2} goal_adj={inflation_adjusted_goal:.2} gap={gap:.2} real_return={real_return}"
    );

    Ok(ProjectionResult {
        real_return,
        future_value,
        inflation_adjusted_goal,
        gap,
        progress_vs_goal_pct: (future_value / inflation_adjusted_goal - 1.0) * 100.0,
    })
}

/// Month-by-month projected balance, compounding monthly at the real rate.
///
/// The returned iterator is cheap to clone and can be replayed any number of
/// times; overflow is checked once here so iteration itself cannot fail.
pub fn monthly_series(
    principal: f64,
    monthly_contribution: f64,
    annual_rate: f64,
    inflation_rate: f64,
    years: u32,
) -> Result<MonthlySeries, ProjectionError> {
    let months = series_len(years)?;
    let monthly_rate = (annual_rate - inflation_rate) / MONTHS_PER_YEAR as f64;

    // Growth is monotonic in the month index, so the endpoints bound every
    // value in between.
    future_value(principal, monthly_contribution, monthly_rate, 1)?;
    future_value(principal, monthly_contribution, monthly_rate, months)?;

    Ok(MonthlySeries {
        principal,
        contribution: monthly_contribution,
        monthly_rate,
        next_month: 1,
        remaining: months,
    })
}

pub fn scenario_series(inputs: &ScenarioInputs) -> Result<MonthlySeries, ProjectionError> {
    inputs.validate()?;
    monthly_series(
        inputs.current_savings,
        inputs.monthly_contribution,
        inputs.annual_return_rate,
        inputs.inflation_rate,
        inputs.time_horizon_years,
    )
}

#[derive(Debug, Clone)]
pub struct MonthlySeries {
    principal: f64,
    contribution: f64,
    monthly_rate: f64,
    next_month: u32,
    remaining: u32,
}

impl MonthlySeries {
    pub fn monthly_rate(&self) -> f64 {
        self.monthly_rate
    }
}

impl Iterator for MonthlySeries {
    type Item = MonthlySeriesPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let month = self.next_month;
        self.next_month = self.next_month.wrapping_add(1);
        self.remaining -= 1;
        Some(MonthlySeriesPoint {
            month,
            projected_value: compound(self.principal, self.contribution, self.monthly_rate, month),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MonthlySeries {}

/// Straight-line reference path from `start` to `stop` over `points` samples.
///
/// Follows `numpy.linspace`: the last sample is exactly `stop`, and a single
/// sample is just `start`.
pub fn goal_path(start: f64, stop: f64, points: u32) -> GoalPath {
    let step = if points > 1 {
        (stop - start) / (points - 1) as f64
    } else {
        0.0
    };
    GoalPath {
        start,
        stop,
        step,
        index: 0,
        points,
    }
}

#[derive(Debug, Clone)]
pub struct GoalPath {
    start: f64,
    stop: f64,
    step: f64,
    index: u32,
    points: u32,
}

impl Iterator for GoalPath {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.index >= self.points {
            return None;
        }
        let i = self.index;
        self.index += 1;
        if i + 1 == self.points && self.points > 1 {
            Some(self.stop)
        } else {
            Some(i as f64 * self.step + self.start)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.points - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GoalPath {}

fn compound(principal: f64, contribution: f64, rate: f64, periods: u32) -> f64 {
    let growth = (1.0 + rate).powf(periods as f64);
    let fv_principal = principal * growth;
    let fv_contributions = if rate.abs() < ZERO_RATE_EPS {
        contribution * periods as f64
    } else {
        contribution * ((growth - 1.0) / rate) * (1.0 + rate)
    };
    fv_principal + fv_contributions
}

fn series_len(years: u32) -> Result<u32, ProjectionError> {
    if years == 0 {
        return Err(ProjectionError::invalid("years", "must be > 0"));
    }
    years
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| ProjectionError::invalid("years", "too many months to enumerate"))
}

fn check_amount(field: &'static str, value: f64) -> Result<(), ProjectionError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ProjectionError::invalid(field, "must be a finite amount >= 0"));
    }
    Ok(())
}

pub(crate) fn check_rate(field: &'static str, rate: f64) -> Result<(), ProjectionError> {
    if !rate.is_finite() || rate <= -1.0 {
        return Err(ProjectionError::invalid(field, "must be a finite rate > -100%"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Preset;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn oracle_future_value_matches_hand_calculation() {
        // Principal: 10000 * 1.05^10 = 16288.946...
        // Contributions: 6000 * ((1.05^10 - 1) / 0.05) * 1.05 = 79240.72...
        let fv = future_value(10_000.0, 6_000.0, 0.05, 10).expect("finite");
        assert_close(fv, 95_529.669_241_7, 1e-6);
    }

    #[test]
    fn zero_contribution_reduces_to_compound_growth() {
        let fv = future_value(2_500.0, 0.0, 0.04, 7).expect("finite");
        assert_eq!(fv, 2_500.0 * 1.04f64.powf(7.0));
    }

    #[test]
    fn zero_rate_uses_linear_limit() {
        assert_eq!(future_value(0.0, 750.0, 0.0, 12).expect("finite"), 9_000.0);
        assert_eq!(future_value(100.0, 10.0, 0.0, 3).expect("finite"), 130.0);
    }

    #[test]
    fn negative_rate_is_accepted() {
        let fv = future_value(1_000.0, 0.0, -0.02, 2).expect("negative real return is valid");
        assert_close(fv, 960.4, 1e-9);
    }

    #[test]
    fn rate_at_or_below_minus_one_is_rejected() {
        let err = future_value(1_000.0, 0.0, -1.0, 2).expect_err("must reject");
        assert!(err.is_invalid_input());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(future_value(-1.0, 0.0, 0.05, 2).is_err());
        assert!(future_value(0.0, -1.0, 0.05, 2).is_err());
    }

    #[test]
    fn overflow_is_reported() {
        let err = future_value(1e300, 0.0, 0.2, 5_000).expect_err("must overflow");
        assert_eq!(err, ProjectionError::Overflow { what: "future value" });
    }

    #[test]
    fn monthly_series_reports_overflowing_endpoint() {
        // 1.2^(1/12) per month over 60000 months leaves f64 range.
        let err = monthly_series(1e300, 0.0, 0.20, 0.0, 5_000).expect_err("must overflow");
        assert_eq!(err, ProjectionError::Overflow { what: "future value" });
    }

    #[test]
    fn inflation_adjusted_goal_grows_with_inflation() {
        let goal = inflation_adjusted_goal(100_000.0, 0.02, 10).expect("finite");
        assert_close(goal, 121_899.441_999_475_7, 1e-6);
        assert_eq!(
            inflation_adjusted_goal(100_000.0, 0.0, 10).expect("finite"),
            100_000.0
        );
    }

    #[test]
    fn custom_preset_projects_a_shortfall() {
        let inputs = ScenarioInputs::from_preset(Preset::Custom);
        let result = project(&inputs).expect("valid preset");
        assert_close(result.real_return, 0.05, 1e-12);
        assert_close(result.future_value, 95_529.669, 1e-2);
        assert_close(result.inflation_adjusted_goal, 121_899.442, 1e-2);
        assert_close(result.gap, -26_369.773, 1e-2);
        assert!(result.gap < 0.0);
        assert_close(
            result.progress_vs_goal_pct,
            (result.future_value / result.inflation_adjusted_goal - 1.0) * 100.0,
            1e-12,
        );
    }

    #[test]
    fn project_rejects_invalid_inputs() {
        let mut inputs = ScenarioInputs::from_preset(Preset::Custom);
        inputs.goal_amount = -5.0;
        assert!(project(&inputs).expect_err("must reject").is_invalid_input());
    }

    #[test]
    fn monthly_series_has_one_point_per_month() {
        let series = monthly_series(10_000.0, 500.0, 0.07, 0.02, 10).expect("finite");
        assert_eq!(series.len(), 120);
        let months: Vec<u32> = series.map(|p| p.month).collect();
        assert_eq!(months.first(), Some(&1));
        assert_eq!(months.last(), Some(&120));
        assert!(months.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn monthly_series_last_point_matches_monthly_future_value() {
        let series = monthly_series(10_000.0, 500.0, 0.07, 0.02, 10).expect("finite");
        let last = series.last().expect("non-empty");
        let expected = future_value(10_000.0, 500.0, (0.07 - 0.02) / 12.0, 120).expect("finite");
        assert_eq!(last.projected_value, expected);
    }

    #[test]
    fn monthly_series_is_restartable() {
        let series = monthly_series(1_000.0, 50.0, 0.05, 0.01, 3).expect("finite");
        let first: Vec<_> = series.clone().collect();
        let second: Vec<_> = series.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn monthly_series_rejects_zero_years() {
        assert!(monthly_series(1_000.0, 50.0, 0.05, 0.01, 0).is_err());
    }

    #[test]
    fn goal_path_follows_linspace() {
        let path: Vec<f64> = goal_path(0.0, 10.0, 5).collect();
        assert_eq!(path, vec![0.0, 2.5, 5.0, 7.5, 10.0]);

        let single: Vec<f64> = goal_path(3.0, 10.0, 1).collect();
        assert_eq!(single, vec![3.0]);

        assert_eq!(goal_path(3.0, 10.0, 0).count(), 0);
    }

    #[test]
    fn goal_path_ends_exactly_at_goal() {
        let goal = inflation_adjusted_goal(100_000.0, 0.02, 10).expect("finite");
        let path: Vec<f64> = goal_path(10_000.0, goal, 120).collect();
        assert_eq!(path.len(), 120);
        assert_eq!(path[0], 10_000.0);
        assert_eq!(path[119], goal);
    }

    #[test]
    fn repeated_projection_is_bit_identical() {
        let inputs = ScenarioInputs::from_preset(Preset::RetiringAbroad);
        let a = project(&inputs).expect("valid");
        let b = project(&inputs).expect("valid");
        assert_eq!(a.future_value.to_bits(), b.future_value.to_bits());
        assert_eq!(a.gap.to_bits(), b.gap.to_bits());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_future_value_is_monotonic_in_each_input(
            principal in 0u32..1_000_000,
            contribution in 0u32..50_000,
            rate_bp in 1u32..2_000,
            periods in 1u32..60,
            principal_delta in 1u32..100_000,
            contribution_delta in 1u32..10_000,
            rate_delta_bp in 1u32..500
        ) {
            let p = principal as f64;
            let c = contribution as f64;
            let r = rate_bp as f64 / 10_000.0;
            let base = future_value(p, c, r, periods).expect("finite");

            let more_principal = future_value(p + principal_delta as f64, c, r, periods).expect("finite");
            let more_contribution = future_value(p, c + contribution_delta as f64, r, periods).expect("finite");
            let more_rate = future_value(p, c, r + rate_delta_bp as f64 / 10_000.0, periods).expect("finite");
            let more_periods = future_value(p, c, r, periods + 1).expect("finite");

            prop_assert!(more_principal >= base);
            prop_assert!(more_contribution >= base);
            prop_assert!(more_rate >= base);
            prop_assert!(more_periods >= base);
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_zero_rate_is_principal_plus_contributions(
            principal in 0u32..1_000_000,
            contribution in 0u32..50_000,
            periods in 1u32..600
        ) {
            let fv = future_value(principal as f64, contribution as f64, 0.0, periods).expect("finite");
            prop_assert_eq!(fv, principal as f64 + contribution as f64 * periods as f64);
        }

        #[test]
        fn prop_series_length_and_endpoint_match_monthly_projection(
            principal in 0u32..500_000,
            contribution in 0u32..20_000,
            return_pct in 0u32..21,
            inflation_pct in 0u32..11,
            years in 1u32..40
        ) {
            let annual = return_pct as f64 / 100.0;
            let inflation = inflation_pct as f64 / 100.0;
            let series = monthly_series(principal as f64, contribution as f64, annual, inflation, years)
                .expect("finite");
            prop_assert_eq!(series.len(), (years * 12) as usize);

            let expected = future_value(
                principal as f64,
                contribution as f64,
                (annual - inflation) / 12.0,
                years * 12,
            ).expect("finite");
            let last = series.last().expect("non-empty");
            prop_assert_eq!(last.month, years * 12);
            prop_assert_eq!(last.projected_value, expected);
        }
    }
}
