use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    EvaluationOptions, GoalStatus, MAX_ANNUAL_RETURN_RATE, MAX_INFLATION_RATE, Preset,
    PresetDefaults, ProjectionError, ProjectionResult, RateBasis, Recommendation,
    ScenarioInputs, evaluate, goal_path, scenario_series,
};

/// Longest horizon either surface accepts; bounds the monthly series length.
pub const MAX_HORIZON_YEARS: i64 = 1_000;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Args(#[from] clap::Error),

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPreset {
    Custom,
    Education,
    #[value(name = "eb5-visa", alias = "eb5")]
    Eb5Visa,
    Property,
    RetiringAbroad,
}

impl From<CliPreset> for Preset {
    fn from(value: CliPreset) -> Self {
        match value {
            CliPreset::Custom => Preset::Custom,
            CliPreset::Education => Preset::Education,
            CliPreset::Eb5Visa => Preset::Eb5Visa,
            CliPreset::Property => Preset::Property,
            CliPreset::RetiringAbroad => Preset::RetiringAbroad,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRateBasis {
    Nominal,
    Real,
}

impl From<CliRateBasis> for RateBasis {
    fn from(value: CliRateBasis) -> Self {
        match value {
            CliRateBasis::Nominal => RateBasis::Nominal,
            CliRateBasis::Real => RateBasis::Real,
        }
    }
}

/// How the presentation layer should draw the series. No numeric effect.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum ChartType {
    Line,
    Area,
    Bar,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPreset {
    Custom,
    Education,
    #[serde(alias = "eb5", alias = "eb5Visa", alias = "eb5_visa", alias = "EB-5 Visa")]
    Eb5Visa,
    Property,
    #[serde(alias = "retiringAbroad", alias = "retiring_abroad", alias = "Retiring Abroad")]
    RetiringAbroad,
}

impl From<ApiPreset> for CliPreset {
    fn from(value: ApiPreset) -> Self {
        match value {
            ApiPreset::Custom => CliPreset::Custom,
            ApiPreset::Education => CliPreset::Education,
            ApiPreset::Eb5Visa => CliPreset::Eb5Visa,
            ApiPreset::Property => CliPreset::Property,
            ApiPreset::RetiringAbroad => CliPreset::RetiringAbroad,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiRateBasis {
    Nominal,
    Real,
}

impl From<ApiRateBasis> for CliRateBasis {
    fn from(value: ApiRateBasis) -> Self {
        match value {
            ApiRateBasis::Nominal => CliRateBasis::Nominal,
            ApiRateBasis::Real => CliRateBasis::Real,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiChartType {
    #[serde(alias = "Line Chart")]
    Line,
    #[serde(alias = "Area Chart")]
    Area,
    #[serde(alias = "Bar Chart")]
    Bar,
}

impl From<ApiChartType> for ChartType {
    fn from(value: ApiChartType) -> Self {
        match value {
            ApiChartType::Line => ChartType::Line,
            ApiChartType::Area => ChartType::Area,
            ApiChartType::Bar => ChartType::Bar,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    preset: Option<ApiPreset>,
    current_savings: Option<f64>,
    monthly_contribution: Option<f64>,
    goal_amount: Option<f64>,
    time_horizon_years: Option<i64>,
    annual_return: Option<f64>,
    inflation_rate: Option<f64>,
    chart_type: Option<ApiChartType>,
    rate_basis: Option<ApiRateBasis>,
}

#[derive(Parser, Debug)]
#[command(
    name = "goalpath",
    about = "Projects whether a savings plan reaches an inflation-adjusted goal",
    after_help = "Run `goalpath serve [port]` to start the HTTP API instead."
)]
struct Cli {
    #[arg(
        long,
        value_enum,
        default_value_t = CliPreset::Custom,
        help = "Goal template supplying defaults for savings, contribution, goal and horizon"
    )]
    preset: CliPreset,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Current savings; defaults to the preset value"
    )]
    current_savings: Option<f64>,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Monthly contribution; defaults to the preset value"
    )]
    monthly_contribution: Option<f64>,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Target goal amount in today's money; defaults to the preset value"
    )]
    goal_amount: Option<f64>,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Time horizon in whole years; defaults to the preset value"
    )]
    time_horizon_years: Option<i64>,
    #[arg(
        long,
        default_value_t = 7.0,
        help = "Expected annual return in percent (0 to 20)"
    )]
    annual_return: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Annual inflation in percent (0 to 10)"
    )]
    inflation_rate: f64,
    #[arg(long, value_enum, default_value_t = ChartType::Line)]
    chart_type: ChartType,
    #[arg(
        long,
        value_enum,
        default_value_t = CliRateBasis::Nominal,
        help = "Annual rate used for the shortfall top-up and what-if scenarios"
    )]
    rate_basis: CliRateBasis,
}

#[derive(Debug)]
struct ProjectionRequest {
    preset: Preset,
    inputs: ScenarioInputs,
    options: EvaluationOptions,
    chart_type: ChartType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesRow {
    month: u32,
    projected_savings: f64,
    monthly_goal: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    preset: Preset,
    chart_type: ChartType,
    inputs: ScenarioInputs,
    real_return: f64,
    future_value: f64,
    inflation_adjusted_goal: f64,
    gap: f64,
    progress_vs_goal_pct: f64,
    status: GoalStatus,
    recommendation: Recommendation,
    series: Vec<SeriesRow>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ProjectionRequest, ProjectionError> {
    let preset: Preset = cli.preset.into();
    let defaults = preset.defaults();

    let horizon = cli
        .time_horizon_years
        .unwrap_or(i64::from(defaults.time_horizon_years));
    if horizon <= 0 {
        return Err(ProjectionError::invalid(
            "time_horizon_years",
            "must be a positive number of years",
        ));
    }
    if horizon > MAX_HORIZON_YEARS {
        return Err(ProjectionError::invalid(
            "time_horizon_years",
            format!("must be <= {MAX_HORIZON_YEARS}"),
        ));
    }
    if !(0.0..=MAX_ANNUAL_RETURN_RATE * 100.0).contains(&cli.annual_return) {
        return Err(ProjectionError::invalid(
            "annual_return",
            "must be between 0 and 20 percent",
        ));
    }
    if !(0.0..=MAX_INFLATION_RATE * 100.0).contains(&cli.inflation_rate) {
        return Err(ProjectionError::invalid(
            "inflation_rate",
            "must be between 0 and 10 percent",
        ));
    }

    let inputs = ScenarioInputs {
        current_savings: cli.current_savings.unwrap_or(defaults.current_savings),
        monthly_contribution: cli
            .monthly_contribution
            .unwrap_or(defaults.monthly_contribution),
        goal_amount: cli.goal_amount.unwrap_or(defaults.goal_amount),
        time_horizon_years: horizon as u32,
        annual_return_rate: cli.annual_return / 100.0,
        inflation_rate: cli.inflation_rate / 100.0,
    };
    inputs.validate()?;

    Ok(ProjectionRequest {
        preset,
        inputs,
        options: EvaluationOptions {
            recommendation_basis: cli.rate_basis.into(),
        },
        chart_type: cli.chart_type,
    })
}

fn build_project_response(request: ProjectionRequest) -> Result<ProjectResponse, ProjectionError> {
    let evaluation = evaluate(&request.inputs, request.options)?;
    let ProjectionResult {
        real_return,
        future_value,
        inflation_adjusted_goal,
        gap,
        progress_vs_goal_pct,
    } = evaluation.projection;

    let projected = scenario_series(&request.inputs)?;
    let months = projected.len() as u32;
    let series = projected
        .zip(goal_path(
            request.inputs.current_savings,
            inflation_adjusted_goal,
            months,
        ))
        .map(|(point, monthly_goal)| SeriesRow {
            month: point.month,
            projected_savings: point.projected_value,
            monthly_goal,
        })
        .collect();

    Ok(ProjectResponse {
        preset: request.preset,
        chart_type: request.chart_type,
        status: evaluation.projection.status(),
        inputs: request.inputs,
        real_return,
        future_value,
        inflation_adjusted_goal,
        gap,
        progress_vs_goal_pct,
        recommendation: evaluation.recommendation,
        series,
    })
}

/// Evaluates the scenario described by command-line `args` and renders it as
/// pretty-printed JSON.
pub fn run_cli<I, T>(args: I) -> Result<String, ApiError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let request = build_request(cli)?;
    log::debug!("evaluating {:?}", request);
    let response = build_project_response(request)?;
    log::info!(
        "{} preset: future value {:.0} vs goal {:.0} ({:?})",
        response.preset.label(),
        response.future_value,
        response.inflation_adjusted_goal,
        response.status
    );
    Ok(serde_json::to_string_pretty(&response)?)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/presets", get(presets_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("goalpath HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/project");
    axum::serve(listener, app).await
}

async fn presets_handler() -> Response {
    let presets: Vec<PresetDefaults> = Preset::ALL.iter().map(|p| p.defaults()).collect();
    json_response(StatusCode::OK, presets)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let response = api_request_from_payload(payload).and_then(build_project_response);
    match response {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => {
            log::warn!("rejected projection request: {err}");
            error_response(status_for(&err), &err.to_string())
        }
    }
}

fn status_for(err: &ProjectionError) -> StatusCode {
    match err {
        ProjectionError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        ProjectionError::Overflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload).map_err(|e| e.to_string())
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ProjectionRequest, ProjectionError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.preset {
        cli.preset = v.into();
    }
    if let Some(v) = payload.current_savings {
        cli.current_savings = Some(v);
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = Some(v);
    }
    if let Some(v) = payload.goal_amount {
        cli.goal_amount = Some(v);
    }
    if let Some(v) = payload.time_horizon_years {
        cli.time_horizon_years = Some(v);
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.chart_type {
        cli.chart_type = v.into();
    }
    if let Some(v) = payload.rate_basis {
        cli.rate_basis = v.into();
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        preset: CliPreset::Custom,
        current_savings: None,
        monthly_contribution: None,
        goal_amount: None,
        time_horizon_years: None,
        annual_return: 7.0,
        inflation_rate: 2.0,
        chart_type: ChartType::Line,
        rate_basis: CliRateBasis::Nominal,
    }
}
