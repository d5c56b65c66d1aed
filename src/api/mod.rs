use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    CompoundingConvention, ContributionFrequency, GoalSolveConfig, GoalSolveIteration,
    GoalSolveResult, GoalType, InvestmentMode, PlanConfiguration, ProjectionError,
    ProjectionResult, StepUp, StepUpCadence, YearBreakdown, periodic_rate, solve_goal,
    try_project, yearly_breakdown,
};

pub mod cli;

const MAX_HORIZON_YEARS: u32 = 30;
const MAX_PERCENT: f64 = 100.0;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("--{flag} {requirement}")]
    OutOfRange {
        flag: &'static str,
        requirement: &'static str,
    },
    #[error("--target-value is required")]
    MissingTarget,
    #[error("invalid API JSON payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliMode {
    Sip,
    Lumpsum,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl From<CliFrequency> for ContributionFrequency {
    fn from(value: CliFrequency) -> Self {
        match value {
            CliFrequency::Daily => ContributionFrequency::Daily,
            CliFrequency::Weekly => ContributionFrequency::Weekly,
            CliFrequency::Monthly => ContributionFrequency::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStepUpCadence {
    None,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl From<CliStepUpCadence> for StepUpCadence {
    fn from(value: CliStepUpCadence) -> Self {
        match value {
            CliStepUpCadence::None => StepUpCadence::None,
            CliStepUpCadence::Quarterly => StepUpCadence::Quarterly,
            CliStepUpCadence::HalfYearly => StepUpCadence::HalfYearly,
            CliStepUpCadence::Yearly => StepUpCadence::Yearly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCompounding {
    Effective,
    Nominal,
}

impl From<CliCompounding> for CompoundingConvention {
    fn from(value: CliCompounding) -> Self {
        match value {
            CliCompounding::Effective => CompoundingConvention::Effective,
            CliCompounding::Nominal => CompoundingConvention::Nominal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliGoalType {
    Amount,
    Return,
}

impl From<CliGoalType> for GoalType {
    fn from(value: CliGoalType) -> Self {
        match value {
            CliGoalType::Amount => GoalType::RequiredAmount,
            CliGoalType::Return => GoalType::RequiredReturn,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiMode {
    #[serde(alias = "recurring", alias = "SIP")]
    Sip,
    #[serde(alias = "single", alias = "one-time", alias = "oneTime")]
    Lumpsum,
}

impl From<ApiMode> for CliMode {
    fn from(value: ApiMode) -> Self {
        match value {
            ApiMode::Sip => CliMode::Sip,
            ApiMode::Lumpsum => CliMode::Lumpsum,
        }
    }
}

impl From<InvestmentMode> for ApiMode {
    fn from(value: InvestmentMode) -> Self {
        match value {
            InvestmentMode::Recurring { .. } => ApiMode::Sip,
            InvestmentMode::Lumpsum => ApiMode::Lumpsum,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl From<ApiFrequency> for CliFrequency {
    fn from(value: ApiFrequency) -> Self {
        match value {
            ApiFrequency::Daily => CliFrequency::Daily,
            ApiFrequency::Weekly => CliFrequency::Weekly,
            ApiFrequency::Monthly => CliFrequency::Monthly,
        }
    }
}

impl From<ContributionFrequency> for ApiFrequency {
    fn from(value: ContributionFrequency) -> Self {
        match value {
            ContributionFrequency::Daily => ApiFrequency::Daily,
            ContributionFrequency::Weekly => ApiFrequency::Weekly,
            ContributionFrequency::Monthly => ApiFrequency::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStepUpCadence {
    None,
    Quarterly,
    #[serde(alias = "halfYearly", alias = "half_yearly")]
    HalfYearly,
    #[serde(alias = "annual", alias = "annually")]
    Yearly,
}

impl From<ApiStepUpCadence> for CliStepUpCadence {
    fn from(value: ApiStepUpCadence) -> Self {
        match value {
            ApiStepUpCadence::None => CliStepUpCadence::None,
            ApiStepUpCadence::Quarterly => CliStepUpCadence::Quarterly,
            ApiStepUpCadence::HalfYearly => CliStepUpCadence::HalfYearly,
            ApiStepUpCadence::Yearly => CliStepUpCadence::Yearly,
        }
    }
}

impl From<StepUpCadence> for ApiStepUpCadence {
    fn from(value: StepUpCadence) -> Self {
        match value {
            StepUpCadence::None => ApiStepUpCadence::None,
            StepUpCadence::Quarterly => ApiStepUpCadence::Quarterly,
            StepUpCadence::HalfYearly => ApiStepUpCadence::HalfYearly,
            StepUpCadence::Yearly => ApiStepUpCadence::Yearly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCompounding {
    #[serde(alias = "equivalent")]
    Effective,
    #[serde(alias = "simple")]
    Nominal,
}

impl From<ApiCompounding> for CliCompounding {
    fn from(value: ApiCompounding) -> Self {
        match value {
            ApiCompounding::Effective => CliCompounding::Effective,
            ApiCompounding::Nominal => CliCompounding::Nominal,
        }
    }
}

impl From<CompoundingConvention> for ApiCompounding {
    fn from(value: CompoundingConvention) -> Self {
        match value {
            CompoundingConvention::Effective => ApiCompounding::Effective,
            CompoundingConvention::Nominal => ApiCompounding::Nominal,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalType {
    #[serde(alias = "requiredAmount", alias = "required-amount")]
    Amount,
    #[serde(alias = "requiredReturn", alias = "required-return", alias = "rate")]
    Return,
}

impl From<ApiGoalType> for CliGoalType {
    fn from(value: ApiGoalType) -> Self {
        match value {
            ApiGoalType::Amount => CliGoalType::Amount,
            ApiGoalType::Return => CliGoalType::Return,
        }
    }
}

impl From<GoalType> for ApiGoalType {
    fn from(value: GoalType) -> Self {
        match value {
            GoalType::RequiredAmount => ApiGoalType::Amount,
            GoalType::RequiredReturn => ApiGoalType::Return,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    mode: Option<ApiMode>,
    amount: Option<f64>,
    years: Option<u32>,
    rate: Option<f64>,
    frequency: Option<ApiFrequency>,
    step_up_cadence: Option<ApiStepUpCadence>,
    step_up_percent: Option<f64>,
    inflation: Option<f64>,
    tax: Option<f64>,
    compounding: Option<ApiCompounding>,
    breakdown: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    #[serde(flatten)]
    plan: ProjectPayload,
    goal: Option<ApiGoalType>,
    target_value: Option<f64>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(
        long,
        value_enum,
        default_value_t = CliMode::Sip,
        help = "Recurring SIP or one-time lumpsum"
    )]
    mode: CliMode,
    #[arg(
        long,
        help = "Monthly-equivalent contribution for a SIP, principal for a lumpsum"
    )]
    amount: f64,
    #[arg(long, help = "Investment horizon in whole years (1-30)")]
    years: u32,
    #[arg(long, help = "Expected annual return in percent, e.g. 12")]
    rate: f64,
    #[arg(long, value_enum, default_value_t = CliFrequency::Monthly)]
    frequency: CliFrequency,
    #[arg(long, value_enum, default_value_t = CliStepUpCadence::None)]
    step_up_cadence: CliStepUpCadence,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Increase applied to the contribution at every step-up, in percent"
    )]
    step_up_percent: f64,
    #[arg(long, help = "Annual inflation in percent; deflates the maturity value")]
    inflation: Option<f64>,
    #[arg(long, help = "Tax on gains in percent, applied after inflation")]
    tax: Option<f64>,
    #[arg(long, value_enum, default_value_t = CliCompounding::Effective)]
    compounding: CliCompounding,
    #[arg(long, help = "Include a year-by-year breakdown")]
    breakdown: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    #[command(flatten)]
    plan: ProjectArgs,
    #[arg(long, value_enum, default_value_t = CliGoalType::Amount)]
    goal: CliGoalType,
    #[arg(long, help = "Maturity value the plan has to reach")]
    target_value: Option<f64>,
    #[arg(long, default_value_t = 0.0)]
    search_min: f64,
    #[arg(
        long,
        help = "Upper search bound; defaults to 1,000,000 for amounts and 100 for returns"
    )]
    search_max: Option<f64>,
    #[arg(long, help = "Bisection stops once the bracket is this narrow")]
    tolerance: Option<f64>,
    #[arg(long, default_value_t = 100)]
    max_iterations: u32,
}

#[derive(Debug)]
struct ProjectRequest {
    plan: PlanConfiguration,
    breakdown: bool,
}

#[derive(Debug)]
struct SolveRequest {
    plan: PlanConfiguration,
    config: GoalSolveConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanSummary {
    mode: ApiMode,
    amount: f64,
    years: u32,
    rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency: Option<ApiFrequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_up_cadence: Option<ApiStepUpCadence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_up_percent: Option<f64>,
    inflation: Option<f64>,
    tax: Option<f64>,
    compounding: ApiCompounding,
    periods_per_year: u32,
    per_period_amount: f64,
    periodic_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    plan: PlanSummary,
    #[serde(flatten)]
    result: ProjectionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    years: Option<Vec<YearBreakdown>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveIterationResponse {
    iteration: u32,
    lower_bound: f64,
    upper_bound: f64,
    candidate_value: f64,
    maturity_value: f64,
}

impl From<&GoalSolveIteration> for SolveIterationResponse {
    fn from(value: &GoalSolveIteration) -> Self {
        Self {
            iteration: value.iteration,
            lower_bound: value.lower_bound,
            upper_bound: value.upper_bound,
            candidate_value: value.candidate_value,
            maturity_value: value.maturity_value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    plan: PlanSummary,
    goal: ApiGoalType,
    target_value: f64,
    search_min: f64,
    search_max: f64,
    tolerance: f64,
    max_iterations: u32,
    solved_value: Option<f64>,
    achieved_maturity_value: Option<f64>,
    achieved_total_contributed: Option<f64>,
    converged: bool,
    feasible: bool,
    message: String,
    iterations: Vec<SolveIterationResponse>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn check_percent(flag: &'static str, value: f64) -> Result<(), RequestError> {
    if !(0.0..=MAX_PERCENT).contains(&value) {
        return Err(RequestError::OutOfRange {
            flag,
            requirement: "must be between 0 and 100",
        });
    }
    Ok(())
}

fn build_config(args: &ProjectArgs) -> Result<PlanConfiguration, RequestError> {
    if !args.amount.is_finite() || args.amount <= 0.0 {
        return Err(RequestError::OutOfRange {
            flag: "amount",
            requirement: "must be > 0",
        });
    }

    if !(1..=MAX_HORIZON_YEARS).contains(&args.years) {
        return Err(RequestError::OutOfRange {
            flag: "years",
            requirement: "must be between 1 and 30",
        });
    }

    check_percent("rate", args.rate)?;
    check_percent("step-up-percent", args.step_up_percent)?;
    if let Some(inflation) = args.inflation {
        check_percent("inflation", inflation)?;
    }
    if let Some(tax) = args.tax {
        check_percent("tax", tax)?;
    }

    let mode = match args.mode {
        CliMode::Sip => InvestmentMode::Recurring {
            frequency: args.frequency.into(),
            step_up: match args.step_up_cadence {
                CliStepUpCadence::None => None,
                cadence => Some(StepUp {
                    cadence: cadence.into(),
                    percent: args.step_up_percent,
                }),
            },
        },
        CliMode::Lumpsum => InvestmentMode::Lumpsum,
    };

    let plan = PlanConfiguration {
        mode,
        amount: args.amount,
        horizon_years: args.years,
        annual_return_percent: args.rate,
        inflation_percent: args.inflation,
        tax_percent: args.tax,
        compounding: args.compounding.into(),
    };
    crate::core::validate(&plan)?;
    Ok(plan)
}

fn build_solve_config(
    args: &SolveArgs,
) -> Result<(PlanConfiguration, GoalSolveConfig), RequestError> {
    let plan = build_config(&args.plan)?;
    let target_maturity_value = args.target_value.ok_or(RequestError::MissingTarget)?;
    let goal_type = GoalType::from(args.goal);
    let (default_max, default_tolerance) = match goal_type {
        GoalType::RequiredAmount => (1_000_000.0, 0.01),
        GoalType::RequiredReturn => (MAX_PERCENT, 1e-4),
    };

    let config = GoalSolveConfig {
        goal_type,
        target_maturity_value,
        search_min: args.search_min,
        search_max: args.search_max.unwrap_or(default_max),
        tolerance: args.tolerance.unwrap_or(default_tolerance),
        max_iterations: args.max_iterations,
    };
    Ok((plan, config))
}

fn default_args_for_api() -> ProjectArgs {
    ProjectArgs {
        mode: CliMode::Sip,
        amount: 5_000.0,
        years: 10,
        rate: 12.0,
        frequency: CliFrequency::Monthly,
        step_up_cadence: CliStepUpCadence::None,
        step_up_percent: 0.0,
        inflation: None,
        tax: None,
        compounding: CliCompounding::Effective,
        breakdown: false,
    }
}

fn apply_project_payload(args: &mut ProjectArgs, payload: ProjectPayload) {
    if let Some(v) = payload.mode {
        args.mode = v.into();
    }
    if let Some(v) = payload.amount {
        args.amount = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.rate {
        args.rate = v;
    }
    if let Some(v) = payload.frequency {
        args.frequency = v.into();
    }
    if let Some(v) = payload.step_up_cadence {
        args.step_up_cadence = v.into();
    }
    if let Some(v) = payload.step_up_percent {
        args.step_up_percent = v;
    }
    if let Some(v) = payload.inflation {
        args.inflation = Some(v);
    }
    if let Some(v) = payload.tax {
        args.tax = Some(v);
    }
    if let Some(v) = payload.compounding {
        args.compounding = v.into();
    }
    if let Some(v) = payload.breakdown {
        args.breakdown = v;
    }
}

fn project_request_from_payload(payload: ProjectPayload) -> Result<ProjectRequest, RequestError> {
    let mut args = default_args_for_api();
    apply_project_payload(&mut args, payload);
    let plan = build_config(&args)?;
    Ok(ProjectRequest {
        plan,
        breakdown: args.breakdown,
    })
}

fn project_request_from_json(json: &str) -> Result<ProjectRequest, RequestError> {
    let payload = serde_json::from_str::<ProjectPayload>(json)?;
    project_request_from_payload(payload)
}

fn solve_request_from_json(json: &str) -> Result<SolveRequest, RequestError> {
    let payload = serde_json::from_str::<SolvePayload>(json)?;

    let mut plan = default_args_for_api();
    apply_project_payload(&mut plan, payload.plan);
    let mut args = SolveArgs {
        plan,
        goal: CliGoalType::Amount,
        target_value: payload.target_value,
        search_min: 0.0,
        search_max: payload.search_max,
        tolerance: payload.tolerance,
        max_iterations: 100,
    };
    if let Some(v) = payload.goal {
        args.goal = v.into();
    }
    if let Some(v) = payload.search_min {
        args.search_min = v;
    }
    if let Some(v) = payload.max_iterations {
        args.max_iterations = v;
    }

    let (plan, config) = build_solve_config(&args)?;
    Ok(SolveRequest { plan, config })
}

fn plan_summary(plan: &PlanConfiguration) -> PlanSummary {
    let (frequency, step_up, periods_per_year, per_period_amount, rate) = match plan.mode {
        InvestmentMode::Recurring { frequency, step_up } => {
            let periods_per_year = frequency.periods_per_year();
            (
                Some(frequency),
                step_up,
                periods_per_year,
                plan.amount / frequency.monthly_divisor(),
                periodic_rate(
                    plan.annual_return_percent,
                    periods_per_year,
                    plan.compounding,
                ),
            )
        }
        InvestmentMode::Lumpsum => (
            None,
            None,
            1,
            plan.amount,
            plan.annual_return_percent / 100.0,
        ),
    };

    PlanSummary {
        mode: plan.mode.into(),
        amount: plan.amount,
        years: plan.horizon_years,
        rate: plan.annual_return_percent,
        frequency: frequency.map(ApiFrequency::from),
        step_up_cadence: step_up.map(|s| s.cadence.into()),
        step_up_percent: step_up.map(|s| s.percent),
        inflation: plan.inflation_percent,
        tax: plan.tax_percent,
        compounding: plan.compounding.into(),
        periods_per_year,
        per_period_amount,
        periodic_rate: rate,
    }
}

fn build_project_response(request: &ProjectRequest) -> Result<ProjectResponse, RequestError> {
    let result = try_project(&request.plan)?;
    let years = request
        .breakdown
        .then(|| yearly_breakdown(&request.plan));
    Ok(ProjectResponse {
        plan: plan_summary(&request.plan),
        result,
        years,
    })
}

fn build_solve_response(plan: &PlanConfiguration, result: GoalSolveResult) -> SolveResponse {
    SolveResponse {
        plan: plan_summary(plan),
        goal: result.goal_type.into(),
        target_value: result.target_maturity_value,
        search_min: result.search_min,
        search_max: result.search_max,
        tolerance: result.tolerance,
        max_iterations: result.max_iterations,
        solved_value: result.solved_value,
        achieved_maturity_value: result.achieved_maturity_value,
        achieved_total_contributed: result.achieved_total_contributed,
        converged: result.converged,
        feasible: result.feasible,
        message: result.message,
        iterations: result.iterations.iter().map(Into::into).collect(),
    }
}

fn run_solve(request: &SolveRequest) -> Result<SolveResponse, RequestError> {
    let result = solve_goal(&request.plan, request.config)?;
    Ok(build_solve_response(&request.plan, result))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!("projection API listening on http://{addr}");
    info!("local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/solve", post(solve_post_handler))
        .fallback(not_found_handler)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    respond(project_request_from_payload(payload).and_then(|r| build_project_response(&r)))
}

async fn project_post_handler(body: String) -> Response {
    respond(project_request_from_json(&body).and_then(|r| build_project_response(&r)))
}

async fn solve_post_handler(body: String) -> Response {
    respond(solve_request_from_json(&body).and_then(|r| run_solve(&r)))
}

fn respond<T: Serialize>(outcome: Result<T, RequestError>) -> Response {
    match outcome {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            warn!("rejected request: {e}");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
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
