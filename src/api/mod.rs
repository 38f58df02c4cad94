use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    ChartSeries, ContributionPlan, DEFAULT_MEAN_REVERSION_STRENGTH, EnsembleBand, Granularity,
    HeadlineStats, MAX_ENSEMBLE_PATHS, MAX_TOTAL_YEARS, MeanReversion, Milestones, Orchestrator,
    RunOutcome, RunRequest, SalaryGrowthPlan, SalaryTable, SummaryRow, standard_milestones,
};

type SharedOrchestrator = Arc<Mutex<Orchestrator>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGranularity {
    Yearly,
    Monthly,
}

impl From<CliGranularity> for Granularity {
    fn from(value: CliGranularity) -> Self {
        match value {
            CliGranularity::Yearly => Granularity::Yearly,
            CliGranularity::Monthly => Granularity::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGranularity {
    #[serde(alias = "year", alias = "Yearly")]
    Yearly,
    #[serde(alias = "month", alias = "Monthly")]
    Monthly,
}

impl From<ApiGranularity> for CliGranularity {
    fn from(value: ApiGranularity) -> Self {
        match value {
            ApiGranularity::Yearly => CliGranularity::Yearly,
            ApiGranularity::Monthly => CliGranularity::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum ResponseGranularity {
    Yearly,
    Monthly,
}

impl From<Granularity> for ResponseGranularity {
    fn from(value: Granularity) -> Self {
        match value {
            Granularity::Yearly => ResponseGranularity::Yearly,
            Granularity::Monthly => ResponseGranularity::Monthly,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MilestonePayload {
    year: u32,
    raise_pct: f64,
}

/// JSON bodies may send `[{"year":3,"raisePct":20}]`; query strings send
/// `milestones=3:20,6:18`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MilestonesPayload {
    List(Vec<MilestonePayload>),
    Pairs(String),
}

impl MilestonesPayload {
    fn into_pairs(self) -> Result<Vec<(u32, f64)>, String> {
        match self {
            MilestonesPayload::List(list) => {
                Ok(list.iter().map(|m| (m.year, m.raise_pct)).collect())
            }
            MilestonesPayload::Pairs(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|pair| !pair.is_empty())
                .map(parse_milestone)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    monthly_investment: Option<f64>,
    annual_return: Option<f64>,
    volatility: Option<f64>,
    years: Option<u32>,
    starting_age: Option<u32>,
    starting_balance: Option<f64>,

    salary_growth: Option<bool>,
    net_salary: Option<f64>,
    investment_rate: Option<f64>,
    milestones: Option<MilestonesPayload>,
    standard_milestones: Option<bool>,

    mean_reversion: Option<bool>,
    mean_reversion_strength: Option<f64>,
    benchmark: Option<bool>,
    table_view: Option<ApiGranularity>,
    ensemble_paths: Option<u32>,
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "dca-sim",
    about = "Monte Carlo projection of a monthly investment plan (share-based DCA)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON projection API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one projection and print the report as JSON
    Project(PlanArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[arg(long, default_value_t = 500.0, help = "Fixed monthly contribution")]
    monthly_investment: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        allow_negative_numbers = true,
        help = "Expected annual return in percent, e.g. 7"
    )]
    annual_return: f64,
    #[arg(long, default_value_t = 15.0, help = "Annual volatility in percent")]
    volatility: f64,
    #[arg(long, default_value_t = 30, help = "Investment horizon in years")]
    years: u32,
    #[arg(long, default_value_t = 25, help = "Age at the start of the plan")]
    starting_age: u32,
    #[arg(long, default_value_t = 0.0, help = "Balance invested before month 1")]
    starting_balance: f64,
    #[arg(
        long,
        help = "Invest a share of a growing net salary instead of --monthly-investment"
    )]
    salary_growth: bool,
    #[arg(long, default_value_t = 3000.0, help = "Starting net monthly salary")]
    net_salary: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Share of net salary invested each month in percent"
    )]
    investment_rate: f64,
    #[arg(
        long = "milestone",
        value_parser = parse_milestone,
        help = "Salary raise as YEAR:PCT (0-based year), e.g. 3:20; repeatable"
    )]
    milestones: Vec<(u32, f64)>,
    #[arg(
        long,
        help = "Enable the stock raise table: +20% yr 3, +18% yr 6, +22% yr 10, +25% yr 15"
    )]
    standard_milestones: bool,
    #[arg(long, help = "Nudge next year's drift against last year's deviation")]
    mean_reversion: bool,
    #[arg(
        long,
        default_value_t = DEFAULT_MEAN_REVERSION_STRENGTH,
        allow_negative_numbers = true,
        help = "Mean reversion strength (negative pulls toward the expected return)"
    )]
    mean_reversion_strength: f64,
    #[arg(long, help = "Skip the zero-volatility benchmark run")]
    no_benchmark: bool,
    #[arg(long, value_enum, default_value_t = CliGranularity::Yearly)]
    granularity: CliGranularity,
    #[arg(long, help = "Also run this many independent paths and report percentile bands")]
    ensemble_paths: Option<u32>,
    #[arg(long, help = "Base seed for reproducible runs")]
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    seed: u64,
    table_view: ResponseGranularity,
    stats: HeadlineStats,
    chart: ChartSeries,
    rows: Vec<SummaryRow>,
    salary: Option<SalaryTable>,
    history: Vec<Vec<f64>>,
    ensemble: Option<EnsembleBand>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

fn parse_milestone(raw: &str) -> Result<(u32, f64), String> {
    let (year, pct) = raw
        .split_once(':')
        .ok_or_else(|| format!("milestone '{raw}' must look like YEAR:PCT"))?;
    let year = year
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("milestone year '{year}': {e}"))?;
    let pct = pct
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("milestone percent '{pct}': {e}"))?;
    Ok((year, pct))
}

fn build_request(args: PlanArgs) -> Result<RunRequest, String> {
    if !(1..=MAX_TOTAL_YEARS).contains(&args.years) {
        return Err(format!("--years must be between 1 and {MAX_TOTAL_YEARS}"));
    }

    if !args.volatility.is_finite() || args.volatility < 0.0 {
        return Err("--volatility must be >= 0".to_string());
    }

    if !args.annual_return.is_finite() || args.annual_return <= -100.0 {
        return Err("--annual-return must be > -100".to_string());
    }

    if !args.starting_balance.is_finite() || args.starting_balance < 0.0 {
        return Err("--starting-balance must be >= 0".to_string());
    }

    if args
        .ensemble_paths
        .is_some_and(|paths| !(1..=MAX_ENSEMBLE_PATHS).contains(&paths))
    {
        return Err(format!(
            "--ensemble-paths must be between 1 and {MAX_ENSEMBLE_PATHS}"
        ));
    }

    if !args.mean_reversion_strength.is_finite() {
        return Err("--mean-reversion-strength must be finite".to_string());
    }

    let plan = if args.salary_growth {
        if !args.net_salary.is_finite() || args.net_salary <= 0.0 {
            return Err("--net-salary must be > 0".to_string());
        }

        if !(0.0..=100.0).contains(&args.investment_rate) {
            return Err("--investment-rate must be between 0 and 100".to_string());
        }

        let mut milestones = if args.standard_milestones {
            standard_milestones()
        } else {
            Milestones::new()
        };
        for (year, pct) in &args.milestones {
            if !pct.is_finite() || *pct <= -100.0 {
                return Err(format!("--milestone {year}:{pct} raise must be > -100"));
            }
            milestones.insert(*year, pct / 100.0);
        }

        ContributionPlan::SalaryGrowth(SalaryGrowthPlan {
            net_monthly_income: args.net_salary,
            investment_rate_pct: args.investment_rate,
            milestones,
        })
    } else {
        if !args.monthly_investment.is_finite() || args.monthly_investment < 0.0 {
            return Err("--monthly-investment must be >= 0".to_string());
        }
        ContributionPlan::Fixed {
            monthly_amount: args.monthly_investment,
        }
    };

    Ok(RunRequest {
        plan,
        annual_return_pct: args.annual_return,
        annual_vol_pct: args.volatility,
        total_years: args.years,
        starting_balance: args.starting_balance,
        start_age: args.starting_age,
        mean_reversion: args.mean_reversion.then_some(MeanReversion {
            strength: args.mean_reversion_strength,
        }),
        include_benchmark: !args.no_benchmark,
        granularity: args.granularity.into(),
        ensemble_paths: args.ensemble_paths,
        seed: args.seed,
    })
}

pub fn run_projection(args: PlanArgs) -> Result<String, String> {
    let request = build_request(args)?;
    let outcome = Orchestrator::new()
        .run(&request)
        .map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&build_projection_response(&request, outcome))
        .map_err(|e| format!("failed to serialize projection: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let state: SharedOrchestrator = Arc::new(Mutex::new(Orchestrator::new()));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/history", axum::routing::delete(clear_history_handler))
        .route("/api/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "projection API listening");
    info!("local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, StatusResponse { status: "ok" })
}

async fn clear_history_handler(State(state): State<SharedOrchestrator>) -> Response {
    lock(&state).clear_history();
    json_response(StatusCode::OK, StatusResponse { status: "cleared" })
}

async fn simulate_get_handler(
    State(state): State<SharedOrchestrator>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&state, payload)
}

async fn simulate_post_handler(
    State(state): State<SharedOrchestrator>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    simulate_handler_impl(&state, payload)
}

fn simulate_handler_impl(state: &SharedOrchestrator, payload: SimulatePayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(%msg, "rejected simulate request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let outcome = lock(state).run(&request);
    match outcome {
        Ok(outcome) => json_response(
            StatusCode::OK,
            build_projection_response(&request, outcome),
        ),
        Err(e) => {
            warn!(error = %e, "projection failed");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

fn lock(state: &SharedOrchestrator) -> MutexGuard<'_, Orchestrator> {
    // A panic mid-run leaves no partial state worth discarding.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
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
fn request_from_json(json: &str) -> Result<RunRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    request_from_payload(payload)
}

fn request_from_payload(payload: SimulatePayload) -> Result<RunRequest, String> {
    let mut args = default_plan_args();

    if let Some(v) = payload.monthly_investment {
        args.monthly_investment = v;
    }
    if let Some(v) = payload.annual_return {
        args.annual_return = v;
    }
    if let Some(v) = payload.volatility {
        args.volatility = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.starting_age {
        args.starting_age = v;
    }
    if let Some(v) = payload.starting_balance {
        args.starting_balance = v;
    }

    if let Some(v) = payload.salary_growth {
        args.salary_growth = v;
    }
    if let Some(v) = payload.net_salary {
        args.net_salary = v;
    }
    if let Some(v) = payload.investment_rate {
        args.investment_rate = v;
    }
    if let Some(v) = payload.milestones {
        args.milestones = v.into_pairs().map_err(|e| format!("milestones: {e}"))?;
    }
    if let Some(v) = payload.standard_milestones {
        args.standard_milestones = v;
    }

    if let Some(v) = payload.mean_reversion {
        args.mean_reversion = v;
    }
    if let Some(v) = payload.mean_reversion_strength {
        args.mean_reversion_strength = v;
    }
    if let Some(v) = payload.benchmark {
        args.no_benchmark = !v;
    }
    if let Some(v) = payload.table_view {
        args.granularity = v.into();
    }
    if let Some(v) = payload.ensemble_paths {
        args.ensemble_paths = Some(v);
    }
    if let Some(v) = payload.seed {
        args.seed = Some(v);
    }

    build_request(args)
}

fn default_plan_args() -> PlanArgs {
    PlanArgs {
        monthly_investment: 500.0,
        annual_return: 7.0,
        volatility: 15.0,
        years: 30,
        starting_age: 25,
        starting_balance: 0.0,
        salary_growth: false,
        net_salary: 3_000.0,
        investment_rate: 10.0,
        milestones: Vec::new(),
        standard_milestones: false,
        mean_reversion: false,
        mean_reversion_strength: DEFAULT_MEAN_REVERSION_STRENGTH,
        no_benchmark: false,
        granularity: CliGranularity::Yearly,
        ensemble_paths: None,
        seed: None,
    }
}

fn build_projection_response(request: &RunRequest, outcome: RunOutcome) -> ProjectionResponse {
    ProjectionResponse {
        seed: outcome.seed,
        table_view: request.granularity.into(),
        stats: outcome.stats,
        chart: outcome.chart,
        rows: outcome.rows,
        salary: outcome.salary,
        history: outcome.history,
        ensemble: outcome.ensemble,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Uri;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> PlanArgs {
        default_plan_args()
    }

    fn shared() -> SharedOrchestrator {
        Arc::new(Mutex::new(Orchestrator::new()))
    }

    #[test]
    fn cli_parses_project_subcommand_with_milestones() {
        let cli = Cli::try_parse_from([
            "dca-sim",
            "project",
            "--salary-growth",
            "--years",
            "12",
            "--annual-return",
            "-2.5",
            "--milestone",
            "3:20",
            "--milestone",
            "6:18",
            "--granularity",
            "monthly",
            "--seed",
            "9",
        ])
        .expect("cli should parse");

        let Command::Project(args) = cli.command else {
            panic!("expected project subcommand");
        };
        assert_eq!(args.milestones, vec![(3, 20.0), (6, 18.0)]);

        let request = build_request(args).expect("valid args");
        assert_eq!(request.total_years, 12);
        assert_approx(request.annual_return_pct, -2.5);
        assert_eq!(request.granularity, Granularity::Monthly);
        assert_eq!(request.seed, Some(9));
        let ContributionPlan::SalaryGrowth(plan) = request.plan else {
            panic!("expected salary plan");
        };
        assert_approx(plan.milestones[&3], 0.20);
        assert_approx(plan.milestones[&6], 0.18);
    }

    #[test]
    fn cli_parses_serve_port() {
        let cli = Cli::try_parse_from(["dca-sim", "serve", "--port", "9000"])
            .expect("cli should parse");
        assert!(matches!(cli.command, Command::Serve { port: 9000 }));
    }

    #[test]
    fn parse_milestone_rejects_malformed_pairs() {
        assert_eq!(parse_milestone("10:22"), Ok((10, 22.0)));
        assert!(parse_milestone("10").is_err());
        assert!(parse_milestone("ten:22").is_err());
        assert!(parse_milestone("10:abc").is_err());
    }

    #[test]
    fn build_request_defaults_to_fixed_plan_with_benchmark() {
        let request = build_request(sample_args()).expect("valid args");
        assert_eq!(
            request.plan,
            ContributionPlan::Fixed {
                monthly_amount: 500.0
            }
        );
        assert!(request.include_benchmark);
        assert!(request.mean_reversion.is_none());
        assert_eq!(request.start_age, 25);
    }

    #[test]
    fn build_request_rejects_zero_years() {
        let mut args = sample_args();
        args.years = 0;
        let err = build_request(args).expect_err("must reject zero years");
        assert!(err.contains("--years"));
    }

    #[test]
    fn build_request_rejects_negative_volatility() {
        let mut args = sample_args();
        args.volatility = -1.0;
        let err = build_request(args).expect_err("must reject negative volatility");
        assert!(err.contains("--volatility"));
    }

    #[test]
    fn build_request_rejects_investment_rate_out_of_range() {
        let mut args = sample_args();
        args.salary_growth = true;
        args.investment_rate = 101.0;
        let err = build_request(args).expect_err("must reject investment rate");
        assert!(err.contains("--investment-rate"));
    }

    #[test]
    fn explicit_milestones_override_standard_table() {
        let mut args = sample_args();
        args.salary_growth = true;
        args.standard_milestones = true;
        args.milestones = vec![(3, 5.0)];

        let request = build_request(args).expect("valid args");
        let ContributionPlan::SalaryGrowth(plan) = request.plan else {
            panic!("expected salary plan");
        };
        assert_eq!(plan.milestones.len(), 4);
        assert_approx(plan.milestones[&3], 0.05);
        assert_approx(plan.milestones[&15], 0.25);
    }

    #[test]
    fn request_from_json_parses_web_keys() {
        let json = r#"{
          "monthlyInvestment": 750,
          "annualReturn": 6,
          "volatility": 0,
          "years": 4,
          "startingAge": 31,
          "startingBalance": 10000,
          "salaryGrowth": true,
          "netSalary": 3000,
          "investmentRate": 10,
          "milestones": [{ "year": 3, "raisePct": 20 }],
          "meanReversion": true,
          "benchmark": false,
          "tableView": "monthly",
          "ensemblePaths": 12,
          "seed": 5
        }"#;
        let request = request_from_json(json).expect("json should parse");

        assert_eq!(request.total_years, 4);
        assert_eq!(request.start_age, 31);
        assert_approx(request.starting_balance, 10_000.0);
        assert_approx(request.annual_vol_pct, 0.0);
        assert!(!request.include_benchmark);
        assert_eq!(request.granularity, Granularity::Monthly);
        assert_eq!(request.ensemble_paths, Some(12));
        assert_eq!(request.seed, Some(5));
        assert_eq!(request.mean_reversion, Some(MeanReversion::default()));

        let ContributionPlan::SalaryGrowth(plan) = request.plan else {
            panic!("expected salary plan");
        };
        assert_approx(plan.net_monthly_income, 3_000.0);
        assert_approx(plan.milestones[&3], 0.20);
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let request = request_from_json("{}").expect("json should parse");
        assert_eq!(request, build_request(default_plan_args()).expect("valid"));
    }

    #[test]
    fn projection_response_serialization_contains_expected_fields() {
        let mut args = sample_args();
        args.years = 2;
        args.volatility = 0.0;
        args.salary_growth = true;
        args.ensemble_paths = Some(4);

        let request = build_request(args).expect("valid args");
        let outcome = Orchestrator::new().run(&request).expect("valid request");
        let response = build_projection_response(&request, outcome);
        let json = serde_json::to_string(&response).expect("response should serialize");

        for key in [
            "\"seed\"",
            "\"tableView\":\"yearly\"",
            "\"annualizedReturnPct\"",
            "\"sharePriceIndex\"",
            "\"trailing12mPct\"",
            "\"ageTicks\"",
            "\"periodReturnPct\"",
            "\"averageMonthlyContribution\"",
            "\"milestone\"",
            "\"history\"",
            "\"medianBalance\"",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn run_projection_prints_json_report() {
        let mut args = sample_args();
        args.years = 1;
        args.seed = Some(3);
        let report = run_projection(args).expect("valid args");
        let value: serde_json::Value = serde_json::from_str(&report).expect("valid json");
        assert_eq!(value["rows"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["chart"]["balance"].as_array().map(Vec::len), Some(13));
    }

    #[tokio::test]
    async fn simulate_handler_accumulates_history_and_rejects_bad_input() {
        let state = shared();
        let payload = || SimulatePayload {
            years: Some(2),
            seed: Some(1),
            ..SimulatePayload::default()
        };

        assert_eq!(simulate_handler_impl(&state, payload()).status(), StatusCode::OK);
        let response = simulate_handler_impl(&state, payload());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("valid json");
        assert_eq!(value["history"].as_array().map(Vec::len), Some(1));

        let bad = SimulatePayload {
            volatility: Some(-3.0),
            ..SimulatePayload::default()
        };
        assert_eq!(
            simulate_handler_impl(&state, bad).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn oversized_horizon_and_path_count_are_rejected_before_running() {
        let state = shared();
        let huge_horizon = SimulatePayload {
            years: Some(u32::MAX),
            ..SimulatePayload::default()
        };
        assert_eq!(
            simulate_handler_impl(&state, huge_horizon).status(),
            StatusCode::BAD_REQUEST
        );

        let huge_ensemble = SimulatePayload {
            years: Some(1),
            ensemble_paths: Some(u32::MAX),
            ..SimulatePayload::default()
        };
        assert_eq!(
            simulate_handler_impl(&state, huge_ensemble).status(),
            StatusCode::BAD_REQUEST
        );

        let mut args = sample_args();
        args.years = MAX_TOTAL_YEARS + 1;
        let err = build_request(args).expect_err("must reject long horizon");
        assert!(err.contains("--years"));

        let mut args = sample_args();
        args.ensemble_paths = Some(MAX_ENSEMBLE_PATHS + 1);
        let err = build_request(args).expect_err("must reject path count");
        assert!(err.contains("--ensemble-paths"));

        let mut args = sample_args();
        args.years = MAX_TOTAL_YEARS;
        assert!(build_request(args).is_ok());
    }

    #[test]
    fn query_string_accepts_milestone_pairs() {
        let uri: Uri = "/api/simulate?salaryGrowth=true&years=8&milestones=3:20,6:18"
            .parse()
            .expect("valid uri");
        let Query(payload) =
            Query::<SimulatePayload>::try_from_uri(&uri).expect("query should parse");
        let request = request_from_payload(payload).expect("valid payload");

        let ContributionPlan::SalaryGrowth(plan) = request.plan else {
            panic!("expected salary plan");
        };
        assert_eq!(plan.milestones.len(), 2);
        assert_approx(plan.milestones[&3], 0.20);
        assert_approx(plan.milestones[&6], 0.18);
    }

    #[test]
    fn malformed_milestone_pairs_are_rejected() {
        let err = request_from_json(r#"{"salaryGrowth": true, "milestones": "3:20,six"}"#)
            .expect_err("must reject malformed pair");
        assert!(err.contains("milestone"));
    }
}
