use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    ConfidenceBands, DEFAULT_RUNS, DescriptiveStats, Params, Regression, SimulationResults,
    Strategy, StrategyResult, build_confidence_bands, run_monte_carlo, stats,
};

const RISK_ALPHA: f64 = 0.95;

#[derive(Parser, Debug)]
#[command(
    name = "solvency",
    about = "Monte Carlo household debt/savings strategy risk estimator"
)]
struct Cli {
    #[arg(long, help = "Mean monthly net income")]
    monthly_income: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly income standard deviation")]
    income_std: f64,
    #[arg(long, help = "Fixed monthly expenses (rent, utilities, insurance)")]
    monthly_fixed_expenses: f64,
    #[arg(long, default_value_t = 0.0, help = "Mean variable monthly expenses")]
    monthly_variable_expenses: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Variable expense standard deviation"
    )]
    variable_expense_std: f64,
    #[arg(long, default_value_t = 0.0, help = "Starting liquid cash balance")]
    initial_cash: f64,
    #[arg(long, default_value_t = 0.0, help = "Starting investment balance")]
    initial_savings: f64,
    #[arg(long, default_value_t = 0.0, help = "Outstanding debt principal")]
    debt_principal: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Debt annual percentage rate in percent, e.g. 19.9"
    )]
    debt_apr: f64,
    #[arg(long, default_value_t = 0.0, help = "Minimum monthly debt payment")]
    minimum_debt_payment: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Expected annual savings return in percent"
    )]
    annual_return: f64,
    #[arg(
        long,
        default_value_t = 2.5,
        help = "Annual inflation rate in percent, compounded monthly"
    )]
    annual_inflation: f64,
    #[arg(long, default_value_t = 10, help = "Projection horizon in years")]
    horizon_years: u32,
    #[arg(long, help = "Target net worth for the goal probability")]
    net_worth_goal: f64,
    #[arg(long, default_value_t = DEFAULT_RUNS, help = "Trajectories per strategy")]
    runs: u32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    monthly_income: Option<f64>,
    income_std: Option<f64>,
    monthly_fixed_expenses: Option<f64>,
    monthly_variable_expenses: Option<f64>,
    variable_expense_std: Option<f64>,
    initial_cash: Option<f64>,
    initial_savings: Option<f64>,
    debt_principal: Option<f64>,
    debt_apr: Option<f64>,
    minimum_debt_payment: Option<f64>,
    annual_return: Option<f64>,
    annual_inflation: Option<f64>,
    horizon_years: Option<u32>,
    net_worth_goal: Option<f64>,
    runs: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug)]
struct ApiRequest {
    params: Params,
    runs: u32,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    runs: u32,
    seed: u64,
    horizon_months: u32,
    strategies: StrategiesResponse,
    median_net_worth_correlation: CorrelationResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StrategiesResponse {
    minimum: StrategyReport,
    aggressive: StrategyReport,
    investing: StrategyReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StrategyReport {
    strategy: &'static str,
    ruin_probability: f64,
    goal_probability: f64,
    debt_free_probability: f64,
    median_debt_free_month: Option<f64>,
    terminal_net_worth: DescriptiveStats,
    value_at_risk95: f64,
    expected_shortfall95: f64,
    median_trend: Regression,
    bands: ConfidenceBands,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorrelationResponse {
    labels: Vec<&'static str>,
    matrix: Vec<Vec<f64>>,
}

fn build_params(cli: Cli) -> Result<ApiRequest, String> {
    for (label, value) in [
        ("--monthly-income", cli.monthly_income),
        ("--income-std", cli.income_std),
        ("--monthly-fixed-expenses", cli.monthly_fixed_expenses),
        ("--monthly-variable-expenses", cli.monthly_variable_expenses),
        ("--variable-expense-std", cli.variable_expense_std),
        ("--initial-cash", cli.initial_cash),
        ("--initial-savings", cli.initial_savings),
        ("--debt-principal", cli.debt_principal),
        ("--debt-apr", cli.debt_apr),
        ("--minimum-debt-payment", cli.minimum_debt_payment),
    ] {
        if !(value >= 0.0) {
            return Err(format!("{label} must be >= 0"));
        }
    }

    if cli.debt_principal > 0.0 && cli.minimum_debt_payment <= 0.0 {
        return Err(
            "--minimum-debt-payment must be > 0 when there is outstanding debt".to_string(),
        );
    }

    if cli.horizon_years == 0 {
        return Err("--horizon-years must be >= 1".to_string());
    }
    if cli.runs == 0 {
        return Err("--runs must be >= 1".to_string());
    }

    let params = Params {
        monthly_income: cli.monthly_income,
        income_std: cli.income_std,
        monthly_fixed_expenses: cli.monthly_fixed_expenses,
        monthly_variable_expenses: cli.monthly_variable_expenses,
        variable_expense_std: cli.variable_expense_std,
        initial_cash: cli.initial_cash,
        initial_savings: cli.initial_savings,
        debt_principal: cli.debt_principal,
        debt_apr: cli.debt_apr,
        minimum_debt_payment: cli.minimum_debt_payment,
        annual_return: cli.annual_return,
        annual_inflation: cli.annual_inflation,
        horizon_years: cli.horizon_years,
        net_worth_goal: cli.net_worth_goal,
        seed: cli.seed,
    };
    params.validate()?;

    Ok(ApiRequest {
        params,
        runs: cli.runs,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Solvency HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let results = match run_monte_carlo(&request.params, request.runs) {
        Ok(results) => results,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let response = build_simulate_response(&request.params, request.runs, &results);
    json_response(StatusCode::OK, response)
}

fn build_simulate_response(
    params: &Params,
    runs: u32,
    results: &SimulationResults,
) -> SimulateResponse {
    let minimum = build_strategy_report(Strategy::Minimum, &results.minimum);
    let aggressive = build_strategy_report(Strategy::Aggressive, &results.aggressive);
    let investing = build_strategy_report(Strategy::Investing, &results.investing);

    let labels: Vec<&'static str> = Strategy::ALL.iter().map(|s| s.key()).collect();
    let series: Vec<(&str, &[f64])> = vec![
        (Strategy::Minimum.key(), &minimum.bands.p50),
        (Strategy::Aggressive.key(), &aggressive.bands.p50),
        (Strategy::Investing.key(), &investing.bands.p50),
    ];
    let matrix = stats::correlation_matrix(&series);

    SimulateResponse {
        runs,
        seed: params.seed,
        horizon_months: params.horizon_months(),
        strategies: StrategiesResponse {
            minimum,
            aggressive,
            investing,
        },
        median_net_worth_correlation: CorrelationResponse { labels, matrix },
    }
}

fn build_strategy_report(strategy: Strategy, result: &StrategyResult) -> StrategyReport {
    let bands = build_confidence_bands(&result.trajectories);
    let month_index: Vec<f64> = (0..bands.p50.len()).map(|m| m as f64).collect();
    let median_trend = stats::simple_linear_regression(&month_index, &bands.p50);

    StrategyReport {
        strategy: strategy.key(),
        ruin_probability: result.ruin_probability,
        goal_probability: result.goal_probability,
        debt_free_probability: result.debt_free_probability,
        median_debt_free_month: result.median_debt_free_month,
        terminal_net_worth: stats::descriptive_stats(&result.terminal_net_worths),
        value_at_risk95: stats::value_at_risk(&result.terminal_net_worths, RISK_ALPHA),
        expected_shortfall95: stats::expected_shortfall(&result.terminal_net_worths, RISK_ALPHA),
        median_trend,
        bands,
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
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.monthly_income {
        cli.monthly_income = v;
    }
    if let Some(v) = payload.income_std {
        cli.income_std = v;
    }
    if let Some(v) = payload.monthly_fixed_expenses {
        cli.monthly_fixed_expenses = v;
    }
    if let Some(v) = payload.monthly_variable_expenses {
        cli.monthly_variable_expenses = v;
    }
    if let Some(v) = payload.variable_expense_std {
        cli.variable_expense_std = v;
    }
    if let Some(v) = payload.initial_cash {
        cli.initial_cash = v;
    }
    if let Some(v) = payload.initial_savings {
        cli.initial_savings = v;
    }
    if let Some(v) = payload.debt_principal {
        cli.debt_principal = v;
    }
    if let Some(v) = payload.debt_apr {
        cli.debt_apr = v;
    }
    if let Some(v) = payload.minimum_debt_payment {
        cli.minimum_debt_payment = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.annual_inflation {
        cli.annual_inflation = v;
    }
    if let Some(v) = payload.horizon_years {
        cli.horizon_years = v;
    }
    if let Some(v) = payload.net_worth_goal {
        cli.net_worth_goal = v;
    }
    if let Some(v) = payload.runs {
        cli.runs = v;
    }
    if let Some(v) = payload.seed {
        cli.seed = v;
    }

    build_params(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        monthly_income: 4_500.0,
        income_std: 400.0,
        monthly_fixed_expenses: 2_200.0,
        monthly_variable_expenses: 800.0,
        variable_expense_std: 250.0,
        initial_cash: 3_000.0,
        initial_savings: 10_000.0,
        debt_principal: 15_000.0,
        debt_apr: 19.9,
        minimum_debt_payment: 300.0,
        annual_return: 6.0,
        annual_inflation: 2.5,
        horizon_years: 10,
        net_worth_goal: 100_000.0,
        runs: DEFAULT_RUNS,
        seed: 42,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_params_accepts_the_defaults() {
        let request = build_params(sample_cli()).expect("defaults are valid");
        assert_eq!(request.runs, DEFAULT_RUNS);
        assert_approx(request.params.monthly_income, 4_500.0);
        assert_approx(request.params.debt_apr, 19.9);
    }

    #[test]
    fn build_params_rejects_negative_amounts() {
        let mut cli = sample_cli();
        cli.initial_savings = -1.0;
        let err = build_params(cli).expect_err("must reject negative savings");
        assert!(err.contains("--initial-savings"));
    }

    #[test]
    fn build_params_rejects_zero_horizon_and_zero_runs() {
        let mut cli = sample_cli();
        cli.horizon_years = 0;
        assert!(build_params(cli).is_err());

        let mut cli = sample_cli();
        cli.runs = 0;
        assert!(build_params(cli).is_err());
    }

    #[test]
    fn build_params_rejects_debt_without_a_minimum_payment() {
        let mut cli = sample_cli();
        cli.debt_principal = 5_000.0;
        cli.minimum_debt_payment = 0.0;
        let err = build_params(cli).expect_err("must require a payment");
        assert!(err.contains("--minimum-debt-payment"));
    }

    #[test]
    fn build_params_rejects_non_finite_fields() {
        let mut cli = sample_cli();
        cli.net_worth_goal = f64::NAN;
        assert!(build_params(cli).is_err());
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "monthlyIncome": 5200,
          "incomeStd": 350,
          "monthlyFixedExpenses": 2500,
          "monthlyVariableExpenses": 900,
          "variableExpenseStd": 200,
          "initialCash": 4000,
          "initialSavings": 25000,
          "debtPrincipal": 8000,
          "debtApr": 12.5,
          "minimumDebtPayment": 250,
          "annualReturn": 7,
          "annualInflation": 3,
          "horizonYears": 15,
          "netWorthGoal": 250000,
          "runs": 1234,
          "seed": 9
        }"#;

        let request = api_request_from_json(json).expect("json should parse");
        assert_approx(request.params.monthly_income, 5_200.0);
        assert_approx(request.params.income_std, 350.0);
        assert_approx(request.params.debt_principal, 8_000.0);
        assert_approx(request.params.debt_apr, 12.5);
        assert_approx(request.params.net_worth_goal, 250_000.0);
        assert_eq!(request.params.horizon_years, 15);
        assert_eq!(request.params.seed, 9);
        assert_eq!(request.runs, 1234);
    }

    #[test]
    fn api_request_from_json_keeps_defaults_for_missing_keys() {
        let request = api_request_from_json(r#"{ "runs": 7 }"#).expect("json should parse");
        assert_eq!(request.runs, 7);
        assert_approx(request.params.monthly_income, 4_500.0);
        assert_eq!(request.params.horizon_years, 10);
    }

    #[test]
    fn api_request_from_json_rejects_invalid_overrides() {
        let err = api_request_from_json(r#"{ "debtApr": -4.0 }"#)
            .expect_err("must reject negative apr");
        assert!(err.contains("--debt-apr"));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let mut cli = sample_cli();
        cli.horizon_years = 1;
        cli.runs = 5;

        let request = build_params(cli).expect("valid request");
        let results = run_monte_carlo(&request.params, request.runs).expect("simulation runs");
        let response = build_simulate_response(&request.params, request.runs, &results);
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"strategies\""));
        assert!(json.contains("\"minimum\""));
        assert!(json.contains("\"aggressive\""));
        assert!(json.contains("\"investing\""));
        assert!(json.contains("\"ruinProbability\""));
        assert!(json.contains("\"goalProbability\""));
        assert!(json.contains("\"debtFreeProbability\""));
        assert!(json.contains("\"medianDebtFreeMonth\""));
        assert!(json.contains("\"terminalNetWorth\""));
        assert!(json.contains("\"valueAtRisk95\""));
        assert!(json.contains("\"expectedShortfall95\""));
        assert!(json.contains("\"medianTrend\""));
        assert!(json.contains("\"bands\""));
        assert!(json.contains("\"medianNetWorthCorrelation\""));
        assert!(json.contains("\"horizonMonths\""));
    }

    #[test]
    fn simulate_response_correlation_matrix_has_unit_diagonal() {
        let mut cli = sample_cli();
        cli.horizon_years = 2;
        cli.runs = 40;

        let request = build_params(cli).expect("valid request");
        let results = run_monte_carlo(&request.params, request.runs).expect("simulation runs");
        let response = build_simulate_response(&request.params, request.runs, &results);

        let matrix = &response.median_net_worth_correlation.matrix;
        assert_eq!(matrix.len(), 3);
        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row.len(), 3);
            assert_eq!(row[i], 1.0);
        }
        assert_eq!(
            response.median_net_worth_correlation.labels,
            vec!["minimum", "aggressive", "investing"]
        );
    }

    #[test]
    fn strategy_report_bands_cover_the_full_horizon() {
        let mut cli = sample_cli();
        cli.horizon_years = 1;
        cli.runs = 30;

        let request = build_params(cli).expect("valid request");
        let results = run_monte_carlo(&request.params, request.runs).expect("simulation runs");
        let response = build_simulate_response(&request.params, request.runs, &results);

        for report in [
            &response.strategies.minimum,
            &response.strategies.aggressive,
            &response.strategies.investing,
        ] {
            assert_eq!(report.bands.p50.len(), 12);
            assert_eq!(report.terminal_net_worth.count, 30);
        }
    }
}
