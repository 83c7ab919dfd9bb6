use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{NarrativeSettings, Settings};
use crate::core::{
    HorizonUnit, PeriodSnapshot, RateBasis, SimulationParameters, SimulationResult,
    SimulationSummary, horizon_in_months, project,
};
use crate::narrative::NarrativeClient;
use crate::report::{DEFAULT_MAX_CHART_POINTS, FormattedSummary, decimate, render_table};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_HORIZON_MONTHS: u32 = 1200;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRateBasis {
    Annual,
    Monthly,
}

impl From<CliRateBasis> for RateBasis {
    fn from(value: CliRateBasis) -> Self {
        match value {
            CliRateBasis::Annual => RateBasis::Annual,
            CliRateBasis::Monthly => RateBasis::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliHorizonUnit {
    Years,
    Months,
}

impl From<CliHorizonUnit> for HorizonUnit {
    fn from(value: CliHorizonUnit) -> Self {
        match value {
            CliHorizonUnit::Years => HorizonUnit::Years,
            CliHorizonUnit::Months => HorizonUnit::Months,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiRateBasis {
    #[serde(alias = "anual", alias = "yearly", alias = "ANNUAL", alias = "YEARLY")]
    Annual,
    #[serde(alias = "mensal", alias = "MONTHLY")]
    Monthly,
}

impl From<ApiRateBasis> for CliRateBasis {
    fn from(value: ApiRateBasis) -> Self {
        match value {
            ApiRateBasis::Annual => CliRateBasis::Annual,
            ApiRateBasis::Monthly => CliRateBasis::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiHorizonUnit {
    #[serde(alias = "anos", alias = "YEARS")]
    Years,
    #[serde(alias = "meses", alias = "MONTHS")]
    Months,
}

impl From<ApiHorizonUnit> for CliHorizonUnit {
    fn from(value: ApiHorizonUnit) -> Self {
        match value {
            ApiHorizonUnit::Years => CliHorizonUnit::Years,
            ApiHorizonUnit::Months => CliHorizonUnit::Months,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_value: Option<Decimal>,
    monthly_contribution: Option<Decimal>,
    interest_rate: Option<Decimal>,
    #[serde(alias = "interestRateType")]
    interest_rate_basis: Option<ApiRateBasis>,
    #[serde(alias = "period")]
    horizon: Option<u32>,
    #[serde(alias = "periodType")]
    horizon_unit: Option<ApiHorizonUnit>,
    max_chart_points: Option<usize>,
}

#[derive(Parser, Debug)]
#[command(
    name = "compound",
    about = "Compound interest projection with monthly contributions (use `compound serve [port]` for the HTTP API)"
)]
struct Cli {
    #[arg(long, default_value = "1000", help = "Starting principal")]
    initial_value: Decimal,
    #[arg(
        long,
        default_value = "500",
        help = "Contribution added at the end of every month"
    )]
    monthly_contribution: Decimal,
    #[arg(
        long,
        default_value = "10",
        allow_hyphen_values = true,
        help = "Interest rate in percent, e.g. 10"
    )]
    interest_rate: Decimal,
    #[arg(
        long,
        value_enum,
        default_value_t = CliRateBasis::Annual,
        help = "Whether --interest-rate is a nominal annual or a monthly rate"
    )]
    rate_basis: CliRateBasis,
    #[arg(long, default_value_t = 10, help = "Projection length")]
    horizon: u32,
    #[arg(long, value_enum, default_value_t = CliHorizonUnit::Years)]
    horizon_unit: CliHorizonUnit,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(
        long,
        default_value_t = false,
        help = "Ask the narrative service for a written analysis of the result"
    )]
    analysis: bool,
}

#[derive(Copy, Clone, Debug)]
struct ApiOptions {
    max_chart_points: usize,
}

#[derive(Debug)]
struct ApiRequest {
    params: SimulationParameters,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    parameters: SimulationParameters,
    #[serde(flatten)]
    result: SimulationResult,
    formatted_summary: FormattedSummary,
    chart: Vec<PeriodSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisResponse {
    analysis: String,
    narrative_configured: bool,
    summary: SimulationSummary,
    formatted_summary: FormattedSummary,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

struct AppState {
    narrative: NarrativeClient,
}

fn build_parameters(cli: &Cli) -> Result<SimulationParameters, String> {
    if cli.horizon == 0 {
        return Err("--horizon must be >= 1".to_string());
    }

    let params = SimulationParameters {
        initial_value: cli.initial_value,
        monthly_contribution: cli.monthly_contribution,
        interest_rate: cli.interest_rate,
        interest_rate_basis: cli.rate_basis.into(),
        horizon: cli.horizon,
        horizon_unit: cli.horizon_unit.into(),
    };

    if horizon_in_months(params.horizon, params.horizon_unit) > MAX_HORIZON_MONTHS {
        return Err(format!(
            "--horizon must not exceed {MAX_HORIZON_MONTHS} months ({} years)",
            MAX_HORIZON_MONTHS / 12
        ));
    }

    Ok(params)
}

pub async fn run_cli(narrative: NarrativeSettings) -> Result<(), String> {
    let cli = Cli::parse();
    let params = build_parameters(&cli)?;
    let result = project(&params);
    tracing::debug!(
        months = result.horizon_in_months,
        final_amount = %result.summary.total_amount,
        "projection complete"
    );

    match cli.output {
        OutputFormat::Table => print!("{}", render_table(&result)),
        OutputFormat::Json => {
            let response = build_simulate_response(
                &params,
                result.clone(),
                ApiOptions {
                    max_chart_points: DEFAULT_MAX_CHART_POINTS,
                },
            );
            let json = serde_json::to_string_pretty(&response)
                .map_err(|e| format!("Failed to serialize projection: {e}"))?;
            println!("{json}");
        }
    }

    if cli.analysis {
        let narrative = NarrativeClient::new(narrative).map_err(|e| e.to_string())?;
        let text = narrative.generate(&params, &result).await;
        println!();
        println!("{text}");
    }

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/analysis", post(analysis_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, settings: Settings) -> std::io::Result<()> {
    let narrative = NarrativeClient::new(settings.narrative).map_err(std::io::Error::other)?;
    if !narrative.is_configured() {
        tracing::warn!("narrative service key not set; /api/analysis will return a fallback message");
    }
    let app = build_router(Arc::new(AppState { narrative }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "compound HTTP API listening");
    tracing::info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let result = project(&request.params);
    tracing::debug!(
        months = result.horizon_in_months,
        final_amount = %result.summary.total_amount,
        "simulate request served"
    );
    json_response(
        StatusCode::OK,
        build_simulate_response(&request.params, result, request.options),
    )
}

async fn analysis_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let result = project(&request.params);
    let analysis = state.narrative.generate(&request.params, &result).await;
    json_response(
        StatusCode::OK,
        AnalysisResponse {
            analysis,
            narrative_configured: state.narrative.is_configured(),
            formatted_summary: FormattedSummary::from(&result.summary),
            summary: result.summary,
        },
    )
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
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
    let mut options = ApiOptions {
        max_chart_points: DEFAULT_MAX_CHART_POINTS,
    };

    if let Some(v) = payload.initial_value {
        cli.initial_value = v;
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.interest_rate = v;
    }
    if let Some(v) = payload.interest_rate_basis {
        cli.rate_basis = v.into();
    }
    if let Some(v) = payload.horizon {
        cli.horizon = v;
    }
    if let Some(v) = payload.horizon_unit {
        cli.horizon_unit = v.into();
    }
    if let Some(v) = payload.max_chart_points {
        options.max_chart_points = v;
    }

    let params = build_parameters(&cli).map_err(|msg| msg.replace("--horizon", "horizon"))?;
    Ok(ApiRequest { params, options })
}

fn default_cli_for_api() -> Cli {
    Cli {
        initial_value: Decimal::from(1_000),
        monthly_contribution: Decimal::from(500),
        interest_rate: Decimal::from(10),
        rate_basis: CliRateBasis::Annual,
        horizon: 10,
        horizon_unit: CliHorizonUnit::Years,
        output: OutputFormat::Json,
        analysis: false,
    }
}

fn build_simulate_response(
    params: &SimulationParameters,
    result: SimulationResult,
    options: ApiOptions,
) -> SimulateResponse {
    SimulateResponse {
        parameters: params.clone(),
        formatted_summary: FormattedSummary::from(&result.summary),
        chart: decimate(&result.series, options.max_chart_points),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::MISSING_KEY_MESSAGE;
    use serde_json::Value;

    fn dec(value: &str) -> Decimal {
        value.parse().expect("valid decimal literal")
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    fn assert_json_approx(value: &Value, expected: f64) {
        let actual = value
            .as_f64()
            .unwrap_or_else(|| panic!("expected a number, got {value}"));
        assert!(
            (actual - expected).abs() <= 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    async fn spawn_server() -> String {
        let narrative =
            NarrativeClient::new(NarrativeSettings::default()).expect("client builds");
        let app = build_router(Arc::new(AppState { narrative }));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[test]
    fn build_parameters_maps_cli_defaults() {
        let params = build_parameters(&sample_cli()).expect("valid parameters");
        assert_eq!(params.initial_value, dec("1000"));
        assert_eq!(params.monthly_contribution, dec("500"));
        assert_eq!(params.interest_rate, dec("10"));
        assert_eq!(params.interest_rate_basis, RateBasis::Annual);
        assert_eq!(params.horizon, 10);
        assert_eq!(params.horizon_unit, HorizonUnit::Years);
    }

    #[test]
    fn build_parameters_rejects_zero_horizon() {
        let mut cli = sample_cli();
        cli.horizon = 0;

        let err = build_parameters(&cli).expect_err("must reject zero horizon");
        assert!(err.contains("--horizon"));
    }

    #[test]
    fn build_parameters_rejects_horizon_beyond_limit() {
        let mut cli = sample_cli();
        cli.horizon = 101;
        assert!(build_parameters(&cli).is_err());

        cli.horizon = 100;
        assert!(build_parameters(&cli).is_ok());

        cli.horizon = 1_200;
        cli.horizon_unit = CliHorizonUnit::Months;
        assert!(build_parameters(&cli).is_ok());
    }

    #[test]
    fn build_parameters_accepts_negative_rate_and_contribution() {
        let mut cli = sample_cli();
        cli.interest_rate = dec("-3");
        cli.monthly_contribution = dec("-50");

        let params = build_parameters(&cli).expect("signs are not validated");
        assert_eq!(params.interest_rate, dec("-3"));
        assert_eq!(params.monthly_contribution, dec("-50"));
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "compound",
            "--initial-value",
            "2500.50",
            "--interest-rate",
            "-1.5",
            "--rate-basis",
            "monthly",
            "--horizon",
            "18",
            "--horizon-unit",
            "months",
            "--output",
            "json",
        ])
        .expect("valid flags");

        assert_eq!(cli.initial_value, dec("2500.50"));
        assert_eq!(cli.monthly_contribution, dec("500"));
        assert_eq!(cli.interest_rate, dec("-1.5"));
        assert_eq!(cli.rate_basis, CliRateBasis::Monthly);
        assert_eq!(cli.horizon_unit, CliHorizonUnit::Months);
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(!cli.analysis);
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let request = api_request_from_json(
            r#"{
                "initialValue": 0,
                "monthlyContribution": "0",
                "interestRate": 5,
                "interestRateBasis": "monthly",
                "horizon": 3,
                "horizonUnit": "months",
                "maxChartPoints": 10
            }"#,
        )
        .expect("valid payload");

        assert_eq!(request.params.initial_value, Decimal::ZERO);
        assert_eq!(request.params.monthly_contribution, Decimal::ZERO);
        assert_eq!(request.params.interest_rate, dec("5"));
        assert_eq!(request.params.interest_rate_basis, RateBasis::Monthly);
        assert_eq!(request.params.horizon, 3);
        assert_eq!(request.params.horizon_unit, HorizonUnit::Months);
        assert_eq!(request.options.max_chart_points, 10);
    }

    #[test]
    fn api_request_from_json_accepts_portuguese_labels_and_legacy_keys() {
        let request = api_request_from_json(
            r#"{"interestRate": 1.2, "interestRateType": "mensal", "period": 24, "periodType": "meses"}"#,
        )
        .expect("valid payload");

        assert_eq!(request.params.initial_value, dec("1000"));
        assert_eq!(request.params.interest_rate, dec("1.2"));
        assert_eq!(request.params.interest_rate_basis, RateBasis::Monthly);
        assert_eq!(request.params.horizon, 24);
        assert_eq!(request.params.horizon_unit, HorizonUnit::Months);

        let request = api_request_from_json(r#"{"interestRateBasis": "anual", "horizonUnit": "anos"}"#)
            .expect("valid payload");
        assert_eq!(request.params.interest_rate_basis, RateBasis::Annual);
        assert_eq!(request.params.horizon_unit, HorizonUnit::Years);
    }

    #[test]
    fn api_request_from_json_rejects_bad_values() {
        let err = api_request_from_json(r#"{"interestRateBasis": "weekly"}"#)
            .expect_err("unknown basis");
        assert!(err.contains("Invalid API JSON payload"));

        let err = api_request_from_json(r#"{"horizon": 0}"#).expect_err("zero horizon");
        assert_eq!(err, "horizon must be >= 1");

        let err = api_request_from_json(r#"{"horizon": -2}"#).expect_err("negative horizon");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let request = api_request_from_json("{}").expect("defaults are valid");
        let result = project(&request.params);
        let response = build_simulate_response(&request.params, result, request.options);
        let json = serde_json::to_value(&response).expect("response should serialize");

        assert_eq!(json["horizonInMonths"], 120);
        assert_eq!(json["series"].as_array().map(Vec::len), Some(121));
        assert_eq!(json["chart"].as_array().map(Vec::len), Some(61));
        assert_json_approx(&json["summary"]["totalAmount"], 102_525.65);
        assert_json_approx(&json["summary"]["totalContributed"], 61_000.0);
        assert_eq!(json["parameters"]["interestRateBasis"], "annual");
        assert_eq!(json["parameters"]["horizonUnit"], "years");
        assert_eq!(json["formattedSummary"]["totalAmount"], "R$\u{a0}102.525,65");
        assert!(json["monthlyRate"].as_f64().is_some());
        assert_eq!(json["series"][0]["monthIndex"], 0);
        assert_json_approx(&json["series"][0]["totalInterestAccrued"], 0.0);
    }

    #[tokio::test]
    async fn http_simulate_get_serves_projection_from_query() {
        let base = spawn_server().await;
        let response = reqwest::get(format!(
            "{base}/api/simulate?initialValue=0&monthlyContribution=0&interestRate=5&interestRateBasis=monthly&horizon=3&horizonUnit=months"
        ))
        .await
        .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-store")
        );

        let body: Value = response.json().await.expect("json body");
        let series = body["series"].as_array().expect("series array");
        assert_eq!(series.len(), 4);
        for snapshot in series {
            assert_json_approx(&snapshot["totalAmount"], 0.0);
        }
    }

    #[tokio::test]
    async fn http_simulate_post_and_error_paths() {
        let base = spawn_server().await;
        let client = reqwest::Client::new();

        let ok: Value = client
            .post(format!("{base}/api/simulate"))
            .json(&serde_json::json!({ "horizon": 1, "horizonUnit": "years" }))
            .send()
            .await
            .expect("request succeeds")
            .json()
            .await
            .expect("json body");
        assert_json_approx(&ok["summary"]["totalAmount"], 7_370.26);

        let bad = client
            .post(format!("{base}/api/simulate"))
            .json(&serde_json::json!({ "horizon": 0 }))
            .send()
            .await
            .expect("request succeeds");
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        let body: Value = bad.json().await.expect("json body");
        assert_eq!(body["error"], "horizon must be >= 1");

        let missing = client
            .get(format!("{base}/nope"))
            .send()
            .await
            .expect("request succeeds");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn http_analysis_without_key_returns_fallback_and_summary() {
        let base = spawn_server().await;
        let body: Value = reqwest::Client::new()
            .post(format!("{base}/api/analysis"))
            .json(&serde_json::json!({ "horizon": 1 }))
            .send()
            .await
            .expect("request succeeds")
            .json()
            .await
            .expect("json body");

        assert_eq!(body["analysis"], MISSING_KEY_MESSAGE);
        assert_eq!(body["narrativeConfigured"], false);
        assert_json_approx(&body["summary"]["totalAmount"], 7_370.26);
    }

    #[tokio::test]
    async fn http_index_serves_bundled_page() {
        let base = spawn_server().await;
        let response = reqwest::get(format!("{base}/")).await.expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);
        let text = response.text().await.expect("text body");
        assert!(text.contains("Simulador de Juros"));
        assert!(text.contains("/app.js"));
        assert!(text.contains(r#"<svg id="chart""#));

        let script = reqwest::get(format!("{base}/app.js"))
            .await
            .expect("request succeeds");
        assert_eq!(script.status(), StatusCode::OK);
        assert_eq!(
            script
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/javascript; charset=utf-8")
        );
        let text = script.text().await.expect("text body");
        assert!(text.contains("/api/simulate"));
        assert!(text.contains("/api/analysis"));
        assert!(text.contains("renderChart(result.chart)"));
    }
}
