use crate::http_api;
use crate::metrics::SiteMetrics;
use crate::pages::{self, GatePage};
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, RawQuery, Request, State},
    http::{header::COOKIE, HeaderMap, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Form, Router,
};
use exchange_calculator::{CalculatorProfile, EarningsInput, PhaseSelection, SavingsInput};
use exchange_gate::{
    normalize_country, safe_next_path, unix_now, Gate, GateError, LoginAttempt, LoginAttempts,
    COUNTRY_HEADERS, GATE_PATH,
};
use exchange_protocol::{
    ApiResponse, CalculatorEndpoint, CalculatorKind, Capabilities, CapabilitiesServer,
    GateCapabilities, ResponseMeta, API_VERSION, CAPABILITIES_SCHEMA_VERSION,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only state shared by every request.
pub(crate) struct AppState {
    pub gate: Gate,
    pub profile: CalculatorProfile,
    pub metrics: SiteMetrics,
}

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/brands", get(brands_page))
        .route("/providers", get(providers_page))
        .route(GATE_PATH, get(gate_page))
        .route("/gate/login", post(gate_login))
        .route("/gate/logout", post(gate_logout))
        .route("/health", get(health))
        .route("/api/capabilities", get(capabilities))
        .route("/api/calculator/savings", get(savings_api))
        .route("/api/calculator/cost", get(cost_api))
        .route("/api/calculator/earnings", post(earnings_api))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate_interceptor,
        ))
        .with_state(state)
}

/// Edge check in front of every route: public paths pass, everything else needs a
/// live token or gets the same redirect.
async fn gate_interceptor(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.gate.is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let token = token_from_headers(&state.gate, request.headers());
    let access = state.gate.authorize_edge(token, unix_now()).await;
    if access.is_granted() {
        return next.run(request).await;
    }

    state.metrics.record_denial();
    http_api::redirect_to_gate(path_and_query(request.uri()))
}

/// Second check inside each protected handler, on the synchronous backend.
fn page_guard(state: &AppState, headers: &HeaderMap, uri: &Uri) -> Result<(), Response> {
    let token = token_from_headers(&state.gate, headers);
    if state.gate.authorize(token, unix_now()).is_granted() {
        return Ok(());
    }
    state.metrics.record_denial();
    Err(http_api::redirect_to_gate(path_and_query(uri)))
}

fn token_from_headers<'a>(gate: &Gate, headers: &'a HeaderMap) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| gate.token_from_cookie_header(Some(header)))
}

fn path_and_query(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
}

fn request_country(headers: &HeaderMap) -> Option<&str> {
    COUNTRY_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| normalize_country(value).is_some())
    })
}

fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn meta(state: &AppState) -> ResponseMeta {
    ResponseMeta {
        profile: Some(state.profile.name.clone()),
    }
}

fn ok_json<T: serde::Serialize>(state: &AppState, data: &T) -> Result<Response, StatusCode> {
    let response = ApiResponse::ok(data, meta(state)).map_err(|err| {
        log::error!("failed to serialize response: {err:#}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    http_api::build_response(StatusCode::OK, &response)
}

async fn home_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    if let Err(redirect) = page_guard(&state, &headers, &uri) {
        return redirect;
    }
    http_api::html_response(StatusCode::OK, pages::render_home(&state.profile))
}

async fn brands_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(query): RawQuery,
) -> Response {
    if let Err(redirect) = page_guard(&state, &headers, &uri) {
        return redirect;
    }
    let pairs = query_pairs(query.as_deref());
    let budget = first_value(&pairs, "budget")
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .unwrap_or(pages::DEFAULT_BUDGET_USD);
    let team_size = first_value(&pairs, "team_size").unwrap_or(pages::DEFAULT_TEAM_SIZE);
    let input = SavingsInput::new(budget, team_size);

    let savings = state.profile.brand_savings(&input);
    let cost = state.profile.cost_comparison(&input);
    http_api::html_response(
        StatusCode::OK,
        pages::render_brands(&state.profile, &input, &savings, &cost),
    )
}

async fn providers_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(query): RawQuery,
) -> Response {
    if let Err(redirect) = page_guard(&state, &headers, &uri) {
        return redirect;
    }
    let pairs = query_pairs(query.as_deref());
    let (variant, input) = earnings_form_input(&state.profile, &pairs);
    let estimate = state.profile.earnings(&variant, &input);
    http_api::html_response(
        StatusCode::OK,
        pages::render_providers(&state.profile, &input, &estimate),
    )
}

/// Providers form: `variant`, repeated `phase`, and one count per tier id. An empty
/// query shows the defaults.
fn earnings_form_input(
    profile: &CalculatorProfile,
    pairs: &[(String, String)],
) -> (String, EarningsInput) {
    let variant = first_value(pairs, "variant").unwrap_or_default().to_string();
    if pairs.is_empty() {
        let input = EarningsInput::new(
            pages::DEFAULT_PHASES.iter().copied(),
            pages::DEFAULT_CLIENT_COUNTS.iter().copied(),
        );
        return (variant, input);
    }

    let phases = pairs
        .iter()
        .filter(|(key, _)| key == "phase")
        .map(|(_, id)| id.as_str());
    let counts = profile.tiers.iter().filter_map(|tier| {
        let count = first_value(pairs, &tier.id)?.trim().parse::<u32>().ok()?;
        Some((tier.id.as_str(), count.clamp(tier.slider.min, tier.slider.max)))
    });
    (variant, EarningsInput::new(phases, counts))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    password: String,
    next: Option<String>,
    attempts: Option<String>,
}

async fn gate_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let pairs = query_pairs(query.as_deref());
    let next = safe_next_path(first_value(&pairs, "next"));

    let token = token_from_headers(&state.gate, &headers);
    if state.gate.authorize(token, unix_now()).is_granted() {
        return http_api::see_other(&next, None);
    }

    let page = GatePage {
        next: &next,
        error: None,
        attempts: LoginAttempts::default(),
    };
    http_api::html_response(StatusCode::OK, pages::render_gate(&page))
}

async fn gate_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let attempt = LoginAttempt {
        password: &form.password,
        next: form.next.as_deref(),
        country: request_country(&headers),
    };
    let attempts = LoginAttempts::from_form(form.attempts.as_deref());

    match state.gate.login(attempt, unix_now()) {
        Ok(success) => http_api::see_other(&success.redirect_to, Some(&success.set_cookie)),
        Err(err) => {
            let (status, attempts) = match err {
                GateError::InvalidPassword => (StatusCode::UNAUTHORIZED, attempts.record_failure()),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, attempts),
            };
            let next = safe_next_path(form.next.as_deref());
            let page = GatePage {
                next: &next,
                error: Some(err.public_message()),
                attempts,
            };
            http_api::html_response(status, pages::render_gate(&page))
        }
    }
}

async fn gate_logout(State(state): State<Arc<AppState>>) -> Response {
    http_api::see_other(GATE_PATH, Some(&state.gate.logout_cookie()))
}

async fn health() -> Result<Response, StatusCode> {
    let response = ApiResponse::ok(
        &serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }),
        ResponseMeta::default(),
    )
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    http_api::build_response(StatusCode::OK, &response)
}

pub(crate) fn capabilities_for(state: &AppState) -> Capabilities {
    let config = state.gate.config();
    Capabilities {
        schema_version: CAPABILITIES_SCHEMA_VERSION,
        api_version: API_VERSION.to_string(),
        server: CapabilitiesServer {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        profile: state.profile.name.clone(),
        calculators: vec![
            CalculatorEndpoint {
                kind: CalculatorKind::BrandSavings,
                method: "GET".to_string(),
                path: "/api/calculator/savings".to_string(),
                variants: Vec::new(),
            },
            CalculatorEndpoint {
                kind: CalculatorKind::CostComparison,
                method: "GET".to_string(),
                path: "/api/calculator/cost".to_string(),
                variants: Vec::new(),
            },
            CalculatorEndpoint {
                kind: CalculatorKind::ProviderEarnings,
                method: "POST".to_string(),
                path: "/api/calculator/earnings".to_string(),
                variants: state.profile.earnings.iter().map(|v| v.id.clone()).collect(),
            },
        ],
        gate: GateCapabilities {
            login_path: GATE_PATH.to_string(),
            cookie_name: config.cookie_name.clone(),
            ttl_seconds: config.ttl.as_secs(),
            configured: config.is_complete(),
        },
    }
}

async fn capabilities(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, StatusCode> {
    if let Err(redirect) = page_guard(&state, &headers, &uri) {
        return Ok(redirect);
    }
    ok_json(&state, &capabilities_for(&state))
}

#[derive(Debug, Deserialize)]
struct SavingsQuery {
    budget: f64,
    #[serde(default)]
    team_size: Option<String>,
}

impl SavingsQuery {
    fn into_input(self) -> SavingsInput {
        SavingsInput::new(self.budget, self.team_size.as_deref().unwrap_or_default())
    }
}

fn invalid_query(rejection: QueryRejection) -> Result<Response, StatusCode> {
    let response = http_api::error_response(
        "invalid_request",
        format!("Invalid query: {}", rejection.body_text()),
    );
    http_api::build_response(StatusCode::BAD_REQUEST, &response)
}

async fn savings_api(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    query: Result<Query<SavingsQuery>, QueryRejection>,
) -> Result<Response, StatusCode> {
    if let Err(redirect) = page_guard(&state, &headers, &uri) {
        return Ok(redirect);
    }
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return invalid_query(rejection),
    };
    state.metrics.record_calculation(&CalculatorKind::BrandSavings);
    ok_json(&state, &state.profile.brand_savings(&query.into_input()))
}

async fn cost_api(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    query: Result<Query<SavingsQuery>, QueryRejection>,
) -> Result<Response, StatusCode> {
    if let Err(redirect) = page_guard(&state, &headers, &uri) {
        return Ok(redirect);
    }
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return invalid_query(rejection),
    };
    state.metrics.record_calculation(&CalculatorKind::CostComparison);
    ok_json(&state, &state.profile.cost_comparison(&query.into_input()))
}

#[derive(Debug, Deserialize)]
struct EarningsRequest {
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    selected_phases: PhaseSelection,
    #[serde(default)]
    client_counts: BTreeMap<String, u32>,
}

async fn earnings_api(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Result<Response, StatusCode> {
    if let Err(redirect) = page_guard(&state, &headers, &uri) {
        return Ok(redirect);
    }
    let request: EarningsRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            let response =
                http_api::error_response("invalid_request", format!("Invalid JSON request: {err}"));
            return http_api::build_response(StatusCode::BAD_REQUEST, &response);
        }
    };
    let input = EarningsInput {
        selected_phases: request.selected_phases,
        client_counts: request.client_counts,
    };
    state.metrics.record_calculation(&CalculatorKind::ProviderEarnings);
    let estimate = state
        .profile
        .earnings(request.variant.as_deref().unwrap_or_default(), &input);
    ok_json(&state, &estimate)
}

async fn not_found() -> Response {
    http_api::html_response(StatusCode::NOT_FOUND, pages::render_not_found())
}
