use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use squareoff_core::{aggregate_live, aggregate_mock, load_mock_file, Mode, Underlying};
use squareoff_kite::{ExitExecutor, KiteError, LegOutcome};
use squareoff_sensibull::LoginStatus;

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PositionsQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub underlyings: Vec<Underlying>,
    pub mode: Mode,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    pub demo: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub demo: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExitRequest {
    pub underlying: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExitResponse {
    pub success: bool,
    pub message: String,
    pub exited: Vec<String>,
    pub results: Vec<LegOutcome>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: Mode,
}

/// Parses an optional JSON body; an empty body yields `T::default()`.
fn parse_optional_body<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: Default + serde::de::DeserializeOwned,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// Probes the trading platform's positions page.
///
/// Any probe failure answers 500 `{loggedIn: false, message: "Internal Server Error"}`.
pub async fn check_login(State(state): State<AppState>) -> (StatusCode, Json<LoginStatus>) {
    match state.sensibull().check_login().await {
        Ok(status) => {
            tracing::info!(logged_in = status.logged_in, "Checked platform login");
            (StatusCode::OK, Json(status))
        }
        Err(e) => {
            tracing::error!(error = %e, "Platform login check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LoginStatus {
                    logged_in: false,
                    message: Some("Internal Server Error".to_string()),
                }),
            )
        }
    }
}

/// Returns the aggregated positions for the requested or current mode.
///
/// # Errors
/// Returns `ApiError::MockData` for a malformed mock file, or a brokerage
/// error in live mode.
pub async fn get_positions(
    State(state): State<AppState>,
    Query(query): Query<PositionsQuery>,
) -> Result<Json<PositionsResponse>, ApiError> {
    let mode = match query.mode.as_deref() {
        Some(raw) => raw.parse::<Mode>().map_err(ApiError::BadRequest)?,
        None => state.mode().get(),
    };

    let underlyings = match mode {
        Mode::Demo => {
            let doc = load_mock_file(&state.config().positions.mock_file)?;
            aggregate_mock(&doc)?
        }
        Mode::Live => {
            let client = state.kite_client()?;
            let book = client
                .get_positions()
                .await
                .map_err(|e| ApiError::from_kite(e, Some(client.login_url())))?;
            let resolver = state.resolver(&client).await;
            aggregate_live(&book.net, resolver)
        }
    };

    tracing::info!(%mode, underlyings = underlyings.len(), "Served positions");

    Ok(Json(PositionsResponse { underlyings, mode }))
}

/// Sets the demo flag from `{demo}`, or flips it when the body is empty or
/// omits the field.
///
/// # Errors
/// Returns `ApiError::BadRequest` if the body is not valid JSON.
pub async fn toggle_demo(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ToggleResponse>, ApiError> {
    let request: ToggleRequest = parse_optional_body(&body)?;

    let mode = match request.demo {
        Some(demo) => {
            let mode = Mode::from_demo_flag(demo);
            state.mode().set(mode);
            mode
        }
        None => state.mode().toggle(),
    };

    tracing::info!(%mode, "Mode changed");

    Ok(Json(ToggleResponse {
        demo: mode.is_demo(),
    }))
}

/// Squares off every open leg of an underlying named in the query or body.
/// A non-blank query value wins over the body.
///
/// This route is not subject to the router's request timeout; each brokerage
/// call is bounded by the client timeout instead, so a slow square-off still
/// reports the order ids it placed.
///
/// # Errors
/// Returns `ApiError::BadRequest` without an underlying,
/// `ApiError::MissingCredentials` before any brokerage call, or
/// `ApiError::AuthExpired` with a login link if the session is rejected.
pub async fn exit_positions(
    State(state): State<AppState>,
    Query(query): Query<ExitRequest>,
    body: Bytes,
) -> Result<Json<ExitResponse>, ApiError> {
    let from_query = query
        .underlying
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let underlying = match from_query {
        Some(u) => Some(u),
        None => parse_optional_body::<ExitRequest>(&body)?
            .underlying
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty()),
    }
    .ok_or_else(|| ApiError::BadRequest("underlying is required".to_string()))?;

    let client = state.kite_client()?;
    let login_url = client.login_url();
    let executor = ExitExecutor::new(client);

    let report = executor
        .exit_underlying(&underlying)
        .await
        .map_err(|e| ApiError::from_kite(e, Some(login_url)))?;

    tracing::info!(
        underlying = %report.underlying,
        placed = report.exited().len(),
        failed = report.failed_count(),
        "Exit completed"
    );

    Ok(Json(ExitResponse {
        success: true,
        message: report.message(),
        exited: report.exited(),
        results: report.results,
    }))
}

/// Checks the brokerage session with the profile endpoint.
///
/// # Errors
/// Returns `ApiError::Upstream` if the brokerage fails for reasons other than
/// the session itself.
pub async fn get_session(State(state): State<AppState>) -> Result<Json<SessionResponse>, ApiError> {
    let client = match state.kite_client() {
        Ok(client) => client,
        Err(e) => {
            return Ok(Json(SessionResponse {
                valid: false,
                user_id: None,
                user_name: None,
                message: Some(e.to_string()),
                login_url: None,
            }))
        }
    };

    match client.get_profile().await {
        Ok(profile) => Ok(Json(SessionResponse {
            valid: true,
            user_id: Some(profile.user_id),
            user_name: profile.user_name,
            message: None,
            login_url: None,
        })),
        Err(KiteError::Authentication(message)) => Ok(Json(SessionResponse {
            valid: false,
            user_id: None,
            user_name: None,
            message: Some(message),
            login_url: Some(client.login_url()),
        })),
        Err(e) => Err(ApiError::from_kite(e, Some(client.login_url()))),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.mode().get(),
    })
}
