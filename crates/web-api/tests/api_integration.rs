//! End-to-end tests driving the router with in-process requests.
//!
//! The brokerage and the platform are stood in for by wiremock servers; each
//! test reads credentials from its own environment variable names so tests
//! can run in parallel.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use squareoff_core::{AppConfig, Grouping, Mode};
use squareoff_web_api::{ApiServer, AppState};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Helpers
// =============================================================================

fn mock_document() -> Value {
    json!({
        "payload": {
            "data": [
                {
                    "trading_symbol": "NIFTY",
                    "trades": [
                        {
                            "trading_symbol": "NIFTY24DEC24000CE",
                            "quantity": -50,
                            "unbooked_pnl": 1200.5,
                            "booked_profit_loss": 0,
                            "greeks": { "delta": -0.42 }
                        },
                        {
                            "trading_symbol": "NIFTY24DEC23500PE",
                            "quantity": -50,
                            "unbooked_pnl": -300,
                            "booked_profit_loss": 50.25
                        }
                    ]
                }
            ]
        }
    })
}

fn write_mock_file(doc: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(doc.as_bytes()).unwrap();
    file
}

/// Config pointing at the given brokerage URL, with credentials read from
/// `{env_prefix}_KEY` / `{env_prefix}_TOKEN`.
fn test_config(mock_file: &NamedTempFile, kite_url: &str, env_prefix: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.positions.mock_file = mock_file.path().to_string_lossy().into_owned();
    config.kite.api_url = kite_url.to_string();
    config.kite.api_key_env = format!("{env_prefix}_KEY");
    config.kite.access_token_env = format!("{env_prefix}_TOKEN");
    config
}

fn set_credentials(env_prefix: &str) {
    std::env::set_var(format!("{env_prefix}_KEY"), "testkey");
    std::env::set_var(format!("{env_prefix}_TOKEN"), "testtoken");
}

fn router(config: AppConfig) -> Router {
    ApiServer::new(AppState::new(config).unwrap()).router()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method("POST").uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn position_row(symbol: &str, quantity: i64, pnl: f64) -> Value {
    json!({
        "tradingsymbol": symbol,
        "exchange": "NFO",
        "product": "NRML",
        "quantity": quantity,
        "pnl": pnl
    })
}

async fn mount_positions(server: &MockServer, net: Vec<Value>, day: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/portfolio/positions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "net": net, "day": day }
        })))
        .mount(server)
        .await;
}

// =============================================================================
// Positions
// =============================================================================

#[tokio::test]
async fn test_demo_positions_groups_mock_record() {
    let mock_file = write_mock_file(&mock_document().to_string());
    let app = router(test_config(&mock_file, "http://127.0.0.1:1", "IT_DEMO"));

    let (status, body) = send(&app, get("/api/positions")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "demo");
    let underlyings = body["underlyings"].as_array().unwrap();
    assert_eq!(underlyings.len(), 1);
    assert_eq!(underlyings[0]["name"], "NIFTY");

    let legs = underlyings[0]["legs"].as_array().unwrap();
    assert_eq!(legs.len(), 2);
    assert_eq!(legs[0]["pnl"], 1200.5);
    assert_eq!(legs[0]["delta"], -0.42);
    assert_eq!(legs[1]["pnl"], -249.75);
    assert_eq!(underlyings[0]["total_pnl"], 950.75);

    let pct = underlyings[0]["total_pnl_pct"].as_f64().unwrap();
    assert!((0.0..=5.0).contains(&pct));
}

#[tokio::test]
async fn test_malformed_mock_file_is_structured_error() {
    let mock_file = write_mock_file(r#"{"payload": {"data": [{"trading_symbol": "NIFTY"}]}}"#);
    let app = router(test_config(&mock_file, "http://127.0.0.1:1", "IT_MALFORMED"));

    let (status, body) = send(&app, get("/api/positions")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "mock_data");
    assert!(body["message"].as_str().unwrap().contains("payload.data[0].trades"));
}

#[tokio::test]
async fn test_live_positions_grouped_by_prefix() {
    let kite = MockServer::start().await;
    mount_positions(
        &kite,
        vec![
            position_row("NIFTY24DEC24000CE", -50, 100.1),
            position_row("BANKNIFTY24DEC51000PE", 15, -20.0),
            position_row("NIFTY24DEC23500PE", -50, 0.2),
        ],
        vec![],
    )
    .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_LIVE");
    let app = router(test_config(&mock_file, &kite.uri(), "IT_LIVE"));

    let (status, body) = send(&app, get("/api/positions?mode=live")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "live");
    let underlyings = body["underlyings"].as_array().unwrap();
    assert_eq!(underlyings.len(), 2);
    assert_eq!(underlyings[0]["name"], "NIFTY");
    assert_eq!(underlyings[0]["legs"].as_array().unwrap().len(), 2);
    assert_eq!(underlyings[0]["total_pnl"], 100.3);
    assert_eq!(underlyings[0]["total_pnl_pct"], 0.0);
    assert_eq!(underlyings[1]["name"], "BANKNIFTY");
}

#[tokio::test]
async fn test_invalid_mode_query_is_bad_request() {
    let mock_file = write_mock_file(&mock_document().to_string());
    let app = router(test_config(&mock_file, "http://127.0.0.1:1", "IT_BADMODE"));

    let (status, body) = send(&app, get("/api/positions?mode=paper")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_live_positions_grouped_by_instrument_name() {
    let kite = MockServer::start().await;
    mount_positions(
        &kite,
        vec![
            position_row("M&M24DECFUT", 100, 10.0),
            position_row("NIFTY24DEC24000CE", -50, 5.0),
        ],
        vec![],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/instruments/NFO"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "tradingsymbol,name,instrument_type,segment,exchange\n\
             M&M24DECFUT,M&M,FUT,NFO-FUT,NFO\n\
             NIFTY24DEC24000CE,NIFTY,CE,NFO-OPT,NFO\n",
        ))
        .expect(1)
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_INSTRUMENTS");
    let mut config = test_config(&mock_file, &kite.uri(), "IT_INSTRUMENTS");
    config.positions.grouping = Grouping::Instruments;
    let app = router(config);

    let (status, body) = send(&app, get("/api/positions?mode=live")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["underlyings"][0]["name"], "M&M");
    assert_eq!(body["underlyings"][1]["name"], "NIFTY");

    // The dump is downloaded once and reused.
    let (status, body) = send(&app, get("/api/positions?mode=live")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["underlyings"][0]["name"], "M&M");
}

#[tokio::test]
async fn test_failed_instrument_download_groups_by_prefix_and_retries() {
    let kite = MockServer::start().await;
    mount_positions(
        &kite,
        vec![position_row("NIFTY24DEC24000CE", -50, 5.0)],
        vec![],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/instruments/NFO"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_INSTRUMENTS_DOWN");
    let mut config = test_config(&mock_file, &kite.uri(), "IT_INSTRUMENTS_DOWN");
    config.positions.grouping = Grouping::Instruments;
    let app = router(config);

    for _ in 0..2 {
        let (status, body) = send(&app, get("/api/positions?mode=live")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "live");
        assert_eq!(body["underlyings"][0]["name"], "NIFTY");
    }
}

#[tokio::test]
async fn test_slow_brokerage_hits_request_timeout() {
    let kite = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/portfolio/positions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "data": { "net": [], "day": [] } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_REQ_TIMEOUT");
    let mut config = test_config(&mock_file, &kite.uri(), "IT_REQ_TIMEOUT");
    config.server.request_timeout_secs = 1;
    let app = router(config);

    let (status, _) = send(&app, get("/api/positions?mode=live")).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}

// =============================================================================
// Mode Flag
// =============================================================================

#[tokio::test]
async fn test_toggle_demo_twice_restores_mode() {
    let mock_file = write_mock_file(&mock_document().to_string());
    let app = router(test_config(&mock_file, "http://127.0.0.1:1", "IT_TOGGLE"));

    let (status, body) = send(&app, post("/api/toggle-demo", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "demo": false }));

    let (_, body) = send(&app, get("/health")).await;
    assert_eq!(body["mode"], "live");

    let (_, body) = send(&app, post("/api/toggle-demo", None)).await;
    assert_eq!(body, json!({ "demo": true }));
}

#[tokio::test]
async fn test_toggle_demo_explicit_value_is_idempotent() {
    let mock_file = write_mock_file(&mock_document().to_string());
    let mut config = test_config(&mock_file, "http://127.0.0.1:1", "IT_SETDEMO");
    config.positions.default_mode = Mode::Live;
    let app = router(config);

    let (_, body) = send(&app, post("/api/toggle-demo", Some(json!({ "demo": true })))).await;
    assert_eq!(body, json!({ "demo": true }));

    let (_, body) = send(&app, post("/api/toggle-demo", Some(json!({ "demo": true })))).await;
    assert_eq!(body, json!({ "demo": true }));
}

// =============================================================================
// Exit
// =============================================================================

#[tokio::test]
async fn test_exit_with_no_matching_legs_succeeds_empty() {
    let kite = MockServer::start().await;
    mount_positions(
        &kite,
        vec![
            position_row("BANKNIFTY24DEC51000PE", 15, 0.0),
            position_row("NIFTY24DEC24000CE", 0, 10.0),
        ],
        vec![],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/orders/regular"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_EXIT_NONE");
    let app = router(test_config(&mock_file, &kite.uri(), "IT_EXIT_NONE"));

    let (status, body) = send(&app, post("/api/exit?underlying=NIFTY", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["exited"], json!([]));
    assert_eq!(body["results"], json!([]));
}

#[tokio::test]
async fn test_exit_places_offsetting_orders_from_body() {
    let kite = MockServer::start().await;
    mount_positions(
        &kite,
        vec![position_row("NIFTY24DEC24000CE", -50, 0.0)],
        vec![
            position_row("NIFTY24DEC24000CE", -25, 0.0),
            position_row("NIFTY24DEC23500PE", 75, 0.0),
        ],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/orders/regular"))
        .and(body_string_contains("tradingsymbol=NIFTY24DEC24000CE"))
        .and(body_string_contains("transaction_type=BUY"))
        .and(body_string_contains("quantity=50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "order_id": "1001" }
        })))
        .expect(1)
        .mount(&kite)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/regular"))
        .and(body_string_contains("tradingsymbol=NIFTY24DEC23500PE"))
        .and(body_string_contains("transaction_type=SELL"))
        .and(body_string_contains("quantity=75"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "order_id": "1002" }
        })))
        .expect(1)
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_EXIT_BODY");
    let app = router(test_config(&mock_file, &kite.uri(), "IT_EXIT_BODY"));

    let (status, body) =
        send(&app, post("/api/exit", Some(json!({ "underlying": "NIFTY" })))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["exited"], json!(["1001", "1002"]));
    assert_eq!(body["results"][0]["status"], "placed");
    assert_eq!(body["results"][1]["transactionType"], "SELL");
}

#[tokio::test]
async fn test_exit_partial_failure_reports_per_leg_status() {
    let kite = MockServer::start().await;
    mount_positions(
        &kite,
        vec![
            position_row("NIFTY24DEC24000CE", -50, 0.0),
            position_row("NIFTY24DEC24100CE", -50, 0.0),
        ],
        vec![],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/orders/regular"))
        .and(body_string_contains("tradingsymbol=NIFTY24DEC24100CE"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "message": "Markets are closed right now.",
            "error_type": "InputException"
        })))
        .with_priority(1)
        .mount(&kite)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/regular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "order_id": "2001" }
        })))
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_EXIT_PARTIAL");
    let app = router(test_config(&mock_file, &kite.uri(), "IT_EXIT_PARTIAL"));

    let (status, body) = send(&app, post("/api/exit?underlying=NIFTY", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["exited"], json!(["2001"]));
    assert_eq!(body["results"][1]["status"], "failed");
    assert!(body["results"][1]["error"]
        .as_str()
        .unwrap()
        .contains("Markets are closed"));
}

#[tokio::test]
async fn test_exit_expired_session_returns_login_url() {
    let kite = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/portfolio/positions"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": "error",
            "message": "Incorrect `api_key` or `access_token`.",
            "error_type": "TokenException"
        })))
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_EXIT_AUTH");
    let app = router(test_config(&mock_file, &kite.uri(), "IT_EXIT_AUTH"));

    let (status, body) = send(&app, post("/api/exit?underlying=NIFTY", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "auth_expired");
    assert_eq!(
        body["loginUrl"],
        "https://kite.zerodha.com/connect/login?api_key=testkey&v=3"
    );
}

#[tokio::test]
async fn test_exit_without_underlying_is_bad_request() {
    let mock_file = write_mock_file(&mock_document().to_string());
    let app = router(test_config(&mock_file, "http://127.0.0.1:1", "IT_EXIT_MISSING"));

    let (status, body) = send(&app, post("/api/exit", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = send(&app, post("/api/exit", Some(json!({ "underlying": "  " })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_exit_blank_query_falls_back_to_body() {
    let kite = MockServer::start().await;
    mount_positions(&kite, vec![position_row("NIFTY24DEC24000CE", -50, 0.0)], vec![]).await;
    Mock::given(method("POST"))
        .and(path("/orders/regular"))
        .and(body_string_contains("tradingsymbol=NIFTY24DEC24000CE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "order_id": "3001" }
        })))
        .expect(1)
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_EXIT_BLANK_QUERY");
    let app = router(test_config(&mock_file, &kite.uri(), "IT_EXIT_BLANK_QUERY"));

    let (status, body) = send(
        &app,
        post("/api/exit?underlying=", Some(json!({ "underlying": "NIFTY" }))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exited"], json!(["3001"]));
}

#[tokio::test]
async fn test_exit_is_not_cut_off_by_request_timeout() {
    let kite = MockServer::start().await;
    mount_positions(&kite, vec![position_row("NIFTY24DEC24000CE", -50, 0.0)], vec![]).await;
    Mock::given(method("POST"))
        .and(path("/orders/regular"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "success", "data": { "order_id": "4001" } }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_EXIT_SLOW");
    let mut config = test_config(&mock_file, &kite.uri(), "IT_EXIT_SLOW");
    config.server.request_timeout_secs = 1;
    let app = router(config);

    let (status, body) = send(&app, post("/api/exit?underlying=NIFTY", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exited"], json!(["4001"]));
}

#[tokio::test]
async fn test_exit_without_credentials_fails_before_brokerage_call() {
    let kite = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    let app = router(test_config(&mock_file, &kite.uri(), "IT_EXIT_NOCREDS"));

    let (status, body) = send(&app, post("/api/exit?underlying=NIFTY", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "missing_credentials");
    assert!(body["message"].as_str().unwrap().contains("IT_EXIT_NOCREDS_KEY"));
}

// =============================================================================
// Session and Login Probes
// =============================================================================

#[tokio::test]
async fn test_session_valid_profile() {
    let kite = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "user_id": "AB1234", "user_name": "Test User" }
        })))
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_SESSION");
    let app = router(test_config(&mock_file, &kite.uri(), "IT_SESSION"));

    let (status, body) = send(&app, get("/api/session")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "valid": true, "userId": "AB1234", "userName": "Test User" })
    );
}

#[tokio::test]
async fn test_session_expired_token() {
    let kite = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": "error",
            "message": "Token is invalid or has expired.",
            "error_type": "TokenException"
        })))
        .mount(&kite)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    set_credentials("IT_SESSION_EXPIRED");
    let app = router(test_config(&mock_file, &kite.uri(), "IT_SESSION_EXPIRED"));

    let (status, body) = send(&app, get("/api/session")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Token is invalid or has expired.");
    assert!(body["loginUrl"].as_str().unwrap().contains("api_key=testkey"));
}

#[tokio::test]
async fn test_check_login_against_platform() {
    let platform = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/positions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><title>Positions | Sensibull</title></html>"),
        )
        .mount(&platform)
        .await;

    let mock_file = write_mock_file(&mock_document().to_string());
    let mut config = test_config(&mock_file, "http://127.0.0.1:1", "IT_CHECK_LOGIN");
    config.platform.base_url = platform.uri();
    let app = router(config);

    let (status, body) = send(&app, get("/check-login")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "loggedIn": true }));
}

#[tokio::test]
async fn test_check_login_unreachable_platform() {
    let mock_file = write_mock_file(&mock_document().to_string());
    let mut config = test_config(&mock_file, "http://127.0.0.1:1", "IT_CHECK_DOWN");
    config.platform.base_url = "http://127.0.0.1:1".to_string();
    let app = router(config);

    let (status, body) = send(&app, get("/check-login")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "loggedIn": false, "message": "Internal Server Error" })
    );
}
