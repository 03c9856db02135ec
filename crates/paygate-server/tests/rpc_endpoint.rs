use actix_web::{test, web, App};
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use paygate::{
    Dispatcher, GatewaySettings, LedgerConfig, PaymentOracle, SuiLedgerClient, TokenCodec,
};
use paygate_server::routes;
use paygate_server::state::AppState;

const SECRET: &[u8] = b"integration-test-secret-0123456789";

/// Mock Sui node whose newest transfer landed `age_secs` ago.
async fn ledger_with_transfer(age_secs: i64) -> MockServer {
    let server = MockServer::start().await;
    let ts = chrono::Utc::now().timestamp_millis() - age_secs * 1000;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "data": [{ "digest": "9xPaid", "timestampMs": ts.to_string() }],
                "nextCursor": null,
                "hasNextPage": false
            }
        })))
        .mount(&server)
        .await;
    server
}

fn make_state(ledger: Option<&MockServer>, metrics_token: Option<&str>) -> web::Data<AppState> {
    let oracle = ledger.map(|server| {
        let config = LedgerConfig {
            rpc_url: server.uri(),
            ..LedgerConfig::default()
        };
        PaymentOracle::with_config(SuiLedgerClient::new(&config).unwrap(), &config)
    });
    let dispatcher = Dispatcher::new(TokenCodec::new(SECRET), oracle, GatewaySettings::default());
    web::Data::new(AppState::from_parts(
        dispatcher,
        metrics_token.map(|t| t.as_bytes().to_vec()),
        false,
    ))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state)
                .app_data(web::PayloadConfig::new(64 * 1024))
                .configure(routes::configure),
        )
        .await
    };
}

/// POST a JSON-RPC body to `/` and return the status and decoded body.
macro_rules! post_rpc {
    ($app:expr, $body:expr $(,)?) => {{
        let req = test::TestRequest::post()
            .uri("/")
            .set_json($body)
            .to_request();
        let resp = test::call_service($app, req).await;
        let status = resp.status().as_u16();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

#[actix_rt::test]
async fn test_issue_token_after_recent_payment() {
    let ledger = ledger_with_transfer(1).await;
    let app = app!(make_state(Some(&ledger), None));

    let (status, body) = post_rpc!(&app, json!({"method": "issue_token", "params": [], "id": 1}));

    assert_eq!(status, 200);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 1);
    assert!(body["result"].as_str().is_some_and(|t| t.split('.').count() == 3));
    assert!(body.get("error").is_none());
}

#[actix_rt::test]
async fn test_issue_token_without_recent_payment_is_402() {
    let ledger = ledger_with_transfer(600).await;
    let app = app!(make_state(Some(&ledger), None));

    let (status, body) = post_rpc!(&app, json!({"method": "issue_token", "id": "a"}));

    assert_eq!(status, 402);
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(body["error"]["message"], "Payment not received");
    assert_eq!(body["id"], "a");
}

#[actix_rt::test]
async fn test_issue_token_without_ledger_is_500() {
    let app = app!(make_state(None, None));

    let (status, body) = post_rpc!(&app, json!({"method": "issue_token", "id": 2}));

    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(body["error"]["message"], "Ledger client unavailable");
}

#[actix_rt::test]
async fn test_token_unlocks_protected_methods() {
    let ledger = ledger_with_transfer(1).await;
    let app = app!(make_state(Some(&ledger), None));

    let (_, issued) = post_rpc!(&app, json!({"method": "issue_token", "id": 1}));
    let token = issued["result"].as_str().unwrap().to_string();

    // Credential in the dedicated member
    let (status, body) = post_rpc!(
        &app,
        json!({"method": "echo", "params": ["hello"], "token": token, "id": 2})
    );
    assert_eq!(status, 200);
    assert_eq!(body["result"], "Dear User, hello");

    // Credential as the first positional parameter
    let (status, body) = post_rpc!(
        &app,
        json!({"method": "echo", "params": [token, "again"], "id": 3})
    );
    assert_eq!(status, 200);
    assert_eq!(body["result"], "Dear User, again");

    let (status, body) =
        post_rpc!(&app, json!({"method": "get_time", "params": [token], "id": 4}));
    assert_eq!(status, 200);
    assert!(body["result"].as_str().unwrap().ends_with(" GMT"));
}

#[actix_rt::test]
async fn test_protected_method_without_token_is_401() {
    let app = app!(make_state(None, None));

    let (status, body) = post_rpc!(&app, json!({"method": "get_time", "params": [], "id": 5}));
    assert_eq!(status, 401);
    assert_eq!(body["error"]["message"], "No access: Missing token");

    let (status, body) = post_rpc!(
        &app,
        json!({"method": "echo", "params": ["not-a-token"], "id": 6})
    );
    assert_eq!(status, 401);
    assert_eq!(body["error"]["message"], "No access: Invalid or expired token");
}

#[actix_rt::test]
async fn test_token_from_another_process_is_rejected() {
    // Validly signed, but never registered with this server's store.
    let foreign = TokenCodec::new(SECRET)
        .issue(&paygate::TokenId::generate(), std::time::Duration::from_secs(60))
        .unwrap();
    let app = app!(make_state(None, None));

    let (status, body) =
        post_rpc!(&app, json!({"method": "echo", "params": ["x"], "token": foreign, "id": 7}));
    assert_eq!(status, 401);
    assert_eq!(body["error"]["message"], "No access: Invalid or expired token");
}

#[actix_rt::test]
async fn test_unknown_method_is_400() {
    let app = app!(make_state(None, None));

    let (status, body) = post_rpc!(&app, json!({"method": "transfer", "id": 8}));
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["id"], 8);
}

#[actix_rt::test]
async fn test_malformed_body_is_parse_error() {
    let app = app!(make_state(None, None));

    let req = test::TestRequest::post()
        .uri("/rpc")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["error"]["message"], "Parse error");
    assert_eq!(body["id"], Value::Null);
}

#[actix_rt::test]
async fn test_get_is_method_not_allowed() {
    let app = app!(make_state(None, None));

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 405);
    assert_eq!(resp.headers().get("allow").unwrap(), "POST");
    let body = test::read_body(resp).await;
    assert_eq!(
        body,
        "Method Not Allowed. Please use POST for JSON RPC calls.".as_bytes()
    );
}

#[actix_rt::test]
async fn test_health() {
    let app = app!(make_state(None, None));

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ledger"], "unavailable");
}

#[actix_rt::test]
async fn test_metrics_requires_bearer_token() {
    let app = app!(make_state(None, Some("scrape-me")));

    let req = test::TestRequest::get().uri("/metrics").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer wrong"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);

    let req = test::TestRequest::get()
        .uri("/metrics")
        .insert_header(("Authorization", "Bearer scrape-me"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
}

#[actix_rt::test]
async fn test_metrics_forbidden_without_token() {
    let app = app!(make_state(None, None));

    let req = test::TestRequest::get().uri("/metrics").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
}
