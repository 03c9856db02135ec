use std::time::Instant;

use actix_web::http::{header, Method, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::metrics;
use crate::state::AppState;

const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed. Please use POST for JSON RPC calls.";

/// POST on any path - JSON-RPC entry point. Other verbs get 405.
pub async fn rpc_entry(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    if req.method() != Method::POST {
        tracing::debug!(method = %req.method(), path = req.path(), "non-POST request refused");
        return HttpResponse::MethodNotAllowed()
            .insert_header((header::ALLOW, "POST"))
            .content_type("text/plain; charset=utf-8")
            .body(METHOD_NOT_ALLOWED_BODY);
    }

    let started = Instant::now();
    let reply = state.dispatcher.handle_body(&body).await;
    metrics::record_reply(&reply, started.elapsed());

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(&reply.body)
}

/// GET /health - Health check endpoint
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "paygate-server",
        "version": env!("CARGO_PKG_VERSION"),
        "ledger": if state.dispatcher.has_ledger() { "configured" } else { "unavailable" },
    }))
}

/// Constant-time byte comparison that does not leak input lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    Sha256::digest(a).ct_eq(&Sha256::digest(b)).into()
}

/// GET /metrics - Prometheus metrics, bearer-gated unless explicitly public
pub async fn metrics(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| constant_time_eq(t.as_bytes(), token))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None if !state.public_metrics => {
            return HttpResponse::Forbidden().json(serde_json::json!({
                "error": "forbidden",
                "message": "Set METRICS_TOKEN or PAYGATE_PUBLIC_METRICS=true to access /metrics"
            }));
        }
        None => {}
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics))
        .default_service(web::to(rpc_entry));
}
