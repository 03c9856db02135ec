use std::sync::LazyLock;
use std::time::Duration;

use paygate::RpcReply;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Process-local registry; everything below is registered on first use.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(|| {
    let registry = Registry::new();
    let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
        Box::new(RPC_REQUESTS.clone()),
        Box::new(TOKENS_ISSUED.clone()),
        Box::new(RPC_REJECTIONS.clone()),
        Box::new(RPC_DURATION.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            tracing::error!("Failed to register metric: {}", e);
        }
    }
    registry
});

pub static RPC_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("paygate_rpc_requests_total", "Total JSON-RPC calls"),
        &["method", "status"],
    )
    .expect("valid metric definition")
});

pub static TOKENS_ISSUED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("paygate_tokens_issued_total", "Access tokens issued")
        .expect("valid metric definition")
});

pub static RPC_REJECTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("paygate_rpc_rejections_total", "Rejected calls by reason"),
        &["reason"],
    )
    .expect("valid metric definition")
});

pub static RPC_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new("paygate_rpc_duration_seconds", "Call latency in seconds")
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method"],
    )
    .expect("valid metric definition")
});

/// Count one dispatched call.
pub fn record_reply(reply: &RpcReply, elapsed: Duration) {
    LazyLock::force(&REGISTRY);

    let status = reply.status.to_string();
    RPC_REQUESTS
        .with_label_values(&[reply.method, status.as_str()])
        .inc();
    RPC_DURATION
        .with_label_values(&[reply.method])
        .observe(elapsed.as_secs_f64());

    match reply.reason {
        Some(reason) => RPC_REJECTIONS.with_label_values(&[reason]).inc(),
        None if reply.method == paygate::constants::methods::ISSUE_TOKEN => TOKENS_ISSUED.inc(),
        None => {}
    }
}

pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
