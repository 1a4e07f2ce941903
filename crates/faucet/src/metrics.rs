//! Prometheus metrics for the faucet

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    pub static ref CLAIMS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "faucet_claims_total",
        "Claims handled, by outcome",
        &["outcome"] // sent | invalid | captcha | balance | cooldown | error
    )
    .unwrap();

    pub static ref COINS_SENT_ATOMIC_TOTAL: IntCounter = register_int_counter!(
        "faucet_coins_sent_atomic_total",
        "Atomic units sent to claimants"
    )
    .unwrap();

    pub static ref STATUS_POLL_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "faucet_status_poll_failures_total",
        "Status poll cycles that failed"
    )
    .unwrap();

    pub static ref WALLET_UNLOCKED_BALANCE: IntGauge = register_int_gauge!(
        "faucet_wallet_unlocked_balance",
        "Unlocked wallet balance in atomic units at the last poll"
    )
    .unwrap();

    pub static ref PENDING_SENDS: IntGauge = register_int_gauge!(
        "faucet_pending_sends",
        "Send journal entries not yet reflected in the ledgers"
    )
    .unwrap();
}

pub fn record_claim_outcome(outcome: &str) {
    CLAIMS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Render every registered metric in the text exposition format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
