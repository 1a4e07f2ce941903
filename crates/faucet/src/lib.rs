//! Xenium faucet: hands out small random amounts of coin to visitor
//! addresses, once per address per cooldown window.
//!
//! - Claim pipeline with per-address serialization
//! - Write-ahead send journal and reconciliation
//! - Cached wallet/network status
//! - HTML pages and Prometheus metrics

pub mod amount;
pub mod api;
pub mod captcha;
pub mod config;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod reconcile;
pub mod service;
pub mod status;
pub mod validation;
pub mod views;
pub mod wallet;

pub use api::{router, AppState};
pub use captcha::{CaptchaVerifier, RecaptchaVerifier};
pub use config::FaucetConfig;
pub use error::{FaucetError, FaucetResult};
pub use reconcile::{ReconcileReport, Reconciler};
pub use service::{ClaimOutcome, FaucetService};
pub use status::{status_channel, StatusHandle, StatusPoller, WalletStatusSnapshot};
pub use validation::{ClaimForm, Rejection};
pub use wallet::{WalletApiClient, WalletGateway};
