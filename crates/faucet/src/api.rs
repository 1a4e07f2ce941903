//! HTTP API for faucet service

use crate::error::FaucetResult;
use crate::metrics;
use crate::service::{ClaimOutcome, FaucetService};
use crate::status::StatusHandle;
use crate::validation::ClaimForm;
use crate::views::PageContext;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use xenium_storage::StorageError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FaucetService>,
    pub status: StatusHandle,
}

impl AppState {
    pub fn new(service: Arc<FaucetService>, status: StatusHandle) -> Self {
        Self { service, status }
    }

    /// Render with the current snapshot
    fn render<F>(&self, page: F) -> String
    where
        F: FnOnce(&PageContext<'_>) -> String,
    {
        let snapshot = self.status.current();
        let context = PageContext {
            config: self.service.config(),
            status: &snapshot,
            faucet_address: self.service.faucet_address(),
        };
        page(&context)
    }
}

pub fn router(state: AppState) -> Router {
    let cors_enabled = state.service.config().server.cors_enabled;

    let mut app = Router::new()
        .route("/", get(index_handler))
        .route("/about", get(about_handler))
        .route("/claimCoins", post(claim_handler))
        .route("/cooldowns", get(cooldowns_handler))
        .route("/admin", get(admin_handler))
        .route("/admin/journal/:id/resolve", post(resolve_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.render(|page| page.index()))
}

pub async fn about_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.render(|page| page.about()))
}

/// Claim handler. Policy outcomes render with 200, downstream failures with
/// the error's status code.
pub async fn claim_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let form = parse_claim_body(&headers, &body);
    let remote_ip = connect_info.map(|ConnectInfo(addr)| addr.ip());

    match state.service.claim(form, remote_ip).await {
        Ok(outcome) => {
            let page = state.render(|page| match &outcome {
                ClaimOutcome::Rejected(reason) => page.claim_rejected(reason),
                ClaimOutcome::CaptchaFailed => page.captcha_failed(),
                ClaimOutcome::InsufficientBalance { would_send } => page.not_enough_balance(*would_send),
                ClaimOutcome::OnCooldown { next_eligible_at } => page.already_claimed(*next_eligible_at),
                ClaimOutcome::Sent {
                    address,
                    amount,
                    tx_hash,
                } => page.coins_sent(address, *amount, tx_hash),
            });
            Html(page).into_response()
        }
        Err(e) => {
            error!("Claim failed: {}", e);
            let page = state.render(|page| page.error(e.user_message()));
            (e.status_code(), Html(page)).into_response()
        }
    }
}

/// JSON when the client says so, URL-encoded form otherwise. An empty body
/// is `None`; an unparseable JSON body is a form without an address.
pub fn parse_claim_body(headers: &HeaderMap, body: &[u8]) -> Option<ClaimForm> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        return Some(serde_json::from_slice(body).unwrap_or_else(|e| {
            warn!("Unparseable JSON claim body: {}", e);
            ClaimForm::default()
        }));
    }

    let mut form = ClaimForm::default();
    for (key, value) in url::form_urlencoded::parse(body) {
        match key.as_ref() {
            "address" => form.address = Some(value.into_owned()),
            "g-recaptcha-response" => form.captcha_response = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(form)
}

pub async fn cooldowns_handler(State(state): State<AppState>) -> FaucetResult<Html<String>> {
    let records = state.service.ledgers().claims.list()?;
    Ok(Html(state.render(|page| page.cooldowns(&records))))
}

pub async fn admin_handler(State(state): State<AppState>, headers: HeaderMap) -> FaucetResult<Response> {
    if let Some(denied) = admin_denied(&state, &headers) {
        return Ok(denied);
    }

    let ledgers = state.service.ledgers();
    let claims = ledgers.claims.list()?;
    let transactions = ledgers.transactions.list()?;
    let journal = ledgers.journal.entries()?;
    Ok(Html(state.render(|page| page.admin(&claims, &transactions, &journal))).into_response())
}

/// Clear an unresolved send journal entry once the operator has checked the
/// wallet. The address keeps its claim record and cooldown.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> FaucetResult<Response> {
    if let Some(denied) = admin_denied(&state, &headers) {
        return Ok(denied);
    }

    let journal = &state.service.ledgers().journal;
    match journal.resolve(id).await {
        Ok(true) => {
            metrics::PENDING_SENDS.set(journal.len() as i64);
            Ok(Redirect::to("/admin").into_response())
        }
        Ok(false) => Ok((StatusCode::CONFLICT, "Journal entry is not unresolved").into_response()),
        Err(StorageError::NotFound(_)) => Ok((StatusCode::NOT_FOUND, "No such journal entry").into_response()),
        Err(e) => Err(e.into()),
    }
}

/// The response to send instead of an admin page, if any
fn admin_denied(state: &AppState, headers: &HeaderMap) -> Option<Response> {
    let admin = &state.service.config().admin;
    let password = match &admin.password {
        Some(password) => password,
        None => return Some((StatusCode::FORBIDDEN, "Admin page is disabled").into_response()),
    };

    if basic_auth_matches(headers, &admin.username, password) {
        return None;
    }
    let mut response = (StatusCode::UNAUTHORIZED, "Authentication required").into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"faucet admin\""),
    );
    Some(response)
}

fn basic_auth_matches(headers: &HeaderMap, username: &str, password: &str) -> bool {
    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok());

    match credentials.as_deref().and_then(|c| c.split_once(':')) {
        Some((user, pass)) => user == username && pass == password,
        None => false,
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    metrics::PENDING_SENDS.set(state.service.ledgers().journal.len() as i64);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_text(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn test_parse_form_body() {
        let form = parse_claim_body(&HeaderMap::new(), b"address=XNU%20abc&g-recaptcha-response=tok").unwrap();
        assert_eq!(form.address.as_deref(), Some("XNU abc"));
        assert_eq!(form.captcha_response.as_deref(), Some("tok"));
    }

    #[test]
    fn test_parse_json_body() {
        let form = parse_claim_body(&json_headers(), br#"{"address": "XNUabc"}"#).unwrap();
        assert_eq!(form.address.as_deref(), Some("XNUabc"));

        let broken = parse_claim_body(&json_headers(), b"{not json").unwrap();
        assert!(broken.address.is_none());
    }

    #[test]
    fn test_empty_body_is_none() {
        assert!(parse_claim_body(&HeaderMap::new(), b"").is_none());
        assert!(parse_claim_body(&json_headers(), b"  \n").is_none());
    }

    #[test]
    fn test_basic_auth() {
        let mut headers = HeaderMap::new();
        assert!(!basic_auth_matches(&headers, "admin", "secret"));

        let token = format!("Basic {}", STANDARD.encode("admin:secret"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&token).unwrap());
        assert!(basic_auth_matches(&headers, "admin", "secret"));
        assert!(!basic_auth_matches(&headers, "admin", "other"));
    }
}
