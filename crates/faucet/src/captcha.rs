//! reCAPTCHA verification

use crate::config::CaptchaConfig;
use crate::error::{FaucetError, FaucetResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// `Ok(false)` when the token is missing or rejected; `Err` only when the
    /// verification service itself failed.
    async fn verify(&self, token: Option<&str>, remote_ip: Option<IpAddr>) -> FaucetResult<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Google `siteverify` client
pub struct RecaptchaVerifier {
    secret: String,
    verify_url: String,
    client: reqwest::Client,
}

impl RecaptchaVerifier {
    pub fn new(config: &CaptchaConfig) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FaucetError::Internal(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            secret: config.secret_key.clone(),
            verify_url: config.verify_url.clone(),
            client,
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: Option<&str>, remote_ip: Option<IpAddr>) -> FaucetResult<bool> {
        let token = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => return Ok(false),
        };

        let mut form = vec![("secret", self.secret.clone()), ("response", token.to_string())];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip.to_string()));
        }

        let response: SiteVerifyResponse = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| FaucetError::Captcha(format!("Request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| FaucetError::Captcha(e.to_string()))?
            .json()
            .await
            .map_err(|e| FaucetError::Captcha(format!("Invalid response: {}", e)))?;

        if !response.success {
            debug!("Captcha rejected: {:?}", response.error_codes);
        }
        Ok(response.success)
    }
}
