//! Error types for the faucet service

use crate::views;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use xenium_storage::StorageError;

/// Faucet service errors.
///
/// Rejections the visitor can act on (bad address, cooldown, balance,
/// captcha) are not errors; they are [`crate::service::ClaimOutcome`]s.
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Captcha service error: {0}")]
    Captcha(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FaucetError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FaucetError::Wallet(_) | FaucetError::Captcha(_) => StatusCode::BAD_GATEWAY,
            FaucetError::Config(_) | FaucetError::Storage(_) | FaucetError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text safe to show to a visitor
    pub fn user_message(&self) -> &'static str {
        match self {
            FaucetError::Wallet(_) => {
                "The faucet wallet could not complete your request. Please try again later."
            }
            FaucetError::Captcha(_) => {
                "The captcha service could not be reached. Please try again later."
            }
            FaucetError::Config(_) | FaucetError::Storage(_) | FaucetError::Internal(_) => {
                "An internal error occurred. Please try again later."
            }
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        (self.status_code(), Html(views::bare_error(self.user_message()))).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(FaucetError::Wallet("down".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(FaucetError::Captcha("down".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            FaucetError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = FaucetError::Wallet("connection refused at 127.0.0.1:32780".into());
        assert!(!err.user_message().contains("127.0.0.1"));
        assert!(err.to_string().contains("127.0.0.1"));
    }
}
