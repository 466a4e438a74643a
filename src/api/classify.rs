//! Maps transport and HTTP outcomes onto [`AppError`]
//!
//! Shared by every endpoint so both coordinators present failures the same
//! way: 401 is `Auth`, any other 4xx is `Validation` carrying the server's
//! message, 5xx is `Server`, and anything without a response is `Network`.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

/// Classify a failure that produced no HTTP response
pub fn classify_transport(err: &reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Network("request timed out".to_string())
    } else if err.is_connect() {
        AppError::Network(format!("could not reach server: {}", err))
    } else {
        AppError::Network(err.to_string())
    }
}

/// Classify a non-success status with its raw body
pub fn classify_status(status: StatusCode, body: &str) -> AppError {
    if status == StatusCode::UNAUTHORIZED {
        return AppError::Auth;
    }

    let message = body_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });

    if status.is_client_error() {
        AppError::Validation(message)
    } else {
        AppError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

/// Extract a human message from an error body (`error` or `message` field)
fn body_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turn a raw response into its decoded body or a classified error
pub async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(|e| classify_transport(&e))?;

    if !status.is_success() {
        return Err(classify_status(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| AppError::Server {
        status: status.as_u16(),
        message: format!("Invalid response body: {}", e),
    })
}
