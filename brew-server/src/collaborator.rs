//! Shared plumbing for outbound collaborator calls
//!
//! Every external call goes through a `reqwest::Client` built with the
//! configured timeout. Responses are normalised here: transport failures,
//! timeouts, non-2xx statuses and malformed bodies all become a
//! [`CollaboratorError`] carrying the collaborator's own message when it
//! sent one. Nothing is retried.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    #[error("{service} unreachable: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} returned an unexpected response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

impl CollaboratorError {
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CollaboratorError::Timeout { service }
        } else if err.is_decode() {
            CollaboratorError::InvalidResponse {
                service,
                message: err.to_string(),
            }
        } else {
            CollaboratorError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }

    pub fn invalid(service: &'static str, message: impl Into<String>) -> Self {
        CollaboratorError::InvalidResponse {
            service,
            message: message.into(),
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            Self::Timeout { service }
            | Self::Transport { service, .. }
            | Self::Rejected { service, .. }
            | Self::InvalidResponse { service, .. } => service,
        }
    }

    /// The collaborator rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status == StatusCode::UNAUTHORIZED.as_u16())
    }
}

impl From<CollaboratorError> for AppError {
    fn from(e: CollaboratorError) -> Self {
        let service = e.service();
        tracing::warn!(service, error = %e, "Collaborator call failed");
        let app = match &e {
            CollaboratorError::Timeout { .. } => {
                AppError::with_message(ErrorCode::TimeoutError, e.to_string())
            }
            CollaboratorError::Transport { .. } => {
                AppError::with_message(ErrorCode::NetworkError, e.to_string())
            }
            CollaboratorError::Rejected { status, .. } => {
                AppError::upstream(e.to_string()).with_detail("upstream_status", *status)
            }
            CollaboratorError::InvalidResponse { .. } => AppError::upstream(e.to_string()),
        };
        app.with_detail("collaborator", service)
    }
}

/// HTTP client for collaborator calls, bounded by `timeout`
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("brew-server/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Pull a human-readable message out of a collaborator error body
pub fn error_message(body: &Value) -> Option<String> {
    let candidates = [
        body.pointer("/error/description"),
        body.pointer("/error/message"),
        body.get("message"),
        body.get("error"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.is_empty())
}

/// Read a JSON body, mapping non-2xx statuses to `Rejected`
pub async fn read_json(service: &'static str, resp: Response) -> Result<Value, CollaboratorError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| CollaboratorError::from_reqwest(service, e))?;
    let body: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    if !status.is_success() {
        let message = error_message(&body)
            .or_else(|| body.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{service} returned HTTP {}", status.as_u16()));
        return Err(CollaboratorError::Rejected {
            service,
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

/// Required string field (numbers are accepted and rendered)
pub fn str_field(service: &'static str, body: &Value, pointer: &str) -> Result<String, CollaboratorError> {
    match body.pointer(pointer) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(CollaboratorError::invalid(
            service,
            format!("missing field {pointer}"),
        )),
    }
}

pub fn opt_str_field(body: &Value, pointer: &str) -> Option<String> {
    match body.pointer(pointer) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
