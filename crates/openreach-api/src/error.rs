//! Uniform error envelope
//!
//! Every entry point answers failures with `{error, details?}`: 400 for
//! missing/invalid parameters, 500 for credential misconfiguration or
//! internal failures, and pass-through of the upstream status for
//! upstream-reported failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reach_analytics::PrefsError;
use reach_common::ReachError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: message.into(),
                details: None,
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                error: message.into(),
                details: None,
            },
        }
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: "Internal server error".to_string(),
                details: Some(details.into()),
            },
        }
    }

    fn upstream(status: u16, error: String) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            body: ErrorBody {
                error,
                details: None,
            },
        }
    }
}

impl From<ReachError> for ApiError {
    fn from(error: ReachError) -> Self {
        match &error {
            ReachError::InvalidRequest(message) => Self::bad_request(message.clone()),
            ReachError::CredentialMissing(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorBody {
                    error: "API key not configured for selected workspace".to_string(),
                    details: None,
                },
            },
            ReachError::UpstreamStatus { status } => {
                Self::upstream(*status, format!("HTTP {}", status))
            }
            ReachError::RetriesExhausted { last_status } => {
                let mut mapped = Self::upstream(*last_status, error.to_string());
                mapped.body.details = Some(format!("last upstream status {}", last_status));
                mapped
            }
            ReachError::RateLimitExhausted => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: ErrorBody {
                    error: error.to_string(),
                    details: None,
                },
            },
            ReachError::Transport(message) | ReachError::Decode(message) => {
                Self::internal(message.clone())
            }
        }
    }
}

impl From<PrefsError> for ApiError {
    fn from(error: PrefsError) -> Self {
        Self::internal(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        let mapped = ApiError::from(ReachError::InvalidRequest("Campaign ID is required".into()));
        assert_eq!(mapped.status, StatusCode::BAD_REQUEST);
        assert_eq!(mapped.body.error, "Campaign ID is required");
        assert!(mapped.body.details.is_none());
    }

    #[test]
    fn credential_errors_map_to_500() {
        let mapped = ApiError::from(ReachError::CredentialMissing("3".into()));
        assert_eq!(mapped.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            mapped.body.error,
            "API key not configured for selected workspace"
        );
    }

    #[test]
    fn upstream_statuses_pass_through() {
        let mapped = ApiError::from(ReachError::UpstreamStatus { status: 403 });
        assert_eq!(mapped.status, StatusCode::FORBIDDEN);
        assert_eq!(mapped.body.error, "HTTP 403");

        let mapped = ApiError::from(ReachError::RetriesExhausted { last_status: 503 });
        assert_eq!(mapped.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_upstream_status_degrades_to_502() {
        let mapped = ApiError::from(ReachError::RetriesExhausted { last_status: 0 });
        assert_eq!(mapped.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn local_failures_are_internal_with_details() {
        let mapped = ApiError::from(ReachError::Transport("connection reset".into()));
        assert_eq!(mapped.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mapped.body.error, "Internal server error");
        assert_eq!(mapped.body.details.as_deref(), Some("connection reset"));
    }

    #[test]
    fn breaker_trips_map_to_429() {
        let mapped = ApiError::from(ReachError::RateLimitExhausted);
        assert_eq!(mapped.status, StatusCode::TOO_MANY_REQUESTS);
    }
}
