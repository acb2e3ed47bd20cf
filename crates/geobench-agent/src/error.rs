//! Error types for the completion service

use geobench_core::AgentError;
use thiserror::Error;

/// Errors from talking to a completion service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Transport failure (connection refused, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-2xx response
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("malformed completion response: {0}")]
    Malformed(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Http(err.to_string())
    }
}

impl From<ServiceError> for AgentError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Malformed(msg) => AgentError::MalformedOutput(msg),
            other => AgentError::Service(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_maps_to_malformed_output() {
        let err: AgentError = ServiceError::Malformed("no message".to_string()).into();
        assert_eq!(err, AgentError::MalformedOutput("no message".to_string()));
    }

    #[test]
    fn test_status_maps_to_service_error() {
        let err: AgentError = ServiceError::Status {
            status: 404,
            body: "model not found".to_string(),
        }
        .into();
        assert_eq!(
            err,
            AgentError::Service("completion service returned 404: model not found".to_string())
        );
    }
}
