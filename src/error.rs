//! Error types for the completion risk service

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, EstimateError>;

/// Failures that can surface from model loading or request handling
#[derive(Error, Debug)]
pub enum EstimateError {
    /// Model bundle missing, corrupt or incomplete. Fatal at startup.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// The underlying model call or feature computation failed
    #[error("estimation failed: {0}")]
    Estimation(String),

    /// Numeric instability in the distribution stage
    #[error("distribution failed: {0}")]
    Distribution(String),

    /// Request body could not be decoded
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl EstimateError {
    /// Stable machine-readable kind used in error payloads and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            EstimateError::ModelLoad(_) => "model_load",
            EstimateError::Estimation(_) => "estimation",
            EstimateError::Distribution(_) => "distribution",
            EstimateError::BadRequest(_) => "bad_request",
        }
    }

    /// HTTP-equivalent status carried in the error payload.
    ///
    /// Only undecodable requests are client errors; anything that goes wrong
    /// past decoding is a server error.
    pub fn status(&self) -> u16 {
        match self {
            EstimateError::BadRequest(_) => 400,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for EstimateError {
    fn from(err: serde_json::Error) -> Self {
        EstimateError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let kinds = [
            EstimateError::ModelLoad("x".into()).kind(),
            EstimateError::Estimation("x".into()).kind(),
            EstimateError::Distribution("x".into()).kind(),
            EstimateError::BadRequest("x".into()).kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_internal_failures_are_server_errors() {
        assert_eq!(EstimateError::ModelLoad("gone".into()).status(), 500);
        assert_eq!(EstimateError::Estimation("shape".into()).status(), 500);
        assert_eq!(EstimateError::Distribution("nan".into()).status(), 500);
        assert_eq!(EstimateError::BadRequest("json".into()).status(), 400);
    }

    #[test]
    fn test_message_keeps_cause() {
        let err = EstimateError::Estimation("input shape [1, 3] != [1, 4]".into());
        let msg = err.to_string();
        assert!(msg.contains("estimation failed"));
        assert!(msg.contains("[1, 3]"));
    }
}
