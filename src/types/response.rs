//! Estimate reply payloads

use crate::error::EstimateError;
use serde::{Deserialize, Serialize};

/// Round `value` to `decimals` places.
///
/// Goes through decimal formatting, which rounds the exact binary value with
/// ties to even and cannot overflow for large magnitudes.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", decimals, value)
        .parse::<f64>()
        .unwrap_or(value)
}

/// Convert a probability in [0, 1] to a percentage with one decimal.
pub fn percent(probability: f64) -> f64 {
    round_to(probability.clamp(0.0, 1.0) * 100.0, 1).clamp(0.0, 100.0)
}

/// Successful estimate, rounded for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResponse {
    /// Predicted duration in hours, 3 decimals
    pub prediction: f64,
    /// Chance of finishing within the time limit, percent with 1 decimal
    pub probability: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Optional `[x, density]` samples over [a, c], 3 decimals on x
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<Vec<[f64; 2]>>,
}

/// Error payload returned instead of an estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// One of model_load, estimation, distribution, bad_request
    pub kind: String,
    pub message: String,
    /// HTTP-equivalent status
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn from_error(err: &EstimateError, request_id: Option<String>) -> Self {
        Self {
            error: ErrorBody {
                kind: err.kind().to_string(),
                message: err.to_string(),
                status: err.status(),
                request_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(9.87654, 3), 9.877);
        assert_eq!(round_to(12.0, 3), 12.0);
        assert_eq!(round_to(0.0004, 3), 0.0);
    }

    #[test]
    fn test_round_to_exact_binary_ties_to_even() {
        // 2.0625 is an exact tie, 1.0005 is stored just below the tie
        assert_eq!(round_to(2.0625, 3), 2.062);
        assert_eq!(round_to(1.0005, 3), 1.0);
        assert_eq!(round_to(0.25, 1), 0.2);
    }

    #[test]
    fn test_round_to_large_values_stay_finite() {
        let c = 1.2 * 1e306;
        assert!(round_to(c, 3).is_finite());
        assert_eq!(round_to(c, 3), c);
        assert_eq!(round_to(f64::MAX, 3), f64::MAX);
    }

    #[test]
    fn test_percent_range() {
        assert_eq!(percent(0.125), 12.5);
        assert_eq!(percent(0.875), 87.5);
        assert_eq!(percent(0.99999), 100.0);
        assert_eq!(percent(1.5), 100.0);
        assert_eq!(percent(-0.2), 0.0);
    }

    #[test]
    fn test_error_payload_shape() {
        let err = EstimateError::Estimation("bad shape".into());
        let payload = ErrorResponse::from_error(&err, Some("req-9".into()));
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["error"]["kind"], "estimation");
        assert_eq!(json["error"]["status"], 500);
        assert_eq!(json["error"]["request_id"], "req-9");
        assert!(json["error"]["message"].as_str().unwrap().contains("bad shape"));
    }

    #[test]
    fn test_density_omitted_when_absent() {
        let resp = EstimateResponse {
            prediction: 10.0,
            probability: 12.5,
            a: 8.0,
            b: 10.0,
            c: 12.0,
            density: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("density").is_none());
        assert_eq!(json["probability"], 12.5);
    }
}
