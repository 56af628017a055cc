//! Estimate request payload

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute mapping plus the deadline to evaluate.
///
/// Categorical inputs are expected one-hot encoded as 0/1 under the model's
/// feature names (e.g. `"shift_night": 1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    /// Worker, job and situational attributes keyed by feature name
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Time limit in hours. Any number is accepted, including <= 0.
    pub time_limit: f64,

    /// Caller-supplied correlation id, generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Number of density samples to include in the reply (none by default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_points: Option<usize>,
}

impl EstimateRequest {
    pub fn new(data: Map<String, Value>, time_limit: f64) -> Self {
        Self {
            data,
            time_limit,
            request_id: None,
            density_points: None,
        }
    }

    pub fn with_density_points(mut self, n: usize) -> Self {
        self.density_points = Some(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request() {
        let req: EstimateRequest =
            serde_json::from_str(r#"{"data": {"age": 41, "shift_night": 1}, "time_limit": 6.5}"#)
                .unwrap();
        assert_eq!(req.time_limit, 6.5);
        assert_eq!(req.data.len(), 2);
        assert!(req.request_id.is_none());
        assert!(req.density_points.is_none());
    }

    #[test]
    fn test_missing_data_defaults_to_empty() {
        let req: EstimateRequest = serde_json::from_str(r#"{"time_limit": -1}"#).unwrap();
        assert!(req.data.is_empty());
        assert_eq!(req.time_limit, -1.0);
    }

    #[test]
    fn test_time_limit_required() {
        assert!(serde_json::from_str::<EstimateRequest>(r#"{"data": {}}"#).is_err());
    }
}
