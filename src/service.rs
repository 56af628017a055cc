//! Estimate pipeline: assemble -> predict -> derive -> cdf
//!
//! One [`RiskEstimator`] is built at startup and shared by reference with
//! every request handler. Nothing in it is mutated after construction.

use crate::config::AppConfig;
use crate::distribution::{cdf, density_points, SpreadRatios, TriangularParams};
use crate::error::{EstimateError, Result};
use crate::feature_assembler::FeatureAssembler;
use crate::models::inference::{PointEstimate, PointEstimator};
use crate::types::request::EstimateRequest;
use crate::types::response::{percent, round_to, ErrorResponse, EstimateResponse};
use std::time::Instant;
use tracing::{error, info};

/// Upper bound on density samples a single request may ask for
pub const MAX_DENSITY_POINTS: usize = 2000;

/// Full-precision result of one estimate
#[derive(Debug, Clone, PartialEq)]
pub struct RiskEstimate {
    pub prediction: PointEstimate,
    pub params: TriangularParams,
    /// P(duration <= time_limit), in [0, 1]
    pub probability: f64,
    pub density: Option<Vec<(f64, f64)>>,
}

impl RiskEstimate {
    /// Round at the reporting boundary only.
    pub fn to_response(&self) -> EstimateResponse {
        EstimateResponse {
            prediction: round_to(self.prediction.hours(), 3),
            probability: percent(self.probability),
            a: round_to(self.params.a, 3),
            b: round_to(self.params.b, 3),
            c: round_to(self.params.c, 3),
            density: self.density.as_ref().map(|points| {
                points
                    .iter()
                    .map(|&(x, y)| [round_to(x, 3), y])
                    .collect()
            }),
        }
    }
}

/// Encoded reply for one request
#[derive(Debug, Clone)]
pub struct Reply {
    pub request_id: String,
    /// HTTP-equivalent status, 200 on success
    pub status: u16,
    pub body: Vec<u8>,
    /// Probability in [0, 1] when the request succeeded
    pub probability: Option<f64>,
    /// Error kind when it did not
    pub error_kind: Option<&'static str>,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Shared, immutable estimation pipeline
pub struct RiskEstimator {
    assembler: FeatureAssembler,
    estimator: PointEstimator,
    spread: SpreadRatios,
}

impl RiskEstimator {
    pub fn new(estimator: PointEstimator, spread: SpreadRatios) -> Self {
        Self {
            assembler: FeatureAssembler::new(estimator.schema()),
            estimator,
            spread,
        }
    }

    /// Load the configured model bundle. Failure means the service must not start.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let estimator = PointEstimator::load(&config.model.bundle_path, config.model.onnx_threads)?;
        Ok(Self::new(estimator, config.risk))
    }

    pub fn feature_count(&self) -> usize {
        self.assembler.feature_count()
    }

    pub fn feature_names(&self) -> &[String] {
        self.assembler.schema().names()
    }

    pub fn model_name(&self) -> &str {
        self.estimator.model_name()
    }

    /// Run the full pipeline for one request.
    ///
    /// Either every part of the estimate is produced or an error is returned.
    pub fn estimate(&self, request: &EstimateRequest, request_id: &str) -> Result<RiskEstimate> {
        let record = self.assembler.assemble(&request.data, request_id)?;
        let prediction = self.estimator.predict(&record)?;
        let params = self.spread.derive(prediction.hours());

        if !(params.a.is_finite() && params.b.is_finite() && params.c.is_finite()) {
            return Err(EstimateError::Distribution(format!(
                "triangle bounds overflow for estimate {}",
                prediction.hours()
            )));
        }

        let probability = cdf(&params, request.time_limit);
        if !probability.is_finite() {
            return Err(EstimateError::Distribution(format!(
                "probability undefined for time limit {}",
                request.time_limit
            )));
        }

        let density = request
            .density_points
            .map(|n| density_points(&params, n.min(MAX_DENSITY_POINTS)));

        Ok(RiskEstimate {
            prediction,
            params,
            probability,
            density,
        })
    }

    /// Decode a raw request, run it and encode the reply.
    ///
    /// Failures are logged with their cause and turned into an error payload.
    pub fn handle(&self, payload: &[u8]) -> Reply {
        let start = Instant::now();

        let request = match serde_json::from_slice::<EstimateRequest>(payload) {
            Ok(request) => request,
            Err(e) => {
                let request_id = new_request_id();
                return self.failure(EstimateError::from(e), request_id);
            }
        };

        let request_id = request.request_id.clone().unwrap_or_else(new_request_id);

        match self.estimate(&request, &request_id) {
            Ok(estimate) => {
                let response = estimate.to_response();
                info!(
                    request_id = %request_id,
                    prediction = response.prediction,
                    probability = response.probability,
                    time_limit = request.time_limit,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "Estimate served"
                );
                match serde_json::to_vec(&response) {
                    Ok(body) => Reply {
                        request_id,
                        status: 200,
                        body,
                        probability: Some(estimate.probability),
                        error_kind: None,
                    },
                    Err(e) => self.failure(EstimateError::Estimation(e.to_string()), request_id),
                }
            }
            Err(e) => self.failure(e, request_id),
        }
    }

    fn failure(&self, err: EstimateError, request_id: String) -> Reply {
        error!(
            request_id = %request_id,
            kind = err.kind(),
            error = %err,
            "Estimate request failed"
        );

        let payload = ErrorResponse::from_error(&err, Some(request_id.clone()));
        let body = serde_json::to_vec(&payload).unwrap_or_else(|_| {
            br#"{"error":{"kind":"estimation","message":"failed to encode error","status":500}}"#
                .to_vec()
        });

        Reply {
            request_id,
            status: err.status(),
            body,
            probability: None,
            error_kind: Some(err.kind()),
        }
    }
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
