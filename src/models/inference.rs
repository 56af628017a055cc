//! Point estimator: runs the pretrained regressor on an assembled record

use crate::error::{EstimateError, Result};
use crate::feature_assembler::{FeatureRecord, FeatureSchema};
use crate::models::loader::{LoadedModel, ModelLoader};
use crate::models::regressor::Regressor;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Predicted duration in hours. Never negative, never NaN.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct PointEstimate(f64);

impl PointEstimate {
    /// Wrap a raw model output, clamping NaN, infinite and negative values to 0.
    pub fn new(hours: f64) -> Self {
        Self(crate::distribution::sanitize_estimate(hours))
    }

    pub fn hours(&self) -> f64 {
        self.0
    }
}

/// Read-only wrapper around the loaded model, shared by all requests
pub struct PointEstimator {
    schema: Arc<FeatureSchema>,
    regressor: Box<dyn Regressor>,
}

impl PointEstimator {
    /// Load the bundle at `path` and build an estimator from it
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let model = ModelLoader::with_threads(onnx_threads).load_bundle(path)?;
        Ok(Self::new(model))
    }

    pub fn new(model: LoadedModel) -> Self {
        Self::from_parts(model.schema, model.regressor)
    }

    pub fn from_parts(schema: FeatureSchema, regressor: Box<dyn Regressor>) -> Self {
        Self {
            schema: Arc::new(schema),
            regressor,
        }
    }

    /// Feature ordering the model expects
    pub fn schema(&self) -> Arc<FeatureSchema> {
        Arc::clone(&self.schema)
    }

    pub fn model_name(&self) -> &str {
        self.regressor.name()
    }

    /// Predict a duration for one record.
    ///
    /// Model failures are not retried: the same input fails the same way.
    pub fn predict(&self, record: &FeatureRecord) -> Result<PointEstimate> {
        let features = record.to_vector(&self.schema)?;

        let raw = self
            .regressor
            .predict(&features)
            .map_err(|e| EstimateError::Estimation(format!("{e:#}")))?;

        if !raw.is_finite() || raw < 0.0 {
            warn!(
                model = %self.regressor.name(),
                raw_prediction = raw,
                "Model returned an invalid duration, clamping to 0"
            );
        }

        let estimate = PointEstimate::new(raw);
        debug!(
            model = %self.regressor.name(),
            prediction = estimate.hours(),
            "Point estimate computed"
        );
        Ok(estimate)
    }
}
