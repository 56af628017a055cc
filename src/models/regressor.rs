//! Regression backends behind a common point-estimate interface

use anyhow::{anyhow, Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use std::sync::Mutex;
use tracing::debug;

/// A pretrained, deterministic regression function.
///
/// Receives one feature vector in schema order and returns the predicted
/// duration in hours. Implementations are shared across concurrent requests.
pub trait Regressor: Send + Sync {
    /// Human-readable model name for logs
    fn name(&self) -> &str;

    /// Number of input features the model was fitted on, when known
    fn input_len(&self) -> Option<usize> {
        None
    }

    /// Predict a single duration
    fn predict(&self, features: &[f32]) -> Result<f64>;
}

/// ONNX Runtime backed regressor (tree ensembles, linear models, MLPs exported to ONNX)
pub struct OnnxRegressor {
    name: String,
    /// ONNX Runtime needs exclusive access to run a session
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxRegressor {
    pub fn new(name: String, session: Session, input_name: String, output_name: String) -> Self {
        Self {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
        }
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl Regressor for OnnxRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f32]) -> Result<f64> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| anyhow!("model output '{}' missing", self.output_name))?;

        // sklearn-onnx regressors emit float tensors, some exporters emit doubles
        let value = if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            data.first().map(|&v| v as f64)
        } else {
            let (_, data) = output
                .try_extract_tensor::<f64>()
                .context("model output is neither f32 nor f64 tensor")?;
            data.first().copied()
        };

        let value = value.ok_or_else(|| anyhow!("model '{}' returned an empty tensor", self.name))?;
        debug!(model = %self.name, prediction = value, "ONNX inference complete");
        Ok(value)
    }
}

/// Linear regressor stored inline in the bundle manifest
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    name: String,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearRegressor {
    pub fn new(name: impl Into<String>, intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            intercept,
            coefficients,
        }
    }
}

impl Regressor for LinearRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn predict(&self, features: &[f32]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(anyhow!(
                "input shape [1, {}] does not match model shape [1, {}]",
                features.len(),
                self.coefficients.len()
            ));
        }

        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, &x)| w * x as f64)
            .sum();

        Ok(self.intercept + dot)
    }
}
