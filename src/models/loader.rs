//! Model bundle loader
//!
//! A bundle is a JSON manifest naming the feature order and the regressor:
//!
//! ```json
//! { "features": ["age", "complexity"], "model": { "kind": "onnx", "path": "model.onnx" } }
//! ```
//!
//! ONNX paths are resolved relative to the manifest directory.

use crate::error::{EstimateError, Result};
use crate::feature_assembler::FeatureSchema;
use crate::models::regressor::{LinearRegressor, OnnxRegressor, Regressor};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize)]
struct BundleManifest {
    features: Vec<String>,
    model: ModelSpec,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ModelSpec {
    Onnx {
        path: PathBuf,
    },
    Linear {
        #[serde(default)]
        intercept: f64,
        coefficients: Vec<f64>,
    },
}

/// Regressor together with the feature ordering it was trained on
pub struct LoadedModel {
    pub schema: FeatureSchema,
    pub regressor: Box<dyn Regressor>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("schema", &self.schema)
            .field("regressor", &self.regressor.name())
            .finish()
    }
}

/// Loader for model bundles
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a bundle manifest and the regressor it describes.
    ///
    /// Any failure here is a [`EstimateError::ModelLoad`]; callers must not
    /// serve requests without a loaded model.
    pub fn load_bundle<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model bundle");

        let raw = std::fs::read_to_string(path).map_err(|e| {
            EstimateError::ModelLoad(format!("cannot read bundle {}: {e}", path.display()))
        })?;

        let manifest: BundleManifest = serde_json::from_str(&raw).map_err(|e| {
            EstimateError::ModelLoad(format!("malformed bundle {}: {e}", path.display()))
        })?;

        let schema = FeatureSchema::try_new(manifest.features)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let regressor: Box<dyn Regressor> = match manifest.model {
            ModelSpec::Onnx { path: model_path } => {
                Box::new(self.load_onnx(&base_dir.join(model_path))?)
            }
            ModelSpec::Linear {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != schema.len() {
                    return Err(EstimateError::ModelLoad(format!(
                        "linear model has {} coefficients for {} features",
                        coefficients.len(),
                        schema.len()
                    )));
                }
                Box::new(LinearRegressor::new(
                    model_name(path),
                    intercept,
                    coefficients,
                ))
            }
        };

        info!(
            model = %regressor.name(),
            features = schema.len(),
            "Model bundle loaded successfully"
        );

        Ok(LoadedModel { schema, regressor })
    }

    /// Open an ONNX regression model
    fn load_onnx(&self, path: &Path) -> Result<OnnxRegressor> {
        let name = model_name(path);

        if !path.exists() {
            return Err(EstimateError::ModelLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = self.open_session(path).map_err(|e| {
            EstimateError::ModelLoad(format!("failed to load model from {}: {e:#}", path.display()))
        })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| EstimateError::ModelLoad(format!("model {name} declares no inputs")))?;

        // Prefer an explicitly named prediction output, else the first one
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("variable") || o.name.contains("predict"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| EstimateError::ModelLoad(format!("model {name} declares no outputs")))?;

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(OnnxRegressor::new(name, session, input_name, output_name))
    }

    fn open_session(&self, path: &Path) -> anyhow::Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)?;
        Ok(session)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}
