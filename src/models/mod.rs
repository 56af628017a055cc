//! Duration model loading and inference

pub mod inference;
pub mod loader;
pub mod regressor;

pub use inference::{PointEstimate, PointEstimator};
pub use loader::{LoadedModel, ModelLoader};
pub use regressor::{LinearRegressor, OnnxRegressor, Regressor};
