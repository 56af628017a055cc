//! Completion Risk Library
//!
//! Estimates how long a maintenance task will take for a given worker and
//! how likely it is to finish within a time limit. A pretrained regression
//! model yields the point estimate; a triangular distribution around it
//! yields the probability.

pub mod config;
pub mod consumer;
pub mod distribution;
pub mod error;
pub mod feature_assembler;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use consumer::{RequestConsumer, RequestLimiter};
pub use distribution::{cdf, derive_params, SpreadRatios, TriangularParams};
pub use error::EstimateError;
pub use feature_assembler::{assemble, FeatureAssembler, FeatureRecord, FeatureSchema};
pub use models::inference::{PointEstimate, PointEstimator};
pub use producer::ReplyProducer;
pub use service::RiskEstimator;
pub use types::{EstimateRequest, EstimateResponse, ErrorResponse};
