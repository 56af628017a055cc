//! Configuration management for the completion risk service

use crate::distribution::SpreadRatios;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub risk: SpreadRatios,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject estimate requests arrive on; replies go to each message's reply subject
    #[serde(default = "default_request_subject")]
    pub request_subject: String,
    /// Queue group shared by service replicas; empty disables load splitting
    #[serde(default = "default_queue_group")]
    pub queue_group: String,
}

fn default_request_subject() -> String {
    "maintenance.estimate".to_string()
}

fn default_queue_group() -> String {
    "completion-risk".to_string()
}

/// Model bundle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// JSON manifest with the feature ordering and the regressor
    pub bundle_path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// Request processing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of requests handled concurrently
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 8 }
    }
}

/// Periodic metrics summary
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summaries, 0 disables reporting
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// `COMPLETION_RISK__SECTION__KEY` environment variables override file values.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("COMPLETION_RISK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would break the estimate invariants
    pub fn validate(&self) -> Result<()> {
        self.risk
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid [risk] section: {}", e))?;

        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be at least 1");
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: default_request_subject(),
                queue_group: default_queue_group(),
            },
            model: ModelConfig {
                bundle_path: "models/bundle.json".to_string(),
                onnx_threads: 1,
            },
            risk: SpreadRatios::default(),
            pipeline: PipelineConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
