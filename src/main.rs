//! Completion Risk Service - Main Entry Point
//!
//! Loads the duration model once, then answers estimate requests arriving
//! over NATS request/reply.

use anyhow::{Context, Result};
use completion_risk::{
    config::{AppConfig, LoggingConfig},
    consumer::{RequestConsumer, RequestLimiter},
    metrics::{MetricsReporter, ServiceMetrics},
    producer::ReplyProducer,
    service::RiskEstimator,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config path as first argument
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::load()?,
    };

    init_logging(&config.logging)?;
    info!("Starting Completion Risk Service");
    info!(
        "Triangle spread: a = {:.2} x estimate, c = {:.2} x estimate",
        config.risk.lower_ratio, config.risk.upper_ratio
    );

    // The model must be in place before any request is accepted
    let estimator = match RiskEstimator::from_config(&config) {
        Ok(estimator) => Arc::new(estimator),
        Err(e) => {
            error!(
                bundle = %config.model.bundle_path,
                error = %e,
                "Model bundle could not be loaded, refusing to serve"
            );
            return Err(e.into());
        }
    };
    info!(
        model = %estimator.model_name(),
        features = estimator.feature_count(),
        "Estimator ready with feature schema {:?}",
        estimator.feature_names()
    );

    let metrics = Arc::new(ServiceMetrics::new());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(
        client.clone(),
        &config.nats.request_subject,
        &config.nats.queue_group,
    );
    let producer = ReplyProducer::new(client.clone());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let num_workers = config.pipeline.workers;
    info!(
        subject = %consumer.subject(),
        queue_group = consumer.queue_group().unwrap_or("<none>"),
        workers = num_workers,
        "Listening for estimate requests"
    );

    let limiter = RequestLimiter::new(num_workers);
    let mut subscription = consumer.subscribe().await?;

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        let Some(reply_to) = message.reply.clone() else {
            warn!(subject = %message.subject, "Estimate request without reply subject, ignoring");
            continue;
        };

        let permit = limiter.acquire().await?;

        let estimator = estimator.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();
            let reply = estimator.handle(&message.payload);
            let elapsed = start_time.elapsed();

            match (reply.probability, reply.error_kind) {
                (Some(probability), _) => metrics.record_success(elapsed, probability),
                (None, kind) => metrics.record_failure(elapsed, kind.unwrap_or("unknown")),
            }

            let request_id = reply.request_id.clone();
            if let Err(e) = producer.publish(reply_to, reply).await {
                error!(
                    request_id = %request_id,
                    error = %e,
                    "Failed to publish estimate reply"
                );
            }

            // Release permit when done
            drop(permit);
        });
    }

    info!(
        in_flight = limiter.in_flight(),
        "Service shutting down, waiting for running requests"
    );
    drop(subscription);
    limiter.drain().await?;
    if let Err(e) = client.flush().await {
        warn!(error = %e, "Failed to flush pending replies");
    }
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!("completion_risk={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.pretty().init(),
    }

    Ok(())
}
