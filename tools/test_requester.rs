//! Test Estimate Requester
//!
//! Generates maintenance estimate requests and sends them over NATS
//! request/reply, logging the replies.

use rand::Rng;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Random worker/job attribute generator
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    request_counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            request_counter: 0,
        }
    }

    /// Generate a request for a routine job with an experienced worker
    fn generate_routine(&mut self) -> Value {
        self.request_counter += 1;
        let normative_hours = self.rng.gen_range(2.0..8.0_f64);

        let condition = self.rng.gen_range(3..=5);
        let data = self.attributes(normative_hours, 0, condition);
        json!({
            "request_id": format!("req_{:012}", self.request_counter),
            "data": data,
            "time_limit": (normative_hours * 2.0).round() / 2.0,
        })
    }

    /// Generate an unplanned job on a worn object at night, with a tight limit
    fn generate_urgent(&mut self) -> Value {
        self.request_counter += 1;
        let normative_hours = self.rng.gen_range(4.0..16.0_f64);

        let condition = self.rng.gen_range(1..=2);
        let mut data = self.attributes(normative_hours, 1, condition);
        data.insert("shift_night".to_string(), json!(1));
        data.insert("spare_parts_available".to_string(), json!(0));
        json!({
            "request_id": format!("req_{:012}", self.request_counter),
            "data": data,
            "time_limit": (normative_hours * 0.8 * 2.0).round() / 2.0,
            "density_points": 50,
        })
    }

    fn attributes(&mut self, normative_hours: f64, unplanned: i32, condition: i32) -> Map<String, Value> {
        let experience_years = self.rng.gen_range(0.5..30.0_f64);
        let values = json!({
            "age": self.rng.gen_range(20..62),
            "experience_years": experience_years,
            "field_experience": (experience_years * self.rng.gen_range(0.2..1.0)).round(),
            "productivity": self.rng.gen_range(0.7..1.3),
            "qualification": self.rng.gen_range(2..=6),
            "education": self.rng.gen_range(1..=3),
            "normative_hours": normative_hours,
            "complexity": self.rng.gen_range(1..=5),
            "unplanned": unplanned,
            "object_condition": condition,
            "spare_parts_available": i32::from(self.rng.gen_bool(0.8)),
            "prior_workload": self.rng.gen_range(0..=4),
            "required_qualification": self.rng.gen_range(2..=6),
            "specialization_mechanic": i32::from(self.rng.gen_bool(0.5)),
            "job_type_to2": i32::from(self.rng.gen_bool(0.3)),
            "season_summer": i32::from(self.rng.gen_bool(0.25)),
            "location_track": i32::from(self.rng.gen_bool(0.3)),
            "shift_night": i32::from(self.rng.gen_bool(0.2)),
        });
        values.as_object().cloned().unwrap_or_default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_requester=info".parse()?),
        )
        .init();

    info!("Starting Test Estimate Requester");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("maintenance.estimate");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let urgent_rate = parse_rate(args.get(4).map(|s| s.as_str()), 0.2);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        urgent_rate = urgent_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, urgent_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();
    let mut failures = 0u64;

    for i in 0..count {
        let request = if rng.gen_bool(urgent_rate) {
            generator.generate_urgent()
        } else {
            generator.generate_routine()
        };

        let payload = serde_json::to_vec(&request)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => match serde_json::from_slice::<Value>(&reply.payload) {
                Ok(body) => {
                    if let Some(err) = body.get("error") {
                        failures += 1;
                        warn!(request = i + 1, error = %err, "Estimate failed");
                    } else {
                        info!(
                            request = i + 1,
                            prediction = %body["prediction"],
                            probability = %body["probability"],
                            time_limit = %request["time_limit"],
                            "Estimate received"
                        );
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        request = i + 1,
                        error = %e,
                        bytes = reply.payload.len(),
                        "Reply is not valid JSON"
                    );
                }
            },
            Err(e) => {
                failures += 1;
                warn!(request = i + 1, error = %e, "Request failed");
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Sent {} requests ({} failed)", count, failures);

    Ok(())
}

/// Urgent request share from the command line, clamped to [0, 1]
fn parse_rate(arg: Option<&str>, default: f64) -> f64 {
    arg.and_then(|s| s.parse::<f64>().ok())
        .filter(|rate| !rate.is_nan())
        .map(|rate| rate.clamp(0.0, 1.0))
        .unwrap_or(default)
}

async fn run_dry_mode(count: u64, urgent_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let request = if rng.gen_bool(urgent_rate) {
            generator.generate_urgent()
        } else {
            generator.generate_routine()
        };

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, serde_json::to_string_pretty(&request)?);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
