//! Feature assembly for completion-time model inference.
//!
//! Turns the caller's loose attribute mapping into a record holding exactly
//! the features the loaded model was trained on. Missing features are filled
//! with 0 and unknown attributes are dropped, so a UI that forgets a flag
//! never breaks estimation. The flip side is that a misspelled one-hot flag
//! silently reads as "off"; unknown keys are therefore logged on every request.

use crate::error::{EstimateError, Result};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered feature names expected by the point estimator.
///
/// Fixed when the model bundle is loaded and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicated feature lists.
    pub fn try_new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(EstimateError::ModelLoad(
                "feature schema is empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(EstimateError::ModelLoad(format!(
                    "duplicate feature name in schema: {name}"
                )));
            }
        }

        Ok(Self { names })
    }

    /// Feature names in model input order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// One request's fully populated feature values, keyed by schema name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    values: HashMap<String, f64>,
}

impl FeatureRecord {
    pub fn new(values: HashMap<String, f64>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Select the values in schema order.
    ///
    /// The record's keys must be exactly the schema's names.
    pub fn to_vector(&self, schema: &FeatureSchema) -> Result<Vec<f32>> {
        if self.values.len() != schema.len() {
            return Err(EstimateError::Estimation(format!(
                "feature record has {} values, model expects {}",
                self.values.len(),
                schema.len()
            )));
        }

        schema
            .names()
            .iter()
            .map(|name| {
                self.values.get(name).map(|&v| v as f32).ok_or_else(|| {
                    EstimateError::Estimation(format!("feature record is missing '{name}'"))
                })
            })
            .collect()
    }
}

/// Fill a feature record from raw attributes.
///
/// Schema names absent from `raw` (or null) become 0; keys outside the schema
/// are ignored. Numbers, booleans and numeric strings are accepted, anything
/// else in a schema slot is an estimation error.
pub fn assemble(raw: &Map<String, Value>, schema: &FeatureSchema) -> Result<FeatureRecord> {
    let mut values = HashMap::with_capacity(schema.len());

    for name in schema.names() {
        let value = match raw.get(name) {
            Some(value) => coerce(name, value)?,
            None => 0.0,
        };
        values.insert(name.clone(), value);
    }

    Ok(FeatureRecord { values })
}

/// Keys present in `raw` that the schema does not know, sorted.
pub fn unknown_keys<'a>(raw: &'a Map<String, Value>, schema: &FeatureSchema) -> Vec<&'a str> {
    let mut keys: Vec<&str> = raw
        .keys()
        .map(String::as_str)
        .filter(|k| !schema.contains(k))
        .collect();
    keys.sort_unstable();
    keys
}

fn coerce(name: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Bool(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            EstimateError::Estimation(format!("feature '{name}' is not representable as f64"))
        }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            EstimateError::Estimation(format!("feature '{name}' has non-numeric value {s:?}"))
        }),
        Value::Array(_) | Value::Object(_) => Err(EstimateError::Estimation(format!(
            "feature '{name}' must be a scalar, got {value}"
        ))),
    }
}

/// Schema-bound assembler that reports unknown attributes.
pub struct FeatureAssembler {
    schema: Arc<FeatureSchema>,
}

impl FeatureAssembler {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Number of features produced.
    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// Assemble a record, logging (never rejecting) unrecognized keys.
    ///
    /// Whether an omitted flag was intentional or misspelled cannot be told
    /// apart here; the warning only gives operators something to grep for.
    pub fn assemble(&self, raw: &Map<String, Value>, request_id: &str) -> Result<FeatureRecord> {
        let unknown = unknown_keys(raw, &self.schema);
        if !unknown.is_empty() {
            warn!(
                request_id = %request_id,
                unknown_keys = ?unknown,
                "Request carries attributes outside the model schema; they are ignored"
            );
        }

        let record = assemble(raw, &self.schema)?;
        debug!(
            request_id = %request_id,
            provided = raw.len() - unknown.len(),
            expected = self.schema.len(),
            "Feature record assembled"
        );
        Ok(record)
    }
}
