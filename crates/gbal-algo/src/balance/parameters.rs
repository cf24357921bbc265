//! Balance computation parameters and their JSON form.

use crate::load_flow::LoadFlowParameters;
use crate::scalable::ScalingParameters;
use gbal_core::{GbalError, GbalResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const PARAMETERS_VERSION: &str = "1.0";
pub const DEFAULT_THRESHOLD_NET_POSITION: f64 = 1.0;
pub const DEFAULT_MAX_NUMBER_ITERATIONS: usize = 5;

/// How per-area mismatches are folded into one convergence value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MismatchMode {
    /// Sum of squared mismatches
    #[default]
    Squared,
    /// Largest absolute mismatch
    Max,
}

/// Typed values attached to a parameter set, one per type.
///
/// Custom hooks use these to carry their own settings through a run.
#[derive(Clone, Default)]
pub struct Extensions {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn remove<T: Any + Send + Sync>(&mut self) -> bool {
        self.values.remove(&TypeId::of::<T>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("count", &self.values.len())
            .finish()
    }
}

/// On-disk form of [`BalanceComputationParameters`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ParametersRecord {
    version: String,
    threshold_net_position: f64,
    max_number_iterations: usize,
    mismatch_mode: MismatchMode,
    with_load_flow: bool,
    load_flow_parameters: LoadFlowParameters,
    scaling_parameters: ScalingParameters,
}

impl Default for ParametersRecord {
    fn default() -> Self {
        BalanceComputationParameters::default().into()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ParametersRecord", into = "ParametersRecord")]
pub struct BalanceComputationParameters {
    threshold_net_position: f64,
    max_number_iterations: usize,
    pub mismatch_mode: MismatchMode,
    /// Solve the network between scalings; otherwise apply one scaling pass
    pub with_load_flow: bool,
    pub load_flow_parameters: LoadFlowParameters,
    pub scaling_parameters: ScalingParameters,
    pub extensions: Extensions,
}

impl Default for BalanceComputationParameters {
    fn default() -> Self {
        Self {
            threshold_net_position: DEFAULT_THRESHOLD_NET_POSITION,
            max_number_iterations: DEFAULT_MAX_NUMBER_ITERATIONS,
            mismatch_mode: MismatchMode::default(),
            with_load_flow: true,
            load_flow_parameters: LoadFlowParameters::default(),
            scaling_parameters: ScalingParameters::default(),
            extensions: Extensions::default(),
        }
    }
}

fn check_threshold(threshold: f64) -> GbalResult<()> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(())
    } else {
        Err(GbalError::Config(format!(
            "threshold net position must be a non-negative number, got {}",
            threshold
        )))
    }
}

impl BalanceComputationParameters {
    pub fn new(threshold_net_position: f64, max_number_iterations: usize) -> GbalResult<Self> {
        check_threshold(threshold_net_position)?;
        Ok(Self {
            threshold_net_position,
            max_number_iterations,
            ..Self::default()
        })
    }

    /// Convergence threshold on the aggregated mismatch (MW, or MW² when squared).
    pub fn threshold_net_position(&self) -> f64 {
        self.threshold_net_position
    }

    pub fn set_threshold_net_position(&mut self, threshold: f64) -> GbalResult<&mut Self> {
        check_threshold(threshold)?;
        self.threshold_net_position = threshold;
        Ok(self)
    }

    pub fn max_number_iterations(&self) -> usize {
        self.max_number_iterations
    }

    pub fn set_max_number_iterations(&mut self, iterations: usize) -> &mut Self {
        self.max_number_iterations = iterations;
        self
    }

    pub fn from_json_str(json: &str) -> GbalResult<Self> {
        let record: ParametersRecord = serde_json::from_str(json)?;
        Self::try_from(record)
    }

    pub fn read(path: &Path) -> GbalResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Overwrite the options present in `json`, keeping every other value.
    ///
    /// Nothing changes when the merged result is invalid.
    pub fn update_from_json_str(&mut self, json: &str) -> GbalResult<()> {
        let patch: Value = serde_json::from_str(json)?;
        if !patch.is_object() {
            return Err(GbalError::Parse(
                "balance computation parameters must be a JSON object".into(),
            ));
        }
        let mut current = serde_json::to_value(ParametersRecord::from(self.clone()))?;
        merge(&mut current, patch);
        let record: ParametersRecord = serde_json::from_value(current)?;
        let updated = Self::try_from(record)?;

        self.threshold_net_position = updated.threshold_net_position;
        self.max_number_iterations = updated.max_number_iterations;
        self.mismatch_mode = updated.mismatch_mode;
        self.with_load_flow = updated.with_load_flow;
        self.load_flow_parameters = updated.load_flow_parameters;
        self.scaling_parameters = updated.scaling_parameters;
        Ok(())
    }

    pub fn update(&mut self, path: &Path) -> GbalResult<()> {
        let json = fs::read_to_string(path)?;
        self.update_from_json_str(&json)
    }

    pub fn to_json_string(&self) -> GbalResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> GbalResult<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, patch) => *base = patch,
    }
}

impl TryFrom<ParametersRecord> for BalanceComputationParameters {
    type Error = GbalError;

    fn try_from(record: ParametersRecord) -> GbalResult<Self> {
        if record.version != PARAMETERS_VERSION {
            return Err(GbalError::Config(format!(
                "unsupported balance computation parameters version '{}'",
                record.version
            )));
        }
        let mut parameters =
            Self::new(record.threshold_net_position, record.max_number_iterations)?;
        parameters.mismatch_mode = record.mismatch_mode;
        parameters.with_load_flow = record.with_load_flow;
        parameters.load_flow_parameters = record.load_flow_parameters;
        parameters.scaling_parameters = record.scaling_parameters;
        Ok(parameters)
    }
}

impl From<BalanceComputationParameters> for ParametersRecord {
    fn from(parameters: BalanceComputationParameters) -> Self {
        Self {
            version: PARAMETERS_VERSION.to_string(),
            threshold_net_position: parameters.threshold_net_position,
            max_number_iterations: parameters.max_number_iterations,
            mismatch_mode: parameters.mismatch_mode,
            with_load_flow: parameters.with_load_flow,
            load_flow_parameters: parameters.load_flow_parameters,
            scaling_parameters: parameters.scaling_parameters,
        }
    }
}
