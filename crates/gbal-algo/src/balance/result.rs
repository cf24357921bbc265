use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceComputationStatus {
    Success,
    Failed,
}

/// Outcome of a balance computation.
///
/// The scaling map holds, per area name, the amount requested from the
/// area's scalable.
///
/// With the load flow enabled this is the accumulated mismatch of the
/// committed iterations. With the load flow skipped, the measured mismatches
/// are scaled once and committed without verification, and the map reports
/// the requested amounts even where a scalable could not deliver them in full.
/// The single-pass computation reports the amounts actually applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceComputationResult {
    status: BalanceComputationStatus,
    iteration_count: usize,
    balanced_scaling_map: BTreeMap<String, f64>,
}

impl BalanceComputationResult {
    pub fn new(
        status: BalanceComputationStatus,
        iteration_count: usize,
        balanced_scaling_map: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            status,
            iteration_count,
            balanced_scaling_map,
        }
    }

    pub fn success(iteration_count: usize, balanced_scaling_map: BTreeMap<String, f64>) -> Self {
        Self::new(BalanceComputationStatus::Success, iteration_count, balanced_scaling_map)
    }

    pub fn failed(iteration_count: usize, balanced_scaling_map: BTreeMap<String, f64>) -> Self {
        Self::new(BalanceComputationStatus::Failed, iteration_count, balanced_scaling_map)
    }

    pub fn status(&self) -> BalanceComputationStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == BalanceComputationStatus::Success
    }

    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    pub fn balanced_scaling_map(&self) -> &BTreeMap<String, f64> {
        &self.balanced_scaling_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_for_reports() {
        let result = BalanceComputationResult::success(2, BTreeMap::from([("FR".to_string(), 100.0)]));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["iterationCount"], 2);
        assert_eq!(json["balancedScalingMap"]["FR"], 100.0);
        assert!(!BalanceComputationResult::failed(5, BTreeMap::new()).is_success());
    }
}
