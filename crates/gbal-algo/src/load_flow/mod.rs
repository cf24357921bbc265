//! Load-flow abstraction used by the balance computation.
//!
//! A [`LoadFlowRunner`] solves one variant of a network in place (writing
//! terminal flows and bus angles) and reports a status per synchronous
//! component. [`DcLoadFlow`] is the built-in linear implementation.

mod dc;

pub use dc::DcLoadFlow;

use gbal_core::{BusId, GbalResult, Network, SolverKind};
use serde::{Deserialize, Serialize};

/// How a component's active power imbalance is shared out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceType {
    /// Generators in proportion to their maximum active power
    #[default]
    ProportionalToGenerationPMax,
    /// Generators in proportion to their active power target
    ProportionalToGenerationP,
    /// Loads in proportion to their P0
    ProportionalToLoad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadFlowParameters {
    /// Spread the imbalance over participating injections instead of the
    /// reference bus alone
    pub distributed_slack: bool,
    pub balance_type: BalanceType,
    /// Linear backend for the DC solve
    pub solver: SolverKind,
}

impl Default for LoadFlowParameters {
    fn default() -> Self {
        Self {
            distributed_slack: true,
            balance_type: BalanceType::default(),
            solver: SolverKind::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentStatus {
    Converged,
    MaxIterationReached,
    Failed,
    NoCalculation,
}

/// Outcome of the load flow on one synchronous component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResult {
    pub connected_component_num: usize,
    pub synchronous_component_num: usize,
    pub status: ComponentStatus,
    pub iteration_count: usize,
    pub reference_bus: Option<BusId>,
    /// Active power shared out by the distributed slack (MW)
    pub distributed_active_power: f64,
    /// Imbalance left on the reference bus (MW)
    pub slack_bus_active_power_mismatch: f64,
}

impl ComponentResult {
    pub fn is_converged(&self) -> bool {
        self.status == ComponentStatus::Converged
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFlowResult {
    /// At least one component converged
    pub ok: bool,
    pub component_results: Vec<ComponentResult>,
}

impl LoadFlowResult {
    pub fn from_components(component_results: Vec<ComponentResult>) -> Self {
        Self {
            ok: component_results.iter().any(ComponentResult::is_converged),
            component_results,
        }
    }

    pub fn component(&self, synchronous_component_num: usize) -> Option<&ComponentResult> {
        self.component_results
            .iter()
            .find(|c| c.synchronous_component_num == synchronous_component_num)
    }
}

/// Solves a network variant in place.
pub trait LoadFlowRunner: Send + Sync {
    fn name(&self) -> &str;

    /// Solve `variant_id`, leaving the network's working variant unchanged.
    fn run(
        &self,
        network: &mut Network,
        variant_id: &str,
        parameters: &LoadFlowParameters,
    ) -> GbalResult<LoadFlowResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(num: usize, status: ComponentStatus) -> ComponentResult {
        ComponentResult {
            connected_component_num: num,
            synchronous_component_num: num,
            status,
            iteration_count: 1,
            reference_bus: None,
            distributed_active_power: 0.0,
            slack_bus_active_power_mismatch: 0.0,
        }
    }

    #[test]
    fn result_is_ok_when_any_component_converges() {
        let result = LoadFlowResult::from_components(vec![
            component(0, ComponentStatus::Failed),
            component(1, ComponentStatus::Converged),
        ]);
        assert!(result.ok);
        assert_eq!(result.component(0).unwrap().status, ComponentStatus::Failed);

        let result = LoadFlowResult::from_components(vec![]);
        assert!(!result.ok);
    }

    #[test]
    fn parameters_json_uses_camel_case_and_defaults() {
        let params: LoadFlowParameters =
            serde_json::from_str(r#"{"balanceType":"PROPORTIONAL_TO_LOAD"}"#).unwrap();
        assert!(params.distributed_slack);
        assert_eq!(params.balance_type, BalanceType::ProportionalToLoad);
        assert_eq!(params.solver, SolverKind::Gauss);

        let json = serde_json::to_value(LoadFlowParameters::default()).unwrap();
        assert_eq!(json["distributedSlack"], true);
        assert_eq!(json["solver"], "gauss");
    }
}
