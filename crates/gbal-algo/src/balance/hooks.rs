//! Overridable decisions of the iterative balance computation.
//!
//! Both hooks are plain traits with blanket impls for closures, so a caller
//! can pass either a strategy type or a function.

use super::parameters::{BalanceComputationParameters, MismatchMode};
use crate::load_flow::LoadFlowResult;
use gbal_core::{GbalError, GbalResult};
use std::collections::BTreeMap;

/// State of one run, as seen by the hooks.
#[derive(Debug, Clone)]
pub struct RunningContext {
    pub(crate) iteration: usize,
    pub(crate) parameters: BalanceComputationParameters,
    pub(crate) mismatches: BTreeMap<String, f64>,
    pub(crate) offsets: BTreeMap<String, f64>,
}

impl RunningContext {
    pub fn new(parameters: BalanceComputationParameters) -> Self {
        Self {
            iteration: 0,
            parameters,
            mismatches: BTreeMap::new(),
            offsets: BTreeMap::new(),
        }
    }

    /// Iterations completed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn parameters(&self) -> &BalanceComputationParameters {
        &self.parameters
    }

    /// Latest `target − net position` per area.
    pub fn mismatches(&self) -> &BTreeMap<String, f64> {
        &self.mismatches
    }

    /// Accumulated scaling request per area.
    pub fn offsets(&self) -> &BTreeMap<String, f64> {
        &self.offsets
    }

    pub(crate) fn record_mismatch(&mut self, area: &str, mismatch: f64) {
        self.mismatches.insert(area.to_string(), mismatch);
        *self.offsets.entry(area.to_string()).or_insert(0.0) += mismatch;
    }
}

/// Decides whether a load-flow result can be used to measure net positions.
pub trait LoadFlowAcceptance: Send + Sync {
    fn is_acceptable(&self, context: &RunningContext, result: &LoadFlowResult) -> GbalResult<bool>;
}

impl<F> LoadFlowAcceptance for F
where
    F: Fn(&RunningContext, &LoadFlowResult) -> GbalResult<bool> + Send + Sync,
{
    fn is_acceptable(&self, context: &RunningContext, result: &LoadFlowResult) -> GbalResult<bool> {
        self(context, result)
    }
}

/// Accepts a result when the main synchronous component converged.
#[derive(Debug, Clone, Copy, Default)]
pub struct MainComponentConverged;

impl LoadFlowAcceptance for MainComponentConverged {
    fn is_acceptable(&self, _context: &RunningContext, result: &LoadFlowResult) -> GbalResult<bool> {
        let mut main = result
            .component_results
            .iter()
            .filter(|c| c.synchronous_component_num == 0);
        match (main.next(), main.next()) {
            (None, _) => Ok(false),
            (Some(component), None) => Ok(component.is_converged()),
            (Some(_), Some(_)) => Err(GbalError::Solver(
                "load flow reported more than one main synchronous component".into(),
            )),
        }
    }
}

/// Folds per-area mismatches into the value compared with the threshold.
pub trait MismatchAggregator: Send + Sync {
    fn total_mismatch(&self, context: &RunningContext) -> f64;
}

impl<F> MismatchAggregator for F
where
    F: Fn(&RunningContext) -> f64 + Send + Sync,
{
    fn total_mismatch(&self, context: &RunningContext) -> f64 {
        self(context)
    }
}

/// Aggregates according to the run's [`MismatchMode`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ByMismatchMode;

impl MismatchAggregator for ByMismatchMode {
    fn total_mismatch(&self, context: &RunningContext) -> f64 {
        let mismatches = context.mismatches.values();
        match context.parameters.mismatch_mode {
            MismatchMode::Squared => mismatches.map(|m| m * m).sum(),
            MismatchMode::Max => mismatches.map(|m| m.abs()).fold(0.0, f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_flow::{ComponentResult, ComponentStatus};

    fn context(mode: MismatchMode, mismatches: &[(&str, f64)]) -> RunningContext {
        let mut parameters = BalanceComputationParameters::default();
        parameters.mismatch_mode = mode;
        let mut context = RunningContext::new(parameters);
        for (area, mismatch) in mismatches {
            context.record_mismatch(area, *mismatch);
        }
        context
    }

    fn component(sync: usize, status: ComponentStatus) -> ComponentResult {
        ComponentResult {
            connected_component_num: sync,
            synchronous_component_num: sync,
            status,
            iteration_count: 1,
            reference_bus: None,
            distributed_active_power: 0.0,
            slack_bus_active_power_mismatch: 0.0,
        }
    }

    #[test]
    fn squared_and_max_aggregation() {
        let squared = context(MismatchMode::Squared, &[("A", 3.0), ("B", -4.0)]);
        assert_eq!(ByMismatchMode.total_mismatch(&squared), 25.0);
        let max = context(MismatchMode::Max, &[("A", 3.0), ("B", -4.0)]);
        assert_eq!(ByMismatchMode.total_mismatch(&max), 4.0);
        assert_eq!(ByMismatchMode.total_mismatch(&context(MismatchMode::Max, &[])), 0.0);
    }

    #[test]
    fn offsets_accumulate() {
        let mut context = context(MismatchMode::Squared, &[("A", 3.0)]);
        context.record_mismatch("A", -1.0);
        assert_eq!(context.offsets()["A"], 2.0);
        assert_eq!(context.mismatches()["A"], -1.0);
    }

    #[test]
    fn main_component_decides_acceptance() {
        let context = context(MismatchMode::Squared, &[]);
        let converged = LoadFlowResult::from_components(vec![
            component(0, ComponentStatus::Converged),
            component(1, ComponentStatus::Failed),
        ]);
        assert!(MainComponentConverged.is_acceptable(&context, &converged).unwrap());

        let failed = LoadFlowResult::from_components(vec![
            component(0, ComponentStatus::MaxIterationReached),
            component(1, ComponentStatus::Converged),
        ]);
        assert!(!MainComponentConverged.is_acceptable(&context, &failed).unwrap());

        let empty = LoadFlowResult::from_components(vec![]);
        assert!(!MainComponentConverged.is_acceptable(&context, &empty).unwrap());

        let duplicated = LoadFlowResult::from_components(vec![
            component(0, ComponentStatus::Converged),
            component(0, ComponentStatus::Converged),
        ]);
        assert!(MainComponentConverged.is_acceptable(&context, &duplicated).is_err());
    }

    #[test]
    fn closures_are_hooks() {
        let all_converged = |_: &RunningContext, result: &LoadFlowResult| -> GbalResult<bool> {
            Ok(result.component_results.iter().all(ComponentResult::is_converged))
        };
        let result = LoadFlowResult::from_components(vec![
            component(0, ComponentStatus::Converged),
            component(1, ComponentStatus::Failed),
        ]);
        let context = context(MismatchMode::Squared, &[("A", -7.0)]);
        assert!(!all_converged.is_acceptable(&context, &result).unwrap());

        let first = |context: &RunningContext| -> f64 {
            context.mismatches().values().next().copied().unwrap_or(0.0)
        };
        assert_eq!(first.total_mismatch(&context), -7.0);
    }
}
