use super::hooks::{
    ByMismatchMode, LoadFlowAcceptance, MainComponentConverged, MismatchAggregator,
    RunningContext,
};
use super::{
    validate_areas, BalanceComputation, BalanceComputationArea, BalanceComputationParameters,
    BalanceComputationResult, WorkingCopy,
};
use crate::area::NetworkArea;
use crate::load_flow::{LoadFlowResult, LoadFlowRunner};
use futures::future::{BoxFuture, FutureExt};
use gbal_core::{GbalResult, Network};
use std::sync::Arc;

/// Iterative balance computation coupled with a load flow.
pub struct BalanceComputationImpl {
    areas: Vec<BalanceComputationArea>,
    load_flow: Arc<dyn LoadFlowRunner>,
    acceptance: Arc<dyn LoadFlowAcceptance>,
    aggregator: Arc<dyn MismatchAggregator>,
}

impl std::fmt::Debug for BalanceComputationImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceComputationImpl")
            .field("areas", &self.areas)
            .field("load_flow", &self.load_flow.name())
            .finish()
    }
}

/// Round up to two decimals for reporting.
fn round_up(value: f64) -> f64 {
    (value * 100.0).ceil() / 100.0
}

impl BalanceComputationImpl {
    pub fn new(
        areas: Vec<BalanceComputationArea>,
        load_flow: Arc<dyn LoadFlowRunner>,
    ) -> GbalResult<Self> {
        validate_areas(&areas)?;
        Ok(Self {
            areas,
            load_flow,
            acceptance: Arc::new(MainComponentConverged),
            aggregator: Arc::new(ByMismatchMode),
        })
    }

    pub fn with_load_flow_acceptance(mut self, acceptance: impl LoadFlowAcceptance + 'static) -> Self {
        self.acceptance = Arc::new(acceptance);
        self
    }

    pub fn with_mismatch_aggregator(mut self, aggregator: impl MismatchAggregator + 'static) -> Self {
        self.aggregator = Arc::new(aggregator);
        self
    }

    pub fn areas(&self) -> &[BalanceComputationArea] {
        &self.areas
    }

    fn balance(
        &self,
        network: &mut Network,
        working_state_id: &str,
        parameters: &BalanceComputationParameters,
    ) -> GbalResult<BalanceComputationResult> {
        let mut context = RunningContext::new(parameters.clone());
        if parameters.max_number_iterations() == 0 {
            tracing::warn!("maximum number of iterations is 0, nothing to do");
            return Ok(BalanceComputationResult::failed(0, context.offsets));
        }

        let mut copy = WorkingCopy::check_out(network, working_state_id)?;
        let outcome = self.iterate(&mut copy, &mut context);
        let released = copy.finish();
        let result = outcome?;
        released?;
        Ok(result)
    }

    fn iterate(
        &self,
        copy: &mut WorkingCopy<'_>,
        context: &mut RunningContext,
    ) -> GbalResult<BalanceComputationResult> {
        let network_areas = self
            .areas
            .iter()
            .map(|area| area.network_area_factory().create(copy.network()))
            .collect::<GbalResult<Vec<Box<dyn NetworkArea>>>>()?;

        loop {
            self.scale(copy.network_mut(), context)?;

            if context.parameters.with_load_flow {
                let variant_id = copy.variant_id().to_string();
                let result = self.load_flow.run(
                    copy.network_mut(),
                    &variant_id,
                    &context.parameters.load_flow_parameters,
                )?;
                log_load_flow(self.load_flow.name(), context.iteration, &result);
                if !self.acceptance.is_acceptable(context, &result)? {
                    tracing::error!(
                        iteration = context.iteration,
                        "load flow result not acceptable, balancing stopped"
                    );
                    return Ok(BalanceComputationResult::failed(
                        context.iteration,
                        context.offsets.clone(),
                    ));
                }
            }

            for (area, network_area) in self.areas.iter().zip(&network_areas) {
                let balance = network_area.net_position(copy.network());
                let mismatch = area.target_net_position() - balance;
                tracing::info!(
                    area = %area.name(),
                    target = area.target_net_position(),
                    balance,
                    mismatch,
                    "mismatch"
                );
                context.record_mismatch(area.name(), mismatch);
            }
            let total_mismatch = self.aggregator.total_mismatch(context);
            context.iteration += 1;

            if !context.parameters.with_load_flow {
                // nothing to check against: apply the measured mismatches once
                self.scale(copy.network_mut(), context)?;
            }
            if !context.parameters.with_load_flow
                || total_mismatch < context.parameters.threshold_net_position()
            {
                copy.commit()?;
                tracing::info!(
                    iterations = context.iteration,
                    total_mismatch = round_up(total_mismatch),
                    "areas are balanced"
                );
                return Ok(BalanceComputationResult::success(
                    context.iteration,
                    context.offsets.clone(),
                ));
            }

            copy.rollback()?;
            if context.iteration >= context.parameters.max_number_iterations() {
                tracing::error!(
                    iterations = context.iteration,
                    total_mismatch = round_up(total_mismatch),
                    "areas are unbalanced"
                );
                return Ok(BalanceComputationResult::failed(
                    context.iteration,
                    context.offsets.clone(),
                ));
            }
        }
    }

    fn scale(&self, network: &mut Network, context: &RunningContext) -> GbalResult<()> {
        for area in &self.areas {
            let offset = context.offsets.get(area.name()).copied().unwrap_or(0.0);
            if offset == 0.0 {
                continue;
            }
            let done = area
                .scalable()
                .scale(network, offset, &context.parameters.scaling_parameters)?;
            tracing::info!(area = %area.name(), offset, done, "scaling");
        }
        Ok(())
    }
}

fn log_load_flow(name: &str, iteration: usize, result: &LoadFlowResult) {
    for component in &result.component_results {
        tracing::info!(
            load_flow = name,
            iteration,
            connected_component = component.connected_component_num,
            synchronous_component = component.synchronous_component_num,
            status = ?component.status,
            "load flow component"
        );
    }
}

impl BalanceComputation for BalanceComputationImpl {
    fn run<'a>(
        &'a self,
        network: &'a mut Network,
        working_state_id: &'a str,
        parameters: &'a BalanceComputationParameters,
    ) -> BoxFuture<'a, GbalResult<BalanceComputationResult>> {
        async move { self.balance(network, working_state_id, parameters) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_are_rounded_up() {
        assert_eq!(round_up(0.001), 0.01);
        assert_eq!(round_up(2.5), 2.5);
        assert_eq!(round_up(0.0), 0.0);
    }
}
