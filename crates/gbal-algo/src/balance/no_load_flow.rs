use super::{
    validate_areas, BalanceComputation, BalanceComputationArea, BalanceComputationParameters,
    BalanceComputationResult,
};
use crate::area::NetworkArea;
use crate::scalable::Injection;
use futures::future::{BoxFuture, FutureExt};
use gbal_core::{GbalError, GbalResult, Network};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Single scaling pass without load flow.
///
/// Net positions are measured once; each area then receives its mismatch
/// through its scalable, directly on the requested variant.
#[derive(Debug)]
pub struct NoLoadFlowBalanceComputation {
    areas: Vec<BalanceComputationArea>,
}

impl NoLoadFlowBalanceComputation {
    /// Areas must not scale the same injection.
    pub fn new(areas: Vec<BalanceComputationArea>) -> GbalResult<Self> {
        validate_areas(&areas)?;
        let mut owners: HashMap<Injection, &str> = HashMap::new();
        for area in &areas {
            for injection in area.scalable().injections() {
                if let Some(owner) = owners.insert(injection, area.name()) {
                    return Err(GbalError::Config(format!(
                        "{} is scaled by both '{}' and '{}'",
                        injection,
                        owner,
                        area.name()
                    )));
                }
            }
        }
        Ok(Self { areas })
    }

    pub fn areas(&self) -> &[BalanceComputationArea] {
        &self.areas
    }

    fn balance(
        &self,
        network: &mut Network,
        parameters: &BalanceComputationParameters,
    ) -> GbalResult<BalanceComputationResult> {
        let network_areas = self
            .areas
            .iter()
            .map(|area| area.network_area_factory().create(network))
            .collect::<GbalResult<Vec<Box<dyn NetworkArea>>>>()?;

        let snapshot: &Network = network;
        let offsets: Vec<f64> = self
            .areas
            .par_iter()
            .zip(network_areas.par_iter())
            .map(|(area, network_area)| {
                area.target_net_position() - network_area.net_position(snapshot)
            })
            .collect();

        let mut applied = BTreeMap::new();
        for (area, offset) in self.areas.iter().zip(offsets) {
            let done = area
                .scalable()
                .scale(network, offset, &parameters.scaling_parameters)?;
            tracing::info!(area = %area.name(), offset, done, "scaling");
            applied.insert(area.name().to_string(), done);
        }
        Ok(BalanceComputationResult::success(1, applied))
    }
}

impl BalanceComputation for NoLoadFlowBalanceComputation {
    fn run<'a>(
        &'a self,
        network: &'a mut Network,
        working_state_id: &'a str,
        parameters: &'a BalanceComputationParameters,
    ) -> BoxFuture<'a, GbalResult<BalanceComputationResult>> {
        async move {
            network.with_working_variant(working_state_id, |n| self.balance(n, parameters))?
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::CountryAreaFactory;
    use crate::scalable::{GeneratorScalable, LoadScalable, ProportionalScalable, Scalable};
    use crate::test_utils::fr_be_network;
    use gbal_core::{Country, GenId, LoadId, INITIAL_VARIANT_ID};
    use std::sync::Arc;

    fn area(code: &str, scalable: Arc<dyn Scalable>, target: f64) -> BalanceComputationArea {
        BalanceComputationArea::new(
            code,
            Arc::new(
                CountryAreaFactory::new([Country::new(code).unwrap()])
                    .unwrap()
                    .as_static(),
            ),
            scalable,
            target,
        )
    }

    #[test]
    fn overlapping_injections_are_rejected() {
        let shared: Arc<dyn Scalable> = Arc::new(GeneratorScalable::new(GenId::new(1)));
        let proportional: Arc<dyn Scalable> = Arc::new(
            ProportionalScalable::new(
                vec![50.0, 50.0],
                vec![
                    Arc::new(GeneratorScalable::new(GenId::new(1))),
                    Arc::new(LoadScalable::new(LoadId::new(2))),
                ],
            )
            .unwrap(),
        );
        let err = NoLoadFlowBalanceComputation::new(vec![
            area("FR", shared, 0.0),
            area("BE", proportional, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, GbalError::Config(_)));
    }

    #[test]
    fn single_pass_scales_the_requested_variant() {
        let mut network = fr_be_network();
        network
            .clone_variant(INITIAL_VARIANT_ID, "target", false)
            .unwrap();
        let computation = NoLoadFlowBalanceComputation::new(vec![
            area("FR", Arc::new(GeneratorScalable::new(GenId::new(1))), 1300.0),
            area("BE", Arc::new(GeneratorScalable::new(GenId::new(2))), -1300.0),
        ])
        .unwrap();
        let result = futures::executor::block_on(computation.run(
            &mut network,
            "target",
            &BalanceComputationParameters::default(),
        ))
        .unwrap();

        assert!(result.is_success());
        assert_eq!(result.iteration_count(), 1);
        assert_eq!(result.balanced_scaling_map()["FR"], 100.0);
        assert_eq!(result.balanced_scaling_map()["BE"], -100.0);

        assert_eq!(network.working_variant_id(), INITIAL_VARIANT_ID);
        assert_eq!(network.gen(GenId::new(1)).unwrap().active_power.value(), 3000.0);
        network.set_working_variant("target").unwrap();
        assert_eq!(network.gen(GenId::new(1)).unwrap().active_power.value(), 3100.0);
        assert_eq!(network.gen(GenId::new(2)).unwrap().active_power.value(), 1400.0);
    }
}
