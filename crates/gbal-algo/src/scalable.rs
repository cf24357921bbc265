//! Scalables: how a requested change of injection is spread over the network.
//!
//! Positive amounts follow the generator convention (more injection). A
//! scalable returns the amount it actually applied, which may be less than
//! requested when limits are reached.

use gbal_core::{GbalError, GbalResult, GenId, LoadId, Megavars, Megawatts, Network};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

const EPSILON_MW: f64 = 1e-9;
const PERCENTAGE_TOLERANCE: f64 = 0.01;
const MAX_REDISTRIBUTION_PASSES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalingParameters {
    /// Keep Q0/P0 constant when a load is scaled
    pub constant_power_factor: bool,
    pub allows_generator_out_of_active_power_limits: bool,
}

/// An injection a scalable may modify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Injection {
    Generator(GenId),
    Load(LoadId),
}

impl std::fmt::Display for Injection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Injection::Generator(id) => write!(f, "{}", id),
            Injection::Load(id) => write!(f, "{}", id),
        }
    }
}

pub trait Scalable: Send + Sync + std::fmt::Debug {
    /// Apply `asked` MW to the working variant and return what was applied.
    fn scale(
        &self,
        network: &mut Network,
        asked: f64,
        parameters: &ScalingParameters,
    ) -> GbalResult<f64>;

    /// Injections this scalable may touch.
    fn injections(&self) -> BTreeSet<Injection>;
}

#[derive(Debug, Clone)]
pub struct GeneratorScalable {
    id: GenId,
}

impl GeneratorScalable {
    pub fn new(id: GenId) -> Self {
        Self { id }
    }
}

impl Scalable for GeneratorScalable {
    fn scale(
        &self,
        network: &mut Network,
        asked: f64,
        parameters: &ScalingParameters,
    ) -> GbalResult<f64> {
        let gen = network
            .gen_mut(self.id)
            .ok_or_else(|| GbalError::Network(format!("unknown generator {}", self.id)))?;
        if !gen.status {
            tracing::debug!(generator = %self.id, "generator out of service, not scaled");
            return Ok(0.0);
        }

        let target = gen.active_power.value();
        let done = if parameters.allows_generator_out_of_active_power_limits {
            asked
        } else if asked >= 0.0 {
            asked.min((gen.pmax.value() - target).max(0.0))
        } else {
            -(-asked).min((target - gen.pmin.value()).max(0.0))
        };
        gen.active_power = Megawatts(target + done);
        Ok(done)
    }

    fn injections(&self) -> BTreeSet<Injection> {
        BTreeSet::from([Injection::Generator(self.id)])
    }
}

#[derive(Debug, Clone)]
pub struct LoadScalable {
    id: LoadId,
}

impl LoadScalable {
    pub fn new(id: LoadId) -> Self {
        Self { id }
    }
}

impl Scalable for LoadScalable {
    fn scale(
        &self,
        network: &mut Network,
        asked: f64,
        parameters: &ScalingParameters,
    ) -> GbalResult<f64> {
        let load = network
            .load_mut(self.id)
            .ok_or_else(|| GbalError::Network(format!("unknown load {}", self.id)))?;
        if !load.status {
            tracing::debug!(load = %self.id, "load out of service, not scaled");
            return Ok(0.0);
        }

        let p0 = load.active_power.value();
        // more injection means less consumption, down to zero
        let done = if asked > 0.0 {
            asked.min(p0.max(0.0))
        } else {
            asked
        };
        let new_p0 = p0 - done;
        if parameters.constant_power_factor && p0 != 0.0 {
            load.reactive_power = Megavars(load.reactive_power.value() * new_p0 / p0);
        }
        load.active_power = Megawatts(new_p0);
        Ok(done)
    }

    fn injections(&self) -> BTreeSet<Injection> {
        BTreeSet::from([Injection::Load(self.id)])
    }
}

/// Splits the request over member scalables by fixed percentages.
///
/// Whatever a saturated member cannot absorb is re-split over the members
/// that still can, for a bounded number of passes.
#[derive(Debug, Clone)]
pub struct ProportionalScalable {
    members: Vec<(f64, Arc<dyn Scalable>)>,
}

impl ProportionalScalable {
    pub fn new(percentages: Vec<f64>, scalables: Vec<Arc<dyn Scalable>>) -> GbalResult<Self> {
        if percentages.len() != scalables.len() {
            return Err(GbalError::Config(format!(
                "{} percentages given for {} scalables",
                percentages.len(),
                scalables.len()
            )));
        }
        if scalables.is_empty() {
            return Err(GbalError::Config(
                "proportional scalable needs at least one member".into(),
            ));
        }
        if percentages.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(GbalError::Config(
                "percentages must be finite and non-negative".into(),
            ));
        }
        let total: f64 = percentages.iter().sum();
        if (total - 100.0).abs() > PERCENTAGE_TOLERANCE {
            return Err(GbalError::Config(format!(
                "sum of percentages must be 100, got {:.4}",
                total
            )));
        }
        Ok(Self {
            members: percentages.into_iter().zip(scalables).collect(),
        })
    }

    pub fn percentages(&self) -> Vec<f64> {
        self.members.iter().map(|(p, _)| *p).collect()
    }
}

impl Scalable for ProportionalScalable {
    fn scale(
        &self,
        network: &mut Network,
        asked: f64,
        parameters: &ScalingParameters,
    ) -> GbalResult<f64> {
        let mut active = vec![true; self.members.len()];
        let mut remaining = asked;
        let mut done_total = 0.0;

        for _ in 0..MAX_REDISTRIBUTION_PASSES {
            let active_share: f64 = self
                .members
                .iter()
                .zip(&active)
                .filter_map(|((p, _), is_active)| (*is_active).then_some(*p))
                .sum();
            if remaining.abs() < EPSILON_MW || active_share <= 0.0 {
                break;
            }

            let to_split = remaining;
            for (i, (percentage, scalable)) in self.members.iter().enumerate() {
                if !active[i] {
                    continue;
                }
                let member_asked = to_split * percentage / active_share;
                let done = scalable.scale(network, member_asked, parameters)?;
                if (done - member_asked).abs() > EPSILON_MW {
                    active[i] = false;
                }
                remaining -= done;
                done_total += done;
            }
        }
        Ok(done_total)
    }

    fn injections(&self) -> BTreeSet<Injection> {
        self.members
            .iter()
            .flat_map(|(_, s)| s.injections())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fr_be_network;

    fn target(network: &Network, id: usize) -> f64 {
        network.gen(GenId::new(id)).unwrap().active_power.value()
    }

    #[test]
    fn generator_scaling_stops_at_pmax() {
        let mut network = fr_be_network();
        let scalable = GeneratorScalable::new(GenId::new(1));
        let done = scalable
            .scale(&mut network, 1500.0, &ScalingParameters::default())
            .unwrap();
        assert_eq!(done, 1000.0);
        assert_eq!(target(&network, 1), 4000.0);

        let unlimited = ScalingParameters {
            allows_generator_out_of_active_power_limits: true,
            ..ScalingParameters::default()
        };
        let done = scalable.scale(&mut network, 500.0, &unlimited).unwrap();
        assert_eq!(done, 500.0);
        assert_eq!(target(&network, 1), 4500.0);
    }

    #[test]
    fn generator_scaling_down_stops_at_pmin() {
        let mut network = fr_be_network();
        let done = GeneratorScalable::new(GenId::new(2))
            .scale(&mut network, -2000.0, &ScalingParameters::default())
            .unwrap();
        assert_eq!(done, -1500.0);
        assert_eq!(target(&network, 2), 0.0);
    }

    #[test]
    fn load_scaling_uses_injection_sign_and_power_factor() {
        let mut network = fr_be_network();
        let params = ScalingParameters {
            constant_power_factor: true,
            ..ScalingParameters::default()
        };
        let done = LoadScalable::new(LoadId::new(1))
            .scale(&mut network, 900.0, &params)
            .unwrap();
        assert_eq!(done, 900.0);
        let load = network.load(LoadId::new(1)).unwrap();
        assert_eq!(load.active_power.value(), 900.0);
        assert!((load.reactive_power.value() - 50.0).abs() < 1e-9);

        let done = LoadScalable::new(LoadId::new(1))
            .scale(&mut network, 5000.0, &params)
            .unwrap();
        assert_eq!(done, 900.0);
        assert_eq!(network.load(LoadId::new(1)).unwrap().active_power.value(), 0.0);
    }

    #[test]
    fn unknown_element_is_an_error() {
        let mut network = fr_be_network();
        let err = GeneratorScalable::new(GenId::new(42))
            .scale(&mut network, 1.0, &ScalingParameters::default())
            .unwrap_err();
        assert!(matches!(err, GbalError::Network(_)));
    }

    #[test]
    fn proportional_split_and_redistribution() {
        let mut network = fr_be_network();
        let scalable = ProportionalScalable::new(
            vec![60.0, 40.0],
            vec![
                Arc::new(GeneratorScalable::new(GenId::new(1))),
                Arc::new(LoadScalable::new(LoadId::new(1))),
            ],
        )
        .unwrap();
        let done = scalable
            .scale(&mut network, 100.0, &ScalingParameters::default())
            .unwrap();
        assert!((done - 100.0).abs() < 1e-9);
        assert!((target(&network, 1) - 3060.0).abs() < 1e-9);
        assert!((network.load(LoadId::new(1)).unwrap().active_power.value() - 1760.0).abs() < 1e-9);

        // generator saturates at 4000: the load takes the rest
        let done = scalable
            .scale(&mut network, 2000.0, &ScalingParameters::default())
            .unwrap();
        assert!((done - 2000.0).abs() < 1e-6);
        assert!((target(&network, 1) - 4000.0).abs() < 1e-9);
        assert!((network.load(LoadId::new(1)).unwrap().active_power.value() - 700.0).abs() < 1e-6);
    }

    #[test]
    fn proportional_rejects_bad_percentages() {
        let members: Vec<Arc<dyn Scalable>> = vec![
            Arc::new(GeneratorScalable::new(GenId::new(1))),
            Arc::new(GeneratorScalable::new(GenId::new(2))),
        ];
        assert!(ProportionalScalable::new(vec![50.0, 49.0], members.clone()).is_err());
        assert!(ProportionalScalable::new(vec![100.0], members.clone()).is_err());
        assert!(ProportionalScalable::new(vec![50.0, 50.005], members).is_ok());
    }

    #[test]
    fn injections_are_collected_from_members() {
        let scalable = ProportionalScalable::new(
            vec![50.0, 50.0],
            vec![
                Arc::new(GeneratorScalable::new(GenId::new(1))),
                Arc::new(LoadScalable::new(LoadId::new(1))),
            ],
        )
        .unwrap();
        let injections = scalable.injections();
        assert!(injections.contains(&Injection::Generator(GenId::new(1))));
        assert!(injections.contains(&Injection::Load(LoadId::new(1))));
    }
}
