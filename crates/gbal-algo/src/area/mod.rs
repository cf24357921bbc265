//! Network areas and their net positions.
//!
//! A [`NetworkArea`] is built from one network state by a
//! [`NetworkAreaFactory`]. It keeps handles on the elements that define its
//! boundary and reads their current values each time the net position is
//! asked for. Positive net positions are exports.

mod border;
mod control;
mod injection;

pub use border::BorderArea;
pub use control::{ControlArea, ControlAreaDescriptor, ControlAreaFactory};
pub use injection::InjectionArea;

use crate::scalable::{LoadScalable, ProportionalScalable, Scalable};
use gbal_core::{Bus, BusId, Country, GbalError, GbalResult, Load, Network};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub trait NetworkArea: Send + Sync + fmt::Debug {
    /// Power leaving the area (MW), positive for export.
    fn net_position(&self, network: &Network) -> f64;

    /// Buses that belong to the area. Empty when the area does not track them.
    fn contained_buses(&self) -> &BTreeSet<BusId>;
}

/// Builds an area against the network state it is given.
pub trait NetworkAreaFactory: Send + Sync + fmt::Debug {
    fn create(&self, network: &Network) -> GbalResult<Box<dyn NetworkArea>>;
}

/// Which buses an area is made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaMembership {
    Countries(BTreeSet<Country>),
    VoltageLevels(BTreeSet<String>),
}

impl AreaMembership {
    /// Whether `bus` is inside, or `None` when the bus cannot be placed.
    ///
    /// Buses without a country are never placed by a country membership.
    pub fn side(&self, bus: &Bus) -> Option<bool> {
        match self {
            AreaMembership::Countries(countries) => {
                bus.country.as_ref().map(|c| countries.contains(c))
            }
            AreaMembership::VoltageLevels(ids) => Some(ids.contains(&bus.voltage_level)),
        }
    }

    pub fn contains(&self, bus: &Bus) -> bool {
        self.side(bus).unwrap_or(false)
    }

    /// First country or voltage level present in both memberships.
    pub fn shared_with(&self, other: &AreaMembership) -> Option<String> {
        match (self, other) {
            (AreaMembership::Countries(a), AreaMembership::Countries(b)) => {
                a.intersection(b).next().map(|c| c.to_string())
            }
            (AreaMembership::VoltageLevels(a), AreaMembership::VoltageLevels(b)) => {
                a.intersection(b).next().cloned()
            }
            _ => None,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            AreaMembership::Countries(c) => c.is_empty(),
            AreaMembership::VoltageLevels(v) => v.is_empty(),
        }
    }
}

impl fmt::Display for AreaMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = match self {
            AreaMembership::Countries(c) => c.iter().map(ToString::to_string).collect(),
            AreaMembership::VoltageLevels(v) => v.iter().cloned().collect(),
        };
        write!(f, "[{}]", names.join(", "))
    }
}

fn build_area(
    network: &Network,
    membership: &AreaMembership,
    is_static: bool,
) -> Box<dyn NetworkArea> {
    if is_static {
        Box::new(InjectionArea::new(network, membership))
    } else {
        Box::new(BorderArea::new(network, membership.clone()))
    }
}

/// Area made of every bus located in a set of countries.
#[derive(Debug, Clone)]
pub struct CountryAreaFactory {
    membership: AreaMembership,
    is_static: bool,
}

impl CountryAreaFactory {
    pub fn new(countries: impl IntoIterator<Item = Country>) -> GbalResult<Self> {
        let membership = AreaMembership::Countries(countries.into_iter().collect());
        if membership.is_empty() {
            return Err(GbalError::Config(
                "country area needs at least one country".into(),
            ));
        }
        Ok(Self {
            membership,
            is_static: false,
        })
    }

    /// Net position from the injection balance instead of border flows.
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }
}

impl NetworkAreaFactory for CountryAreaFactory {
    fn create(&self, network: &Network) -> GbalResult<Box<dyn NetworkArea>> {
        Ok(build_area(network, &self.membership, self.is_static))
    }
}

/// Area made of an explicit list of voltage levels.
#[derive(Debug, Clone)]
pub struct VoltageLevelsAreaFactory {
    membership: AreaMembership,
    is_static: bool,
}

impl VoltageLevelsAreaFactory {
    pub fn new<S: Into<String>>(voltage_level_ids: impl IntoIterator<Item = S>) -> GbalResult<Self> {
        let membership =
            AreaMembership::VoltageLevels(voltage_level_ids.into_iter().map(Into::into).collect());
        if membership.is_empty() {
            return Err(GbalError::Config(
                "voltage level area needs at least one voltage level".into(),
            ));
        }
        Ok(Self {
            membership,
            is_static: false,
        })
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }
}

impl NetworkAreaFactory for VoltageLevelsAreaFactory {
    fn create(&self, network: &Network) -> GbalResult<Box<dyn NetworkArea>> {
        Ok(build_area(network, &self.membership, self.is_static))
    }
}

/// Proportional scalable over the loads of an area, weighted by P0.
///
/// Conform loads are used when the area has any, otherwise every load with a
/// non-negative P0.
pub fn conform_load_scalable(
    area: &dyn NetworkArea,
    network: &Network,
) -> GbalResult<ProportionalScalable> {
    let buses = area.contained_buses();
    let loads: Vec<&Load> = network
        .loads()
        .into_iter()
        .filter(|l| buses.contains(&l.bus) && l.active_power.value() >= 0.0)
        .collect();
    if loads.is_empty() {
        return Err(GbalError::Config("there is no load in this area".into()));
    }

    let conform: Vec<&Load> = loads.iter().copied().filter(|l| l.is_conform()).collect();
    let selected = if conform.is_empty() { loads } else { conform };

    let total: f64 = selected.iter().map(|l| l.active_power.value()).sum();
    if total == 0.0 {
        return Err(GbalError::Config(
            "loads of this area have a total P0 of zero".into(),
        ));
    }

    let percentages = selected
        .iter()
        .map(|l| 100.0 * l.active_power.value() / total)
        .collect();
    let scalables = selected
        .iter()
        .map(|l| Arc::new(LoadScalable::new(l.id)) as Arc<dyn Scalable>)
        .collect();
    tracing::debug!(loads = selected.len(), total_p0 = total, "conform load scalable built");
    ProportionalScalable::new(percentages, scalables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalable::{Injection, ScalingParameters};
    use crate::test_utils::{fr_be_network, multi_border_network};
    use gbal_core::{LoadId, Megawatts};

    fn fr() -> Country {
        Country::new("FR").unwrap()
    }

    #[test]
    fn membership_without_country_is_undecided() {
        let bus = Bus::new(BusId::new(9), "X", "VL_X");
        let countries = AreaMembership::Countries([fr()].into());
        assert_eq!(countries.side(&bus), None);
        assert!(!countries.contains(&bus));

        let levels = AreaMembership::VoltageLevels(["VL_X".to_string()].into());
        assert_eq!(levels.side(&bus), Some(true));
    }

    #[test]
    fn shared_membership_is_reported() {
        let a = AreaMembership::Countries([fr(), Country::new("BE").unwrap()].into());
        let b = AreaMembership::Countries([Country::new("BE").unwrap()].into());
        assert_eq!(a.shared_with(&b).as_deref(), Some("BE"));
        assert_eq!(a.to_string(), "[BE, FR]");
    }

    #[test]
    fn factories_reject_empty_membership() {
        assert!(CountryAreaFactory::new(Vec::new()).is_err());
        assert!(VoltageLevelsAreaFactory::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn static_factory_uses_injections() {
        let network = fr_be_network();
        let factory = CountryAreaFactory::new([fr()]).unwrap().as_static();
        assert!(factory.is_static());
        let area = factory.create(&network).unwrap();
        // 3000 generated, 1800 consumed
        assert!((area.net_position(&network) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn conform_load_scalable_weights_by_p0() {
        let network = multi_border_network();
        let area = VoltageLevelsAreaFactory::new(["VL_BE", "VL_DE"])
            .unwrap()
            .create(&network)
            .unwrap();
        let scalable = conform_load_scalable(area.as_ref(), &network).unwrap();
        assert_eq!(scalable.percentages(), vec![50.0, 50.0]);
        assert!(scalable.injections().contains(&Injection::Load(LoadId::new(2))));
    }

    #[test]
    fn conform_loads_are_preferred() {
        let mut network = multi_border_network();
        let load = network.load_mut(LoadId::new(3)).unwrap();
        load.variable_active_power = Megawatts(200.0);
        let area = VoltageLevelsAreaFactory::new(["VL_BE", "VL_DE"])
            .unwrap()
            .create(&network)
            .unwrap();
        let scalable = conform_load_scalable(area.as_ref(), &network).unwrap();
        assert_eq!(scalable.percentages(), vec![100.0]);

        let done = scalable
            .scale(&mut network, 100.0, &ScalingParameters::default())
            .unwrap();
        assert_eq!(done, 100.0);
        assert_eq!(network.load(LoadId::new(3)).unwrap().active_power.value(), 900.0);
    }

    #[test]
    fn area_without_loads_cannot_build_a_load_scalable() {
        let network = multi_border_network();
        let area = VoltageLevelsAreaFactory::new(["VL_FR1"])
            .unwrap()
            .create(&network)
            .unwrap();
        let err = conform_load_scalable(area.as_ref(), &network).unwrap_err();
        assert!(matches!(err, GbalError::Config(_)));

        let mut network = multi_border_network();
        network.load_mut(LoadId::new(1)).unwrap().active_power = Megawatts(0.0);
        let area = VoltageLevelsAreaFactory::new(["VL_FR2"])
            .unwrap()
            .create(&network)
            .unwrap();
        assert!(conform_load_scalable(area.as_ref(), &network).is_err());
    }
}
