//! Topology analysis: synchronous and connected components.
//!
//! A synchronous component is a set of buses joined by in-service AC elements
//! (branches, tie lines, three-winding transformers). Connected components also
//! follow HVDC links. Components are numbered by decreasing size, ties broken by
//! smallest bus id, so number 0 is always the main component.

use crate::{BusId, Edge, Network, Node};
use petgraph::unionfind::UnionFind;
use std::collections::{BTreeMap, HashMap};

/// Component numbering of every bus in one network state.
#[derive(Debug, Clone, Default)]
pub struct TopologyComponents {
    synchronous: HashMap<BusId, usize>,
    connected: HashMap<BusId, usize>,
    synchronous_buses: Vec<Vec<BusId>>,
    connected_count: usize,
}

impl TopologyComponents {
    pub fn synchronous_component(&self, bus: BusId) -> Option<usize> {
        self.synchronous.get(&bus).copied()
    }

    pub fn connected_component(&self, bus: BusId) -> Option<usize> {
        self.connected.get(&bus).copied()
    }

    pub fn is_in_main_synchronous_component(&self, bus: BusId) -> bool {
        self.synchronous_component(bus) == Some(0)
    }

    pub fn synchronous_component_count(&self) -> usize {
        self.synchronous_buses.len()
    }

    pub fn connected_component_count(&self) -> usize {
        self.connected_count
    }

    /// Buses of synchronous component `num`, sorted by id.
    pub fn synchronous_component_buses(&self, num: usize) -> &[BusId] {
        self.synchronous_buses
            .get(num)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Number the synchronous and connected components of the working variant.
pub fn topology_components(network: &Network) -> TopologyComponents {
    let mut buses: Vec<BusId> = network.buses().into_iter().map(|b| b.id).collect();
    buses.sort();
    let position: HashMap<BusId, usize> =
        buses.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut ac = UnionFind::<usize>::new(buses.len());
    let mut all = UnionFind::<usize>::new(buses.len());
    let join = |uf: &mut UnionFind<usize>, a: BusId, b: BusId| {
        if let (Some(&ia), Some(&ib)) = (position.get(&a), position.get(&b)) {
            uf.union(ia, ib);
        }
    };

    for edge in network.graph.edge_weights() {
        match edge {
            Edge::Branch(branch) if branch.is_in_service() => {
                join(&mut ac, branch.side1.bus, branch.side2.bus);
                join(&mut all, branch.side1.bus, branch.side2.bus);
            }
            Edge::TieLine(tie) if tie.is_in_service() => {
                join(&mut ac, tie.half1.terminal.bus, tie.half2.terminal.bus);
                join(&mut all, tie.half1.terminal.bus, tie.half2.terminal.bus);
            }
            Edge::Hvdc(hvdc) if hvdc.side1.connected && hvdc.side2.connected => {
                join(&mut all, hvdc.side1.bus, hvdc.side2.bus);
            }
            _ => {}
        }
    }

    for node in network.graph.node_weights() {
        if let Node::ThreeWindingsTransformer(t3w) = node {
            let mut connected = t3w.legs.iter().filter(|l| l.terminal.connected);
            if let Some(first) = connected.next() {
                for leg in connected {
                    join(&mut ac, first.terminal.bus, leg.terminal.bus);
                    join(&mut all, first.terminal.bus, leg.terminal.bus);
                }
            }
        }
    }

    let synchronous_buses = group_by_size(&ac, &buses);
    let connected_buses = group_by_size(&all, &buses);

    TopologyComponents {
        synchronous: index_components(&synchronous_buses),
        connected: index_components(&connected_buses),
        connected_count: connected_buses.len(),
        synchronous_buses,
    }
}

fn group_by_size(uf: &UnionFind<usize>, buses: &[BusId]) -> Vec<Vec<BusId>> {
    let mut groups: BTreeMap<usize, Vec<BusId>> = BTreeMap::new();
    for (i, &bus) in buses.iter().enumerate() {
        groups.entry(uf.find(i)).or_default().push(bus);
    }
    let mut groups: Vec<Vec<BusId>> = groups.into_values().collect();
    groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));
    groups
}

fn index_components(groups: &[Vec<BusId>]) -> HashMap<BusId, usize> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(num, buses)| buses.iter().map(move |&bus| (bus, num)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Branch, BranchId, Bus, HvdcLine, HvdcLineId, Megawatts, Terminal};

    fn network_with_hvdc_island() -> Network {
        let mut network = Network::new("islands");
        for id in 1..=5 {
            network
                .add_bus(Bus::new(BusId::new(id), &format!("B{id}"), "VL"))
                .unwrap();
        }
        network
            .add_branch(Branch::new(BranchId::new(1), "1-2".into(), BusId::new(1), BusId::new(2), 0.1))
            .unwrap();
        network
            .add_branch(Branch::new(BranchId::new(2), "2-3".into(), BusId::new(2), BusId::new(3), 0.1))
            .unwrap();
        network
            .add_branch(Branch::new(BranchId::new(3), "4-5".into(), BusId::new(4), BusId::new(5), 0.1))
            .unwrap();
        network
            .add_hvdc_line(HvdcLine {
                id: HvdcLineId::new(1),
                name: "DC".into(),
                side1: Terminal::new(BusId::new(3)),
                side2: Terminal::new(BusId::new(4)),
                active_power_setpoint: Megawatts(50.0),
            })
            .unwrap();
        network
    }

    #[test]
    fn largest_synchronous_component_is_numbered_zero() {
        let components = topology_components(&network_with_hvdc_island());
        assert_eq!(components.synchronous_component_count(), 2);
        assert_eq!(components.synchronous_component(BusId::new(2)), Some(0));
        assert_eq!(components.synchronous_component(BusId::new(5)), Some(1));
        assert!(components.is_in_main_synchronous_component(BusId::new(3)));
        assert_eq!(
            components.synchronous_component_buses(1),
            &[BusId::new(4), BusId::new(5)]
        );
    }

    #[test]
    fn hvdc_joins_connected_components_only() {
        let components = topology_components(&network_with_hvdc_island());
        assert_eq!(components.connected_component_count(), 1);
        assert_eq!(components.connected_component(BusId::new(5)), Some(0));
    }

    #[test]
    fn open_branch_splits_component() {
        let mut network = network_with_hvdc_island();
        network.branch_mut(BranchId::new(2)).unwrap().side2.connected = false;
        let components = topology_components(&network);
        assert_eq!(components.synchronous_component_count(), 3);
        // {1,2} and {4,5} tie on size; the smaller bus id wins
        assert_eq!(components.synchronous_component(BusId::new(1)), Some(0));
        assert_eq!(components.synchronous_component(BusId::new(4)), Some(1));
        assert_eq!(components.synchronous_component(BusId::new(3)), Some(2));
    }
}
