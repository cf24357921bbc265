use super::{AreaMembership, NetworkArea};
use gbal_core::{BusId, Network, Node, NodeIndex};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Area whose net position is its injection balance.
///
/// Generators and loads are picked once, when the area is built. The value
/// does not depend on any load-flow result.
#[derive(Debug, Clone)]
pub struct InjectionArea {
    generators: Vec<NodeIndex>,
    loads: Vec<NodeIndex>,
    buses: BTreeSet<BusId>,
}

impl InjectionArea {
    pub fn new(network: &Network, membership: &AreaMembership) -> Self {
        let buses: BTreeSet<BusId> = network
            .buses()
            .into_iter()
            .filter(|b| membership.contains(b))
            .map(|b| b.id)
            .collect();

        let mut generators = Vec::new();
        let mut loads = Vec::new();
        for node in network.graph.node_indices() {
            match &network.graph[node] {
                Node::Gen(gen) if buses.contains(&gen.bus) => generators.push(node),
                Node::Load(load) if buses.contains(&load.bus) => loads.push(node),
                _ => {}
            }
        }
        tracing::debug!(
            area = %membership,
            generators = generators.len(),
            loads = loads.len(),
            "static area built"
        );
        Self {
            generators,
            loads,
            buses,
        }
    }
}

impl NetworkArea for InjectionArea {
    fn net_position(&self, network: &Network) -> f64 {
        let generation: f64 = self
            .generators
            .par_iter()
            .map(|&node| match network.graph.node_weight(node) {
                Some(Node::Gen(gen)) if gen.status => gen.active_power.value(),
                _ => 0.0,
            })
            .sum();
        let consumption: f64 = self
            .loads
            .par_iter()
            .map(|&node| match network.graph.node_weight(node) {
                Some(Node::Load(load)) if load.status => load.active_power.value(),
                _ => 0.0,
            })
            .sum();
        generation - consumption
    }

    fn contained_buses(&self) -> &BTreeSet<BusId> {
        &self.buses
    }
}
