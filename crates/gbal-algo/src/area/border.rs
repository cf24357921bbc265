use super::{AreaMembership, NetworkArea};
use gbal_core::{
    Bus, BusId, Edge, EdgeIndex, GbalError, GbalResult, HalfLine, Network, Node, NodeIndex,
    Terminal, ThreeWindingsTransformer, TieLine,
};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    One,
    Two,
}

impl Side {
    fn other(self) -> Self {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

/// Boundary element captured when the area is built.
#[derive(Debug, Clone, Copy)]
enum BorderElement {
    Branch { edge: EdgeIndex, inside: Side },
    TieLine { edge: EdgeIndex, inside: Side },
    Hvdc { edge: EdgeIndex, inside: Side },
    DanglingLine { node: NodeIndex },
    ThreeWindings { node: NodeIndex, inside: [bool; 3] },
}

/// `(P1 − P2)/2` seen from the inside side.
pub(crate) fn two_sided_leaving_flow(side1: &Terminal, side2: &Terminal, inside: Side) -> f64 {
    let direct = (side1.p_or_zero() - side2.p_or_zero()) / 2.0;
    match inside {
        Side::One => direct,
        Side::Two => -direct,
    }
}

/// Power leaving through a boundary X-node: `−P_boundary`.
pub(crate) fn boundary_leaving_flow(terminal: &Terminal, boundary_p: f64) -> f64 {
    if terminal.connected && boundary_p.is_finite() {
        -boundary_p
    } else {
        0.0
    }
}

pub(crate) fn half(tie: &TieLine, side: Side) -> &HalfLine {
    match side {
        Side::One => &tie.half1,
        Side::Two => &tie.half2,
    }
}

fn three_windings_leaving_flow(t3w: &ThreeWindingsTransformer, inside: &[bool; 3]) -> f64 {
    let (mut inside_flow, mut outside_flow) = (0.0, 0.0);
    for (leg, &is_inside) in t3w.legs.iter().zip(inside) {
        if is_inside {
            inside_flow += leg.terminal.p_or_zero();
        } else {
            outside_flow += leg.terminal.p_or_zero();
        }
    }
    (inside_flow - outside_flow) / 2.0
}

impl BorderElement {
    fn leaving_flow(&self, network: &Network) -> f64 {
        match *self {
            BorderElement::Branch { edge, inside } => match network.graph.edge_weight(edge) {
                Some(Edge::Branch(branch)) => {
                    two_sided_leaving_flow(&branch.side1, &branch.side2, inside)
                }
                _ => 0.0,
            },
            BorderElement::Hvdc { edge, inside } => match network.graph.edge_weight(edge) {
                Some(Edge::Hvdc(hvdc)) => two_sided_leaving_flow(&hvdc.side1, &hvdc.side2, inside),
                _ => 0.0,
            },
            BorderElement::TieLine { edge, inside } => match network.graph.edge_weight(edge) {
                Some(Edge::TieLine(tie)) => {
                    let h = half(tie, inside);
                    boundary_leaving_flow(&h.terminal, h.boundary_p.value())
                }
                _ => 0.0,
            },
            BorderElement::DanglingLine { node } => match network.graph.node_weight(node) {
                Some(Node::DanglingLine(line)) => {
                    boundary_leaving_flow(&line.terminal, line.boundary_p.value())
                }
                _ => 0.0,
            },
            BorderElement::ThreeWindings { node, inside } => match network.graph.node_weight(node) {
                Some(Node::ThreeWindingsTransformer(t3w)) => three_windings_leaving_flow(t3w, &inside),
                _ => 0.0,
            },
        }
    }

    /// Bus on the far side, for two-sided elements.
    fn outside_bus(&self, network: &Network) -> Option<BusId> {
        let outside = |s1: &Terminal, s2: &Terminal, inside: Side| match inside.other() {
            Side::One => s1.bus,
            Side::Two => s2.bus,
        };
        match *self {
            BorderElement::Branch { edge, inside } => match network.graph.edge_weight(edge)? {
                Edge::Branch(b) => Some(outside(&b.side1, &b.side2, inside)),
                _ => None,
            },
            BorderElement::Hvdc { edge, inside } => match network.graph.edge_weight(edge)? {
                Edge::Hvdc(h) => Some(outside(&h.side1, &h.side2, inside)),
                _ => None,
            },
            BorderElement::TieLine { edge, inside } => match network.graph.edge_weight(edge)? {
                Edge::TieLine(t) => Some(half(t, inside.other()).terminal.bus),
                _ => None,
            },
            BorderElement::DanglingLine { .. } | BorderElement::ThreeWindings { .. } => None,
        }
    }
}

/// Area whose net position is the sum of flows leaving through its border.
#[derive(Debug, Clone)]
pub struct BorderArea {
    membership: AreaMembership,
    borders: Vec<BorderElement>,
    buses: BTreeSet<BusId>,
}

fn classify(membership: &AreaMembership, bus1: Option<&Bus>, bus2: Option<&Bus>) -> Option<Side> {
    let side1 = membership.side(bus1?)?;
    let side2 = membership.side(bus2?)?;
    match (side1, side2) {
        (true, false) => Some(Side::One),
        (false, true) => Some(Side::Two),
        _ => None,
    }
}

impl BorderArea {
    pub fn new(network: &Network, membership: AreaMembership) -> Self {
        let buses = network.bus_map();
        let bus = |id: BusId| buses.get(&id).copied();
        let mut borders = Vec::new();

        for edge in network.graph.edge_indices() {
            let element = match &network.graph[edge] {
                Edge::Branch(b) => classify(&membership, bus(b.side1.bus), bus(b.side2.bus))
                    .map(|inside| BorderElement::Branch { edge, inside }),
                Edge::TieLine(t) => {
                    classify(&membership, bus(t.half1.terminal.bus), bus(t.half2.terminal.bus))
                        .map(|inside| BorderElement::TieLine { edge, inside })
                }
                Edge::Hvdc(h) => classify(&membership, bus(h.side1.bus), bus(h.side2.bus))
                    .map(|inside| BorderElement::Hvdc { edge, inside }),
            };
            borders.extend(element);
        }

        let is_inside = |bus: BusId| {
            buses
                .get(&bus)
                .map(|b| membership.contains(b))
                .unwrap_or(false)
        };
        for node in network.graph.node_indices() {
            match &network.graph[node] {
                Node::DanglingLine(line) if is_inside(line.terminal.bus) => {
                    borders.push(BorderElement::DanglingLine { node });
                }
                Node::ThreeWindingsTransformer(t3w) => {
                    let inside = [
                        is_inside(t3w.legs[0].terminal.bus),
                        is_inside(t3w.legs[1].terminal.bus),
                        is_inside(t3w.legs[2].terminal.bus),
                    ];
                    let count = inside.iter().filter(|&&i| i).count();
                    if count > 0 && count < 3 {
                        borders.push(BorderElement::ThreeWindings { node, inside });
                    }
                }
                _ => {}
            }
        }

        let contained = buses
            .values()
            .filter(|b| membership.contains(b))
            .map(|b| b.id)
            .collect();

        tracing::debug!(
            area = %membership,
            borders = borders.len(),
            "border area built"
        );
        Self {
            membership,
            borders,
            buses: contained,
        }
    }

    pub fn membership(&self) -> &AreaMembership {
        &self.membership
    }

    pub fn border_count(&self) -> usize {
        self.borders.len()
    }

    /// Part of the net position flowing directly into `other`.
    ///
    /// Only two-sided elements (branches, tie lines, HVDC lines) whose far
    /// side lies in `other` are counted.
    pub fn leaving_flow_to(&self, other: &BorderArea, network: &Network) -> GbalResult<f64> {
        if let Some(shared) = self.membership.shared_with(&other.membership) {
            return Err(GbalError::Config(format!(
                "leaving flow cannot be computed: {} is contained in both areas",
                shared
            )));
        }
        let buses: HashMap<BusId, &Bus> = network.bus_map();
        Ok(self
            .borders
            .iter()
            .filter(|element| {
                element
                    .outside_bus(network)
                    .and_then(|bus| buses.get(&bus))
                    .map(|bus| other.membership.contains(bus))
                    .unwrap_or(false)
            })
            .map(|element| element.leaving_flow(network))
            .sum())
    }
}

impl NetworkArea for BorderArea {
    fn net_position(&self, network: &Network) -> f64 {
        self.borders
            .par_iter()
            .map(|element| element.leaving_flow(network))
            .sum()
    }

    fn contained_buses(&self) -> &BTreeSet<BusId> {
        &self.buses
    }
}
