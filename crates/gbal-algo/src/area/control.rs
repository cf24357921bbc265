use super::border::{half, two_sided_leaving_flow, Side};
use super::{NetworkArea, NetworkAreaFactory};
use gbal_core::{
    topology_components, BranchId, BusId, DanglingLineId, Edge, EdgeIndex, GbalError, GbalResult,
    Network, Node, NodeIndex, Terminal, TieLine, TopologyComponents,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Control area annotation supplied with a network model.
///
/// Tie-flow entries tag the terminals whose flows count towards the area's
/// interchange. Boundary entries tag dangling lines through their boundary
/// point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlAreaDescriptor {
    pub id: String,
    pub tie_flow_dangling_lines: BTreeSet<DanglingLineId>,
    pub tie_flow_branches: BTreeSet<BranchId>,
    pub boundary_dangling_lines: BTreeSet<DanglingLineId>,
}

impl ControlAreaDescriptor {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tie_flow_dangling_lines.is_empty()
            && self.tie_flow_branches.is_empty()
            && self.boundary_dangling_lines.is_empty()
    }

    fn tags_dangling_line(&self, id: DanglingLineId) -> bool {
        self.tie_flow_dangling_lines.contains(&id) || self.boundary_dangling_lines.contains(&id)
    }
}

#[derive(Debug, Clone, Copy)]
enum ControlElement {
    DanglingLine { node: NodeIndex },
    TieLine { edge: EdgeIndex, inside: Side },
    Branch { edge: EdgeIndex, inside: Side },
}

/// `−P_boundary`, or the terminal flow when the boundary was not computed.
fn dangling_leaving_flow(terminal: &Terminal, boundary_p: f64) -> f64 {
    if !terminal.connected {
        0.0
    } else if boundary_p.is_nan() {
        terminal.p_or_zero()
    } else {
        -boundary_p
    }
}

fn tie_leaving_flow(tie: &TieLine, inside: Side) -> f64 {
    let flow1 = dangling_leaving_flow(&tie.half1.terminal, tie.half1.boundary_p.value());
    let flow2 = dangling_leaving_flow(&tie.half2.terminal, tie.half2.boundary_p.value());
    let direct = (flow1 - flow2) / 2.0;
    match inside {
        Side::One => direct,
        Side::Two => -direct,
    }
}

impl ControlElement {
    fn leaving_flow(&self, network: &Network) -> f64 {
        match *self {
            ControlElement::DanglingLine { node } => match network.graph.node_weight(node) {
                Some(Node::DanglingLine(line)) => {
                    dangling_leaving_flow(&line.terminal, line.boundary_p.value())
                }
                _ => 0.0,
            },
            ControlElement::TieLine { edge, inside } => match network.graph.edge_weight(edge) {
                Some(Edge::TieLine(tie)) => tie_leaving_flow(tie, inside),
                _ => 0.0,
            },
            ControlElement::Branch { edge, inside } => match network.graph.edge_weight(edge) {
                Some(Edge::Branch(branch)) => {
                    two_sided_leaving_flow(&branch.side1, &branch.side2, inside)
                }
                _ => 0.0,
            },
        }
    }
}

/// Area defined by a control area annotation and an optional voltage-level list.
#[derive(Debug, Clone)]
pub struct ControlArea {
    id: String,
    elements: Vec<ControlElement>,
    buses: BTreeSet<BusId>,
}

impl ControlArea {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}

impl NetworkArea for ControlArea {
    fn net_position(&self, network: &Network) -> f64 {
        self.elements
            .par_iter()
            .map(|element| element.leaving_flow(network))
            .sum()
    }

    fn contained_buses(&self) -> &BTreeSet<BusId> {
        &self.buses
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControlAreaFactory {
    descriptor: Option<ControlAreaDescriptor>,
    voltage_level_ids: BTreeSet<String>,
    excluded_xnodes: BTreeSet<String>,
}

impl ControlAreaFactory {
    pub fn new<S: Into<String>>(
        descriptor: Option<ControlAreaDescriptor>,
        voltage_level_ids: impl IntoIterator<Item = S>,
    ) -> GbalResult<Self> {
        let voltage_level_ids: BTreeSet<String> =
            voltage_level_ids.into_iter().map(Into::into).collect();
        let tagged = descriptor.as_ref().is_some_and(|d| !d.is_empty());
        if voltage_level_ids.is_empty() && !tagged {
            return Err(GbalError::Config(
                "control area needs tagged elements or a voltage level list".into(),
            ));
        }
        let tags_branches = descriptor
            .as_ref()
            .is_some_and(|d| !d.tie_flow_branches.is_empty());
        if voltage_level_ids.is_empty() && tags_branches {
            return Err(GbalError::Config(
                "tagged branches need a voltage level list to place the area side".into(),
            ));
        }
        Ok(Self {
            descriptor,
            voltage_level_ids,
            excluded_xnodes: BTreeSet::new(),
        })
    }

    /// Disregard dangling lines and tie lines meeting at these X-nodes.
    pub fn excluding_xnodes<S: Into<String>>(mut self, codes: impl IntoIterator<Item = S>) -> Self {
        self.excluded_xnodes.extend(codes.into_iter().map(Into::into));
        self
    }

    fn descriptor(&self) -> Option<&ControlAreaDescriptor> {
        self.descriptor.as_ref().filter(|d| !d.is_empty())
    }

    fn is_excluded(&self, xnode: Option<&String>) -> bool {
        xnode.is_some_and(|code| self.excluded_xnodes.contains(code))
    }
}

struct Placement<'a> {
    voltage_levels: HashMap<BusId, &'a str>,
    topology: TopologyComponents,
    list: &'a BTreeSet<String>,
}

impl Placement<'_> {
    fn energized(&self, terminal: &Terminal) -> bool {
        terminal.connected && self.topology.is_in_main_synchronous_component(terminal.bus)
    }

    fn in_list(&self, bus: BusId) -> bool {
        self.voltage_levels
            .get(&bus)
            .is_some_and(|vl| self.list.contains(*vl))
    }

    /// Inside side of a two-sided element crossing the voltage-level list.
    fn border_side(&self, bus1: BusId, bus2: BusId) -> Option<Side> {
        match (self.in_list(bus1), self.in_list(bus2)) {
            (true, false) => Some(Side::One),
            (false, true) => Some(Side::Two),
            _ => None,
        }
    }
}

impl ControlAreaFactory {
    fn tie_line_side(&self, tie: &TieLine, placement: &Placement<'_>) -> Option<Side> {
        if !placement.list.is_empty() {
            let side = placement.border_side(tie.half1.terminal.bus, tie.half2.terminal.bus)?;
            let tagged = self.descriptor().map_or(true, |d| {
                d.tags_dangling_line(tie.half1.id) || d.tags_dangling_line(tie.half2.id)
            });
            return tagged.then_some(side);
        }
        let descriptor = self.descriptor()?;
        match (
            descriptor.tags_dangling_line(tie.half1.id),
            descriptor.tags_dangling_line(tie.half2.id),
        ) {
            (true, false) => Some(Side::One),
            (false, true) => Some(Side::Two),
            _ => None,
        }
    }

    fn collect(&self, network: &Network, placement: &Placement<'_>) -> Vec<ControlElement> {
        let mut elements = Vec::new();

        for node in network.graph.node_indices() {
            let Node::DanglingLine(line) = &network.graph[node] else {
                continue;
            };
            let keep = (placement.list.is_empty() || placement.in_list(line.terminal.bus))
                && placement.energized(&line.terminal)
                && !line.dc_boundary
                && !self.is_excluded(line.xnode_code.as_ref())
                && self.descriptor().map_or(true, |d| d.tags_dangling_line(line.id));
            if keep {
                elements.push(ControlElement::DanglingLine { node });
            }
        }

        for edge in network.graph.edge_indices() {
            match &network.graph[edge] {
                Edge::TieLine(tie) => {
                    if !placement.energized(&tie.half1.terminal)
                        || !placement.energized(&tie.half2.terminal)
                        || self.is_excluded(tie.xnode_code.as_ref())
                    {
                        continue;
                    }
                    if let Some(inside) = self.tie_line_side(tie, placement) {
                        elements.push(ControlElement::TieLine { edge, inside });
                    }
                }
                Edge::Branch(branch) if !placement.list.is_empty() => {
                    let Some(inside) = placement.border_side(branch.side1.bus, branch.side2.bus)
                    else {
                        continue;
                    };
                    let keep = placement.energized(&branch.side1)
                        && placement.energized(&branch.side2)
                        && self
                            .descriptor()
                            .map_or(true, |d| d.tie_flow_branches.contains(&branch.id));
                    if keep {
                        elements.push(ControlElement::Branch { edge, inside });
                    }
                }
                _ => {}
            }
        }
        elements
    }
}

impl NetworkAreaFactory for ControlAreaFactory {
    fn create(&self, network: &Network) -> GbalResult<Box<dyn NetworkArea>> {
        let placement = Placement {
            voltage_levels: network
                .buses()
                .into_iter()
                .map(|b| (b.id, b.voltage_level.as_str()))
                .collect(),
            topology: topology_components(network),
            list: &self.voltage_level_ids,
        };
        let elements = self.collect(network, &placement);

        let buses: BTreeSet<BusId> = if placement.list.is_empty() {
            // no list: the area is known only through its tagged elements
            elements
                .iter()
                .filter_map(|element| match *element {
                    ControlElement::DanglingLine { node } => match network.graph.node_weight(node) {
                        Some(Node::DanglingLine(line)) => Some(line.terminal.bus),
                        _ => None,
                    },
                    ControlElement::TieLine { edge, inside } => match network.graph.edge_weight(edge) {
                        Some(Edge::TieLine(tie)) => Some(half(tie, inside).terminal.bus),
                        _ => None,
                    },
                    ControlElement::Branch { .. } => None,
                })
                .collect()
        } else {
            network
                .buses()
                .into_iter()
                .filter(|b| {
                    placement.list.contains(&b.voltage_level)
                        && placement.topology.is_in_main_synchronous_component(b.id)
                })
                .map(|b| b.id)
                .collect()
        };

        let id = self
            .descriptor
            .as_ref()
            .map(|d| d.id.clone())
            .unwrap_or_default();
        tracing::debug!(
            control_area = %id,
            elements = elements.len(),
            buses = buses.len(),
            "control area built"
        );
        Ok(Box::new(ControlArea {
            id,
            elements,
            buses,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{BorderArea, AreaMembership};
    use crate::load_flow::{DcLoadFlow, LoadFlowParameters, LoadFlowRunner};
    use crate::test_utils::multi_border_network;
    use gbal_core::{Country, Megawatts, INITIAL_VARIANT_ID};

    fn solved(mut network: Network) -> Network {
        DcLoadFlow
            .run(&mut network, INITIAL_VARIANT_ID, &LoadFlowParameters::default())
            .unwrap();
        network
    }

    fn fr_levels() -> [&'static str; 2] {
        ["VL_FR1", "VL_FR2"]
    }

    fn set_dangling_boundary(network: &mut Network, id: usize, terminal_p: f64, boundary_p: f64) {
        for node in network.graph.node_weights_mut() {
            if let Node::DanglingLine(line) = node {
                if line.id == DanglingLineId::new(id) {
                    line.terminal.p = Megawatts(terminal_p);
                    line.boundary_p = Megawatts(boundary_p);
                }
            }
        }
    }

    #[test]
    fn voltage_level_control_area_counts_lines_only() {
        let network = solved(multi_border_network());
        let area = ControlAreaFactory::new(None, fr_levels())
            .unwrap()
            .create(&network)
            .unwrap();
        let border = BorderArea::new(
            &network,
            AreaMembership::Countries([Country::new("FR").unwrap()].into()),
        );
        // the three-winding transformer is not a control area border
        let t3w_flow = network.three_windings_transformers()[0].legs[0].terminal.p.value();
        assert!((area.net_position(&network) - (border.net_position(&network) - t3w_flow)).abs() < 1e-6);
        assert_eq!(area.contained_buses().len(), 2);
    }

    #[test]
    fn descriptor_restricts_elements() {
        let network = solved(multi_border_network());
        let mut descriptor = ControlAreaDescriptor::new("10YFR-RTE------C");
        descriptor.tie_flow_dangling_lines.insert(DanglingLineId::new(11));
        let area = ControlAreaFactory::new(Some(descriptor.clone()), fr_levels())
            .unwrap()
            .create(&network)
            .unwrap();
        let tie_flow = network.tie_lines()[0].half1.terminal.p.value();
        assert!((area.net_position(&network) - tie_flow).abs() < 1e-6);

        // without a voltage level list the tagged half decides the side
        let area = ControlAreaFactory::new(Some(descriptor), Vec::<String>::new())
            .unwrap()
            .create(&network)
            .unwrap();
        assert!((area.net_position(&network) - tie_flow).abs() < 1e-6);
        assert_eq!(area.contained_buses().len(), 1);
    }

    #[test]
    fn excluded_xnodes_and_dc_boundaries_are_ignored() {
        let network = solved(multi_border_network());
        let area = ControlAreaFactory::new(None, fr_levels())
            .unwrap()
            .excluding_xnodes(["XFR_DE"])
            .create(&network)
            .unwrap();
        let branch_flow = network.branch(BranchId::new(2)).unwrap().side1.p.value();
        assert!((area.net_position(&network) - branch_flow).abs() < 1e-6);

        let area = ControlAreaFactory::new(None, ["VL_DE"])
            .unwrap()
            .create(&network)
            .unwrap();
        let with_dl = area.net_position(&network);

        let mut network = network;
        for node in network.graph.node_weights_mut() {
            if let Node::DanglingLine(line) = node {
                line.dc_boundary = true;
            }
        }
        let area_dc = ControlAreaFactory::new(None, ["VL_DE"])
            .unwrap()
            .create(&network)
            .unwrap();
        assert!((with_dl - area_dc.net_position(&network) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn dangling_line_falls_back_to_terminal_flow() {
        let mut network = multi_border_network();
        set_dangling_boundary(&mut network, 21, 80.0, f64::NAN);
        let mut descriptor = ControlAreaDescriptor::new("DE");
        descriptor.boundary_dangling_lines.insert(DanglingLineId::new(21));
        let area = ControlAreaFactory::new(Some(descriptor), ["VL_DE"])
            .unwrap()
            .create(&network)
            .unwrap();
        assert!((area.net_position(&network) - 80.0).abs() < 1e-9);

        set_dangling_boundary(&mut network, 21, 80.0, -75.0);
        assert!((area.net_position(&network) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn factory_needs_some_membership() {
        assert!(ControlAreaFactory::new(None, Vec::<String>::new()).is_err());
        assert!(
            ControlAreaFactory::new(Some(ControlAreaDescriptor::new("empty")), Vec::<String>::new())
                .is_err()
        );
    }

    #[test]
    fn tagged_branches_need_a_voltage_level_list() {
        let mut descriptor = ControlAreaDescriptor::new("FR");
        descriptor.tie_flow_branches.insert(BranchId::new(2));
        let err = ControlAreaFactory::new(Some(descriptor.clone()), Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, GbalError::Config(_)));

        let network = solved(multi_border_network());
        let area = ControlAreaFactory::new(Some(descriptor), fr_levels())
            .unwrap()
            .create(&network)
            .unwrap();
        let branch_flow = network.branch(BranchId::new(2)).unwrap().side1.p.value();
        assert!(branch_flow.abs() > 1.0);
        assert!((area.net_position(&network) - branch_flow).abs() < 1e-6);
    }
}
