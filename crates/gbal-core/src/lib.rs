//! # gbal-core: network model for balance adjustment
//!
//! Provides the network data structures the balance engine measures and
//! modifies: buses grouped into voltage levels and countries, injections
//! (generators, loads, dangling lines) and the branches that carry flow
//! between them.
//!
//! ## Design
//!
//! Networks are modeled as **undirected multigraphs** where:
//! - **Nodes**: buses, generators, loads, dangling lines, three-winding transformers
//! - **Edges**: branches (lines, two-winding transformers), tie lines, HVDC lines
//!
//! Generators, loads, dangling lines and three-winding transformers reference
//! their buses by [`BusId`]; branch-like elements are edges between bus nodes.
//! Every element side is a [`Terminal`] that carries its connection state and
//! the last solved active power flow (NaN until a load flow has run).
//!
//! A [`Network`] holds several named **variants** (full state snapshots). The
//! graph in [`Network::graph`] is always the working variant; see [`variant`].
//!
//! ## Quick Start
//!
//! ```rust
//! use gbal_core::*;
//!
//! let mut network = Network::new("two-zones");
//! network.add_bus(Bus::new(BusId::new(1), "FR1", "VL_FR").in_country(Country::new("FR").unwrap())).unwrap();
//! network.add_bus(Bus::new(BusId::new(2), "BE1", "VL_BE").in_country(Country::new("BE").unwrap())).unwrap();
//! network
//!     .add_gen(Gen::new(GenId::new(1), "G_FR".into(), BusId::new(1)).with_target_p(500.0))
//!     .unwrap();
//! network
//!     .add_load(Load::new(LoadId::new(1), "L_BE".into(), BusId::new(2), 500.0, 0.0))
//!     .unwrap();
//! network
//!     .add_branch(Branch::new(BranchId::new(1), "FR-BE".into(), BusId::new(1), BusId::new(2), 0.1))
//!     .unwrap();
//!
//! assert_eq!(network.buses().len(), 2);
//! assert_eq!(network.working_variant_id(), INITIAL_VARIANT_ID);
//! ```
//!
//! ## Modules
//!
//! - [`graph_utils`] - synchronous/connected component numbering
//! - [`variant`] - named state snapshots
//! - [`solver`] - dense linear backends for the DC load flow
//! - [`units`] - MW / Mvar / kV / rad newtypes

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

pub mod error;
pub mod graph_utils;
pub mod solver;
pub mod units;
pub mod variant;

pub use error::{GbalError, GbalResult};
pub use graph_utils::{topology_components, TopologyComponents};
pub use petgraph::graph::{EdgeIndex, NodeIndex};
pub use solver::{FaerSolver, GaussSolver, LinearSystemBackend, SolverKind};
pub use units::{Kilovolts, Megavars, Megawatts, Radians};
pub use variant::INITIAL_VARIANT_ID;

macro_rules! element_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub fn new(value: usize) -> Self {
                Self(value)
            }

            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

element_id!(BusId, "Bus");
element_id!(BranchId, "Branch");
element_id!(GenId, "Gen");
element_id!(LoadId, "Load");
element_id!(
    /// Identifies an unpaired dangling line or one half of a tie line.
    DanglingLineId,
    "DanglingLine"
);
element_id!(TieLineId, "TieLine");
element_id!(HvdcLineId, "Hvdc");
element_id!(ThreeWindingsTransformerId, "T3W");

/// ISO 3166 alpha-2 country code (upper case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Country(String);

impl Country {
    pub fn new(code: &str) -> GbalResult<Self> {
        let code = code.trim();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(GbalError::Validation(format!(
                "invalid country code '{}': expected two upper-case letters",
                code
            )))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Country {
    type Err = GbalError;

    fn from_str(s: &str) -> GbalResult<Self> {
        Country::new(s)
    }
}

impl TryFrom<String> for Country {
    type Error = GbalError;

    fn try_from(value: String) -> GbalResult<Self> {
        Country::new(&value)
    }
}

impl From<Country> for String {
    fn from(country: Country) -> Self {
        country.0
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of an element: where it attaches and what last flowed through it.
///
/// `p` is the active power entering the element from the bus, in MW, as
/// written by the last load flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terminal {
    pub bus: BusId,
    pub connected: bool,
    pub p: Megawatts,
}

impl Terminal {
    pub fn new(bus: BusId) -> Self {
        Self {
            bus,
            connected: true,
            p: Megawatts::UNSOLVED,
        }
    }

    pub fn disconnected(bus: BusId) -> Self {
        Self {
            connected: false,
            ..Self::new(bus)
        }
    }

    /// Solved flow, or zero when the side is disconnected or has no value yet.
    pub fn p_or_zero(&self) -> f64 {
        if self.connected && self.p.is_finite() {
            self.p.value()
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub voltage_level: String,
    pub country: Option<Country>,
    pub base_kv: Kilovolts,
    /// Voltage angle written by the load flow
    pub angle_rad: Radians,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId(0),
            name: String::new(),
            voltage_level: String::new(),
            country: None,
            base_kv: Kilovolts(400.0),
            angle_rad: Radians(f64::NAN),
        }
    }
}

impl Bus {
    pub fn new(id: BusId, name: &str, voltage_level: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            voltage_level: voltage_level.to_string(),
            ..Self::default()
        }
    }

    pub fn in_country(mut self, country: Country) -> Self {
        self.country = Some(country);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    #[default]
    Line,
    Transformer,
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub side1: Terminal,
    pub side2: Terminal,
    /// Series resistance (per-unit); ignored by the DC approximation
    pub resistance: f64,
    /// Series reactance (per-unit)
    pub reactance: f64,
    /// Off-nominal tap ratio, side 1 to side 2
    pub tap_ratio: f64,
    pub phase_shift: Radians,
    pub kind: BranchKind,
}

impl Branch {
    pub fn new(id: BranchId, name: String, bus1: BusId, bus2: BusId, reactance: f64) -> Self {
        Self {
            id,
            name,
            side1: Terminal::new(bus1),
            side2: Terminal::new(bus2),
            resistance: 0.0,
            reactance,
            tap_ratio: 1.0,
            phase_shift: Radians::ZERO,
            kind: BranchKind::Line,
        }
    }

    pub fn as_transformer(mut self, tap_ratio: f64, phase_shift: Radians) -> Self {
        self.kind = BranchKind::Transformer;
        self.tap_ratio = tap_ratio;
        self.phase_shift = phase_shift;
        self
    }

    pub fn is_in_service(&self) -> bool {
        self.side1.connected && self.side2.connected
    }
}

/// One half of a tie line: a dangling line paired at a boundary X-node.
#[derive(Debug, Clone)]
pub struct HalfLine {
    pub id: DanglingLineId,
    pub name: String,
    pub terminal: Terminal,
    pub reactance: f64,
    /// Flow at the X-node, entering the half line from the boundary side
    pub boundary_p: Megawatts,
}

impl HalfLine {
    pub fn new(id: DanglingLineId, name: String, bus: BusId, reactance: f64) -> Self {
        Self {
            id,
            name,
            terminal: Terminal::new(bus),
            reactance,
            boundary_p: Megawatts::UNSOLVED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TieLine {
    pub id: TieLineId,
    pub name: String,
    pub xnode_code: Option<String>,
    pub half1: HalfLine,
    pub half2: HalfLine,
}

impl TieLine {
    pub fn is_in_service(&self) -> bool {
        self.half1.terminal.connected && self.half2.terminal.connected
    }
}

/// Point-to-point HVDC link operated at a fixed active power set point.
#[derive(Debug, Clone)]
pub struct HvdcLine {
    pub id: HvdcLineId,
    pub name: String,
    pub side1: Terminal,
    pub side2: Terminal,
    /// Power transferred from side 1 to side 2 (MW); negative reverses the direction
    pub active_power_setpoint: Megawatts,
}

#[derive(Debug, Clone)]
pub struct DanglingLine {
    pub id: DanglingLineId,
    pub name: String,
    pub terminal: Terminal,
    pub reactance: f64,
    /// Constant power drawn at the boundary (MW)
    pub p0: Megawatts,
    pub q0: Megavars,
    pub boundary_p: Megawatts,
    pub xnode_code: Option<String>,
    /// Boundary point of a DC link (excluded from control-area netting)
    pub dc_boundary: bool,
}

impl DanglingLine {
    pub fn new(id: DanglingLineId, name: String, bus: BusId, p0: f64) -> Self {
        Self {
            id,
            name,
            terminal: Terminal::new(bus),
            reactance: 0.0,
            p0: Megawatts(p0),
            q0: Megavars(0.0),
            boundary_p: Megawatts::UNSOLVED,
            xnode_code: None,
            dc_boundary: false,
        }
    }

    pub fn with_xnode(mut self, code: &str) -> Self {
        self.xnode_code = Some(code.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Leg {
    pub terminal: Terminal,
    /// Leg reactance towards the star point (per-unit)
    pub reactance: f64,
}

#[derive(Debug, Clone)]
pub struct ThreeWindingsTransformer {
    pub id: ThreeWindingsTransformerId,
    pub name: String,
    pub legs: [Leg; 3],
}

#[derive(Debug, Clone)]
pub struct Gen {
    pub id: GenId,
    pub name: String,
    pub bus: BusId,
    /// Active power target (MW)
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
    pub pmin: Megawatts,
    pub pmax: Megawatts,
    /// In-service status
    pub status: bool,
}

impl Gen {
    /// Create a new generator with default limits (no constraints)
    pub fn new(id: GenId, name: String, bus: BusId) -> Self {
        Self {
            id,
            name,
            bus,
            active_power: Megawatts(0.0),
            reactive_power: Megavars(0.0),
            pmin: Megawatts(0.0),
            pmax: Megawatts(f64::INFINITY),
            status: true,
        }
    }

    /// Set active power limits (in MW)
    pub fn with_p_limits(mut self, pmin: f64, pmax: f64) -> Self {
        self.pmin = Megawatts(pmin);
        self.pmax = Megawatts(pmax);
        self
    }

    pub fn with_target_p(mut self, target_mw: f64) -> Self {
        self.active_power = Megawatts(target_mw);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    /// Constant active power P0 (MW)
    pub active_power: Megawatts,
    /// Constant reactive power Q0 (Mvar)
    pub reactive_power: Megavars,
    /// Share of P0 that follows the conform load profile; zero for fixed loads
    pub variable_active_power: Megawatts,
    pub status: bool,
}

impl Load {
    pub fn new(id: LoadId, name: String, bus: BusId, p0: f64, q0: f64) -> Self {
        Self {
            id,
            name,
            bus,
            active_power: Megawatts(p0),
            reactive_power: Megavars(q0),
            variable_active_power: Megawatts(0.0),
            status: true,
        }
    }

    pub fn with_variable_p(mut self, variable_mw: f64) -> Self {
        self.variable_active_power = Megawatts(variable_mw);
        self
    }

    pub fn is_conform(&self) -> bool {
        self.variable_active_power.value() != 0.0
    }
}

// Enum to represent different types of nodes in the graph
#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Gen(Gen),
    Load(Load),
    DanglingLine(DanglingLine),
    ThreeWindingsTransformer(ThreeWindingsTransformer),
}

// Enum to represent different types of edges in the graph
#[derive(Debug, Clone)]
pub enum Edge {
    Branch(Branch),
    TieLine(TieLine),
    Hvdc(HvdcLine),
}

/// The power network: the working-variant graph plus parked variants.
#[derive(Debug)]
pub struct Network {
    pub id: String,
    pub graph: Graph<Node, Edge, Undirected>,
    pub(crate) working_variant: String,
    pub(crate) parked_variants: BTreeMap<String, Graph<Node, Edge, Undirected>>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new("network")
    }
}

impl Network {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            graph: Graph::new_undirected(),
            working_variant: INITIAL_VARIANT_ID.to_string(),
            parked_variants: BTreeMap::new(),
        }
    }

    // Variants share node/edge indices, so the structure is frozen once a
    // second variant exists.
    fn ensure_structure_mutable(&self) -> GbalResult<()> {
        if self.parked_variants.is_empty() {
            Ok(())
        } else {
            Err(GbalError::Variant(format!(
                "cannot add elements to network '{}' while {} other variant(s) exist",
                self.id,
                self.parked_variants.len()
            )))
        }
    }

    fn require_bus(&self, bus: BusId) -> GbalResult<NodeIndex> {
        self.bus_node(bus)
            .ok_or_else(|| GbalError::Network(format!("unknown bus {}", bus)))
    }

    pub fn add_bus(&mut self, bus: Bus) -> GbalResult<NodeIndex> {
        self.ensure_structure_mutable()?;
        if self.bus_node(bus.id).is_some() {
            return Err(GbalError::Network(format!("duplicate bus {}", bus.id)));
        }
        Ok(self.graph.add_node(Node::Bus(bus)))
    }

    pub fn add_gen(&mut self, gen: Gen) -> GbalResult<NodeIndex> {
        self.ensure_structure_mutable()?;
        self.require_bus(gen.bus)?;
        Ok(self.graph.add_node(Node::Gen(gen)))
    }

    pub fn add_load(&mut self, load: Load) -> GbalResult<NodeIndex> {
        self.ensure_structure_mutable()?;
        self.require_bus(load.bus)?;
        Ok(self.graph.add_node(Node::Load(load)))
    }

    pub fn add_dangling_line(&mut self, line: DanglingLine) -> GbalResult<NodeIndex> {
        self.ensure_structure_mutable()?;
        self.require_bus(line.terminal.bus)?;
        Ok(self.graph.add_node(Node::DanglingLine(line)))
    }

    pub fn add_three_windings_transformer(
        &mut self,
        transformer: ThreeWindingsTransformer,
    ) -> GbalResult<NodeIndex> {
        self.ensure_structure_mutable()?;
        for leg in &transformer.legs {
            self.require_bus(leg.terminal.bus)?;
        }
        Ok(self
            .graph
            .add_node(Node::ThreeWindingsTransformer(transformer)))
    }

    pub fn add_branch(&mut self, branch: Branch) -> GbalResult<EdgeIndex> {
        self.ensure_structure_mutable()?;
        let a = self.require_bus(branch.side1.bus)?;
        let b = self.require_bus(branch.side2.bus)?;
        Ok(self.graph.add_edge(a, b, Edge::Branch(branch)))
    }

    pub fn add_tie_line(&mut self, tie_line: TieLine) -> GbalResult<EdgeIndex> {
        self.ensure_structure_mutable()?;
        let a = self.require_bus(tie_line.half1.terminal.bus)?;
        let b = self.require_bus(tie_line.half2.terminal.bus)?;
        Ok(self.graph.add_edge(a, b, Edge::TieLine(tie_line)))
    }

    pub fn add_hvdc_line(&mut self, hvdc: HvdcLine) -> GbalResult<EdgeIndex> {
        self.ensure_structure_mutable()?;
        let a = self.require_bus(hvdc.side1.bus)?;
        let b = self.require_bus(hvdc.side2.bus)?;
        Ok(self.graph.add_edge(a, b, Edge::Hvdc(hvdc)))
    }

    pub fn bus_node(&self, bus: BusId) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| matches!(&self.graph[idx], Node::Bus(b) if b.id == bus))
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.buses().into_iter().find(|b| b.id == id)
    }

    /// Bus lookup table, for code that resolves many terminals at once.
    pub fn bus_map(&self) -> HashMap<BusId, &Bus> {
        self.buses().into_iter().map(|b| (b.id, b)).collect()
    }

    pub fn gen(&self, id: GenId) -> Option<&Gen> {
        self.graph.node_weights().find_map(|n| match n {
            Node::Gen(g) if g.id == id => Some(g),
            _ => None,
        })
    }

    pub fn gen_mut(&mut self, id: GenId) -> Option<&mut Gen> {
        self.graph.node_weights_mut().find_map(|n| match n {
            Node::Gen(g) if g.id == id => Some(g),
            _ => None,
        })
    }

    pub fn load(&self, id: LoadId) -> Option<&Load> {
        self.graph.node_weights().find_map(|n| match n {
            Node::Load(l) if l.id == id => Some(l),
            _ => None,
        })
    }

    pub fn load_mut(&mut self, id: LoadId) -> Option<&mut Load> {
        self.graph.node_weights_mut().find_map(|n| match n {
            Node::Load(l) if l.id == id => Some(l),
            _ => None,
        })
    }

    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches().into_iter().find(|b| b.id == id)
    }

    pub fn branch_mut(&mut self, id: BranchId) -> Option<&mut Branch> {
        self.graph.edge_weights_mut().find_map(|e| match e {
            Edge::Branch(b) if b.id == id => Some(b),
            _ => None,
        })
    }

    pub fn dangling_line(&self, id: DanglingLineId) -> Option<&DanglingLine> {
        self.dangling_lines().into_iter().find(|d| d.id == id)
    }

    /// Get all buses as a vector
    pub fn buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    /// Get all generators as a vector
    pub fn generators(&self) -> Vec<&Gen> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    pub fn loads(&self) -> Vec<&Load> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Load(l) => Some(l),
                _ => None,
            })
            .collect()
    }

    pub fn dangling_lines(&self) -> Vec<&DanglingLine> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::DanglingLine(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn three_windings_transformers(&self) -> Vec<&ThreeWindingsTransformer> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::ThreeWindingsTransformer(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Get all branches as a vector
    pub fn branches(&self) -> Vec<&Branch> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Branch(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn tie_lines(&self) -> Vec<&TieLine> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::TieLine(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn hvdc_lines(&self) -> Vec<&HvdcLine> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Hvdc(h) => Some(h),
                _ => None,
            })
            .collect()
    }

    /// Get total active power generation of in-service units (MW)
    pub fn total_generation_mw(&self) -> f64 {
        self.generators()
            .into_iter()
            .filter(|g| g.status)
            .map(|g| g.active_power.value())
            .sum()
    }

    /// Get total active power load of in-service loads (MW)
    pub fn total_load_mw(&self) -> f64 {
        self.loads()
            .into_iter()
            .filter(|l| l.status)
            .map(|l| l.active_power.value())
            .sum()
    }
}

impl Node {
    /// Returns a human-readable label for the node.
    pub fn label(&self) -> &str {
        match self {
            Node::Bus(bus) => &bus.name,
            Node::Gen(gen) => &gen.name,
            Node::Load(load) => &load.name,
            Node::DanglingLine(line) => &line.name,
            Node::ThreeWindingsTransformer(t3w) => &t3w.name,
        }
    }
}

impl Edge {
    /// Returns a human-readable label for the edge.
    pub fn label(&self) -> &str {
        match self {
            Edge::Branch(branch) => &branch.name,
            Edge::TieLine(tie) => &tie.name,
            Edge::Hvdc(hvdc) => &hvdc.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fr_be() -> Network {
        let mut network = Network::new("fr-be");
        network
            .add_bus(Bus::new(BusId::new(1), "FR1", "VL_FR").in_country(Country::new("FR").unwrap()))
            .unwrap();
        network
            .add_bus(Bus::new(BusId::new(2), "BE1", "VL_BE").in_country(Country::new("BE").unwrap()))
            .unwrap();
        network
            .add_gen(Gen::new(GenId::new(1), "G".into(), BusId::new(1)).with_target_p(100.0))
            .unwrap();
        network
            .add_load(Load::new(LoadId::new(1), "L".into(), BusId::new(2), 80.0, 10.0))
            .unwrap();
        network
            .add_branch(Branch::new(
                BranchId::new(1),
                "FR-BE".into(),
                BusId::new(1),
                BusId::new(2),
                0.1,
            ))
            .unwrap();
        network
    }

    #[test]
    fn test_network_creation() {
        let network = fr_be();
        assert_eq!(network.graph.node_count(), 4);
        assert_eq!(network.graph.edge_count(), 1);
        assert_eq!(network.total_generation_mw(), 100.0);
        assert_eq!(network.total_load_mw(), 80.0);
        assert_eq!(network.bus(BusId::new(2)).unwrap().voltage_level, "VL_BE");
    }

    #[test]
    fn test_unknown_bus_is_rejected() {
        let mut network = fr_be();
        let err = network
            .add_load(Load::new(LoadId::new(2), "L2".into(), BusId::new(9), 1.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, GbalError::Network(_)));
        assert!(network.add_bus(Bus::new(BusId::new(1), "dup", "VL")).is_err());
    }

    #[test]
    fn test_country_validation() {
        assert_eq!(Country::new("FR").unwrap().code(), "FR");
        assert!(Country::new("fr").is_err());
        assert!(Country::new("FRA").is_err());
        let parsed: Country = serde_json::from_str("\"BE\"").unwrap();
        assert_eq!(parsed.to_string(), "BE");
        assert!(serde_json::from_str::<Country>("\"b3\"").is_err());
    }

    #[test]
    fn test_terminal_flow_defaults_to_zero() {
        let mut terminal = Terminal::new(BusId::new(1));
        assert!(terminal.p.is_nan());
        assert_eq!(terminal.p_or_zero(), 0.0);
        terminal.p = Megawatts(42.0);
        assert_eq!(terminal.p_or_zero(), 42.0);
        terminal.connected = false;
        assert_eq!(terminal.p_or_zero(), 0.0);
    }

    #[test]
    fn test_element_mutation_by_id() {
        let mut network = fr_be();
        network.gen_mut(GenId::new(1)).unwrap().active_power = Megawatts(120.0);
        network.load_mut(LoadId::new(1)).unwrap().active_power = Megawatts(90.0);
        assert_eq!(network.gen(GenId::new(1)).unwrap().active_power.value(), 120.0);
        assert_eq!(network.load(LoadId::new(1)).unwrap().active_power.value(), 90.0);
        assert!(network.gen_mut(GenId::new(7)).is_none());
    }

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(BusId::new(3).to_string(), "Bus#3");
        assert_eq!(DanglingLineId::new(1).to_string(), "DanglingLine#1");
    }
}
