use super::{
    BalanceType, ComponentResult, ComponentStatus, LoadFlowParameters, LoadFlowResult,
    LoadFlowRunner,
};
use gbal_core::{
    topology_components, BusId, Edge, GbalResult, LinearSystemBackend, Megawatts, Network, Node,
    Radians, ThreeWindingsTransformerId, TopologyComponents,
};
use std::collections::HashMap;

/// System base used to convert MW injections to per-unit.
const BASE_MVA: f64 = 100.0;
const MIN_REACTANCE: f64 = 1e-6;

/// Linear (DC) load flow: lossless, flat voltage, B′θ = P.
///
/// Each synchronous component is solved on its own. A component without an
/// in-service generator is not calculated and its flows stay NaN. HVDC lines
/// transfer their set point, dangling lines draw their P0 at the boundary and
/// three-winding transformers are modelled with a fictitious star bus.
#[derive(Debug, Clone, Default)]
pub struct DcLoadFlow;

impl LoadFlowRunner for DcLoadFlow {
    fn name(&self) -> &str {
        "DC"
    }

    fn run(
        &self,
        network: &mut Network,
        variant_id: &str,
        parameters: &LoadFlowParameters,
    ) -> GbalResult<LoadFlowResult> {
        network.with_working_variant(variant_id, |n| solve_working_variant(n, parameters))
    }
}

fn solve_working_variant(network: &mut Network, parameters: &LoadFlowParameters) -> LoadFlowResult {
    let solver = parameters.solver.build_solver();
    let topology = topology_components(network);
    clear_state(network);

    let mut results = Vec::with_capacity(topology.synchronous_component_count());
    for num in 0..topology.synchronous_component_count() {
        let result = solve_component(network, &topology, num, parameters, solver.as_ref());
        tracing::debug!(
            component = num,
            status = ?result.status,
            distributed_mw = result.distributed_active_power,
            "DC load flow component solved"
        );
        results.push(result);
    }
    LoadFlowResult::from_components(results)
}

fn clear_state(network: &mut Network) {
    for node in network.graph.node_weights_mut() {
        match node {
            Node::Bus(bus) => bus.angle_rad = Radians(f64::NAN),
            Node::DanglingLine(line) => {
                line.terminal.p = Megawatts::UNSOLVED;
                line.boundary_p = Megawatts::UNSOLVED;
            }
            Node::ThreeWindingsTransformer(t3w) => {
                for leg in t3w.legs.iter_mut() {
                    leg.terminal.p = Megawatts::UNSOLVED;
                }
            }
            Node::Gen(_) | Node::Load(_) => {}
        }
    }
    for edge in network.graph.edge_weights_mut() {
        match edge {
            Edge::Branch(branch) => {
                branch.side1.p = Megawatts::UNSOLVED;
                branch.side2.p = Megawatts::UNSOLVED;
            }
            Edge::TieLine(tie) => {
                for half in [&mut tie.half1, &mut tie.half2] {
                    half.terminal.p = Megawatts::UNSOLVED;
                    half.boundary_p = Megawatts::UNSOLVED;
                }
            }
            Edge::Hvdc(hvdc) => {
                hvdc.side1.p = Megawatts::UNSOLVED;
                hvdc.side2.p = Megawatts::UNSOLVED;
            }
        }
    }
}

fn susceptance(reactance: f64, tap_ratio: f64) -> f64 {
    1.0 / (reactance * tap_ratio).abs().max(MIN_REACTANCE)
}

/// Bus and star-point indexing of one synchronous component.
struct ComponentIndex {
    buses: HashMap<BusId, usize>,
    stars: HashMap<ThreeWindingsTransformerId, usize>,
    size: usize,
}

impl ComponentIndex {
    fn build(network: &Network, buses: &[BusId]) -> Self {
        let bus_index: HashMap<BusId, usize> =
            buses.iter().enumerate().map(|(i, &b)| (b, i)).collect();
        let mut stars = HashMap::new();
        let mut size = buses.len();
        for t3w in network.three_windings_transformers() {
            let attached = t3w
                .legs
                .iter()
                .any(|l| l.terminal.connected && bus_index.contains_key(&l.terminal.bus));
            if attached {
                stars.insert(t3w.id, size);
                size += 1;
            }
        }
        Self {
            buses: bus_index,
            stars,
            size,
        }
    }

    fn bus(&self, bus: BusId) -> Option<usize> {
        self.buses.get(&bus).copied()
    }
}

fn solve_component(
    network: &mut Network,
    topology: &TopologyComponents,
    num: usize,
    parameters: &LoadFlowParameters,
    solver: &dyn LinearSystemBackend,
) -> ComponentResult {
    let buses = topology.synchronous_component_buses(num).to_vec();
    let connected_component_num = buses
        .first()
        .and_then(|&b| topology.connected_component(b))
        .unwrap_or(num);
    let mut result = ComponentResult {
        connected_component_num,
        synchronous_component_num: num,
        status: ComponentStatus::NoCalculation,
        iteration_count: 0,
        reference_bus: None,
        distributed_active_power: 0.0,
        slack_bus_active_power_mismatch: 0.0,
    };

    let index = ComponentIndex::build(network, &buses);
    let mut injections = vec![0.0; index.size];

    let generators: Vec<_> = network
        .generators()
        .into_iter()
        .filter(|g| g.status && index.bus(g.bus).is_some())
        .collect();
    // reference: the lowest-id bus with an in-service generator
    let Some(reference_bus) = generators.iter().map(|g| g.bus).min() else {
        return result;
    };
    result.reference_bus = Some(reference_bus);

    for gen in &generators {
        if let Some(i) = index.bus(gen.bus) {
            injections[i] += gen.active_power.value();
        }
    }
    for load in network.loads().into_iter().filter(|l| l.status) {
        if let Some(i) = index.bus(load.bus) {
            injections[i] -= load.active_power.value();
        }
    }
    for line in network.dangling_lines() {
        if line.terminal.connected {
            if let Some(i) = index.bus(line.terminal.bus) {
                injections[i] -= line.p0.value();
            }
        }
    }
    for hvdc in network.hvdc_lines() {
        if hvdc.side1.connected && hvdc.side2.connected {
            let setpoint = hvdc.active_power_setpoint.value();
            if let Some(i) = index.bus(hvdc.side1.bus) {
                injections[i] -= setpoint;
            }
            if let Some(i) = index.bus(hvdc.side2.bus) {
                injections[i] += setpoint;
            }
        }
    }

    let imbalance: f64 = injections.iter().sum();
    let shares = if parameters.distributed_slack {
        slack_participation(network, &index, parameters.balance_type)
    } else {
        Vec::new()
    };
    if shares.is_empty() {
        if let Some(i) = index.bus(reference_bus) {
            injections[i] -= imbalance;
        }
        result.slack_bus_active_power_mismatch = -imbalance;
    } else {
        for (i, share) in shares {
            injections[i] -= imbalance * share;
        }
        result.distributed_active_power = -imbalance;
    }

    let mut matrix = vec![vec![0.0; index.size]; index.size];
    let mut rhs: Vec<f64> = injections.iter().map(|p| p / BASE_MVA).collect();
    let mut stamp = |i: usize, j: usize, b: f64| {
        matrix[i][j] -= b;
        matrix[j][i] -= b;
        matrix[i][i] += b;
        matrix[j][j] += b;
    };
    for edge in network.graph.edge_weights() {
        match edge {
            Edge::Branch(branch) if branch.is_in_service() => {
                if let (Some(i), Some(j)) = (index.bus(branch.side1.bus), index.bus(branch.side2.bus)) {
                    let b = susceptance(branch.reactance, branch.tap_ratio);
                    stamp(i, j, b);
                    rhs[i] += b * branch.phase_shift.value();
                    rhs[j] -= b * branch.phase_shift.value();
                }
            }
            Edge::TieLine(tie) if tie.is_in_service() => {
                if let (Some(i), Some(j)) = (
                    index.bus(tie.half1.terminal.bus),
                    index.bus(tie.half2.terminal.bus),
                ) {
                    stamp(i, j, susceptance(tie.half1.reactance + tie.half2.reactance, 1.0));
                }
            }
            _ => {}
        }
    }
    for t3w in network.three_windings_transformers() {
        if let Some(&star) = index.stars.get(&t3w.id) {
            for leg in t3w.legs.iter().filter(|l| l.terminal.connected) {
                if let Some(i) = index.bus(leg.terminal.bus) {
                    stamp(i, star, susceptance(leg.reactance, 1.0));
                }
            }
        }
    }

    let Some(reference) = index.bus(reference_bus) else {
        return result;
    };
    let angles = match solve_reduced(&matrix, &rhs, reference, solver) {
        Ok(angles) => angles,
        Err(err) => {
            tracing::warn!(component = num, error = %err, "DC load flow failed");
            result.status = ComponentStatus::Failed;
            return result;
        }
    };

    write_flows(network, &index, &angles);
    result.status = ComponentStatus::Converged;
    result.iteration_count = 1;
    result
}

/// Normalised participation factors keyed by component index; empty when
/// nothing can participate.
fn slack_participation(
    network: &Network,
    index: &ComponentIndex,
    balance_type: BalanceType,
) -> Vec<(usize, f64)> {
    let weights: Vec<(usize, f64)> = match balance_type {
        BalanceType::ProportionalToGenerationPMax => network
            .generators()
            .into_iter()
            .filter(|g| g.status && g.pmax.is_finite())
            .filter_map(|g| index.bus(g.bus).map(|i| (i, g.pmax.value().max(0.0))))
            .collect(),
        BalanceType::ProportionalToGenerationP => network
            .generators()
            .into_iter()
            .filter(|g| g.status)
            .filter_map(|g| index.bus(g.bus).map(|i| (i, g.active_power.value().max(0.0))))
            .collect(),
        BalanceType::ProportionalToLoad => network
            .loads()
            .into_iter()
            .filter(|l| l.status)
            .filter_map(|l| index.bus(l.bus).map(|i| (i, l.active_power.value().max(0.0))))
            .collect(),
    };
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    weights
        .into_iter()
        .filter(|(_, w)| *w > 0.0)
        .map(|(i, w)| (i, w / total))
        .collect()
}

/// Solves B′θ = P with the reference angle fixed at zero.
fn solve_reduced(
    matrix: &[Vec<f64>],
    rhs: &[f64],
    reference: usize,
    solver: &dyn LinearSystemBackend,
) -> anyhow::Result<Vec<f64>> {
    let n = matrix.len();
    let keep: Vec<usize> = (0..n).filter(|&i| i != reference).collect();
    let reduced: Vec<Vec<f64>> = keep
        .iter()
        .map(|&i| keep.iter().map(|&j| matrix[i][j]).collect())
        .collect();
    let reduced_rhs: Vec<f64> = keep.iter().map(|&i| rhs[i]).collect();

    let solution = solver.solve(&reduced, &reduced_rhs)?;
    let mut angles = vec![0.0; n];
    for (&i, theta) in keep.iter().zip(solution) {
        angles[i] = theta;
    }
    Ok(angles)
}

fn write_flows(network: &mut Network, index: &ComponentIndex, angles: &[f64]) {
    let theta = |bus: BusId| index.bus(bus).map(|i| angles[i]);

    for node in network.graph.node_weights_mut() {
        match node {
            Node::Bus(bus) => {
                if let Some(angle) = theta(bus.id) {
                    bus.angle_rad = Radians(angle);
                }
            }
            Node::DanglingLine(line) => {
                if line.terminal.connected && theta(line.terminal.bus).is_some() {
                    line.terminal.p = line.p0;
                    line.boundary_p = -line.p0;
                }
            }
            Node::ThreeWindingsTransformer(t3w) => {
                let Some(&star) = index.stars.get(&t3w.id) else {
                    continue;
                };
                for leg in t3w.legs.iter_mut().filter(|l| l.terminal.connected) {
                    if let Some(angle) = theta(leg.terminal.bus) {
                        let flow = BASE_MVA * susceptance(leg.reactance, 1.0) * (angle - angles[star]);
                        leg.terminal.p = Megawatts(flow);
                    }
                }
            }
            Node::Gen(_) | Node::Load(_) => {}
        }
    }

    for edge in network.graph.edge_weights_mut() {
        match edge {
            Edge::Branch(branch) => {
                match (theta(branch.side1.bus), theta(branch.side2.bus)) {
                    (Some(t1), Some(t2)) if branch.is_in_service() => {
                        let b = susceptance(branch.reactance, branch.tap_ratio);
                        let flow = BASE_MVA * b * (t1 - t2 - branch.phase_shift.value());
                        branch.side1.p = Megawatts(flow);
                        branch.side2.p = Megawatts(-flow);
                    }
                    (t1, t2) => {
                        // open at one end: the energised end carries nothing
                        if branch.side1.connected && t1.is_some() && !branch.side2.connected {
                            branch.side1.p = Megawatts(0.0);
                        }
                        if branch.side2.connected && t2.is_some() && !branch.side1.connected {
                            branch.side2.p = Megawatts(0.0);
                        }
                    }
                }
            }
            Edge::TieLine(tie) => {
                let (t1, t2) = (theta(tie.half1.terminal.bus), theta(tie.half2.terminal.bus));
                match (t1, t2) {
                    (Some(t1), Some(t2)) if tie.is_in_service() => {
                        let b = susceptance(tie.half1.reactance + tie.half2.reactance, 1.0);
                        let flow = BASE_MVA * b * (t1 - t2);
                        tie.half1.terminal.p = Megawatts(flow);
                        tie.half1.boundary_p = Megawatts(-flow);
                        tie.half2.terminal.p = Megawatts(-flow);
                        tie.half2.boundary_p = Megawatts(flow);
                    }
                    _ => {
                        for (half, angle) in [(&mut tie.half1, t1), (&mut tie.half2, t2)] {
                            if half.terminal.connected && angle.is_some() {
                                half.terminal.p = Megawatts(0.0);
                                half.boundary_p = Megawatts(0.0);
                            }
                        }
                    }
                }
            }
            Edge::Hvdc(hvdc) => {
                let transfer = if hvdc.side1.connected && hvdc.side2.connected {
                    hvdc.active_power_setpoint.value()
                } else {
                    0.0
                };
                if hvdc.side1.connected && theta(hvdc.side1.bus).is_some() {
                    hvdc.side1.p = Megawatts(transfer);
                }
                if hvdc.side2.connected && theta(hvdc.side2.bus).is_some() {
                    hvdc.side2.p = Megawatts(-transfer);
                }
            }
        }
    }
}
