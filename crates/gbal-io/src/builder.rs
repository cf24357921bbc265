//! Network construction from case records.
//!
//! `CaseBuilder` owns the network under construction and forwards each record
//! to the matching `Network::add_*` call. Records the network refuses (unknown
//! bus, duplicate bus id) are reported as import errors and skipped; the rest
//! of the case still loads.

use gbal_core::{
    Branch, BranchId, Bus, BusId, DanglingLine, DanglingLineId, Gen, GenId, GbalResult, HalfLine,
    HvdcLine, HvdcLineId, Kilovolts, Leg, Load, LoadId, Megavars, Megawatts, Network, Radians,
    Terminal, ThreeWindingsTransformer, ThreeWindingsTransformerId, TieLine, TieLineId,
};

use crate::case::{
    BranchRecord, BusRecord, DanglingLineRecord, GeneratorRecord, HalfLineRecord,
    HvdcLineRecord, LoadRecord, ThreeWindingsTransformerRecord, TieLineRecord,
};
use crate::diagnostics::ImportDiagnostics;

/// Result of adding an element to the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    Added,
    /// Rejected by the network, reported as an import error
    Skipped,
}

fn terminal(bus: usize, connected: bool, p: Option<f64>) -> Terminal {
    let mut terminal = if connected {
        Terminal::new(BusId::new(bus))
    } else {
        Terminal::disconnected(BusId::new(bus))
    };
    if let Some(p) = p {
        terminal.p = Megawatts(p);
    }
    terminal
}

fn half_line(record: HalfLineRecord) -> HalfLine {
    let name = record
        .name
        .unwrap_or_else(|| format!("DanglingLine {}", record.id));
    let mut half = HalfLine::new(
        DanglingLineId::new(record.id),
        name,
        BusId::new(record.bus),
        record.x,
    );
    half.terminal = terminal(record.bus, record.connected, record.p);
    if let Some(p) = record.boundary_p {
        half.boundary_p = Megawatts(p);
    }
    half
}

pub struct CaseBuilder<'a> {
    network: Network,
    diag: Option<&'a mut ImportDiagnostics>,
}

impl<'a> CaseBuilder<'a> {
    pub fn new(id: &str) -> Self {
        Self {
            network: Network::new(id),
            diag: None,
        }
    }

    pub fn with_diagnostics(id: &str, diag: &'a mut ImportDiagnostics) -> Self {
        Self {
            network: Network::new(id),
            diag: Some(diag),
        }
    }

    fn warn(&mut self, category: &str, message: &str, entity: &str) {
        if let Some(ref mut diag) = self.diag {
            diag.add_warning(category, message, entity);
        }
    }

    fn record<T>(&mut self, entity: String, added: GbalResult<T>) -> AddResult {
        match added {
            Ok(_) => AddResult::Added,
            Err(err) => {
                if let Some(ref mut diag) = self.diag {
                    diag.add_error("rejected", &err.to_string(), &entity);
                }
                AddResult::Skipped
            }
        }
    }

    fn count(
        &mut self,
        result: AddResult,
        stat: fn(&mut ImportDiagnostics) -> &mut usize,
    ) -> AddResult {
        if result == AddResult::Added {
            if let Some(ref mut diag) = self.diag {
                *stat(diag) += 1;
            }
        }
        result
    }

    pub fn add_bus(&mut self, record: BusRecord) -> AddResult {
        let id = BusId::new(record.id);
        let name = record.name.unwrap_or_else(|| format!("Bus {}", record.id));
        let mut bus = Bus::new(id, &name, &record.voltage_level);
        bus.base_kv = Kilovolts(record.base_kv);
        bus.country = record.country;
        if bus.country.is_none() {
            self.warn(
                "country",
                "bus has no country and is ignored by country areas",
                &id.to_string(),
            );
        }
        let added = self.network.add_bus(bus);
        let result = self.record(id.to_string(), added);
        self.count(result, |d| &mut d.stats.buses)
    }

    pub fn add_generator(&mut self, record: GeneratorRecord) -> AddResult {
        let id = GenId::new(record.id);
        let name = record
            .name
            .unwrap_or_else(|| format!("Gen {}@{}", record.id, record.bus));
        let pmax = match record.max_p {
            Some(pmax) => pmax,
            None => {
                self.warn(
                    "default",
                    "maxP missing, generator is unbounded",
                    &id.to_string(),
                );
                f64::INFINITY
            }
        };
        let mut gen = Gen::new(id, name, BusId::new(record.bus))
            .with_p_limits(record.min_p.unwrap_or(0.0), pmax)
            .with_target_p(record.target_p);
        gen.reactive_power = Megavars(record.target_q);
        gen.status = record.in_service;
        if record.target_p > pmax || record.target_p < gen.pmin.value() {
            self.warn("limits", "targetP is outside [minP, maxP]", &id.to_string());
        }
        let added = self.network.add_gen(gen);
        let result = self.record(id.to_string(), added);
        self.count(result, |d| &mut d.stats.generators)
    }

    pub fn add_load(&mut self, record: LoadRecord) -> AddResult {
        let id = LoadId::new(record.id);
        let name = record
            .name
            .unwrap_or_else(|| format!("Load {}@{}", record.id, record.bus));
        let mut load = Load::new(id, name, BusId::new(record.bus), record.p0, record.q0)
            .with_variable_p(record.variable_p0);
        load.status = record.in_service;
        if record.variable_p0.abs() > record.p0.abs() {
            self.warn("conform", "variableP0 exceeds p0", &id.to_string());
        }
        let added = self.network.add_load(load);
        let result = self.record(id.to_string(), added);
        self.count(result, |d| &mut d.stats.loads)
    }

    pub fn add_dangling_line(&mut self, record: DanglingLineRecord) -> AddResult {
        let id = DanglingLineId::new(record.id);
        let name = record
            .name
            .unwrap_or_else(|| format!("DanglingLine {}", record.id));
        let mut line = DanglingLine::new(id, name, BusId::new(record.bus), record.p0);
        line.terminal = terminal(record.bus, record.connected, record.p);
        line.reactance = record.x;
        line.q0 = Megavars(record.q0);
        line.xnode_code = record.xnode_code;
        line.dc_boundary = record.dc_boundary;
        if let Some(p) = record.boundary_p {
            line.boundary_p = Megawatts(p);
        }
        let added = self.network.add_dangling_line(line);
        let result = self.record(id.to_string(), added);
        self.count(result, |d| &mut d.stats.dangling_lines)
    }

    pub fn add_three_windings_transformer(
        &mut self,
        record: ThreeWindingsTransformerRecord,
    ) -> AddResult {
        let id = ThreeWindingsTransformerId::new(record.id);
        let name = record.name.unwrap_or_else(|| format!("T3W {}", record.id));
        let leg = |i: usize| Leg {
            terminal: terminal(record.buses[i], record.connected[i], None),
            reactance: record.x[i],
        };
        let transformer = ThreeWindingsTransformer {
            id,
            name,
            legs: [leg(0), leg(1), leg(2)],
        };
        let added = self.network.add_three_windings_transformer(transformer);
        let result = self.record(id.to_string(), added);
        self.count(result, |d| &mut d.stats.three_windings_transformers)
    }

    pub fn add_branch(&mut self, record: BranchRecord) -> AddResult {
        let id = BranchId::new(record.id);
        if record.x == 0.0 {
            self.warn("impedance", "branch has zero reactance", &id.to_string());
        }
        let name = record
            .name
            .unwrap_or_else(|| format!("Branch {}-{}", record.bus1, record.bus2));
        let mut branch = Branch::new(
            id,
            name,
            BusId::new(record.bus1),
            BusId::new(record.bus2),
            record.x,
        );
        if record.transformer {
            branch = branch.as_transformer(
                record.tap_ratio,
                Radians(record.phase_shift_deg.to_radians()),
            );
        }
        branch.resistance = record.r;
        branch.side1 = terminal(record.bus1, record.connected1, record.p1);
        branch.side2 = terminal(record.bus2, record.connected2, record.p2);
        let added = self.network.add_branch(branch);
        let result = self.record(id.to_string(), added);
        self.count(result, |d| &mut d.stats.branches)
    }

    pub fn add_tie_line(&mut self, record: TieLineRecord) -> AddResult {
        let id = TieLineId::new(record.id);
        let name = record.name.unwrap_or_else(|| format!("TieLine {}", record.id));
        let tie_line = TieLine {
            id,
            name,
            xnode_code: record.xnode_code,
            half1: half_line(record.half1),
            half2: half_line(record.half2),
        };
        let added = self.network.add_tie_line(tie_line);
        let result = self.record(id.to_string(), added);
        self.count(result, |d| &mut d.stats.tie_lines)
    }

    pub fn add_hvdc_line(&mut self, record: HvdcLineRecord) -> AddResult {
        let id = HvdcLineId::new(record.id);
        let name = record.name.unwrap_or_else(|| format!("Hvdc {}", record.id));
        let hvdc = HvdcLine {
            id,
            name,
            side1: terminal(record.bus1, record.connected1, None),
            side2: terminal(record.bus2, record.connected2, None),
            active_power_setpoint: Megawatts(record.active_power_setpoint),
        };
        let added = self.network.add_hvdc_line(hvdc);
        let result = self.record(id.to_string(), added);
        self.count(result, |d| &mut d.stats.hvdc_lines)
    }

    pub fn build(self) -> Network {
        self.network
    }
}
