//! Network to case conversion, including solved flows.

use anyhow::{Context, Result};
use gbal_core::{BranchKind, HalfLine, Megawatts, Network};
use std::fs;
use std::path::Path;

use crate::case::{
    BranchRecord, BusRecord, CaseFile, DanglingLineRecord, GeneratorRecord, HalfLineRecord,
    HvdcLineRecord, LoadRecord, ThreeWindingsTransformerRecord, TieLineRecord,
};

fn solved(p: Megawatts) -> Option<f64> {
    p.is_finite().then_some(p.value())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn half_record(half: &HalfLine) -> HalfLineRecord {
    HalfLineRecord {
        id: half.id.value(),
        name: Some(half.name.clone()),
        bus: half.terminal.bus.value(),
        x: half.reactance,
        connected: half.terminal.connected,
        p: solved(half.terminal.p),
        boundary_p: solved(half.boundary_p),
    }
}

/// Snapshot the working variant of `network` as a case.
pub fn network_to_case(network: &Network) -> CaseFile {
    let mut case = CaseFile::new(&network.id);

    case.buses = network
        .buses()
        .into_iter()
        .map(|bus| BusRecord {
            id: bus.id.value(),
            name: Some(bus.name.clone()),
            voltage_level: bus.voltage_level.clone(),
            country: bus.country.clone(),
            base_kv: bus.base_kv.value(),
        })
        .collect();

    case.generators = network
        .generators()
        .into_iter()
        .map(|gen| GeneratorRecord {
            id: gen.id.value(),
            bus: gen.bus.value(),
            name: Some(gen.name.clone()),
            target_p: gen.active_power.value(),
            target_q: gen.reactive_power.value(),
            min_p: finite(gen.pmin.value()),
            max_p: finite(gen.pmax.value()),
            in_service: gen.status,
        })
        .collect();

    case.loads = network
        .loads()
        .into_iter()
        .map(|load| LoadRecord {
            id: load.id.value(),
            bus: load.bus.value(),
            name: Some(load.name.clone()),
            p0: load.active_power.value(),
            q0: load.reactive_power.value(),
            variable_p0: load.variable_active_power.value(),
            in_service: load.status,
        })
        .collect();

    case.branches = network
        .branches()
        .into_iter()
        .map(|branch| BranchRecord {
            id: branch.id.value(),
            name: Some(branch.name.clone()),
            bus1: branch.side1.bus.value(),
            bus2: branch.side2.bus.value(),
            r: branch.resistance,
            x: branch.reactance,
            transformer: branch.kind == BranchKind::Transformer,
            tap_ratio: branch.tap_ratio,
            phase_shift_deg: branch.phase_shift.to_degrees(),
            connected1: branch.side1.connected,
            connected2: branch.side2.connected,
            p1: solved(branch.side1.p),
            p2: solved(branch.side2.p),
        })
        .collect();

    case.tie_lines = network
        .tie_lines()
        .into_iter()
        .map(|tie| TieLineRecord {
            id: tie.id.value(),
            name: Some(tie.name.clone()),
            xnode_code: tie.xnode_code.clone(),
            half1: half_record(&tie.half1),
            half2: half_record(&tie.half2),
        })
        .collect();

    case.hvdc_lines = network
        .hvdc_lines()
        .into_iter()
        .map(|hvdc| HvdcLineRecord {
            id: hvdc.id.value(),
            name: Some(hvdc.name.clone()),
            bus1: hvdc.side1.bus.value(),
            bus2: hvdc.side2.bus.value(),
            active_power_setpoint: hvdc.active_power_setpoint.value(),
            connected1: hvdc.side1.connected,
            connected2: hvdc.side2.connected,
        })
        .collect();

    case.dangling_lines = network
        .dangling_lines()
        .into_iter()
        .map(|line| DanglingLineRecord {
            id: line.id.value(),
            name: Some(line.name.clone()),
            bus: line.terminal.bus.value(),
            x: line.reactance,
            p0: line.p0.value(),
            q0: line.q0.value(),
            xnode_code: line.xnode_code.clone(),
            dc_boundary: line.dc_boundary,
            connected: line.terminal.connected,
            p: solved(line.terminal.p),
            boundary_p: solved(line.boundary_p),
        })
        .collect();

    case.three_windings_transformers = network
        .three_windings_transformers()
        .into_iter()
        .map(|t3w| ThreeWindingsTransformerRecord {
            id: t3w.id.value(),
            name: Some(t3w.name.clone()),
            buses: [0, 1, 2].map(|i| t3w.legs[i].terminal.bus.value()),
            x: [0, 1, 2].map(|i| t3w.legs[i].reactance),
            connected: [0, 1, 2].map(|i| t3w.legs[i].terminal.connected),
        })
        .collect();

    case
}

pub fn case_to_json_string(network: &Network) -> Result<String> {
    serde_json::to_string_pretty(&network_to_case(network)).context("serializing case")
}

/// Write the working variant of `network` to a case file.
pub fn write_case(network: &Network, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    let json = case_to_json_string(network)?;
    fs::write(path, json).with_context(|| format!("writing case {}", path.display()))
}
