//! JSON case records.
//!
//! A case file lists buses and the elements attached to them. Optional `p`
//! values carry a solved state; they are left unsolved when absent.

use anyhow::{anyhow, bail, Context, Result};
use gbal_core::Country;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::builder::CaseBuilder;
use crate::diagnostics::{ImportDiagnostics, ImportResult};

/// Current case format version (semver)
pub const CASE_FORMAT_VERSION: &str = "1.0.0";

fn default_version() -> String {
    CASE_FORMAT_VERSION.to_string()
}

fn yes() -> bool {
    true
}

fn one() -> f64 {
    1.0
}

fn default_base_kv() -> f64 {
    400.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFile {
    #[serde(default = "default_version")]
    pub version: String,
    pub id: String,
    #[serde(default)]
    pub buses: Vec<BusRecord>,
    #[serde(default)]
    pub generators: Vec<GeneratorRecord>,
    #[serde(default)]
    pub loads: Vec<LoadRecord>,
    #[serde(default)]
    pub branches: Vec<BranchRecord>,
    #[serde(default)]
    pub tie_lines: Vec<TieLineRecord>,
    #[serde(default)]
    pub hvdc_lines: Vec<HvdcLineRecord>,
    #[serde(default)]
    pub dangling_lines: Vec<DanglingLineRecord>,
    #[serde(default)]
    pub three_windings_transformers: Vec<ThreeWindingsTransformerRecord>,
}

impl CaseFile {
    pub fn new(id: &str) -> Self {
        Self {
            version: default_version(),
            id: id.to_string(),
            buses: Vec::new(),
            generators: Vec::new(),
            loads: Vec::new(),
            branches: Vec::new(),
            tie_lines: Vec::new(),
            hvdc_lines: Vec::new(),
            dangling_lines: Vec::new(),
            three_windings_transformers: Vec::new(),
        }
    }

    /// Same major version as this reader, not newer.
    pub fn is_compatible(&self) -> Result<()> {
        let case_version = Version::parse(&self.version)
            .map_err(|e| anyhow!("invalid case format version '{}': {}", self.version, e))?;
        let current_version = Version::parse(CASE_FORMAT_VERSION)?;
        if case_version.major != current_version.major {
            bail!(
                "case format v{} is not supported (this version reads v{}.x)",
                self.version,
                current_version.major
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusRecord {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub voltage_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,
    #[serde(default = "default_base_kv")]
    pub base_kv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorRecord {
    pub id: usize,
    pub bus: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub target_p: f64,
    #[serde(default)]
    pub target_q: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f64>,
    /// Absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_p: Option<f64>,
    #[serde(default = "yes")]
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRecord {
    pub id: usize,
    pub bus: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub p0: f64,
    #[serde(default)]
    pub q0: f64,
    /// Conform (variable) part of P0
    #[serde(default)]
    pub variable_p0: f64,
    #[serde(default = "yes")]
    pub in_service: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRecord {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bus1: usize,
    pub bus2: usize,
    #[serde(default)]
    pub r: f64,
    pub x: f64,
    #[serde(default)]
    pub transformer: bool,
    #[serde(default = "one")]
    pub tap_ratio: f64,
    #[serde(default)]
    pub phase_shift_deg: f64,
    #[serde(default = "yes")]
    pub connected1: bool,
    #[serde(default = "yes")]
    pub connected2: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalfLineRecord {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bus: usize,
    pub x: f64,
    #[serde(default = "yes")]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_p: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieLineRecord {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xnode_code: Option<String>,
    pub half1: HalfLineRecord,
    pub half2: HalfLineRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HvdcLineRecord {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bus1: usize,
    pub bus2: usize,
    /// MW sent from side 1 to side 2
    pub active_power_setpoint: f64,
    #[serde(default = "yes")]
    pub connected1: bool,
    #[serde(default = "yes")]
    pub connected2: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingLineRecord {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bus: usize,
    #[serde(default)]
    pub x: f64,
    pub p0: f64,
    #[serde(default)]
    pub q0: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xnode_code: Option<String>,
    #[serde(default)]
    pub dc_boundary: bool,
    #[serde(default = "yes")]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_p: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeWindingsTransformerRecord {
    pub id: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub buses: [usize; 3],
    pub x: [f64; 3],
    #[serde(default = "all_connected")]
    pub connected: [bool; 3],
}

fn all_connected() -> [bool; 3] {
    [true; 3]
}

/// Parse a case from a JSON string.
pub fn parse_case_str(json: &str) -> Result<ImportResult> {
    let case: CaseFile = serde_json::from_str(json).context("parsing case JSON")?;
    build_case(case)
}

/// Read a case file.
pub fn read_case(path: &Path) -> Result<ImportResult> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading case {}", path.display()))?;
    parse_case_str(&json).with_context(|| format!("loading case {}", path.display()))
}

/// Build a network from parsed records, skipping invalid elements.
pub fn build_case(case: CaseFile) -> Result<ImportResult> {
    case.is_compatible()?;
    let mut diagnostics = ImportDiagnostics::new();
    let mut builder = CaseBuilder::with_diagnostics(&case.id, &mut diagnostics);

    for bus in case.buses {
        builder.add_bus(bus);
    }
    for generator in case.generators {
        builder.add_generator(generator);
    }
    for load in case.loads {
        builder.add_load(load);
    }
    for line in case.dangling_lines {
        builder.add_dangling_line(line);
    }
    for t3w in case.three_windings_transformers {
        builder.add_three_windings_transformer(t3w);
    }
    for branch in case.branches {
        builder.add_branch(branch);
    }
    for tie_line in case.tie_lines {
        builder.add_tie_line(tie_line);
    }
    for hvdc in case.hvdc_lines {
        builder.add_hvdc_line(hvdc);
    }

    let network = builder.build();
    if network.buses().is_empty() {
        bail!("case '{}' has no bus", case.id);
    }
    Ok(ImportResult {
        network,
        diagnostics,
    })
}
