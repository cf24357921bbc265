use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use gbal_algo::{DcLoadFlow, LoadFlowParameters, LoadFlowResult, LoadFlowRunner};
use gbal_cli::cli::PowerFlowCommands;
use gbal_cli::common::{load_case, mw, print_json, OutputFormat};
use gbal_core::{Network, INITIAL_VARIANT_ID};
use gbal_io::write_case;
use serde::Serialize;
use tabwriter::TabWriter;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BranchFlow {
    id: String,
    name: String,
    p1: f64,
    p2: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DcReport<'a> {
    load_flow: &'a LoadFlowResult,
    branch_flows: Vec<BranchFlow>,
}

fn branch_flows(network: &Network) -> Vec<BranchFlow> {
    let branches = network.branches().into_iter().map(|b| BranchFlow {
        id: b.id.to_string(),
        name: b.name.clone(),
        p1: b.side1.p.value(),
        p2: b.side2.p.value(),
    });
    let tie_lines = network.tie_lines().into_iter().map(|t| BranchFlow {
        id: t.id.to_string(),
        name: t.name.clone(),
        p1: t.half1.terminal.p.value(),
        p2: t.half2.terminal.p.value(),
    });
    let hvdc_lines = network.hvdc_lines().into_iter().map(|h| BranchFlow {
        id: h.id.to_string(),
        name: h.name.clone(),
        p1: h.side1.p.value(),
        p2: h.side2.p.value(),
    });
    branches.chain(tie_lines).chain(hvdc_lines).collect()
}

pub fn handle(command: &PowerFlowCommands) -> Result<()> {
    match command {
        PowerFlowCommands::Dc {
            case,
            out,
            solver,
            no_distributed_slack,
            balance_type,
            format,
        } => {
            let start = Instant::now();
            let mut network = load_case(case)?;
            let parameters = LoadFlowParameters {
                distributed_slack: !no_distributed_slack,
                balance_type: (*balance_type).into(),
                solver: (*solver).into(),
            };
            let result = DcLoadFlow
                .run(&mut network, INITIAL_VARIANT_ID, &parameters)
                .context("running DC load flow")?;
            tracing::info!(
                ok = result.ok,
                components = result.component_results.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "DC load flow finished"
            );

            let flows = branch_flows(&network);
            match format {
                OutputFormat::Json => print_json(&DcReport {
                    load_flow: &result,
                    branch_flows: flows,
                })?,
                OutputFormat::Table => print_tables(&result, &flows)?,
            }

            if let Some(out) = out {
                write_case(&network, out)?;
                tracing::info!("solved case written to {}", out.display());
            }
            Ok(())
        }
    }
}

fn print_tables(result: &LoadFlowResult, flows: &[BranchFlow]) -> Result<()> {
    let mut writer = TabWriter::new(Vec::new()).padding(2);
    writeln!(writer, "COMPONENT\tSTATUS\tREFERENCE BUS\tSLACK (MW)")?;
    for component in &result.component_results {
        let reference = component
            .reference_bus
            .map_or_else(|| "-".to_string(), |bus| bus.to_string());
        writeln!(
            writer,
            "{}\t{:?}\t{}\t{}",
            component.synchronous_component_num,
            component.status,
            reference,
            mw(component.distributed_active_power)
        )?;
    }
    writeln!(writer)?;
    writeln!(writer, "ELEMENT\tNAME\tP1 (MW)\tP2 (MW)")?;
    for flow in flows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            flow.id,
            flow.name,
            mw(flow.p1),
            mw(flow.p2)
        )?;
    }
    writer.flush()?;
    let table = String::from_utf8(writer.into_inner()?)?;
    println!("{table}");
    Ok(())
}
