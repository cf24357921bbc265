use std::io::Write;

use anyhow::{bail, Context, Result};
use gbal_algo::{DcLoadFlow, LoadFlowParameters, LoadFlowRunner};
use gbal_cli::areas::AreasConfig;
use gbal_cli::cli::Commands;
use gbal_cli::common::{load_case, mw, print_json, OutputFormat};
use gbal_core::INITIAL_VARIANT_ID;
use serde::Serialize;
use tabwriter::TabWriter;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AreaPosition {
    name: String,
    net_position: f64,
    target_net_position: f64,
    mismatch: f64,
}

pub fn handle(command: &Commands) -> Result<()> {
    let Commands::NetPosition {
        case,
        areas,
        solve,
        format,
    } = command
    else {
        bail!("not a net-position command");
    };

    let mut network = load_case(case)?;
    if *solve {
        let result = DcLoadFlow
            .run(&mut network, INITIAL_VARIANT_ID, &LoadFlowParameters::default())
            .context("running DC load flow")?;
        if !result.ok {
            bail!("DC load flow did not converge on any component");
        }
    }

    let config = AreasConfig::read(areas)?;
    let positions = config
        .areas
        .iter()
        .map(|area| -> Result<AreaPosition> {
            let network_area = area
                .factory()
                .and_then(|factory| Ok(factory.create(&network)?))
                .with_context(|| format!("area '{}'", area.name))?;
            let net_position = network_area.net_position(&network);
            Ok(AreaPosition {
                name: area.name.clone(),
                net_position,
                target_net_position: area.target_net_position,
                mismatch: area.target_net_position - net_position,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    match format {
        OutputFormat::Json => print_json(&positions),
        OutputFormat::Table => {
            let mut writer = TabWriter::new(Vec::new()).padding(2);
            writeln!(writer, "AREA\tNET POSITION (MW)\tTARGET (MW)\tMISMATCH (MW)")?;
            for position in &positions {
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}",
                    position.name,
                    mw(position.net_position),
                    mw(position.target_net_position),
                    mw(position.mismatch)
                )?;
            }
            writer.flush()?;
            let table = String::from_utf8(writer.into_inner()?)?;
            println!("{table}");
            Ok(())
        }
    }
}
