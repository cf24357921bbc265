use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use futures::executor::block_on;
use gbal_algo::{
    BalanceComputation, BalanceComputationImpl, BalanceComputationParameters,
    BalanceComputationResult, DcLoadFlow, NoLoadFlowBalanceComputation,
};
use gbal_cli::areas::AreasConfig;
use gbal_cli::cli::Commands;
use gbal_cli::common::{configure_threads, load_case, mw, print_json, OutputFormat};
use gbal_core::INITIAL_VARIANT_ID;
use gbal_io::write_case;
use tabwriter::TabWriter;

pub fn handle(command: &Commands) -> Result<()> {
    let Commands::Balance {
        case,
        areas,
        parameters,
        threshold,
        max_iterations,
        single_pass,
        out,
        threads,
        format,
    } = command
    else {
        bail!("not a balance command");
    };

    let start = Instant::now();
    configure_threads(threads);
    let mut network = load_case(case)?;
    let config = AreasConfig::read(areas)?;
    let areas = config.build(&network)?;
    let parameters = resolve_parameters(parameters.as_deref(), *threshold, *max_iterations)?;

    let computation: Box<dyn BalanceComputation> = if *single_pass {
        Box::new(NoLoadFlowBalanceComputation::new(areas)?)
    } else {
        Box::new(BalanceComputationImpl::new(areas, Arc::new(DcLoadFlow))?)
    };
    let result = block_on(computation.run(&mut network, INITIAL_VARIANT_ID, &parameters))?;
    tracing::info!(
        status = ?result.status(),
        iterations = result.iteration_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "balance computation finished"
    );

    match format {
        OutputFormat::Table => print_table(&config, &result)?,
        OutputFormat::Json => print_json(&result)?,
    }

    if !result.is_success() {
        bail!(
            "areas could not be balanced in {} iteration(s)",
            result.iteration_count()
        );
    }
    if let Some(out) = out {
        write_case(&network, out)?;
        tracing::info!("balanced case written to {}", out.display());
    }
    Ok(())
}

fn resolve_parameters(
    path: Option<&Path>,
    threshold: Option<f64>,
    max_iterations: Option<usize>,
) -> Result<BalanceComputationParameters> {
    let mut parameters = match path {
        Some(path) => BalanceComputationParameters::read(path)
            .with_context(|| format!("loading parameters {}", path.display()))?,
        None => BalanceComputationParameters::default(),
    };
    if let Some(threshold) = threshold {
        parameters.set_threshold_net_position(threshold)?;
    }
    if let Some(max_iterations) = max_iterations {
        parameters.set_max_number_iterations(max_iterations);
    }
    Ok(parameters)
}

fn print_table(config: &AreasConfig, result: &BalanceComputationResult) -> Result<()> {
    let mut writer = TabWriter::new(Vec::new()).padding(2);
    writeln!(writer, "AREA\tTARGET (MW)\tSCALING (MW)")?;
    for area in &config.areas {
        let scaling = result
            .balanced_scaling_map()
            .get(&area.name)
            .copied()
            .unwrap_or(0.0);
        writeln!(
            writer,
            "{}\t{}\t{}",
            area.name,
            mw(area.target_net_position),
            mw(scaling)
        )?;
    }
    writer.flush()?;
    let table = String::from_utf8(writer.into_inner()?)?;
    println!("{table}");
    println!(
        "Status: {:?} after {} iteration(s)",
        result.status(),
        result.iteration_count()
    );
    Ok(())
}
